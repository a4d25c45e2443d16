mod cache;
mod client;
mod response;
mod types;

pub use cache::{CacheStats, CollectionCache, CollectionStats};
pub use client::SlackApi;
pub use response::{
    ApiFailure, ApiResult, AuthIdentity, ChannelList, PostedMessage, Response, RtmHandshake,
    RtmSelf, RtmTeam, UserList,
};
pub use types::{Channel, ChannelId, ChannelText, LookupKind, Params, User, UserId, UserProfile};
