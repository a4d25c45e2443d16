pub mod config;
pub mod error;
pub mod logging;
pub mod slack;

pub use config::{ClientConfig, Credentials};
pub use error::{Result, SlackApiError};
pub use slack::SlackApi;
