use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Parameters for one API method, sent as query string (GET) or JSON body (POST)
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Topic or purpose of a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelText {
    pub value: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub last_set: Option<i64>,
}

/// A channel as listed by `channels.list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,

    /// Name without # (e.g. "general")
    pub name: String,

    #[serde(default)]
    pub is_channel: Option<bool>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub is_member: Option<bool>,
    #[serde(default)]
    pub num_members: Option<u32>,
    #[serde(default)]
    pub topic: Option<ChannelText>,
    #[serde(default)]
    pub purpose: Option<ChannelText>,

    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    /// Name with # prefix
    pub fn display_name(&self) -> String {
        format!("#{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A member as listed by `users.list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Username/handle (e.g. "john.doe")
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: Option<UserProfile>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Best available name: profile display name, then real name, then handle, then id
    pub fn best_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.display_name.as_deref())
            .filter(|n| !n.is_empty())
            .or(self.real_name.as_deref())
            .or(self.name.as_deref())
            .unwrap_or(self.id.as_str())
    }
}

/// Which lookup helper failed to find a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    ChannelByName,
    ChannelById,
    UserById,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LookupKind::ChannelByName => "channel for name",
            LookupKind::ChannelById => "channel for id",
            LookupKind::UserById => "user for id",
        };
        f.write_str(text)
    }
}
