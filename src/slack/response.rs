//! Raw and typed views of Slack Web API responses
//!
//! Every method answers with a JSON object carrying an `ok` flag. The dispatch
//! layer hands back the raw [`Response`]; callers that want typed data call
//! [`Response::parse`] to get an [`ApiResult`].

use crate::error::Result;
use crate::slack::types::{Channel, ChannelId, User, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The JSON object returned by a Slack API method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(Map<String, Value>);

impl Response {
    /// The success flag; missing or non-boolean reads as false
    pub fn is_ok(&self) -> bool {
        self.0.get("ok").and_then(Value::as_bool).unwrap_or(false)
    }

    /// The `error` code Slack sends alongside `ok: false`
    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Validate the success flag and decode the payload as `T`
    pub fn parse<T: DeserializeOwned>(self) -> Result<ApiResult<T>> {
        if self.is_ok() {
            let payload = serde_json::from_value(Value::Object(self.0))?;
            Ok(ApiResult::Success(payload))
        } else {
            Ok(ApiResult::Failure(ApiFailure::from_response(self)))
        }
    }
}

impl From<Map<String, Value>> for Response {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// Outcome of a method call, split on the success flag
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success(T),
    Failure(ApiFailure),
}

impl<T> ApiResult<T> {
    pub fn into_result(self) -> std::result::Result<T, ApiFailure> {
        match self {
            ApiResult::Success(payload) => Ok(payload),
            ApiResult::Failure(failure) => Err(failure),
        }
    }
}

/// The payload of an `ok: false` response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    /// Slack error code (e.g. "channel_not_found"); "unknown_error" when absent
    pub error: String,
    pub warning: Option<String>,
    pub response: Response,
}

impl ApiFailure {
    fn from_response(response: Response) -> Self {
        Self {
            error: response.error().unwrap_or("unknown_error").to_string(),
            warning: response
                .get("warning")
                .and_then(Value::as_str)
                .map(str::to_string),
            response,
        }
    }
}

/// `auth.test`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthIdentity {
    pub url: String,
    pub team: String,
    pub user: String,
    pub team_id: String,
    pub user_id: UserId,
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RtmSelf {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RtmTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// `rtm.start`: the websocket URL plus the initial state snapshot
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RtmHandshake {
    pub url: String,
    #[serde(rename = "self", default)]
    pub self_: Option<RtmSelf>,
    #[serde(default)]
    pub team: Option<RtmTeam>,
    #[serde(flatten)]
    pub state: Map<String, Value>,
}

/// `channels.list`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelList {
    pub channels: Vec<Channel>,
}

/// `users.list`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserList {
    pub members: Vec<User>,
}

/// `chat.postMessage`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostedMessage {
    pub channel: ChannelId,
    pub ts: String,
    #[serde(default)]
    pub message: Option<Value>,
}
