use crate::config::{ClientConfig, Credentials, load_config};
use crate::error::{Result, SlackApiError};
use crate::logging::Timer;
use crate::slack::cache::{CacheStats, CollectionCache};
use crate::slack::response::{ApiResult, ChannelList, Response, UserList};
use crate::slack::types::{Channel, LookupKind, Params, User};
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

const AUTH_TEST: &str = "auth.test";
const RTM_START: &str = "rtm.start";
const CHANNELS_LIST: &str = "channels.list";
const USERS_LIST: &str = "users.list";
const CHAT_POST_MESSAGE: &str = "chat.postMessage";

const TOKEN_PARAM: &str = "token";

/// Client for the Slack Web API
///
/// Holds the token and flags fixed at construction, plus the lazily fetched
/// channel and user collections.
pub struct SlackApi {
    http: reqwest::Client,
    credentials: Credentials,
    config: ClientConfig,
    channel_cache: CollectionCache<Channel>,
    user_cache: CollectionCache<User>,
}

impl fmt::Debug for SlackApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackApi")
            .field("api_url", &self.config.api_url)
            .field("verify_responses", &self.config.verify_responses)
            .finish_non_exhaustive()
    }
}

impl SlackApi {
    /// Create a client, taking the token from `SLACK_TOKEN` when `token` is None or empty
    ///
    /// Depending on `config` this calls `auth.test`, `channels.list` and
    /// `users.list` before returning.
    pub async fn new(token: Option<String>, config: ClientConfig) -> Result<Self> {
        Self::new_with_env(token, config, |key| std::env::var(key).ok()).await
    }

    /// Like [`SlackApi::new`], reading the fallback token through `lookup`
    /// instead of the process environment
    pub async fn new_with_env<F>(
        token: Option<String>,
        config: ClientConfig,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::resolve_with(token, lookup)?;
        Self::with_credentials(credentials, config).await
    }

    /// Create a client from `.env` and the process environment
    pub async fn from_env() -> Result<Self> {
        let config = load_config()?;
        Self::new(None, config).await
    }

    /// Create a client from an already resolved token
    pub async fn with_credentials(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let client = Self {
            http: reqwest::Client::new(),
            credentials,
            config,
            channel_cache: CollectionCache::new(CHANNELS_LIST),
            user_cache: CollectionCache::new(USERS_LIST),
        };

        if client.config.verify_auth {
            // A rejected token must surface as an authentication failure even
            // when responses are verified, so the probe skips verification.
            let response = client.probe_auth(false).await?;
            if !response.is_ok() {
                tracing::warn!(
                    error = response.error().unwrap_or("unknown_error"),
                    "Slack token rejected"
                );
                return Err(SlackApiError::Authentication { response });
            }
            tracing::info!("Slack token verified");
        }

        if !client.config.lazy {
            futures::try_join!(client.channels(), client.users())?;
        }

        Ok(client)
    }

    /// The flags this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call `method` via GET; the token is always added to the query string
    pub async fn call_get(&self, method: &str, params: Option<&Params>) -> Result<Response> {
        self.get(method, params, self.config.verify_responses).await
    }

    /// Call `method` via POST with a bearer token header and `params` as JSON body
    pub async fn call_post(&self, method: &str, params: Option<&Params>) -> Result<Response> {
        self.post(method, params, self.config.verify_responses).await
    }

    async fn get(&self, method: &str, params: Option<&Params>, verify: bool) -> Result<Response> {
        let mut query: Vec<(&str, String)> = params
            .into_iter()
            .flatten()
            .filter(|(key, _)| key.as_str() != TOKEN_PARAM)
            .map(|(key, value)| (key.as_str(), query_value(value)))
            .collect();
        query.push((TOKEN_PARAM, self.credentials.token().to_string()));

        let url = self.method_url(method);
        let request = self.http.get(&url).query(&query);
        self.dispatch(method, "GET", url, request, verify).await
    }

    async fn post(&self, method: &str, params: Option<&Params>, verify: bool) -> Result<Response> {
        let url = self.method_url(method);
        let mut request = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.credentials.bearer());
        if let Some(params) = params {
            request = request.json(params);
        }
        self.dispatch(method, "POST", url, request, verify).await
    }

    async fn dispatch(
        &self,
        method: &str,
        http_verb: &'static str,
        url: String,
        request: RequestBuilder,
        verify: bool,
    ) -> Result<Response> {
        let _timer = Timer::new(http_verb, method);
        tracing::debug!(http_verb, url = %url, "Send request");

        let response: Response = request.send().await?.json().await?;

        if verify && !response.is_ok() {
            tracing::warn!(
                url = %url,
                error = response.error().unwrap_or("unknown_error"),
                "Slack API returned a bad response"
            );
            return Err(SlackApiError::Api { url, response });
        }

        Ok(response)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), method)
    }

    /// Call `auth.test` via GET and then via POST, returning the POST result
    ///
    /// The GET result only short-circuits the call when it is an empty object.
    pub async fn auth_test(&self) -> Result<Response> {
        self.probe_auth(self.config.verify_responses).await
    }

    async fn probe_auth(&self, verify: bool) -> Result<Response> {
        let probe = self.get(AUTH_TEST, None, verify).await?;
        if probe.is_empty() {
            return Ok(probe);
        }
        self.post(AUTH_TEST, None, verify).await
    }

    /// Fetch the `rtm.start` handshake; no websocket is opened
    pub async fn rtm_start(&self) -> Result<Response> {
        self.call_get(RTM_START, None).await
    }

    /// Post to `chat.postMessage`; the response is discarded
    pub async fn chat_post_message(&self, params: &Params) -> Result<()> {
        self.call_post(CHAT_POST_MESSAGE, Some(params)).await?;
        Ok(())
    }

    /// Channels of this team, fetched on first call
    pub async fn channels(&self) -> Result<Arc<Vec<Channel>>> {
        self.channel_cache
            .get_or_fetch(|| async {
                let list: ChannelList = self.fetch_payload(CHANNELS_LIST).await?;
                Ok(list.channels)
            })
            .await
    }

    /// Users of this team, fetched on first call
    ///
    /// There is no reload for users; the list lives as long as the client.
    pub async fn users(&self) -> Result<Arc<Vec<User>>> {
        self.user_cache
            .get_or_fetch(|| async {
                let list: UserList = self.fetch_payload(USERS_LIST).await?;
                Ok(list.members)
            })
            .await
    }

    /// Forget the cached channels so the next `channels()` refetches
    pub async fn reload_channels(&self) {
        self.channel_cache.clear().await;
    }

    /// Hit, miss and fetch-error counters for both cached collections
    pub async fn cache_stats(&self) -> CacheStats {
        CacheStats {
            channels: self.channel_cache.stats().await,
            users: self.user_cache.stats().await,
        }
    }

    async fn fetch_payload<T: DeserializeOwned>(&self, method: &str) -> Result<T> {
        let response = self.call_get(method, None).await?;
        match response.parse::<T>()? {
            ApiResult::Success(payload) => Ok(payload),
            ApiResult::Failure(failure) => Err(SlackApiError::Api {
                url: self.method_url(method),
                response: failure.response,
            }),
        }
    }

    /// First channel whose name matches exactly
    pub async fn channel_from_name(&self, name: &str) -> Result<Channel> {
        self.channels()
            .await?
            .iter()
            .find(|channel| channel.name == name)
            .cloned()
            .ok_or_else(|| not_found(LookupKind::ChannelByName, name))
    }

    pub async fn channel_from_id(&self, channel_id: &str) -> Result<Channel> {
        self.channels()
            .await?
            .iter()
            .find(|channel| channel.id.as_str() == channel_id)
            .cloned()
            .ok_or_else(|| not_found(LookupKind::ChannelById, channel_id))
    }

    pub async fn user_from_id(&self, user_id: &str) -> Result<User> {
        self.users()
            .await?
            .iter()
            .find(|user| user.id.as_str() == user_id)
            .cloned()
            .ok_or_else(|| not_found(LookupKind::UserById, user_id))
    }
}

fn not_found(kind: LookupKind, key: &str) -> SlackApiError {
    SlackApiError::NotFound {
        kind,
        key: key.to_string(),
    }
}

/// Strings go into the query as is, anything else as its JSON text
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_value() {
        assert_eq!(query_value(&json!("general")), "general");
        assert_eq!(query_value(&json!(true)), "true");
        assert_eq!(query_value(&json!(200)), "200");
    }

    #[tokio::test]
    async fn test_method_url_trims_slash() {
        let config = ClientConfig {
            lazy: true,
            api_url: "http://localhost:1/api/".to_string(),
            ..ClientConfig::default()
        };
        let client = SlackApi::with_credentials(Credentials::new("xoxb-test"), config)
            .await
            .unwrap();

        assert_eq!(
            client.method_url("chat.postMessage"),
            "http://localhost:1/api/chat.postMessage"
        );
        assert!(!format!("{:?}", client).contains("xoxb-test"));
    }

    #[test]
    fn test_not_found_message() {
        let err = not_found(LookupKind::ChannelByName, "missing");
        assert_eq!(err.to_string(), "Unknown channel for name: \"missing\"");
    }
}
