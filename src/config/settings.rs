use crate::error::{Result, SlackApiError};
use std::fmt;

pub const TOKEN_ENV: &str = "SLACK_TOKEN";
pub const DEFAULT_API_URL: &str = "https://slack.com/api";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Call `auth.test` during construction and fail if it is not ok
    pub verify_auth: bool,
    /// Treat every response with `ok: false` as an error
    pub verify_responses: bool,
    /// Skip populating the channel and user caches during construction
    pub lazy: bool,
    /// Base URL; the method name is appended as the last path segment
    pub api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            verify_auth: false,
            verify_responses: true,
            lazy: false,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// The API token used for every call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Use `token` when given and non-empty, otherwise fall back to
    /// `SLACK_TOKEN` as returned by `lookup`
    pub fn resolve_with<F>(token: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        token
            .filter(|t| !t.is_empty())
            .or_else(|| lookup(TOKEN_ENV).filter(|t| !t.is_empty()))
            .map(Self::new)
            .ok_or_else(|| {
                SlackApiError::Configuration(format!(
                    "no credential available: pass a token or set {}",
                    TOKEN_ENV
                ))
            })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

pub fn load_config() -> Result<ClientConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    config_from(|key| std::env::var(key).ok())
}

pub(crate) fn config_from<F>(lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ClientConfig::default();

    Ok(ClientConfig {
        verify_auth: parse_flag(&lookup, "SLACK_VERIFY_AUTH", defaults.verify_auth)?,
        verify_responses: parse_flag(&lookup, "SLACK_VERIFY_RESPONSES", defaults.verify_responses)?,
        lazy: parse_flag(&lookup, "SLACK_LAZY", defaults.lazy)?,
        api_url: lookup("SLACK_API_URL").unwrap_or(defaults.api_url),
    })
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(SlackApiError::Configuration(format!("Invalid {}", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_token_wins() {
        let creds =
            Credentials::resolve_with(Some("xoxb-arg".into()), env(&[(TOKEN_ENV, "xoxb-env")]))
                .unwrap();
        assert_eq!(creds.token(), "xoxb-arg");
    }

    #[test]
    fn test_empty_token_falls_back_to_env() {
        let creds =
            Credentials::resolve_with(Some(String::new()), env(&[(TOKEN_ENV, "xoxb-env")]))
                .unwrap();
        assert_eq!(creds.token(), "xoxb-env");
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let err = Credentials::resolve_with(None, env(&[])).unwrap_err();
        assert!(matches!(err, SlackApiError::Configuration(_)));

        let err = Credentials::resolve_with(None, env(&[(TOKEN_ENV, "")])).unwrap_err();
        assert!(matches!(err, SlackApiError::Configuration(_)));
    }

    #[test]
    fn test_debug_hides_token() {
        let creds = Credentials::new("xoxb-secret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("xoxb-secret"));
        assert_eq!(creds.bearer(), "Bearer xoxb-secret");
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(env(&[])).unwrap();
        assert!(!config.verify_auth);
        assert!(config.verify_responses);
        assert!(!config.lazy);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_overrides() {
        let config = config_from(env(&[
            ("SLACK_VERIFY_AUTH", "yes"),
            ("SLACK_VERIFY_RESPONSES", "0"),
            ("SLACK_LAZY", "TRUE"),
            ("SLACK_API_URL", "http://localhost:9999/api"),
        ]))
        .unwrap();
        assert!(config.verify_auth);
        assert!(!config.verify_responses);
        assert!(config.lazy);
        assert_eq!(config.api_url, "http://localhost:9999/api");
    }

    #[test]
    fn test_config_rejects_bad_flag() {
        let err = config_from(env(&[("SLACK_LAZY", "sometimes")])).unwrap_err();
        assert!(err.to_string().contains("SLACK_LAZY"));
    }
}
