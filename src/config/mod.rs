mod settings;

pub use settings::{ClientConfig, Credentials, DEFAULT_API_URL, TOKEN_ENV, load_config};
