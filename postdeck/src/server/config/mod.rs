use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Configuration {
    #[serde(default)]
    pub server: ServerConfiguration,
    #[serde(default)]
    pub database: DatabaseConfiguration,
    pub oauth: OAuthConfiguration,
    #[serde(default)]
    pub schedule: ScheduleConfiguration,
    #[serde(default)]
    pub ai: AiConfiguration,
    /// Clients upserted at startup
    #[serde(default)]
    pub clients: Vec<ClientSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientSeed {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfiguration {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used for the demo approval screen
    #[serde(default = "default_public_url")]
    pub public_url: String,

    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            state_ttl_seconds: default_state_ttl(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfiguration {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfiguration {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthConfiguration {
    /// Callback URL registered with every provider
    pub redirect_uri: String,

    /// Key used to sign OAuth state tokens
    pub state_secret: String,

    pub facebook: Option<FacebookConfiguration>,

    /// Standard authorization-code providers keyed by platform name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfiguration>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FacebookConfiguration {
    pub client_id: String,
    pub client_secret: String,

    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    #[serde(default = "default_dialog_url")]
    pub dialog_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfiguration {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfiguration {
    #[serde(default = "default_schedule_dir")]
    pub output_dir: PathBuf,
}

impl Default for ScheduleConfiguration {
    fn default() -> Self {
        Self {
            output_dir: default_schedule_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfiguration {
    /// Rewrites are disabled when unset
    pub api_key: Option<String>,

    #[serde(default = "default_ai_base_url")]
    pub base_url: String,

    #[serde(default = "default_ai_model")]
    pub model: String,
}

impl Default for AiConfiguration {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_state_ttl() -> u64 {
    600
}

fn default_database_url() -> String {
    "sqlite://postdeck.db".to_string()
}

fn default_graph_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_dialog_url() -> String {
    "https://www.facebook.com/v19.0/dialog/oauth".to_string()
}

fn default_schedule_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("postdeck")
        .join("schedules")
}

fn default_ai_base_url() -> String {
    textgen_api::DEFAULT_BASE_URL.to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Configuration {
    pub fn new() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(config::File::with_name("config"));
        }

        builder = builder.add_source(config::Environment::with_prefix("POSTDECK").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(source: &str) -> Configuration {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn minimal_configuration_uses_defaults() {
        let configuration = from_toml(
            r#"
            [oauth]
            redirect_uri = "http://localhost:3000/oauth/callback"
            state_secret = "s3cret"
            "#,
        );

        assert_eq!(configuration.server.port, 8080);
        assert_eq!(configuration.server.state_ttl_seconds, 600);
        assert_eq!(configuration.server.log_format, LogFormat::Pretty);
        assert!(configuration.oauth.facebook.is_none());
        assert!(configuration.oauth.providers.is_empty());
        assert!(configuration.ai.api_key.is_none());
        assert!(configuration.clients.is_empty());
        assert!(configuration.schedule.output_dir.ends_with("postdeck/schedules"));
    }

    #[test]
    fn provider_sections_are_parsed() {
        let configuration = from_toml(
            r#"
            [server]
            log_format = "json"

            [oauth]
            redirect_uri = "http://localhost:3000/oauth/callback"
            state_secret = "s3cret"

            [oauth.facebook]
            client_id = "fb-id"
            client_secret = "fb-secret"

            [oauth.providers.linkedin]
            client_id = "li-id"
            client_secret = "li-secret"
            auth_url = "https://www.linkedin.com/oauth/v2/authorization"
            token_url = "https://www.linkedin.com/oauth/v2/accessToken"
            scopes = ["w_member_social"]

            [[clients]]
            id = "42"
            name = "Beat Studio"
            "#,
        );

        assert_eq!(configuration.server.log_format, LogFormat::Json);
        let facebook = configuration.oauth.facebook.unwrap();
        assert_eq!(facebook.graph_url, "https://graph.facebook.com/v19.0");
        let linkedin = &configuration.oauth.providers["linkedin"];
        assert_eq!(linkedin.scopes, vec!["w_member_social"]);
        assert_eq!(configuration.clients.len(), 1);
        assert_eq!(configuration.clients[0].name, "Beat Studio");
    }
}
