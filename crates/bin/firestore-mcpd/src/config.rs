use clap::{Parser, builder::BoolishValueParser};
use firestore_core::services::{CredentialSource, InitSettings};
use firestore_core::store::RestStoreOptions;
use firestore_mcp::server::DEFAULT_MCP_HTTP_ADDR;
use firestore_store::schema::DEFAULT_DATABASE_ID;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CREDENTIALS_FILE: &str = "serviceAccountKey.json";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "firestore-mcpd", version, about = "Firestore MCP daemon.")]
#[allow(clippy::struct_excessive_bools)]
struct CliArgs {
    #[arg(long, env = "SERVICE_ACCOUNT_KEY_PATH")]
    service_account_key_path: Option<PathBuf>,

    #[arg(long, env = "FIREBASE_STORAGE_BUCKET")]
    storage_bucket: Option<String>,

    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    project_id: Option<String>,

    #[arg(long, env = "FIRESTORE_DATABASE_ID", default_value = DEFAULT_DATABASE_ID)]
    database_id: String,

    #[arg(long, env = "FIRESTORE_EMULATOR_HOST")]
    emulator_host: Option<String>,

    #[arg(long, env = "FIRESTORE_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    #[arg(
        long,
        env = "FIRESTORE_IN_MEMORY",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    in_memory: bool,

    #[arg(
        long = "stdio",
        env = "FIRESTORE_MCP_STDIO",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long = "http",
        env = "FIRESTORE_MCP_HTTP",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_http: bool,

    #[arg(long, env = "FIRESTORE_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(long, env = "FIRESTORE_MCP_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct FirestoreMcpConfig {
    pub credentials_path: PathBuf,
    pub credentials_source: CredentialSource,
    pub storage_bucket: Option<String>,
    pub project_id: Option<String>,
    pub database_id: String,
    pub emulator_host: Option<String>,
    pub request_timeout: Option<Duration>,
    pub in_memory: bool,
    pub enable_stdio: bool,
    pub enable_http: bool,
    pub mcp_http_addr: SocketAddr,
    pub log_filter: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl FirestoreMcpConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    pub fn init_settings(&self) -> InitSettings {
        InitSettings {
            credentials_path: self.credentials_path.clone(),
            credentials_source: self.credentials_source,
            storage_bucket: self.storage_bucket.clone(),
        }
    }

    pub fn rest_options(&self) -> RestStoreOptions {
        RestStoreOptions {
            project_id: self.project_id.clone(),
            database_id: self.database_id.clone(),
            emulator_host: self.emulator_host.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl TryFrom<CliArgs> for FirestoreMcpConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let explicit_path = args
            .service_account_key_path
            .filter(|path| !path.as_os_str().is_empty());
        let (credentials_path, credentials_source) = match explicit_path {
            Some(path) => (path, CredentialSource::Environment),
            None => (default_credentials_path(), CredentialSource::Fallback),
        };

        if args.database_id.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "FIRESTORE_DATABASE_ID",
                value: args.database_id,
            });
        }
        if !args.enable_stdio && !args.enable_http {
            return Err(ConfigError::MissingSetting(
                "FIRESTORE_MCP_STDIO or FIRESTORE_MCP_HTTP",
            ));
        }

        Ok(Self {
            credentials_path,
            credentials_source,
            storage_bucket: non_blank(args.storage_bucket),
            project_id: non_blank(args.project_id),
            database_id: args.database_id,
            emulator_host: non_blank(args.emulator_host),
            request_timeout: args
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            in_memory: args.in_memory,
            enable_stdio: args.enable_stdio,
            enable_http: args.enable_http,
            mcp_http_addr: args.mcp_http_addr,
            log_filter: args.log_filter,
        })
    }
}

/// `serviceAccountKey.json` next to the executable, or in the working
/// directory when the executable path is unknown.
fn default_credentials_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CREDENTIALS_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            service_account_key_path: None,
            storage_bucket: None,
            project_id: None,
            database_id: DEFAULT_DATABASE_ID.to_string(),
            emulator_host: None,
            request_timeout_secs: None,
            in_memory: false,
            enable_stdio: true,
            enable_http: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    #[test]
    fn falls_back_to_local_key_file() {
        let config = FirestoreMcpConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(config.credentials_source, CredentialSource::Fallback);
        assert_eq!(
            config.credentials_path.file_name().and_then(|name| name.to_str()),
            Some(DEFAULT_CREDENTIALS_FILE)
        );
    }

    #[test]
    fn blank_settings_are_treated_as_unset() {
        let mut args = base_args();
        args.service_account_key_path = Some(PathBuf::new());
        args.storage_bucket = Some("  ".to_string());
        args.request_timeout_secs = Some(0);

        let config = FirestoreMcpConfig::try_from(args).expect("config should parse");

        assert_eq!(config.credentials_source, CredentialSource::Fallback);
        assert!(config.storage_bucket.is_none());
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn explicit_key_path_and_overrides_flow_into_store_options() {
        let mut args = base_args();
        args.service_account_key_path = Some(PathBuf::from("/etc/firebase/key.json"));
        args.project_id = Some("other-project".to_string());
        args.request_timeout_secs = Some(10);

        let config = FirestoreMcpConfig::try_from(args).expect("config should parse");
        let options = config.rest_options();

        assert_eq!(config.credentials_source, CredentialSource::Environment);
        assert_eq!(config.init_settings().credentials_path, PathBuf::from("/etc/firebase/key.json"));
        assert_eq!(options.project_id.as_deref(), Some("other-project"));
        assert_eq!(options.request_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn requires_a_transport() {
        let mut args = base_args();
        args.enable_stdio = false;

        assert!(matches!(
            FirestoreMcpConfig::try_from(args),
            Err(ConfigError::MissingSetting(_))
        ));
    }
}
