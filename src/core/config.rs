use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub client: ClientConfig,
    pub datastore: DatastoreConfig,
    pub database: Option<DatabaseConfig>,
    pub webhook: WebhookConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
    /// Directory served for static assets (favicon, css, bundles)
    pub public_dir: String,
    /// Honor X-Forwarded-* headers set by the fronting proxy
    pub trust_proxy: bool,
    /// Redirect plain-http requests to https (needs `trust_proxy`)
    pub https_redirect: bool,
    /// Bearer token required on `/api` routes; open API when unset
    pub api_token: Option<String>,
    /// Crash reporting DSN; panics are always reported to the error log
    pub crash_report_dsn: Option<String>,
}

/// Values embedded into the HTML shell as global client state
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub org_name: String,
    pub sentry_dsn_public: String,
    pub use_oauth: bool,
    pub algolia_api_key: String,
    pub faq_views: String,
    pub lean_cli_have_staging: String,
    pub webpack_dev_server: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatastoreBackend {
    LeanCloud,
    Postgres,
    Memory,
}

impl std::str::FromStr for DatastoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leancloud" => Ok(Self::LeanCloud),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown DATASTORE_BACKEND: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatastoreConfig {
    pub backend: DatastoreBackend,
    pub leancloud: LeanCloudConfig,
}

/// Credentials for the LeanCloud-compatible document store REST API
#[derive(Debug, Clone, Default)]
pub struct LeanCloudConfig {
    pub app_id: String,
    pub app_key: String,
    pub master_key: Option<String>,
    pub server_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub delivery_timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Read an env var, treating empty values as unset
fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_bool(key: &str, default: bool) -> Result<bool, String> {
    match non_empty(key) {
        None => Ok(default),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("{} must be a boolean", key)),
        },
    }
}

impl Config {
    /// Reads the process environment; `.env` is loaded by `main` beforehand
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let datastore = DatastoreConfig::from_env(database.is_some())?;

        if datastore.backend == DatastoreBackend::Postgres && database.is_none() {
            return Err("DATASTORE_BACKEND=postgres requires DATABASE_URL".to_string());
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            client: ClientConfig::from_env(),
            datastore,
            database,
            webhook: WebhookConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1MB
    const DEFAULT_PORT: u16 = 8080;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        // The hosting platform injects LEANCLOUD_APP_PORT; PORT is the generic fallback
        let port = match non_empty("LEANCLOUD_APP_PORT").or_else(|| non_empty("PORT")) {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| format!("Invalid PORT: {}", e))?,
            None => Self::DEFAULT_PORT,
        };

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        let public_dir = env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".to_string());

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
            public_dir,
            trust_proxy: parse_bool("TRUST_PROXY", true)?,
            https_redirect: parse_bool("HTTPS_REDIRECT", false)?,
            api_token: non_empty("API_TOKEN"),
            crash_report_dsn: non_empty("SENTRY_DSN"),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: Self::DEFAULT_PORT,
            cors_allowed_origins: vec!["*".to_string()],
            max_request_body_size: Self::DEFAULT_MAX_REQUEST_BODY_SIZE,
            public_dir: "public".to_string(),
            trust_proxy: true,
            https_redirect: false,
            api_token: None,
            crash_report_dsn: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            org_name: env::var("ORG_NAME").unwrap_or_default(),
            sentry_dsn_public: env::var("SENTRY_DSN_PUBLIC").unwrap_or_default(),
            use_oauth: non_empty("OAUTH_KEY").is_some(),
            algolia_api_key: env::var("ALGOLIA_API_KEY").unwrap_or_default(),
            faq_views: env::var("FAQ_VIEWS").unwrap_or_default(),
            lean_cli_have_staging: env::var("LEAN_CLI_HAVE_STAGING").unwrap_or_default(),
            webpack_dev_server: env::var("WEBPACK_DEV_SERVER").unwrap_or_default(),
        }
    }
}

impl DatastoreConfig {
    const DEFAULT_SERVER_URL: &'static str = "https://api.leancloud.cn";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

    pub fn from_env(has_database: bool) -> Result<Self, String> {
        let app_id = non_empty("LEANCLOUD_APP_ID");

        // Explicit backend wins; otherwise pick whatever is configured
        let backend = match non_empty("DATASTORE_BACKEND") {
            Some(b) => b.parse()?,
            None if app_id.is_some() => DatastoreBackend::LeanCloud,
            None if has_database => DatastoreBackend::Postgres,
            None => DatastoreBackend::Memory,
        };

        let request_timeout_secs = env::var("LEANCLOUD_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "LEANCLOUD_REQUEST_TIMEOUT_SECS must be a valid number".to_string())?;

        let leancloud = LeanCloudConfig {
            app_id: app_id.unwrap_or_default(),
            app_key: env::var("LEANCLOUD_APP_KEY").unwrap_or_default(),
            master_key: non_empty("LEANCLOUD_APP_MASTER_KEY"),
            server_url: non_empty("LEANCLOUD_API_SERVER")
                .unwrap_or_else(|| Self::DEFAULT_SERVER_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout: Duration::from_secs(request_timeout_secs),
        };

        if backend == DatastoreBackend::LeanCloud
            && (leancloud.app_id.is_empty() || leancloud.app_key.is_empty())
        {
            return Err(
                "LEANCLOUD_APP_ID and LEANCLOUD_APP_KEY are required for the leancloud backend"
                    .to_string(),
            );
        }

        Ok(Self { backend, leancloud })
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    /// Returns `None` when DATABASE_URL is not set
    pub fn from_env() -> Result<Option<Self>, String> {
        let Some(url) = non_empty("DATABASE_URL") else {
            return Ok(None);
        };

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Some(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        }))
    }
}

impl WebhookConfig {
    const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let timeout_secs = env::var("WEBHOOK_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_DELIVERY_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "WEBHOOK_TIMEOUT_SECS must be a valid number".to_string())?;

        let user_agent = env::var("WEBHOOK_USER_AGENT")
            .unwrap_or_else(|_| format!("helpdesk-webhook/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            delivery_timeout: Duration::from_secs(timeout_secs),
            user_agent,
        })
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(Self::DEFAULT_DELIVERY_TIMEOUT_SECS),
            user_agent: "helpdesk-webhook".to_string(),
        }
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = non_empty("SWAGGER_USERNAME");
        let password = non_empty("SWAGGER_PASSWORD");
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Helpdesk API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Category administration API for the help desk".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}
