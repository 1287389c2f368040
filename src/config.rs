use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub captcha: CaptchaConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    #[serde(default = "default_jwt_secret")]
    pub secret: String,
    #[serde(default)]
    pub previous_secrets: Vec<String>,
    #[serde(default = "default_token_expire")]
    pub token_expire_minutes: u64,
    #[serde(default)]
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Whether freshly uploaded files are visible to other users.
    #[serde(default = "default_shared_by_default")]
    pub shared_by_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_scanner_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_scanner_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default = "default_captcha_url")]
    pub verify_url: String,
    /// Empty secret disables the bot check.
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_captcha_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Per-IP requests allowed on /signup and /login, per minute.
    #[serde(default = "default_auth_per_minute")]
    pub auth_per_minute: u32,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_db_path() -> String {
    "data/safeshare.db".to_string()
}

fn default_jwt_secret() -> String {
    // Replaced by a persisted random secret at startup if left as-is
    "change-this-secret".to_string()
}

fn default_token_expire() -> u64 {
    60 // 1 hour
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_shared_by_default() -> bool {
    true
}

fn default_scanner_url() -> String {
    "https://www.virustotal.com/api/v3".to_string()
}

fn default_scanner_timeout() -> u64 {
    30
}

fn default_captcha_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

fn default_captcha_timeout() -> u64 {
    10
}

fn default_auth_per_minute() -> u32 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
            previous_secrets: Vec::new(),
            token_expire_minutes: default_token_expire(),
            cookie_secure: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            shared_by_default: default_shared_by_default(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_url: default_scanner_url(),
            api_key: String::new(),
            timeout_secs: default_scanner_timeout(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            verify_url: default_captcha_url(),
            secret_key: String::new(),
            timeout_secs: default_captcha_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_per_minute: default_auth_per_minute(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            jwt: JwtConfig::default(),
            storage: StorageConfig::default(),
            scanner: ScannerConfig::default(),
            captcha: CaptchaConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        config.ensure_jwt_secret()?;
        Ok(config)
    }

    /// Load configuration from conf.ini or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["conf.ini", "config.toml", "data/conf.ini", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Ensure JWT secret is secure and persisted
    fn ensure_jwt_secret(&mut self) -> anyhow::Result<()> {
        if self.jwt.secret == default_jwt_secret() || self.jwt.secret.is_empty() {
            let secret_path = Path::new("data/.jwt_secret");

            if secret_path.exists() {
                let secret = fs::read_to_string(secret_path)?;
                self.jwt.secret = secret.trim().to_string();
                tracing::info!("Loaded persisted JWT secret from data/.jwt_secret");
            } else {
                let secret = uuid::Uuid::new_v4().to_string();

                if let Some(parent) = secret_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                fs::write(secret_path, &secret)?;
                self.jwt.secret = secret;
                tracing::info!("Generated and persisted new JWT secret to data/.jwt_secret");
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Format: SS_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("SS_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("SS_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        if let Ok(val) = env::var("SS_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        if let Ok(val) = env::var("SS_CONF_JWT_SECRET") {
            self.jwt.secret = val;
        }
        if let Ok(val) = env::var("SS_CONF_JWT_PREVIOUS_SECRETS") {
            self.jwt.previous_secrets = val
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
        }
        if let Ok(val) = env::var("SS_CONF_JWT_TOKEN_EXPIRE") {
            if let Ok(minutes) = val.parse() {
                self.jwt.token_expire_minutes = minutes;
            }
        }
        if let Ok(val) = env::var("SS_CONF_JWT_COOKIE_SECURE") {
            if let Ok(v) = val.parse() {
                self.jwt.cookie_secure = v;
            }
        }

        if let Ok(val) = env::var("SS_CONF_STORAGE_UPLOAD_DIR") {
            self.storage.upload_dir = val;
        }
        if let Ok(val) = env::var("SS_CONF_STORAGE_SHARED_BY_DEFAULT") {
            if let Ok(v) = val.parse() {
                self.storage.shared_by_default = v;
            }
        }

        if let Ok(val) = env::var("SS_CONF_SCANNER_API_URL") {
            self.scanner.api_url = val;
        }
        if let Ok(val) = env::var("SS_CONF_SCANNER_API_KEY") {
            self.scanner.api_key = val;
        }
        if let Ok(val) = env::var("SS_CONF_SCANNER_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.scanner.timeout_secs = secs;
            }
        }

        if let Ok(val) = env::var("SS_CONF_CAPTCHA_VERIFY_URL") {
            self.captcha.verify_url = val;
        }
        if let Ok(val) = env::var("SS_CONF_CAPTCHA_SECRET_KEY") {
            self.captcha.secret_key = val;
        }

        if let Ok(val) = env::var("SS_CONF_RATE_LIMIT_AUTH_PER_MINUTE") {
            if let Ok(n) = val.parse() {
                self.rate_limit.auth_per_minute = n;
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        fs::create_dir_all(&self.storage.upload_dir)?;

        Ok(())
    }
}
