use serde::{Deserialize, Serialize};

/// Top-level application configuration.
///
/// Loaded once at startup and passed explicitly to the services that need
/// each section. There is no ambient global; every component owns a copy of
/// (or an `Arc` to) the section it was constructed with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub flood: FloodConfig,
    #[serde(default)]
    pub nonce: NonceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub geoip: GeoConfig,
}

impl AppConfig {
    /// Load configuration from `kurz.toml` and environment variables.
    ///
    /// Priority: ENV > kurz.toml > defaults.
    /// ENV prefix: `KURZ`, separator: `__`.
    /// Example: `KURZ__FLOOD__DELAY_SECONDS=30`.
    pub fn load() -> Self {
        use config::{Config, Environment, File};

        dotenvy::dotenv().ok();

        let path = "kurz.toml";

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("KURZ")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<AppConfig>() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// Render the current configuration as pretty TOML.
    pub fn to_sample_toml(&self) -> String {
        toml::to_string_pretty(self)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// Installation-wide site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL short links are built from, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Keywords that can never be assigned to a link.
    #[serde(default = "default_reserved_keywords")]
    pub reserved_keywords: Vec<String>,
    /// Whether several keywords may point at the same long URL.
    #[serde(default)]
    pub allow_duplicate_urls: bool,
    /// Private-mode installations exempt authenticated privileged callers
    /// from flood checks.
    #[serde(default)]
    pub private_mode: bool,
}

impl SiteConfig {
    pub fn is_reserved(&self, keyword: &str) -> bool {
        self.reserved_keywords.iter().any(|r| r == keyword)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reserved_keywords: default_reserved_keywords(),
            allow_duplicate_urls: false,
            private_mode: false,
        }
    }
}

/// Keyword alphabet selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Alphabet size: 36 (digits + lowercase) or 62 (digits + mixed case).
    /// 64 is accepted and treated as 62, a historical misconfiguration.
    #[serde(default = "default_alphabet")]
    pub alphabet: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            alphabet: default_alphabet(),
        }
    }
}

/// Resolver behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound on keyword auto-generation attempts per call.
    #[serde(default = "default_max_generate_attempts")]
    pub max_generate_attempts: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_generate_attempts: default_max_generate_attempts(),
        }
    }
}

/// Write-rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodConfig {
    /// Minimum interval in seconds between link creations from one IP.
    /// Zero disables the check entirely.
    #[serde(default)]
    pub delay_seconds: u64,
    /// IPs or CIDR ranges never throttled.
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            delay_seconds: 0,
            whitelist: Vec::new(),
        }
    }
}

/// Nonce token windowing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceConfig {
    /// Width of a validity window in seconds.
    #[serde(default = "default_nonce_lifetime")]
    pub lifetime_seconds: u64,
    /// Process-wide secret the token digest is keyed with.
    #[serde(default = "default_nonce_secret")]
    pub secret: String,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            lifetime_seconds: default_nonce_lifetime(),
            secret: default_nonce_secret(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_database_pool_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter, e.g. "info" or "kurz=debug".
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; empty or absent logs to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// GeoIP provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Path to a MaxMind GeoLite2 Country/City database, if any.
    #[serde(default)]
    pub maxminddb_path: Option<String>,
    /// Country code returned when no provider can answer.
    #[serde(default)]
    pub default_country: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            maxminddb_path: None,
            default_country: String::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://sho.rt".to_string()
}

fn default_reserved_keywords() -> Vec<String> {
    ["admin", "api", "stats", "assets", "page"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_alphabet() -> u32 {
    36
}

fn default_max_generate_attempts() -> u32 {
    10_000
}

fn default_nonce_lifetime() -> u64 {
    43_200
}

fn default_nonce_secret() -> String {
    "change-me".to_string()
}

fn default_database_url() -> String {
    "sqlite://kurz.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}
