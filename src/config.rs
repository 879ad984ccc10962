use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_SUPABASE_BUCKET: &str = "documents";
const DEFAULT_SUPABASE_TIMEOUT_SECS: u64 = 30;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document summary service.
///
/// Loaded once at process start and handed to the components that need it; nothing reads the
/// environment after construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Gemini `generateContent` endpoint.
    pub gemini_api_key: String,
    /// Model identifier used for every summarization request.
    pub gemini_model: String,
    /// Base URL of the Gemini API.
    pub gemini_base_url: String,
    /// Timeout applied to each individual remote call.
    pub gemini_timeout: Duration,
    /// Maximum attempts (first try included) for a single summarization call.
    pub gemini_max_attempts: u32,
    /// Initial backoff between summarization retries; doubles on each attempt.
    pub gemini_backoff: Duration,
    /// Overall deadline for one upload request.
    pub request_deadline: Duration,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Hosted persistence backend; `None` selects the in-memory store.
    pub supabase: Option<SupabaseConfig>,
    /// Directory holding temporary copies of uploaded files during extraction.
    pub upload_dir: PathBuf,
    /// Tesseract language model passed to OCR.
    pub ocr_language: String,
    /// Path or name of the tesseract executable.
    pub tesseract_bin: String,
}

/// Connection settings for the Supabase persistence backend.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Service or anon key sent as `apikey` and bearer token.
    pub api_key: String,
    /// Storage bucket receiving the original uploads.
    pub bucket: String,
    /// Timeout applied to each Storage or PostgREST call.
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gemini_api_key: load_env("GEMINI_API_KEY")?,
            gemini_model: load_env_optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: load_env_optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_timeout: Duration::from_secs(parse_optional("GEMINI_TIMEOUT_SECS")?.unwrap_or(60)),
            gemini_max_attempts: parse_optional("GEMINI_MAX_ATTEMPTS")?
                .unwrap_or(3u32)
                .max(1),
            gemini_backoff: Duration::from_millis(parse_optional("GEMINI_BACKOFF_MS")?.unwrap_or(500)),
            request_deadline: Duration::from_secs(
                parse_optional("REQUEST_DEADLINE_SECS")?.unwrap_or(600),
            ),
            server_port: parse_optional("PORT")?,
            supabase: load_supabase()?,
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            ocr_language: load_env_optional("OCR_LANGUAGE").unwrap_or_else(|| "eng".to_string()),
            tesseract_bin: load_env_optional("TESSERACT_BIN")
                .unwrap_or_else(|| "tesseract".to_string()),
        })
    }
}

fn load_supabase() -> Result<Option<SupabaseConfig>, ConfigError> {
    match (load_env_optional("SUPABASE_URL"), load_env_optional("SUPABASE_KEY")) {
        (Some(url), Some(api_key)) => Ok(Some(SupabaseConfig {
            url,
            api_key,
            bucket: load_env_optional("SUPABASE_BUCKET")
                .unwrap_or_else(|| DEFAULT_SUPABASE_BUCKET.to_string()),
            timeout: Duration::from_secs(
                parse_optional("SUPABASE_TIMEOUT_SECS")?.unwrap_or(DEFAULT_SUPABASE_TIMEOUT_SECS),
            ),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingVariable("SUPABASE_KEY".into())),
        (None, Some(_)) => Err(ConfigError::MissingVariable("SUPABASE_URL".into())),
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Load `.env` into the process environment when present. Existing variables win.
///
/// Call before installing the tracing subscriber so `RUST_LOG` and `DOCSUM_LOG_FILE` from `.env`
/// take effect.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load `.env` (when present) and read configuration from the environment.
///
/// Emits a debug event describing the result, so install tracing first.
pub fn init_config() -> Result<Config, ConfigError> {
    load_dotenv();
    let config = Config::from_env()?;
    log_loaded(&config);
    Ok(config)
}

fn log_loaded(config: &Config) {
    tracing::debug!(
        model = %config.gemini_model,
        base_url = %config.gemini_base_url,
        server_port = ?config.server_port,
        supabase = config.supabase.is_some(),
        upload_dir = %config.upload_dir.display(),
        "Loaded configuration"
    );
}

#[cfg(test)]
impl Config {
    /// Configuration suitable for unit tests; points the Gemini client at `base_url`.
    pub(crate) fn for_tests(base_url: &str, upload_dir: PathBuf) -> Self {
        Self {
            gemini_api_key: "test-key".into(),
            gemini_model: "gemini-test".into(),
            gemini_base_url: base_url.to_string(),
            gemini_timeout: Duration::from_secs(5),
            gemini_max_attempts: 1,
            gemini_backoff: Duration::from_millis(1),
            request_deadline: Duration::from_secs(30),
            server_port: None,
            supabase: None,
            upload_dir,
            ocr_language: "eng".into(),
            tesseract_bin: "tesseract".into(),
        }
    }
}
