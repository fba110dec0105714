use thiserror::Error;

/// Call-level error: no `ValidationResult` is produced when one of these is returned.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Empty XML document")]
    EmptyDocument,

    #[error("Malformed XML: {details}")]
    MalformedXml { details: String },

    #[error("Root element must be {expected}, found {found}")]
    InvalidRoot { expected: String, found: String },

    #[error("Missing VAST version attribute")]
    MissingVersion,

    #[error("Catalog is missing the root element spec: {root}")]
    CatalogMissingRoot { root: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration and catalog file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Asset probe failures. These never abort a validation pass; they are
/// recorded as failure reasons on the probed node.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("media URL is empty")]
    EmptyUrl,

    #[error("invalid media URL {url:?}: {details}")]
    InvalidUrl { url: String, details: String },

    #[error("invalid media URL {url:?}: missing scheme or host")]
    MissingSchemeOrHost { url: String },

    #[error("unsupported media URL scheme {scheme:?}")]
    UnsupportedScheme { scheme: String },

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Errors raised by network hooks
#[derive(Error, Debug)]
pub enum HookError {
    #[error("network validator timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{0}")]
    Failed(String),
}

impl From<ConfigError> for ValidationError {
    fn from(err: ConfigError) -> Self {
        ValidationError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
