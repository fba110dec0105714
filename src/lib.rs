//! # vast-validator Library
//!
//! Structural and extensible validation of VAST ad-serving documents. A
//! document is parsed into a generic tree, checked against a versioned schema
//! catalog and handed to caller-registered hooks, including a built-in probe
//! that checks media assets over HTTP. The outcome is a per-node, per-category
//! result tree with whole-document summaries.

pub mod catalog;
pub mod config;
pub mod error;
pub mod hooks;
pub mod http_client;
pub mod parser;
pub mod probe;
pub mod result;
pub mod validator;
pub mod version;

pub use catalog::{AttributeSpec, Catalog, ChildSpec, NodeSpec};
pub use config::{Config, ConfigManager, EnvProvider, SystemEnvProvider};
pub use error::{ConfigError, HookError, ProbeError, Result, ValidationError};
pub use hooks::{Hook, HookRegistry, NetworkInspector, NodeContext, NodeInspector};
pub use http_client::{DEFAULT_HOOK_TIMEOUT, HttpClientConfig, HttpValidationOptions};
pub use parser::{Attribute, Node, parse_document};
pub use probe::{MediaFileProbe, normalize_probe_url, probe_media_url};
pub use result::{
    AttributeResult, CUSTOM_ANALYSIS_CATEGORY, CategorySummary, IAB_ANALYSIS_CATEGORY,
    NodeAnalysisResult, NodeResult, ResultStatus, ValidationResult,
};
pub use validator::{ValidationOptions, Validator};
pub use version::Version;

/// Validate `raw` with the default catalog and the built-in hooks.
///
/// Builds a fresh [`Validator`] per call; hold one yourself to register hooks
/// or reuse the HTTP connection pool.
pub async fn validate(raw: &[u8], options: &ValidationOptions) -> Result<ValidationResult> {
    Validator::new()?.validate(raw, options).await
}
