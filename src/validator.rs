//! Validation engine
//!
//! Parses a document, checks the root preconditions and then walks the tree
//! once, top-down and depth-first in document order. Every node gets a
//! spec-compliance bucket driven by the catalog plus whatever the registered
//! hooks contribute. Only the root preconditions abort a call; everything else
//! is recorded in the returned result tree.
//!
//! Network hooks are the only suspension points. Each call is bounded by the
//! configured timeout and its failure stays local to the node it ran on.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::catalog::{Catalog, NodeSpec};
use crate::error::{HookError, Result, ValidationError};
use crate::hooks::{HookRegistry, NetworkInspector, NodeContext};
use crate::http_client::{HttpClientConfig, HttpValidationOptions};
use crate::parser::{Node, parse_document};
use crate::result::{
    AttributeResult, CUSTOM_ANALYSIS_CATEGORY, IAB_ANALYSIS_CATEGORY, NodeAnalysisResult,
    NodeResult, ValidationResult,
};
use crate::version::Version;

/// Reason attached to every attribute of a node the catalog does not know.
const UNRECOGNIZED_ATTRIBUTE_REASON: &str = "node is not recognized; attribute cannot be validated";

/// Per-call settings.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Replaces the validator's catalog for this call.
    pub catalog: Option<Arc<Catalog>>,
    /// Run registered hooks at all.
    pub run_custom: bool,
    /// Run network hooks; ignored while `run_custom` is off.
    pub run_network: bool,
    /// Replaces the validator's client and hook timeout for this call.
    pub http: Option<HttpValidationOptions>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            catalog: None,
            run_custom: true,
            run_network: true,
            http: None,
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Skip both synchronous and network hooks.
    pub fn disable_custom_validators(mut self) -> Self {
        self.run_custom = false;
        self.run_network = false;
        self
    }

    /// Skip network hooks only.
    pub fn disable_network_validators(mut self) -> Self {
        self.run_network = false;
        self
    }

    pub fn with_http_options(mut self, http: HttpValidationOptions) -> Self {
        self.http = Some(http);
        self
    }
}

/// Long-lived validator holding a catalog, a hook registry and an HTTP client.
///
/// Cheap to share: the catalog and registry sit behind `Arc`s and the client is
/// reference counted internally.
#[derive(Debug, Clone)]
pub struct Validator {
    catalog: Arc<Catalog>,
    hooks: Arc<HookRegistry>,
    http: HttpValidationOptions,
}

impl Validator {
    /// Default VAST catalog, built-in hooks and a default HTTP client.
    pub fn new() -> Result<Self> {
        let http = HttpValidationOptions::from_config(&HttpClientConfig::default())?;
        Ok(Self::with_parts(
            Catalog::vast(),
            Arc::new(HookRegistry::with_builtins()),
            http,
        ))
    }

    pub fn with_parts(
        catalog: Arc<Catalog>,
        hooks: Arc<HookRegistry>,
        http: HttpValidationOptions,
    ) -> Self {
        Self {
            catalog,
            hooks,
            http,
        }
    }

    pub fn with_registry(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_http_options(mut self, http: HttpValidationOptions) -> Self {
        self.http = http;
        self
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Validate one document.
    ///
    /// Fails only on an empty or malformed document, a root element other than
    /// the catalog's, a blank `version` attribute or a catalog without a root
    /// spec. An unknown version is reported on the root node instead.
    pub async fn validate(
        &self,
        raw: &[u8],
        options: &ValidationOptions,
    ) -> Result<ValidationResult> {
        if raw.is_empty() {
            return Err(ValidationError::EmptyDocument);
        }

        let catalog = options.catalog.as_deref().unwrap_or(self.catalog.as_ref());
        let root = parse_document(raw)?;

        if root.local_name() != catalog.root_element {
            return Err(ValidationError::InvalidRoot {
                expected: catalog.root_element.clone(),
                found: root.local_name().to_string(),
            });
        }

        let declared = root.attribute("version").map(str::trim).unwrap_or_default();
        if declared.is_empty() {
            return Err(ValidationError::MissingVersion);
        }
        let version = Version::parse(declared);

        if catalog.root_spec().is_none() {
            return Err(ValidationError::CatalogMissingRoot {
                root: catalog.root_element.clone(),
            });
        }

        debug!(
            version = %version,
            nodes = root.node_count(),
            "validating document"
        );

        let run_network = options.run_custom && options.run_network;
        let traversal = Traversal {
            catalog,
            hooks: &self.hooks,
            version: &version,
            run_custom: options.run_custom,
            network: run_network.then(|| options.http.as_ref().unwrap_or(&self.http)),
        };

        let mut root_result = traversal.visit(&root, Scope::default()).await;

        if !catalog.known_versions().contains(&version) {
            warn!(version = %version, "unsupported document version");
            root_result
                .analysis_mut(IAB_ANALYSIS_CATEGORY)
                .mark_failure([format!(
                    "Unsupported {} version: {}",
                    catalog.root_element, version
                )]);
        }

        let result = ValidationResult::new(version, root_result);
        debug!(
            passed = result.passed(),
            failing = ?result.failing_categories(),
            "validation finished"
        );
        Ok(result)
    }
}

/// Where a node sits: its parent's spec and whether an ancestor lets unknown
/// children through.
#[derive(Debug, Clone, Copy, Default)]
struct Scope<'a> {
    parent: Option<&'a NodeSpec>,
    unknown_allowed: bool,
}

struct Traversal<'a> {
    catalog: &'a Catalog,
    hooks: &'a HookRegistry,
    version: &'a Version,
    run_custom: bool,
    network: Option<&'a HttpValidationOptions>,
}

impl<'a> Traversal<'a> {
    fn visit(&'a self, node: &'a Node, scope: Scope<'a>) -> BoxFuture<'a, NodeResult> {
        async move {
            let spec = self.catalog.lookup(node.local_name());
            let mut result = self.check_node(node, spec, scope);

            self.apply_hooks(node, &mut result).await;

            let child_scope = Scope {
                parent: spec,
                unknown_allowed: scope.unknown_allowed
                    || spec.is_some_and(|spec| spec.allow_unknown_children),
            };
            for child in &node.children {
                result.children.push(self.visit(child, child_scope).await);
            }
            result
        }
        .boxed()
    }

    fn check_node(&self, node: &Node, spec: Option<&NodeSpec>, scope: Scope<'_>) -> NodeResult {
        let name = node.local_name();
        let mut result = NodeResult::new(name);
        if let Some(spec) = spec {
            result.version_support = spec.versions.clone();
        }

        let analysis = result.analysis_mut(IAB_ANALYSIS_CATEGORY);
        if scope.unknown_allowed {
            return result;
        }

        let root = &self.catalog.root_element;
        let version = self.version;
        match spec {
            None => analysis.mark_failure([format!("node {name} is not recognized in catalog")]),
            Some(spec) => {
                if !spec.supports_version(version) {
                    analysis.mark_failure([format!(
                        "node {name} is not supported in {root} {version}"
                    )]);
                }
                if let Some(parent) = scope.parent {
                    match parent.lookup_child(name) {
                        None => analysis.mark_failure([format!(
                            "node {name} is not a valid child of {}",
                            parent.name
                        )]),
                        Some(child) if !child.supports(version) => {
                            analysis.mark_failure([format!(
                                "node {name} is not allowed for parent {} in {root} {version}",
                                parent.name
                            )])
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        self.check_attributes(node, spec, analysis);
        result
    }

    fn check_attributes(
        &self,
        node: &Node,
        spec: Option<&NodeSpec>,
        analysis: &mut NodeAnalysisResult,
    ) {
        let root = &self.catalog.root_element;
        let version = self.version;

        for attr in &node.attributes {
            let mut outcome = AttributeResult::pass(attr.name.as_str());

            let Some(spec) = spec else {
                record_failure(analysis, &mut outcome, UNRECOGNIZED_ATTRIBUTE_REASON.to_string());
                analysis.add_attribute(outcome);
                continue;
            };

            let Some(attr_spec) = spec.lookup_attribute(&attr.name) else {
                let reason = format!("attribute {} is not allowed on {}", attr.name, spec.name);
                record_failure(analysis, &mut outcome, reason);
                analysis.add_attribute(outcome);
                continue;
            };
            outcome.version_support = attr_spec.versions.clone();

            if !attr_spec.supports(version) {
                let reason = format!("attribute {} is not supported in {root} {version}", attr.name);
                record_failure(analysis, &mut outcome, reason);
            }
            if attr.value.trim().is_empty() && !attr_spec.allow_empty {
                let reason = format!("attribute {} cannot be empty", attr.name);
                record_failure(analysis, &mut outcome, reason);
            }

            analysis.add_attribute(outcome);
        }

        let Some(spec) = spec else {
            return;
        };
        for required in spec.required_attributes() {
            if node.attributes.iter().any(|attr| attr.name == required.name) {
                continue;
            }
            let mut outcome = AttributeResult::pass(required.name.as_str());
            outcome.version_support = required.versions.clone();
            record_failure(
                analysis,
                &mut outcome,
                format!("missing required attribute {}", required.name),
            );
            analysis.add_attribute(outcome);
        }
    }

    async fn apply_hooks(&self, node: &Node, result: &mut NodeResult) {
        if !self.run_custom {
            return;
        }

        let ctx = NodeContext::new(node, self.version);
        for hook in self.hooks.sync_hooks(node.local_name()) {
            if let Some(analysis) = hook.inspect(&ctx) {
                result.merge_analysis(analysis);
            }
        }

        let Some(http) = self.network else {
            return;
        };
        for hook in self.hooks.network_hooks(node.local_name()) {
            match call_network_hook(hook.as_ref(), &ctx, http).await {
                Ok(Some(analysis)) => result.merge_analysis(analysis),
                Ok(None) => {}
                Err(err) => {
                    warn!(node = node.local_name(), error = %err, "network hook failed");
                    result.merge_analysis(NodeAnalysisResult::failed(
                        CUSTOM_ANALYSIS_CATEGORY,
                        err.to_string(),
                    ));
                }
            }
        }
    }
}

fn record_failure(analysis: &mut NodeAnalysisResult, outcome: &mut AttributeResult, reason: String) {
    outcome.fail(reason.clone());
    analysis.mark_failure([reason]);
}

async fn call_network_hook(
    hook: &dyn NetworkInspector,
    ctx: &NodeContext<'_>,
    http: &HttpValidationOptions,
) -> std::result::Result<Option<NodeAnalysisResult>, HookError> {
    let call = hook.inspect(ctx, &http.client);
    if http.timeout.is_zero() {
        return call.await;
    }
    match tokio::time::timeout(http.timeout, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(HookError::Timeout {
            timeout_ms: http.timeout.as_millis() as u64,
        }),
    }
}
