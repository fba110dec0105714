use std::sync::Arc;
use std::time::Duration;

use vast_validator::{
    AttributeSpec, Catalog, ChildSpec, HookRegistry, HttpValidationOptions, IAB_ANALYSIS_CATEGORY,
    NodeAnalysisResult, NodeResult, NodeSpec, ResultStatus, Validator, Version,
};

/// HTTP options that never go through a system proxy.
pub fn loopback_http(timeout: Duration) -> HttpValidationOptions {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpValidationOptions::new(client).with_timeout(timeout)
}

/// Default catalog, the given registry and a loopback-only client.
pub fn validator_with(hooks: HookRegistry) -> Validator {
    Validator::new()
        .unwrap()
        .with_registry(Arc::new(hooks))
        .with_http_options(loopback_http(Duration::from_secs(2)))
}

/// `Root` allows `Child` in 4.2 and `version` on the root in 4.0 - 4.3.
pub fn root_child_catalog() -> Arc<Catalog> {
    let v42 = [Version::V4_2];
    Arc::new(
        Catalog::new("Root")
            .with_node(
                NodeSpec::new("Root", &Version::V4_PLUS)
                    .attribute(AttributeSpec::new("version", &Version::V4_PLUS).required())
                    .child(ChildSpec::new("Child", &v42)),
            )
            .with_node(NodeSpec::new("Child", &v42)),
    )
}

pub fn find_node<'a>(root: &'a NodeResult, name: &str) -> &'a NodeResult {
    root.find(name)
        .unwrap_or_else(|| panic!("expected to find node {name}"))
}

pub fn iab(node: &NodeResult) -> &NodeAnalysisResult {
    node.analysis(IAB_ANALYSIS_CATEGORY)
        .unwrap_or_else(|| panic!("node {} missing IAB analysis", node.node))
}

pub fn assert_iab_status(root: &NodeResult, name: &str, expected: ResultStatus) {
    let analysis = iab(find_node(root, name));
    assert_eq!(
        analysis.status, expected,
        "unexpected status for node {name}: {:?}",
        analysis.reasons
    );
}

/// Minimal inline ad around one media file.
pub fn media_file_document(url: &str, media_type: &str) -> String {
    format!(
        r#"<VAST version="4.2"><Ad><InLine><Creatives><Creative><Linear><MediaFiles><MediaFile delivery="progressive" type="{media_type}" width="1" height="1">{url}</MediaFile></MediaFiles></Linear></Creative></Creatives></InLine></Ad></VAST>"#
    )
}

pub const INLINE_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VAST version="4.2">
  <Ad id="ad-1">
    <InLine>
      <Creatives>
        <Creative id="c1" sequence="1">
          <Linear skipoffset="00:00:05">
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="640" height="360">http://cdn.example.com/asset.mp4</MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#;
