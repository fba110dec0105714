mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use reqwest::Client;
use vast_validator::{
    CUSTOM_ANALYSIS_CATEGORY, HookError, HookRegistry, NetworkInspector, NodeAnalysisResult,
    NodeContext, ResultStatus, ValidationOptions, ValidationResult, probe_media_url,
};

async fn validate_media_file(url: &str, media_type: &str) -> ValidationResult {
    let validator = validator_with(HookRegistry::with_builtins());
    validator
        .validate(
            media_file_document(url, media_type).as_bytes(),
            &ValidationOptions::default(),
        )
        .await
        .unwrap()
}

fn custom(result: &ValidationResult) -> &NodeAnalysisResult {
    find_node(&result.root, "MediaFile")
        .analysis(CUSTOM_ANALYSIS_CATEGORY)
        .expect("expected custom analysis on MediaFile")
}

#[tokio::test]
async fn test_probe_reports_http_404() {
    let server = MockHttpServer::fixed(MockResponse::status(404)).await;
    let result = validate_media_file(&server.url("/video.mp4"), "video/mp4").await;

    let analysis = custom(&result);
    assert_eq!(analysis.status, ResultStatus::Fail);
    assert_eq!(analysis.reasons, ["media file responded with HTTP 404"]);
    assert_eq!(result.failing_categories(), [CUSTOM_ANALYSIS_CATEGORY]);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "HEAD");
    assert_eq!(requests[0].path, "/video.mp4");
}

#[tokio::test]
async fn test_probe_passes_on_matching_content_type() {
    let server =
        MockHttpServer::fixed(MockResponse::with_content_type(200, "Video/MP4; codecs=avc1")).await;
    let result = validate_media_file(&server.url("/video.mp4"), "video/mp4").await;

    assert_eq!(custom(&result).status, ResultStatus::Pass);
    assert!(result.passed());
}

#[tokio::test]
async fn test_probe_flags_content_type_mismatch() {
    let server = MockHttpServer::fixed(MockResponse::with_content_type(200, "text/html")).await;
    let result = validate_media_file(&server.url("/video.mp4"), "video/mp4").await;

    let analysis = custom(&result);
    assert_eq!(analysis.status, ResultStatus::Fail);
    assert_eq!(
        analysis.reasons,
        ["content type mismatch: expected video/mp4, got text/html"]
    );
}

#[tokio::test]
async fn test_missing_response_content_type_is_not_penalized() {
    let server = MockHttpServer::fixed(MockResponse::status(200)).await;
    let result = validate_media_file(&server.url("/video.mp4"), "video/mp4").await;

    assert_eq!(custom(&result).status, ResultStatus::Pass);
}

#[tokio::test]
async fn test_probe_falls_back_to_ranged_get() {
    let server =
        MockHttpServer::head_not_allowed(MockResponse::with_content_type(206, "video/mp4")).await;
    let result = validate_media_file(&server.url("/video.mp4"), "video/mp4").await;

    assert_eq!(custom(&result).status, ResultStatus::Pass);

    let requests = server.requests();
    let methods: Vec<_> = requests.iter().map(|r| r.method.as_str()).collect();
    assert_eq!(methods, ["HEAD", "GET"]);
    assert_eq!(requests[1].range.as_deref(), Some("bytes=0-0"));
}

#[tokio::test]
async fn test_probe_media_url_returns_final_response() {
    let server = MockHttpServer::head_not_allowed(MockResponse::status(200)).await;
    let client = Client::builder().no_proxy().build().unwrap();

    let response = probe_media_url(&client, &format!("  {}  ", server.url("/a.mp4")))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_unreachable_host_is_a_node_local_failure() {
    // bind then drop to get a port nobody listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let result = validate_media_file(&format!("http://127.0.0.1:{port}/a.mp4"), "video/mp4").await;

    let analysis = custom(&result);
    assert_eq!(analysis.status, ResultStatus::Fail);
    let reason = analysis.reasons[0].to_ascii_lowercase();
    assert!(reason.starts_with("media file request failed:"));
    assert!(
        reason.contains("refused") || reason.contains("connect"),
        "cause missing from {reason:?}"
    );
    // structural checks are unaffected
    assert_iab_status(&result.root, "MediaFile", ResultStatus::Pass);
}

#[tokio::test]
async fn test_network_hook_timeout_is_recorded() {
    let server = MockHttpServer::silent().await;
    let validator = validator_with(HookRegistry::with_builtins())
        .with_http_options(loopback_http(Duration::from_millis(200)));

    let result = validator
        .validate(
            media_file_document(&server.url("/slow.mp4"), "video/mp4").as_bytes(),
            &ValidationOptions::default(),
        )
        .await
        .unwrap();

    let analysis = custom(&result);
    assert_eq!(analysis.status, ResultStatus::Fail);
    assert_eq!(analysis.reasons, ["network validator timed out after 200ms"]);
}

#[tokio::test]
async fn test_per_call_http_options_override_validator() {
    let server = MockHttpServer::silent().await;
    let validator = validator_with(HookRegistry::with_builtins());
    let options =
        ValidationOptions::default().with_http_options(loopback_http(Duration::from_millis(100)));

    let result = validator
        .validate(
            media_file_document(&server.url("/slow.mp4"), "video/mp4").as_bytes(),
            &options,
        )
        .await
        .unwrap();

    assert_eq!(
        custom(&result).reasons,
        ["network validator timed out after 100ms"]
    );
}

#[tokio::test]
async fn test_disabled_network_validators_skip_probe() {
    let server = MockHttpServer::fixed(MockResponse::status(404)).await;
    let validator = validator_with(HookRegistry::with_builtins());

    let result = validator
        .validate(
            media_file_document(&server.url("/video.mp4"), "video/mp4").as_bytes(),
            &ValidationOptions::default().disable_network_validators(),
        )
        .await
        .unwrap();

    assert!(
        find_node(&result.root, "MediaFile")
            .analysis(CUSTOM_ANALYSIS_CATEGORY)
            .is_none()
    );
    assert!(server.requests().is_empty());
}

struct RejectingInspector;

#[async_trait]
impl NetworkInspector for RejectingInspector {
    async fn inspect(
        &self,
        _ctx: &NodeContext<'_>,
        _client: &Client,
    ) -> Result<Option<NodeAnalysisResult>, HookError> {
        Err(HookError::Failed("tracker endpoint rejected".to_string()))
    }
}

#[tokio::test]
async fn test_network_hook_error_becomes_custom_failure() {
    let hooks = HookRegistry::new();
    hooks.register_network("Impression", RejectingInspector);
    let validator = validator_with(hooks);

    let raw = br#"<VAST version="4.2"><Ad><InLine><Impression>https://t.example/i</Impression><Impression>https://t.example/j</Impression></InLine></Ad></VAST>"#;
    let result = validator
        .validate(raw, &ValidationOptions::default())
        .await
        .unwrap();

    let impressions = result.root.find_all("Impression");
    assert_eq!(impressions.len(), 2);
    for impression in impressions {
        let analysis = impression.analysis(CUSTOM_ANALYSIS_CATEGORY).unwrap();
        assert_eq!(analysis.reasons, ["tracker endpoint rejected"]);
    }

    let summary = result.summary(CUSTOM_ANALYSIS_CATEGORY).unwrap();
    assert_eq!(summary.failing_nodes, 2);
    // duplicate reasons across nodes are all sampled
    assert_eq!(summary.reasons.len(), 2);
}

#[tokio::test]
async fn test_shared_validator_runs_concurrently() {
    let server =
        MockHttpServer::fixed(MockResponse::with_content_type(200, "video/mp4")).await;
    let validator = Arc::new(validator_with(HookRegistry::with_builtins()));
    let raw = media_file_document(&server.url("/video.mp4"), "video/mp4");

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let validator = Arc::clone(&validator);
            let raw = raw.clone();
            tokio::spawn(async move {
                validator
                    .validate(raw.as_bytes(), &ValidationOptions::default())
                    .await
                    .unwrap()
            })
        })
        .collect();

    for outcome in futures::future::join_all(tasks).await {
        let result = outcome.unwrap();
        assert!(result.passed());
    }
    assert_eq!(server.requests().len(), 4);
}
