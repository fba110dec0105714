//! Media asset probing
//!
//! Checks that a media URL answers and that its content type matches the one
//! declared on the node, without downloading the payload.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use crate::error::{HookError, ProbeError};
use crate::hooks::{NetworkInspector, NodeContext};
use crate::result::{CUSTOM_ANALYSIS_CATEGORY, NodeAnalysisResult};

/// Range requested when a server refuses HEAD.
pub const PROBE_RANGE_HEADER: &str = "bytes=0-0";

/// Trim and parse a media URL. Scheme-relative URLs are taken as HTTPS.
pub fn normalize_probe_url(raw: &str) -> Result<Url, ProbeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProbeError::EmptyUrl);
    }

    let candidate = if trimmed.starts_with("//") {
        format!("https:{trimmed}")
    } else {
        trimmed.to_string()
    };

    let url = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(_) if !has_scheme(&candidate) => {
            return Err(ProbeError::MissingSchemeOrHost {
                url: trimmed.to_string(),
            });
        }
        Err(err) => {
            return Err(ProbeError::InvalidUrl {
                url: trimmed.to_string(),
                details: err.to_string(),
            });
        }
    };

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ProbeError::MissingSchemeOrHost {
            url: trimmed.to_string(),
        });
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProbeError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
        });
    }

    Ok(url)
}

fn has_scheme(candidate: &str) -> bool {
    let Some((scheme, _)) = candidate.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// HEAD the URL, retrying with a one-byte ranged GET on 405.
pub async fn probe_media_url(client: &Client, raw: &str) -> Result<Response, ProbeError> {
    let url = normalize_probe_url(raw)?;

    let response = client.head(url.clone()).send().await?;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return Ok(response);
    }

    debug!(%url, "HEAD not allowed, retrying with ranged GET");
    let response = client
        .get(url)
        .header(RANGE, PROBE_RANGE_HEADER)
        .send()
        .await?;
    Ok(response)
}

/// Lowercased media type of a response, without parameters.
fn response_media_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// An error and its `source()` chain joined with `": "`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let part = cause.to_string();
        if !message.ends_with(&part) {
            message.push_str(": ");
            message.push_str(&part);
        }
        source = cause.source();
    }
    message
}

/// Built-in network hook for `MediaFile` nodes.
///
/// The node text is the asset URL; the `type` attribute, when present, is the
/// expected content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaFileProbe;

#[async_trait]
impl NetworkInspector for MediaFileProbe {
    async fn inspect(
        &self,
        ctx: &NodeContext<'_>,
        client: &Client,
    ) -> Result<Option<NodeAnalysisResult>, HookError> {
        let url = ctx.text();
        if url.is_empty() {
            return Ok(Some(NodeAnalysisResult::failed(
                CUSTOM_ANALYSIS_CATEGORY,
                "media file URL is empty",
            )));
        }

        let response = match probe_media_url(client, url).await {
            Ok(response) => response,
            Err(err) => {
                return Ok(Some(NodeAnalysisResult::failed(
                    CUSTOM_ANALYSIS_CATEGORY,
                    format!("media file request failed: {}", error_chain(&err)),
                )));
            }
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            return Ok(Some(NodeAnalysisResult::failed(
                CUSTOM_ANALYSIS_CATEGORY,
                format!("media file responded with HTTP {}", status.as_u16()),
            )));
        }

        let declared = ctx.attribute("type").map(str::trim).unwrap_or_default();
        if !declared.is_empty() {
            let actual = response_media_type(&response);
            if !actual.is_empty() && !actual.eq_ignore_ascii_case(declared) {
                return Ok(Some(NodeAnalysisResult::failed(
                    CUSTOM_ANALYSIS_CATEGORY,
                    format!("content type mismatch: expected {declared}, got {actual}"),
                )));
            }
        }

        Ok(Some(NodeAnalysisResult::passed(CUSTOM_ANALYSIS_CATEGORY)))
    }
}
