//! Validation result tree and per-category summaries
//!
//! Everything here is serializable; empty collections are skipped so the JSON
//! stays compact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Bucket for catalog-driven spec-compliance checks.
pub const IAB_ANALYSIS_CATEGORY: &str = "iab.analysis";
/// Default bucket for hook contributions that do not name a category.
pub const CUSTOM_ANALYSIS_CATEGORY: &str = "custom.analysis";

/// Maximum number of failure reasons kept per category summary.
pub const SUMMARY_REASON_LIMIT: usize = 5;

/// Outcome of a validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    #[default]
    Pass,
    Fail,
    Info,
}

impl ResultStatus {
    pub fn is_fail(&self) -> bool {
        matches!(self, ResultStatus::Fail)
    }
}

/// Outcome of validating one attribute occurrence (or a missing required one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_support: Vec<Version>,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl AttributeResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_support: Vec::new(),
            status: ResultStatus::Pass,
            reasons: Vec::new(),
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = ResultStatus::Fail;
        self.reasons.push(reason.into());
    }
}

/// All results for one analysis category on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAnalysisResult {
    /// Empty means "the custom bucket" when returned from a hook.
    #[serde(default)]
    pub category: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeResult>,
}

impl NodeAnalysisResult {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            status: ResultStatus::Pass,
            reasons: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// A passing result in `category`.
    pub fn passed(category: impl Into<String>) -> Self {
        Self::new(category)
    }

    /// A failing result in `category` with one reason.
    pub fn failed(category: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(category);
        result.mark_failure([reason.into()]);
        result
    }

    /// An informational result in `category` with one reason.
    pub fn info(category: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(category);
        result.status = ResultStatus::Info;
        result.push_reason(reason.into());
        result
    }

    /// Flip to fail and append reasons. A failed bucket never goes back to pass.
    pub fn mark_failure<I>(&mut self, reasons: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.status = ResultStatus::Fail;
        for reason in reasons {
            self.push_reason(reason.into());
        }
    }

    pub fn add_attribute(&mut self, result: AttributeResult) {
        self.attributes.push(result);
    }

    fn push_reason(&mut self, reason: String) {
        if reason.is_empty() || self.reasons.contains(&reason) {
            return;
        }
        self.reasons.push(reason);
    }

    /// Fold a later contribution for the same category into this bucket.
    pub fn merge(&mut self, other: NodeAnalysisResult) {
        self.attributes.extend(other.attributes);
        match other.status {
            ResultStatus::Fail => self.mark_failure(other.reasons),
            ResultStatus::Info => {
                if self.status == ResultStatus::Pass {
                    self.status = ResultStatus::Info;
                }
                for reason in other.reasons {
                    self.push_reason(reason);
                }
            }
            ResultStatus::Pass => {}
        }
    }
}

/// Result for one parsed node, mirroring the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    pub node: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_support: Vec<Version>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub analyses: BTreeMap<String, NodeAnalysisResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeResult>,
}

impl NodeResult {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            version_support: Vec::new(),
            analyses: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Bucket for `category`, created as passing if absent.
    pub fn analysis_mut(&mut self, category: &str) -> &mut NodeAnalysisResult {
        self.analyses
            .entry(category.to_string())
            .or_insert_with(|| NodeAnalysisResult::new(category))
    }

    pub fn analysis(&self, category: &str) -> Option<&NodeAnalysisResult> {
        self.analyses.get(category)
    }

    /// Merge a hook contribution; an empty category lands in the custom bucket.
    pub fn merge_analysis(&mut self, mut analysis: NodeAnalysisResult) {
        if analysis.category.is_empty() {
            analysis.category = CUSTOM_ANALYSIS_CATEGORY.to_string();
        }
        match self.analyses.get_mut(&analysis.category) {
            Some(existing) => existing.merge(analysis),
            None => {
                self.analyses.insert(analysis.category.clone(), analysis);
            }
        }
    }

    /// First node named `name` in a pre-order walk.
    pub fn find(&self, name: &str) -> Option<&NodeResult> {
        if self.node == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Every node named `name`, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a NodeResult> {
        let mut found = Vec::new();
        self.walk(&mut |node| {
            if node.node == name {
                found.push(node);
            }
        });
        found
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NodeResult)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Whole-tree roll-up for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub total_nodes: usize,
    pub failing_nodes: usize,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl CategorySummary {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            total_nodes: 0,
            failing_nodes: 0,
            status: ResultStatus::Pass,
            reasons: Vec::new(),
        }
    }
}

/// The value returned by a successful validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub version: Version,
    pub root: NodeResult,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub summaries: BTreeMap<String, CategorySummary>,
}

impl ValidationResult {
    pub fn new(version: Version, root: NodeResult) -> Self {
        let summaries = summarize_categories(&root);
        Self {
            version,
            root,
            summaries,
        }
    }

    /// True when no category summary failed.
    pub fn passed(&self) -> bool {
        self.summaries.values().all(|summary| !summary.status.is_fail())
    }

    pub fn failing_categories(&self) -> Vec<&str> {
        self.summaries
            .values()
            .filter(|summary| summary.status.is_fail())
            .map(|summary| summary.category.as_str())
            .collect()
    }

    pub fn summary(&self, category: &str) -> Option<&CategorySummary> {
        self.summaries.get(category)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Roll node buckets up per category. Reasons are sampled in pre-order and
/// capped at [`SUMMARY_REASON_LIMIT`].
pub fn summarize_categories(root: &NodeResult) -> BTreeMap<String, CategorySummary> {
    let mut summaries: BTreeMap<String, CategorySummary> = BTreeMap::new();

    root.walk(&mut |node| {
        for (category, analysis) in &node.analyses {
            let summary = summaries
                .entry(category.clone())
                .or_insert_with(|| CategorySummary::new(category));
            summary.total_nodes += 1;
            if !analysis.status.is_fail() {
                continue;
            }
            summary.failing_nodes += 1;
            summary.status = ResultStatus::Fail;
            for reason in &analysis.reasons {
                if summary.reasons.len() >= SUMMARY_REASON_LIMIT {
                    break;
                }
                summary.reasons.push(reason.clone());
            }
        }
    });

    summaries
}
