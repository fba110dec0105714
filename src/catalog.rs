//! Schema catalog
//!
//! The catalog is plain data: a table from element local name to [`NodeSpec`].
//! It is immutable once handed to a validator and can be replaced wholesale,
//! either built in code or loaded from a TOML/JSON file.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::version::Version;

/// A valid attribute for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSpec {
    pub name: String,
    pub versions: Vec<Version>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub allow_empty: bool,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, versions: &[Version]) -> Self {
        Self {
            name: name.into(),
            versions: versions.to_vec(),
            required: false,
            allow_empty: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn supports(&self, version: &Version) -> bool {
        self.versions.contains(version)
    }
}

/// A valid parent/child relationship.
///
/// `multiple` is informational; the engine checks validity and version only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSpec {
    pub name: String,
    pub versions: Vec<Version>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub multiple: bool,
}

impl ChildSpec {
    pub fn new(name: impl Into<String>, versions: &[Version]) -> Self {
        Self {
            name: name.into(),
            versions: versions.to_vec(),
            optional: false,
            multiple: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn supports(&self, version: &Version) -> bool {
        self.versions.contains(version)
    }
}

/// Validation metadata for one element name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub name: String,
    pub versions: Vec<Version>,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeSpec>,
    #[serde(default)]
    pub children: IndexMap<String, ChildSpec>,
    /// When set, every descendant (recognized or not) skips structural checks.
    #[serde(default)]
    pub allow_unknown_children: bool,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, versions: &[Version]) -> Self {
        Self {
            name: name.into(),
            versions: versions.to_vec(),
            attributes: IndexMap::new(),
            children: IndexMap::new(),
            allow_unknown_children: false,
        }
    }

    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.insert(spec.name.clone(), spec);
        self
    }

    pub fn child(mut self, spec: ChildSpec) -> Self {
        self.children.insert(spec.name.clone(), spec);
        self
    }

    pub fn allow_unknown_children(mut self) -> Self {
        self.allow_unknown_children = true;
        self
    }

    pub fn supports_version(&self, version: &Version) -> bool {
        self.versions.contains(version)
    }

    pub fn lookup_attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    pub fn lookup_child(&self, name: &str) -> Option<&ChildSpec> {
        self.children.get(name)
    }

    /// Attribute specs marked required, in declaration order.
    pub fn required_attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.values().filter(|spec| spec.required)
    }
}

/// Node specifications keyed by element local name (case-sensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Name of the element every document must start with.
    #[serde(default = "default_root_element")]
    pub root_element: String,
    #[serde(default)]
    pub nodes: IndexMap<String, NodeSpec>,
}

fn default_root_element() -> String {
    "VAST".to_string()
}

impl Catalog {
    pub fn new(root_element: impl Into<String>) -> Self {
        Self {
            root_element: root_element.into(),
            nodes: IndexMap::new(),
        }
    }

    /// Add (or replace) a node spec.
    pub fn with_node(mut self, spec: NodeSpec) -> Self {
        self.insert(spec);
        self
    }

    pub fn insert(&mut self, spec: NodeSpec) {
        self.nodes.insert(spec.name.clone(), spec);
    }

    pub fn lookup(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    pub fn root_spec(&self) -> Option<&NodeSpec> {
        self.lookup(&self.root_element)
    }

    /// Versions the catalog knows about, as declared by the root spec.
    pub fn known_versions(&self) -> &[Version] {
        self.root_spec()
            .map(|spec| spec.versions.as_slice())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a catalog file; the format follows the extension (TOML first when there is none).
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match Self::from_toml_str(&content) {
                Ok(catalog) => Ok(catalog),
                Err(_) => Self::from_json_str(&content),
            },
        }
    }

    /// The built-in IAB VAST 3.0 - 4.3 catalog, shared across validators.
    pub fn vast() -> Arc<Catalog> {
        static DEFAULT: OnceLock<Arc<Catalog>> = OnceLock::new();
        DEFAULT.get_or_init(|| Arc::new(vast_catalog())).clone()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        vast_catalog()
    }
}

fn leaf(name: &str, versions: &[Version]) -> NodeSpec {
    NodeSpec::new(name, versions)
}

fn attrs(mut spec: NodeSpec, names: &[&str], versions: &[Version]) -> NodeSpec {
    for name in names {
        spec = spec.attribute(AttributeSpec::new(*name, versions));
    }
    spec
}

fn vast_catalog() -> Catalog {
    let all: &[Version] = &Version::SUPPORTED;
    let v4: &[Version] = &Version::V4_PLUS;
    let creative_resources = |spec: NodeSpec| {
        spec.child(ChildSpec::new("StaticResource", all).optional())
            .child(ChildSpec::new("IFrameResource", all).optional())
            .child(ChildSpec::new("HTMLResource", all).optional())
    };

    let mut catalog = Catalog::new("VAST");

    catalog.insert(
        NodeSpec::new("VAST", all)
            .attribute(AttributeSpec::new("version", all).required())
            .child(ChildSpec::new("Ad", all).multiple())
            .child(ChildSpec::new("Error", all).optional().multiple()),
    );
    catalog.insert(
        attrs(
            NodeSpec::new("Ad", all),
            &["id", "sequence", "conditionalAd", "adType"],
            all,
        )
        .child(ChildSpec::new("InLine", all).optional())
        .child(ChildSpec::new("Wrapper", all).optional()),
    );
    catalog.insert(
        NodeSpec::new("InLine", all)
            .child(ChildSpec::new("AdSystem", all))
            .child(ChildSpec::new("Error", all).optional().multiple())
            .child(ChildSpec::new("Impression", all).multiple())
            .child(ChildSpec::new("AdTitle", all))
            .child(ChildSpec::new("AdServingId", all).optional())
            .child(ChildSpec::new("Advertiser", all).optional())
            .child(ChildSpec::new("Category", all).optional().multiple())
            .child(ChildSpec::new("Description", all).optional())
            .child(ChildSpec::new("Extensions", all).optional())
            .child(ChildSpec::new("Pricing", all).optional())
            .child(ChildSpec::new("ViewableImpression", v4).optional())
            .child(ChildSpec::new("Survey", all).optional())
            .child(ChildSpec::new("Expires", all).optional())
            .child(ChildSpec::new("Creatives", all))
            .child(ChildSpec::new("AdVerifications", v4).optional()),
    );
    catalog.insert(
        attrs(
            NodeSpec::new("Wrapper", all),
            &["followAdditionalWrappers", "allowMultipleAds", "fallbackOnNoAd"],
            all,
        )
        .child(ChildSpec::new("AdSystem", all))
        .child(ChildSpec::new("Error", all).optional().multiple())
        .child(ChildSpec::new("Impression", all).multiple())
        .child(ChildSpec::new("VASTAdTagURI", all))
        .child(ChildSpec::new("Extensions", all).optional())
        .child(ChildSpec::new("Pricing", all).optional())
        .child(ChildSpec::new("ViewableImpression", v4).optional())
        .child(ChildSpec::new("Creatives", all).optional())
        .child(ChildSpec::new("BlockedAdCategories", all).optional().multiple())
        .child(ChildSpec::new("AdVerifications", v4).optional()),
    );

    catalog.insert(attrs(leaf("AdSystem", all), &["version"], all));
    catalog.insert(attrs(leaf("Impression", all), &["id"], all));
    catalog.insert(
        leaf("Category", all).attribute(AttributeSpec::new("authority", all).required()),
    );
    catalog.insert(attrs(leaf("BlockedAdCategories", all), &["authority"], all));
    catalog.insert(attrs(leaf("Survey", all), &["type"], all));
    for name in [
        "Error",
        "AdTitle",
        "AdServingId",
        "Advertiser",
        "Description",
        "Expires",
        "VASTAdTagURI",
        "Duration",
        "HTMLResource",
        "IFrameResource",
        "AltText",
        "ClickTracking",
        "CustomClick",
        "NonLinearClickTracking",
        "NonLinearClickThrough",
        "CompanionClickThrough",
        "CompanionClickTracking",
        "IconClickThrough",
        "IconClickTracking",
        "IconViewTracking",
    ] {
        catalog.insert(leaf(name, all));
    }

    catalog.insert(
        NodeSpec::new("Extensions", all)
            .child(ChildSpec::new("Extension", all).optional().multiple()),
    );
    catalog.insert(attrs(
        NodeSpec::new("Extension", all).allow_unknown_children(),
        &["type"],
        all,
    ));
    catalog.insert(
        leaf("Pricing", all)
            .attribute(AttributeSpec::new("model", all).required())
            .attribute(AttributeSpec::new("currency", all).required()),
    );

    catalog.insert(
        NodeSpec::new("ViewableImpression", v4)
            .child(ChildSpec::new("Viewable", v4).optional().multiple())
            .child(ChildSpec::new("NotViewable", v4).optional().multiple())
            .child(ChildSpec::new("ViewUndetermined", v4).optional().multiple()),
    );
    for name in ["Viewable", "NotViewable", "ViewUndetermined", "VerificationParameters"] {
        catalog.insert(leaf(name, v4));
    }
    catalog.insert(
        leaf("UniversalAdId", v4).attribute(AttributeSpec::new("idRegistry", v4).required()),
    );
    catalog.insert(
        NodeSpec::new("AdVerifications", v4)
            .child(ChildSpec::new("Verification", v4).multiple()),
    );
    catalog.insert(
        attrs(NodeSpec::new("Verification", v4), &["vendor"], all)
            .child(ChildSpec::new("JavaScriptResource", v4).optional().multiple())
            .child(ChildSpec::new("ExecutableResource", v4).optional().multiple())
            .child(ChildSpec::new("TrackingEvents", v4).optional())
            .child(ChildSpec::new("VerificationParameters", v4).optional()),
    );
    catalog.insert(attrs(
        leaf("JavaScriptResource", v4),
        &["apiFramework", "browserOptional"],
        all,
    ));
    catalog.insert(attrs(
        leaf("ExecutableResource", v4),
        &["apiFramework", "type"],
        all,
    ));

    catalog.insert(
        NodeSpec::new("Creatives", all).child(ChildSpec::new("Creative", all).multiple()),
    );
    catalog.insert(
        attrs(
            NodeSpec::new("Creative", all),
            &["id", "sequence", "apiFramework", "adId"],
            all,
        )
        .child(ChildSpec::new("Linear", all).optional())
        .child(ChildSpec::new("NonLinearAds", all).optional())
        .child(ChildSpec::new("CompanionAds", all).optional())
        .child(ChildSpec::new("CreativeExtensions", all).optional())
        .child(ChildSpec::new("UniversalAdId", v4).optional().multiple()),
    );

    catalog.insert(
        NodeSpec::new("NonLinearAds", all)
            .child(ChildSpec::new("NonLinear", all).multiple())
            .child(ChildSpec::new("TrackingEvents", all).optional()),
    );
    catalog.insert(
        creative_resources(attrs(
            NodeSpec::new("NonLinear", all)
                .attribute(AttributeSpec::new("width", all).required())
                .attribute(AttributeSpec::new("height", all).required()),
            &[
                "id",
                "expandedWidth",
                "expandedHeight",
                "scalable",
                "maintainAspectRatio",
                "minSuggestedDuration",
                "apiFramework",
            ],
            all,
        ))
        .child(ChildSpec::new("AdParameters", all).optional())
        .child(ChildSpec::new("NonLinearClickTracking", all).optional().multiple())
        .child(ChildSpec::new("NonLinearClickThrough", all).optional()),
    );

    catalog.insert(
        attrs(NodeSpec::new("CompanionAds", all), &["required"], all)
            .child(ChildSpec::new("Companion", all).multiple()),
    );
    catalog.insert(
        creative_resources(attrs(
            NodeSpec::new("Companion", all)
                .attribute(AttributeSpec::new("width", all).required())
                .attribute(AttributeSpec::new("height", all).required()),
            &[
                "id",
                "assetWidth",
                "assetHeight",
                "expandedWidth",
                "expandedHeight",
                "apiFramework",
                "adSlotId",
                "pxratio",
                "renderingMode",
            ],
            all,
        ))
        .child(ChildSpec::new("AdParameters", all).optional())
        .child(ChildSpec::new("AltText", all).optional())
        .child(ChildSpec::new("CompanionClickThrough", all).optional())
        .child(ChildSpec::new("CompanionClickTracking", all).optional().multiple())
        .child(ChildSpec::new("CreativeExtensions", all).optional())
        .child(ChildSpec::new("TrackingEvents", all).optional()),
    );

    catalog.insert(NodeSpec::new("Icons", all).child(ChildSpec::new("Icon", all).multiple()));
    catalog.insert(
        creative_resources(attrs(
            NodeSpec::new("Icon", all),
            &[
                "program",
                "width",
                "height",
                "xPosition",
                "yPosition",
                "duration",
                "offset",
                "apiFramework",
                "pxratio",
            ],
            all,
        ))
        .child(ChildSpec::new("IconClicks", all).optional())
        .child(ChildSpec::new("IconViewTracking", all).optional().multiple()),
    );
    catalog.insert(
        NodeSpec::new("IconClicks", all)
            .child(ChildSpec::new("IconClickFallbackImages", all).optional())
            .child(ChildSpec::new("IconClickThrough", all).optional())
            .child(ChildSpec::new("IconClickTracking", all).optional().multiple()),
    );
    catalog.insert(
        NodeSpec::new("IconClickFallbackImages", all)
            .child(ChildSpec::new("IconClickFallbackImage", all).multiple()),
    );
    catalog.insert(
        attrs(
            NodeSpec::new("IconClickFallbackImage", all),
            &["width", "height"],
            all,
        )
        .child(ChildSpec::new("AltText", all).optional())
        .child(ChildSpec::new("StaticResource", all).optional()),
    );

    catalog.insert(
        NodeSpec::new("CreativeExtensions", all)
            .child(ChildSpec::new("CreativeExtension", all).multiple()),
    );
    catalog.insert(attrs(
        NodeSpec::new("CreativeExtension", all).allow_unknown_children(),
        &["type"],
        all,
    ));
    catalog.insert(attrs(leaf("StaticResource", all), &["creativeType"], all));

    catalog.insert(
        attrs(NodeSpec::new("Linear", all), &["skipoffset"], all)
            .child(ChildSpec::new("Icons", all).optional())
            .child(ChildSpec::new("AdParameters", all).optional())
            .child(ChildSpec::new("Duration", all))
            .child(ChildSpec::new("MediaFiles", all))
            .child(ChildSpec::new("VideoClicks", all).optional())
            .child(ChildSpec::new("TrackingEvents", all).optional()),
    );
    catalog.insert(attrs(leaf("AdParameters", all), &["xmlEncoded"], all));
    catalog.insert(
        NodeSpec::new("MediaFiles", all)
            .child(ChildSpec::new("MediaFile", all).multiple())
            .child(ChildSpec::new("ClosedCaptionFiles", all).optional())
            .child(ChildSpec::new("Mezzanine", all).optional().multiple())
            .child(ChildSpec::new("InteractiveCreativeFile", all).optional().multiple()),
    );
    catalog.insert(attrs(
        leaf("MediaFile", all)
            .attribute(AttributeSpec::new("delivery", all).required())
            .attribute(AttributeSpec::new("type", all).required())
            .attribute(AttributeSpec::new("width", all).required())
            .attribute(AttributeSpec::new("height", all).required()),
        &[
            "id",
            "codec",
            "bitrate",
            "minBitrate",
            "maxBitrate",
            "scalable",
            "maintainAspectRatio",
            "fileSize",
            "mediaType",
            "apiFramework",
        ],
        all,
    ));
    catalog.insert(
        NodeSpec::new("ClosedCaptionFiles", all)
            .child(ChildSpec::new("ClosedCaptionFile", all).multiple()),
    );
    catalog.insert(attrs(
        leaf("ClosedCaptionFile", all),
        &["type", "language"],
        all,
    ));
    catalog.insert(attrs(
        leaf("Mezzanine", all)
            .attribute(AttributeSpec::new("delivery", all).required())
            .attribute(AttributeSpec::new("type", all).required())
            .attribute(AttributeSpec::new("width", all).required())
            .attribute(AttributeSpec::new("height", all).required()),
        &["codec", "fileSize", "mediaType"],
        all,
    ));
    catalog.insert(attrs(
        leaf("InteractiveCreativeFile", all),
        &["type", "apiFramework", "variableDuration"],
        all,
    ));

    catalog.insert(
        NodeSpec::new("VideoClicks", all)
            .child(ChildSpec::new("ClickThrough", all).optional())
            .child(ChildSpec::new("ClickTracking", all).optional().multiple())
            .child(ChildSpec::new("CustomClick", all).optional().multiple()),
    );
    catalog.insert(attrs(leaf("ClickThrough", all), &["id"], all));
    catalog.insert(
        NodeSpec::new("TrackingEvents", all).child(ChildSpec::new("Tracking", all).multiple()),
    );
    catalog.insert(
        attrs(
            leaf("Tracking", all).attribute(AttributeSpec::new("event", all).required()),
            &["offset"],
            all,
        ),
    );

    catalog
}
