//! VAST specification versions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Version declared by a VAST document.
///
/// Known versions get their own variant; anything else is kept verbatim in
/// [`Version::Other`] so a document declaring an unknown version can still be
/// walked (every version-gated rule will then report as unsupported).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Version {
    V2_0,
    V3_0,
    V4_0,
    V4_1,
    V4_2,
    V4_3,
    Other(String),
}

impl Version {
    /// Versions covered by the built-in catalog.
    pub const SUPPORTED: [Version; 5] = [
        Version::V3_0,
        Version::V4_0,
        Version::V4_1,
        Version::V4_2,
        Version::V4_3,
    ];

    /// 4.0 and later.
    pub const V4_PLUS: [Version; 4] = [
        Version::V4_0,
        Version::V4_1,
        Version::V4_2,
        Version::V4_3,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "2.0" => Version::V2_0,
            "3.0" => Version::V3_0,
            "4.0" => Version::V4_0,
            "4.1" => Version::V4_1,
            "4.2" => Version::V4_2,
            "4.3" => Version::V4_3,
            other => Version::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Version::V2_0 => "2.0",
            Version::V3_0 => "3.0",
            Version::V4_0 => "4.0",
            Version::V4_1 => "4.1",
            Version::V4_2 => "4.2",
            Version::V4_3 => "4.3",
            Version::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Version::parse(raw)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Version::parse(&raw))
    }
}
