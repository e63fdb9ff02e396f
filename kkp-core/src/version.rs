use std::{fmt, str::FromStr};

use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use semver::{Version, VersionReq};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Image tags of the components shipped together with the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versions {
    pub kubermatic: String,
    pub ui: String,
}

impl Default for Versions {
    fn default() -> Self {
        let tag = format!("v{}", env!("CARGO_PKG_VERSION"));

        Self {
            kubermatic: tag.clone(),
            ui: tag,
        }
    }
}

/// Kubernetes version of a user cluster. Accepts an optional `v` prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KubernetesVersion(Version);

impl KubernetesVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    pub fn semver(&self) -> &Version {
        &self.0
    }

    pub fn matches(&self, requirement: &VersionReq) -> bool {
        requirement.matches(&self.0)
    }
}

impl Default for KubernetesVersion {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl FromStr for KubernetesVersion {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw = trimmed.strip_prefix('v').unwrap_or(trimmed);

        Version::parse(raw).map(Self)
    }
}

impl fmt::Display for KubernetesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for KubernetesVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for KubernetesVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl JsonSchema for KubernetesVersion {
    fn schema_name() -> String {
        "KubernetesVersion".to_owned()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}
