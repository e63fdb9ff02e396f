use std::collections::BTreeMap;

use k8s_openapi::chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::version::KubernetesVersion;

use super::cloud::CloudSpec;

/// Annotation set on clusters whose kubelets still have to be migrated to CSI drivers.
pub const CSI_MIGRATION_NEEDED_ANNOTATION: &str = "ccm-migration.k8c.io/migration-needed";

pub const CLUSTER_FEATURE_EXTERNAL_CLOUD_PROVIDER: &str = "externalCloudProvider";

pub const CLUSTER_CONDITION_CSI_KUBELET_MIGRATION_COMPLETED: &str =
    "CSIKubeletMigrationCompleted";

pub const CONDITION_TRUE: &str = "True";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "Cluster",
    status = "ClusterStatus",
    derive = "Default"
)]
pub struct ClusterSpec {
    /// name shown to users in place of the generated cluster name
    #[serde(default)]
    pub human_readable_name: String,
    /// cloud provider specific configuration
    #[serde(default)]
    pub cloud: CloudSpec,
    /// network configuration of the user cluster
    #[serde(default)]
    pub cluster_network: ClusterNetworkingConfig,
    /// kubernetes version of the control plane
    #[serde(default)]
    pub version: KubernetesVersion,
    /// how the control plane is exposed to the worker nodes
    #[serde(default)]
    pub expose_strategy: ExposeStrategy,
    /// per-component settings overriding the seed defaults
    #[serde(default)]
    pub components_override: ComponentSettings,
    /// feature toggles enabled for this cluster
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

impl ClusterSpec {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum ExposeStrategy {
    #[default]
    NodePort,
    LoadBalancer,
    Tunneling,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkingConfig {
    #[serde(default)]
    pub pods: NetworkRanges,
    #[serde(default)]
    pub services: NetworkRanges,
    pub dns_domain: Option<String>,
    pub proxy_mode: Option<String>,
    /// unset means enabled, clusters created before the field existed rely on it
    #[serde(rename = "nodeLocalDNSCacheEnabled")]
    pub node_local_dns_cache_enabled: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRanges {
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSettings {
    #[serde(default)]
    pub apiserver: ApiServerSettings,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerSettings {
    #[serde(default)]
    pub node_port_range: String,
    pub replicas: Option<i32>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// namespace on the seed holding the control plane of this cluster
    #[serde(default)]
    pub namespace_name: String,
    #[serde(default)]
    pub conditions: Vec<ClusterCondition>,
    #[serde(default)]
    pub address: ClusterAddress,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub last_heartbeat_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAddress {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub external_name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: i32,
    #[serde(rename = "internalURL", default)]
    pub internal_url: String,
}

impl Cluster {
    /// Namespace holding the control plane, empty until the controller assigned one.
    pub fn namespace_name(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.namespace_name.as_str())
            .unwrap_or_default()
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .map_or(false, |a| a.contains_key(annotation))
    }

    pub fn condition_has_status(&self, condition: &str, status: &str) -> bool {
        self.status.as_ref().map_or(false, |s| {
            s.conditions
                .iter()
                .any(|c| c.type_ == condition && c.status == status)
        })
    }
}
