use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "operator.kubermatic.io",
    version = "v1alpha1",
    kind = "KubermaticConfiguration",
    namespaced,
    derive = "Default"
)]
pub struct KubermaticConfigurationSpec {
    /// docker pull secret used for every image pulled by the platform
    #[serde(default)]
    pub image_pull_secret: String,
    /// defaults applied to every user cluster
    #[serde(default)]
    pub user_cluster: KubermaticUserClusterConfiguration,
    /// platform wide feature gates
    #[serde(default)]
    pub feature_gates: BTreeMap<String, bool>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubermaticUserClusterConfiguration {
    pub node_port_range: Option<String>,
    pub overwrite_registry: Option<String>,
    pub etcd_volume_size: Option<String>,
    pub apiserver_replicas: Option<i32>,
}

