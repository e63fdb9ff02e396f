use std::net::IpAddr;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use super::{crd::v1::cluster::Cluster, TemplateDataError};

const CLUSTER_NAMESPACE_PREFIX: &str = "cluster-";

pub fn cluster_namespace_name(cluster_name: &str) -> String {
    format!("{CLUSTER_NAMESPACE_PREFIX}{cluster_name}")
}

/// Controller owner reference pointing at `cluster`.
pub fn get_cluster_ref(cluster: &Cluster) -> Option<OwnerReference> {
    cluster.controller_owner_ref(&())
}

pub fn get_cluster_external_ip(cluster: &Cluster) -> Result<IpAddr, TemplateDataError> {
    let raw = cluster
        .status
        .as_ref()
        .map(|s| s.address.ip.as_str())
        .unwrap_or_default();

    raw.parse().map_err(|_| TemplateDataError::InvalidData {
        kind: "Cluster",
        name: cluster.metadata.name.clone().unwrap_or_default(),
        detail: format!("external cluster IP '{raw}' is not a valid address").into(),
    })
}
