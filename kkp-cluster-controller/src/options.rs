use std::{collections::BTreeMap, sync::Arc, time::Duration};

use derive_builder::Builder;
use kkp_core::{
    pki::CaBundle,
    resources::DEFAULT_NODE_PORT_RANGE,
    version::Versions,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::datacenter::DatacenterMeta;

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)",
        r"(Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E|[eE][+-]?[0-9]+)?$",
    ))
    .unwrap()
});

/// Whether `raw` is a valid Kubernetes resource quantity such as `5Gi` or `500m`.
pub fn is_quantity(raw: &str) -> bool {
    QUANTITY.is_match(raw)
}

/// Everything the cluster controller gets injected at startup.
#[derive(Debug, Clone, Builder)]
pub struct ControllerOptions {
    #[builder(setter(into))]
    pub external_url: String,
    #[builder(setter(into))]
    pub datacenter_name: String,
    pub datacenters: BTreeMap<String, DatacenterMeta>,

    #[builder(setter(into), default)]
    pub overwrite_registry: String,
    #[builder(setter(into), default = "DEFAULT_NODE_PORT_RANGE.to_owned()")]
    pub node_port_range: String,
    #[builder(setter(into))]
    pub node_access_network: String,
    #[builder(setter(into))]
    pub etcd_disk_size: String,

    #[builder(setter(into), default)]
    pub oidc_issuer_url: String,
    #[builder(setter(into), default)]
    pub oidc_issuer_client_id: String,
    #[builder(default)]
    pub docker_pull_config_json: Vec<u8>,

    #[builder(setter(into), default)]
    pub kubermatic_image: String,
    #[builder(setter(into), default)]
    pub etcd_launcher_image: String,
    #[builder(setter(into), default)]
    pub dnat_controller_image: String,
    #[builder(setter(into), default)]
    pub machine_controller_image_tag: String,
    #[builder(setter(into), default)]
    pub machine_controller_image_repository: String,
    #[builder(default)]
    pub versions: Versions,
    #[builder(setter(strip_option), default)]
    pub ca_bundle: Option<Arc<dyn CaBundle>>,

    #[builder(default = "Duration::from_secs(20 * 60)")]
    pub backup_schedule: Duration,
    #[builder(default)]
    pub konnectivity_enabled: bool,
    #[builder(default)]
    pub user_cluster_mla_enabled: bool,
    #[builder(default)]
    pub supports_failure_domain_zone_anti_affinity: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        for valid in ["5Gi", "500m", "1.5", "100", "1e3", "+2Ki"] {
            assert!(is_quantity(valid), "{valid} should be a quantity");
        }
        for invalid in ["", "Gi", "5 Gi", "5GB", "five"] {
            assert!(!is_quantity(invalid), "{invalid} shouldn't be a quantity");
        }
    }

    #[test]
    fn options_require_the_datacenter() {
        let result = ControllerOptionsBuilder::default()
            .external_url("dev.kubermatic.io")
            .node_access_network("192.0.2.0/24")
            .etcd_disk_size("5Gi")
            .build();

        assert!(result.is_err());
    }
}
