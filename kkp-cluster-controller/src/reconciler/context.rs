use std::{collections::BTreeMap, sync::Arc};

use ipnet::IpNet;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kkp_core::{
    kubernetes::ObjectClient,
    resources::{
        crd::v1::{cluster::Cluster, seed::Datacenter},
        data::{TemplateData, TemplateDataBuilder},
    },
};
use kube::Client;

use crate::options::ControllerOptions;

use super::error::ReconcilerError;

pub struct ReconcilerContext {
    pub client: Client,
    pub object_client: Arc<dyn ObjectClient>,
    pub options: ControllerOptions,
    pub datacenters: BTreeMap<String, Arc<Datacenter>>,
    pub node_access_network: IpNet,
    pub etcd_disk_size: Quantity,
}

impl ReconcilerContext {
    pub fn template_data(&self, cluster: Arc<Cluster>) -> Result<TemplateData, ReconcilerError> {
        let dc_name = &cluster.spec.cloud.dc;
        let datacenter = self
            .datacenters
            .get(dc_name)
            .cloned()
            .ok_or_else(|| ReconcilerError::UnknownDatacenter(dc_name.to_owned()))?;
        let options = &self.options;

        let mut builder = TemplateDataBuilder::default();
        builder
            .client(self.object_client.clone())
            .cluster(cluster)
            .datacenter(datacenter)
            .overwrite_registry(options.overwrite_registry.as_str())
            .node_port_range(options.node_port_range.as_str())
            .node_access_network(self.node_access_network)
            .etcd_disk_size(self.etcd_disk_size.clone())
            .oidc_issuer_url(options.oidc_issuer_url.as_str())
            .oidc_issuer_client_id(options.oidc_issuer_client_id.as_str())
            .kubermatic_image(options.kubermatic_image.as_str())
            .etcd_launcher_image(options.etcd_launcher_image.as_str())
            .dnat_controller_image(options.dnat_controller_image.as_str())
            .machine_controller_image_tag(options.machine_controller_image_tag.as_str())
            .machine_controller_image_repository(
                options.machine_controller_image_repository.as_str(),
            )
            .backup_schedule(options.backup_schedule)
            .versions(options.versions.clone())
            .supports_failure_domain_zone_anti_affinity(
                options.supports_failure_domain_zone_anti_affinity,
            )
            .user_cluster_mla_enabled(options.user_cluster_mla_enabled)
            .is_konnectivity_enabled(options.konnectivity_enabled);

        if let Some(ca_bundle) = &options.ca_bundle {
            builder.ca_bundle(ca_bundle.clone());
        }

        builder
            .build()
            .map_err(ReconcilerError::TemplateDataBuilderError)
    }
}
