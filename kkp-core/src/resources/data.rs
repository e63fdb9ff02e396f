use std::{collections::BTreeMap, net::IpAddr, sync::Arc, time::Duration};

use derive_builder::Builder;
use ipnet::IpNet;
use k8s_openapi::{
    api::core::v1::Volume,
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::OwnerReference},
};
use log::{debug, error, warn};

use crate::{
    kubernetes::{ObjectClient, ObjectKey},
    pki::{self, CaBundle, EcdsaKeyPair, KeyPair},
    version::Versions,
};

use super::{
    cloud,
    crd::{
        operator::v1alpha1::KubermaticConfiguration,
        v1::{
            cloud::{CloudProviderError, GlobalSecretKeySelector},
            cluster::{Cluster, ExposeStrategy},
            seed::{Datacenter, Seed},
        },
    },
    image::ImageReference,
    kcm, labels, meta,
    ports::PortRange,
    TemplateDataError, CONTROLLER_MANAGER_DEPLOYMENT_NAME, DEFAULT_NODE_PORT_RANGE,
    MLA_GATEWAY_EXTERNAL_SERVICE_NAME, OPENVPN_SERVER_SERVICE_NAME, OPENVPN_TUNNELING_PORT,
    VIEWER_TOKEN_SECRET_KEY, VIEWER_TOKEN_SECRET_NAME,
};

const DEFAULT_BACKUP_SCHEDULE: Duration = Duration::from_secs(20 * 60);

#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct TemplateData {
    client: Arc<dyn ObjectClient>,
    #[builder(setter(into))]
    cluster: Arc<Cluster>,
    #[builder(setter(into, strip_option), default)]
    datacenter: Option<Arc<Datacenter>>,
    #[builder(setter(into, strip_option), default)]
    seed: Option<Arc<Seed>>,
    #[builder(setter(into, strip_option), default)]
    kubermatic_configuration: Option<Arc<KubermaticConfiguration>>,

    #[builder(setter(into), default)]
    overwrite_registry: String,
    #[builder(setter(into), default)]
    node_port_range: String,
    #[builder(setter(strip_option), default)]
    node_access_network: Option<IpNet>,
    #[builder(default)]
    etcd_disk_size: Quantity,
    #[builder(setter(into), default)]
    oidc_issuer_url: String,
    #[builder(setter(into), default)]
    oidc_issuer_client_id: String,

    #[builder(setter(into), default)]
    kubermatic_image: String,
    #[builder(setter(into), default)]
    etcd_launcher_image: String,
    #[builder(setter(into), default)]
    dnat_controller_image: String,
    #[builder(setter(into), default)]
    machine_controller_image_tag: String,
    #[builder(setter(into), default)]
    machine_controller_image_repository: String,

    #[builder(default = "DEFAULT_BACKUP_SCHEDULE")]
    backup_schedule: Duration,
    #[builder(default)]
    versions: Versions,
    #[builder(setter(strip_option), default)]
    ca_bundle: Option<Arc<dyn CaBundle>>,

    #[builder(default)]
    supports_failure_domain_zone_anti_affinity: bool,
    #[builder(default)]
    user_cluster_mla_enabled: bool,
    #[builder(default)]
    is_konnectivity_enabled: bool,
}

impl TemplateDataBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.node_port_range.as_deref() {
            None | Some("") => Ok(()),
            Some(range) => range
                .parse::<PortRange>()
                .map(|_| ())
                .map_err(|e| format!("invalid node port range '{range}': {e}")),
        }
    }
}

impl TemplateData {
    pub fn client(&self) -> &dyn ObjectClient {
        self.client.as_ref()
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn cluster_version(&self) -> String {
        self.cluster.spec.version.to_string()
    }

    pub fn dc(&self) -> Option<&Datacenter> {
        self.datacenter.as_deref()
    }

    pub fn seed(&self) -> Option<&Seed> {
        self.seed.as_deref()
    }

    pub fn kubermatic_configuration(&self) -> Option<&KubermaticConfiguration> {
        self.kubermatic_configuration.as_deref()
    }

    /// CA certificates trusted for all outgoing communication.
    pub fn ca_bundle(&self) -> Option<&dyn CaBundle> {
        self.ca_bundle.as_deref()
    }

    pub fn overwrite_registry(&self) -> &str {
        &self.overwrite_registry
    }

    pub fn oidc_issuer_url(&self) -> &str {
        &self.oidc_issuer_url
    }

    pub fn oidc_issuer_client_id(&self) -> &str {
        &self.oidc_issuer_client_id
    }

    pub fn etcd_disk_size(&self) -> &Quantity {
        &self.etcd_disk_size
    }

    pub fn node_access_network(&self) -> Option<&IpNet> {
        self.node_access_network.as_ref()
    }

    pub fn node_port_range(&self) -> &str {
        &self.node_port_range
    }

    pub fn backup_schedule(&self) -> Duration {
        self.backup_schedule
    }

    pub fn versions(&self) -> &Versions {
        &self.versions
    }

    pub fn user_cluster_mla_enabled(&self) -> bool {
        self.user_cluster_mla_enabled
    }

    pub fn is_konnectivity_enabled(&self) -> bool {
        self.is_konnectivity_enabled
    }

    pub fn supports_failure_domain_zone_anti_affinity(&self) -> bool {
        self.supports_failure_domain_zone_anti_affinity
    }

    /// Node port range with the apiserver override of the cluster applied,
    /// falling back to the explicit range and then to the default one.
    pub fn computed_node_port_range(&self) -> &str {
        let cluster_override = &self.cluster.spec.components_override.apiserver.node_port_range;

        if !cluster_override.is_empty() {
            cluster_override
        } else if !self.node_port_range.is_empty() {
            &self.node_port_range
        } else {
            DEFAULT_NODE_PORT_RANGE
        }
    }

    /// Lowest and highest port of [`Self::computed_node_port_range`].
    pub fn node_ports(&self) -> (u16, u16) {
        let range = self
            .computed_node_port_range()
            .parse::<PortRange>()
            .or_else(|e| {
                debug!("Falling back to the default node port range: {e}");
                DEFAULT_NODE_PORT_RANGE.parse::<PortRange>()
            });

        match range {
            Ok(range) => (range.low(), range.high()),
            Err(_) => (30000, 32767),
        }
    }

    fn namespace(&self) -> &str {
        self.cluster.namespace_name()
    }

    fn cluster_name(&self) -> String {
        self.cluster.metadata.name.clone().unwrap_or_default()
    }

    pub fn get_cluster_ref(&self) -> Result<OwnerReference, TemplateDataError> {
        meta::get_cluster_ref(&self.cluster).ok_or_else(|| TemplateDataError::MissingData {
            kind: "Cluster",
            name: self.cluster_name(),
            detail: "name and uid are required for an owner reference".into(),
        })
    }

    pub fn external_ip(&self) -> Result<IpAddr, TemplateDataError> {
        meta::get_cluster_external_ip(&self.cluster)
    }

    pub async fn get_viewer_token(&self) -> Result<String, TemplateDataError> {
        let secret = self
            .client
            .get_secret(&ObjectKey::new(self.namespace(), VIEWER_TOKEN_SECRET_NAME))
            .await?;

        Ok(secret
            .data
            .as_ref()
            .and_then(|data| data.get(VIEWER_TOKEN_SECRET_KEY))
            .map(|token| String::from_utf8_lossy(&token.0).into_owned())
            .unwrap_or_default())
    }

    /// ClusterIP of the service `name` in the cluster namespace.
    pub async fn cluster_ip_by_service_name(
        &self,
        name: &str,
    ) -> Result<IpAddr, TemplateDataError> {
        let key = ObjectKey::new(self.namespace(), name);
        let service = self.client.get_service(&key).await?;
        let cluster_ip = service
            .spec
            .and_then(|spec| spec.cluster_ip)
            .unwrap_or_default();

        cluster_ip
            .parse()
            .map_err(|_| TemplateDataError::InvalidData {
                kind: "Service",
                name: key.to_string(),
                detail: format!("no valid cluster ip (\"{cluster_ip}\")").into(),
            })
    }

    /// Provider of the cluster, empty when it can't be identified.
    pub fn provider_name(&self) -> &'static str {
        cloud::cluster_cloud_provider_name(&self.cluster.spec.cloud).unwrap_or_else(|e| {
            error!(
                "Couldn't identify the cloud provider of cluster '{}': {e}",
                self.cluster_name()
            );
            ""
        })
    }

    pub fn get_cloud_provider_name(&self) -> Result<&'static str, CloudProviderError> {
        cloud::get_cloud_provider_name(&self.cluster.spec.cloud)
    }

    pub fn get_kubernetes_cloud_provider_name(&self) -> &'static str {
        cloud::get_kubernetes_cloud_provider_name(
            &self.cluster,
            cloud::external_cloud_provider_enabled(&self.cluster),
        )
    }

    pub fn get_csi_migration_feature_gates(&self) -> Vec<String> {
        cloud::get_csi_migration_feature_gates(&self.cluster)
    }

    /// Override registry when set, `default_registry` otherwise.
    pub fn image_registry<'a>(&'a self, default_registry: &'a str) -> &'a str {
        if self.overwrite_registry.is_empty() {
            default_registry
        } else {
            &self.overwrite_registry
        }
    }

    /// Normalizes `image` and moves it to the override registry when one is configured.
    pub fn parse_image(&self, image: &str) -> String {
        match image.parse::<ImageReference>() {
            Ok(reference) if self.overwrite_registry.is_empty() => reference.to_string(),
            Ok(reference) => reference.with_domain(&self.overwrite_registry).to_string(),
            Err(e) => {
                warn!("Couldn't parse image reference '{image}': {e}");
                image.to_owned()
            }
        }
    }

    pub fn kubermatic_api_image(&self) -> String {
        self.parse_image(&self.kubermatic_image)
    }

    pub fn kubermatic_docker_tag(&self) -> &str {
        &self.versions.kubermatic
    }

    pub fn etcd_launcher_image(&self) -> String {
        self.parse_image(&self.etcd_launcher_image)
    }

    pub fn etcd_launcher_tag(&self) -> &str {
        &self.versions.kubermatic
    }

    pub fn dnat_controller_image(&self) -> String {
        self.parse_image(&self.dnat_controller_image)
    }

    pub fn dnat_controller_tag(&self) -> &str {
        &self.versions.kubermatic
    }

    pub fn node_port_proxy_tag(&self) -> &str {
        &self.versions.kubermatic
    }

    pub fn machine_controller_image_tag(&self) -> &str {
        &self.machine_controller_image_tag
    }

    pub fn machine_controller_image_repository(&self) -> &str {
        &self.machine_controller_image_repository
    }

    /// Unset means enabled.
    pub fn node_local_dns_cache_enabled(&self) -> bool {
        self.cluster
            .spec
            .cluster_network
            .node_local_dns_cache_enabled
            .unwrap_or(true)
    }

    pub async fn get_root_ca(&self) -> Result<KeyPair, TemplateDataError> {
        Ok(pki::get_cluster_root_ca(self.client(), self.namespace()).await?)
    }

    pub async fn get_front_proxy_ca(&self) -> Result<KeyPair, TemplateDataError> {
        Ok(pki::get_cluster_front_proxy_ca(self.client(), self.namespace()).await?)
    }

    pub async fn get_openvpn_ca(&self) -> Result<EcdsaKeyPair, TemplateDataError> {
        Ok(pki::get_openvpn_ca(self.client(), self.namespace()).await?)
    }

    pub async fn get_mla_gateway_ca(&self) -> Result<EcdsaKeyPair, TemplateDataError> {
        Ok(pki::get_mla_gateway_ca(self.client(), self.namespace()).await?)
    }

    pub async fn get_pod_template_labels(
        &self,
        app_name: &str,
        volumes: &[Volume],
        additional_labels: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, TemplateDataError> {
        Ok(labels::get_pod_template_labels(
            self.client(),
            app_name,
            &self.cluster_name(),
            self.namespace(),
            volumes,
            additional_labels,
        )
        .await?)
    }

    pub async fn get_openvpn_server_port(&self) -> Result<i32, TemplateDataError> {
        if self.cluster.spec.expose_strategy == ExposeStrategy::Tunneling {
            return Ok(OPENVPN_TUNNELING_PORT);
        }

        self.first_node_port(OPENVPN_SERVER_SERVICE_NAME).await
    }

    pub async fn get_mla_gateway_port(&self) -> Result<i32, TemplateDataError> {
        // tunneling shares the apiserver port
        if self.cluster.spec.expose_strategy == ExposeStrategy::Tunneling {
            return Ok(self
                .cluster
                .status
                .as_ref()
                .map(|s| s.address.port)
                .unwrap_or_default());
        }

        self.first_node_port(MLA_GATEWAY_EXTERNAL_SERVICE_NAME).await
    }

    async fn first_node_port(&self, service_name: &str) -> Result<i32, TemplateDataError> {
        let key = ObjectKey::new(self.namespace(), service_name);
        let service = self.client.get_service(&key).await?;

        service
            .spec
            .and_then(|spec| spec.ports)
            .and_then(|ports| ports.into_iter().next())
            .and_then(|port| port.node_port)
            .ok_or_else(|| TemplateDataError::MissingData {
                kind: "Service",
                name: key.to_string(),
                detail: "no node port assigned".into(),
            })
    }

    /// Value stored under `key` in the secret `selector` points to.
    pub async fn get_global_secret_key_selector_value(
        &self,
        selector: &GlobalSecretKeySelector,
        key: &str,
    ) -> Result<String, TemplateDataError> {
        let missing = |detail: &'static str| TemplateDataError::MissingData {
            kind: "GlobalSecretKeySelector",
            name: selector.name.to_owned(),
            detail: detail.into(),
        };

        if selector.name.is_empty() {
            return Err(missing("name is empty"));
        }
        if selector.namespace.is_empty() {
            return Err(missing("namespace is empty"));
        }
        if key.is_empty() {
            return Err(missing("key is empty"));
        }

        let secret_key = ObjectKey::new(&selector.namespace, &selector.name);
        let secret = self.client.get_secret(&secret_key).await?;

        secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .map(|value| String::from_utf8_lossy(&value.0).into_owned())
            .ok_or_else(|| TemplateDataError::MissingData {
                kind: "Secret",
                name: secret_key.to_string(),
                detail: format!("no key '{key}'").into(),
            })
    }

    /// Whether the controller-manager is rolled out without its cloud
    /// controllers, so the external cloud controller manager can take over.
    pub async fn kcm_cloud_controllers_deactivated(&self) -> bool {
        let key = ObjectKey::new(self.namespace(), CONTROLLER_MANAGER_DEPLOYMENT_NAME);

        match self.client.get_deployment(&key).await {
            Ok(kcm) => kcm::cloud_controllers_deactivated(&kcm),
            Err(e) => {
                error!("Couldn't get the controller-manager deployment: {e}");
                false
            }
        }
    }
}
