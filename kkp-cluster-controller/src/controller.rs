use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use futures::StreamExt;
use ipnet::IpNet;
use k8s_openapi::{
    api::{
        apps::v1::{Deployment, StatefulSet},
        batch::v1::CronJob,
        core::v1::{
            ConfigMap, Namespace, PersistentVolumeClaim, Secret, Service, ServiceAccount,
        },
        networking::v1::Ingress,
        policy::v1::PodDisruptionBudget,
        rbac::v1::{ClusterRoleBinding, Role, RoleBinding},
    },
    apimachinery::pkg::api::resource::Quantity,
    serde::de::DeserializeOwned,
};
use kkp_core::{
    kubernetes::ObjectClient,
    resources::{
        crd::v1::{cluster::Cluster, seed::Datacenter},
        ports::{PortRange, PortRangeError},
    },
};
use kube::{
    runtime::{reflector::ObjectRef, watcher::Config, Controller},
    Api, Client, Resource,
};
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    datacenter::{validate_datacenters, DatacenterError},
    helpers::handle_reconciliation_result,
    options::{is_quantity, ControllerOptions},
    reconciler::{context::ReconcilerContext, reconcile_cluster, reconcile_cluster_error},
};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Invalid datacenters! Reason: {}", .0)]
    Datacenters(#[from] DatacenterError),
    #[error("Invalid node access network '{}'! Reason: {}", .0, .1)]
    NodeAccessNetwork(String, ipnet::AddrParseError),
    #[error("Invalid etcd disk size '{}'!", .0)]
    EtcdDiskSize(String),
    #[error("Invalid node port range! Reason: {}", .0)]
    NodePortRange(#[from] PortRangeError),
}

/// Controller of user clusters placed in the seed this process runs in.
pub struct ClusterController {
    context: Arc<ReconcilerContext>,
}

impl ClusterController {
    pub fn new(
        client: Client,
        object_client: Arc<dyn ObjectClient>,
        options: ControllerOptions,
    ) -> Result<Self, ControllerError> {
        info!(
            "Preparing cluster controller for seed '{}' (dashboard at {})...",
            options.datacenter_name, options.external_url
        );
        debug!(
            "Docker pull config has {} bytes",
            options.docker_pull_config_json.len()
        );

        validate_datacenters(&options.datacenters)?;

        match options.datacenters.get(&options.datacenter_name) {
            Some(meta) if meta.is_seed => (),
            Some(_) => warn!("Datacenter '{}' is not a seed!", options.datacenter_name),
            None => warn!("Datacenter '{}' is not defined!", options.datacenter_name),
        }

        let node_access_network = options
            .node_access_network
            .parse::<IpNet>()
            .map_err(|e| {
                ControllerError::NodeAccessNetwork(options.node_access_network.to_owned(), e)
            })?;

        if !is_quantity(&options.etcd_disk_size) {
            return Err(ControllerError::EtcdDiskSize(options.etcd_disk_size.to_owned()));
        }
        let etcd_disk_size = Quantity(options.etcd_disk_size.to_owned());

        if !options.node_port_range.is_empty() {
            options.node_port_range.parse::<PortRange>()?;
        }

        let datacenters = options
            .datacenters
            .iter()
            .map(|(name, meta)| (name.to_owned(), Arc::new(Datacenter::from(meta))))
            .collect::<BTreeMap<_, _>>();

        Ok(Self {
            context: Arc::new(ReconcilerContext {
                client,
                object_client,
                options,
                datacenters,
                node_access_network,
                etcd_disk_size,
            }),
        })
    }

    pub fn context(&self) -> &ReconcilerContext {
        &self.context
    }

    pub async fn run(self) {
        info!("Creating cluster controller...");

        let watcher_config = Config::default();
        let controller = Controller::new(self.global_api::<Cluster>(), watcher_config.clone())
            .owns(self.global_api::<Namespace>(), watcher_config.clone())
            .owns(self.global_api::<ClusterRoleBinding>(), watcher_config.clone())
            .watches(self.global_api::<Secret>(), watcher_config.clone(), owning_clusters)
            .watches(self.global_api::<Service>(), watcher_config.clone(), owning_clusters)
            .watches(
                self.global_api::<PersistentVolumeClaim>(),
                watcher_config.clone(),
                owning_clusters,
            )
            .watches(self.global_api::<ConfigMap>(), watcher_config.clone(), owning_clusters)
            .watches(
                self.global_api::<ServiceAccount>(),
                watcher_config.clone(),
                owning_clusters,
            )
            .watches(self.global_api::<Deployment>(), watcher_config.clone(), owning_clusters)
            .watches(self.global_api::<StatefulSet>(), watcher_config.clone(), owning_clusters)
            .watches(self.global_api::<CronJob>(), watcher_config.clone(), owning_clusters)
            .watches(self.global_api::<Ingress>(), watcher_config.clone(), owning_clusters)
            .watches(self.global_api::<Role>(), watcher_config.clone(), owning_clusters)
            .watches(self.global_api::<RoleBinding>(), watcher_config.clone(), owning_clusters)
            .watches(self.global_api::<PodDisruptionBudget>(), watcher_config, owning_clusters)
            .shutdown_on_signal()
            .run(reconcile_cluster, reconcile_cluster_error, self.context.clone())
            .for_each(handle_reconciliation_result::<Cluster, _>);

        info!("Cluster controller created!");

        controller.await;

        info!("Exiting cluster controller!");
    }

    fn global_api<T>(&self) -> Api<T>
    where
        T: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        Api::all(self.context.client.clone())
    }
}

/// Clusters owning a namespaced object. Owner references carry no namespace,
/// so the cluster is addressed by name alone.
pub fn owning_clusters<T: Resource>(object: T) -> Vec<ObjectRef<Cluster>> {
    object
        .meta()
        .owner_references
        .iter()
        .flatten()
        .filter(|owner| {
            owner.kind == Cluster::kind(&()) && owner.api_version == Cluster::api_version(&())
        })
        .map(|owner| ObjectRef::new(&owner.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use kkp_core::{
        kubernetes::fake::FakeObjectClient,
        resources::{
            meta::{cluster_namespace_name, get_cluster_ref},
            DEFAULT_NODE_PORT_RANGE,
        },
    };
    use kube::{core::ObjectMeta, Config as KubeConfig};

    use crate::{datacenter::tests::build_datacenter_meta, options::ControllerOptionsBuilder};

    use super::*;

    const TEST_DC: &str = "europe-west3-c";
    const TEST_EXTERNAL_URL: &str = "dev.kubermatic.io";

    fn test_client() -> Client {
        let config = KubeConfig::new("http://127.0.0.1:6443".parse().unwrap());
        Client::try_from(config).unwrap()
    }

    fn test_options() -> ControllerOptionsBuilder {
        let mut builder = ControllerOptionsBuilder::default();
        builder
            .external_url(TEST_EXTERNAL_URL)
            .datacenter_name(TEST_DC)
            .datacenters(build_datacenter_meta())
            .node_access_network("192.0.2.0/24")
            .etcd_disk_size("5Gi");
        builder
    }

    fn new_test_controller(
        options: ControllerOptions,
    ) -> Result<ClusterController, ControllerError> {
        ClusterController::new(test_client(), Arc::new(FakeObjectClient::new()), options)
    }

    #[tokio::test]
    async fn controller_is_created() {
        let controller = new_test_controller(test_options().build().unwrap()).unwrap();
        let context = controller.context();

        assert_eq!(context.options.external_url, TEST_EXTERNAL_URL);
        assert_eq!(context.options.node_port_range, DEFAULT_NODE_PORT_RANGE);
        assert_eq!(context.node_access_network.to_string(), "192.0.2.0/24");
        assert_eq!(context.etcd_disk_size, Quantity("5Gi".to_owned()));
        assert_eq!(context.datacenters.len(), 5);
        assert_eq!(context.datacenters["regular-do1"].location, "Amsterdam");
    }

    #[tokio::test]
    async fn datacenter_does_not_have_to_be_a_known_seed() {
        for datacenter in [TEST_DC, "us-central1", "regular-do1"] {
            let options = test_options().datacenter_name(datacenter).build().unwrap();

            assert!(new_test_controller(options).is_ok(), "{datacenter}");
        }
    }

    #[tokio::test]
    async fn invalid_datacenters_are_rejected() {
        let mut datacenters = build_datacenter_meta();
        datacenters.get_mut("regular-do1").unwrap().seed = "eu-north1".to_owned();

        let result = new_test_controller(test_options().datacenters(datacenters).build().unwrap());

        assert!(matches!(result, Err(ControllerError::Datacenters(_))));
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let options = test_options().node_access_network("192.0.2.0").build().unwrap();
        let result = new_test_controller(options);
        assert!(matches!(result, Err(ControllerError::NodeAccessNetwork(..))));

        let result = new_test_controller(test_options().etcd_disk_size("5 gigs").build().unwrap());
        assert!(matches!(result, Err(ControllerError::EtcdDiskSize(_))));

        let result = new_test_controller(test_options().node_port_range("30000-").build().unwrap());
        assert!(matches!(result, Err(ControllerError::NodePortRange(_))));
    }

    #[tokio::test]
    async fn template_data_uses_the_cluster_datacenter() {
        let controller = new_test_controller(
            test_options()
                .overwrite_registry("registry.corp.local")
                .kubermatic_image("quay.io/kubermatic/kubermatic")
                .build()
                .unwrap(),
        )
        .unwrap();
        let mut cluster = Cluster::new("fqpcvnc6v", Default::default());
        cluster.spec.cloud.dc = "regular-do1".to_owned();
        cluster.spec.cloud.digitalocean = Some(Default::default());

        let data = controller.context().template_data(Arc::new(cluster.clone())).unwrap();

        assert_eq!(data.dc().map(|dc| dc.location.as_str()), Some("Amsterdam"));
        assert_eq!(data.provider_name(), "digitalocean");
        assert_eq!(data.kubermatic_api_image(), "registry.corp.local/kubermatic/kubermatic");
        assert_eq!(
            data.node_access_network().map(ToString::to_string).as_deref(),
            Some("192.0.2.0/24")
        );

        cluster.spec.cloud.dc = "europe-west3-c".to_owned();
        assert!(controller.context().template_data(Arc::new(cluster)).is_err());
    }

    fn owned_secret(namespace: &str, owners: Vec<OwnerReference>) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("apiserver-tls".to_owned()),
                namespace: Some(namespace.to_owned()),
                owner_references: Some(owners),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn namespaced_children_trigger_their_cluster() {
        let mut cluster = Cluster::new("fqpcvnc6v", Default::default());
        cluster.metadata.uid = Some("b0d4f7f4-2d6e-4f3a-8c47-5b5b8a2b9e11".to_owned());
        let owner = get_cluster_ref(&cluster).unwrap();
        let secret = owned_secret(&cluster_namespace_name("fqpcvnc6v"), vec![owner]);

        assert_eq!(owning_clusters(secret), vec![ObjectRef::from_obj(&cluster)]);
    }

    #[test]
    fn foreign_owners_are_ignored() {
        let owner = OwnerReference {
            api_version: "apps/v1".to_owned(),
            kind: "Deployment".to_owned(),
            name: "fqpcvnc6v".to_owned(),
            uid: "4c3a9c1e-6f0b-4d36-9a0e-0c8f4d1b7a22".to_owned(),
            ..Default::default()
        };
        let secret = owned_secret("cluster-fqpcvnc6v", vec![owner]);

        assert!(owning_clusters(secret).is_empty());
    }
}
