use std::{sync::Arc, time::Duration};

use kkp_core::{
    helpers::RequireMetadata,
    kubernetes::operations::{apply_cluster_status, create_namespace_if_not_exists},
    resources::{
        crd::v1::cluster::Cluster,
        data::TemplateData,
        meta::{cluster_namespace_name, get_cluster_ref},
    },
    FIELD_MANAGER,
};
use kube::{api::PatchParams, runtime::controller::Action};
use log::{debug, info};
use serde::Serialize;

use self::{context::ReconcilerContext, error::ReconcilerError};

pub mod context;
pub mod error;

const SUCCESS_REQUEUE_SECS: u64 = 60 * 5;
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 10;
const UNKNOWN_DATACENTER_REQUEUE_SECS: u64 = 60;

/// The only part of the cluster status owned by this controller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStatus<'a> {
    namespace_name: &'a str,
}

pub async fn reconcile_cluster(
    object: Arc<Cluster>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, ReconcilerError> {
    let name = object.require_name_or(ReconcilerError::MissingObjectMetadata)?;

    if object.metadata.deletion_timestamp.is_some() {
        debug!("Cluster '{name}' is being deleted, skipping...");
        return Ok(Action::await_change());
    }

    let cluster = ensure_namespace(name, object.clone(), &context).await?;
    let data = context.template_data(cluster)?;

    log_template_data(name, &data).await;

    Ok(Action::requeue(Duration::from_secs(SUCCESS_REQUEUE_SECS)))
}

pub fn reconcile_cluster_error(
    _object: Arc<Cluster>,
    error: &ReconcilerError,
    _context: Arc<ReconcilerContext>,
) -> Action {
    Action::requeue(match error {
        ReconcilerError::UnknownDatacenter(_) => {
            Duration::from_secs(UNKNOWN_DATACENTER_REQUEUE_SECS)
        }
        _ => Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
    })
}

/// Makes sure the control plane namespace exists and is recorded in the
/// cluster status, returning the up to date cluster.
async fn ensure_namespace(
    name: &str,
    object: Arc<Cluster>,
    context: &ReconcilerContext,
) -> Result<Arc<Cluster>, ReconcilerError> {
    let namespace_name = cluster_namespace_name(name);
    let owner = get_cluster_ref(&object).ok_or(ReconcilerError::MissingObjectMetadata)?;
    let patch_params = PatchParams::apply(FIELD_MANAGER);

    create_namespace_if_not_exists(&context.client, &patch_params, &namespace_name, Some(owner))
        .await
        .map_err(ReconcilerError::KubeApiError)?;

    if object.namespace_name() == namespace_name {
        return Ok(object);
    }

    info!("Setting namespace of cluster '{name}' to '{namespace_name}'...");
    let status = NamespaceStatus {
        namespace_name: &namespace_name,
    };

    let cluster: Cluster = apply_cluster_status(&context.client, name, &status, &patch_params)
        .await
        .map_err(ReconcilerError::StatusPatchError)?;

    Ok(Arc::new(cluster))
}

async fn log_template_data(name: &str, data: &TemplateData) {
    let (low, high) = data.node_ports();

    debug!(
        "Cluster '{name}': provider '{}', version {}, node ports {low}-{high}",
        data.provider_name(),
        data.cluster_version()
    );
    debug!(
        "Cluster '{name}': cloud provider flag '{}', CSI migration feature gates {:?}",
        data.get_kubernetes_cloud_provider_name(),
        data.get_csi_migration_feature_gates()
    );
    debug!(
        "Cluster '{name}': kubermatic API image {}:{}, etcd launcher image {}:{}",
        data.kubermatic_api_image(),
        data.kubermatic_docker_tag(),
        data.etcd_launcher_image(),
        data.etcd_launcher_tag()
    );
    debug!(
        "Cluster '{name}': controller-manager cloud controllers deactivated: {}",
        data.kcm_cloud_controllers_deactivated().await
    );
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::{
        apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::Time},
        chrono::Utc,
    };
    use kkp_core::kubernetes::fake::FakeObjectClient;
    use kube::{Client, Config as KubeConfig};

    use crate::{datacenter::tests::build_datacenter_meta, options::ControllerOptionsBuilder};

    use super::*;

    fn test_context() -> Arc<ReconcilerContext> {
        let config = KubeConfig::new("http://127.0.0.1:6443".parse().unwrap());
        let options = ControllerOptionsBuilder::default()
            .external_url("dev.kubermatic.io")
            .datacenter_name("europe-west3-c")
            .datacenters(build_datacenter_meta())
            .node_access_network("192.0.2.0/24")
            .etcd_disk_size("5Gi")
            .build()
            .unwrap();

        Arc::new(ReconcilerContext {
            client: Client::try_from(config).unwrap(),
            object_client: Arc::new(FakeObjectClient::new()),
            options,
            datacenters: BTreeMap::new(),
            node_access_network: "192.0.2.0/24".parse().unwrap(),
            etcd_disk_size: Quantity("5Gi".to_owned()),
        })
    }

    #[tokio::test]
    async fn deleted_clusters_are_left_alone() {
        let mut cluster = Cluster::new("fqpcvnc6v", Default::default());
        cluster.metadata.deletion_timestamp = Some(Time(Utc::now()));

        let action = reconcile_cluster(Arc::new(cluster), test_context()).await.unwrap();

        assert_eq!(action, Action::await_change());
    }

    #[tokio::test]
    async fn nameless_clusters_are_rejected() {
        let mut cluster = Cluster::new("fqpcvnc6v", Default::default());
        cluster.metadata.name = None;

        let result = reconcile_cluster(Arc::new(cluster), test_context()).await;

        assert!(matches!(result, Err(ReconcilerError::MissingObjectMetadata)));
    }

    #[tokio::test]
    async fn errors_are_requeued() {
        let cluster = Arc::new(Cluster::new("fqpcvnc6v", Default::default()));
        let context = test_context();

        let unknown_datacenter = ReconcilerError::UnknownDatacenter("eu-north1".to_owned());
        assert_eq!(
            reconcile_cluster_error(cluster.clone(), &unknown_datacenter, context.clone()),
            Action::requeue(Duration::from_secs(60))
        );

        let missing_metadata = ReconcilerError::MissingObjectMetadata;
        assert_eq!(
            reconcile_cluster_error(cluster, &missing_metadata, context),
            Action::requeue(Duration::from_secs(10))
        );
    }

    #[test]
    fn namespace_status_carries_only_the_namespace() {
        let status = NamespaceStatus {
            namespace_name: "cluster-fqpcvnc6v",
        };

        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({ "namespaceName": "cluster-fqpcvnc6v" })
        );
    }
}
