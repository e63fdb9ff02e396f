use once_cell::sync::Lazy;
use semver::VersionReq;

use super::crd::v1::{
    cloud::{CloudProviderError, CloudSpec},
    cluster::{
        Cluster, CLUSTER_CONDITION_CSI_KUBELET_MIGRATION_COMPLETED,
        CLUSTER_FEATURE_EXTERNAL_CLOUD_PROVIDER, CONDITION_TRUE, CSI_MIGRATION_NEEDED_ANNOTATION,
    },
};

pub const CLOUD_PROVIDER_EXTERNAL_FLAG: &str = "external";

static BEFORE_1_21: Lazy<VersionReq> = Lazy::new(|| VersionReq::parse("<1.21.0").unwrap());

pub fn get_cloud_provider_name(cloud: &CloudSpec) -> Result<&'static str, CloudProviderError> {
    cloud.provider().map(|provider| provider.as_str())
}

/// Like [`get_cloud_provider_name`], but rejects specs configuring more than one provider.
pub fn cluster_cloud_provider_name(cloud: &CloudSpec) -> Result<&'static str, CloudProviderError> {
    cloud.single_provider().map(|provider| provider.as_str())
}

/// Value of the `--cloud-provider` flag of the control plane components.
pub fn get_kubernetes_cloud_provider_name(
    cluster: &Cluster,
    external_cloud_provider: bool,
) -> &'static str {
    let cloud = &cluster.spec.cloud;
    let external_feature = cluster
        .spec
        .has_feature(CLUSTER_FEATURE_EXTERNAL_CLOUD_PROVIDER);

    if cloud.aws.is_some() {
        "aws"
    } else if cloud.vsphere.is_some() {
        if external_feature {
            CLOUD_PROVIDER_EXTERNAL_FLAG
        } else {
            "vsphere"
        }
    } else if cloud.azure.is_some() {
        "azure"
    } else if cloud.gcp.is_some() {
        "gce"
    } else if cloud.openstack.is_some() {
        if external_cloud_provider {
            CLOUD_PROVIDER_EXTERNAL_FLAG
        } else {
            "openstack"
        }
    } else if cloud.hetzner.is_some() && external_feature {
        CLOUD_PROVIDER_EXTERNAL_FLAG
    } else {
        ""
    }
}

/// The in-tree provider has to stay active until every kubelet was migrated to
/// CSI, otherwise the volume API becomes unusable.
pub fn external_cloud_provider_enabled(cluster: &Cluster) -> bool {
    cluster
        .spec
        .has_feature(CLUSTER_FEATURE_EXTERNAL_CLOUD_PROVIDER)
        && (kubelet_migration_completed(cluster)
            || !cluster.has_annotation(CSI_MIGRATION_NEEDED_ANNOTATION))
}

fn kubelet_migration_completed(cluster: &Cluster) -> bool {
    cluster.condition_has_status(
        CLUSTER_CONDITION_CSI_KUBELET_MIGRATION_COMPLETED,
        CONDITION_TRUE,
    )
}

pub fn get_csi_migration_feature_gates(cluster: &Cluster) -> Vec<String> {
    let mut feature_gates = vec![];

    if !cluster.has_annotation(CSI_MIGRATION_NEEDED_ANNOTATION) {
        return feature_gates;
    }

    let cloud = &cluster.spec.cloud;

    if cluster
        .spec
        .has_feature(CLUSTER_FEATURE_EXTERNAL_CLOUD_PROVIDER)
    {
        feature_gates.push("CSIMigration=true".to_owned());
        feature_gates.push("ExpandCSIVolumes=true".to_owned());
    }
    if cloud.openstack.is_some() {
        feature_gates.push("CSIMigrationOpenStack=true".to_owned());
    }
    if cloud.vsphere.is_some() {
        feature_gates.push("CSIMigrationvSphere=true".to_owned());
    }

    // the annotation is dropped once all kubelets are migrated
    if kubelet_migration_completed(cluster) {
        let before_1_21 = cluster.spec.version.matches(&BEFORE_1_21);

        if cloud.openstack.is_some() {
            feature_gates.push(if before_1_21 {
                "CSIMigrationOpenStackComplete=true".to_owned()
            } else {
                "InTreePluginOpenStackUnregister=true".to_owned()
            });
        }
        if cloud.vsphere.is_some() {
            feature_gates.push(if before_1_21 {
                "CSIMigrationvSphereComplete=true".to_owned()
            } else {
                "InTreePluginvSphereUnregister=true".to_owned()
            });
        }
    }

    feature_gates
}
