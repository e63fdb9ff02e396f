use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

use self::{
    operator::v1alpha1::KubermaticConfiguration,
    v1::{cluster::Cluster, seed::Seed},
};

pub mod operator;
pub mod v1;

pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![Cluster::crd(), Seed::crd(), KubermaticConfiguration::crd()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crds_are_named_after_their_groups() {
        let names = all_crds()
            .into_iter()
            .filter_map(|crd| crd.metadata.name)
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                "clusters.kubermatic.k8c.io",
                "seeds.kubermatic.k8c.io",
                "kubermaticconfigurations.operator.kubermatic.io",
            ]
        );
    }

    #[test]
    fn cluster_crd_is_cluster_scoped() {
        assert_eq!(Cluster::crd().spec.scope, "Cluster");
        assert_eq!(Seed::crd().spec.scope, "Namespaced");
    }
}
