use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentStatus},
    core::v1::Container,
};
use thiserror::Error;

const PROGRESSING_CONDITION: &str = "Progressing";
const PROGRESS_DEADLINE_EXCEEDED_REASON: &str = "ProgressDeadlineExceeded";

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("Deployment '{}' exceeded its progress deadline!", .0)]
    ProgressDeadlineExceeded(String),
}

/// Mirrors `kubectl rollout status`: the latest generation has been observed and
/// every replica is updated and available.
pub fn is_deployment_rollout_complete(deployment: &Deployment) -> Result<bool, RolloutError> {
    let generation = deployment.metadata.generation.unwrap_or_default();
    let default_status = DeploymentStatus::default();
    let status = deployment.status.as_ref().unwrap_or(&default_status);

    if generation > status.observed_generation.unwrap_or_default() {
        return Ok(false);
    }

    let deadline_exceeded = status
        .conditions
        .iter()
        .flatten()
        .any(|c| {
            c.type_ == PROGRESSING_CONDITION
                && c.reason.as_deref() == Some(PROGRESS_DEADLINE_EXCEEDED_REASON)
        });
    if deadline_exceeded {
        return Err(RolloutError::ProgressDeadlineExceeded(
            deployment.metadata.name.clone().unwrap_or_default(),
        ));
    }

    let updated = status.updated_replicas.unwrap_or_default();
    let desired = deployment.spec.as_ref().and_then(|s| s.replicas);

    if desired.map_or(false, |desired| updated < desired) {
        return Ok(false);
    }

    if status.replicas.unwrap_or_default() > updated {
        return Ok(false);
    }

    Ok(status.available_replicas.unwrap_or_default() >= updated)
}

pub fn get_container<'a>(deployment: &'a Deployment, name: &str) -> Option<&'a Container> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.containers.iter().find(|c| c.name == name))
}

#[cfg(test)]
pub(crate) mod tests {
    use k8s_openapi::api::{
        apps::v1::{DeploymentCondition, DeploymentSpec},
        core::v1::{PodSpec, PodTemplateSpec},
    };
    use kube::core::ObjectMeta;

    use super::*;

    pub(crate) fn rolled_out_deployment(
        name: &str,
        namespace: &str,
        containers: Vec<Container>,
    ) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                generation: Some(2),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                observed_generation: Some(2),
                replicas: Some(1),
                updated_replicas: Some(1),
                available_replicas: Some(1),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn rollout_is_complete_when_all_replicas_are_updated_and_available() {
        let deployment = rolled_out_deployment("kcm", "cluster-abc", vec![]);

        assert!(is_deployment_rollout_complete(&deployment).unwrap());
    }

    #[test]
    fn rollout_is_pending_while_generation_is_not_observed() {
        let mut deployment = rolled_out_deployment("kcm", "cluster-abc", vec![]);
        deployment.metadata.generation = Some(3);

        assert!(!is_deployment_rollout_complete(&deployment).unwrap());
    }

    #[test]
    fn rollout_is_pending_while_old_replicas_are_running() {
        let mut deployment = rolled_out_deployment("kcm", "cluster-abc", vec![]);
        if let Some(status) = deployment.status.as_mut() {
            status.replicas = Some(2);
        }

        assert!(!is_deployment_rollout_complete(&deployment).unwrap());
    }

    #[test]
    fn rollout_fails_when_progress_deadline_is_exceeded() {
        let mut deployment = rolled_out_deployment("kcm", "cluster-abc", vec![]);
        if let Some(status) = deployment.status.as_mut() {
            status.conditions = Some(vec![DeploymentCondition {
                type_: PROGRESSING_CONDITION.to_owned(),
                status: "False".to_owned(),
                reason: Some(PROGRESS_DEADLINE_EXCEEDED_REASON.to_owned()),
                ..Default::default()
            }]);
        }

        assert!(is_deployment_rollout_complete(&deployment).is_err());
    }

    #[test]
    fn get_container_finds_container_by_name() {
        let deployment = rolled_out_deployment(
            "kcm",
            "cluster-abc",
            vec![Container {
                name: "controller-manager".to_owned(),
                ..Default::default()
            }],
        );

        assert!(get_container(&deployment, "controller-manager").is_some());
        assert!(get_container(&deployment, "scheduler").is_none());
    }
}
