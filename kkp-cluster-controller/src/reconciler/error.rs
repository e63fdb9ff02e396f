use kkp_core::resources::data::TemplateDataBuilderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Cluster references unknown datacenter '{}'!", .0)]
    UnknownDatacenter(String),
    #[error("Couldn't patch the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("Couldn't update the cluster status! Reason: {:#}", .0)]
    StatusPatchError(anyhow::Error),
    #[error("Couldn't prepare the template data! Reason: {}", .0)]
    TemplateDataBuilderError(TemplateDataBuilderError),
}
