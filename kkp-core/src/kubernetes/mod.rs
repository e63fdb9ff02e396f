use std::fmt::{self, Debug, Display};

use async_trait::async_trait;
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{ConfigMap, Secret, Service},
    },
    serde::de::DeserializeOwned,
    NamespaceResourceScope,
};
use kube::{Api, Client, Resource};
use log::trace;
use thiserror::Error;

use crate::helpers::pretty_type_name;

pub mod deployment;
pub mod fake;
pub mod operations;

/// Namespaced name of an object, displayed as `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: ObjectKey },
    #[error("Couldn't get {kind} '{key}': {source}")]
    Api {
        kind: &'static str,
        key: ObjectKey,
        source: kube::Error,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Read access to the objects living in a user cluster's namespace on the seed.
#[async_trait]
pub trait ObjectClient: Debug + Send + Sync {
    async fn get_secret(&self, key: &ObjectKey) -> Result<Secret, ClientError>;
    async fn get_config_map(&self, key: &ObjectKey) -> Result<ConfigMap, ClientError>;
    async fn get_service(&self, key: &ObjectKey) -> Result<Service, ClientError>;
    async fn get_deployment(&self, key: &ObjectKey) -> Result<Deployment, ClientError>;
}

/// [`ObjectClient`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeObjectClient {
    client: Client,
}

impl KubeObjectClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get<T>(&self, key: &ObjectKey) -> Result<T, ClientError>
    where
        T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let kind = pretty_type_name::<T>();
        trace!("Fetching {kind} '{key}'...");

        let api: Api<T> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get(&key.name).await.map_err(|error| match error {
            kube::Error::Api(response) if response.code == 404 => ClientError::NotFound {
                kind,
                key: key.to_owned(),
            },
            source => ClientError::Api {
                kind,
                key: key.to_owned(),
                source,
            },
        })
    }
}

impl Debug for KubeObjectClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeObjectClient")
            .field("default_namespace", &self.client.default_namespace())
            .finish()
    }
}

#[async_trait]
impl ObjectClient for KubeObjectClient {
    async fn get_secret(&self, key: &ObjectKey) -> Result<Secret, ClientError> {
        self.get(key).await
    }

    async fn get_config_map(&self, key: &ObjectKey) -> Result<ConfigMap, ClientError> {
        self.get(key).await
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Service, ClientError> {
        self.get(key).await
    }

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Deployment, ClientError> {
        self.get(key).await
    }
}
