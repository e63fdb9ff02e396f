use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, Secret, Service},
};
use kube::Resource;

use crate::helpers::pretty_type_name;

use super::{ClientError, ObjectClient, ObjectKey};

/// In-memory [`ObjectClient`] used in place of a seed cluster.
#[derive(Debug, Default, Clone)]
pub struct FakeObjectClient {
    secrets: BTreeMap<ObjectKey, Secret>,
    config_maps: BTreeMap<ObjectKey, ConfigMap>,
    services: BTreeMap<ObjectKey, Service>,
    deployments: BTreeMap<ObjectKey, Deployment>,
}

impl FakeObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secrets.insert(key_of(&secret), secret);
        self
    }

    pub fn with_config_map(mut self, config_map: ConfigMap) -> Self {
        self.config_maps.insert(key_of(&config_map), config_map);
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.insert(key_of(&service), service);
        self
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployments.insert(key_of(&deployment), deployment);
        self
    }
}

fn key_of<T: Resource>(object: &T) -> ObjectKey {
    let meta = object.meta();

    ObjectKey::new(
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}

fn lookup<T: Clone>(store: &BTreeMap<ObjectKey, T>, key: &ObjectKey) -> Result<T, ClientError> {
    store.get(key).cloned().ok_or_else(|| ClientError::NotFound {
        kind: pretty_type_name::<T>(),
        key: key.to_owned(),
    })
}

#[async_trait]
impl ObjectClient for FakeObjectClient {
    async fn get_secret(&self, key: &ObjectKey) -> Result<Secret, ClientError> {
        lookup(&self.secrets, key)
    }

    async fn get_config_map(&self, key: &ObjectKey) -> Result<ConfigMap, ClientError> {
        lookup(&self.config_maps, key)
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Service, ClientError> {
        lookup(&self.services, key)
    }

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Deployment, ClientError> {
        lookup(&self.deployments, key)
    }
}
