use std::fmt::Debug;

use anyhow::Context;
use k8s_openapi::{
    api::core::v1::Namespace, apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::{
    api::{Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    core::ObjectMeta,
    Api, Client, Config, Resource,
};
use log::info;
use serde::{de::DeserializeOwned, Serialize};

use crate::helpers::pretty_type_name;

pub async fn create_local_client(
    config_path: &Option<String>,
    context_name: &Option<String>,
) -> anyhow::Result<Client> {
    let config_options = KubeConfigOptions {
        context: context_name.to_owned(),
        ..Default::default()
    };

    let config = match config_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &config_options).await?
        }
        None => Config::infer().await?,
    };

    let client = Client::try_from(config)?;

    Ok(client)
}

pub async fn create_namespace_if_not_exists(
    client: &Client,
    patch_params: &PatchParams,
    name: &str,
    owner: Option<OwnerReference>,
) -> Result<Namespace, kube::Error> {
    let namespace_api: Api<Namespace> = Api::all(client.clone());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            owner_references: owner.map(|owner| vec![owner]),
            ..Default::default()
        },
        ..Default::default()
    };

    info!("Ensuring namespace '{}' is created...", name);
    namespace_api
        .patch(name, patch_params, &Patch::Apply(namespace))
        .await
}

/// Server-side applies `status` onto a cluster scoped resource.
pub async fn apply_cluster_status<T, S>(
    client: &Client,
    name: &str,
    status: &S,
    patch_params: &PatchParams,
) -> anyhow::Result<T>
where
    T: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    S: Serialize,
{
    let api: Api<T> = Api::all(client.clone());
    let patch = serde_json::json!({
        "apiVersion": T::api_version(&()),
        "kind": T::kind(&()),
        "status": status,
    });

    api.patch_status(name, patch_params, &Patch::Apply(patch))
        .await
        .context(format!(
            "Unable to update the status of '{name}' {}!",
            pretty_type_name::<T>()
        ))
}
