use std::collections::BTreeMap;

use futures::future::try_join_all;
use k8s_openapi::api::core::v1::Volume;

use crate::kubernetes::{ClientError, ObjectClient, ObjectKey};

pub const APP_LABEL_KEY: &str = "app";
pub const CLUSTER_LABEL_KEY: &str = "cluster";

pub fn app_cluster_labels(
    app_name: &str,
    cluster_name: &str,
    additional_labels: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::from([
        (APP_LABEL_KEY.to_owned(), app_name.to_owned()),
        (CLUSTER_LABEL_KEY.to_owned(), cluster_name.to_owned()),
    ]);
    labels.extend(additional_labels.clone());

    labels
}

enum VolumeSource<'a> {
    Secret(&'a str),
    ConfigMap(&'a str),
}

/// Pod labels carrying the resource versions of every mounted secret and
/// configmap, so pods get replaced whenever one of them changes.
pub async fn get_pod_template_labels(
    client: &dyn ObjectClient,
    app_name: &str,
    cluster_name: &str,
    namespace: &str,
    volumes: &[Volume],
    additional_labels: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ClientError> {
    let mut labels = app_cluster_labels(app_name, cluster_name, additional_labels);

    let sources = volumes.iter().flat_map(|volume| {
        let secret = volume
            .secret
            .as_ref()
            .and_then(|s| s.secret_name.as_deref())
            .map(VolumeSource::Secret);
        let config_map = volume
            .config_map
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .map(VolumeSource::ConfigMap);

        secret.into_iter().chain(config_map)
    });

    let revisions = try_join_all(sources.map(|source| async move {
        match source {
            VolumeSource::Secret(name) => {
                let secret = client.get_secret(&ObjectKey::new(namespace, name)).await?;
                Ok::<_, ClientError>((
                    format!("{name}-secret-revision"),
                    secret.metadata.resource_version.unwrap_or_default(),
                ))
            }
            VolumeSource::ConfigMap(name) => {
                let config_map = client
                    .get_config_map(&ObjectKey::new(namespace, name))
                    .await?;
                Ok((
                    format!("{name}-configmap-revision"),
                    config_map.metadata.resource_version.unwrap_or_default(),
                ))
            }
        }
    }))
    .await?;

    labels.extend(revisions);

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{ConfigMap, ConfigMapVolumeSource, Secret, SecretVolumeSource};
    use kube::core::ObjectMeta;

    use crate::kubernetes::fake::FakeObjectClient;

    use super::*;

    fn meta(name: &str, resource_version: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some("cluster-abc".to_owned()),
            resource_version: Some(resource_version.to_owned()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn labels_contain_revisions_of_mounted_objects() {
        let client = FakeObjectClient::new()
            .with_secret(Secret {
                metadata: meta("apiserver-tls", "42"),
                ..Default::default()
            })
            .with_config_map(ConfigMap {
                metadata: meta("audit-config", "7"),
                ..Default::default()
            });
        let volumes = vec![
            Volume {
                name: "tls".to_owned(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some("apiserver-tls".to_owned()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Volume {
                name: "audit".to_owned(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some("audit-config".to_owned()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Volume {
                name: "scratch".to_owned(),
                ..Default::default()
            },
        ];
        let additional = BTreeMap::from([("role".to_owned(), "control-plane".to_owned())]);

        let labels = get_pod_template_labels(
            &client,
            "apiserver",
            "abc",
            "cluster-abc",
            &volumes,
            &additional,
        )
        .await
        .unwrap();

        assert_eq!(
            labels,
            BTreeMap::from([
                ("app".to_owned(), "apiserver".to_owned()),
                ("cluster".to_owned(), "abc".to_owned()),
                ("role".to_owned(), "control-plane".to_owned()),
                ("apiserver-tls-secret-revision".to_owned(), "42".to_owned()),
                ("audit-config-configmap-revision".to_owned(), "7".to_owned()),
            ])
        );
    }

    #[tokio::test]
    async fn missing_mounted_secret_is_an_error() {
        let volumes = vec![Volume {
            name: "tls".to_owned(),
            secret: Some(SecretVolumeSource {
                secret_name: Some("apiserver-tls".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        }];

        let result = get_pod_template_labels(
            &FakeObjectClient::new(),
            "apiserver",
            "abc",
            "cluster-abc",
            &volumes,
            &BTreeMap::new(),
        )
        .await;

        assert!(result.unwrap_err().is_not_found());
    }
}
