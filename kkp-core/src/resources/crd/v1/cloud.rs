use std::fmt::{self, Display};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

/// Cloud providers a user cluster can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudProvider {
    Fake,
    Digitalocean,
    BringYourOwn,
    Aws,
    Azure,
    Openstack,
    Packet,
    Hetzner,
    VSphere,
    Gcp,
    Kubevirt,
    Alibaba,
    Anexia,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Fake => "fake",
            CloudProvider::Digitalocean => "digitalocean",
            CloudProvider::BringYourOwn => "bringyourown",
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Openstack => "openstack",
            CloudProvider::Packet => "packet",
            CloudProvider::Hetzner => "hetzner",
            CloudProvider::VSphere => "vsphere",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Kubevirt => "kubevirt",
            CloudProvider::Alibaba => "alibaba",
            CloudProvider::Anexia => "anexia",
        }
    }
}

impl Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CloudProviderError {
    #[error("provider unknown")]
    Unknown,
    #[error("only one cloud provider can be set, found: {}", .0.join(", "))]
    Ambiguous(Vec<&'static str>),
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudSpec {
    /// name of the datacenter the cluster is placed in
    #[serde(default)]
    pub dc: String,
    pub fake: Option<FakeCloudSpec>,
    pub digitalocean: Option<DigitaloceanCloudSpec>,
    pub bringyourown: Option<BringYourOwnCloudSpec>,
    pub aws: Option<AwsCloudSpec>,
    pub azure: Option<AzureCloudSpec>,
    pub openstack: Option<OpenstackCloudSpec>,
    pub packet: Option<PacketCloudSpec>,
    pub hetzner: Option<HetznerCloudSpec>,
    pub vsphere: Option<VSphereCloudSpec>,
    pub gcp: Option<GcpCloudSpec>,
    pub kubevirt: Option<KubevirtCloudSpec>,
    pub alibaba: Option<AlibabaCloudSpec>,
    pub anexia: Option<AnexiaCloudSpec>,
}

impl CloudSpec {
    /// Every provider whose section is set, in precedence order.
    pub fn configured_providers(&self) -> Vec<CloudProvider> {
        [
            (self.vsphere.is_some(), CloudProvider::VSphere),
            (self.aws.is_some(), CloudProvider::Aws),
            (self.openstack.is_some(), CloudProvider::Openstack),
            (self.gcp.is_some(), CloudProvider::Gcp),
            (self.alibaba.is_some(), CloudProvider::Alibaba),
            (self.anexia.is_some(), CloudProvider::Anexia),
            (self.azure.is_some(), CloudProvider::Azure),
            (self.digitalocean.is_some(), CloudProvider::Digitalocean),
            (self.hetzner.is_some(), CloudProvider::Hetzner),
            (self.kubevirt.is_some(), CloudProvider::Kubevirt),
            (self.packet.is_some(), CloudProvider::Packet),
            (self.bringyourown.is_some(), CloudProvider::BringYourOwn),
            (self.fake.is_some(), CloudProvider::Fake),
        ]
        .into_iter()
        .filter_map(|(set, provider)| set.then_some(provider))
        .collect()
    }

    /// First configured provider.
    pub fn provider(&self) -> Result<CloudProvider, CloudProviderError> {
        self.configured_providers()
            .first()
            .copied()
            .ok_or(CloudProviderError::Unknown)
    }

    /// The configured provider, rejecting specs with more than one provider set.
    pub fn single_provider(&self) -> Result<CloudProvider, CloudProviderError> {
        match self.configured_providers().as_slice() {
            [] => Err(CloudProviderError::Unknown),
            [provider] => Ok(*provider),
            many => Err(CloudProviderError::Ambiguous(
                many.iter().map(CloudProvider::as_str).collect(),
            )),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FakeCloudSpec {
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DigitaloceanCloudSpec {
    #[serde(default)]
    pub credentials_reference: Option<GlobalSecretKeySelector>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct BringYourOwnCloudSpec {}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub vpc_id: Option<String>,
    pub security_group_id: Option<String>,
    pub instance_profile_name: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub resource_group: Option<String>,
    pub vnet: Option<String>,
    pub subnet: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenstackCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub network: Option<String>,
    pub floating_ip_pool: Option<String>,
    pub use_octavia: Option<bool>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PacketCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub billing_cycle: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HetznerCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub network: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VSphereCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub folder: Option<String>,
    pub datastore: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GcpCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlibabaCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnexiaCloudSpec {
    pub credentials_reference: Option<GlobalSecretKeySelector>,
    pub vlan_id: Option<String>,
    pub template_id: Option<String>,
}

/// Reference to a key of a secret in any namespace.
#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSecretKeySelector {
    pub name: String,
    pub namespace: String,
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_provider_is_resolved() {
        let cases = [
            (
                CloudSpec {
                    aws: Some(Default::default()),
                    ..Default::default()
                },
                "aws",
            ),
            (
                CloudSpec {
                    openstack: Some(Default::default()),
                    ..Default::default()
                },
                "openstack",
            ),
            (
                CloudSpec {
                    bringyourown: Some(Default::default()),
                    ..Default::default()
                },
                "bringyourown",
            ),
            (
                CloudSpec {
                    vsphere: Some(Default::default()),
                    ..Default::default()
                },
                "vsphere",
            ),
        ];

        for (spec, expected) in cases {
            assert_eq!(spec.single_provider().unwrap().as_str(), expected);
            assert_eq!(spec.provider().unwrap().as_str(), expected);
        }
    }

    #[test]
    fn empty_spec_has_unknown_provider() {
        assert_eq!(CloudSpec::default().provider(), Err(CloudProviderError::Unknown));
        assert_eq!(
            CloudSpec::default().single_provider(),
            Err(CloudProviderError::Unknown)
        );
    }

    #[test]
    fn multiple_providers_are_ambiguous() {
        let spec = CloudSpec {
            aws: Some(Default::default()),
            fake: Some(Default::default()),
            ..Default::default()
        };

        assert_eq!(spec.provider(), Ok(CloudProvider::Aws));
        assert_eq!(
            spec.single_provider(),
            Err(CloudProviderError::Ambiguous(vec!["aws", "fake"]))
        );
    }
}
