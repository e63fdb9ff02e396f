use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::{
    cloud::{CloudProvider, CloudProviderError},
    cluster::ExposeStrategy,
};

#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "Seed",
    namespaced,
    derive = "Default"
)]
pub struct SeedSpec {
    /// ISO-3166 two-letter country code
    #[serde(default)]
    pub country: String,
    /// human readable location of the seed
    #[serde(default)]
    pub location: String,
    /// datacenters user clusters of this seed can be placed in
    #[serde(default)]
    pub datacenters: BTreeMap<String, Datacenter>,
    /// replaces the seed name in DNS names of user cluster endpoints
    #[serde(rename = "seedDNSOverwrite")]
    pub seed_dns_overwrite: Option<String>,
    /// default expose strategy of user clusters
    pub expose_strategy: Option<ExposeStrategy>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub node: NodeSettings,
    #[serde(default)]
    pub spec: DatacenterSpec,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeSettings {
    pub http_proxy: Option<String>,
    pub no_proxy: Option<String>,
    pub insecure_registries: Option<Vec<String>>,
    pub registry_mirrors: Option<Vec<String>>,
    pub pause_image: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpec {
    pub digitalocean: Option<DatacenterSpecDigitalocean>,
    pub bringyourown: Option<DatacenterSpecBringYourOwn>,
    pub aws: Option<DatacenterSpecRegion>,
    pub azure: Option<DatacenterSpecAzure>,
    pub openstack: Option<DatacenterSpecOpenstack>,
    pub packet: Option<DatacenterSpecPacket>,
    pub hetzner: Option<DatacenterSpecHetzner>,
    pub vsphere: Option<DatacenterSpecVSphere>,
    pub gcp: Option<DatacenterSpecGcp>,
    pub kubevirt: Option<DatacenterSpecKubevirt>,
    pub alibaba: Option<DatacenterSpecRegion>,
    pub anexia: Option<DatacenterSpecAnexia>,
    pub fake: Option<DatacenterSpecFake>,
}

impl DatacenterSpec {
    pub fn provider(&self) -> Result<CloudProvider, CloudProviderError> {
        [
            (self.digitalocean.is_some(), CloudProvider::Digitalocean),
            (self.bringyourown.is_some(), CloudProvider::BringYourOwn),
            (self.aws.is_some(), CloudProvider::Aws),
            (self.azure.is_some(), CloudProvider::Azure),
            (self.openstack.is_some(), CloudProvider::Openstack),
            (self.packet.is_some(), CloudProvider::Packet),
            (self.hetzner.is_some(), CloudProvider::Hetzner),
            (self.vsphere.is_some(), CloudProvider::VSphere),
            (self.gcp.is_some(), CloudProvider::Gcp),
            (self.kubevirt.is_some(), CloudProvider::Kubevirt),
            (self.alibaba.is_some(), CloudProvider::Alibaba),
            (self.anexia.is_some(), CloudProvider::Anexia),
            (self.fake.is_some(), CloudProvider::Fake),
        ]
        .into_iter()
        .find_map(|(set, provider)| set.then_some(provider))
        .ok_or(CloudProviderError::Unknown)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatacenterSpecDigitalocean {
    #[serde(default)]
    pub region: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatacenterSpecBringYourOwn {}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatacenterSpecRegion {
    #[serde(default)]
    pub region: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatacenterSpecAzure {
    #[serde(default)]
    pub location: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpecOpenstack {
    #[serde(default)]
    pub auth_url: String,
    #[serde(default)]
    pub region: String,
    pub availability_zone: Option<String>,
    pub dns_servers: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatacenterSpecPacket {
    #[serde(default)]
    pub facilities: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatacenterSpecHetzner {
    #[serde(default)]
    pub datacenter: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpecVSphere {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub datacenter: String,
    #[serde(default)]
    pub default_datastore: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpecGcp {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone_suffixes: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpecKubevirt {
    #[serde(default)]
    pub dns_policy: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatacenterSpecAnexia {
    #[serde(default)]
    pub location_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpecFake {
    #[serde(default)]
    pub fake_property: String,
}

impl Seed {
    pub fn datacenter(&self, name: &str) -> Option<&Datacenter> {
        self.spec.datacenters.get(name)
    }
}
