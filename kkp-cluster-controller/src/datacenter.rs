use std::{collections::BTreeMap, path::Path};

use kkp_core::resources::crd::v1::seed::{Datacenter, DatacenterSpec, NodeSettings};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DNS1123_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());
const DNS1123_LABEL_MAX_LENGTH: usize = 63;

#[derive(Debug, Error)]
pub enum DatacenterError {
    #[error("Couldn't read the datacenters file! Reason: {}", .0)]
    Io(#[from] std::io::Error),
    #[error("Couldn't parse the datacenters file! Reason: {}", .0)]
    Yaml(#[from] serde_yaml::Error),
    #[error("Datacenter '{}' is not a seed and doesn't reference one!", .0)]
    MissingSeed(String),
    #[error("Datacenter '{}' references unknown seed '{}'!", .0, .1)]
    UnknownSeed(String, String),
    #[error("Datacenter '{}' has a seed DNS overwrite '{}' that isn't a DNS-1123 label!", .0, .1)]
    InvalidSeedDnsOverwrite(String, String),
}

/// Datacenter entry of the datacenters file.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct DatacenterMeta {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub seed: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub spec: DatacenterSpec,
    #[serde(default)]
    pub node: NodeSettings,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub is_seed: bool,
    #[serde(default)]
    pub seed_dns_overwrite: Option<String>,
}

impl From<&DatacenterMeta> for Datacenter {
    fn from(meta: &DatacenterMeta) -> Self {
        Datacenter {
            country: meta.country.to_owned(),
            location: meta.location.to_owned(),
            node: meta.node.to_owned(),
            spec: meta.spec.to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct DatacentersFile {
    #[serde(default)]
    datacenters: BTreeMap<String, DatacenterMeta>,
}

pub fn parse_datacenters_meta(
    raw: &str,
) -> Result<BTreeMap<String, DatacenterMeta>, DatacenterError> {
    let file: DatacentersFile = serde_yaml::from_str(raw)?;
    validate_datacenters(&file.datacenters)?;

    Ok(file.datacenters)
}

pub async fn load_datacenters_meta(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<String, DatacenterMeta>, DatacenterError> {
    let path = path.as_ref();
    info!("Loading datacenters from '{}'...", path.display());

    let raw = tokio::fs::read_to_string(path).await?;
    let datacenters = parse_datacenters_meta(&raw)?;

    info!("Loaded {} datacenter(s)", datacenters.len());

    Ok(datacenters)
}

pub fn validate_datacenters(
    datacenters: &BTreeMap<String, DatacenterMeta>,
) -> Result<(), DatacenterError> {
    for (name, meta) in datacenters {
        debug!("Validating datacenter '{name}'...");

        if !meta.is_seed {
            if meta.seed.is_empty() {
                return Err(DatacenterError::MissingSeed(name.to_owned()));
            }

            let seed_exists = datacenters
                .get(&meta.seed)
                .map_or(false, |seed| seed.is_seed);
            if !seed_exists {
                return Err(DatacenterError::UnknownSeed(
                    name.to_owned(),
                    meta.seed.to_owned(),
                ));
            }
        }

        if let Some(overwrite) = &meta.seed_dns_overwrite {
            if !is_dns1123_label(overwrite) {
                return Err(DatacenterError::InvalidSeedDnsOverwrite(
                    name.to_owned(),
                    overwrite.to_owned(),
                ));
            }
        }
    }

    Ok(())
}

pub fn is_dns1123_label(value: &str) -> bool {
    value.len() <= DNS1123_LABEL_MAX_LENGTH && DNS1123_LABEL.is_match(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use kkp_core::resources::crd::v1::seed::{
        DatacenterSpecBringYourOwn, DatacenterSpecDigitalocean,
    };

    use super::*;

    fn digitalocean(region: &str) -> DatacenterSpec {
        DatacenterSpec {
            digitalocean: Some(DatacenterSpecDigitalocean {
                region: region.to_owned(),
            }),
            ..Default::default()
        }
    }

    pub(crate) fn build_datacenter_meta() -> BTreeMap<String, DatacenterMeta> {
        BTreeMap::from([
            (
                "us-central1".to_owned(),
                DatacenterMeta {
                    location: "us-central".to_owned(),
                    country: "US".to_owned(),
                    is_seed: true,
                    spec: digitalocean("ams2"),
                    ..Default::default()
                },
            ),
            (
                "us-central1-byo".to_owned(),
                DatacenterMeta {
                    location: "us-central".to_owned(),
                    country: "US".to_owned(),
                    seed: "us-central1".to_owned(),
                    spec: DatacenterSpec {
                        bringyourown: Some(DatacenterSpecBringYourOwn {}),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            ),
            (
                "private-do1".to_owned(),
                DatacenterMeta {
                    location: "US ".to_owned(),
                    seed: "us-central1".to_owned(),
                    country: "NL".to_owned(),
                    private: true,
                    spec: digitalocean("ams2"),
                    ..Default::default()
                },
            ),
            (
                "regular-do1".to_owned(),
                DatacenterMeta {
                    location: "Amsterdam".to_owned(),
                    seed: "us-central1".to_owned(),
                    country: "NL".to_owned(),
                    spec: digitalocean("ams2"),
                    ..Default::default()
                },
            ),
            (
                "dns-override-do2".to_owned(),
                DatacenterMeta {
                    location: "Amsterdam".to_owned(),
                    seed: "us-central1".to_owned(),
                    country: "NL".to_owned(),
                    seed_dns_overwrite: Some("alias-europe-west3-c".to_owned()),
                    spec: digitalocean("ams3"),
                    ..Default::default()
                },
            ),
        ])
    }

    #[test]
    fn test_datacenters_are_valid() {
        assert!(validate_datacenters(&build_datacenter_meta()).is_ok());
    }

    #[test]
    fn datacenters_file_is_parsed() {
        let datacenters = parse_datacenters_meta(
            r#"
datacenters:
  europe-west3-c:
    location: Frankfurt
    country: DE
    is_seed: true
    spec:
      digitalocean:
        region: fra1
  do-ams3:
    location: Amsterdam
    country: NL
    seed: europe-west3-c
    seed_dns_overwrite: alias-europe-west3-c
    spec:
      digitalocean:
        region: ams3
"#,
        )
        .unwrap();

        let dc = &datacenters["do-ams3"];
        assert_eq!(dc.seed, "europe-west3-c");
        assert!(!dc.is_seed);
        assert_eq!(dc.seed_dns_overwrite.as_deref(), Some("alias-europe-west3-c"));

        let converted = Datacenter::from(dc);
        assert_eq!(converted.location, "Amsterdam");
        assert_eq!(converted.spec, digitalocean("ams3"));
    }

    #[test]
    fn unknown_seed_is_rejected() {
        let mut datacenters = build_datacenter_meta();
        datacenters
            .get_mut("regular-do1")
            .unwrap()
            .seed = "europe-west3-c".to_owned();

        assert!(matches!(
            validate_datacenters(&datacenters),
            Err(DatacenterError::UnknownSeed(dc, seed))
                if dc == "regular-do1" && seed == "europe-west3-c"
        ));
    }

    #[test]
    fn non_seed_datacenter_must_reference_a_seed() {
        let mut datacenters = build_datacenter_meta();
        datacenters.get_mut("private-do1").unwrap().seed.clear();

        assert!(matches!(
            validate_datacenters(&datacenters),
            Err(DatacenterError::MissingSeed(_))
        ));
    }

    #[test]
    fn seed_dns_overwrite_must_be_a_dns_label() {
        let mut datacenters = build_datacenter_meta();
        datacenters
            .get_mut("dns-override-do2")
            .unwrap()
            .seed_dns_overwrite = Some("Alias.europe".to_owned());

        assert!(matches!(
            validate_datacenters(&datacenters),
            Err(DatacenterError::InvalidSeedDnsOverwrite(..))
        ));
        assert!(!is_dns1123_label(&"a".repeat(64)));
        assert!(is_dns1123_label("alias-europe-west3-c"));
    }
}
