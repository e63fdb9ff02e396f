use std::{
    fmt::{self, Debug, Display},
    fs,
    path::Path,
};

use k8s_openapi::api::core::v1::Secret;
use log::debug;
use thiserror::Error;
use x509_parser::parse_x509_certificate;

use crate::kubernetes::{ClientError, ObjectClient, ObjectKey};

pub const CA_SECRET_NAME: &str = "ca";
pub const FRONT_PROXY_CA_SECRET_NAME: &str = "front-proxy-ca";
pub const OPENVPN_CA_SECRET_NAME: &str = "openvpn-ca";
pub const MLA_GATEWAY_CA_SECRET_NAME: &str = "mla-gateway-ca";

pub const CA_CERT_SECRET_KEY: &str = "ca.crt";
pub const CA_KEY_SECRET_KEY: &str = "ca.key";

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const PKCS8_KEY_TAG: &str = "PRIVATE KEY";
const RSA_KEY_TAG: &str = "RSA PRIVATE KEY";
const EC_KEY_TAG: &str = "EC PRIVATE KEY";

#[derive(Debug, Error)]
pub enum PkiError {
    #[error("Couldn't load the CA secret! Reason: {}", .0)]
    Lookup(#[from] ClientError),
    #[error("Secret '{}' is missing the '{}' key!", .secret, .key)]
    MissingKey { secret: ObjectKey, key: &'static str },
    #[error("Couldn't parse PEM data: {}", .0)]
    Pem(#[from] pem::PemError),
    #[error("Expected a PEM block of type {}, got '{}'!", .expected, .actual)]
    UnexpectedPemTag { expected: String, actual: String },
    #[error("No certificates found!")]
    NoCertificates,
    #[error("Invalid X.509 certificate: {}", .0)]
    Certificate(String),
    #[error("Couldn't read CA bundle file: {}", .0)]
    Io(#[from] std::io::Error),
}

/// Set of CA certificates trusted for outgoing connections.
pub trait CaBundle: Debug + Send + Sync {
    /// DER encoded certificates of the pool.
    fn cert_pool(&self) -> &[Vec<u8>];

    /// PEM representation of the whole bundle.
    fn as_pem(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemCaBundle {
    pem: String,
    certificates: Vec<Vec<u8>>,
}

impl PemCaBundle {
    pub fn from_pem(raw: &str) -> Result<Self, PkiError> {
        let certificates = pem::parse_many(raw)?
            .into_iter()
            .map(|block| {
                expect_tag(&block, &[CERTIFICATE_TAG])?;
                validate_certificate(block.contents())?;
                Ok(block.into_contents())
            })
            .collect::<Result<Vec<_>, PkiError>>()?;

        if certificates.is_empty() {
            return Err(PkiError::NoCertificates);
        }

        debug!("Loaded CA bundle with {} certificate(s)", certificates.len());

        Ok(Self {
            pem: raw.to_owned(),
            certificates,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PkiError> {
        Self::from_pem(&fs::read_to_string(path)?)
    }
}

impl CaBundle for PemCaBundle {
    fn cert_pool(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    fn as_pem(&self) -> &str {
        &self.pem
    }
}

impl Display for PemCaBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pem)
    }
}

/// CA certificate with its private key.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub certificate_pem: String,
    pub certificate_der: Vec<u8>,
    pub subject: String,
    pub key_pem: String,
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Same as [`KeyPair`], restricted to ECDSA keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaKeyPair(pub KeyPair);

impl KeyPair {
    pub fn from_pem(certificate: &str, key: &str, key_tags: &[&str]) -> Result<Self, PkiError> {
        let certificate_block = pem::parse(certificate)?;
        expect_tag(&certificate_block, &[CERTIFICATE_TAG])?;
        let subject = validate_certificate(certificate_block.contents())?;

        let key_block = pem::parse(key)?;
        expect_tag(&key_block, key_tags)?;

        Ok(Self {
            certificate_pem: certificate.to_owned(),
            certificate_der: certificate_block.into_contents(),
            subject,
            key_pem: key.to_owned(),
        })
    }
}

fn expect_tag(block: &pem::Pem, expected: &[&str]) -> Result<(), PkiError> {
    if expected.contains(&block.tag()) {
        return Ok(());
    }

    Err(PkiError::UnexpectedPemTag {
        expected: expected.join(" or "),
        actual: block.tag().to_owned(),
    })
}

fn validate_certificate(der: &[u8]) -> Result<String, PkiError> {
    let (_, certificate) =
        parse_x509_certificate(der).map_err(|e| PkiError::Certificate(e.to_string()))?;

    Ok(certificate.subject().to_string())
}

async fn load_secret_pair(
    client: &dyn ObjectClient,
    namespace: &str,
    secret_name: &str,
) -> Result<(String, String), PkiError> {
    let key = ObjectKey::new(namespace, secret_name);
    let secret = client.get_secret(&key).await?;

    let certificate = secret_value(&secret, &key, CA_CERT_SECRET_KEY)?;
    let private_key = secret_value(&secret, &key, CA_KEY_SECRET_KEY)?;

    Ok((certificate, private_key))
}

fn secret_value(
    secret: &Secret,
    key: &ObjectKey,
    data_key: &'static str,
) -> Result<String, PkiError> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(data_key))
        .map(|value| String::from_utf8_lossy(&value.0).into_owned())
        .ok_or_else(|| PkiError::MissingKey {
            secret: key.to_owned(),
            key: data_key,
        })
}

async fn load_key_pair(
    client: &dyn ObjectClient,
    namespace: &str,
    secret_name: &str,
) -> Result<KeyPair, PkiError> {
    let (certificate, key) = load_secret_pair(client, namespace, secret_name).await?;

    KeyPair::from_pem(&certificate, &key, &[RSA_KEY_TAG, PKCS8_KEY_TAG])
}

async fn load_ecdsa_key_pair(
    client: &dyn ObjectClient,
    namespace: &str,
    secret_name: &str,
) -> Result<EcdsaKeyPair, PkiError> {
    let (certificate, key) = load_secret_pair(client, namespace, secret_name).await?;

    KeyPair::from_pem(&certificate, &key, &[EC_KEY_TAG, PKCS8_KEY_TAG]).map(EcdsaKeyPair)
}

pub async fn get_cluster_root_ca(
    client: &dyn ObjectClient,
    namespace: &str,
) -> Result<KeyPair, PkiError> {
    load_key_pair(client, namespace, CA_SECRET_NAME).await
}

pub async fn get_cluster_front_proxy_ca(
    client: &dyn ObjectClient,
    namespace: &str,
) -> Result<KeyPair, PkiError> {
    load_key_pair(client, namespace, FRONT_PROXY_CA_SECRET_NAME).await
}

pub async fn get_openvpn_ca(
    client: &dyn ObjectClient,
    namespace: &str,
) -> Result<EcdsaKeyPair, PkiError> {
    load_ecdsa_key_pair(client, namespace, OPENVPN_CA_SECRET_NAME).await
}

pub async fn get_mla_gateway_ca(
    client: &dyn ObjectClient,
    namespace: &str,
) -> Result<EcdsaKeyPair, PkiError> {
    load_ecdsa_key_pair(client, namespace, MLA_GATEWAY_CA_SECRET_NAME).await
}
