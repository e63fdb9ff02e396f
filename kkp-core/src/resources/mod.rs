use std::borrow::Cow;

use thiserror::Error;

use crate::{kubernetes::ClientError, pki::PkiError};

use self::{crd::v1::cloud::CloudProviderError, image::ImageReferenceError, ports::PortRangeError};

pub mod cloud;
pub mod crd;
pub mod data;
pub mod image;
pub mod kcm;
pub mod labels;
pub mod meta;
pub mod ports;

pub const DEFAULT_NODE_PORT_RANGE: &str = "30000-32767";
pub const REGISTRY_DOCKER: &str = "docker.io";

pub const VIEWER_TOKEN_SECRET_NAME: &str = "viewer-token";
pub const VIEWER_TOKEN_SECRET_KEY: &str = "token";

pub const OPENVPN_SERVER_SERVICE_NAME: &str = "openvpn-server";
pub const OPENVPN_TUNNELING_PORT: i32 = 1194;
pub const MLA_GATEWAY_EXTERNAL_SERVICE_NAME: &str = "mla-gateway-ext";

pub const CONTROLLER_MANAGER_DEPLOYMENT_NAME: &str = "controller-manager";

#[derive(Debug, Error)]
pub enum TemplateDataError {
    #[error("Couldn't look up a dependent object! Reason: {}", .0)]
    Lookup(#[from] ClientError),
    #[error("{} '{}' is missing required data ({})!", .kind, .name, .detail)]
    MissingData {
        kind: &'static str,
        name: String,
        detail: Cow<'static, str>,
    },
    #[error("{} '{}' contains invalid data ({})!", .kind, .name, .detail)]
    InvalidData {
        kind: &'static str,
        name: String,
        detail: Cow<'static, str>,
    },
    #[error("Couldn't identify the cloud provider! Reason: {}", .0)]
    CloudProvider(#[from] CloudProviderError),
    #[error("Couldn't load a certificate authority! Reason: {}", .0)]
    Pki(#[from] PkiError),
    #[error("Invalid node port range! Reason: {}", .0)]
    PortRange(#[from] PortRangeError),
    #[error("Invalid image reference! Reason: {}", .0)]
    ImageReference(#[from] ImageReferenceError),
}
