pub mod helpers;
pub mod kubernetes;
pub mod pki;
pub mod resources;
pub mod version;

pub const RESOURCE_GROUP: &str = "kubermatic.k8c.io";
pub const OPERATOR_RESOURCE_GROUP: &str = "operator.kubermatic.io";

pub const FIELD_MANAGER: &str = "kkp-cluster-controller";
