use serde::{Deserialize, Serialize};

/// Health of a single control plane component.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(from = "i64", into = "i64")]
pub enum HealthStatus {
    #[default]
    Down,
    Up,
    Provisioning,
    Unknown(i64),
}

impl From<i64> for HealthStatus {
    fn from(value: i64) -> Self {
        match value {
            0 => HealthStatus::Down,
            1 => HealthStatus::Up,
            2 => HealthStatus::Provisioning,
            other => HealthStatus::Unknown(other),
        }
    }
}

impl From<HealthStatus> for i64 {
    fn from(value: HealthStatus) -> Self {
        match value {
            HealthStatus::Down => 0,
            HealthStatus::Up => 1,
            HealthStatus::Provisioning => 2,
            HealthStatus::Unknown(other) => other,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterHealth {
    pub apiserver: HealthStatus,
    pub controller: HealthStatus,
    pub etcd: HealthStatus,
    pub machine_controller: HealthStatus,
    pub scheduler: HealthStatus,
    pub cloud_provider_infrastructure: HealthStatus,
    pub user_cluster_controller_manager: HealthStatus,
    pub gatekeeper_controller: HealthStatus,
    pub gatekeeper_audit: HealthStatus,
    pub monitoring: HealthStatus,
    pub logging: HealthStatus,
    pub alertmanager_config: HealthStatus,
    pub mla_gateway: HealthStatus,
    pub operating_system_manager: HealthStatus,
    pub kubernetes_dashboard: HealthStatus,
}

impl ClusterHealth {
    /// Whether every component the control plane can't run without is up.
    pub fn control_plane_up(&self) -> bool {
        [
            self.apiserver,
            self.controller,
            self.etcd,
            self.scheduler,
            self.machine_controller,
            self.user_cluster_controller_manager,
        ]
        .iter()
        .all(|status| *status == HealthStatus::Up)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ErrorResponse {
    pub error: Option<ErrorDetails>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ErrorDetails {
    pub code: i64,
    pub message: String,
    pub details: Vec<String>,
}
