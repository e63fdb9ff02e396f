use log::debug;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    models::{ClusterHealth, ErrorResponse},
    ApiError, Transport,
};

/// Successful outcomes of `GET /api/v2/projects/{project_id}/clusters/{cluster_id}/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetClusterHealthV2Response {
    Ok(ClusterHealth),
    /// Undocumented 2xx code.
    Default { code: u16, payload: ErrorResponse },
}

#[derive(Debug, Error)]
pub enum GetClusterHealthV2Error {
    #[error("[GET {}][401] getClusterHealthV2Unauthorized", CLUSTER_HEALTH_V2_PATH)]
    Unauthorized,
    #[error("[GET {}][403] getClusterHealthV2Forbidden", CLUSTER_HEALTH_V2_PATH)]
    Forbidden,
    #[error(
        "[GET {}][{}] getClusterHealthV2 default {:?}",
        CLUSTER_HEALTH_V2_PATH,
        .code,
        .payload
    )]
    Default { code: u16, payload: ErrorResponse },
    #[error("Couldn't decode the response! Reason: {}", .0)]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl GetClusterHealthV2Error {
    pub fn code(&self) -> Option<u16> {
        match self {
            GetClusterHealthV2Error::Unauthorized => Some(401),
            GetClusterHealthV2Error::Forbidden => Some(403),
            GetClusterHealthV2Error::Default { code, .. } => Some(*code),
            _ => None,
        }
    }
}

const CLUSTER_HEALTH_V2_PATH: &str = "/api/v2/projects/{project_id}/clusters/{cluster_id}/health";

/// Empty bodies decode to the payload's default value.
fn decode<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
}

/// Maps a raw response of the cluster health endpoint to its typed outcome.
pub fn read_cluster_health_v2_response(
    status: u16,
    body: &[u8],
) -> Result<GetClusterHealthV2Response, GetClusterHealthV2Error> {
    match status {
        200 => Ok(GetClusterHealthV2Response::Ok(decode(body)?)),
        401 => Err(GetClusterHealthV2Error::Unauthorized),
        403 => Err(GetClusterHealthV2Error::Forbidden),
        code => {
            let payload = decode(body)?;
            if code / 100 == 2 {
                Ok(GetClusterHealthV2Response::Default { code, payload })
            } else {
                Err(GetClusterHealthV2Error::Default { code, payload })
            }
        }
    }
}

/// Operations of the `project` resource group.
#[derive(Debug, Clone)]
pub struct ProjectClient {
    transport: Transport,
}

impl ProjectClient {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Health of the control plane components of a cluster.
    pub async fn get_cluster_health_v2(
        &self,
        project_id: &str,
        cluster_id: &str,
    ) -> Result<GetClusterHealthV2Response, GetClusterHealthV2Error> {
        let url = self.transport.url(&[
            "api",
            "v2",
            "projects",
            project_id,
            "clusters",
            cluster_id,
            "health",
        ])?;
        debug!("GET {url}");

        let (status, body) = self.transport.get(url).await?;
        debug!("Cluster health of '{project_id}/{cluster_id}' responded with {status}");

        read_cluster_health_v2_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{ErrorDetails, HealthStatus};

    use super::*;

    #[test]
    fn ok_response_carries_the_health() {
        let body = br#"{"apiserver":1,"controller":1,"etcd":2,"scheduler":0}"#;

        let response = read_cluster_health_v2_response(200, body);
        let Ok(GetClusterHealthV2Response::Ok(health)) = response else {
            panic!("expected an ok outcome");
        };

        assert_eq!(health.apiserver, HealthStatus::Up);
        assert_eq!(health.etcd, HealthStatus::Provisioning);
        assert_eq!(health.scheduler, HealthStatus::Down);
        assert_eq!(health.mla_gateway, HealthStatus::Down);
        assert!(!health.control_plane_up());
    }

    #[test]
    fn ok_response_tolerates_an_empty_body() {
        assert_eq!(
            read_cluster_health_v2_response(200, b"").unwrap(),
            GetClusterHealthV2Response::Ok(ClusterHealth::default())
        );
    }

    #[test]
    fn auth_failures_are_empty_errors() {
        let unauthorized = read_cluster_health_v2_response(401, b"ignored").unwrap_err();
        let forbidden = read_cluster_health_v2_response(403, b"").unwrap_err();

        assert!(matches!(unauthorized, GetClusterHealthV2Error::Unauthorized));
        assert!(matches!(forbidden, GetClusterHealthV2Error::Forbidden));
        assert_eq!(forbidden.code(), Some(403));
    }

    #[test]
    fn other_codes_carry_the_error_payload() {
        let body = br#"{"error":{"code":404,"message":"cluster not found","details":["abc"]}}"#;

        let error = read_cluster_health_v2_response(404, body).unwrap_err();

        let GetClusterHealthV2Error::Default { code, payload } = error else {
            panic!("expected a default outcome");
        };
        assert_eq!(code, 404);
        assert_eq!(
            payload.error,
            Some(ErrorDetails {
                code: 404,
                message: "cluster not found".to_owned(),
                details: vec!["abc".to_owned()],
            })
        );
    }

    #[test]
    fn undocumented_success_codes_are_successful() {
        assert_eq!(
            read_cluster_health_v2_response(204, b"").unwrap(),
            GetClusterHealthV2Response::Default {
                code: 204,
                payload: ErrorResponse::default(),
            }
        );
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        assert!(matches!(
            read_cluster_health_v2_response(200, b"<html>"),
            Err(GetClusterHealthV2Error::Decode(_))
        ));
    }
}
