use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::client::{ApiError, Client};

/// Lifecycle of a container request on the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RequestState {
    Uncommitted,
    Committed,
    Final,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContainerRequest {
    pub uuid: String,
    pub state: RequestState,
    pub container_uuid: Option<String>,
    #[serde(default)]
    pub output_uuid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ContainerState {
    Queued,
    Locked,
    Running,
    Complete,
    Cancelled,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeStatus {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Container {
    pub state: ContainerState,
    pub priority: i64,
    #[serde(default)]
    pub exit_code: Option<i64>,
    #[serde(default)]
    pub runtime_status: RuntimeStatus,
}

/// Effective status of a submitted job, folded from the request record,
/// its container (if one was assigned), the scheduling priority and the
/// container's runtime status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Request accepted, no container assigned yet
    Pending,
    Queued,
    OnHold,
    Running,
    Failing,
    Warning,
    Complete,
    Failed,
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::OnHold => write!(f, "On hold"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Failing => write!(f, "Failing"),
            JobStatus::Warning => write!(f, "Warning"),
            JobStatus::Complete => write!(f, "Complete"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Fold the two remote status records into one job status.
///
/// A request finalised before its container completed was cancelled out from
/// under us. A completed container with a nonzero exit code failed even
/// though the scheduler considers it done. Priority zero on a queued or
/// locked container means an operator put the job on hold.
pub fn job_status(request: &ContainerRequest, container: Option<&Container>) -> JobStatus {
    let Some(c) = container else {
        return match request.state {
            RequestState::Uncommitted | RequestState::Committed => JobStatus::Pending,
            RequestState::Final => JobStatus::Cancelled,
        };
    };
    if request.state == RequestState::Final && c.state != ContainerState::Complete {
        return JobStatus::Cancelled;
    }
    match c.state {
        ContainerState::Queued | ContainerState::Locked => {
            if c.priority == 0 {
                JobStatus::OnHold
            } else {
                JobStatus::Queued
            }
        }
        ContainerState::Complete => {
            if c.exit_code.unwrap_or(0) != 0 {
                JobStatus::Failed
            } else {
                JobStatus::Complete
            }
        }
        ContainerState::Running => {
            if c.runtime_status.error.is_some() {
                JobStatus::Failing
            } else if c.runtime_status.warning.is_some() {
                JobStatus::Warning
            } else {
                JobStatus::Running
            }
        }
        ContainerState::Cancelled => JobStatus::Cancelled,
    }
}

impl Client {
    pub fn get_container_request(&self, uuid: &str) -> Result<ContainerRequest, ApiError> {
        self.get_json(&format!("/api/v1/container_requests/{uuid}"), &[])
    }

    pub fn get_container(&self, uuid: &str) -> Result<Container, ApiError> {
        self.get_json(&format!("/api/v1/containers/{uuid}"), &[])
    }

    /// Fetch the request and, when assigned, its container, and fold them
    pub fn poll_job(&self, request_uuid: &str) -> Result<(ContainerRequest, JobStatus), ApiError> {
        let request = self.get_container_request(request_uuid)?;
        let container = match &request.container_uuid {
            Some(uuid) => Some(self.get_container(uuid)?),
            None => None,
        };
        let status = job_status(&request, container.as_ref());
        Ok((request, status))
    }
}
