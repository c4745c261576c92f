use serde::{Deserialize, Serialize};

/// Automatic resubmissions of a failed conversion before a sample is parked
/// in `error` for manual intervention
pub const MAX_RETRIES: u32 = 3;

/// Where a sample sits in the conversion lifecycle.
///
/// `new → submitted → complete` on the happy path; a failed job resets to
/// `new` until the retry cap, and `error` means someone has to look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    New,
    Submitted,
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleState {
    pub status: SampleStatus,
    pub container_request: Option<String>,
    pub output_collection: Option<String>,
    /// Absent in state files written before retries were bounded
    #[serde(default)]
    pub retries: u32,
}

impl SampleState {
    pub fn fresh() -> SampleState {
        SampleState {
            status: SampleStatus::New,
            container_request: None,
            output_collection: None,
            retries: 0,
        }
    }

    /// Back to `new` with job bookkeeping cleared, counting the attempt
    pub fn reset_for_retry(&mut self) {
        self.status = SampleStatus::New;
        self.container_request = None;
        self.output_collection = None;
        self.retries += 1;
    }

    /// Park the sample for manual intervention
    pub fn park(&mut self) {
        self.status = SampleStatus::Error;
        self.container_request = None;
        self.output_collection = None;
    }
}

/// Status of the single cross-sample aggregation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PangenomeStatus {
    Submitted,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialises_snake_case() {
        assert_eq!(
            serde_json::to_string(&SampleStatus::Submitted).unwrap(),
            "\"submitted\""
        );
    }

    #[test]
    fn record_without_retries_field_loads() {
        let state: SampleState = serde_json::from_str(
            r#"{"status":"submitted","container_request":"cr-1","output_collection":null}"#,
        )
        .unwrap();
        assert_eq!(state.status, SampleStatus::Submitted);
        assert_eq!(state.retries, 0);
    }

    #[test]
    fn reset_clears_job_and_counts() {
        let mut state = SampleState {
            status: SampleStatus::Submitted,
            container_request: Some("cr-1".to_string()),
            output_collection: Some("col-1".to_string()),
            retries: 1,
        };
        state.reset_for_retry();
        assert_eq!(state.status, SampleStatus::New);
        assert!(state.container_request.is_none());
        assert!(state.output_collection.is_none());
        assert_eq!(state.retries, 2);
    }
}
