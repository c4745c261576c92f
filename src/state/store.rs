use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::state::sample::{PangenomeStatus, SampleState};

/// The whole persisted state: one record per sample keyed by sample id,
/// plus two well-known keys tracking the aggregation job.
///
/// The sample map is flattened so the file keeps its historical layout:
/// sample ids at the top level next to the pangenome keys.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pangenome_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pangenome_request_status: Option<PangenomeStatus>,
    #[serde(flatten)]
    pub samples: BTreeMap<String, SampleState>,
}

impl State {
    /// Load the state file; a missing or malformed file yields an empty
    /// state rather than aborting the run
    pub fn load(path: &Path) -> State {
        if !path.exists() {
            info!("No state file at {}, starting empty", path.display());
            return State::default();
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Can't read state file {}: {err}", path.display());
                return State::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(err) => {
                warn!(
                    "State file {} is malformed ({err}), starting empty",
                    path.display()
                );
                State::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)
            .with_context(|| format!("writing state file {}", path.display()))?;
        info!("Saved state to {}", path.display());
        Ok(())
    }

    /// Record for a sample, created `new` on first observation
    pub fn sample_mut(&mut self, sample_id: &str) -> &mut SampleState {
        self.samples
            .entry(sample_id.to_string())
            .or_insert_with(SampleState::fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::sample::SampleStatus;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = State::load(&dir.path().join("state.json"));
        assert!(state.samples.is_empty());
        assert!(state.last_pangenome_request.is_none());
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let state = State::load(&path);
        assert!(state.samples.is_empty());
    }

    #[test]
    fn round_trips_samples_and_pangenome_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = State::default();
        state.sample_mut("SAMPLE1").status = SampleStatus::Submitted;
        state.sample_mut("SAMPLE1").container_request = Some("cr-1".to_string());
        state.last_pangenome_request = Some("cr-agg".to_string());
        state.last_pangenome_request_status = Some(PangenomeStatus::Submitted);
        state.save(&path).unwrap();

        let loaded = State::load(&path);
        assert_eq!(loaded.samples.len(), 1);
        let sample = &loaded.samples["SAMPLE1"];
        assert_eq!(sample.status, SampleStatus::Submitted);
        assert_eq!(sample.container_request.as_deref(), Some("cr-1"));
        assert_eq!(loaded.last_pangenome_request.as_deref(), Some("cr-agg"));
        assert_eq!(
            loaded.last_pangenome_request_status,
            Some(PangenomeStatus::Submitted)
        );
    }

    #[test]
    fn historical_file_layout_loads() {
        // layout written by earlier versions: sample ids and pangenome keys
        // side by side at the top level, no retries field
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"SAMPLE1": {"status": "complete", "container_request": "cr-1",
                "output_collection": "col-9"},
                "last_pangenome_request": "cr-agg",
                "last_pangenome_request_status": "submitted"}"#,
        )
        .unwrap();
        let state = State::load(&path);
        assert_eq!(state.samples["SAMPLE1"].status, SampleStatus::Complete);
        assert_eq!(state.samples["SAMPLE1"].retries, 0);
        assert_eq!(state.last_pangenome_request.as_deref(), Some("cr-agg"));
    }

    #[test]
    fn first_observation_creates_new_record() {
        let mut state = State::default();
        let record = state.sample_mut("SAMPLE2");
        assert_eq!(record.status, SampleStatus::New);
        assert!(record.container_request.is_none());
    }
}
