use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use log::{error, info};
use serde::Serialize;

use crate::api::client::Client;

/// Submits workflow runs through the external runner executable.
///
/// Each submission gets its own sub-project under the workflows project so
/// runs are grouped and uniquely named on the remote side.
pub struct Submitter<'a> {
    pub api: &'a Client,
    pub runner: PathBuf,
    pub workflows_project: String,
}

impl Submitter<'_> {
    /// Submit one workflow run and return the container request id parsed
    /// from the runner's log output
    pub fn run_workflow(
        &self,
        workflow_uuid: &str,
        name: &str,
        input: &impl Serialize,
    ) -> Result<String> {
        let project = self
            .api
            .create_project(&self.workflows_project, name)
            .with_context(|| format!("creating sub-project for {name}"))?;
        info!("Created sub-project {} for '{name}'", project.uuid);

        let mut input_file = tempfile::NamedTempFile::new()?;
        serde_json::to_writer_pretty(input_file.as_file_mut(), input)?;
        input_file.as_file_mut().flush()?;

        let mut cmd = Command::new(&self.runner);
        cmd.arg("--submit")
            .arg("--no-wait")
            .arg(format!("--project-uuid={}", project.uuid))
            .arg(format!("wf:{workflow_uuid}"))
            .arg(input_file.path());
        info!("Running {cmd:?}");

        // blocks until the runner exits; output is only read in full
        let output = cmd
            .output()
            .with_context(|| format!("running {}", self.runner.display()))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            error!("Workflow runner failed:\n{stderr}");
            bail!("workflow runner exited with {}", output.status);
        }

        parse_container_request(&stderr)
            .ok_or_else(|| anyhow!("no container request id in runner output for {name}"))
    }
}

/// Extract the container request id from the runner's log.
///
/// The runner reports the created request on the second-to-last stderr line;
/// the id is the line's last whitespace-separated field. There is no
/// structured success signal to read instead (the runner does not emit one),
/// so this follows its log format exactly.
pub fn parse_container_request(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr.lines().collect();
    let line = lines.len().checked_sub(2).and_then(|i| lines.get(i))?;
    if !line.contains("container_request") {
        return None;
    }
    line.split_whitespace().last().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_id_from_runner_log() {
        let stderr = "\
INFO resolved workflow wf:x1abc-7fd4e-fastagenwf00001
INFO uploading dependencies
INFO submitted container_request x1abc-xvhdp-b7aq2hx5s9mke3f
INFO done\n";
        assert_eq!(
            parse_container_request(stderr).as_deref(),
            Some("x1abc-xvhdp-b7aq2hx5s9mke3f")
        );
    }

    #[test]
    fn rejects_log_without_marker_on_result_line() {
        let stderr = "INFO submitted container_request cr-1\nINFO cleaning up\nINFO done\n";
        assert_eq!(parse_container_request(stderr), None);
    }

    #[test]
    fn rejects_short_output() {
        assert_eq!(parse_container_request(""), None);
        assert_eq!(parse_container_request("one line\n"), None);
    }
}
