//! One reconciliation pass: walk every uploaded collection, advance its
//! sample through the conversion lifecycle, then drive the single pangenome
//! aggregation job over everything that has completed

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use log::{error, info, warn};
use serde_json::{json, Value};

use crate::api::client::Client;
use crate::api::collection::Collection;
use crate::api::container::JobStatus;
use crate::config::Settings;
use crate::state::sample::{PangenomeStatus, SampleStatus, MAX_RETRIES};
use crate::state::store::State;
use crate::workflow::input::{ConversionInput, PangenomeInput};
use crate::workflow::submit::Submitter;

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Project holding uploaded sequence collections
    #[arg(long, default_value = "x1abc-j7d0g-uploadproject01")]
    pub uploader_project: String,

    /// Project workflow runs are created under
    #[arg(long, default_value = "x1abc-j7d0g-workflowparent0")]
    pub workflows_project: String,

    /// FASTQ-to-FASTA conversion workflow
    #[arg(long, default_value = "x1abc-7fd4e-fastagenwf00001")]
    pub conversion_workflow: String,

    /// Pangenome aggregation workflow
    #[arg(long, default_value = "x1abc-7fd4e-pangenomewf0001")]
    pub pangenome_workflow: String,

    /// Collection the aggregated pangenome result is published to
    #[arg(long, default_value = "x1abc-4zz18-pangenomeresult")]
    pub pangenome_results: String,

    /// Workflow submission executable
    #[arg(long, default_value = "cwl-runner")]
    pub runner: PathBuf,

    #[arg(long, default_value = "state.json")]
    pub state_file: PathBuf,
}

pub fn run(settings: &Settings, args: &AnalyzeArgs) -> Result<()> {
    let client = Client::new(&settings.api_base(), &settings.api_token);
    let submitter = Submitter {
        api: &client,
        runner: args.runner.clone(),
        workflows_project: args.workflows_project.clone(),
    };

    let mut state = State::load(&args.state_file);

    let mut collections = client
        .list_collections(&args.uploader_project)
        .context("listing uploaded collections")?;
    for project in client
        .list_projects(&args.uploader_project)
        .context("listing sub-projects")?
    {
        collections.extend(client.list_collections(&project.uuid)?);
    }
    info!("Total number of uploaded sequences: {}", collections.len());

    let mut pangenome_inputs: Vec<(String, String)> = Vec::new();
    let mut newly_completed = false;
    for collection in &collections {
        // one bad sample must not cost the rest of the pass its state
        if let Err(err) = step_sample(
            &client,
            &submitter,
            args,
            &mut state,
            collection,
            &mut pangenome_inputs,
            &mut newly_completed,
        ) {
            error!("Sample in collection {} not advanced: {err:#}", collection.uuid);
        }
    }

    if let Err(err) = step_pangenome(
        &client,
        &submitter,
        args,
        &mut state,
        &pangenome_inputs,
        newly_completed,
    ) {
        error!("Pangenome aggregation not advanced: {err:#}");
    }

    state.save(&args.state_file)
}

/// Advance one sample through `new → submitted → complete`, with failed
/// jobs reset for retry up to the cap
fn step_sample(
    client: &Client,
    submitter: &Submitter,
    args: &AnalyzeArgs,
    state: &mut State,
    collection: &Collection,
    pangenome_inputs: &mut Vec<(String, String)>,
    newly_completed: &mut bool,
) -> Result<()> {
    let Some(sample_id) = collection
        .properties
        .get("sequence_label")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        // not one of ours
        return Ok(());
    };

    if collection.properties.contains_key("analysis_status") {
        // analysed in an earlier pass, only relevant to aggregation now
        pangenome_inputs.push((sample_id, collection.portable_data_hash.clone()));
        return Ok(());
    }

    let record = state.sample_mut(&sample_id);
    match record.status {
        SampleStatus::New => {
            if collection.flag("is_fasta") {
                // already in FASTA form, nothing to convert
                return Ok(());
            }
            let input = ConversionInput::new(
                &sample_id,
                &collection.portable_data_hash,
                collection.flag("is_paired"),
            );
            let name = format!("Generate FASTA for {sample_id}");
            match submitter.run_workflow(&args.conversion_workflow, &name, &input) {
                Ok(container_request) => {
                    info!("Submitted conversion request for {sample_id}");
                    record.status = SampleStatus::Submitted;
                    record.container_request = Some(container_request);
                }
                Err(err) => {
                    error!("Conversion submission failed for {sample_id}: {err:#}");
                    record.status = SampleStatus::Error;
                }
            }
        }
        SampleStatus::Submitted => {
            let Some(request_uuid) = record.container_request.clone() else {
                record.park();
                bail!("sample {sample_id} was submitted without a container request id");
            };
            let (request, status) = client
                .poll_job(&request_uuid)
                .with_context(|| format!("polling container request {request_uuid}"))?;
            info!("Container request for {sample_id} is {status}");
            match status {
                JobStatus::Complete => {
                    let output_uuid = request.output_uuid.ok_or_else(|| {
                        anyhow!("complete container request {request_uuid} has no output")
                    })?;
                    let source = client.get_collection(&collection.uuid)?;
                    let output = client.get_collection(&output_uuid)?;

                    // append the job's output files to the sample's own
                    // collection and mark it analysed
                    let combined = format!(
                        "{}{}",
                        source.manifest_text.unwrap_or_default(),
                        output.manifest_text.unwrap_or_default()
                    );
                    let mut properties = collection.properties.clone();
                    properties.insert("analysis_status".to_string(), json!("complete"));
                    client.update_collection(
                        &collection.uuid,
                        json!({"manifest_text": combined, "properties": properties}),
                    )?;

                    record.status = SampleStatus::Complete;
                    record.output_collection = Some(output_uuid);
                    pangenome_inputs.push((sample_id.clone(), source.portable_data_hash));
                    *newly_completed = true;
                    info!("Sample {sample_id} is complete");
                }
                JobStatus::Failed => {
                    if record.retries < MAX_RETRIES {
                        record.reset_for_retry();
                        warn!(
                            "Conversion for {sample_id} failed, retry {} of {MAX_RETRIES}",
                            record.retries
                        );
                    } else {
                        record.park();
                        error!(
                            "Conversion for {sample_id} failed {MAX_RETRIES} times, \
                             parking for manual intervention"
                        );
                    }
                }
                // anything else is still in flight
                _ => {}
            }
        }
        SampleStatus::Complete | SampleStatus::Error => {}
    }
    Ok(())
}

/// Drive the single aggregation job: resubmit whenever a sample newly
/// completed, otherwise poll the outstanding request
fn step_pangenome(
    client: &Client,
    submitter: &Submitter,
    args: &AnalyzeArgs,
    state: &mut State,
    pangenome_inputs: &[(String, String)],
    newly_completed: bool,
) -> Result<()> {
    if newly_completed && !pangenome_inputs.is_empty() {
        let input = PangenomeInput::new(pangenome_inputs);
        let name = format!("Pangenome analysis of {} samples", pangenome_inputs.len());
        match submitter.run_workflow(&args.pangenome_workflow, &name, &input) {
            Ok(container_request) => {
                info!("Submitted pangenome request {container_request}");
                state.last_pangenome_request = Some(container_request);
                state.last_pangenome_request_status = Some(PangenomeStatus::Submitted);
            }
            Err(err) => error!("Pangenome submission failed: {err:#}"),
        }
        return Ok(());
    }

    let Some(request_uuid) = state.last_pangenome_request.clone() else {
        return Ok(());
    };
    let (request, status) = client
        .poll_job(&request_uuid)
        .with_context(|| format!("polling pangenome request {request_uuid}"))?;
    info!("Container request for pangenome workflow is {status}");
    match status {
        JobStatus::Complete
            if state.last_pangenome_request_status == Some(PangenomeStatus::Submitted) =>
        {
            info!("Updating results collection");
            let output_uuid = request.output_uuid.ok_or_else(|| {
                anyhow!("complete pangenome request {request_uuid} has no output")
            })?;
            let output = client.get_collection(&output_uuid)?;
            client.update_collection(
                &args.pangenome_results,
                json!({"manifest_text": output.manifest_text.unwrap_or_default()}),
            )?;
            state.last_pangenome_request_status = Some(PangenomeStatus::Complete);
        }
        JobStatus::Failed => {
            warn!("Pangenome request {request_uuid} failed, clearing for resubmission");
            state.last_pangenome_request = None;
            state.last_pangenome_request_status = None;
        }
        _ => {}
    }
    Ok(())
}
