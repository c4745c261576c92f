//! Upload command: validate locally, then push files into a new collection
//! and notify the companion web service

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Args;
use log::{info, warn};
use serde_json::{json, Map, Value};

use crate::api::client::Client;
use crate::api::storage::{self, ManifestBuilder};
use crate::config::Settings;
use crate::qc::metadata::MetadataFile;
use crate::qc::sequence;

/// Remote names are fixed so downstream workflows can address the files by
/// portable data hash alone
const FASTA_NAME: &str = "sequence.fasta";
const READS1_NAME: &str = "reads1.fastq";
const READS2_NAME: &str = "reads2.fastq";
const METADATA_NAME: &str = "metadata.yaml";

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Project the new collection is created under
    #[arg(short = 'p', long)]
    pub project: String,

    /// FASTA file; FASTQ reads are ignored when this is given
    #[arg(long)]
    pub sequence_fasta: Option<PathBuf>,

    /// FASTQ read 1
    #[arg(long)]
    pub sequence_read1: Option<PathBuf>,

    /// FASTQ read 2 (paired uploads)
    #[arg(long)]
    pub sequence_read2: Option<PathBuf>,

    /// Metadata document (YAML)
    #[arg(short = 'm', long)]
    pub metadata_file: PathBuf,

    /// Validate the inputs and stop before any remote call
    #[arg(long)]
    pub validate: bool,

    /// Skip the companion web service notification
    #[arg(long)]
    pub no_sync: bool,
}

/// Which local files go up under which remote names, plus the derived
/// format flags stored in the collection's property bag
struct UploadPlan<'a> {
    files: Vec<(&'a Path, &'static str)>,
    is_fasta: bool,
    is_paired: bool,
}

fn plan_files(args: &UploadArgs) -> Result<UploadPlan<'_>> {
    let mut plan = UploadPlan {
        files: Vec::new(),
        is_fasta: false,
        is_paired: false,
    };
    if let Some(fasta) = &args.sequence_fasta {
        sequence::validate_fasta(fasta)
            .map_err(|err| anyhow!("{}: {err}", fasta.display()))?;
        plan.files.push((fasta, FASTA_NAME));
        plan.is_fasta = true;
    } else if let Some(read1) = &args.sequence_read1 {
        sequence::validate_fastq(read1)
            .map_err(|err| anyhow!("{}: {err}", read1.display()))?;
        plan.files.push((read1, READS1_NAME));
        if let Some(read2) = &args.sequence_read2 {
            sequence::validate_fastq(read2)
                .map_err(|err| anyhow!("{}: {err}", read2.display()))?;
            plan.files.push((read2, READS2_NAME));
            plan.is_paired = true;
        }
    } else {
        bail!("provide at least a FASTA file or FASTQ reads");
    }
    Ok(plan)
}

pub fn run(settings: &Settings, args: &UploadArgs) -> Result<()> {
    let metadata_file = MetadataFile::open(&args.metadata_file);
    let metadata = metadata_file
        .read()
        .map_err(|err| anyhow!("metadata failed validation: {err:?}"))?;
    let plan = plan_files(args)?;

    if args.validate {
        info!("Validation passed for sample {}", metadata.sample.sample_id);
        return Ok(());
    }

    let client = Client::new(&settings.api_base(), &settings.api_token);
    let mut manifest = ManifestBuilder::new();
    for (path, remote_name) in &plan.files {
        storage::upload_file(&client, &mut manifest, path, remote_name)?;
    }
    storage::upload_file(&client, &mut manifest, &args.metadata_file, METADATA_NAME)?;

    let sample_id = &metadata.sample.sample_id;
    let collection = client
        .create_collection(
            &args.project,
            sample_id,
            &manifest.manifest_text(),
            build_properties(sample_id, plan.is_fasta, plan.is_paired),
        )
        .context("creating collection")?;
    info!(
        "Created collection {} for sample {sample_id}",
        collection.uuid
    );
    println!("{}", serde_json::to_string(&collection)?);

    if !args.no_sync {
        sync_upload(settings, &collection.uuid, plan.is_fasta, plan.is_paired);
    }
    Ok(())
}

fn build_properties(sample_id: &str, is_fasta: bool, is_paired: bool) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("sequence_label".to_string(), json!(sample_id));
    properties.insert("upload_app".to_string(), json!("seqferry"));
    properties.insert("is_fasta".to_string(), json!(is_fasta));
    properties.insert("is_paired".to_string(), json!(is_paired));
    properties.insert("uploaded_at".to_string(), json!(Utc::now().to_rfc3339()));
    properties
}

/// Best-effort notification; the upload stands either way, so failures are
/// logged and dropped
fn sync_upload(settings: &Settings, collection_uuid: &str, is_fasta: bool, is_paired: bool) {
    let Some(base) = &settings.sync_url else {
        warn!("SEQFERRY_SYNC_URL not set, skipping upload sync");
        return;
    };
    let endpoint = format!("{}/api/uploader/sync", base.trim_end_matches('/'));
    info!("Synchronizing upload with {endpoint}");
    let result = ureq::post(&endpoint).send_form(&[
        ("token", settings.api_token.as_str()),
        ("col_uuid", collection_uuid),
        ("is_fasta", if is_fasta { "true" } else { "false" }),
        ("is_paired", if is_paired { "true" } else { "false" }),
        ("status", "uploaded"),
    ]);
    if let Err(err) = result {
        warn!("Upload sync failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn base_args() -> UploadArgs {
        UploadArgs {
            project: "x1abc-j7d0g-uploadproject01".to_string(),
            sequence_fasta: None,
            sequence_read1: None,
            sequence_read2: None,
            metadata_file: PathBuf::from("metadata.yaml"),
            validate: false,
            no_sync: false,
        }
    }

    #[test]
    fn fasta_takes_precedence_over_reads() {
        let fasta = temp_with(">s\nACGT\n");
        let read1 = temp_with("@r\nACGT\n+\nIIII\n");
        let mut args = base_args();
        args.sequence_fasta = Some(fasta.path().to_path_buf());
        args.sequence_read1 = Some(read1.path().to_path_buf());
        let plan = plan_files(&args).unwrap();
        assert!(plan.is_fasta);
        assert!(!plan.is_paired);
        assert_eq!(plan.files.len(), 1);
        assert_eq!(plan.files[0].1, FASTA_NAME);
    }

    #[test]
    fn paired_reads_are_both_validated_and_planned() {
        let read1 = temp_with("@r1\nACGT\n+\nIIII\n");
        let read2 = temp_with("@r2\nTTGA\n+\nIIII\n");
        let mut args = base_args();
        args.sequence_read1 = Some(read1.path().to_path_buf());
        args.sequence_read2 = Some(read2.path().to_path_buf());
        let plan = plan_files(&args).unwrap();
        assert!(!plan.is_fasta);
        assert!(plan.is_paired);
        assert_eq!(plan.files.len(), 2);
        assert_eq!(plan.files[1].1, READS2_NAME);
    }

    #[test]
    fn no_sequence_files_is_a_usage_error() {
        let args = base_args();
        assert!(plan_files(&args).is_err());
    }

    #[test]
    fn invalid_second_read_fails_the_plan() {
        let read1 = temp_with("@r1\nACGT\n+\nIIII\n");
        let read2 = temp_with("definitely not fastq\n");
        let mut args = base_args();
        args.sequence_read1 = Some(read1.path().to_path_buf());
        args.sequence_read2 = Some(read2.path().to_path_buf());
        assert!(plan_files(&args).is_err());
    }

    #[test]
    fn properties_carry_label_and_format_flags() {
        let properties = build_properties("SAMPLE1", false, true);
        assert_eq!(properties["sequence_label"], json!("SAMPLE1"));
        assert_eq!(properties["upload_app"], json!("seqferry"));
        assert_eq!(properties["is_fasta"], json!(false));
        assert_eq!(properties["is_paired"], json!(true));
        assert!(properties.contains_key("uploaded_at"));
    }
}
