use serde::Serialize;

/// Reference genome used by the FASTA conversion workflow
pub const REF_FASTA: &str = "cas:61a24ab218b64ff0646df4d08d7dbe68+474/reference.fasta";

/// Pinned inputs for the pangenome aggregation workflow
pub const PANGENOME_REF_FASTA: &str =
    "cas:8b5f2a90cc1e47d3a6b1e02f53c4a917+133/reference.fasta";
pub const PANGENOME_REF_GB: &str = "cas:8b5f2a90cc1e47d3a6b1e02f53c4a917+133/reference.gb";
pub const PANGENOME_METADATA: &str = "cas:3fd0cf29ab7e4d0c8512c6d9e0b1a844+60/metadata.tsv";

#[derive(Debug, Serialize)]
pub struct FileRef {
    class: &'static str,
    pub location: String,
}

impl FileRef {
    pub fn new(location: impl Into<String>) -> FileRef {
        FileRef {
            class: "File",
            location: location.into(),
        }
    }

    /// Reference a named file inside a stored collection by its portable
    /// data hash
    pub fn stored(portable_data_hash: &str, name: &str) -> FileRef {
        FileRef::new(format!("cas:{portable_data_hash}/{name}"))
    }
}

#[derive(Debug, Serialize)]
pub struct DirectoryRef {
    class: &'static str,
    pub location: String,
}

impl DirectoryRef {
    pub fn stored(portable_data_hash: &str, name: &str) -> DirectoryRef {
        DirectoryRef {
            class: "Directory",
            location: format!("cas:{portable_data_hash}/{name}"),
        }
    }
}

/// Input document for the FASTQ-to-FASTA conversion workflow
#[derive(Debug, Serialize)]
pub struct ConversionInput {
    pub ref_fasta: FileRef,
    pub sample_id: String,
    pub fastq_forward: FileRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastq_reverse: Option<FileRef>,
}

impl ConversionInput {
    pub fn new(sample_id: &str, portable_data_hash: &str, is_paired: bool) -> ConversionInput {
        ConversionInput {
            ref_fasta: FileRef::new(REF_FASTA),
            sample_id: sample_id.to_string(),
            fastq_forward: FileRef::stored(portable_data_hash, "reads1.fastq"),
            fastq_reverse: is_paired
                .then(|| FileRef::stored(portable_data_hash, "reads2.fastq")),
        }
    }
}

/// Input document for the pangenome aggregation workflow, combining every
/// completed per-sample output
#[derive(Debug, Serialize)]
pub struct PangenomeInput {
    pub gff_files: Vec<FileRef>,
    pub reference: FileRef,
    pub reference_gb: FileRef,
    pub metadata: FileRef,
    pub dirs: Vec<DirectoryRef>,
}

impl PangenomeInput {
    /// `samples` pairs each sample id with the portable data hash of its
    /// combined collection
    pub fn new(samples: &[(String, String)]) -> PangenomeInput {
        let mut gff_files = Vec::with_capacity(samples.len());
        let mut dirs = Vec::with_capacity(samples.len());
        for (sample_id, pdh) in samples {
            gff_files.push(FileRef::stored(pdh, &format!("{sample_id}.gff")));
            dirs.push(DirectoryRef::stored(pdh, sample_id));
        }
        PangenomeInput {
            gff_files,
            reference: FileRef::new(PANGENOME_REF_FASTA),
            reference_gb: FileRef::new(PANGENOME_REF_GB),
            metadata: FileRef::new(PANGENOME_METADATA),
            dirs,
        }
    }
}
