//! Local quality control, run before anything touches the remote platform

/// Validate a metadata document against the bundled schema and shape rules
pub mod metadata;
/// Compile the bundled metadata schema
pub mod schema;
/// Classify and validate FASTA/FASTQ sequence files
pub mod sequence;
