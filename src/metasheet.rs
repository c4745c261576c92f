//! Expand a tabular sample sheet into one metadata document per sample,
//! filling a YAML template with the sheet's columns

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use log::info;
use serde_yaml::Value;

const WIKIDATA_ENTITY: &str = "http://www.wikidata.org/entity/";
const OBO_NCIT: &str = "http://purl.obolibrary.org/obo/NCIT_";

#[derive(Debug, Args)]
pub struct MetasheetArgs {
    /// Tab-separated sample sheet with a header row
    #[arg(short = 'i', long, default_value = "samples.tsv")]
    pub input: PathBuf,

    /// Metadata template the sheet's columns are substituted into
    #[arg(long, default_value = "metadata.yaml")]
    pub template: PathBuf,

    /// Directory the per-sample documents are written to
    #[arg(short = 'o', long, default_value = "metadata/")]
    pub output_dir: PathBuf,
}

pub fn run(args: &MetasheetArgs) -> Result<()> {
    let sheet = fs::read_to_string(&args.input)
        .with_context(|| format!("reading sample sheet {}", args.input.display()))?;
    let template_text = fs::read_to_string(&args.template)
        .with_context(|| format!("reading template {}", args.template.display()))?;
    let template: Value =
        serde_yaml::from_str(&template_text).context("parsing metadata template")?;
    fs::create_dir_all(&args.output_dir)?;

    let mut lines = sheet.lines();
    let header: Vec<String> = lines
        .next()
        .ok_or_else(|| anyhow!("sample sheet is empty"))?
        .split('\t')
        .map(|column| column.trim_matches([' ', ':']).to_string())
        .collect();

    let mut written = 0usize;
    for (index, line) in lines.enumerate() {
        let line_number = index + 2;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() != header.len() {
            bail!(
                "line {line_number}: expected {} columns, found {}",
                header.len(),
                fields.len()
            );
        }
        let row: HashMap<&str, &str> = header
            .iter()
            .map(String::as_str)
            .zip(fields.into_iter())
            .collect();
        let get = |column: &str| -> Result<String> {
            row.get(column)
                .copied()
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("line {line_number}: missing {column}"))
        };

        let sample_id = get("sample_id")?;
        let mut document = template.clone();
        set_field(&mut document, &["host", "host_id"], get("host_id")?.into())?;
        set_field(
            &mut document,
            &["sample", "sample_id"],
            sample_id.as_str().into(),
        )?;
        set_field(
            &mut document,
            &["sample", "collection_date"],
            get("collection_date")?.into(),
        )?;
        set_field(
            &mut document,
            &["sample", "collection_location"],
            format!("{WIKIDATA_ENTITY}{}", get("collection_location")?).into(),
        )?;
        set_field(
            &mut document,
            &["sample", "specimen_source"],
            Value::Sequence(vec![
                format!("{OBO_NCIT}{}", get("specimen_source")?).into()
            ]),
        )?;

        let out_path = args.output_dir.join(format!("{sample_id}.yaml"));
        fs::write(&out_path, serde_yaml::to_string(&document)?)
            .with_context(|| format!("writing {}", out_path.display()))?;
        written += 1;
    }
    info!("Wrote {written} metadata documents to {}", args.output_dir.display());
    Ok(())
}

/// Replace a nested mapping entry, creating intermediate mappings when the
/// template left them out
fn set_field(document: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let mut node = document;
    let (last, parents) = path.split_last().expect("non-empty path");
    for key in parents {
        let mapping = node
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("template entry {key} is not a mapping"))?;
        node = mapping
            .entry(Value::from(*key))
            .or_insert_with(|| Value::Mapping(Default::default()));
    }
    let mapping = node
        .as_mapping_mut()
        .ok_or_else(|| anyhow!("template entry {last} is not a mapping"))?;
    mapping.insert(Value::from(*last), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
id: http://example.org/submission/template
sample:
  sample_id: PLACEHOLDER
  collection_date: \"1970-01-01\"
  collection_location: http://www.wikidata.org/entity/Q2
  specimen_source:
    - http://purl.obolibrary.org/obo/NCIT_C155831
host:
  host_id: PLACEHOLDER
  host_species: http://purl.obolibrary.org/obo/NCBITaxon_9606
";

    const SHEET: &str = "\
host_id\tsample_id\tcollection_date\tcollection_location\tspecimen_source
H1\tS1\t2024-03-01\tQ851\tC155831
H2\tS2\t2024-03-02\tQ851\tC155831
";

    fn run_metasheet(sheet: &str) -> Result<tempfile::TempDir> {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("samples.tsv");
        let template = dir.path().join("metadata.yaml");
        fs::write(&input, sheet).unwrap();
        fs::write(&template, TEMPLATE).unwrap();
        let args = MetasheetArgs {
            input,
            template,
            output_dir: dir.path().join("metadata"),
        };
        run(&args)?;
        Ok(dir)
    }

    #[test]
    fn writes_one_document_per_row_with_substitutions() {
        let dir = run_metasheet(SHEET).unwrap();
        let doc: Value = serde_yaml::from_str(
            &fs::read_to_string(dir.path().join("metadata/S1.yaml")).unwrap(),
        )
        .unwrap();
        assert_eq!(doc["sample"]["sample_id"], Value::from("S1"));
        assert_eq!(doc["host"]["host_id"], Value::from("H1"));
        assert_eq!(
            doc["sample"]["collection_location"],
            Value::from("http://www.wikidata.org/entity/Q851")
        );
        assert_eq!(
            doc["sample"]["specimen_source"][0],
            Value::from("http://purl.obolibrary.org/obo/NCIT_C155831")
        );
        assert!(dir.path().join("metadata/S2.yaml").exists());
    }

    #[test]
    fn trailing_blank_lines_are_skipped() {
        let dir = run_metasheet(&format!("{SHEET}\n\n")).unwrap();
        assert!(dir.path().join("metadata/S2.yaml").exists());
    }

    #[test]
    fn short_row_is_an_error_naming_the_line() {
        let sheet = "host_id\tsample_id\tcollection_date\tcollection_location\tspecimen_source\nH1\tS1\n";
        let err = run_metasheet(sheet).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
