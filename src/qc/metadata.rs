use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use jsonschema::JSONSchema;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::qc::schema;

#[derive(Debug)]
pub enum MetadataError {
    ReadError,
    YamlDecodeError,
    SchemaValidationError,
    ShapeValidationError,
    DeserialisationError,
}

/// A metadata document on disk plus the compiled schema to check it against
pub struct MetadataFile {
    pub path: PathBuf,
    pub compiled_schema: JSONSchema,
}

impl MetadataFile {
    pub fn open(path: &Path) -> MetadataFile {
        MetadataFile {
            path: path.to_path_buf(),
            compiled_schema: schema::load_schema(),
        }
    }

    /// Validate and deserialise the document
    pub fn read(&self) -> Result<Metadata, MetadataError> {
        let json = self.parse_untyped_yaml()?;

        match self.validate(&json) {
            Ok(_) => {
                info!("Metadata is valid");
                check_shapes(&json)?;
                self.parse_typed(json)
            }
            Err(err) => {
                warn!("Metadata fails schema validation");
                Err(err)
            }
        }
    }

    /// Boolean validity contract: any failure, including internal errors,
    /// reads as invalid
    pub fn is_valid(&self) -> bool {
        match self.read() {
            Ok(_) => true,
            Err(err) => {
                warn!("Metadata failed validation: {err:?}");
                false
            }
        }
    }

    fn validate(&self, json: &Value) -> Result<(), MetadataError> {
        info!("Validating metadata against the bundled schema");
        match self.compiled_schema.validate(json) {
            Ok(_) => Ok(()),
            Err(errors) => {
                for error in errors {
                    warn!("Schema violation at {}: {error}", error.instance_path);
                }
                Err(MetadataError::SchemaValidationError)
            }
        }
    }

    fn read_file(&self) -> Result<String, MetadataError> {
        let path: &Path = self.path.as_path();
        info!("Reading metadata at {}", path.display());
        fs::read_to_string(path).map_err(|err| {
            warn!("Can't read metadata at path {}: {err}", path.display());
            MetadataError::ReadError
        })
    }

    fn parse_untyped_yaml(&self) -> Result<Value, MetadataError> {
        info!("Parsing YAML into untyped structure");
        let yaml_string = self.read_file()?;
        // serde_yaml can deserialise straight into a JSON value, which is
        // what the schema validator wants
        serde_yaml::from_str::<Value>(&yaml_string).map_err(|err| {
            warn!("Metadata is not well-formed YAML: {err}");
            MetadataError::YamlDecodeError
        })
    }

    fn parse_typed(&self, value: Value) -> Result<Metadata, MetadataError> {
        info!("Deserialising valid metadata into typed Rust object");
        serde_json::from_value::<Metadata>(value)
            .map_err(|_| MetadataError::DeserialisationError)
    }
}

/// Shape constraints the schema grammar cannot express: identifiers must be
/// absolute URIs and the collection date must be a real calendar date.
fn check_shapes(doc: &Value) -> Result<(), MetadataError> {
    require_uri(doc, "/id")?;
    require_uri(doc, "/sample/collection_location")?;
    let date = string_at(doc, "/sample/collection_date")?;
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        warn!("collection_date {date} is not a calendar date");
        return Err(MetadataError::ShapeValidationError);
    }
    let sources = doc
        .pointer("/sample/specimen_source")
        .and_then(Value::as_array)
        .ok_or(MetadataError::ShapeValidationError)?;
    for source in sources {
        let term = source.as_str().ok_or(MetadataError::ShapeValidationError)?;
        if Url::parse(term).is_err() {
            warn!("specimen_source {term} is not an absolute URI");
            return Err(MetadataError::ShapeValidationError);
        }
    }
    Ok(())
}

fn string_at<'a>(doc: &'a Value, pointer: &str) -> Result<&'a str, MetadataError> {
    doc.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or(MetadataError::ShapeValidationError)
}

fn require_uri(doc: &Value, pointer: &str) -> Result<(), MetadataError> {
    let text = string_at(doc, pointer)?;
    if Url::parse(text).is_err() {
        warn!("{pointer} value {text} is not an absolute URI");
        return Err(MetadataError::ShapeValidationError);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Metadata {
    pub id: String,
    pub sample: Sample,
    pub host: Host,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Sample {
    pub sample_id: String,
    pub collection_date: String,
    pub collection_location: String,
    pub specimen_source: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Host {
    pub host_id: String,
    pub host_species: String,
}
