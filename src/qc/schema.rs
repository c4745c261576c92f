use std::sync::Arc;

use anyhow::anyhow;
use jsonschema::{JSONSchema, SchemaResolver, SchemaResolverError};
use serde_json::Value;
use url::Url;

/// Pinned copy of the metadata schema, embedded so validation never fetches
/// anything over the network
static METADATA_SCHEMA: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/metadata.json"));
static SAMPLE_SCHEMA: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/sample.json"));
static HOST_SCHEMA: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/host.json"));

pub fn load_schema() -> JSONSchema {
    let schema_json: Value = serde_json::from_str(METADATA_SCHEMA).expect("Valid JSON");
    JSONSchema::options()
        .with_resolver(EmbeddedResolver)
        .compile(&schema_json)
        .expect("Valid schema")
}

/*
The root schema references its sub-schemas with the json-schema scheme.
Those references resolve against the embedded copies above, never the
network, so a build always validates against the schema it shipped with.
*/
struct EmbeddedResolver;

impl SchemaResolver for EmbeddedResolver {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        _original_reference: &str,
    ) -> Result<Arc<Value>, SchemaResolverError> {
        match url.scheme() {
            "json-schema" => {
                let source = match url.path() {
                    "sample.json" => SAMPLE_SCHEMA,
                    "host.json" => HOST_SCHEMA,
                    other => return Err(anyhow!("no embedded schema named {other}")),
                };
                let value: Value = serde_json::from_str(source).expect("Valid JSON");
                Ok(Arc::new(value))
            }
            _ => Err(anyhow!("scheme is not supported")),
        }
    }
}
