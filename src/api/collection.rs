use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api::client::{ApiError, Client};

/// A remote bundle of files plus a free-form property bag.
///
/// Listings omit `manifest_text`; fetch a single collection to get it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Collection {
    pub uuid: String,
    pub portable_data_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_text: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Collection {
    /// Read a boolean property, treating absence as false
    pub fn flag(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    items: Vec<Collection>,
}

impl Client {
    pub fn list_collections(&self, owner_uuid: &str) -> Result<Vec<Collection>, ApiError> {
        let filters = json!([["owner_uuid", "=", owner_uuid]]).to_string();
        let list: CollectionList =
            self.get_json("/api/v1/collections", &[("filters", &filters)])?;
        Ok(list.items)
    }

    pub fn get_collection(&self, uuid: &str) -> Result<Collection, ApiError> {
        self.get_json(&format!("/api/v1/collections/{uuid}"), &[])
    }

    pub fn create_collection(
        &self,
        owner_uuid: &str,
        name: &str,
        manifest_text: &str,
        properties: Map<String, Value>,
    ) -> Result<Collection, ApiError> {
        let body = json!({
            "collection": {
                "owner_uuid": owner_uuid,
                "name": name,
                "manifest_text": manifest_text,
                "properties": properties,
            },
            "ensure_unique_name": true,
        });
        self.send_json("POST", "/api/v1/collections", &body)
    }

    /// Partial update; only the fields present in `fields` change
    pub fn update_collection(&self, uuid: &str, fields: Value) -> Result<Collection, ApiError> {
        let body = json!({ "collection": fields });
        self.send_json("PUT", &format!("/api/v1/collections/{uuid}"), &body)
    }
}
