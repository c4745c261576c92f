use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::client::{ApiError, Client};

/// A project in the platform's ownership hierarchy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Group {
    pub uuid: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GroupList {
    items: Vec<Group>,
}

impl Client {
    /// Projects directly owned by `owner_uuid` (one level, no recursion)
    pub fn list_projects(&self, owner_uuid: &str) -> Result<Vec<Group>, ApiError> {
        let filters = json!([
            ["owner_uuid", "=", owner_uuid],
            ["group_class", "=", "project"]
        ])
        .to_string();
        let list: GroupList = self.get_json("/api/v1/groups", &[("filters", &filters)])?;
        Ok(list.items)
    }

    pub fn create_project(&self, owner_uuid: &str, name: &str) -> Result<Group, ApiError> {
        let body = json!({
            "group": {
                "group_class": "project",
                "name": name,
                "owner_uuid": owner_uuid,
            },
            "ensure_unique_name": true,
        });
        self.send_json("POST", "/api/v1/groups", &body)
    }
}
