//! Panel client-API payloads.
//!
//! Only the fields the pipeline consumes are modelled; everything else in
//! the panel's responses is ignored on deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Loader, ServerContext};

/// `{ "data": [...] }` list envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    pub attributes: FileAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub name: String,
    pub is_file: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// Response of the "get upload target" call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub attributes: SignedUrlAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedUrlAttributes {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameRequest {
    pub root: String,
    pub files: Vec<RenameEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub root: String,
    pub files: Vec<String>,
}

/// Server detail object as returned by `GET /api/client/servers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDetails {
    pub attributes: ServerAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerInfo>,
    #[serde(
        rename = "modLoader",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mod_loader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(default, deserialize_with = "flat_string_map")]
    pub environment: HashMap<String, String>,
}

impl ServerDetails {
    /// Extracts the detection inputs from the detail object.
    ///
    /// Empty `modLoader`/`version` strings count as absent.
    pub fn context(&self) -> ServerContext {
        let attrs = &self.attributes;
        ServerContext {
            environment: attrs
                .container
                .as_ref()
                .map(|c| c.environment.clone())
                .unwrap_or_default(),
            mod_loader: attrs
                .mod_loader
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(Loader::parse),
            version: attrs
                .version
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        }
    }
}

/// Panels emit numbers, booleans and nulls in the environment map;
/// stringify scalars so detection sees one flat `String → String` map.
fn flat_string_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, value)
        })
        .collect())
}
