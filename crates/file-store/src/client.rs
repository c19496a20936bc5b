//! Game panel client API.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use craftdeploy_protocol::constants::UPLOAD_FORM_FIELD;
use craftdeploy_protocol::panel::{
    CreateFolderRequest, DeleteRequest, FileAttributes, FileObject, ListResponse, RenameEntry,
    RenameRequest, ServerDetails, SignedUrl,
};

use crate::error::FileStoreError;
use crate::store::{FileStore, StoreFuture};

/// Panel API client shared by all servers of one panel.
#[derive(Clone)]
pub struct PanelClient {
    http: reqwest::Client,
    /// Signed upload URLs carry their own credentials and go to the node,
    /// not the panel, so they are posted without the panel token.
    upload_http: reqwest::Client,
    base_url: String,
}

impl PanelClient {
    /// Creates a client for the panel at `panel_url`.
    pub fn new(panel_url: &str, api_key: &str) -> Result<Self, FileStoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| FileStoreError::InvalidKey)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let upload_http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            upload_http,
            base_url: panel_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the file store of one server.
    pub fn server(&self, server_id: &str) -> PanelFiles {
        PanelFiles {
            http: self.http.clone(),
            upload_http: self.upload_http.clone(),
            server_url: self.server_url(server_id),
            server_id: server_id.to_string(),
        }
    }

    /// Fetches the server detail object used for loader detection.
    pub async fn server_details(&self, server_id: &str) -> Result<ServerDetails, FileStoreError> {
        let url = self.server_url(server_id);
        debug!(server = %server_id, "fetching server details");
        let resp = self.http.get(&url).send().await?;
        let body = read_success(resp).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn server_url(&self, server_id: &str) -> String {
        let encoded = utf8_percent_encode(server_id, NON_ALPHANUMERIC);
        format!("{}/api/client/servers/{encoded}", self.base_url)
    }
}

/// [`FileStore`] implementation for one panel server.
#[derive(Clone)]
pub struct PanelFiles {
    http: reqwest::Client,
    upload_http: reqwest::Client,
    server_url: String,
    server_id: String,
}

impl PanelFiles {
    /// Builds a files endpoint URL, appending the directory hint verbatim.
    fn endpoint(&self, action: &str, directory: Option<&str>) -> String {
        match directory {
            Some(dir) => format!("{}/files/{action}?directory={dir}", self.server_url),
            None => format!("{}/files/{action}", self.server_url),
        }
    }
}

impl FileStore for PanelFiles {
    fn list_directory(&self, directory: Option<&str>) -> StoreFuture<'_, Vec<FileAttributes>> {
        let url = self.endpoint("list", directory);
        Box::pin(async move {
            debug!(server = %self.server_id, %url, "listing directory");
            let resp = self.http.get(&url).send().await?;
            let body = read_success(resp).await?;
            let list: ListResponse<FileObject> = serde_json::from_slice(&body)?;
            Ok(list.data.into_iter().map(|f| f.attributes).collect())
        })
    }

    fn upload_target(&self, directory: Option<&str>) -> StoreFuture<'_, String> {
        let url = self.endpoint("upload", directory);
        Box::pin(async move {
            debug!(server = %self.server_id, %url, "requesting upload target");
            let resp = self.http.get(&url).send().await?;
            let body = read_success(resp).await?;
            let signed: SignedUrl = serde_json::from_slice(&body)?;
            if signed.attributes.url.is_empty() {
                return Err(FileStoreError::MissingUploadUrl);
            }
            Ok(signed.attributes.url)
        })
    }

    fn upload(&self, url: &str, file_name: &str, bytes: &[u8]) -> StoreFuture<'_, ()> {
        let url = url.to_string();
        let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part(UPLOAD_FORM_FIELD, part);
        let size = bytes.len();
        Box::pin(async move {
            debug!(server = %self.server_id, size, "uploading file");
            let resp = self.upload_http.post(&url).multipart(form).send().await?;
            read_success(resp).await?;
            Ok(())
        })
    }

    fn create_folder(&self, name: &str, path: &str) -> StoreFuture<'_, ()> {
        let url = self.endpoint("create-folder", None);
        let req = CreateFolderRequest {
            name: name.to_string(),
            path: path.to_string(),
        };
        Box::pin(async move {
            let resp = self.http.post(&url).json(&req).send().await?;
            read_success(resp).await?;
            Ok(())
        })
    }

    fn rename(&self, root: &str, from: &str, to: &str) -> StoreFuture<'_, ()> {
        let url = self.endpoint("rename", None);
        let req = RenameRequest {
            root: root.to_string(),
            files: vec![RenameEntry {
                from: from.to_string(),
                to: to.to_string(),
            }],
        };
        Box::pin(async move {
            let resp = self.http.put(&url).json(&req).send().await?;
            read_success(resp).await?;
            Ok(())
        })
    }

    fn delete(&self, root: &str, files: &[String]) -> StoreFuture<'_, ()> {
        let url = self.endpoint("delete", None);
        let req = DeleteRequest {
            root: root.to_string(),
            files: files.to_vec(),
        };
        Box::pin(async move {
            let resp = self.http.post(&url).json(&req).send().await?;
            read_success(resp).await?;
            Ok(())
        })
    }

    fn server_id(&self) -> &str {
        &self.server_id
    }
}

/// Returns the body of a 2xx response, or the status and body as an error.
async fn read_success(resp: reqwest::Response) -> Result<Vec<u8>, FileStoreError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FileStoreError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.bytes().await?.to_vec())
}
