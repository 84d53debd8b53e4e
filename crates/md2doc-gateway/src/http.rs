//! HTTP implementation of the remote document service.
//!
//! Sync client over ureq with per-call bearer authentication. HTTP error
//! statuses are classified into [`ServiceError`] variants here; retry
//! policy lives in the dispatcher, not the client.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::info;
use ureq::Agent;
use ureq::http::Response;

use md2doc_compiler::TableGrid;

use crate::error::ServiceError;
use crate::service::{Credential, DocumentService};
use crate::wire::parse_table_grids;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// HTTP client for the remote document service.
pub struct HttpDocumentService {
    agent: Agent,
    base_url: String,
}

impl HttpDocumentService {
    /// Create a client for the given service base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn documents_url(&self) -> String {
        format!("{}/v1/documents", self.base_url)
    }

    fn files_url(&self, document_id: &str) -> String {
        format!("{}/v1/files/{document_id}", self.base_url)
    }

    fn post_json(
        &self,
        url: &str,
        payload: &serde_json::Value,
        credential: &Credential,
    ) -> Result<ureq::Body, ServiceError> {
        let bytes = serde_json::to_vec(payload)?;
        let response = self
            .agent
            .post(url)
            .header("Authorization", &credential.authorization())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&bytes[..])?;
        check(response)
    }

    fn get(&self, url: &str, credential: &Credential) -> Result<ureq::Body, ServiceError> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", &credential.authorization())
            .header("Accept", "application/json")
            .call()?;
        check(response)
    }
}

impl DocumentService for HttpDocumentService {
    fn create_document(
        &self,
        title: &str,
        credential: &Credential,
    ) -> Result<String, ServiceError> {
        info!("Creating document '{title}'");
        let mut body = self.post_json(&self.documents_url(), &json!({ "title": title }), credential)?;
        let created: CreateResponse = body.read_json()?;
        Ok(created.document_id)
    }

    fn batch_update(
        &self,
        document_id: &str,
        requests: &[serde_json::Value],
        credential: &Credential,
    ) -> Result<(), ServiceError> {
        info!(
            "Applying batch of {} requests to document {document_id}",
            requests.len()
        );
        let url = format!("{}/{document_id}:batchUpdate", self.documents_url());
        self.post_json(&url, &json!({ "requests": requests }), credential)?;
        Ok(())
    }

    fn fetch_tables(
        &self,
        document_id: &str,
        credential: &Credential,
    ) -> Result<Vec<TableGrid>, ServiceError> {
        info!("Reading back structure of document {document_id}");
        let url = format!("{}/{document_id}", self.documents_url());
        let mut body = self.get(&url, credential)?;
        let document: serde_json::Value = body.read_json()?;
        Ok(parse_table_grids(&document))
    }

    fn share_link(
        &self,
        document_id: &str,
        credential: &Credential,
    ) -> Result<String, ServiceError> {
        let url = format!("{}?fields=webViewLink", self.files_url(document_id));
        let mut body = self.get(&url, credential)?;
        let file: FileResponse = body.read_json()?;
        Ok(file
            .web_view_link
            .unwrap_or_else(|| format!("{}/d/{document_id}", self.base_url)))
    }

    fn make_public(
        &self,
        document_id: &str,
        credential: &Credential,
    ) -> Result<(), ServiceError> {
        info!("Making document {document_id} publicly viewable");
        let url = format!("{}/permissions", self.files_url(document_id));
        self.post_json(&url, &json!({ "type": "anyone", "role": "reader" }), credential)?;
        Ok(())
    }
}

/// Classify an HTTP response, returning the body on success.
fn check(response: Response<ureq::Body>) -> Result<ureq::Body, ServiceError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response.into_body());
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let mut body = response.into_body();
    let text = body
        .read_to_string()
        .unwrap_or_else(|_| "(unable to read error body)".to_owned());
    Err(ServiceError::from_status(status, text, retry_after))
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(rename = "documentId")]
    document_id: String,
}

#[derive(Deserialize)]
struct FileResponse {
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}
