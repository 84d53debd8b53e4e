//! Mock document service for testing.
//!
//! Provides [`MockService`] for unit testing dispatch behavior without
//! network access. Failures are scripted per operation with builder
//! methods; every batch submission is recorded so tests can assert that
//! retried batches are resent unchanged.

use std::collections::HashMap;
use std::sync::Mutex;

use md2doc_compiler::TableGrid;

use crate::error::ServiceError;
use crate::service::{Credential, DocumentService};

/// Operation names used to script failures.
const OPS: [&str; 5] = ["create", "batch", "fetch", "link", "public"];

/// In-memory mock of the remote document service.
///
/// # Example
///
/// ```
/// use md2doc_gateway::{MockService, ServiceError};
///
/// let service = MockService::new()
///     .with_failure("batch", ServiceError::RateLimited { retry_after: None });
/// ```
#[derive(Debug, Default)]
pub struct MockService {
    failures: Mutex<HashMap<&'static str, Vec<ServiceError>>>,
    grids: Vec<TableGrid>,
    batches: Mutex<Vec<Vec<serde_json::Value>>>,
    created_titles: Mutex<Vec<String>>,
    public_documents: Mutex<Vec<String>>,
}

impl MockService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next call of the named operation
    /// (`create`, `batch`, `fetch`, `link` or `public`). Queued failures
    /// are consumed in order before the operation succeeds.
    #[must_use]
    pub fn with_failure(self, op: &str, error: ServiceError) -> Self {
        let op: &'static str = OPS
            .iter()
            .copied()
            .find(|candidate| *candidate == op)
            .unwrap_or_else(|| panic!("unknown mock operation '{op}'"));
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push(error);
        self
    }

    /// Table grids returned by structure read-back.
    #[must_use]
    pub fn with_table_grids(mut self, grids: Vec<TableGrid>) -> Self {
        self.grids = grids;
        self
    }

    /// All batch payloads submitted so far, in call order (including
    /// retried submissions).
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<serde_json::Value>> {
        self.batches.lock().unwrap().clone()
    }

    /// Titles of documents created so far.
    #[must_use]
    pub fn created_titles(&self) -> Vec<String> {
        self.created_titles.lock().unwrap().clone()
    }

    /// Documents made public so far.
    #[must_use]
    pub fn public_documents(&self) -> Vec<String> {
        self.public_documents.lock().unwrap().clone()
    }

    fn take_failure(&self, op: &'static str) -> Result<(), ServiceError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(op) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)),
            _ => Ok(()),
        }
    }
}

impl DocumentService for MockService {
    fn create_document(
        &self,
        title: &str,
        _credential: &Credential,
    ) -> Result<String, ServiceError> {
        self.take_failure("create")?;
        self.created_titles.lock().unwrap().push(title.to_owned());
        Ok("mock-doc-1".to_owned())
    }

    fn batch_update(
        &self,
        _document_id: &str,
        requests: &[serde_json::Value],
        _credential: &Credential,
    ) -> Result<(), ServiceError> {
        // Record the attempt before failing so tests can verify that a
        // retried batch was resent unchanged.
        self.batches.lock().unwrap().push(requests.to_vec());
        self.take_failure("batch")
    }

    fn fetch_tables(
        &self,
        _document_id: &str,
        _credential: &Credential,
    ) -> Result<Vec<TableGrid>, ServiceError> {
        self.take_failure("fetch")?;
        Ok(self.grids.clone())
    }

    fn share_link(
        &self,
        document_id: &str,
        _credential: &Credential,
    ) -> Result<String, ServiceError> {
        self.take_failure("link")?;
        Ok(format!("https://docs.example.com/d/{document_id}"))
    }

    fn make_public(
        &self,
        document_id: &str,
        _credential: &Credential,
    ) -> Result<(), ServiceError> {
        self.take_failure("public")?;
        self.public_documents
            .lock()
            .unwrap()
            .push(document_id.to_owned());
        Ok(())
    }
}
