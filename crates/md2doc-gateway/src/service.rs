//! The remote document service interface.
//!
//! [`DocumentService`] is the seam between the dispatch logic and the
//! wire: the HTTP implementation lives in [`crate::http`], and an
//! in-memory mock for tests in [`crate::mock`].

use md2doc_compiler::TableGrid;

use crate::error::ServiceError;

/// Bearer credential supplied per dispatch call by an external
/// collaborator. Read-only for the duration of one dispatch; never cached
/// or refreshed here.
#[derive(Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for Credential {
    // Never log the token itself.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

/// Operations the gateway needs from the remote document service.
///
/// Batch calls are atomic on the service side: a batch either applies in
/// full or not at all, which is what makes whole-batch resubmission safe.
pub trait DocumentService {
    /// Create an empty document, returning its identifier.
    fn create_document(
        &self,
        title: &str,
        credential: &Credential,
    ) -> Result<String, ServiceError>;

    /// Apply an ordered batch of mutation requests atomically.
    fn batch_update(
        &self,
        document_id: &str,
        requests: &[serde_json::Value],
        credential: &Credential,
    ) -> Result<(), ServiceError>;

    /// Read back the live document structure, returning the cell start
    /// offsets of each table in document order.
    fn fetch_tables(
        &self,
        document_id: &str,
        credential: &Credential,
    ) -> Result<Vec<TableGrid>, ServiceError>;

    /// Shareable web link for the document.
    fn share_link(&self, document_id: &str, credential: &Credential)
    -> Result<String, ServiceError>;

    /// Grant anyone-with-the-link read access.
    fn make_public(&self, document_id: &str, credential: &Credential)
    -> Result<(), ServiceError>;
}
