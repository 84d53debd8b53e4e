//! Batch dispatch with retry, backoff and two-phase table population.
//!
//! The dispatcher walks the state machine
//! `IDLE → DISPATCHING_PRIMARY → (TABLE_READBACK → DISPATCHING_CELLS)? →
//! SUCCESS`, dropping into `RETRY_BACKOFF` on retryable failures and into
//! `FAILED` on fatal ones or retry exhaustion. On retry the entire batch
//! is resent unchanged: batches apply atomically on the service side, so
//! never assuming partial success is what keeps resubmission idempotent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use md2doc_compiler::{
    CharStyle, CompiledDocument, MutationOp, PendingTable, ReadBackOffsetStrategy, TableGrid,
    TableOffsetError, TableOffsetStrategy,
};

use crate::error::{DispatchError, ServiceError};
use crate::retry::RetryPolicy;
use crate::service::{Credential, DocumentService};
use crate::wire::{encode_batch, encode_cell_text, encode_op};

/// Observable dispatch phase, logged at each transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    DispatchingPrimary,
    TableReadback,
    DispatchingCells,
    RetryBackoff,
    Success,
    Failed,
}

/// Cooperative cancellation flag for one conversion.
///
/// Honored only before the first service call: a honored cancel leaves
/// nothing behind on the remote side. Once the document is created the
/// dispatch runs to completion, so a cancel never orphans an empty
/// document or leaves one half-populated.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Successful dispatch result, handed back to the job manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub document_id: String,
    pub share_link: String,
    pub title: String,
}

/// Submits compiled documents to the remote service.
pub struct Dispatcher<'a, S: DocumentService> {
    service: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: DocumentService> Dispatcher<'a, S> {
    #[must_use]
    pub fn new(service: &'a S, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Dispatch a compiled document: create it, apply the primary batch,
    /// then populate table cells from read-back offsets.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] if the token has fired before
    /// any service call is made, and the classified service error
    /// otherwise. A failure after document creation leaves the document
    /// in place with the error attributable to the surfaced kind.
    pub fn dispatch(
        &self,
        compiled: &CompiledDocument,
        title: &str,
        credential: &Credential,
        cancel: &CancelToken,
    ) -> Result<DispatchReceipt, DispatchError> {
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        // Once creation is issued the conversion runs to completion: a
        // cancel honored now would strand an empty titled document, with
        // no delete operation to clean it up.
        let document_id =
            self.with_retry("create document", || {
                self.service.create_document(title, credential)
            })?;

        self.transition(DispatchState::DispatchingPrimary);
        let primary = encode_batch(&compiled.ops);
        if !primary.is_empty() {
            self.with_retry("primary batch", || {
                self.service.batch_update(&document_id, &primary, credential)
            })?;
        }

        if compiled.has_tables() {
            self.transition(DispatchState::TableReadback);
            let grids = self.with_retry("table readback", || {
                self.service.fetch_tables(&document_id, credential)
            })?;

            self.transition(DispatchState::DispatchingCells);
            let cells = build_cell_batch(&compiled.tables, &grids)?;
            if !cells.is_empty() {
                self.with_retry("cell batch", || {
                    self.service.batch_update(&document_id, &cells, credential)
                })?;
            }
        }

        let share_link = self.with_retry("share link", || {
            self.service.share_link(&document_id, credential)
        })?;

        self.transition(DispatchState::Success);
        Ok(DispatchReceipt {
            document_id,
            share_link,
            title: title.to_owned(),
        })
    }

    /// Grant anyone-with-the-link access, with the same retry policy.
    pub fn make_public(
        &self,
        document_id: &str,
        credential: &Credential,
    ) -> Result<(), DispatchError> {
        self.with_retry("make public", || {
            self.service.make_public(document_id, credential)
        })
    }

    /// Run one service call under the retry policy. The closure is
    /// re-invoked with identical input on every attempt.
    fn with_retry<T>(
        &self,
        what: &str,
        mut call: impl FnMut() -> Result<T, ServiceError>,
    ) -> Result<T, DispatchError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempts < self.policy.max_attempts => {
                    let delay = self.policy.delay(attempts - 1, err.retry_after());
                    self.transition(DispatchState::RetryBackoff);
                    warn!(
                        "{what} failed ({err}), retrying in {}ms (attempt {attempts}/{})",
                        delay.as_millis(),
                        self.policy.max_attempts
                    );
                    std::thread::sleep(delay);
                }
                Err(err) if err.is_retryable() => {
                    self.transition(DispatchState::Failed);
                    return Err(DispatchError::RetriesExhausted {
                        attempts,
                        last: err,
                    });
                }
                Err(err) => {
                    self.transition(DispatchState::Failed);
                    return Err(DispatchError::Fatal(err));
                }
            }
        }
    }

    fn transition(&self, state: DispatchState) {
        debug!("dispatch state: {state:?}");
    }
}

/// Build the cell-population batch from read-back table grids.
///
/// Cells are written in document order, row-major within each table. The
/// read-back offsets describe the empty tables, so each write is shifted
/// by the text already inserted ahead of it in this batch — offsets come
/// out strictly increasing.
fn build_cell_batch(
    tables: &[PendingTable],
    grids: &[TableGrid],
) -> Result<Vec<serde_json::Value>, TableOffsetError> {
    let mut requests = Vec::new();
    let mut shift: u64 = 0;

    for (index, table) in tables.iter().enumerate() {
        let grid = grids
            .get(index)
            .ok_or(TableOffsetError::MissingTable { index })?;
        let strategy = ReadBackOffsetStrategy::new(grid.clone());

        for cell in &table.cells {
            let start = strategy.cell_start(cell.row, cell.col)? + shift;
            let len = cell.text.chars().count() as u64;
            if len == 0 {
                continue;
            }
            requests.push(encode_cell_text(start, &cell.text));
            if cell.bold {
                requests.push(encode_op(&MutationOp::SetTextStyle {
                    start,
                    end: start + len,
                    style: CharStyle::Bold,
                }));
            }
            shift += len;
        }
    }

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use md2doc_compiler::compile;
    use md2doc_model::parse_document;

    use super::*;
    use crate::error::DispatchErrorKind;
    use crate::mock::MockService;

    fn compile_markdown(text: &str) -> CompiledDocument {
        compile(&parse_document(text).document).unwrap()
    }

    fn credential() -> Credential {
        Credential::new("test-token")
    }

    fn dispatch(
        service: &MockService,
        compiled: &CompiledDocument,
    ) -> Result<DispatchReceipt, DispatchError> {
        Dispatcher::new(service, RetryPolicy::immediate(3)).dispatch(
            compiled,
            "Test Doc",
            &credential(),
            &CancelToken::new(),
        )
    }

    #[test]
    fn test_successful_dispatch_returns_receipt() {
        let service = MockService::new();
        let compiled = compile_markdown("# Hello");
        let receipt = dispatch(&service, &compiled).unwrap();
        assert_eq!(receipt.document_id, "mock-doc-1");
        assert_eq!(receipt.share_link, "https://docs.example.com/d/mock-doc-1");
        assert_eq!(service.created_titles(), vec!["Test Doc"]);
        assert_eq!(service.batches().len(), 1);
    }

    #[test]
    fn test_rate_limited_twice_succeeds_on_third_unchanged_submission() {
        let service = MockService::new()
            .with_failure("batch", ServiceError::RateLimited { retry_after: None })
            .with_failure("batch", ServiceError::RateLimited { retry_after: None });
        let compiled = compile_markdown("# Hello\n\nWorld");

        let receipt = dispatch(&service, &compiled).unwrap();
        assert_eq!(receipt.document_id, "mock-doc-1");

        // Exactly three submissions, all byte-identical: the batch is
        // never partially resubmitted.
        let batches = service.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], batches[1]);
        assert_eq!(batches[1], batches[2]);
    }

    #[test]
    fn test_retry_exhaustion_surfaces_rate_limit_kind() {
        let service = MockService::new()
            .with_failure("batch", ServiceError::RateLimited { retry_after: None })
            .with_failure("batch", ServiceError::RateLimited { retry_after: None })
            .with_failure("batch", ServiceError::RateLimited { retry_after: None });
        let compiled = compile_markdown("# Hello");

        let err = dispatch(&service, &compiled).unwrap_err();
        assert_eq!(err.kind(), DispatchErrorKind::RateLimited);
        assert!(matches!(
            err,
            DispatchError::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[test]
    fn test_credential_expired_aborts_immediately() {
        let service = MockService::new().with_failure("batch", ServiceError::CredentialExpired);
        let compiled = compile_markdown("# Hello");

        let err = dispatch(&service, &compiled).unwrap_err();
        assert_eq!(err.kind(), DispatchErrorKind::CredentialExpired);
        // One submission only: authentication problems are never retried
        // locally.
        assert_eq!(service.batches().len(), 1);
    }

    #[test]
    fn test_permission_denied_is_fatal() {
        let service = MockService::new().with_failure(
            "create",
            ServiceError::PermissionDenied {
                body: "forbidden".to_owned(),
            },
        );
        let compiled = compile_markdown("# Hello");
        let err = dispatch(&service, &compiled).unwrap_err();
        assert_eq!(err.kind(), DispatchErrorKind::PermissionDenied);
    }

    #[test]
    fn test_cancelled_before_dispatch_makes_no_calls() {
        let service = MockService::new();
        let compiled = compile_markdown("# Hello");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = Dispatcher::new(&service, RetryPolicy::immediate(3))
            .dispatch(&compiled, "Doc", &credential(), &cancel)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
        assert!(service.created_titles().is_empty());
        assert!(service.batches().is_empty());
    }

    /// Fires a cancel token from inside `create_document`, modelling a
    /// cancel that arrives while the create call is in flight.
    struct CancelDuringCreate<'a> {
        inner: &'a MockService,
        cancel: CancelToken,
    }

    impl DocumentService for CancelDuringCreate<'_> {
        fn create_document(
            &self,
            title: &str,
            credential: &Credential,
        ) -> Result<String, ServiceError> {
            self.cancel.cancel();
            self.inner.create_document(title, credential)
        }

        fn batch_update(
            &self,
            document_id: &str,
            requests: &[serde_json::Value],
            credential: &Credential,
        ) -> Result<(), ServiceError> {
            self.inner.batch_update(document_id, requests, credential)
        }

        fn fetch_tables(
            &self,
            document_id: &str,
            credential: &Credential,
        ) -> Result<Vec<TableGrid>, ServiceError> {
            self.inner.fetch_tables(document_id, credential)
        }

        fn share_link(
            &self,
            document_id: &str,
            credential: &Credential,
        ) -> Result<String, ServiceError> {
            self.inner.share_link(document_id, credential)
        }

        fn make_public(
            &self,
            document_id: &str,
            credential: &Credential,
        ) -> Result<(), ServiceError> {
            self.inner.make_public(document_id, credential)
        }
    }

    #[test]
    fn test_cancel_during_create_never_orphans_the_document() {
        let mock = MockService::new();
        let cancel = CancelToken::new();
        let service = CancelDuringCreate {
            inner: &mock,
            cancel: cancel.clone(),
        };
        let compiled = compile_markdown("# Hello");

        // The cancel lands too late to be honored: the created document
        // still receives its content instead of being stranded empty.
        let receipt = Dispatcher::new(&service, RetryPolicy::immediate(3))
            .dispatch(&compiled, "Doc", &credential(), &cancel)
            .unwrap();
        assert_eq!(receipt.document_id, "mock-doc-1");
        assert_eq!(mock.created_titles(), vec!["Doc"]);
        assert_eq!(mock.batches().len(), 1);
    }

    #[test]
    fn test_table_population_issues_second_batch_from_readback() {
        let service = MockService::new().with_table_grids(vec![TableGrid {
            cell_starts: vec![vec![4, 6], vec![9, 11]],
        }]);
        let compiled = compile_markdown("| h1 | h2 |\n|----|----|\n| r1 | r2 |");

        dispatch(&service, &compiled).unwrap();
        let batches = service.batches();
        assert_eq!(batches.len(), 2);

        // Four cell inserts at strictly increasing shifted offsets, with
        // bold styling on the two header cells.
        let cell_batch = &batches[1];
        let offsets: Vec<u64> = cell_batch
            .iter()
            .filter_map(|req| req["insertText"]["location"]["index"].as_u64())
            .collect();
        assert_eq!(offsets, vec![4, 8, 13, 17]);
        let bold_count = cell_batch
            .iter()
            .filter(|req| req["updateTextStyle"]["textStyle"]["bold"] == true)
            .count();
        assert_eq!(bold_count, 2);
    }

    #[test]
    fn test_padded_cells_are_skipped_but_counted_in_grid() {
        let service = MockService::new().with_table_grids(vec![TableGrid {
            cell_starts: vec![vec![4, 6], vec![9, 11]],
        }]);
        let compiled = compile_markdown("| h1 | h2 |\n|---|---|\n| only |");
        assert_eq!(compiled.tables[0].cells.len(), 4);

        dispatch(&service, &compiled).unwrap();
        let cell_batch = &service.batches()[1];
        // The empty padding cell needs no insert; all others are written.
        let inserts = cell_batch
            .iter()
            .filter(|req| req.get("insertText").is_some())
            .count();
        assert_eq!(inserts, 3);
    }

    #[test]
    fn test_missing_readback_table_is_an_internal_error() {
        let service = MockService::new(); // no grids scripted
        let compiled = compile_markdown("| h |\n|---|\n| v |");
        let err = dispatch(&service, &compiled).unwrap_err();
        assert_eq!(err.kind(), DispatchErrorKind::Internal);
    }

    #[test]
    fn test_document_without_tables_skips_readback() {
        let service = MockService::new();
        let compiled = compile_markdown("plain paragraph");
        dispatch(&service, &compiled).unwrap();
        assert_eq!(service.batches().len(), 1);
    }

    #[test]
    fn test_transient_error_on_readback_is_retried() {
        let service = MockService::new()
            .with_failure(
                "fetch",
                ServiceError::Transient {
                    status: 502,
                    body: "bad gateway".to_owned(),
                },
            )
            .with_table_grids(vec![TableGrid {
                cell_starts: vec![vec![4]],
            }]);
        let compiled = compile_markdown("| h |\n|---|");
        assert!(dispatch(&service, &compiled).is_ok());
    }
}
