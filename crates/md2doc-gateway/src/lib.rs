//! Dispatch gateway for the remote document service.
//!
//! Owns everything between a [`md2doc_compiler::CompiledDocument`] and a
//! shareable link: the wire encoding of mutation batches, the HTTP
//! transport, retry with backoff, two-phase table population and the
//! end-to-end [`DocumentPublisher`] pipeline. All submission is
//! batch-atomic: a failed batch is resent unchanged, never partially.

mod dispatch;
mod error;
mod http;
mod mock;
mod publisher;
mod retry;
mod service;
mod wire;

pub use dispatch::{CancelToken, DispatchReceipt, DispatchState, Dispatcher};
pub use error::{DispatchError, DispatchErrorKind, ServiceError};
pub use http::HttpDocumentService;
pub use mock::MockService;
pub use publisher::{DocumentPublisher, DryRunReport, PublishConfig, PublishResult};
pub use retry::RetryPolicy;
pub use service::{Credential, DocumentService};
pub use wire::{encode_batch, parse_table_grids};
