//! End-to-end conversion pipeline: markdown text in, shared document out.

use tracing::info;

use md2doc_compiler::compile;
use md2doc_model::parse_document;

use crate::dispatch::{CancelToken, DispatchReceipt, Dispatcher};
use crate::error::DispatchError;
use crate::retry::RetryPolicy;
use crate::service::{Credential, DocumentService};

const FALLBACK_TITLE: &str = "Untitled document";

/// Conversion options beyond what the markdown itself carries.
#[derive(Clone, Debug, Default)]
pub struct PublishConfig {
    /// Caller-supplied document title. A `title` front-matter key takes
    /// precedence over it.
    pub title: Option<String>,
    /// Grant anyone-with-the-link read access after dispatch.
    pub make_public: bool,
}

/// Outcome of a successful conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishResult {
    pub receipt: DispatchReceipt,
    /// Non-fatal parse warnings (recovered front matter lines).
    pub warnings: Vec<String>,
}

/// What a conversion would send, without touching the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DryRunReport {
    pub title: String,
    pub ops: usize,
    pub tables: usize,
    /// Characters inserted by the primary batch.
    pub inserted_chars: u64,
    pub warnings: Vec<String>,
}

/// Drives the full pipeline: parse, compile, dispatch, optionally share.
pub struct DocumentPublisher<'a, S: DocumentService> {
    service: &'a S,
    policy: RetryPolicy,
    config: PublishConfig,
}

impl<'a, S: DocumentService> DocumentPublisher<'a, S> {
    #[must_use]
    pub fn new(service: &'a S, policy: RetryPolicy, config: PublishConfig) -> Self {
        Self {
            service,
            policy,
            config,
        }
    }

    /// Convert markdown text into a remote document and return its share
    /// link.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] for compile invariant violations and for
    /// any service failure that survives the retry policy.
    pub fn publish(
        &self,
        markdown: &str,
        credential: &Credential,
        cancel: &CancelToken,
    ) -> Result<PublishResult, DispatchError> {
        let outcome = parse_document(markdown);
        let title = self.title_for(outcome.document.front_matter.title());
        let compiled = compile(&outcome.document)?;
        info!(
            "compiled {} ops, {} tables for \"{title}\"",
            compiled.ops.len(),
            compiled.tables.len()
        );

        let dispatcher = Dispatcher::new(self.service, self.policy);
        let receipt = dispatcher.dispatch(&compiled, &title, credential, cancel)?;

        if self.config.make_public {
            dispatcher.make_public(&receipt.document_id, credential)?;
        }

        Ok(PublishResult {
            receipt,
            warnings: outcome.warnings,
        })
    }

    /// Parse and compile without dispatching anything.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Compile`] if the compiler detects an
    /// internal invariant violation.
    pub fn dry_run(&self, markdown: &str) -> Result<DryRunReport, DispatchError> {
        let outcome = parse_document(markdown);
        let title = self.title_for(outcome.document.front_matter.title());
        let compiled = compile(&outcome.document)?;
        Ok(DryRunReport {
            title,
            ops: compiled.ops.len(),
            tables: compiled.tables.len(),
            inserted_chars: compiled.inserted_chars(),
            warnings: outcome.warnings,
        })
    }

    fn title_for(&self, front_matter_title: Option<&str>) -> String {
        front_matter_title
            .map(str::to_owned)
            .or_else(|| self.config.title.clone())
            .unwrap_or_else(|| FALLBACK_TITLE.to_owned())
    }
}
