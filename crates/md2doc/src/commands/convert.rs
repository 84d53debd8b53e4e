//! `md2doc convert` command implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use md2doc_config::{CliSettings, Config};
use md2doc_gateway::{
    CancelToken, Credential, DocumentPublisher, DryRunReport, HttpDocumentService, PublishConfig,
    PublishResult, RetryPolicy,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Path to the markdown file.
    markdown_file: PathBuf,

    /// Document title used when the front matter carries none.
    #[arg(short, long)]
    title: Option<String>,

    /// Bearer access token for the document service.
    #[arg(long, env = "MD2DOC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Grant anyone-with-the-link read access to the created document.
    #[arg(long)]
    public: bool,

    /// Document service base URL (overrides config).
    #[arg(long)]
    base_url: Option<String>,

    /// Preview the compiled batch without creating a document.
    #[arg(long)]
    dry_run: bool,

    /// Path to configuration file (default: auto-discover md2doc.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            base_url: self.base_url.clone(),
            access_token: self.token.clone(),
            make_public: self.public.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let markdown_text = std::fs::read_to_string(&self.markdown_file)?;
        output.info(&format!("Converting {}...", self.markdown_file.display()));

        let service = HttpDocumentService::new(&config.service.base_url);
        let publish_config = PublishConfig {
            title: self.title.clone(),
            make_public: config.convert.make_public,
        };
        let publisher =
            DocumentPublisher::new(&service, retry_policy(&config), publish_config);

        if self.dry_run {
            let report = publisher.dry_run(&markdown_text)?;
            print_dry_run_report(&output, &report);
        } else {
            let token = config.require_access_token()?;
            let credential = Credential::new(token);
            let result = publisher.publish(&markdown_text, &credential, &CancelToken::new())?;
            print_publish_result(&output, &result, config.convert.make_public);
        }

        Ok(())
    }
}

fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.dispatch.max_attempts,
        base_delay: Duration::from_millis(config.dispatch.base_delay_ms),
        max_delay: Duration::from_millis(config.dispatch.max_delay_ms),
    }
}

fn print_dry_run_report(output: &Output, report: &DryRunReport) {
    output.highlight("\n[DRY RUN] No document created.");
    output.info(&format!("Title: {}", report.title));
    output.info(&format!("Operations: {}", report.ops));
    output.info(&format!("Tables: {}", report.tables));
    output.info(&format!("Characters inserted: {}", report.inserted_chars));
    print_warnings(output, &report.warnings);
}

fn print_publish_result(output: &Output, result: &PublishResult, public: bool) {
    output.success("\nDocument created successfully!");
    output.info(&format!("ID: {}", result.receipt.document_id));
    output.info(&format!("Title: {}", result.receipt.title));
    output.info(&format!("URL: {}", result.receipt.share_link));
    if public {
        output.info("Access: anyone with the link");
    }
    print_warnings(output, &result.warnings);
}

fn print_warnings(output: &Output, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    output.warning(&format!("\nWarning: {} metadata problem(s):", warnings.len()));
    for warning in warnings {
        output.info(&format!("  - {warning}"));
    }
}
