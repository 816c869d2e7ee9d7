//! Workflow run reporting for GitHub and GitHub Enterprise Server.
//!
//! The library lists recent GitHub Actions workflow runs for one repository or
//! a list of repositories, fetches job details for runs that are still waiting
//! or running, infers why queued runs are stuck and writes JSON, CSV and HTML
//! reports. [`ReportConfig`] loads the optional YAML configuration,
//! [`ActionsClient`] talks to the REST API and [`process_repositories`] drives
//! a batch end to end.

mod client;
mod config;
mod error;
mod html;
mod logging;
mod models;
mod output;
mod pipeline;
mod queued;
mod report;
mod repos;
mod retry;

pub use client::{ActionsClient, is_rate_limited, rate_limit_wait};
pub use config::{
    DEFAULT_API_BASE, RateLimitPolicy, ReportConfig, ReportSettings, SettingsOverrides,
    load_config, parse_config,
};
pub use error::{Error, io_error, report_io_error};
pub use html::render_report;
pub use logging::{default_filter, init_logging};
pub use models::{Actor, JobsPage, RunsPage, WorkflowJob, WorkflowRun};
pub use output::{
    ReportPaths, generated_at, with_extension, write_csv, write_html, write_json, write_reports,
};
pub use pipeline::{
    BatchOutcome, RepositoryFailure, RepositoryReport, collect_records, process_repositories,
    process_repository,
};
pub use queued::{QueuedReason, infer_queued_reason};
pub use report::{
    CSV_COLUMNS, CsvRecord, RunRecord, StatusCount, build_records, csv_records, queued_preview,
    summarize,
};
pub use repos::{RepositoryRef, load_repository_list, parse_repository_list};
pub use retry::{RetryConfig, retry_with_backoff};
