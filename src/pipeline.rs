// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Report generation passes for one repository or a whole repository list.
use std::{collections::HashMap, path::Path};

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    client::ActionsClient,
    config::ReportSettings,
    error::Error,
    output::{ReportPaths, write_reports},
    report::{RunRecord, build_records},
    repos::RepositoryRef,
};

/// File stem of the report covering every repository of a batch.
const COMBINED_REPORT_STEM: &str = "combined";

/// Artifacts written for one repository.
#[derive(Debug, Clone, Serialize,)]
pub struct RepositoryReport
{
    /// Repository the report describes.
    pub repository: RepositoryRef,
    /// Number of workflow runs in the report.
    pub runs:       usize,
    /// Written artifacts.
    pub paths:      ReportPaths,
}

/// Repository whose report could not be produced.
#[derive(Debug, Clone, Serialize,)]
pub struct RepositoryFailure
{
    /// Repository that failed.
    pub repository: RepositoryRef,
    /// Rendered error message.
    pub message:    String,
}

/// Result of a batch run.
#[derive(Debug, Clone, Default, Serialize,)]
pub struct BatchOutcome
{
    /// Reports written successfully, in list order.
    pub reports:  Vec<RepositoryReport,>,
    /// Repositories that failed, in list order.
    pub failures: Vec<RepositoryFailure,>,
    /// Combined report, when enabled and at least one repository succeeded.
    pub combined: Option<ReportPaths,>,
}

impl BatchOutcome
{
    /// Whether every repository produced a report.
    pub fn is_success(&self,) -> bool
    {
        self.failures.is_empty()
    }
}

/// Fetches runs for a repository and turns them into report records.
///
/// Jobs are fetched concurrently for runs whose status is one of
/// [`ReportSettings::detail_statuses`]. A failed job fetch is logged and
/// leaves that run without jobs instead of failing the repository.
///
/// # Errors
///
/// Returns the error of the runs listing.
pub async fn collect_records(
    client: &ActionsClient,
    settings: &ReportSettings,
    repository: &RepositoryRef,
) -> Result<Vec<RunRecord,>, Error,>
{
    let runs = client.fetch_runs(repository, settings.per_page, settings.max_pages,).await?;

    let detail_ids: Vec<u64,> = runs
        .iter()
        .filter(|run| settings.wants_jobs(run.status.as_deref(),),)
        .map(|run| run.id,)
        .collect();

    let results =
        join_all(detail_ids.iter().map(|run_id| client.fetch_jobs(repository, *run_id,),),).await;

    let mut jobs_by_run = HashMap::with_capacity(detail_ids.len(),);
    for (run_id, result,) in detail_ids.iter().zip(results,) {
        match result {
            Ok(jobs,) => {
                jobs_by_run.insert(*run_id, jobs,);
            }
            Err(error,) => {
                warn!("Skipping jobs for run {} of {}: {}", run_id, repository, error);
            }
        }
    }

    Ok(build_records(repository, &runs, &jobs_by_run,),)
}

/// Collects records for one repository and writes its reports under
/// `prefix`.
///
/// # Errors
///
/// Propagates fetch errors and report writing errors.
pub async fn process_repository(
    client: &ActionsClient,
    settings: &ReportSettings,
    repository: &RepositoryRef,
    prefix: &Path,
) -> Result<(Vec<RunRecord,>, RepositoryReport,), Error,>
{
    let records = collect_records(client, settings, repository,).await?;
    let paths = write_reports(prefix, &records, settings.queued_preview_limit,)?;
    info!("Wrote reports for {}: {}", repository, paths);

    let report = RepositoryReport {
        repository: repository.clone(),
        runs: records.len(),
        paths,
    };
    Ok((records, report,),)
}

/// Processes every repository in order, writing each report to
/// `<output_dir>/<owner>/<name>` and, when enabled, a combined report to
/// `<output_dir>/combined`.
///
/// A failing repository is recorded in [`BatchOutcome::failures`] and the
/// batch moves on.
///
/// # Errors
///
/// Returns an error only when the combined report cannot be written.
pub async fn process_repositories(
    client: &ActionsClient,
    settings: &ReportSettings,
    repositories: &[RepositoryRef],
) -> Result<BatchOutcome, Error,>
{
    let progress = progress_bar(repositories.len() as u64,);
    let mut outcome = BatchOutcome::default();
    let mut combined_records = Vec::new();

    for repository in repositories {
        progress.set_message(repository.to_string(),);
        let prefix = repository.output_prefix(&settings.output_dir,);

        match process_repository(client, settings, repository, &prefix,).await {
            Ok((records, report,),) => {
                if settings.combined_report {
                    combined_records.extend(records,);
                }
                outcome.reports.push(report,);
            }
            Err(failure,) => {
                error!("Failed to build report for {}: {}", repository, failure);
                outcome.failures.push(RepositoryFailure {
                    repository: repository.clone(),
                    message:    failure.to_display_string(),
                },);
            }
        }
        progress.inc(1,);
    }
    progress.finish_and_clear();

    if settings.combined_report && !outcome.reports.is_empty() {
        let prefix = settings.output_dir.join(COMBINED_REPORT_STEM,);
        let paths = write_reports(&prefix, &combined_records, settings.queued_preview_limit,)?;
        info!("Wrote combined report for {} runs: {}", combined_records.len(), paths);
        outcome.combined = Some(paths,);
    }

    info!(
        "Processed {} repositories: {} succeeded, {} failed",
        repositories.len(),
        outcome.reports.len(),
        outcome.failures.len()
    );
    Ok(outcome,)
}

fn progress_bar(len: u64,) -> ProgressBar
{
    let progress = ProgressBar::new(len,);
    if let Ok(style,) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}",)
    {
        progress.set_style(style,);
    }
    progress
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    use super::{collect_records, process_repositories};
    use crate::{
        ActionsClient, QueuedReason, RateLimitPolicy, ReportSettings, RetryConfig,
        repos::RepositoryRef,
    };

    fn settings(server: &MockServer, output_dir: &std::path::Path,) -> ReportSettings
    {
        ReportSettings {
            api_base: server.base_url(),
            output_dir: output_dir.to_path_buf(),
            rate_limit: RateLimitPolicy {
                min_wait_secs: 0, max_waits: 0,
            },
            retry: RetryConfig {
                max_attempts: 1, initial_delay_ms: 1, backoff_factor: 1.0,
            },
            ..ReportSettings::default()
        }
    }

    #[tokio::test]
    async fn jobs_are_fetched_only_for_detail_statuses()
    {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/hello/actions/runs",);
                then.status(200,).json_body(json!({
                    "workflow_runs": [
                        { "id": 1, "status": "queued" },
                        { "id": 2, "status": "in_progress" },
                        { "id": 3, "status": "completed", "conclusion": "success" }
                    ]
                }),);
            },)
            .await;
        let queued_jobs = server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/hello/actions/runs/1/jobs",);
                then.status(200,).json_body(json!({
                    "jobs": [
                        { "id": 10, "status": "queued", "runner_name": null },
                        { "id": 11, "status": "in_progress", "runner_name": "runner-3" }
                    ]
                }),);
            },)
            .await;
        let failing_jobs = server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/hello/actions/runs/2/jobs",);
                then.status(404,).json_body(json!({ "message": "Not Found" }),);
            },)
            .await;
        let completed_jobs = server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/hello/actions/runs/3/jobs",);
                then.status(200,).json_body(json!({ "jobs": [] }),);
            },)
            .await;

        let dir = tempdir().expect("failed to create tempdir",);
        let settings = settings(&server, dir.path(),);
        let client = ActionsClient::new(&settings, None,).expect("client builds",);
        let repository = RepositoryRef::new("octo", "hello",).expect("valid repository",);

        let records =
            collect_records(&client, &settings, &repository,).await.expect("records collected",);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].jobs.as_ref().map(Vec::len), Some(2));
        assert_eq!(records[0].queued_reason_inferred, Some(QueuedReason::RunnerCapacity));
        assert!(records[1].jobs.is_none(), "failed job fetch leaves jobs empty");
        assert!(records[2].jobs.is_none());
        queued_jobs.assert_hits_async(1,).await;
        failing_jobs.assert_hits_async(1,).await;
        completed_jobs.assert_hits_async(0,).await;
    }

    #[tokio::test]
    async fn batch_continues_after_failure_and_writes_combined_report()
    {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/hello/actions/runs",);
                then.status(200,).json_body(json!({
                    "workflow_runs": [{ "id": 1, "status": "completed", "conclusion": "failure" }]
                }),);
            },)
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/missing/actions/runs",);
                then.status(404,).json_body(json!({ "message": "Not Found" }),);
            },)
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/world/actions/runs",);
                then.status(200,).json_body(json!({
                    "workflow_runs": [{ "id": 5, "status": "completed", "conclusion": "success" }]
                }),);
            },)
            .await;

        let dir = tempdir().expect("failed to create tempdir",);
        let settings = settings(&server, dir.path(),);
        let client = ActionsClient::new(&settings, None,).expect("client builds",);
        let repositories = vec![
            RepositoryRef::new("octo", "hello",).expect("valid repository",),
            RepositoryRef::new("octo", "missing",).expect("valid repository",),
            RepositoryRef::new("octo", "world",).expect("valid repository",),
        ];

        let outcome = process_repositories(&client, &settings, &repositories,)
            .await
            .expect("batch completes",);

        assert!(!outcome.is_success());
        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].repository.name, "missing");
        assert!(outcome.failures[0].message.contains("404"));

        assert!(dir.path().join("octo/hello.json").exists());
        assert!(dir.path().join("octo/world.csv").exists());
        assert!(!dir.path().join("octo/missing.json").exists());

        let combined = outcome.combined.expect("combined report written",);
        let rows: Value = serde_json::from_str(
            &fs::read_to_string(&combined.json,).expect("combined json readable",),
        )
        .expect("valid json",);
        let repos: Vec<&str,> = rows
            .as_array()
            .expect("array",)
            .iter()
            .filter_map(|row| row["org_repo"].as_str(),)
            .collect();
        assert_eq!(repos, vec!["octo/hello", "octo/world"]);
    }

    #[tokio::test]
    async fn combined_report_can_be_disabled()
    {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET,).path("/repos/octo/hello/actions/runs",);
                then.status(200,).json_body(json!({ "workflow_runs": [] }),);
            },)
            .await;

        let dir = tempdir().expect("failed to create tempdir",);
        let mut settings = settings(&server, dir.path(),);
        settings.combined_report = false;
        let client = ActionsClient::new(&settings, None,).expect("client builds",);
        let repositories = vec![RepositoryRef::new("octo", "hello",).expect("valid repository",)];

        let outcome = process_repositories(&client, &settings, &repositories,)
            .await
            .expect("batch completes",);

        assert!(outcome.is_success());
        assert!(outcome.combined.is_none());
        assert!(!dir.path().join("combined.json").exists());
        assert_eq!(outcome.reports[0].runs, 0);
    }
}
