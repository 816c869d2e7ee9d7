//! Reshaping of fetched runs into report rows.
//!
//! [`RunRecord`] is the full JSON row, [`CsvRecord`] the flat projection used
//! by the CSV and HTML outputs, and [`StatusCount`] the per status and
//! conclusion tally shown in the HTML summary.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::{
    models::{WorkflowJob, WorkflowRun},
    queued::{QueuedReason, infer_queued_reason},
    repos::RepositoryRef,
};

/// One workflow run as written to the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Repository as `owner/repo`.
    pub org_repo:               String,
    /// Workflow run id.
    pub workflow_run_id:        u64,
    /// Workflow name shown in the Actions tab.
    pub workflow_name:          Option<String>,
    /// Id of the workflow definition.
    pub workflow_id:            Option<u64>,
    /// Branch the run was triggered on.
    pub head_branch:            Option<String>,
    /// Commit the run was triggered on.
    pub head_sha:               Option<String>,
    /// Triggering event, e.g. `push` or `pull_request`.
    pub event:                  Option<String>,
    /// Run status (`queued`, `in_progress`, `completed`, ...).
    pub status:                 Option<String>,
    /// Outcome of a completed run.
    pub conclusion:             Option<String>,
    /// Creation timestamp as returned by the API.
    pub created_at:             Option<String>,
    /// Time the run left the queue.
    pub run_started_at:         Option<String>,
    /// Last update timestamp.
    pub updated_at:             Option<String>,
    /// Login of the triggering user.
    pub actor:                  Option<String>,
    /// Link to the run in the web UI.
    pub html_url:               Option<String>,
    /// Jobs of the run, or `None` when they were not fetched.
    pub jobs:                   Option<Vec<WorkflowJob>>,
    /// Why a queued run is waiting; `None` for other statuses.
    pub queued_reason_inferred: Option<QueuedReason>
}

/// Flat projection of a [`RunRecord`] used for CSV and HTML tables.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvRecord {
    /// See [`RunRecord::org_repo`].
    pub org_repo:               String,
    /// See [`RunRecord::workflow_run_id`].
    pub workflow_run_id:        u64,
    /// See [`RunRecord::workflow_name`].
    pub workflow_name:          Option<String>,
    /// See [`RunRecord::head_branch`].
    pub head_branch:            Option<String>,
    /// See [`RunRecord::event`].
    pub event:                  Option<String>,
    /// See [`RunRecord::status`].
    pub status:                 Option<String>,
    /// See [`RunRecord::conclusion`].
    pub conclusion:             Option<String>,
    /// See [`RunRecord::created_at`].
    pub created_at:             Option<String>,
    /// See [`RunRecord::updated_at`].
    pub updated_at:             Option<String>,
    /// See [`RunRecord::actor`].
    pub actor:                  Option<String>,
    /// Number of jobs, empty when jobs are missing or empty.
    pub jobs_count:             Option<usize>,
    /// See [`RunRecord::queued_reason_inferred`].
    pub queued_reason_inferred: Option<QueuedReason>,
    /// See [`RunRecord::html_url`].
    pub html_url:               Option<String>
}

/// CSV header, identical to the [`CsvRecord`] field order.
pub const CSV_COLUMNS: [&str; 13] = [
    "org_repo",
    "workflow_run_id",
    "workflow_name",
    "head_branch",
    "event",
    "status",
    "conclusion",
    "created_at",
    "updated_at",
    "actor",
    "jobs_count",
    "queued_reason_inferred",
    "html_url"
];

/// Number of runs sharing a status and conclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    /// Run status.
    pub status:     String,
    /// Run conclusion, empty while the run is in flight.
    pub conclusion: String,
    /// Number of runs with this pair.
    pub count:      usize
}

/// Builds one record per run, preserving the API order.
///
/// `jobs_by_run` holds the job lists that were fetched successfully, keyed by
/// run id. Runs without an entry get `jobs: None`.
pub fn build_records(
    repository: &RepositoryRef,
    runs: &[WorkflowRun],
    jobs_by_run: &HashMap<u64, Vec<WorkflowJob>>
) -> Vec<RunRecord> {
    let org_repo = repository.to_string();

    runs.iter()
        .map(|run| {
            let jobs = jobs_by_run.get(&run.id).cloned();
            let queued_reason_inferred =
                infer_queued_reason(run, jobs.as_deref().unwrap_or_default());

            RunRecord {
                org_repo: org_repo.clone(),
                workflow_run_id: run.id,
                workflow_name: run.name.clone(),
                workflow_id: run.workflow_id,
                head_branch: run.head_branch.clone(),
                head_sha: run.head_sha.clone(),
                event: run.event.clone(),
                status: run.status.clone(),
                conclusion: run.conclusion.clone(),
                created_at: run.created_at.clone(),
                run_started_at: run.run_started_at.clone(),
                updated_at: run.updated_at.clone(),
                actor: run.actor_login().map(str::to_owned),
                html_url: run.html_url.clone(),
                jobs,
                queued_reason_inferred
            }
        })
        .collect()
}

impl From<&RunRecord> for CsvRecord {
    fn from(record: &RunRecord) -> Self {
        Self {
            org_repo:               record.org_repo.clone(),
            workflow_run_id:        record.workflow_run_id,
            workflow_name:          record.workflow_name.clone(),
            head_branch:            record.head_branch.clone(),
            event:                  record.event.clone(),
            status:                 record.status.clone(),
            conclusion:             record.conclusion.clone(),
            created_at:             record.created_at.clone(),
            updated_at:             record.updated_at.clone(),
            actor:                  record.actor.clone(),
            jobs_count:             record
                .jobs
                .as_ref()
                .map(Vec::len)
                .filter(|count| *count > 0),
            queued_reason_inferred: record.queued_reason_inferred,
            html_url:               record.html_url.clone()
        }
    }
}

impl CsvRecord {
    /// Cell values in [`CSV_COLUMNS`] order, empty for missing values.
    pub fn cells(&self) -> [String; 13] {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }

        [
            self.org_repo.clone(),
            self.workflow_run_id.to_string(),
            text(&self.workflow_name),
            text(&self.head_branch),
            text(&self.event),
            text(&self.status),
            text(&self.conclusion),
            text(&self.created_at),
            text(&self.updated_at),
            text(&self.actor),
            self.jobs_count.map(|count| count.to_string()).unwrap_or_default(),
            self.queued_reason_inferred
                .map(|reason| reason.as_str().to_owned())
                .unwrap_or_default(),
            text(&self.html_url)
        ]
    }
}

/// Projects every record onto its CSV row.
pub fn csv_records(records: &[RunRecord]) -> Vec<CsvRecord> {
    records.iter().map(CsvRecord::from).collect()
}

/// Counts runs per `(status, conclusion)`, ordered by status then
/// conclusion.
///
/// Runs still in flight have no conclusion; they are counted under an empty
/// conclusion instead of being dropped.
pub fn summarize(records: &[RunRecord]) -> Vec<StatusCount> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for record in records {
        let key = (
            record.status.clone().unwrap_or_default(),
            record.conclusion.clone().unwrap_or_default()
        );
        *counts.entry(key).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((status, conclusion), count)| StatusCount {
            status,
            conclusion,
            count
        })
        .collect()
}

/// First `limit` rows whose status is `queued`, in report order.
pub fn queued_preview(rows: &[CsvRecord], limit: usize) -> Vec<&CsvRecord> {
    rows.iter()
        .filter(|row| row.status.as_deref() == Some("queued"))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::{CsvRecord, StatusCount, build_records, csv_records, queued_preview, summarize};
    use crate::{
        models::{WorkflowJob, WorkflowRun},
        queued::QueuedReason,
        repos::RepositoryRef
    };

    fn repository() -> RepositoryRef {
        RepositoryRef::new("octo", "hello").expect("valid repository")
    }

    fn runs() -> Vec<WorkflowRun> {
        serde_json::from_value(json!([
            {
                "id": 1, "name": "CI", "workflow_id": 10, "head_branch": "main",
                "head_sha": "abc", "event": "push", "status": "queued",
                "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:01:00Z",
                "actor": { "login": "octocat" },
                "html_url": "https://github.com/octo/hello/actions/runs/1"
            },
            { "id": 2, "name": "CI", "status": "completed", "conclusion": "success" },
            { "id": 3, "name": "Deploy", "status": "completed", "conclusion": "failure" },
            { "id": 4, "name": "CI", "status": "completed", "conclusion": "success" },
            { "id": 5, "name": "Nightly", "status": "in_progress" }
        ]))
        .expect("valid runs")
    }

    fn queued_job() -> WorkflowJob {
        serde_json::from_value(json!({ "id": 100, "run_id": 1, "status": "queued" }))
            .expect("valid job")
    }

    #[test]
    fn records_follow_run_order_and_carry_jobs() {
        let mut jobs = HashMap::new();
        jobs.insert(1, vec![queued_job()]);
        jobs.insert(5, Vec::new());

        let records = build_records(&repository(), &runs(), &jobs);

        assert_eq!(records.len(), 5);
        assert_eq!(
            records.iter().map(|r| r.workflow_run_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        let first = &records[0];
        assert_eq!(first.org_repo, "octo/hello");
        assert_eq!(first.actor.as_deref(), Some("octocat"));
        assert_eq!(first.jobs.as_ref().map(Vec::len), Some(1));
        assert_eq!(first.queued_reason_inferred, Some(QueuedReason::NoAvailableRunner));
        assert!(records[1].jobs.is_none());
        assert!(records[1].queued_reason_inferred.is_none());
    }

    #[test]
    fn queued_run_without_fetched_jobs_is_unknown() {
        let records = build_records(&repository(), &runs(), &HashMap::new());
        assert_eq!(records[0].queued_reason_inferred, Some(QueuedReason::UnknownOrConcurrency));
    }

    #[test]
    fn json_row_uses_null_for_missing_jobs() {
        let records = build_records(&repository(), &runs(), &HashMap::new());
        let value = serde_json::to_value(&records[1]).expect("serializable record");
        assert_eq!(value["jobs"], json!(null));
        assert_eq!(value["queued_reason_inferred"], json!(null));
        assert_eq!(value["workflow_run_id"], json!(2));
    }

    #[test]
    fn csv_jobs_count_is_empty_for_missing_or_empty_jobs() {
        let mut jobs = HashMap::new();
        jobs.insert(1, vec![queued_job()]);
        jobs.insert(5, Vec::new());
        let rows = csv_records(&build_records(&repository(), &runs(), &jobs));

        assert_eq!(rows[0].jobs_count, Some(1));
        assert_eq!(rows[1].jobs_count, None);
        assert_eq!(rows[4].jobs_count, None);
    }

    #[test]
    fn cells_render_missing_values_as_empty_strings() {
        let rows = csv_records(&build_records(&repository(), &runs(), &HashMap::new()));
        let cells = rows[1].cells();
        assert_eq!(cells[0], "octo/hello");
        assert_eq!(cells[1], "2");
        assert_eq!(cells[3], "");
        assert_eq!(cells[6], "success");
        assert_eq!(cells[11], "");
    }

    #[test]
    fn summary_counts_every_run_including_in_flight() {
        let records = build_records(&repository(), &runs(), &HashMap::new());
        let summary = summarize(&records);

        assert_eq!(summary, vec![
            StatusCount {
                status:     "completed".to_owned(),
                conclusion: "failure".to_owned(),
                count:      1
            },
            StatusCount {
                status:     "completed".to_owned(),
                conclusion: "success".to_owned(),
                count:      2
            },
            StatusCount {
                status:     "in_progress".to_owned(),
                conclusion: String::new(),
                count:      1
            },
            StatusCount {
                status:     "queued".to_owned(),
                conclusion: String::new(),
                count:      1
            },
        ]);
        assert_eq!(summary.iter().map(|c| c.count).sum::<usize>(), records.len());
    }

    #[test]
    fn queued_preview_respects_limit() {
        let mut many = Vec::new();
        for id in 0..5 {
            many.push(CsvRecord {
                org_repo:               "octo/hello".to_owned(),
                workflow_run_id:        id,
                workflow_name:          None,
                head_branch:            None,
                event:                  None,
                status:                 Some(
                    if id % 2 == 0 { "queued" } else { "completed" }.to_owned()
                ),
                conclusion:             None,
                created_at:             None,
                updated_at:             None,
                actor:                  None,
                jobs_count:             None,
                queued_reason_inferred: None,
                html_url:               None
            });
        }

        let preview = queued_preview(&many, 2);
        assert_eq!(preview.iter().map(|r| r.workflow_run_id).collect::<Vec<_>>(), vec![0, 2]);
        assert!(queued_preview(&many, 0).is_empty());
    }
}
