// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Best-effort explanation of why a workflow run sits in the queue.
///
/// The API does not say why a run is queued. Looking at its jobs gives a hint:
/// if none of them found a runner the pool is likely empty or offline, if only
/// some did the pool is saturated.
use serde::{Deserialize, Serialize};

use crate::models::{WorkflowJob, WorkflowRun};

/// Inferred cause of a queued run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum QueuedReason
{
    /// Every job is queued and none has been assigned a runner.
    NoAvailableRunner,
    /// Some jobs are still waiting for a runner while others were assigned.
    RunnerCapacity,
    /// Jobs are unknown or all assigned; concurrency groups are a common cause.
    UnknownOrConcurrency,
}

impl QueuedReason
{
    /// Label used in reports.
    pub fn as_str(self,) -> &'static str
    {
        match self {
            Self::NoAvailableRunner => "no_available_runner",
            Self::RunnerCapacity => "runner_capacity",
            Self::UnknownOrConcurrency => "unknown_or_concurrency",
        }
    }
}

impl std::fmt::Display for QueuedReason
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.write_str(self.as_str(),)
    }
}

/// Guesses why `run` is queued from its jobs.
///
/// Returns `None` for runs that are not queued. An empty job list (not
/// fetched, failed, or genuinely empty) yields
/// [`QueuedReason::UnknownOrConcurrency`].
///
/// # Examples
///
/// ```
/// use gha_report::{QueuedReason, WorkflowRun, infer_queued_reason};
///
/// let run: WorkflowRun = serde_json::from_str(r#"{"id": 1, "status": "queued"}"#,)?;
/// assert_eq!(infer_queued_reason(&run, &[],), Some(QueuedReason::UnknownOrConcurrency));
/// # Ok::<(), serde_json::Error>(())
/// ```
pub fn infer_queued_reason(run: &WorkflowRun, jobs: &[WorkflowJob],) -> Option<QueuedReason,>
{
    if run.status.as_deref() != Some("queued",) {
        return None;
    }

    if !jobs.is_empty() {
        if jobs.iter().all(WorkflowJob::is_awaiting_runner,) {
            return Some(QueuedReason::NoAvailableRunner,);
        }
        if jobs.iter().any(WorkflowJob::is_awaiting_runner,) {
            return Some(QueuedReason::RunnerCapacity,);
        }
    }

    Some(QueuedReason::UnknownOrConcurrency,)
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::{QueuedReason, infer_queued_reason};
    use crate::models::{WorkflowJob, WorkflowRun};

    fn run(status: &str,) -> WorkflowRun
    {
        serde_json::from_value(json!({ "id": 100, "status": status }),).expect("valid run",)
    }

    fn job(status: &str, runner: Option<&str,>,) -> WorkflowJob
    {
        serde_json::from_value(json!({ "id": 1, "status": status, "runner_name": runner }),)
            .expect("valid job",)
    }

    #[test]
    fn non_queued_runs_have_no_reason()
    {
        assert_eq!(infer_queued_reason(&run("in_progress",), &[job("queued", None,)],), None);
        assert_eq!(infer_queued_reason(&run("completed",), &[],), None);
    }

    #[test]
    fn all_jobs_without_runner_means_no_runner_available()
    {
        let jobs = [job("queued", None,), job("queued", Some("",),)];
        assert_eq!(
            infer_queued_reason(&run("queued",), &jobs,),
            Some(QueuedReason::NoAvailableRunner)
        );
    }

    #[test]
    fn partially_assigned_jobs_mean_capacity_pressure()
    {
        let jobs = [job("queued", None,), job("in_progress", Some("runner-7",),)];
        assert_eq!(
            infer_queued_reason(&run("queued",), &jobs,),
            Some(QueuedReason::RunnerCapacity)
        );
    }

    #[test]
    fn missing_or_assigned_jobs_fall_back_to_unknown()
    {
        assert_eq!(
            infer_queued_reason(&run("queued",), &[],),
            Some(QueuedReason::UnknownOrConcurrency)
        );
        let jobs = [job("queued", Some("runner-1",),)];
        assert_eq!(
            infer_queued_reason(&run("queued",), &jobs,),
            Some(QueuedReason::UnknownOrConcurrency)
        );
    }

    #[test]
    fn reason_serializes_as_snake_case()
    {
        let json = serde_json::to_string(&QueuedReason::NoAvailableRunner,).expect("serializable",);
        assert_eq!(json, "\"no_available_runner\"");
        assert_eq!(QueuedReason::RunnerCapacity.to_string(), "runner_capacity");
    }
}
