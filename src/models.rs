// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Records returned by the GitHub Actions REST endpoints.
///
/// Only the fields the reports use are typed. Jobs keep every other field in
/// [`WorkflowJob::extra`] so the JSON report carries them through unchanged.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope of `GET /repos/{owner}/{repo}/actions/runs`.
#[derive(Debug, Clone, Default, Deserialize,)]
pub struct RunsPage
{
    #[serde(default)]
    pub total_count:   Option<u64,>,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun,>,
}

/// Envelope of `GET /repos/{owner}/{repo}/actions/runs/{run_id}/jobs`.
#[derive(Debug, Clone, Default, Deserialize,)]
pub struct JobsPage
{
    #[serde(default)]
    pub total_count: Option<u64,>,
    #[serde(default)]
    pub jobs:        Vec<WorkflowJob,>,
}

/// Single execution of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct WorkflowRun
{
    pub id:             u64,
    pub name:           Option<String,>,
    pub workflow_id:    Option<u64,>,
    pub head_branch:    Option<String,>,
    pub head_sha:       Option<String,>,
    pub event:          Option<String,>,
    pub status:         Option<String,>,
    pub conclusion:     Option<String,>,
    pub created_at:     Option<String,>,
    pub run_started_at: Option<String,>,
    pub updated_at:     Option<String,>,
    pub actor:          Option<Actor,>,
    pub html_url:       Option<String,>,
}

impl WorkflowRun
{
    /// Login of the user that triggered the run.
    pub fn actor_login(&self,) -> Option<&str,>
    {
        self.actor.as_ref().map(|actor| actor.login.as_str(),)
    }
}

/// GitHub account attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Actor
{
    pub login: String,
}

/// Unit of work within a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct WorkflowJob
{
    pub id:                u64,
    #[serde(default)]
    pub run_id:            Option<u64,>,
    #[serde(default)]
    pub name:              Option<String,>,
    #[serde(default)]
    pub status:            Option<String,>,
    #[serde(default)]
    pub conclusion:        Option<String,>,
    #[serde(default)]
    pub started_at:        Option<String,>,
    #[serde(default)]
    pub completed_at:      Option<String,>,
    #[serde(default)]
    pub runner_name:       Option<String,>,
    #[serde(default)]
    pub runner_group_name: Option<String,>,
    #[serde(default)]
    pub labels:            Vec<String,>,
    #[serde(default)]
    pub html_url:          Option<String,>,
    /// Remaining fields exactly as the API returned them.
    #[serde(flatten)]
    pub extra:             Map<String, Value,>,
}

impl WorkflowJob
{
    /// A job is waiting for a runner when it is queued and no runner has
    /// picked it up yet. An empty runner name counts as no runner.
    pub fn is_awaiting_runner(&self,) -> bool
    {
        self.status.as_deref() == Some("queued",)
            && self.runner_name.as_deref().is_none_or(str::is_empty,)
    }
}
