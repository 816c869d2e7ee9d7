// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// GitHub Actions REST client.
///
/// Wraps an [`Octocrab`] instance with the pieces the report needs: API paths
/// resolved against a configurable base URI (GitHub Enterprise included), a
/// request limiter shared by every call, rate-limit sleeps driven by the
/// `X-RateLimit-Reset` header and backoff for transient failures.
use std::{sync::Arc, time::Duration};

use chrono::Utc;
use octocrab::{Octocrab, service::middleware::retry::RetryConfig as TransportRetry};
use serde::{Deserialize, de::DeserializeOwned};
use tokio::{sync::Semaphore, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    config::{RateLimitPolicy, ReportSettings},
    error::Error,
    models::{JobsPage, RunsPage, WorkflowJob, WorkflowRun},
    repos::RepositoryRef,
    retry::{RetryConfig, retry_with_backoff},
};

/// Seconds added to `X-RateLimit-Reset` so the window has surely rolled over.
const RESET_MARGIN_SECS: i64 = 5;
/// Page size used for the jobs endpoint.
const JOBS_PER_PAGE: u32 = 100;

/// Client for the workflow runs and jobs endpoints.
#[derive(Clone,)]
pub struct ActionsClient
{
    octocrab:   Octocrab,
    api_base:   String,
    permits:    Arc<Semaphore,>,
    rate_limit: RateLimitPolicy,
    retry:      RetryConfig,
}

impl std::fmt::Debug for ActionsClient
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("ActionsClient",)
            .field("api_base", &self.api_base,)
            .field("available_permits", &self.permits.available_permits(),)
            .field("rate_limit", &self.rate_limit,)
            .field("retry", &self.retry,)
            .finish_non_exhaustive()
    }
}

#[derive(Debug,)]
struct RawReply
{
    status:      u16,
    reset:       Option<i64,>,
    retry_after: Option<u64,>,
    body:        String,
}

#[derive(Debug, Deserialize,)]
struct ApiMessage
{
    message: String,
}

impl ActionsClient
{
    /// Builds a client from resolved settings.
    ///
    /// # Arguments
    ///
    /// * `settings` - Resolved report settings (API base, limits, timeouts)
    /// * `token` - Optional personal access token; blank tokens are ignored
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] when the underlying HTTP client cannot be
    /// constructed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use gha_report::{ActionsClient, ReportSettings};
    ///
    /// # fn example() -> Result<(), gha_report::Error> {
    /// let token = std::env::var("GITHUB_TOKEN",).ok();
    /// let client = ActionsClient::new(&ReportSettings::default(), token.as_deref(),)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(settings: &ReportSettings, token: Option<&str,>,) -> Result<Self, Error,>
    {
        let mut builder = Octocrab::builder()
            .base_uri(settings.api_base.as_str(),)
            .map_err(|e| {
                Error::service(format!("invalid API base '{}': {e}", settings.api_base),)
            },)?
            .add_retry_config(TransportRetry::None,)
            .set_connect_timeout(Some(settings.timeout(),),)
            .set_read_timeout(Some(settings.timeout(),),);

        if let Some(token,) = token.map(str::trim,).filter(|token| !token.is_empty(),) {
            builder = builder.personal_token(token.to_owned(),);
        } else {
            debug!("No GitHub token configured; using anonymous requests");
        }

        let octocrab = builder.build().map_err(|e| {
            Error::service(format!("failed to initialize GitHub client: {e}"),)
        },)?;

        Ok(Self {
            octocrab,
            api_base: settings.api_base.clone(),
            permits: Arc::new(Semaphore::new(settings.concurrency,),),
            rate_limit: settings.rate_limit,
            retry: settings.retry.clone(),
        },)
    }

    /// Fetches workflow runs for a repository, newest first.
    ///
    /// Pages `1..=max_pages` are requested in order; fetching stops early at
    /// an empty page or one shorter than `per_page`.
    ///
    /// # Errors
    ///
    /// Returns the first request error; runs from earlier pages are
    /// discarded in that case.
    pub async fn fetch_runs(
        &self,
        repository: &RepositoryRef,
        per_page: u32,
        max_pages: u32,
    ) -> Result<Vec<WorkflowRun,>, Error,>
    {
        let mut runs = Vec::new();

        for page in 1..=max_pages {
            let path = format!(
                "/repos/{}/{}/actions/runs?per_page={per_page}&page={page}",
                repository.owner, repository.name
            );
            let body: RunsPage = self.get_json(&path,).await?;
            let count = body.workflow_runs.len();
            if count == 0 {
                break;
            }

            runs.extend(body.workflow_runs,);
            if count < per_page as usize {
                break;
            }
        }

        info!("Fetched {} workflow runs for {}", runs.len(), repository);
        Ok(runs,)
    }

    /// Fetches the jobs of a single workflow run.
    ///
    /// # Errors
    ///
    /// Returns the request error unchanged.
    pub async fn fetch_jobs(
        &self,
        repository: &RepositoryRef,
        run_id: u64,
    ) -> Result<Vec<WorkflowJob,>, Error,>
    {
        let path = format!(
            "/repos/{}/{}/actions/runs/{run_id}/jobs?per_page={JOBS_PER_PAGE}",
            repository.owner, repository.name
        );
        let body: JobsPage = self.get_json(&path,).await?;
        debug!("Fetched {} jobs for run {} of {}", body.jobs.len(), run_id, repository);
        Ok(body.jobs,)
    }

    /// Requests `path` relative to the API base. The absolute URL is only
    /// used in logs and errors.
    async fn get_json<T,>(&self, path: &str,) -> Result<T, Error,>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.api_base);
        retry_with_backoff(&self.retry, &url, || self.get_with_rate_limit::<T,>(path, &url,),)
            .await
    }

    async fn get_with_rate_limit<T,>(&self, path: &str, url: &str,) -> Result<T, Error,>
    where
        T: DeserializeOwned,
    {
        let mut waits = 0;

        loop {
            let reply = self.send(path, url,).await?;

            if is_rate_limited(reply.status, &reply.body,) {
                if waits >= self.rate_limit.max_waits {
                    return Err(Error::RateLimited {
                        url: url.to_owned(),
                        waits,
                    },);
                }

                let wait = rate_limit_wait(
                    reply.reset,
                    reply.retry_after,
                    Utc::now().timestamp(),
                    self.rate_limit.min_wait_secs,
                );
                warn!("Rate limited on {}. Sleeping {}s", url, wait.as_secs());
                sleep(wait,).await;
                waits += 1;
                continue;
            }

            if !(200..300).contains(&reply.status,) {
                return Err(status_error(url, reply.status, &reply.body,),);
            }

            return serde_json::from_str(&reply.body,).map_err(|source| Error::Decode {
                url: url.to_owned(),
                source,
            },);
        }
    }

    async fn send(&self, path: &str, url: &str,) -> Result<RawReply, Error,>
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::service(format!("request limiter closed: {e}"),),)?;

        debug!("GET {}", url);
        let response = self.octocrab._get(path,).await.map_err(|source| Error::Transport {
            url: url.to_owned(),
            source,
        },)?;

        let status = response.status().as_u16();
        let header = |name: &str| {
            response
                .headers()
                .get(name,)
                .and_then(|value| value.to_str().ok(),)
                .map(|value| value.trim().to_owned(),)
        };
        let reset = header("x-ratelimit-reset",).and_then(|value| value.parse::<i64,>().ok(),);
        let retry_after = header("retry-after",).and_then(|value| value.parse::<u64,>().ok(),);

        let body = self.octocrab.body_to_string(response,).await.map_err(|source| {
            Error::Transport {
                url: url.to_owned(),
                source,
            }
        },)?;

        Ok(RawReply {
            status,
            reset,
            retry_after,
            body,
        },)
    }
}

/// Reports whether a response is GitHub's primary or secondary rate limit.
///
/// 429 always is; 403 only when the body mentions the rate limit, since 403
/// also signals missing permissions.
pub fn is_rate_limited(status: u16, body: &str,) -> bool
{
    status == 429 || (status == 403 && body.to_ascii_lowercase().contains("rate limit",))
}

/// Computes how long to sleep after a rate-limit response.
///
/// # Arguments
///
/// * `reset` - `X-RateLimit-Reset` as epoch seconds, when present
/// * `retry_after` - `Retry-After` in seconds, used when `reset` is absent
/// * `now` - Current epoch seconds
/// * `min_wait_secs` - Lower bound applied to every wait
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use gha_report::rate_limit_wait;
///
/// assert_eq!(rate_limit_wait(Some(1_060,), None, 1_000, 5,), Duration::from_secs(65));
/// assert_eq!(rate_limit_wait(Some(900,), None, 1_000, 5,), Duration::from_secs(5));
/// ```
pub fn rate_limit_wait(
    reset: Option<i64,>,
    retry_after: Option<u64,>,
    now: i64,
    min_wait_secs: u64,
) -> Duration
{
    let secs = match (reset, retry_after,) {
        (Some(reset,), _,) => {
            u64::try_from(reset.saturating_sub(now,).saturating_add(RESET_MARGIN_SECS,),)
                .unwrap_or(0,)
        }
        (None, Some(after,),) => after,
        (None, None,) => 0,
    };
    Duration::from_secs(secs.max(min_wait_secs,),)
}

fn status_error(url: &str, status: u16, body: &str,) -> Error
{
    let message = serde_json::from_str::<ApiMessage,>(body,)
        .map(|parsed| parsed.message,)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_owned()
            } else {
                trimmed.chars().take(200,).collect()
            }
        },);

    match status {
        401 | 403 => Error::Unauthorized {
            url: url.to_owned(),
            status,
            message,
        },
        _ => Error::Http {
            url: url.to_owned(),
            status,
            message,
        },
    }
}
