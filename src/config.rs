//! Configuration document describing how reports are fetched and written.
//!
//! The YAML document keeps every value optional so that a minimal (or empty)
//! file is valid. [`ReportConfig::resolve`] layers command-line and
//! environment overrides on top and produces [`ReportSettings`], the
//! validated values the client and pipeline consume.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Error},
    retry::RetryConfig,
};

/// API endpoint used when neither the flag, `API_BASE` nor YAML set one.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_PER_PAGE: u32 = 100;
/// Upper bound GitHub accepts for `per_page`.
const MAX_PER_PAGE: u32 = 100;
const DEFAULT_MAX_PAGES: u32 = 3;
const DEFAULT_OUTPUT_DIR: &str = "reports";
const DEFAULT_CONCURRENCY: usize = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUEUED_PREVIEW_LIMIT: usize = 200;
const DEFAULT_DETAIL_STATUSES: &[&str] = &["queued", "in_progress"];
const DEFAULT_RATE_LIMIT_MIN_WAIT_SECS: u64 = 5;
const DEFAULT_RATE_LIMIT_MAX_WAITS: u32 = 5;

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use gha_report::ReportConfig;
///
/// let yaml = r#"
/// api_base: https://ghe.example.com/api/v3
/// per_page: 50
/// detail_statuses: [queued]
/// "#;
/// let config: ReportConfig = serde_yaml::from_str(yaml,).expect("valid configuration",);
/// assert_eq!(config.per_page, Some(50));
/// ```
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq,)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig
{
    /// REST API base URL, e.g. `https://ghe.example.com/api/v3`.
    #[serde(default, alias = "api-base")]
    pub api_base: Option<String,>,

    /// Number of workflow runs requested per page.
    #[serde(default, alias = "per-page")]
    pub per_page: Option<u32,>,

    /// Maximum number of run pages fetched per repository.
    #[serde(default, alias = "max-pages")]
    pub max_pages: Option<u32,>,

    /// Directory receiving batch reports.
    #[serde(default, alias = "output-dir")]
    pub output_dir: Option<PathBuf,>,

    /// Maximum number of in-flight API requests.
    #[serde(default)]
    pub concurrency: Option<usize,>,

    /// Connect and read timeout applied to each request.
    #[serde(default)]
    pub timeout_secs: Option<u64,>,

    /// Number of queued runs listed in the HTML report.
    #[serde(default)]
    pub queued_preview_limit: Option<usize,>,

    /// Run statuses for which jobs are fetched.
    #[serde(default)]
    pub detail_statuses: Option<Vec<String,>,>,

    /// Whether batch mode also writes a report covering every repository.
    #[serde(default)]
    pub combined_report: Option<bool,>,

    /// Behaviour when the API answers with a rate-limit response.
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,

    /// Backoff applied to transient failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Rate-limit handling knobs.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq,)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitPolicy
{
    /// Lower bound on every rate-limit sleep, in seconds.
    pub min_wait_secs: u64,
    /// Number of rate-limit sleeps allowed for one request before failing.
    pub max_waits:     u32,
}

impl Default for RateLimitPolicy
{
    fn default() -> Self
    {
        Self {
            min_wait_secs: DEFAULT_RATE_LIMIT_MIN_WAIT_SECS,
            max_waits:     DEFAULT_RATE_LIMIT_MAX_WAITS,
        }
    }
}

/// Values supplied on the command line or through environment variables.
///
/// Each populated field wins over the YAML document.
#[derive(Debug, Default, Clone, PartialEq, Eq,)]
pub struct SettingsOverrides
{
    /// Override for [`ReportConfig::api_base`] (`--api-base` / `API_BASE`).
    pub api_base:   Option<String,>,
    /// Override for [`ReportConfig::per_page`] (`--per-page` / `PER_PAGE`).
    pub per_page:   Option<u32,>,
    /// Override for [`ReportConfig::max_pages`] (`--max-pages` / `MAX_PAGES`).
    pub max_pages:  Option<u32,>,
    /// Override for [`ReportConfig::output_dir`] (`--output-dir`).
    pub output_dir: Option<PathBuf,>,
}

/// Fully resolved settings used by the client and the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize,)]
pub struct ReportSettings
{
    /// REST API base URL without a trailing slash.
    pub api_base:             String,
    /// Runs per page, within `1..=100`.
    pub per_page:             u32,
    /// Maximum number of run pages per repository.
    pub max_pages:            u32,
    /// Directory receiving batch reports.
    pub output_dir:           PathBuf,
    /// Maximum number of in-flight requests.
    pub concurrency:          usize,
    /// Per-request timeout in seconds.
    pub timeout_secs:         u64,
    /// Number of queued runs listed in the HTML report.
    pub queued_preview_limit: usize,
    /// Run statuses for which jobs are fetched.
    pub detail_statuses:      Vec<String,>,
    /// Whether batch mode writes a combined report.
    pub combined_report:      bool,
    /// Rate-limit handling.
    pub rate_limit:           RateLimitPolicy,
    /// Transient failure retry policy.
    pub retry:                RetryConfig,
}

impl Default for ReportSettings
{
    fn default() -> Self
    {
        Self {
            api_base:             DEFAULT_API_BASE.to_owned(),
            per_page:             DEFAULT_PER_PAGE,
            max_pages:            DEFAULT_MAX_PAGES,
            output_dir:           PathBuf::from(DEFAULT_OUTPUT_DIR,),
            concurrency:          DEFAULT_CONCURRENCY,
            timeout_secs:         DEFAULT_TIMEOUT_SECS,
            queued_preview_limit: DEFAULT_QUEUED_PREVIEW_LIMIT,
            detail_statuses:      default_detail_statuses(),
            combined_report:      true,
            rate_limit:           RateLimitPolicy::default(),
            retry:                RetryConfig::default(),
        }
    }
}

impl ReportSettings
{
    /// Timeout applied to connecting and reading each response.
    pub fn timeout(&self,) -> Duration
    {
        Duration::from_secs(self.timeout_secs,)
    }

    /// Whether jobs should be fetched for a run with the given status.
    pub fn wants_jobs(&self, status: Option<&str,>,) -> bool
    {
        status.is_some_and(|status| self.detail_statuses.iter().any(|wanted| wanted == status,),)
    }
}

impl ReportConfig
{
    /// Merges overrides into the document and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a value falls outside its allowed
    /// range or the API base is not an HTTP(S) URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use gha_report::{ReportConfig, SettingsOverrides};
    ///
    /// let config = ReportConfig {
    ///     per_page: Some(20,), ..ReportConfig::default()
    /// };
    /// let overrides = SettingsOverrides {
    ///     per_page: Some(50,), ..SettingsOverrides::default()
    /// };
    /// let settings = config.resolve(&overrides,)?;
    /// assert_eq!(settings.per_page, 50);
    /// assert_eq!(settings.api_base, "https://api.github.com");
    /// # Ok::<(), gha_report::Error>(())
    /// ```
    pub fn resolve(&self, overrides: &SettingsOverrides,) -> Result<ReportSettings, Error,>
    {
        let api_base = normalize_api_base(
            overrides
                .api_base
                .as_deref()
                .or(self.api_base.as_deref(),)
                .unwrap_or(DEFAULT_API_BASE,),
        )?;

        let per_page = overrides.per_page.or(self.per_page,).unwrap_or(DEFAULT_PER_PAGE,);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(Error::validation(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}, got {per_page}"
            ),),);
        }

        let max_pages = overrides.max_pages.or(self.max_pages,).unwrap_or(DEFAULT_MAX_PAGES,);
        if max_pages == 0 {
            return Err(Error::validation("max_pages must be at least 1",),);
        }

        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY,);
        if concurrency == 0 {
            return Err(Error::validation("concurrency must be at least 1",),);
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS,);
        if timeout_secs == 0 {
            return Err(Error::validation("timeout_secs must be at least 1",),);
        }

        let detail_statuses = match self.detail_statuses.as_ref() {
            Some(statuses,) => normalize_statuses(statuses,)?,
            None => default_detail_statuses(),
        };

        self.retry.validate()?;

        let output_dir = overrides
            .output_dir
            .clone()
            .or_else(|| self.output_dir.clone(),)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR,),);
        if output_dir.as_os_str().is_empty() {
            return Err(Error::validation("output_dir must not be empty",),);
        }

        Ok(ReportSettings {
            api_base,
            per_page,
            max_pages,
            output_dir,
            concurrency,
            timeout_secs,
            queued_preview_limit: self
                .queued_preview_limit
                .unwrap_or(DEFAULT_QUEUED_PREVIEW_LIMIT,),
            detail_statuses,
            combined_report: self.combined_report.unwrap_or(true,),
            rate_limit: self.rate_limit,
            retry: self.retry.clone(),
        },)
    }
}

/// Loads the configuration document from a YAML file.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Parse`]
/// when it is not a valid configuration document.
pub fn load_config(path: &Path,) -> Result<ReportConfig, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_config(&contents,)
}

/// Parses the configuration document from a YAML string.
///
/// Blank documents (including comment-only files) yield the defaults.
///
/// # Errors
///
/// Propagates [`Error::Parse`] when the YAML cannot be decoded.
pub fn parse_config(contents: &str,) -> Result<ReportConfig, Error,>
{
    let has_content = contents.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#',) && trimmed != "---"
    },);
    if !has_content {
        return Ok(ReportConfig::default(),);
    }

    Ok(serde_yaml::from_str(contents,)?,)
}

fn default_detail_statuses() -> Vec<String,>
{
    DEFAULT_DETAIL_STATUSES.iter().map(|status| (*status).to_owned(),).collect()
}

fn normalize_api_base(input: &str,) -> Result<String, Error,>
{
    let trimmed = input.trim().trim_end_matches('/',);
    if trimmed.is_empty() {
        return Err(Error::validation("api_base must not be empty",),);
    }
    if !(trimmed.starts_with("https://",) || trimmed.starts_with("http://",)) {
        return Err(Error::validation(format!(
            "api_base must start with http:// or https://, got '{trimmed}'"
        ),),);
    }
    Ok(trimmed.to_owned(),)
}

fn normalize_statuses(statuses: &[String],) -> Result<Vec<String,>, Error,>
{
    let mut normalized: Vec<String,> = Vec::with_capacity(statuses.len(),);
    for status in statuses {
        let trimmed = status.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("detail_statuses must not contain empty entries",),);
        }
        let lowered = trimmed.to_ascii_lowercase();
        if !normalized.contains(&lowered,) {
            normalized.push(lowered,);
        }
    }
    Ok(normalized,)
}
