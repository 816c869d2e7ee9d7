//! Command-line interface for the gha-report binary.
//!
//! The CLI writes workflow run reports for a repository list or a single
//! repository, and can print the resolved settings without calling the API.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use gha_report::{
    ActionsClient, BatchOutcome, Error, ReportConfig, ReportPaths, ReportSettings, RepositoryRef,
    SettingsOverrides, init_logging, load_config, load_repository_list, process_repositories,
    process_repository, report_io_error,
};
use serde::Serialize;
use tracing::debug;

/// Command line interface for GitHub Actions workflow run reports.
#[derive(Debug, Parser,)]
#[command(name = "gha-report", version, about = "Report GitHub Actions workflow runs")]
struct Cli
{
    /// Enable debug logging.
    #[arg(long = "verbose", short = 'v', global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Write reports for every repository in a list file.
    Report(ReportArgs,),
    /// Write a report for a single repository.
    Repo(RepoArgs,),
    /// Print the resolved settings and repository list as JSON.
    Plan(PlanArgs,),
}

/// API settings that may come from flags or the environment.
#[derive(Debug, Args, Default,)]
struct ApiArgs
{
    /// REST API base URL, e.g. `https://ghe.example.com/api/v3`.
    #[arg(long = "api-base", env = "API_BASE", value_name = "URL")]
    api_base: Option<String,>,

    /// Runs requested per page (1-100).
    #[arg(long = "per-page", env = "PER_PAGE", value_name = "N")]
    per_page: Option<u32,>,

    /// Maximum number of run pages fetched per repository.
    #[arg(long = "max-pages", env = "MAX_PAGES", value_name = "N")]
    max_pages: Option<u32,>,

    /// Personal access token used for API requests.
    #[arg(long = "token", env = "GITHUB_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    token: Option<String,>,
}

impl ApiArgs
{
    fn overrides(&self, output_dir: Option<PathBuf,>,) -> SettingsOverrides
    {
        SettingsOverrides {
            api_base: self.api_base.clone(),
            per_page: self.per_page,
            max_pages: self.max_pages,
            output_dir,
        }
    }

    fn token(&self,) -> Option<&str,>
    {
        self.token.as_deref().map(str::trim,).filter(|token| !token.is_empty(),)
    }
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `report` subcommand.
struct ReportArgs
{
    /// File listing one `owner/repo` per line.
    #[arg(long = "repos", value_name = "PATH")]
    repos: PathBuf,

    /// Optional YAML configuration file.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// Directory receiving the reports.
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf,>,

    #[command(flatten)]
    api: ApiArgs,
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `repo` subcommand.
struct RepoArgs
{
    /// Repository owner (user or organization).
    #[arg(long = "owner", value_name = "OWNER")]
    owner: String,

    /// Repository name.
    #[arg(long = "repo", value_name = "NAME")]
    repo: String,

    /// Path without extension for the written reports.
    #[arg(long = "out-prefix", value_name = "PREFIX")]
    out_prefix: PathBuf,

    /// Optional YAML configuration file.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    #[command(flatten)]
    api: ApiArgs,
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `plan` subcommand.
struct PlanArgs
{
    /// File listing one `owner/repo` per line.
    #[arg(long = "repos", value_name = "PATH")]
    repos: PathBuf,

    /// Optional YAML configuration file.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,

    #[command(flatten)]
    api: ApiArgs,
}

/// Resolved settings and repositories printed by `plan`.
#[derive(Debug, Serialize,)]
struct Plan<'a,>
{
    settings:     &'a ReportSettings,
    repositories: &'a [RepositoryRef],
}

/// Entry point that reports errors and sets the appropriate exit status.
fn main()
{
    if let Err(error,) = run() {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, API and report writing errors, and reports a
/// batch with failed repositories as an error.
fn run() -> Result<(), Error,>
{
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose,);

    match cli.command {
        Command::Report(args,) => block_on(run_report(args,),),
        Command::Repo(args,) => block_on(run_repo(args,),),
        Command::Plan(args,) => run_plan(&args,),
    }
}

fn block_on<F,>(future: F,) -> Result<(), Error,>
where
    F: std::future::Future<Output = Result<(), Error,>,>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| Error::Runtime {
            source,
        },)?;
    runtime.block_on(future,)
}

fn load_settings(
    config: Option<&Path,>,
    overrides: &SettingsOverrides,
) -> Result<ReportSettings, Error,>
{
    let document = match config {
        Some(path,) => load_config(path,)?,
        None => ReportConfig::default(),
    };
    let settings = document.resolve(overrides,)?;
    debug!("Resolved settings: {:?}", settings);
    Ok(settings,)
}

async fn run_report(args: ReportArgs,) -> Result<(), Error,>
{
    let settings =
        load_settings(args.config.as_deref(), &args.api.overrides(args.output_dir.clone(),),)?;
    let repositories = load_repository_list(&args.repos,)?;
    let client = ActionsClient::new(&settings, args.api.token(),)?;

    let outcome = process_repositories(&client, &settings, &repositories,).await?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_outcome(&mut handle, &outcome,)?;

    ensure_batch_succeeded(&outcome,)
}

async fn run_repo(args: RepoArgs,) -> Result<(), Error,>
{
    let settings = load_settings(args.config.as_deref(), &args.api.overrides(None,),)?;
    let repository = RepositoryRef::new(&args.owner, &args.repo,)?;
    let client = ActionsClient::new(&settings, args.api.token(),)?;

    let (_, report,) =
        process_repository(&client, &settings, &repository, &args.out_prefix,).await?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_paths(&mut handle, &report.paths,)
}

fn run_plan(args: &PlanArgs,) -> Result<(), Error,>
{
    let settings = load_settings(args.config.as_deref(), &args.api.overrides(None,),)?;
    let repositories = load_repository_list(&args.repos,)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_plan(
        &mut handle,
        &Plan {
            settings:     &settings,
            repositories: &repositories,
        },
        args.pretty,
    )
}

fn write_plan<W: Write,>(writer: &mut W, plan: &Plan<'_,>, pretty: bool,) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, plan,)?;
    } else {
        serde_json::to_writer(writer, plan,)?;
    }

    Ok((),)
}

fn write_paths<W: Write,>(writer: &mut W, paths: &ReportPaths,) -> Result<(), Error,>
{
    writeln!(writer, "Wrote: {paths}")
        .map_err(|source| report_io_error(Path::new("<stdout>",), source,),)
}

fn write_outcome<W: Write,>(writer: &mut W, outcome: &BatchOutcome,) -> Result<(), Error,>
{
    for report in &outcome.reports {
        write_paths(writer, &report.paths,)?;
    }
    if let Some(paths,) = &outcome.combined {
        write_paths(writer, paths,)?;
    }
    Ok((),)
}

fn ensure_batch_succeeded(outcome: &BatchOutcome,) -> Result<(), Error,>
{
    if outcome.is_success() {
        return Ok((),);
    }

    let failed: Vec<String,> =
        outcome.failures.iter().map(|failure| failure.repository.to_string(),).collect();
    Err(Error::service(format!(
        "{} of {} repositories failed: {}",
        failed.len(),
        failed.len() + outcome.reports.len(),
        failed.join(", ")
    ),),)
}
