use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use clockdefaults_core::api::{
    Client, ClientError, GetProjectParams, GetProjectsParams, GetTagsParams, GetTasksParams,
    Project, Tag, Task,
};
use clockdefaults_core::catalog::CatalogClient;
use clockdefaults_core::config::{load_config, load_global_config, ToolConfig};
use clockdefaults_core::defaults::{DefaultsStore, DirectoryDefaults, ScanParam, DEFAULT_FILENAME};
use clockdefaults_core::entry::DefaultTimeEntry;
use clockdefaults_core::reconcile::{Overrides, Passthrough, Reconciler};
use clockdefaults_render::{report, ReportFormat};

#[derive(Parser)]
#[command(
    name = "clockdefaults",
    version,
    about = "Per-directory defaults for new time entries"
)]
struct Cli {
    /// Directory to start looking for the defaults file (default: current dir)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Base name of the defaults file, without extension
    #[arg(long, global = true)]
    filename: Option<String>,
    /// Tool configuration file (default: $CLOCKDEFAULTS_HOME/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sets the default parameters for the current folder
    #[command(long_about = format!(
        "Sets the default parameters for the current folder\n\
         The parameters are saved in the target directory in the file {}.yaml, \
         or in the defaults file already present there",
        DEFAULT_FILENAME
    ))]
    Set(SetArgs),
    /// Shows the defaults that apply to the current folder
    Show {
        /// text, json or yaml
        #[arg(long, default_value = "text")]
        format: ReportFormat,
    },
    /// Print version information
    Version,
}

#[derive(Args)]
struct SetArgs {
    /// Time entry should be billable by default
    #[arg(short = 'b', long, conflicts_with = "not_billable")]
    billable: bool,
    /// Time entry should not be billable by default
    #[arg(short = 'n', long = "not-billable")]
    not_billable: bool,
    /// Default task
    #[arg(long)]
    task: Option<String>,
    /// Project to use by default
    #[arg(short = 'p', long)]
    project: Option<String>,
    /// Tags to use by default (repeatable, or comma separated)
    #[arg(short = 'T', long = "tag", value_delimiter = ',')]
    tags: Option<Vec<String>>,
    /// Default description
    #[arg(short = 'd', long)]
    description: Option<String>,
    /// Workspace id
    #[arg(long, env = "CLOCKDEFAULTS_WORKSPACE")]
    workspace: Option<String>,
    /// Workspace snapshot used to look up projects, tasks and tags
    #[arg(long, env = "CLOCKDEFAULTS_CATALOG")]
    catalog: Option<PathBuf>,
    /// Accept names in place of ids for project, task and tags
    #[arg(long)]
    allow_name_for_id: bool,
    /// Tolerate failed name lookups and ask instead
    #[arg(long)]
    interactive: bool,
    /// Name lookups for tags include archived tags
    #[arg(long)]
    allow_archived_tags: bool,
    /// text, json or yaml
    #[arg(long, default_value = "text")]
    format: ReportFormat,
}

/// Used when no catalog is configured.
struct NoService;

impl NoService {
    fn unavailable<T>() -> Result<T, ClientError> {
        Err(ClientError::Remote(
            "no lookup service configured; pass --catalog or set `catalog` in the config"
                .to_string(),
        ))
    }
}

impl Client for NoService {
    fn get_project(&self, _params: &GetProjectParams) -> Result<Project, ClientError> {
        Self::unavailable()
    }

    fn get_projects(&self, _params: &GetProjectsParams) -> Result<Vec<Project>, ClientError> {
        Self::unavailable()
    }

    fn get_tasks(&self, _params: &GetTasksParams) -> Result<Vec<Task>, ClientError> {
        Self::unavailable()
    }

    fn get_tags(&self, _params: &GetTagsParams) -> Result<Vec<Tag>, ClientError> {
        Self::unavailable()
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("CLOCKDEFAULTS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_global_config()?,
    };
    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let filename = cli
        .filename
        .or_else(|| config.defaults_filename.clone())
        .unwrap_or_default();
    let store = DirectoryDefaults::new(ScanParam::new(dir).with_filename(filename));
    debug!(scan = ?store.scan_param(), "defaults store ready");

    match cli.command {
        Some(Command::Set(args)) => run_set(args, config, &store)?,
        Some(Command::Show { format }) => run_show(format, &store)?,
        Some(Command::Version) => {
            println!("clockdefaults {}", clockdefaults_core::version());
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }
    Ok(())
}

fn run_set(args: SetArgs, mut config: ToolConfig, store: &dyn DefaultsStore) -> Result<()> {
    let overrides = Overrides {
        project: args.project,
        task: args.task,
        tags: args.tags,
        description: args.description,
        billable: None,
    }
    .with_billable_flags(args.billable, args.not_billable)?;

    if args.workspace.is_some() {
        config.workspace = args.workspace;
    }
    if args.catalog.is_some() {
        config.catalog = args.catalog;
    }
    config.allow_name_for_id |= args.allow_name_for_id;
    config.interactive |= args.interactive;
    config.allow_archived_tags |= args.allow_archived_tags;

    let client: Box<dyn Client> = match &config.catalog {
        Some(path) => Box::new(CatalogClient::new(path)),
        None => Box::new(NoService),
    };
    let reconciler = Reconciler {
        store,
        workspace: &config,
        client: client.as_ref(),
        prompt: &Passthrough,
        settings: config.settings(),
    };
    let entry = reconciler.set(&overrides)?;
    report(args.format, std::io::stdout().lock(), &entry)?;
    Ok(())
}

fn run_show(format: ReportFormat, store: &dyn DefaultsStore) -> Result<()> {
    let entry = match store.read() {
        Ok(entry) => entry,
        Err(err) if err.is_not_found() => DefaultTimeEntry::default(),
        Err(err) => return Err(err.into()),
    };
    report(format, std::io::stdout().lock(), &entry)?;
    Ok(())
}
