use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use provkit::cloud::auth::{validate_region, Credentials};
use provkit::cloud::client::CloudClient;
use provkit::config::Config;
use provkit::context::OperationContext;
use provkit::error::{is_not_found, not_found_reason};
use provkit::resource::{
    extract_json_value, reconcile, EntryReport, Manifest, Mode, Outcome, ReconcileSettings,
    Registry,
};
use provkit::tags::TagService;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Exit code when the requested resource does not exist
const EXIT_NOT_FOUND: u8 = 2;

/// Resource lookup and tag reconciliation for a JSON cloud control plane
#[derive(Parser, Debug)]
#[command(name = "provkit", version = provkit::VERSION, about, long_about = None)]
struct Args {
    /// Control-plane endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Region to operate in
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Run in read-only mode (block all write operations)
    #[arg(long, global = true)]
    readonly: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered resource types
    Resources {
        /// Only show this service package
        #[arg(long)]
        service: Option<String>,
    },
    /// List every resource of a type
    List {
        #[arg(value_name = "TYPE")]
        type_name: String,
    },
    /// Print the resource with the given id
    Find {
        #[arg(value_name = "TYPE")]
        type_name: String,
        id: String,
        /// Match on the name field instead; the name must be unique
        #[arg(long)]
        by_name: bool,
    },
    /// Print a resource's tags
    Tags {
        #[arg(value_name = "TYPE")]
        type_name: String,
        id: String,
        /// Hide tags that only carry the configured default tags
        #[arg(long)]
        exclude_defaults: bool,
    },
    /// Show the tag changes a manifest would make
    Plan {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Reconcile tags to match a manifest
    Apply {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("provkit {} started with log level: {:?}", provkit::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("provkit").join("provkit.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".provkit").join("provkit.log");
    }
    PathBuf::from("provkit.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {:#}", err);
            None
        },
    };

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("command failed: {:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let registry = Registry::load()?;

    if let Command::Resources { service } = &args.command {
        print_resources(&registry, service.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let client = connect(&args, &config)?;
    let ctx = |operation: String| OperationContext::new(operation).with_timeout(config.request_timeout());

    match &args.command {
        Command::Resources { .. } => Ok(ExitCode::SUCCESS),
        Command::List { type_name } => {
            let bound = registry
                .bind(type_name, &client)?
                .with_page_size(config.effective_page_size());
            let items = bound.list(&ctx(format!("list {}", type_name))).await?;
            let def = bound.def();
            for item in &items {
                println!(
                    "{}\t{}",
                    extract_json_value(item, &def.id_field),
                    extract_json_value(item, &def.name_field)
                );
            }
            tracing::info!(resource_type = %type_name, count = items.len(), "listed resources");
            Ok(ExitCode::SUCCESS)
        },
        Command::Find {
            type_name,
            id,
            by_name,
        } => {
            let bound = registry
                .bind(type_name, &client)?
                .with_page_size(config.effective_page_size());
            let ctx = ctx(format!("find {}", type_name));
            let result = if *by_name {
                bound.find_by_name(&ctx, id).await
            } else {
                bound.describe(&ctx, id).await
            };
            match result {
                Ok(item) => {
                    println!("{}", serde_json::to_string_pretty(&item)?);
                    Ok(ExitCode::SUCCESS)
                },
                Err(err) if is_not_found(&err) => Ok(report_not_found(type_name, id, &err)),
                Err(err) => Err(err),
            }
        },
        Command::Tags {
            type_name,
            id,
            exclude_defaults,
        } => {
            let bound = registry
                .bind(type_name, &client)?
                .with_page_size(config.effective_page_size());
            let ctx = ctx(format!("tags {}", type_name));
            let item = match bound.describe(&ctx, id).await {
                Ok(item) => item,
                Err(err) if is_not_found(&err) => return Ok(report_not_found(type_name, id, &err)),
                Err(err) => return Err(err),
            };
            let identifier = bound.tag_identifier(&item)?;
            let mut tags = bound
                .tagger()?
                .list_tags(&ctx, &identifier)
                .await
                .with_context(|| format!("listing tags for resource ({})", identifier))?
                .ignore_system()
                .ignore(&config.ignore_tags);
            if *exclude_defaults {
                tags = tags.remove_defaults(&config.default_tags);
            }
            for (key, value) in tags.as_map() {
                println!("{}={}", key, value);
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::Plan { file } => {
            run_manifest(&registry, &client, &config, file, Mode::Plan, ctx("plan".to_string())).await
        },
        Command::Apply { file } => {
            if args.readonly {
                bail!("apply is not allowed in read-only mode");
            }
            run_manifest(&registry, &client, &config, file, Mode::Apply, ctx("apply".to_string())).await
        },
    }
}

fn report_not_found(type_name: &str, id: &str, err: &anyhow::Error) -> ExitCode {
    match not_found_reason(err) {
        Some(reason) => eprintln!("{} ({}) not found: {}", type_name, id, reason),
        None => eprintln!("{} ({}) not found", type_name, id),
    }
    ExitCode::from(EXIT_NOT_FOUND)
}

fn connect(args: &Args, config: &Config) -> Result<CloudClient> {
    let endpoint = config.effective_endpoint(args.endpoint.as_deref());
    let region = config.effective_region(args.region.as_deref());
    if !validate_region(&region) {
        bail!("Invalid region: {}", region);
    }

    let credentials = Credentials::resolve(config.token.as_deref());
    tracing::info!(
        endpoint = %endpoint,
        region = %region,
        credentials = ?credentials.source(),
        "connecting"
    );
    CloudClient::new(&endpoint, &region, credentials)
}

fn print_resources(registry: &Registry, service: Option<&str>) {
    for package in registry.services() {
        if service.is_some_and(|s| s != package.name) {
            continue;
        }
        println!("{}", package.name);
        for def in package.resources.iter().chain(package.data_sources.iter()) {
            let tagging = if def.supports_tags() { "tags" } else { "-" };
            println!(
                "  {:<40} {:<12} {:<5} {}",
                def.type_name,
                def.kind.as_str(),
                tagging,
                def.display_name
            );
        }
    }
}

async fn run_manifest(
    registry: &Registry,
    client: &CloudClient,
    config: &Config,
    file: &Path,
    mode: Mode,
    ctx: OperationContext,
) -> Result<ExitCode> {
    let manifest = Manifest::load(file, registry)?;
    let settings = ReconcileSettings {
        default_tags: config.default_tags.clone(),
        ignore_tags: config.ignore_tags.clone(),
        page_size: config.effective_page_size(),
        concurrency: config.effective_concurrency(),
    };

    let reports = reconcile(registry, client, &ctx, &manifest, &settings, mode).await;
    for report in &reports {
        print_report(report, mode);
    }

    if reports.iter().any(EntryReport::is_failure) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &EntryReport, mode: Mode) {
    let target = format!("{} ({})", report.type_name, report.id);
    match &report.outcome {
        Outcome::Unchanged => println!("{}: up to date", target),
        Outcome::Missing => println!("{}: not found", target),
        Outcome::Failed { error } => println!("{}: failed: {}", target, error),
        Outcome::Changed(diff) => {
            let verb = match mode {
                Mode::Plan => "would change",
                Mode::Apply => "changed",
            };
            println!("{}: {} {} tag(s)", target, verb, diff.change_count());
            for key in &diff.to_remove {
                println!("  - {}", key);
            }
            for (key, value) in &diff.to_upsert {
                println!("  + {} = {}", key, value);
            }
        },
    }
}
