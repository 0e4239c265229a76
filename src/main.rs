use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use br_core::HostAddr;
use br_orchestrator::{
    BackupConfig, BackupOrchestrator, CleanupConfig, CleanupOrchestrator, CommonConfig,
    RestoreConfig, RestoreOrchestrator, ShowConfig, ShowOrchestrator,
};
use br_store::S3Flags;

const VER_NAME: &str = "nebula-br";
const VER_MAJOR: u32 = 0;
const VER_MINOR: u32 = 1;
const VER_PATCH: u32 = 0;

/// Nebula br is a Nebula backup and restore tool.
#[derive(Debug, Parser)]
#[command(name = "nebula-br", version, about = "Nebula br is a Nebula backup and restore tool")]
struct Cli {
    /// Specify br detail log path
    #[arg(long = "log", global = true, default_value = "br.log")]
    log_path: PathBuf,

    /// Output log in debug level or not
    #[arg(long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// backup Nebula Graph Database
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
    /// restore Nebula Graph Database
    Restore {
        #[command(subcommand)]
        action: RestoreAction,
    },
    /// [EXPERIMENTAL] clean up temporary files left behind by a backup
    Cleanup(CleanupArgs),
    /// show backup info
    Show(ShowArgs),
    /// print the version of nebula br tool
    Version,
}

#[derive(Debug, Subcommand)]
enum BackupAction {
    /// full backup Nebula Graph Database
    Full(BackupArgs),
}

#[derive(Debug, Subcommand)]
enum RestoreAction {
    /// full restore Nebula Graph Database
    Full(RestoreArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Specify meta server
    #[arg(long = "meta")]
    meta: HostAddr,

    /// Specify storage path (a `local://` or `s3://` URI)
    #[arg(long = "storage")]
    storage: String,

    #[command(flatten)]
    s3: S3Args,
}

#[derive(Debug, Args)]
struct S3Args {
    #[arg(long = "s3.endpoint")]
    endpoint: Option<String>,

    #[arg(long = "s3.region")]
    region: Option<String>,

    #[arg(long = "s3.access_key")]
    access_key: Option<String>,

    #[arg(long = "s3.secret_key")]
    secret_key: Option<String>,
}

impl From<S3Args> for S3Flags {
    fn from(args: S3Args) -> Self {
        S3Flags {
            endpoint: args.endpoint,
            region: args.region,
            access_key: args.access_key,
            secret_key: args.secret_key,
        }
    }
}

#[derive(Debug, Args)]
struct BackupArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// (EXPERIMENTAL) space names. If not specified, backs up all spaces.
    #[arg(long = "spaces")]
    spaces: Vec<String>,
}

#[derive(Debug, Args)]
struct RestoreArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Specify backup name
    #[arg(long = "name")]
    name: String,
}

#[derive(Debug, Args)]
struct CleanupArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// backup name
    #[arg(long = "backup_name")]
    backup_name: String,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Specify storage path (a `local://` or `s3://` URI)
    #[arg(long = "storage")]
    storage: String,

    #[command(flatten)]
    s3: S3Args,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(&cli.log_path, cli.debug) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_path: &PathBuf, debug: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false));
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install global tracing subscriber")?;

    Ok(guard)
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Backup { action: BackupAction::Full(args) } => run_backup(args).await,
        Command::Restore { action: RestoreAction::Full(args) } => run_restore(args).await,
        Command::Cleanup(args) => run_cleanup(args).await,
        Command::Show(args) => run_show(args).await,
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

fn print_version() {
    let git_sha = option_env!("NEBULA_BR_GIT_SHA").unwrap_or("unknown");
    let git_ref = option_env!("NEBULA_BR_GIT_REF").unwrap_or("unknown");
    println!(
        "{VER_NAME},V-{VER_MAJOR}.{VER_MINOR}.{VER_PATCH}\n   GitSha: {git_sha}\n   GitRef: {git_ref}\nplease run \"help\" subcommand for more infomation."
    );
}

async fn run_backup(args: BackupArgs) -> Result<()> {
    let config = BackupConfig {
        common: CommonConfig {
            meta_addr: args.common.meta,
            store_uri: args.common.storage,
            s3_flags: args.common.s3.into(),
        },
        spaces: args.spaces,
    };

    let orchestrator = BackupOrchestrator::connect(&config).await?;
    let outcome = orchestrator.run().await;
    match outcome.result {
        Ok(()) => {
            println!("backup successed");
            Ok(())
        }
        Err(err) => {
            if let Some(name) = outcome.backup_name {
                tracing::warn!(backup = %name, "backup failed, run cleanup to remove partial artifacts");
            }
            Err(err.into())
        }
    }
}

async fn run_restore(args: RestoreArgs) -> Result<()> {
    let config = RestoreConfig {
        common: CommonConfig {
            meta_addr: args.common.meta,
            store_uri: args.common.storage,
            s3_flags: args.common.s3.into(),
        },
        backup_name: args.name,
    };

    let orchestrator = RestoreOrchestrator::connect(&config).await?;
    orchestrator.run().await?;
    println!("restore successed");
    Ok(())
}

async fn run_cleanup(args: CleanupArgs) -> Result<()> {
    let config = CleanupConfig {
        common: CommonConfig {
            meta_addr: args.common.meta,
            store_uri: args.common.storage,
            s3_flags: args.common.s3.into(),
        },
        backup_name: args.backup_name,
    };

    let orchestrator = CleanupOrchestrator::connect(&config).await?;
    orchestrator.run().await?;
    println!("cleanup successed");
    Ok(())
}

async fn run_show(args: ShowArgs) -> Result<()> {
    let config = ShowConfig {
        store_uri: args.storage,
        s3_flags: args.s3.into(),
    };

    let orchestrator = ShowOrchestrator::connect(&config).await?;
    let table = orchestrator.run().await?;
    println!("{table}");
    Ok(())
}
