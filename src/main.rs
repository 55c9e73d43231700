//! cci-tasks CLI

mod cli;

use anyhow::Context;
use cci_tasks::upload::{DEFAULT_MERGES, DEFAULT_REMOTE, PackageSelection, UploadOptions, default_jobs};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "cci-tasks",
    version,
    about = "Merge automation and recipe uploads for a Conan Center Index fork"
)]
struct Cli {
    /// Path to the repository (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Export and upload recipes to a Conan remote
    UploadRecipes(UploadArgs),
    /// Merge conan-io/conan-center-index into the fork, or open a pull request on conflicts
    ///
    /// To make a file always keep the local version in a merge, add it to
    /// .gitattributes-merge with the attribute merge=ours.
    MergeUpstream,
    /// Merge the staging branch into the production branch
    MergeStagingToProduction,
    /// Conan helper commands
    Conan {
        #[command(subcommand)]
        command: ConanCommands,
    },
    /// GNU target triplet conversions
    Triplet {
        #[command(subcommand)]
        command: TripletCommands,
    },
}

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
struct UploadArgs {
    /// Remote to upload to
    #[arg(long, default_value = DEFAULT_REMOTE)]
    remote: String,

    /// Name of a package to upload (repeatable)
    #[arg(long = "package", value_name = "PACKAGE")]
    packages: Vec<String>,

    /// Upload all packages in the recipes folder
    #[arg(long)]
    all: bool,

    /// Upload packages changed since COMMIT
    #[arg(long, value_name = "COMMIT")]
    since_commit: Option<String>,

    /// Upload packages changed since just before the most recent merge
    #[arg(long)]
    since_before_last_merge: bool,

    /// Upload packages changed since a merge from BRANCH
    #[arg(long, value_name = "BRANCH")]
    since_merge_from_branch: Option<String>,

    /// Number of merges to look back for --since-merge-from-branch
    #[arg(long, default_value_t = DEFAULT_MERGES)]
    merges: usize,

    /// Upload one package at a time
    #[arg(long)]
    no_parallel: bool,

    /// Only export the recipes
    #[arg(long)]
    no_upload: bool,

    /// Concurrent uploads (default: CPUs + 4, at most 32)
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum ConanCommands {
    /// Install shared Conan configuration
    InstallConfig {
        /// URL, directory or archive with the configuration
        source: String,
    },
    /// Log in to a remote using CONAN_LOGIN_USERNAME and CONAN_PASSWORD
    Login {
        /// Remote to log in to
        #[arg(long)]
        remote: String,
    },
    /// Remove everything from the local Conan cache
    Purge,
}

#[derive(Debug, Subcommand)]
enum TripletCommands {
    /// Show the components and Conan settings of a triplet
    Parse {
        /// Triplet, e.g. x86_64-pc-linux-gnu
        triplet: String,
    },
    /// Print the triplet for Conan settings
    FromSettings {
        /// Conan arch setting
        #[arg(long)]
        arch: String,
        /// Conan os setting
        #[arg(long)]
        os: String,
        /// Android API level
        #[arg(long)]
        api_level: Option<u32>,
    },
    /// Check whether a triplet matches Conan settings
    Check {
        /// Conan arch setting
        #[arg(long)]
        arch: String,
        /// Conan os setting
        #[arg(long)]
        os: String,
        /// Triplet to check
        triplet: String,
    },
}

impl UploadArgs {
    fn selection(&self) -> PackageSelection {
        PackageSelection {
            packages: self.packages.clone(),
            all: self.all,
            since_commit: self.since_commit.clone(),
            since_before_last_merge: self.since_before_last_merge,
            since_merge_from_branch: self.since_merge_from_branch.clone(),
            merges: self.merges,
        }
    }

    fn options(&self) -> UploadOptions {
        UploadOptions {
            remote: self.remote.clone(),
            upload: !self.no_upload,
            parallel: !self.no_parallel,
            jobs: self.jobs.unwrap_or_else(default_jobs),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            anstream::eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let path = cli.path.as_path();
    match cli.command {
        Commands::UploadRecipes(args) => {
            cli::upload::run_upload_recipes(path, &args.selection(), &args.options())
                .await
                .context("upload-recipes failed")?;
        }
        Commands::MergeUpstream => {
            cli::merge::run_merge_upstream(path)
                .await
                .context("merge-upstream failed")?;
        }
        Commands::MergeStagingToProduction => {
            cli::merge::run_merge_staging_to_production(path)
                .await
                .context("merge-staging-to-production failed")?;
        }
        Commands::Conan { command } => match command {
            ConanCommands::InstallConfig { source } => {
                cli::conan::run_install_config(path, &source).await?;
            }
            ConanCommands::Login { remote } => cli::conan::run_login(path, &remote).await?,
            ConanCommands::Purge => cli::conan::run_purge(path).await?,
        },
        Commands::Triplet { command } => match command {
            TripletCommands::Parse { triplet } => cli::triplet::run_parse(&triplet)?,
            TripletCommands::FromSettings { arch, os, api_level } => {
                cli::triplet::run_from_settings(&arch, &os, api_level)?;
            }
            TripletCommands::Check { arch, os, triplet } => {
                if !cli::triplet::run_check(&arch, &os, &triplet)? {
                    return Ok(ExitCode::FAILURE);
                }
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}
