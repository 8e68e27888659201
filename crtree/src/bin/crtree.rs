use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crtree::utils::cli::crtreeblocks::{crtreeblocks, CirTreeBlocksArgs};
use crtree::utils::cli::crtreebuild::{crtreebuild, CirTreeBuildArgs};
use crtree::utils::cli::crtreeinfo::{crtreeinfo, CirTreeInfoArgs};

#[derive(Debug, Args)]
struct CommonArgs {
    /// Verbosity of the program
    #[clap(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Clone, Debug, PartialEq, Subcommand)]
enum SubCommands {
    #[command(name = "build", version)]
    Build {
        #[command(flatten)]
        args: CirTreeBuildArgs,
    },
    #[command(name = "info", version)]
    Info {
        #[command(flatten)]
        args: CirTreeInfoArgs,
    },
    #[command(name = "blocks", version)]
    Blocks {
        #[command(flatten)]
        args: CirTreeBlocksArgs,
    },
}

#[derive(Debug, Parser)]
#[command(
    name = "crtree",
    about = "Builds and searches chromosome-range r-tree indexes",
    long_about = None,
    version
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: SubCommands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let collector = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::ERROR,
        })
        .compact()
        .finish();

    tracing::subscriber::with_default(collector, || match cli.command {
        SubCommands::Build { args } => crtreebuild(args),
        SubCommands::Info { args } => crtreeinfo(args),
        SubCommands::Blocks { args } => crtreeblocks(args),
    })
}
