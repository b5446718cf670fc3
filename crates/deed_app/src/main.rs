mod platform;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use engine_logging::engine_error;

use platform::logging::{self, LogDestination};
use platform::{run_job, Job, Overrides};

#[derive(Parser)]
#[command(
    name = "deedfetch",
    about = "Find debenture deed PDFs on the ANBIMA portal and download them",
    version
)]
struct Cli {
    /// RON configuration file; built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run Chrome headless (true) or with a visible window (false)
    #[arg(long, global = true)]
    headless: Option<bool>,

    /// Chrome/Chromium executable to launch
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,

    /// Where progress logs go
    #[arg(long, global = true, value_enum, default_value = "both")]
    log: LogDestination,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover deed links for each asset and write a ledger
    Discover {
        /// Asset list, one identifier per line
        #[arg(long, default_value = "ativos.txt")]
        assets: PathBuf,
        /// Folder receiving the ledger
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Ledger file name; timestamped when omitted
        #[arg(long)]
        ledger: Option<String>,
    },
    /// Download every document listed in a ledger
    Download {
        #[arg(long)]
        ledger: PathBuf,
        /// Root folder; documents land in <dest>/<issuer>/
        #[arg(long, default_value = "escrituras")]
        dest: PathBuf,
    },
    /// Discover, then download from the fresh ledger
    Run {
        #[arg(long, default_value = "ativos.txt")]
        assets: PathBuf,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(long, default_value = "escrituras")]
        dest: PathBuf,
    },
    /// Print the effective configuration as RON
    DefaultConfig,
}

impl From<Command> for Job {
    fn from(command: Command) -> Self {
        match command {
            Command::Discover {
                assets,
                output_dir,
                ledger,
            } => Job::Discover {
                assets,
                output_dir,
                ledger,
            },
            Command::Download { ledger, dest } => Job::Download { ledger, dest },
            Command::Run {
                assets,
                output_dir,
                dest,
            } => Job::Run {
                assets,
                output_dir,
                dest,
            },
            Command::DefaultConfig => Job::DefaultConfig,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let overrides = Overrides {
        config: cli.config,
        headless: cli.headless,
        chrome_path: cli.chrome_path,
    };
    match run_job(cli.command.into(), overrides) {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            if cli.log == LogDestination::File {
                eprintln!("Error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
