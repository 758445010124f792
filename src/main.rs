use anyhow::Context;
use branchgraph::OutputFormat;
use branchgraph::areas::config::ConfigStore;
use branchgraph::areas::repository::Repository;
use branchgraph::artifacts::core::PagerWriter;
use branchgraph::commands::plumbing::snapshot::SnapshotOptions;
use branchgraph::commands::porcelain::graph::GraphOptions;
use branchgraph::commands::porcelain::watch::WatchOptions;
use branchgraph::errors::EngineError;
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use minus::Pager;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const NO_PAGER_ENV: &str = "NO_PAGER";

#[derive(Parser)]
#[command(
    name = "branchgraph",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A branch-structured commit graph for the terminal",
    long_about = "This tool reads a git repository, assigns every commit to the branch \
    that most likely created it and draws the selected branches as columns. \
    It never changes the repository.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(short = 'C', long, global = true, help = "The working tree to read")]
    path: Option<PathBuf>,
    #[arg(long, global = true, help = "The configuration file to use")]
    config: Option<PathBuf>,
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Log more (-v debug, -vv trace)"
    )]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "graph",
        about = "Draw the commit graph of the shown branches",
        long_about = "This command draws one row per commit of the shown branches. \
        Without --branch the branches shown last time are used."
    )]
    Graph {
        #[arg(short, long = "branch", help = "A branch to show (repeatable)")]
        branches: Vec<String>,
        #[arg(long, help = "Open the hidden branches of a row (repeatable)")]
        open: Vec<usize>,
        #[arg(long, help = "Close the branch of a row (repeatable)")]
        close: Vec<usize>,
        #[arg(long, default_value_t = 0, help = "The first row to print")]
        first: usize,
        #[arg(short = 'n', long, help = "The number of rows to print")]
        count: Option<usize>,
    },
    #[command(name = "branches", about = "List all branches, real and recovered")]
    Branches {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    #[command(name = "status", about = "Summarise the working tree")]
    Status,
    #[command(
        name = "show",
        about = "Print the details of a commit",
        long_about = "This command prints one commit, shown or not. \
        It requires the full id or a unique prefix."
    )]
    Show {
        #[arg(index = 1)]
        commit: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    #[command(
        name = "search",
        about = "Find commits by id, message, author, tag or branch"
    )]
    Search {
        #[arg(index = 1)]
        text: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    #[command(
        name = "snapshot",
        about = "Print the view as JSON",
        long_about = "This command prints the laid out view as JSON. \
        With --first or --count only a window of rows is printed."
    )]
    Snapshot {
        #[arg(short, long = "branch", help = "A branch to show (repeatable)")]
        branches: Vec<String>,
        #[arg(long)]
        first: Option<usize>,
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    #[command(
        name = "watch",
        about = "Print a line for every refresh of the view",
        long_about = "This command watches the working tree and prints a line each time the \
        view is refreshed, until interrupted."
    )]
    Watch {
        #[arg(long, help = "Stop after this many snapshots")]
        limit: Option<usize>,
        #[arg(long, help = "Stop after this many seconds without changes")]
        idle: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            let code = error
                .downcast_ref::<EngineError>()
                .map(EngineError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("branchgraph={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let path = match cli.path {
        Some(path) => path,
        None => std::env::current_dir().context("no current directory")?,
    };
    let store = match cli.config {
        Some(config) => ConfigStore::new(config.into_boxed_path()),
        None => ConfigStore::default_location()?,
    };

    let pages = matches!(
        cli.command,
        Commands::Graph { .. } | Commands::Branches { .. } | Commands::Search { .. }
    );
    let is_terminal = std::io::stdout().is_terminal();
    let pager = (pages && is_terminal && std::env::var_os(NO_PAGER_ENV).is_none()).then(Pager::new);
    if !is_terminal {
        colored::control::set_override(false);
    }

    let writer: Box<dyn std::io::Write> = match &pager {
        Some(pager) => Box::new(PagerWriter::new(pager.clone())),
        None => Box::new(std::io::stdout()),
    };
    let repository = Repository::new(&path, store, writer)?;

    match cli.command {
        Commands::Graph {
            branches,
            open,
            close,
            first,
            count,
        } => repository.graph(&GraphOptions {
            branches,
            open,
            close,
            first,
            count,
        })?,
        Commands::Branches { format } => repository.branches(format)?,
        Commands::Status => repository.status()?,
        Commands::Show { commit, format } => repository.show(&commit, format)?,
        Commands::Search { text, format } => repository.search(&text, format)?,
        Commands::Snapshot {
            branches,
            first,
            count,
        } => repository.snapshot(&SnapshotOptions {
            branches,
            first,
            count,
        })?,
        Commands::Watch { limit, idle } => repository.watch(&WatchOptions {
            limit,
            idle_timeout: idle.map(Duration::from_secs),
        })?,
    }

    if let Some(pager) = pager {
        minus::page_all(pager).context("pager failed")?;
    }

    Ok(())
}
