//! CLI argument definitions for klinescope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `search` | Search the symbol picker |
//! | `indices` | List chartable indices |
//! | `hot` | List the hot symbol pool |
//! | `chart` | Generate one chart |
//! | `session` | Interactive session on stdin |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--base-url` | `http://127.0.0.1:5002` | Backend address (`KLINESCOPE_BASE_URL`) |
//! | `--timeout-ms` | `30000` | Chart request deadline |
//! | `--search-limit` | `50` | Search result ceiling |
//! | `--mock` | `false` | Use the built-in offline backend |
//! | `--no-cache` | `false` | Bypass the search cache |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `-v` / `-q` | | More / less logging (`KLINESCOPE_LOG` overrides) |
//!
//! # Examples
//!
//! ```bash
//! klinescope search 茅台
//! klinescope chart --stock 600519 --stock 000001 --index 上证指数 --out chart.json
//! klinescope --mock session
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// klinescope - compare A-share stocks against a market index
#[derive(Debug, Parser)]
#[command(
    name = "klinescope",
    author,
    version,
    about = "Compare A-share stocks against a market index",
    long_about = "klinescope talks to a chart backend: it searches symbols, loads the \
hot pool and index list, and requests comparison charts.\n\
\n\
Use 'klinescope <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Backend base URL.
    #[arg(
        long,
        global = true,
        env = "KLINESCOPE_BASE_URL",
        default_value = klinescope_core::config::DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Chart request deadline in milliseconds.
    #[arg(long, global = true, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Maximum number of search results.
    #[arg(long, global = true, default_value_t = 50)]
    pub search_limit: usize,

    /// Serve every request from the built-in offline backend.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Always hit the network for searches.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Debug-level logging.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Disable ANSI colors in log output.
    #[arg(long, global = true, default_value_t = false)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search symbols by code, name, or pinyin initials.
    ///
    /// An empty query returns the backend's default set.
    ///
    /// # Examples
    ///
    ///   klinescope search 茅台
    ///   klinescope search 600 --search-limit 5
    Search(SearchArgs),

    /// List the indices a chart can be compared against.
    Indices,

    /// List the hot symbol pool used to seed the picker.
    Hot(HotArgs),

    /// Generate a chart for the given symbols and index.
    ///
    /// # Examples
    ///
    ///   klinescope chart --stock 600519 --index 上证指数
    ///   klinescope chart --stock sh600519 --stock sz000001 --index 深证成指 --normalize \
    ///       --start 2024-01-01 --end 2024-06-30 --out figure.json
    Chart(ChartArgs),

    /// Interactive session reading commands from stdin.
    ///
    /// Type `help` inside the session for the command list.
    Session(SessionArgs),
}

/// Arguments for the `search` command.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search text (code, name, or pinyin initials).
    #[arg(default_value = "")]
    pub query: String,
}

/// Arguments for the `hot` command.
#[derive(Debug, Args)]
pub struct HotArgs {
    /// Number of symbols to fetch.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

/// Arguments for the `chart` command.
#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Symbol to chart; repeat for several (e.g. 600519, sz000001, 000001.SZ).
    #[arg(long = "stock", required = true, num_args = 1)]
    pub stocks: Vec<String>,

    /// Index to compare against.
    #[arg(long, default_value = klinescope_core::config::DEFAULT_INDEX)]
    pub index: String,

    /// Normalize series to a common base.
    #[arg(long, default_value_t = false)]
    pub normalize: bool,

    /// First date, YYYY-MM-DD.
    #[arg(long)]
    pub start: Option<String>,

    /// Last date, YYYY-MM-DD.
    #[arg(long)]
    pub end: Option<String>,

    /// Write the final figure JSON here.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the `session` command.
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Write each rendered figure here.
    #[arg(long)]
    pub out: Option<PathBuf>,
}
