use chat_db_export::sequential;
use chat_db_export::utils::{
    self, CliOverrides, TimeZone, TimestampMode, UserResolution,
};
use clap::Parser;
use eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Export chat channels from a SQLite database to chat-export JSON files.
#[derive(Parser)]
#[command(author, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Print the version and exit.
    #[arg(short = 'v', long = "version")]
    print_version: bool,

    /// Path to the input SQLite database.
    /// Defaults to ./input.db if not set in config.
    #[arg(long = "in", value_name = "PATH")]
    input: Option<PathBuf>,

    /// Path to the output JSON file. With several channels the channel index
    /// is appended to the file stem (out.json -> out0.json, out1.json).
    /// Defaults to ./output.json if not set in config.
    #[arg(long = "out", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Name each output file after its channel id (<id>.json in the working directory).
    /// Overrides --out.
    #[arg(long)]
    id_as_name: bool,

    /// Comma-separated list of one or more channel ids.
    #[arg(long, value_name = "IDS")]
    channel: Option<String>,

    /// How message timestamps are written.
    #[arg(long, value_enum, value_name = "MODE")]
    timestamp_mode: Option<TimestampMode>,

    /// What to do with messages whose sender has no user row.
    #[arg(long, value_enum, value_name = "POLICY")]
    user_resolution: Option<UserResolution>,

    /// Time zone used for formatted timestamps.
    #[arg(long, value_enum, value_name = "ZONE")]
    time_zone: Option<TimeZone>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/chat-db-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log every step, including senders without a user row.
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            db_path: self.input.clone(),
            out: self.output.clone(),
            id_as_name: self.id_as_name,
            channel: self.channel.clone(),
            timestamp_mode: self.timestamp_mode,
            user_resolution: self.user_resolution,
            time_zone: self.time_zone,
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_logging(cli.verbose, cli.quiet);

    // 1. Load config file (CLI path > default path)
    let file_cfg = utils::load_file_config(cli.config.as_deref())?;

    // 2. Resolve (CLI > Config > Default)
    let config = utils::resolve_config(cli.overrides(), file_cfg)?;

    // 3. Run the export
    sequential::execute(&config)?;
    Ok(())
}
