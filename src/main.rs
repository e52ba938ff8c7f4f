use std::process::ExitCode;

use clap::Parser;

mod cmd;
mod tile38;
mod utils;

use cmd::{DisplayMode, Operation, Options, ToolError};
use tile38::ServerConfig;

/// tile-tool - flag driven client for a Tile38 geospatial server
///
/// Exactly one operation per invocation:
///   tile-tool --scan   -k <key>                     list objects under a key
///   tile-tool --search -k <pattern|all>             list key names
///   tile-tool --stats  [-k <key>]                   memory / object counts
///   tile-tool --delete -k <key> [-i <id>]           delete one object or drop the key
///   tile-tool --setpoint <lon,lat> -k <key> -i <id> store a point
///   tile-tool --nearby <lon,lat> -k <key> [-r <m>]  objects near a point
///
/// Connection / env:
///   --host / TILE38_HOST   host, host:port or tile38://[:password@]host[:port]
///   --auth / TILE38_AUTH   server password
///   A .env file in the working directory is loaded first.
///
/// Examples:
///   tile-tool --search -k all
///   tile-tool --setpoint -112.26,33.46 -k fleet -i truck1
///   tile-tool --nearby -112.26,33.46 -k fleet -r 5000 --no-coordinates
#[derive(Parser, Debug)]
#[command(
    name = "tile-tool",
    version,
    about = "tile-tool - query and edit a Tile38 geospatial server from the command line"
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence info and debug log lines (errors are still printed)
    #[arg(short, long)]
    quiet: bool,

    /// Server address (host, host:port or tile38://[:password@]host[:port])
    #[arg(long, env = "TILE38_HOST", value_name = "ADDR")]
    host: Option<String>,

    /// Server password
    #[arg(long, env = "TILE38_AUTH", hide_env_values = true, value_name = "PASSWORD")]
    auth: Option<String>,

    /// For actions that require an ID.
    #[arg(short = 'i', long)]
    id: Option<String>,

    /// For actions that require a key.
    #[arg(short = 'k', long)]
    key: Option<String>,

    /// For actions that require a radius (meters).
    #[arg(short = 'r', long)]
    radius: Option<String>,

    /// Results should not contain coordinates (names only).
    #[arg(long = "no-coordinates")]
    no_coordinates: bool,

    /// Print the raw JSON reply instead of formatted output
    #[arg(long)]
    json: bool,

    /// Search for key names matching --key ('all' for every key).
    #[arg(long)]
    search: bool,

    /// Find objects near <lon,lat> in --key.
    #[arg(
        short = 'n',
        long,
        value_name = "COORDS",
        allow_hyphen_values = true,
        value_parser = coordinate_arg
    )]
    nearby: Option<String>,

    /// Get all objects stored under --key.
    #[arg(short = 's', long)]
    scan: bool,

    /// Get details for --key.
    #[arg(long)]
    stats: bool,

    /// Store a point at <lon,lat> for --key and --id.
    #[arg(
        long,
        value_name = "COORDS",
        allow_hyphen_values = true,
        value_parser = coordinate_arg
    )]
    setpoint: Option<String>,

    /// Delete --id from --key, or the whole key when no id is given (use with caution!)
    #[arg(short = 'd', long)]
    delete: bool,
}

/// Coordinate values may be negative, but must not swallow the next flag.
///
/// Structure (`lon,lat`) is checked later so it reports as a malformed
/// coordinate rather than a usage error.
fn coordinate_arg(raw: &str) -> Result<String, String> {
    let mut chars = raw.chars();
    let looks_like_flag = chars.next() == Some('-')
        && !matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '.');
    if looks_like_flag {
        return Err(format!("expected <lon>,<lat>, found option '{raw}'"));
    }
    Ok(raw.to_string())
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            id: self.id.clone(),
            key: self.key.clone(),
            radius: self.radius.clone(),
            scan: self.scan,
            search: self.search,
            stats: self.stats,
            delete: self.delete,
            nearby: self.nearby.clone(),
            setpoint: self.setpoint.clone(),
            mode: DisplayMode {
                coordinates: !self.no_coordinates,
            },
            json: self.json,
        }
    }
}

fn main() -> ExitCode {
    // Bare invocation: hint instead of an error
    if std::env::args_os().len() <= 1 {
        let bin = std::env::args().next().unwrap_or_else(|| "tile-tool".into());
        println!("Try {bin} --help.");
        return ExitCode::SUCCESS;
    }

    // Optional .env feeds TILE38_HOST / TILE38_AUTH before clap reads them
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match dotenv {
        Ok(path) => log_debug!("loaded {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log_error!(".env not loaded: {e}"),
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            for line in e.report_lines() {
                eprintln!("{line}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), ToolError> {
    let options = cli.options();

    let Some(op) = Operation::select(&options)? else {
        log_debug!("no operation selected; nothing to do");
        return Ok(());
    };

    let config = ServerConfig::resolve(cli.host.as_deref(), cli.auth.as_deref()).map_err(
        |reason| ToolError::InvalidAddress {
            raw: cli.host.clone().unwrap_or_default(),
            reason,
        },
    )?;

    for line in cmd::execute(&op, &config, &options)? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_coordinates_accepted() {
        let cli =
            Cli::try_parse_from(["t", "--nearby", "-112.26,33.46", "-k", "fleet"]).unwrap();
        assert_eq!(cli.nearby.as_deref(), Some("-112.26,33.46"));
    }

    #[test]
    fn coordinate_flag_does_not_swallow_next_option() {
        let err = Cli::try_parse_from(["t", "--nearby", "--key", "fleet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["t", "--setpoint", "-k", "fleet", "-i", "a"]).is_err());
        assert!(Cli::try_parse_from(["t", "--setpoint", "-.5,1", "-k", "fleet"]).is_ok());
    }

    #[test]
    fn no_coordinates_flips_display_mode() {
        let cli = Cli::try_parse_from(["t", "--scan", "-k", "fleet", "--no-coordinates"]).unwrap();
        let opts = cli.options();
        assert!(!opts.mode.coordinates);
        assert!(opts.scan);
    }
}
