use std::path::PathBuf;

use clap::{ArgAction, Parser};
use time::macros::format_description;

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    #[clap(
        help = "The contract symbol whose files will be synchronized, e.g. ESM4",
        value_name = "SYMBOL"
    )]
    pub symbol: String,
    #[clap(
        help = "The UTC trading day to synchronize, formatted YYYY-MM-DD",
        value_name = "DATE",
        value_parser = parse_date
    )]
    pub date: time::Date,
    #[clap(
        short,
        long,
        default_value = ".",
        help = "The directory holding the intraday and depth files",
        value_name = "DIR"
    )]
    pub data_dir: PathBuf,
    #[clap(
        short,
        long,
        action = ArgAction::SetTrue,
        default_value = "false",
        help = "Enable debug-level logging"
    )]
    pub verbose: bool,
}

/// Parses a `YYYY-MM-DD` argument into a date.
pub fn parse_date(arg: &str) -> Result<time::Date, String> {
    time::Date::parse(arg, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("'{arg}' is not a valid YYYY-MM-DD date: {e}"))
}

/// Installs the log subscriber: `RUST_LOG` wins, otherwise `info` (or `debug`
/// with `--verbose`).
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::iso("2024-03-15", true)]
    #[case::short_month("2024-3-15", false)]
    #[case::us_style("03/15/2024", false)]
    #[case::nonsense("yesterday", false)]
    fn date_parsing(#[case] arg: &str, #[case] ok: bool) {
        assert_eq!(parse_date(arg).is_ok(), ok, "{arg}");
    }
}
