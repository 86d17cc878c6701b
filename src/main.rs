use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gtfsmerge::cmd::{self, MergeOptions};
use gtfsmerge::config::{Compression, DEFAULT_CONFIG_FILE, LogFormat, MergeConfig};
use gtfsmerge::diagnostics::TracingSink;
use gtfsmerge::error::{EXIT_IO, EXIT_USAGE};
use gtfsmerge::report::ReportFormat;
use gtfsmerge::telemetry;

/// Merge GTFS zip archives into one
///
/// The first input is the reference: the output contains exactly its entries,
/// in its order, each starting with its header line. Every other input adds
/// the lines of an entry whose header is byte-identical to the reference's.
/// Lines already written for an entry are skipped.
///
/// Inputs may be glob patterns. The last argument is always the output.
///
/// EXAMPLES:
///
///   gtfsmerge tbm.zip transgironde.zip merged.zip
///   gtfsmerge 'feeds/*.zip' merged.zip
///
/// EXIT CODES:
///
///   0  success
///   2  usage or configuration error
///   3  reference archive unreadable or output unwritable
#[derive(Parser)]
#[command(name = "gtfsmerge")]
#[command(version, about, verbatim_doc_comment)]
#[command(override_usage = "gtfsmerge [OPTIONS] <INPUT>... <OUTPUT>")]
struct Cli {
    /// Input archives or glob patterns, followed by the output archive
    #[arg(value_name = "PATH", required = true, num_args = 2..)]
    paths: Vec<String>,

    /// Configuration file (missing file means defaults)
    #[arg(long, env = "GTFSMERGE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Compression for output entries [default: from config, else deflated]
    #[arg(long, value_enum)]
    compression: Option<Compression>,

    /// Log format on stderr [default: from config, else text]
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Print a merge summary on stdout [default: from config, else none]
    #[arg(long, value_enum)]
    report: Option<ReportFormat>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match MergeConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    telemetry::init(cli.log_format.unwrap_or(config.log.format));

    let compression = cli.compression.unwrap_or(config.output.compression);
    let report_format = cli.report.unwrap_or(config.report.format);

    let result = MergeOptions::from_positionals(&cli.paths, compression)
        .and_then(|options| cmd::run(&options, &mut TracingSink));

    match result {
        Ok(report) => match report_format.render(&report) {
            Ok(Some(text)) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Ok(None) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::from(EXIT_IO)
            }
        },
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
