use std::{
    io::{stdout, Write},
    path::PathBuf,
    time::SystemTime,
};

use anyhow::Result;
use clap::Parser;

use latency_stats::{
    batch::{compute_paths, write_stats, OutputFormat},
    config_file::{LoadConfigFile, FILE_EXTENSIONS},
    serde::date_and_time::parse_timestamp,
    service::{config::ServiceConfig, StatsService},
    stats::StatsField,
    utillib::{
        get_terminal_width::get_terminal_width,
        logging::{init_log_level, LogLevelOpt},
    },
};

const PROGRAM_NAME: &str = "latency-stats";

#[derive(clap::Parser, Debug)]
#[clap(next_line_help = true)]
#[clap(set_term_width = get_terminal_width(4))]
/// Descriptive statistics and histograms for latency style samples
struct Opts {
    #[clap(flatten)]
    log_level: LogLevelOpt,

    /// Override the path to the config file (default: the paths
    /// `~/.latency-stats.*` where a single one exists where the `*`
    /// is the suffix for one of the supported config file formats
    /// (run `config-formats` to get the list), and if those are
    /// missing, use compiled-in default config values)
    #[clap(long)]
    config: Option<PathBuf>,

    /// The subcommand to run. Use `--help` after the sub-command to
    /// get a list of the allowed options there.
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print version
    Version,

    /// Show the supported config file formats
    ConfigFormats,

    /// Compute statistics for each file, one number per
    /// whitespace-separated word, `#` starting a comment. Reads stdin
    /// if no file is given. All files are submitted concurrently and
    /// go through the same single worker.
    Compute {
        /// Number of histogram buckets, 1..100 (other values mean
        /// 100; default: from the config file)
        #[clap(long, short, allow_hyphen_values = true)]
        buckets: Option<i64>,

        /// Print the stats as JSON, one object per line
        #[clap(long)]
        json: bool,

        /// Only print the given field (n|total|average|median|sd|min|max|loss)
        #[clap(long, short)]
        field: Option<StatsField>,

        /// Packet loss percentage to attach to the results
        #[clap(long)]
        loss: Option<f64>,

        /// Attach a timestamp: "now" or an RFC 3339 time
        #[clap(long)]
        timestamp: Option<String>,

        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let Opts {
        log_level,
        config,
        subcommand,
    } = Opts::parse();
    init_log_level(log_level)?;

    match subcommand {
        SubCommand::Version => {
            println!("{PROGRAM_NAME} version {}", env!("CARGO_PKG_VERSION"))
        }
        SubCommand::ConfigFormats => {
            for (extension, backend) in FILE_EXTENSIONS {
                println!("{extension}\t{backend:?}");
            }
        }
        SubCommand::Compute {
            buckets,
            json,
            field,
            loss,
            timestamp,
            paths,
        } => {
            let config = ServiceConfig::load_config(config.as_ref())?;
            let timestamp: Option<SystemTime> =
                timestamp.as_deref().map(parse_timestamp).transpose()?;

            let format = match (field, json) {
                (Some(field), _) => OutputFormat::Field(field),
                (None, true) => OutputFormat::Json,
                (None, false) => OutputFormat::Text,
            };

            let service = StatsService::start(&config)?;
            let results = compute_paths(&service, &paths, buckets)?;
            service.shutdown()?;

            let mut out = stdout().lock();
            let show_names = results.len() > 1;
            for (name, mut stats) in results {
                if let Some(loss) = loss {
                    stats = stats.with_loss_percentage(loss);
                }
                if let Some(timestamp) = timestamp {
                    stats = stats.with_timestamp(timestamp);
                }
                let name = show_names.then_some(name.as_str());
                write_stats(&mut out, name, &stats, format)?;
            }
            out.flush()?;
        }
    }

    Ok(())
}
