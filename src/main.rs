use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use nestlink::combine::{combine_nest_tables, combine_predictions, find_processed_nest_files};
use nestlink::io::naming::SiteYear;
use nestlink::io::table::{write_detections, write_nests};
use nestlink::pipeline::{combine_files, detect_nests, summarize_nests};
use nestlink::LinkerConfig;
use std::path::{Path, PathBuf};

const PREDICTIONS_DIR: &str = "predictions";
const DETECTED_NESTS_DIR: &str = "detected_nests";
const PROCESSED_NESTS_DIR: &str = "processed_nests";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Pipeline configuration (.json, or .toml with the `toml` feature)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root under which <product>/<year>/<site>/ outputs are written
    #[arg(short, long, global = true, default_value = ".")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine a site's flight predictions into one detection table
    Combine {
        /// Flight prediction files under .../<year>/<site>/
        #[arg(required = true)]
        flight_files: Vec<PathBuf>,
    },
    /// Link a combined detection table into candidate nest tracks
    Detect {
        /// Combined detection table under .../<year>/<site>/
        detection_file: PathBuf,
    },
    /// Reduce candidate nest tracks to one row per nest
    Process {
        /// Detected-nests table under .../<year>/<site>/
        nest_file: PathBuf,
    },
    /// Merge the flight predictions of every site and year into one table
    CombinePredictions {
        /// Directory laid out as <year>/<site>/
        predictions_root: PathBuf,

        /// Output file
        #[arg(long)]
        output: PathBuf,
    },
    /// Merge every processed-nests table below a directory into one table
    CombineNests {
        /// Directory laid out as <year>/<site>/
        nests_root: PathBuf,

        /// Output file
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("nestlink=info"))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LinkerConfig::from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => LinkerConfig::default(),
    };
    config.validate()?;

    match args.command {
        Command::Combine { flight_files } => {
            let site_year = partition(&flight_files[0])?;
            let savedir = site_year.dir_under(args.output_dir.join(PREDICTIONS_DIR));
            let output = combine_files(&flight_files, &site_year, savedir, &config)?;
            info!("Combined detections written to {}", output.display());
        }
        Command::Detect { detection_file } => {
            let site_year = partition(&detection_file)?;
            let savedir = site_year.dir_under(args.output_dir.join(DETECTED_NESTS_DIR));
            let output = detect_nests(&detection_file, &site_year, savedir, &config)
                .with_context(|| format!("detecting nests in {}", detection_file.display()))?;
            info!("Candidate nest tracks written to {}", output.display());
        }
        Command::Process { nest_file } => {
            let site_year = partition(&nest_file)?;
            let savedir = site_year.dir_under(args.output_dir.join(PROCESSED_NESTS_DIR));
            let output = summarize_nests(&nest_file, &site_year, savedir, &config)
                .with_context(|| format!("processing nests in {}", nest_file.display()))?;
            info!("Nest summaries written to {}", output.display());
        }
        Command::CombinePredictions {
            predictions_root,
            output,
        } => {
            let table = combine_predictions(
                &predictions_root,
                config.score_thresh,
                config.default_crs.as_deref(),
            )?;
            write_detections(&output, &table)?;
        }
        Command::CombineNests { nests_root, output } => {
            let files = find_processed_nest_files(&nests_root)?;
            info!("Found {} processed nest files", files.len());
            let table = combine_nest_tables(&files, config.default_crs.as_deref());
            write_nests(&output, &table)?;
        }
    }

    Ok(())
}

fn partition(path: &Path) -> anyhow::Result<SiteYear> {
    SiteYear::from_path(path)
        .with_context(|| format!("{} is not under .../<year>/<site>/", path.display()))
}
