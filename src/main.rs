mod actions;
mod compare;
mod error;
mod logging;
mod media;
mod metadata;
mod output;
mod quicktime;
mod resolver;
mod sorter;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use metadata::ContainerMetadata;
use resolver::ResolveOptions;
use sorter::SortOptions;

#[derive(Parser, Debug)]
#[command(name = "mediasort")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("media").required(true).multiple(true).args(["photos", "videos"])))]
struct Cli {
    /// Folder to sort
    source: PathBuf,

    /// Where sorted files go (defaults to the source folder, created if missing)
    destination: Option<PathBuf>,

    /// Sort photos
    #[arg(short, long)]
    photos: bool,

    /// Sort videos
    #[arg(short, long)]
    videos: bool,

    /// Log what would happen without changing any files
    #[arg(short = 't', long, visible_alias = "dry-run")]
    test_sort: bool,

    /// Skip files that have no date in their metadata instead of using the modified time
    #[arg(short, long)]
    metadata_only: bool,

    /// Add a camera make/model folder below the date folder (photos only)
    #[arg(short = 'c', long)]
    use_camera_name: bool,

    /// Keep identical duplicates in an ms-duplicates folder instead of deleting them
    #[arg(short, long)]
    keep_duplicates: bool,

    /// Only use the EXIF original date, never the last-edited date
    #[arg(long)]
    original_date_only: bool,

    /// Write a note next to each moved file recording its original path
    #[arg(long)]
    write_notes: bool,

    /// Extra file name pattern to delete on sight (repeatable)
    #[arg(long = "cleanup", value_name = "GLOB")]
    cleanup: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Directory for the run log file
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Hide the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Echo log events to stderr and list every action in the report
    #[arg(long)]
    verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
    /// No report, only the exit code and log file
    Quiet,
}

impl Cli {
    fn sort_options(&self) -> SortOptions {
        SortOptions {
            destination: self
                .destination
                .clone()
                .unwrap_or_else(|| self.source.clone()),
            photos: self.photos,
            videos: self.videos,
            dry_run: self.test_sort,
            keep_duplicates: self.keep_duplicates,
            write_notes: self.write_notes,
            resolve: ResolveOptions {
                metadata_only: self.metadata_only,
                use_secondary_date: !self.original_date_only,
                use_camera_name: self.use_camera_name,
            },
            cleanup_patterns: self.cleanup.clone(),
        }
    }

    fn photo_only_flags_without_photos(&self) -> bool {
        !self.photos && (self.use_camera_name || self.metadata_only)
    }
}

fn progress_spinner(hidden: bool) -> anyhow::Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {spinner} {pos} files {wide_msg}",
    )?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.photo_only_flags_without_photos() {
        eprintln!(
            "{} --use-camera-name and --metadata-only only apply to photos, pass --photos to use them",
            "warning:".yellow().bold()
        );
    }

    let log_file = logging::init_logging(&cli.log_dir, cli.verbose)?;
    let options = cli.sort_options();
    let progress = progress_spinner(cli.no_progress || cli.format != OutputFormat::Human)?;

    let report = match sorter::sort_media(&cli.source, &options, &ContainerMetadata, progress.clone())
    {
        Ok(report) => report,
        Err(e) => {
            progress.finish_and_clear();
            tracing::error!("{e}");
            return Err(e.into());
        }
    };
    progress.finish_and_clear();

    tracing::info!("{}", report.summary_line());

    match cli.format {
        OutputFormat::Human => report.print_human(cli.verbose, &log_file),
        OutputFormat::Json => report.print_json(),
        OutputFormat::Quiet => {}
    }

    Ok(())
}
