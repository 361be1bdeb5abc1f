use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::LevelFilter;

use subject_cutout::{
    collect_input_files, output_folder_name, parse_bevel, parse_color, AlphaPassthrough,
    BatchResult, BatchRunner, CommandSegmenter, Error, FileOutcome, Progress, RunConfig,
    Segmenter, SizeSelection,
};

#[derive(Parser)]
#[command(
    name = "cutout",
    about = "Remove photo backgrounds, crop to the subject and center it on a canvas",
    version,
    after_help = "Outputs go to <OUTPUT_ROOT>/FinishedPhotos_<Transparent|Opaque>_<Original|WxH>/.\n\n\
                  The default model command is `rembg i - -`, which must be on PATH.\n\
                  Use --passthrough for photos that already have a transparent background."
)]
struct Cli {
    /// Folder containing the photos (.png, .jpg, .jpeg, .webp)
    #[arg(default_value = "RawPhotos")]
    input: PathBuf,

    /// Folder in which the FinishedPhotos_* output folder is created
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Flatten onto a solid background instead of keeping transparency
    #[arg(long)]
    opaque: bool,

    /// Background color for --opaque (#rrggbb, #rgb, white, black)
    #[arg(short, long, default_value = "#ffffff")]
    background: String,

    /// Canvas size: original, 256x256, 512x512, 1024x1024 or any WxH
    #[arg(short, long, default_value = "original")]
    size: String,

    /// Side bevel, percent of the subject's width
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    side_bevel: String,

    /// Top/bottom bevel, percent of the subject's height
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    top_bottom_bevel: String,

    /// Background-removal command reading the photo on stdin and writing PNG to stdout
    #[arg(long, default_value = "rembg i - -", conflicts_with = "passthrough")]
    model_cmd: String,

    /// Use the photos' existing alpha channel instead of running a model
    #[arg(long)]
    passthrough: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// The background-removal backend picked on the command line.
enum Model {
    Command(CommandSegmenter),
    Passthrough(AlphaPassthrough),
}

impl Segmenter for Model {
    fn remove_background(&self, input: &[u8]) -> subject_cutout::Result<Vec<u8>> {
        match self {
            Model::Command(s) => s.remove_background(input),
            Model::Passthrough(s) => s.remove_background(input),
        }
    }
}

impl Cli {
    fn run_config(&self) -> subject_cutout::Result<RunConfig> {
        let size: SizeSelection = self.size.parse()?;
        let side = parse_bevel(&self.side_bevel)?;
        let top_bottom = parse_bevel(&self.top_bottom_bevel)?;
        let background = parse_color(&self.background)?;
        RunConfig::new(!self.opaque, background, size, side, top_bottom)
    }

    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    // Everything is validated before any folder is created.
    let config = match cli.run_config() {
        Ok(c) => c,
        Err(e) => fail(&e),
    };

    let segmenter = if cli.passthrough {
        Model::Passthrough(AlphaPassthrough)
    } else {
        match CommandSegmenter::from_command_line(&cli.model_cmd) {
            Ok(s) => Model::Command(s),
            Err(e) => fail(&e),
        }
    };

    if !cli.input.is_dir() {
        eprintln!("Error: Input folder does not exist: {}", cli.input.display());
        process::exit(1);
    }

    let inputs = match collect_input_files(&cli.input) {
        Ok(files) => files,
        Err(e) => fail(&e),
    };

    let output_dir = cli.output.join(output_folder_name(&config));
    let runner = BatchRunner::new(segmenter, config);
    let quiet = cli.quiet;

    let result = match runner.run(&inputs, &output_dir, |p| print_progress(p, quiet)) {
        Ok(r) => r,
        Err(e) => fail(&e),
    };

    if result.is_empty() {
        if !quiet {
            eprintln!("No supported images found in {}", cli.input.display());
        }
        return;
    }

    print_summary(&result, &cli.input, quiet);

    if result.failed > 0 {
        process::exit(1);
    }
}

fn fail(e: &Error) -> ! {
    eprintln!("Error: {e}");
    process::exit(1);
}

fn print_progress(progress: &Progress<'_>, quiet: bool) {
    let outcome = progress.outcome;
    if quiet && outcome.succeeded() {
        return;
    }

    let filename = display_name(outcome);
    let counter = format!("[{}/{}]", progress.processed, progress.total);
    if outcome.succeeded() {
        eprintln!("{counter} [OK] {filename}");
    } else {
        eprintln!(
            "{counter} [FAIL] {filename} ({}): {}",
            outcome.error_kind.unwrap_or("error"),
            outcome.message
        );
    }
}

fn print_summary(result: &BatchResult, input_dir: &Path, quiet: bool) {
    if quiet {
        return;
    }

    eprintln!();
    eprint!("[Summary] Processed: {}", result.succeeded);
    if result.failed > 0 {
        eprint!(", Failed: {}", result.failed);
    }
    eprintln!(" (Total: {})", result.attempted);
    eprintln!(
        "  {} -> {}",
        input_dir.display(),
        result.output_dir.display()
    );
}

fn display_name(outcome: &FileOutcome) -> String {
    outcome.input.file_name().map_or_else(
        || outcome.input.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
