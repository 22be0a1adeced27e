//! video-joystick CLI: calibrate a marker board from recorded frames and
//! replay frames through the calibrated button matcher.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use video_joystick::buttons::ProfileStore;
use video_joystick::calib::calibrate;
use video_joystick::replay::{ImageDirSource, PrintingKeyboard, ScriptedInput};
use video_joystick::{run_joystick, JoystickConfig};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "video-joystick")]
#[command(about = "Turn four paper markers seen by a camera into four keyboard buttons")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the calibration flow and write a profile.
    Calibrate {
        #[command(flatten)]
        common: CommonArgs,

        /// Where to write the calibration profile (JSON).
        #[arg(long, default_value = ProfileStore::DEFAULT_FILE)]
        output: PathBuf,
    },

    /// Load a profile and print key presses/releases for each frame.
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Calibration profile written by `calibrate`.
        #[arg(long, default_value = ProfileStore::DEFAULT_FILE)]
        profile: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Directory of frames (png/jpg/bmp/ppm), replayed in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// Restart from the first frame after the last one.
    #[arg(long = "loop")]
    looping: bool,

    /// Operator events: confirm, back, exit, wait[:N], key:<c>.
    #[arg(long, default_value = "", conflicts_with = "script_file")]
    script: String,

    /// Read the operator script from a file.
    #[arg(long)]
    script_file: Option<PathBuf>,

    /// JSON overrides for preprocessing, calibration and matching.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log per-frame details.
    #[arg(long, short)]
    verbose: bool,
}

impl CommonArgs {
    fn config(&self) -> CliResult<JoystickConfig> {
        Ok(match &self.config {
            Some(path) => JoystickConfig::load_json(path)?,
            None => JoystickConfig::default(),
        })
    }

    fn script(&self) -> CliResult<ScriptedInput> {
        Ok(match &self.script_file {
            Some(path) => ScriptedInput::from_file(path)?,
            None => ScriptedInput::parse(&self.script)?,
        })
    }

    fn camera(&self) -> CliResult<ImageDirSource> {
        Ok(ImageDirSource::open(&self.frames, self.looping)?)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Commands::Calibrate { common, .. } | Commands::Run { common, .. } => common.verbose,
    };
    if let Err(e) = init_logging(verbose) {
        eprintln!("failed to install logger: {e}");
    }

    let result = match cli.command {
        Commands::Calibrate { common, output } => run_calibrate(&common, &output),
        Commands::Run { common, profile } => run_replay(&common, &profile),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn log_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

fn init_logging(verbose: bool) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        video_joystick::core::init_tracing(false, log_level(verbose));
    }
    #[cfg(not(feature = "tracing"))]
    {
        video_joystick::core::init_with_level(log_level(verbose))
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn run_calibrate(args: &CommonArgs, output: &Path) -> CliResult<()> {
    let config = args.config()?;
    let store = ProfileStore::new(output);
    let profile = calibrate(
        args.camera()?,
        args.script()?,
        config.calibration,
        config.detector(),
        config.matching,
        &store,
    )?;
    log::info!(
        "wrote {} (keys {})",
        store.path().display(),
        profile
            .key_bindings
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(",")
    );
    Ok(())
}

fn run_replay(args: &CommonArgs, profile: &Path) -> CliResult<()> {
    let config = args.config()?;
    run_joystick(
        &ProfileStore::new(profile),
        &config,
        args.camera()?,
        args.script()?,
        PrintingKeyboard::stdout(),
    )?;
    Ok(())
}
