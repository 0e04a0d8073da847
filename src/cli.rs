use crate::config::{EngineConfig, CHANNELS, SAMPLE_RATE_HZ};
use crate::error::UsageError;
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "live-beat-detector",
    version,
    about = "Detects beats and tempo in live audio input",
    after_help = "Examples:\n  live-beat-detector 128              # Small frames for low latency\n  live-beat-detector 256 --pitch      # Medium frames with pitch detection\n  live-beat-detector 512 --no-visual  # Large frames, one line per beat"
)]
pub struct Cli {
    /// Analysis frame length in samples (64-8192)
    #[arg(value_name = "FRAME_LEN", default_value_t = 128, value_parser = clap::value_parser!(u32).range(64..=8192))]
    pub frame_len: u32,

    /// Disable logging of beats to a file
    #[arg(long)]
    pub no_log: bool,

    /// Disable performance statistics
    #[arg(long)]
    pub no_stats: bool,

    /// Enable pitch detection
    #[arg(long)]
    pub pitch: bool,

    /// Disable the visual beat bar, print one line per beat instead
    #[arg(long)]
    pub no_visual: bool,

    /// Directory of the beat log file
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub log_dir: PathBuf,

    /// Name of the input device (default: the system's default input)
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,
}

impl From<Cli> for EngineConfig {
    fn from(cli: Cli) -> Self {
        Self {
            frame_len: cli.frame_len as usize,
            sample_rate: SAMPLE_RATE_HZ,
            channels: CHANNELS,
            logging: !cli.no_log,
            performance_stats: !cli.no_stats,
            pitch_detection: cli.pitch,
            visual_feedback: !cli.no_visual,
            log_dir: cli.log_dir,
            input_device: cli.device,
        }
    }
}

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(EngineConfig),
    /// Print the text (help or version) and exit successfully.
    Help(String),
}

/// Parses the command line. `args` includes the program name.
pub fn parse_args<I, T>(args: I) -> Result<Invocation, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Invocation::Run(cli.into())),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Ok(Invocation::Help(e.to_string())),
            _ => Err(UsageError(e.to_string())),
        },
    }
}
