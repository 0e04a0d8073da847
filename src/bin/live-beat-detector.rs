use live_beat_detector::capture::CpalSource;
use live_beat_detector::cli::{self, Invocation};
use live_beat_detector::{Controller, EngineConfig, StopFlag};
use log::LevelFilter;
use std::error::Error;
use std::process::ExitCode;

fn init_logger() {
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .with_colors(true)
        .with_utc_timestamps()
        .init()
    {
        eprintln!("failed to initialize the logger: {e}");
    }
}

fn check_mark(enabled: bool) -> &'static str {
    if enabled {
        "✓"
    } else {
        "✗"
    }
}

fn print_banner(config: &EngineConfig) {
    println!();
    println!("Beat Detector Started!");
    println!("   Frame length: {} samples", config.frame_len);
    println!("   FFT size: {} samples", config.fft_size());
    println!("   Sample rate: {} Hz", config.sample_rate);
    println!("   Detection method: HFC (high-frequency content)");
    println!("   Features enabled:");
    println!("    Logging: {}", check_mark(config.logging));
    println!("    Performance stats: {}", check_mark(config.performance_stats));
    println!("    Pitch detection: {}", check_mark(config.pitch_detection));
    println!("    Confidence gating: ✓");
    println!("    BPM stability tracking: ✓");
    println!();
    println!("Listening for beats... Press Ctrl+C to stop.");
    println!();
}

fn main() -> ExitCode {
    let config = match cli::parse_args(std::env::args_os()) {
        Ok(Invocation::Run(config)) => config,
        Ok(Invocation::Help(text)) => {
            print!("{text}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprint!("{e}");
            return ExitCode::FAILURE;
        }
    };

    init_logger();

    let stop = StopFlag::new();
    if let Err(e) = stop.install_interrupt_handler() {
        log::warn!("Can't install the interrupt handler, stop with SIGKILL: {e}");
    }

    let mut source = CpalSource::new();
    if let Some(name) = &config.input_device {
        source = source.with_device_name(name.clone());
    }

    let mut controller = Controller::new(source, config, stop);
    match controller.run(print_banner) {
        Ok(summary) => {
            println!();
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            let mut source = e.source();
            while let Some(cause) = source {
                log::error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
