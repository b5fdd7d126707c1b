use std::{
    io::stdout,
    path::PathBuf,
    process::ExitCode,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use clap::Parser;
use engine::CaptureSource;
use fern::Dispatch;
use log::{LevelFilter, error, info};

/// Tracks fingertip blobs in a video stream and republishes them as
/// persistent pointer-protocol cursors.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the settings file
    #[arg(short, long, default_value = "mtrack.json")]
    config: PathBuf,

    /// Camera device index to capture from
    #[arg(long, conflicts_with = "video")]
    camera: Option<i32>,

    /// Video file to capture from instead of a camera
    #[arg(long)]
    video: Option<String>,

    /// Pointer endpoint URL to publish cursors to
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Show the visualization window
    #[arg(short, long)]
    display: bool,

    /// Log verbosity
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.log_level);

    let mut settings = engine::load_settings(&args.config);
    if let Some(index) = args.camera {
        settings.source = CaptureSource::Camera(index);
    }
    if let Some(path) = args.video {
        settings.source = CaptureSource::Video(path);
    }
    if let Some(endpoint) = args.endpoint {
        settings.endpoint = endpoint;
    }
    settings.display |= args.display;
    info!(target: "cli", "capturing from {}", settings.source);

    let stop = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime should start");
    runtime.spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(target: "cli", "interrupt received, stopping after the current frame");
                stop.store(true, Ordering::SeqCst);
            }
        }
    });

    match engine::run(Arc::new(Mutex::new(settings)), stop) {
        Ok(termination) => {
            info!(target: "cli", "terminated normally: {termination}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(target: "cli", "{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(level: LevelFilter) {
    Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(stdout())
        .apply()
        .expect("logger set once");
    log_panics::init();
}
