//! Entry point: parses the CLI, sets up `tracing`, and hands off to
//! `FluidVoiceApp`. The file-rotation layer ColdVox's `main.rs` installs is
//! deliberately not carried over here — see DESIGN.md's Open Question entry
//! for `fluidvoice-app`; this binary logs to stderr only and leaves log
//! capture to whatever supervises the process (systemd, a terminal, etc).

mod app;

use app::{AppOptions, FluidVoiceApp};
use clap::Parser;
use fluidvoice_audio::DevicePicker;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fluidvoice", author, version, about = "Hotkey-driven dictation with local vocabulary correction")]
struct Cli {
    /// List available input devices and exit.
    #[arg(long = "list-devices")]
    list_devices: bool,

    /// Use a specific input device by its stable uid instead of the default.
    #[arg(long = "forced-device")]
    forced_device: Option<String>,

    /// Disable the global hotkey listener, useful for headless testing.
    #[arg(long = "no-hotkey")]
    no_hotkey: bool,

    /// Path to the transcription worker binary.
    #[arg(long = "worker-bin", default_value = "fluidvoice-worker")]
    worker_bin: PathBuf,

    /// Unix socket path used to talk to the transcription worker.
    #[arg(long = "worker-socket", default_value = "/tmp/fluidvoice-worker.sock")]
    worker_socket: PathBuf,

    /// Override the vocabulary config path instead of the platform default.
    #[arg(long = "vocabulary")]
    vocabulary: Option<PathBuf>,
}

fn init_logging() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    tracing::info!("starting fluidvoice");

    let cli = Cli::parse();

    if cli.list_devices {
        let picker = DevicePicker::new();
        for device in picker.enumerate() {
            let default_marker = if device.is_default { " (default)" } else { "" };
            println!("- {} [{}]{}", device.name, device.uid, default_marker);
        }
        return Ok(());
    }

    let opts = AppOptions {
        forced_device_uid: cli.forced_device,
        enable_hotkey: !cli.no_hotkey,
        worker_bin: cli.worker_bin,
        socket_path: cli.worker_socket,
        vocabulary_path: cli.vocabulary,
    };

    let app = FluidVoiceApp::start(opts).await?;
    app.run_until_shutdown().await;

    tracing::info!("fluidvoice shut down");
    Ok(())
}
