// crates/livecut-app/src/main.rs
//
// livecut — multi-camera auto-director.
//
// Wiring: config file → pipeline::build → StreamSelector running on its own
// thread → preview UI on the main thread (eframe owns it). On shutdown the
// selector returns the cut log, which lands next to the recordings, and the
// recordings are muxed into one container via the ffmpeg CLI.

mod app;
mod pipeline;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use livecut_core::config::Config;
use livecut_core::edl::CutLog;

#[derive(Parser)]
#[command(name = "livecut", about = "Real-time multi-camera auto-director")]
struct Cli {
    /// Path to the session config (JSON).
    #[arg(long, default_value = "livecut.json")]
    config: PathBuf,

    /// List audio devices and cameras, then exit.
    #[arg(long)]
    list_devices: bool,

    /// Run without the preview window.
    #[arg(long)]
    headless: bool,

    /// Stop after this many seconds (headless mode only; otherwise Escape).
    #[arg(long)]
    duration: Option<f64>,
}

fn main() -> Result<()> {
    ffmpeg_the_third::init().context("FFmpeg init failed")?;

    let cli = Cli::parse();
    if cli.list_devices {
        livecut_media::devices::print_all();
        return Ok(());
    }

    let text = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("read config {}", cli.config.display()))?;
    let config = Config::from_json(&text).context("parse config")?;
    config.validate().context("validate config")?;

    let (preview_tx, preview_rx) = crossbeam_channel::bounded(64);
    let built = pipeline::build(&config, preview_tx)?;
    let video_out = built.video_out.clone();
    let audio_out = built.audio_out.clone();

    let halt = Arc::new(AtomicBool::new(false));
    let selector_halt = Arc::clone(&halt);
    let selector = built.selector;
    let selector_thread = std::thread::Builder::new()
        .name("selector".into())
        .spawn(move || selector.run(pipeline::SELECTOR_TICK, selector_halt))
        .context("spawn selector thread")?;

    if cli.headless {
        let deadline = cli.duration.map(|secs| Instant::now() + Duration::from_secs_f64(secs));
        eprintln!(
            "[app] headless session{}",
            cli.duration.map(|d| format!(" for {d:.1}s")).unwrap_or_default(),
        );
        while !halt.load(Ordering::Relaxed) && !selector_thread.is_finished() {
            if deadline.map(|d| Instant::now() >= d).unwrap_or(false) {
                halt.store(true, Ordering::Relaxed);
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    } else {
        let native_options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("livecut")
                .with_inner_size([1320.0, 560.0]),
            ..Default::default()
        };
        let ui_events = preview_rx;
        let ui_halt = Arc::clone(&halt);
        let outcome = eframe::run_native(
            "livecut",
            native_options,
            Box::new(move |_cc| Ok(Box::new(app::LivecutApp::new(ui_events, ui_halt)))),
        );
        halt.store(true, Ordering::Relaxed);
        if let Err(e) = outcome {
            eprintln!("[app] preview window error: {e}");
        }
    }

    halt.store(true, Ordering::Relaxed);
    let cut_log = selector_thread
        .join()
        .map_err(|_| anyhow::anyhow!("selector thread panicked"))??;

    write_cut_log(&cut_log, video_out.as_deref().unwrap_or(std::path::Path::new(".")));

    if let (Some(video), Some(audio)) = (video_out, audio_out) {
        let muxed = video.with_file_name(format!(
            "{}_final.avi",
            video.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default(),
        ));
        livecut_media::mux::join_audio_and_video(&video, &audio, &muxed)?;
    }

    eprintln!("[app] clean exit");
    Ok(())
}

/// Write the EDL next to the video output (or the working directory when
/// nothing was recorded).
fn write_cut_log(log: &CutLog, anchor: &std::path::Path) {
    if log.is_empty() {
        return;
    }
    let path = anchor.with_file_name("livecut_session.edl");
    match std::fs::write(&path, log.to_edl()) {
        Ok(()) => eprintln!("[app] cut log ({} events) → {}", log.events().len(), path.display()),
        Err(e) => eprintln!("[app] cut log write failed: {e}"),
    }
}
