// crates/livecut-media/src/mux.rs
//
// Post-session container mux. Uses the ffmpeg CLI — stream copy with the
// session's A/V files needs no transcoding, and the CLI handles container
// quirks with no resampler fiddling.

use std::path::Path;

use anyhow::{bail, Result};

/// Mux the recorded video and audio into one container at `output`.
/// `-shortest` trims to the shorter stream; `-async 1 -vsync 1` lets ffmpeg
/// nudge the first audio timestamp into place.
pub fn join_audio_and_video(video: &Path, audio: &Path, output: &Path) -> Result<()> {
    let result = std::process::Command::new("ffmpeg")
        .args([
            "-y",
            "-i", video.to_string_lossy().as_ref(),
            "-i", audio.to_string_lossy().as_ref(),
            "-shortest",
            "-async", "1",
            "-vsync", "1",
            "-codec", "copy",
            output.to_string_lossy().as_ref(),
        ])
        .output();

    match result {
        Ok(out) if out.status.success() => {
            let bytes = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
            eprintln!("[mux] muxed ({bytes} bytes) → {}", output.display());
            Ok(())
        }
        Ok(out) => {
            let last = String::from_utf8_lossy(&out.stderr);
            bail!("ffmpeg mux failed: {}", last.lines().last().unwrap_or("unknown error"))
        }
        Err(e) => bail!("ffmpeg spawn failed: {e}"),
    }
}
