// crates/livecut-media/src/decode.rs
//
// FileVideoReader: sequential decode of a video file to packed RGB frames at
// a fixed output size. No seeking — the file-video source paces itself
// against the file's declared frame rate and only ever moves forward.

use std::path::{Path, PathBuf};

use anyhow::Result;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};

use livecut_core::frame::VideoFrame;

/// Fallback when the container doesn't declare a frame rate.
const DEFAULT_FRAME_RATE: f64 = 30.0;

pub struct FileVideoReader {
    pub path: PathBuf,
    ictx:       ffmpeg::format::context::Input,
    decoder:    ffmpeg::decoder::video::Video,
    video_idx:  usize,
    scaler:     SwsContext,
    out_w:      u32,
    out_h:      u32,
    frame_rate: f64,
    seq:        u64,
}

impl FileVideoReader {
    pub fn open(path: &Path, out_w: u32, out_h: u32) -> Result<Self> {
        let ictx = input(path)?;
        let stream = ictx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| anyhow::anyhow!("no video stream in {}", path.display()))?;
        let video_idx = stream.index();

        let rate = stream.avg_frame_rate();
        let frame_rate = if rate.denominator() > 0 && rate.numerator() > 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            DEFAULT_FRAME_RATE
        };

        let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = dec_ctx.decoder().video()?;

        let scaler = SwsContext::get(
            decoder.format(), decoder.width(), decoder.height(),
            Pixel::RGB24, out_w, out_h, Flags::AREA,
        )?;

        eprintln!(
            "[vfile] opened {} ({}x{} @ {frame_rate:.2} fps)",
            path.display(),
            decoder.width(),
            decoder.height(),
        );

        Ok(Self {
            path: path.to_path_buf(),
            ictx,
            decoder,
            video_idx,
            scaler,
            out_w,
            out_h,
            frame_rate,
            seq: 0,
        })
    }

    /// The container's declared frame rate — the authoritative clock for
    /// pacing this file.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Decode the next frame, scaled to the output size. `None` at EOF.
    pub fn next_frame(&mut self) -> Option<VideoFrame> {
        for result in self.ictx.packets() {
            let Ok((stream, packet)) = result else { continue };
            if stream.index() != self.video_idx {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::util::frame::video::Video::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = ffmpeg::util::frame::video::Video::empty();
                if self.scaler.run(&decoded, &mut rgb).is_err() {
                    return None;
                }
                // Destripe: copy only visible pixels, not stride padding.
                let stride = rgb.stride(0);
                let raw    = rgb.data(0);
                let row_bytes = self.out_w as usize * 3;
                let data: Vec<u8> = (0..self.out_h as usize)
                    .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
                    .copied()
                    .collect();
                self.seq += 1;
                return Some(VideoFrame {
                    width:  self.out_w,
                    height: self.out_h,
                    data,
                    seq: self.seq,
                });
            }
        }
        None
    }
}
