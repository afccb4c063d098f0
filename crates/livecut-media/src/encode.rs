// crates/livecut-media/src/encode.rs
//
// AviWriter: MPEG-4 video in an AVI container at a fixed frame rate — the
// persistent record of the elected program feed.
//
// PTS strategy: a monotonically increasing frame counter in 1/fps. The
// video-file sink re-writes its last frame to fill realtime gaps, so the
// counter IS wall-clock time and never needs rescaling against input PTS.
//
// Encoder ownership: the codec context is created independently of the
// output stream and its parameters are copied into the stream's codecpar via
// FFI — Stream does not expose a .codec() accessor in this version of
// ffmpeg-the-third.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, Id as CodecId};
use ffmpeg::encoder;
use ffmpeg::format::{output as open_output, Pixel};
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use livecut_core::frame::VideoFrame;

/// Target bitrate for the MPEG-4 encoder. Generous for 640×480; the AVI is
/// an intermediate that gets remuxed, not a delivery file.
const VIDEO_BIT_RATE: usize = 4_000_000;

pub struct AviWriter {
    path:     PathBuf,
    octx:     ffmpeg::format::context::Output,
    encoder:  ffmpeg::encoder::video::Video,
    scaler:   SwsContext,
    width:    u32,
    height:   u32,
    frame_tb: Rational,
    ost_tb:   Rational,
    frame_idx: i64,
}

impl AviWriter {
    pub fn create(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        let mut octx = open_output(path)
            .map_err(|e| anyhow!("open output '{}': {e}", path.display()))?;

        let mpeg4 = encoder::find(CodecId::MPEG4)
            .ok_or_else(|| anyhow!("MPEG-4 encoder not found"))?;

        let frame_tb = Rational::new(1, fps as i32);
        let mut ost = octx.add_stream(mpeg4)?;
        ost.set_time_base(frame_tb);

        let enc_ctx = codec::context::Context::new_with_codec(mpeg4);
        let mut enc = enc_ctx.encoder().video()?;
        enc.set_width(width);
        enc.set_height(height);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(frame_tb);
        enc.set_frame_rate(Some(Rational::new(fps as i32, 1)));
        enc.set_bit_rate(VIDEO_BIT_RATE);

        let video_encoder = enc
            .open_as_with(mpeg4, ffmpeg::Dictionary::new())
            .map_err(|e| anyhow!("open MPEG-4 encoder: {e}"))?;

        // Copy encoder params into the stream's codecpar so the muxer knows
        // resolution, format, and codec-private data.
        unsafe {
            let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
                video_encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
            );
            if ret < 0 {
                return Err(anyhow!("avcodec_parameters_from_context failed: {ret}"));
            }
        }

        let ost_tb = octx.stream(0).expect("stream 0 just added").time_base();

        octx.write_header()
            .map_err(|e| anyhow!("write AVI header: {e}"))?;

        let scaler = SwsContext::get(
            Pixel::RGB24, width, height,
            Pixel::YUV420P, width, height,
            Flags::BILINEAR,
        )?;

        eprintln!("[avi] recording {width}x{height} @ {fps} fps → {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            octx,
            encoder: video_encoder,
            scaler,
            width,
            height,
            frame_tb,
            ost_tb,
            frame_idx: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frame_idx as u64
    }

    /// Encode one frame. The frame must already be at the writer's
    /// dimensions — the sink resamples before calling.
    pub fn write(&mut self, frame: &VideoFrame) -> Result<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match writer {}x{}",
                frame.width, frame.height, self.width, self.height,
            ));
        }

        let mut rgb = ffmpeg::util::frame::video::Video::new(Pixel::RGB24, self.width, self.height);
        let stride = rgb.stride(0);
        let row_bytes = self.width as usize * 3;
        {
            let dst = rgb.data_mut(0);
            for row in 0..self.height as usize {
                dst[row * stride..row * stride + row_bytes]
                    .copy_from_slice(&frame.data[row * row_bytes..(row + 1) * row_bytes]);
            }
        }

        let mut yuv = ffmpeg::util::frame::video::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .map_err(|e| anyhow!("rgb→yuv conversion: {e}"))?;
        yuv.set_pts(Some(self.frame_idx));
        self.frame_idx += 1;

        self.encoder
            .send_frame(&yuv)
            .map_err(|e| anyhow!("send frame to encoder: {e}"))?;
        self.drain_packets()
    }

    /// Flush the encoder and write the container trailer.
    pub fn finish(mut self) -> Result<()> {
        self.encoder.send_eof().map_err(|e| anyhow!("send EOF: {e}"))?;
        self.drain_packets()?;
        self.octx
            .write_trailer()
            .map_err(|e| anyhow!("write AVI trailer: {e}"))?;
        eprintln!("[avi] {} frames finalized → {}", self.frame_idx, self.path.display());
        Ok(())
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(self.frame_tb, self.ost_tb);
            pkt.write_interleaved(&mut self.octx)
                .map_err(|e| anyhow!("write packet: {e}"))?;
        }
        Ok(())
    }
}
