//! MPEG-4 video output using FFmpeg.
//!
//! Frames are converted from RGB24 to YUV420P and encoded at the source frame rate with one
//! tick per frame. The container is chosen from the output file extension.

use ffmpeg_next as ffmpeg;
use ffmpeg::util::format::pixel::Pixel;
use ffmpeg::Rational;

use super::FrameSink;
use crate::error::{Error, Result};
use crate::frame::{Frame, VideoMetadata};

pub struct FfmpegSink {
    path: String,
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    frames_written: i64,
    finished: bool,
}

fn write_err(context: &str, e: ffmpeg::Error) -> Error {
    Error::video_write(format!("{context}: {e}"))
}

impl FfmpegSink {
    pub fn create(path: &str, meta: &VideoMetadata) -> Result<Self> {
        ffmpeg::init().map_err(|e| write_err("initialize ffmpeg", e))?;
        let mut output = ffmpeg::format::output(&path)
            .map_err(|e| Error::video_write(format!("failed to create '{path}': {e}")))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| Error::video_write("MPEG-4 encoder is not available"))?;
        let mut stream = output
            .add_stream(codec)
            .map_err(|e| write_err("add output stream", e))?;
        let stream_index = stream.index();

        let fps = meta.effective_fps().round().max(1.0) as i32;
        let encoder_time_base = Rational::new(1, fps);

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| write_err("create video encoder", e))?;
        encoder.set_width(meta.width);
        encoder.set_height(meta.height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(Rational::new(fps, 1)));
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder
            .open_as(codec)
            .map_err(|e| write_err("open MPEG-4 encoder", e))?;
        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);

        output
            .write_header()
            .map_err(|e| write_err("write container header", e))?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|s| s.time_base())
            .unwrap_or(encoder_time_base);

        let scaler = ffmpeg::software::scaling::context::Context::get(
            Pixel::RGB24,
            meta.width,
            meta.height,
            Pixel::YUV420P,
            meta.width,
            meta.height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| write_err("create ffmpeg scaler", e))?;

        log::info!(
            "FfmpegSink: writing {} ({}x{} @ {} fps)",
            path,
            meta.width,
            meta.height,
            fps
        );

        Ok(Self {
            path: path.to_string(),
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width: meta.width,
            height: meta.height,
            frames_written: 0,
            finished: false,
        })
    }

    fn drain(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| write_err("write packet", e))?;
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(Error::video_write(format!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut rgb = ffmpeg::frame::Video::new(Pixel::RGB24, self.width, self.height);
        let row_bytes = self.width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data_mut(0);
        for (row, src) in frame.as_raw().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            data[start..start + row_bytes].copy_from_slice(src);
        }

        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .map_err(|e| write_err("convert frame to YUV", e))?;
        yuv.set_pts(Some(self.frames_written));
        self.encoder
            .send_frame(&yuv)
            .map_err(|e| write_err("encode frame", e))?;
        self.frames_written += 1;
        self.drain()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.encoder
            .send_eof()
            .map_err(|e| write_err("flush encoder", e))?;
        self.drain()?;
        self.output
            .write_trailer()
            .map_err(|e| write_err("write container trailer", e))?;
        log::info!(
            "FfmpegSink: finished {} ({} frames)",
            self.path,
            self.frames_written
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("FfmpegSink: {} dropped before finish; finalizing", self.path);
            if let Err(e) = self.finish() {
                log::warn!("FfmpegSink: finalize {} failed: {}", self.path, e);
            }
        }
    }
}
