//! Local file frame source using FFmpeg.
//!
//! Decodes the best video stream and converts every frame to packed RGB24.

use ffmpeg_next as ffmpeg;

use crate::error::{Error, Result};
use crate::frame::{Frame, VideoMetadata};

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    metadata: VideoMetadata,
    frames_decoded: u64,
    /// EOF has been sent to the decoder; only buffered frames remain.
    draining: bool,
    finished: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().map_err(|e| Error::video_open(format!("initialize ffmpeg: {e}")))?;
        let input = ffmpeg::format::input(&path)
            .map_err(|e| Error::video_open(format!("failed to open '{path}': {e}")))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| Error::video_open(format!("'{path}' has no video track")))?;
        let stream_index = input_stream.index();

        let rate = input_stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let frame_count = input_stream.frames().max(0) as u64;

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|e| Error::video_open(format!("load video decoder parameters: {e}")))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| Error::video_open(format!("open ffmpeg video decoder: {e}")))?;

        let metadata = VideoMetadata::new(fps, decoder.width(), decoder.height(), frame_count);
        metadata.validate()?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| Error::video_open(format!("create ffmpeg scaler: {e}")))?;

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            metadata,
            frames_decoded: 0,
            draining: false,
            finished: false,
        })
    }

    pub(crate) fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return match self.convert(&decoded) {
                    Ok(frame) => {
                        self.frames_decoded += 1;
                        Ok(Some(frame))
                    }
                    Err(e) => Ok(self.stop(&e)),
                };
            }
            if self.draining {
                self.finished = true;
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        return Ok(self.stop(&format!("send packet to decoder: {e}")));
                    }
                }
                None => {
                    self.draining = true;
                    if let Err(e) = self.decoder.send_eof() {
                        return Ok(self.stop(&format!("flush decoder: {e}")));
                    }
                }
            }
        }
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        for (stream, packet) in self.input.packets() {
            if stream.index() == self.stream_index {
                return Some(packet);
            }
        }
        None
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> std::result::Result<Frame, String> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|e| format!("scale frame to RGB: {e}"))?;
        frame_to_image(&rgb_frame)
    }

    fn stop(&mut self, reason: &str) -> Option<Frame> {
        log::warn!(
            "FileSource: decode stopped for {} after {} frames: {}",
            self.path,
            self.frames_decoded,
            reason
        );
        self.finished = true;
        None
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> std::result::Result<Frame, String> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .ok_or_else(|| "ffmpeg frame row is out of bounds".to_string())?,
        );
    }

    Frame::from_raw(width, height, pixels)
        .ok_or_else(|| "decoded frame buffer has the wrong size".to_string())
}
