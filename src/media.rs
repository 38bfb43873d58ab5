//! FFmpeg-backed video access.
//!
//! [`VideoFile`] opens a video, caches its stream properties, and implements
//! [`FrameDecoder`] on top of the FFmpeg demuxer/decoder: sequential
//! interval sampling (decode everything, convert only the sampled frames)
//! and targeted seek-and-decode for precomputed keyframe lists.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    conversion,
    decoder::{FrameDecoder, FrameSink},
    error::SiftError,
};

/// Stream properties extracted once at open time.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (may be approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Total number of frames, from the stream header when available,
    /// otherwise estimated from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Total duration of the media file.
    pub duration: Duration,
    /// Container format name (e.g. `"mp4"`, `"matroska"`).
    pub format: String,
}

/// An opened video file.
///
/// Created via [`VideoFile::open`]. Holds the demuxer context and cached
/// [`VideoInfo`]; decoding state (decoder, scaler) is created per
/// operation, so the same `VideoFile` can be reused across scene detection
/// and frame extraction.
pub struct VideoFile {
    pub(crate) input: Input,
    pub(crate) video_stream_index: usize,
    pub(crate) info: VideoInfo,
    pub(crate) path: PathBuf,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("path", &self.path)
            .field("info", &self.info)
            .field("video_stream_index", &self.video_stream_index)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, locates the best
    /// video stream, and caches its properties.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::FileOpen`] if the file cannot be opened, or
    /// [`SiftError::NoVideoStream`] if it has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SiftError> {
        let path = path.as_ref().to_path_buf();

        log::debug!("Opening video file: {}", path.display());

        ffmpeg_next::init().map_err(|error| SiftError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| SiftError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(SiftError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let duration_microseconds = input.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let codec_parameters = stream.parameters();
        let decoder_context =
            CodecContext::from_parameters(codec_parameters).map_err(|error| {
                SiftError::FileOpen {
                    path: path.clone(),
                    reason: format!("Failed to read video codec parameters: {error}"),
                }
            })?;
        let video_decoder =
            decoder_context
                .decoder()
                .video()
                .map_err(|error| SiftError::FileOpen {
                    path: path.clone(),
                    reason: format!("Failed to create video decoder: {error}"),
                })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        // Prefer the container's frame count; fall back to duration × rate.
        let frame_count = if stream.frames() > 0 {
            stream.frames() as u64
        } else if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let codec = video_decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let info = VideoInfo {
            width: video_decoder.width(),
            height: video_decoder.height(),
            frames_per_second,
            frame_count,
            codec,
            duration,
            format: input.format().name().to_string(),
        };

        log::info!(
            "Opened {}: {}x{}, {:.2} fps, ~{} frames, codec={}, format={}",
            path.display(),
            info.width,
            info.height,
            info.frames_per_second,
            info.frame_count,
            info.codec,
            info.format,
        );

        Ok(Self {
            input,
            video_stream_index,
            info,
            path,
        })
    }

    /// Get the cached stream properties.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The video's name — the file stem of the opened path.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }

    /// Create a fresh decoder and RGB24 scaler for the video stream.
    fn open_decoder(&self) -> Result<(VideoDecoder, ScalingContext), SiftError> {
        let stream = self
            .input
            .stream(self.video_stream_index)
            .ok_or(SiftError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().video()?;

        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            self.info.width,
            self.info.height,
            ScalingFlags::BILINEAR,
        )?;

        Ok((decoder, scaler))
    }

    /// Scale a decoded frame to RGB24 and copy it into an [`RgbImage`].
    fn convert_frame(
        &self,
        scaler: &mut ScalingContext,
        decoded: &VideoFrame,
        scaled: &mut VideoFrame,
    ) -> Result<RgbImage, SiftError> {
        scaler.run(decoded, scaled)?;
        let buffer = conversion::frame_to_rgb_buffer(scaled, self.info.width, self.info.height);
        RgbImage::from_raw(self.info.width, self.info.height, buffer).ok_or_else(|| {
            SiftError::VideoDecode("Failed to construct RGB image from decoded frame".to_string())
        })
    }
}

impl FrameDecoder for VideoFile {
    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn frames_per_second(&self) -> f64 {
        self.info.frames_per_second
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    /// Sequential interval sampling.
    ///
    /// Every packet is decoded to keep the stream consistent, but frames
    /// between sample points are never scaled or copied out — that is
    /// where the per-frame cost is, so high intervals stay cheap.
    fn for_each_sampled(
        &mut self,
        interval: u64,
        limit: Option<u64>,
        sink: FrameSink<'_>,
    ) -> Result<(), SiftError> {
        if interval == 0 {
            return Err(SiftError::InvalidInterval);
        }

        // Rewind in case the demuxer was already consumed (e.g. by scene
        // detection on the same handle).
        let _ = self.input.seek(0, ..0);

        let (mut decoder, mut scaler) = self.open_decoder()?;
        let mut decoded = VideoFrame::empty();
        let mut scaled = VideoFrame::empty();
        let mut frame_number: u64 = 0;

        log::debug!(
            "Sampling every {interval} frame(s) from {} (limit={limit:?})",
            self.path.display()
        );

        let mut packet = Packet::empty();
        'demux: loop {
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() as usize != self.video_stream_index {
                        continue;
                    }
                    if let Err(error) = decoder.send_packet(&packet) {
                        // A corrupt packet loses its frames but not the video.
                        log::warn!("Skipping undecodable packet near frame {frame_number}: {error}");
                        continue;
                    }
                    while decoder.receive_frame(&mut decoded).is_ok() {
                        if let Some(limit) = limit
                            && frame_number >= limit
                        {
                            break 'demux;
                        }
                        if frame_number % interval == 0 {
                            let image = self.convert_frame(&mut scaler, &decoded, &mut scaled)?;
                            sink(frame_number, image)?;
                        }
                        frame_number += 1;
                    }
                }
                Err(FfmpegError::Eof) => break,
                Err(error) => {
                    // Treat a demux read error like an early end of stream;
                    // whatever is buffered still gets flushed below.
                    log::warn!("Packet read error near frame {frame_number}: {error}");
                    break;
                }
            }
        }

        // Flush the decoder.
        let _ = decoder.send_eof();
        while decoder.receive_frame(&mut decoded).is_ok() {
            if let Some(limit) = limit
                && frame_number >= limit
            {
                break;
            }
            if frame_number % interval == 0 {
                let image = self.convert_frame(&mut scaler, &decoded, &mut scaled)?;
                sink(frame_number, image)?;
            }
            frame_number += 1;
        }

        Ok(())
    }

    /// Targeted extraction: seek to each requested frame and decode forward
    /// until it (or the nearest following frame) is reached.
    ///
    /// Individual seek/decode failures are logged and skipped so a damaged
    /// region of the file never sinks the whole extraction.
    fn for_each_at(
        &mut self,
        frame_numbers: &[u64],
        sink: FrameSink<'_>,
    ) -> Result<(), SiftError> {
        if frame_numbers.is_empty() {
            return Ok(());
        }

        let fps = self.info.frames_per_second;
        let time_base = self
            .input
            .stream(self.video_stream_index)
            .ok_or(SiftError::NoVideoStream)?
            .time_base();
        let (mut decoder, mut scaler) = self.open_decoder()?;
        let mut decoded = VideoFrame::empty();
        let mut scaled = VideoFrame::empty();

        for &target in frame_numbers {
            let seek_timestamp = conversion::frame_number_to_seek_timestamp(target, fps);
            if let Err(error) = self.input.seek(seek_timestamp, ..seek_timestamp) {
                log::warn!("Seek to frame {target} failed, skipping: {error}");
                continue;
            }
            decoder.flush();

            let mut delivered = false;
            let mut packet = Packet::empty();
            'decode: loop {
                match packet.read(&mut self.input) {
                    Ok(()) => {
                        if packet.stream() as usize != self.video_stream_index {
                            continue;
                        }
                        if let Err(error) = decoder.send_packet(&packet) {
                            log::warn!("Decode error near frame {target}, skipping: {error}");
                            break 'decode;
                        }
                        while decoder.receive_frame(&mut decoded).is_ok() {
                            let pts = decoded.pts().unwrap_or(0);
                            let current =
                                conversion::pts_to_frame_number(pts, time_base, fps);
                            if current >= target {
                                if current > target {
                                    log::debug!(
                                        "Frame {target} not exactly reachable, using frame {current}"
                                    );
                                }
                                let image =
                                    self.convert_frame(&mut scaler, &decoded, &mut scaled)?;
                                sink(current, image)?;
                                delivered = true;
                                break 'decode;
                            }
                        }
                    }
                    Err(FfmpegError::Eof) => break 'decode,
                    Err(error) => {
                        log::warn!("Packet read error near frame {target}, skipping: {error}");
                        break 'decode;
                    }
                }
            }

            if !delivered {
                log::warn!("Could not decode frame {target}, skipping");
            }
        }

        Ok(())
    }
}
