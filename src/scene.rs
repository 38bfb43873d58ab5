//! Scene segmentation.
//!
//! Detects shot boundaries with FFmpeg's `scdet` filter and converts the
//! cut positions into an ordered list of non-overlapping
//! [`SceneInterval`]s covering the video. A fast packet-keyframe mode
//! approximates boundaries on long videos without decoding.
//!
//! # Example
//!
//! ```no_run
//! use framesift::{SceneOptions, SiftError, VideoFile, detect_scenes};
//!
//! let mut video = VideoFile::open("input.mp4")?;
//! let scenes = detect_scenes(&mut video, &SceneOptions::new())?;
//! for scene in &scenes {
//!     println!("scene: frames {}..{}", scene.start, scene.end);
//! }
//! # Ok::<(), SiftError>(())
//! ```

use std::ffi::CStr;
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    filter::Graph as FilterGraph,
    frame::Video as VideoFrame,
};
use ffmpeg_sys_next::AVPixelFormat;

use crate::{conversion, error::SiftError, media::VideoFile};

/// A contiguous frame range between two detected cuts.
///
/// Intervals are half-open (`start..end`), ordered by `start`, and
/// non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneInterval {
    /// First frame of the scene (inclusive).
    pub start: u64,
    /// Frame after the last frame of the scene (exclusive).
    pub end: u64,
}

impl SceneInterval {
    /// Number of frames in the scene.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the interval contains no frames.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Strategy used for cut detection.
///
/// `Full` decodes frames through the `scdet` filter. `Keyframes` uses
/// packet-level keyframes as boundaries (very fast, approximate). `Auto`
/// picks based on stream length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneDetectionMode {
    /// Prefer keyframe boundaries on long videos, full analysis otherwise.
    #[default]
    Auto,
    /// Full decode + `scdet` filter.
    Full,
    /// Fast packet-level keyframe boundary detection.
    Keyframes,
}

/// Scene detection settings.
#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// Minimum `scdet` score (0–100) for a cut. Default: 30.0.
    pub threshold: f64,
    /// Minimum scene length in frames; cuts closer than this to the
    /// previous boundary are ignored. Default: 15.
    pub min_scene_len: u64,
    /// Detection strategy.
    pub mode: SceneDetectionMode,
    /// Optional maximum analysis duration from the start of the stream.
    pub max_duration: Option<Duration>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            threshold: 30.0,
            min_scene_len: 15,
            mode: SceneDetectionMode::Auto,
            max_duration: None,
        }
    }
}

impl SceneOptions {
    /// Create scene detection settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum cut score.
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the minimum scene length in frames.
    #[must_use]
    pub fn min_scene_len(mut self, frames: u64) -> Self {
        self.min_scene_len = frames;
        self
    }

    /// Set the detection strategy.
    #[must_use]
    pub fn mode(mut self, mode: SceneDetectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Limit analysis to the first `duration` of the video.
    #[must_use]
    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }
}

/// Detect scenes in the video.
///
/// Returns ordered, non-overlapping intervals that cover `0..frame_count`
/// (or the analysed prefix when `max_duration` is set).
pub fn detect_scenes(
    video: &mut VideoFile,
    options: &SceneOptions,
) -> Result<Vec<SceneInterval>, SiftError> {
    let frame_count = video.info.frame_count;

    let mode = match options.mode {
        SceneDetectionMode::Auto => {
            // Packet-level analysis is dramatically faster on long videos
            // and usually sufficient for sampling.
            if frame_count > 6_000 && options.max_duration.is_none() {
                SceneDetectionMode::Keyframes
            } else {
                SceneDetectionMode::Full
            }
        }
        mode => mode,
    };

    // The handle may have been used before; start from the beginning.
    let _ = video.input.seek(0, ..0);

    let mut cuts = match mode {
        SceneDetectionMode::Keyframes => detect_cuts_from_keyframes(video, options)?,
        _ => detect_cuts_scdet(video, options)?,
    };
    cuts.sort_unstable();
    cuts.dedup();

    let analysed_frames = match options.max_duration {
        Some(duration) => {
            let cap =
                conversion::duration_to_frame_number(duration, video.info.frames_per_second);
            if frame_count > 0 { cap.min(frame_count) } else { cap }
        }
        None => frame_count,
    };

    let intervals = intervals_from_cuts(&cuts, analysed_frames, options.min_scene_len);
    log::info!(
        "Detected {} scene(s) in {} ({} cut(s), mode {:?})",
        intervals.len(),
        video.path().display(),
        cuts.len(),
        mode,
    );
    Ok(intervals)
}

/// Convert ordered cut positions into non-overlapping scene intervals.
///
/// Cuts closer than `min_scene_len` to the previous accepted boundary are
/// dropped. A trailing remainder shorter than `min_scene_len` merges into
/// the last scene instead of forming its own.
pub fn intervals_from_cuts(
    cuts: &[u64],
    frame_count: u64,
    min_scene_len: u64,
) -> Vec<SceneInterval> {
    if frame_count == 0 {
        return Vec::new();
    }

    let mut intervals = Vec::new();
    let mut boundary: u64 = 0;

    for &cut in cuts {
        if cut >= frame_count {
            break;
        }
        if cut <= boundary || cut - boundary < min_scene_len {
            continue;
        }
        intervals.push(SceneInterval {
            start: boundary,
            end: cut,
        });
        boundary = cut;
    }

    if frame_count > boundary {
        let tail = frame_count - boundary;
        match intervals.last_mut() {
            Some(last) if tail < min_scene_len => last.end = frame_count,
            _ => intervals.push(SceneInterval {
                start: boundary,
                end: frame_count,
            }),
        }
    }

    intervals
}

/// Run the `scdet` filter over the decoded stream and collect cut frames.
fn detect_cuts_scdet(
    video: &mut VideoFile,
    options: &SceneOptions,
) -> Result<Vec<u64>, SiftError> {
    let stream_index = video.video_stream_index;
    let stream = video
        .input
        .stream(stream_index)
        .ok_or(SiftError::NoVideoStream)?;
    let time_base = stream.time_base();
    let fps = video.info.frames_per_second;

    let decoder_context = CodecContext::from_parameters(stream.parameters())?;
    let mut decoder = decoder_context.decoder().video()?;

    log::debug!(
        "Running scdet on stream {stream_index} (threshold={})",
        options.threshold
    );

    let max_pts = options
        .max_duration
        .map(|duration| conversion::duration_to_stream_timestamp(duration, time_base));

    let mut decoded = VideoFrame::empty();
    let mut filtered = VideoFrame::empty();

    // Decode the first frame to learn the real output pixel format — the
    // codec parameters can disagree with what the decoder actually emits,
    // and the buffer filter must match the frames it is fed.
    let mut probed_format: Option<i32> = None;
    'probe: for (stream, packet) in video.input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder
            .send_packet(&packet)
            .map_err(|e| SiftError::VideoDecode(e.to_string()))?;
        if decoder.receive_frame(&mut decoded).is_ok() {
            probed_format = Some(AVPixelFormat::from(decoded.format()) as i32);
            break 'probe;
        }
    }

    let pixel_format =
        probed_format.unwrap_or(AVPixelFormat::from(decoder.format()) as i32);

    // Colorspace and range are read from the raw frame; the safe enum
    // accessors share the discriminant mismatch that makes the format
    // probe necessary in the first place.
    let (color_space, color_range) = if probed_format.is_some() {
        unsafe {
            let ptr = decoded.as_ptr();
            ((*ptr).colorspace as i32, (*ptr).color_range as i32)
        }
    } else {
        (2, 0) // AVCOL_SPC_UNSPECIFIED, AVCOL_RANGE_UNSPECIFIED
    };

    let mut graph = build_scdet_graph(
        decoder.width(),
        decoder.height(),
        pixel_format,
        time_base.numerator(),
        time_base.denominator(),
        color_space,
        color_range,
        options.threshold,
    )?;

    let mut cuts: Vec<u64> = Vec::new();

    // Feed a decoded frame through the graph and harvest scored frames.
    let mut feed = |graph: &mut FilterGraph,
                    frame: &VideoFrame,
                    cuts: &mut Vec<u64>|
     -> Result<(), SiftError> {
        graph
            .get("in")
            .ok_or_else(|| SiftError::VideoDecode("Filter 'in' not found".to_string()))?
            .source()
            .add(frame)
            .map_err(|e| SiftError::VideoDecode(format!("Failed to feed filter: {e}")))?;

        while graph
            .get("out")
            .ok_or_else(|| SiftError::VideoDecode("Filter 'out' not found".to_string()))?
            .sink()
            .frame(&mut filtered)
            .is_ok()
        {
            if let Some(score) = scdet_score(&filtered)
                && score >= options.threshold
            {
                let pts = filtered.pts().unwrap_or(0);
                cuts.push(conversion::pts_to_frame_number(pts, time_base, fps));
            }
        }
        Ok(())
    };

    // The probe frame (and anything buffered behind it) goes first.
    if probed_format.is_some() {
        feed(&mut graph, &decoded, &mut cuts)?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            feed(&mut graph, &decoded, &mut cuts)?;
        }
    }

    for (stream, packet) in video.input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if let Some(max_pts) = max_pts
            && packet.pts().is_some_and(|pts| pts > max_pts)
        {
            break;
        }
        decoder
            .send_packet(&packet)
            .map_err(|e| SiftError::VideoDecode(e.to_string()))?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            if let Some(max_pts) = max_pts
                && decoded.pts().is_some_and(|pts| pts > max_pts)
            {
                return Ok(cuts);
            }
            feed(&mut graph, &decoded, &mut cuts)?;
        }
    }

    // Flush the decoder, then drain the graph.
    let _ = decoder.send_eof();
    while decoder.receive_frame(&mut decoded).is_ok() {
        if let Some(max_pts) = max_pts
            && decoded.pts().is_some_and(|pts| pts > max_pts)
        {
            break;
        }
        let _ = feed(&mut graph, &decoded, &mut cuts);
    }

    while graph
        .get("out")
        .map(|mut f| f.sink().frame(&mut filtered).is_ok())
        .unwrap_or(false)
    {
        if let Some(score) = scdet_score(&filtered)
            && score >= options.threshold
        {
            let pts = filtered.pts().unwrap_or(0);
            cuts.push(conversion::pts_to_frame_number(pts, time_base, fps));
        }
    }

    Ok(cuts)
}

/// Build the `buffer → scale → format → scdet → buffersink` graph.
///
/// The `format` filter pins everything to YUV420P so decoders that switch
/// pixel format mid-stream do not make the chain reject frames.
#[allow(clippy::too_many_arguments)]
fn build_scdet_graph(
    width: u32,
    height: u32,
    pixel_format: i32,
    time_base_num: i32,
    time_base_den: i32,
    color_space: i32,
    color_range: i32,
    threshold: f64,
) -> Result<FilterGraph, SiftError> {
    let mut graph = FilterGraph::new();

    let buffer_args = format!(
        "video_size={width}x{height}:pix_fmt={pixel_format}:time_base={time_base_num}/{time_base_den}:pixel_aspect=1/1:colorspace={color_space}:range={color_range}",
    );

    graph
        .add(
            &ffmpeg_next::filter::find("buffer").ok_or_else(|| {
                SiftError::VideoDecode("FFmpeg 'buffer' filter not found".to_string())
            })?,
            "in",
            &buffer_args,
        )
        .map_err(|e| SiftError::VideoDecode(format!("Failed to add buffer filter: {e}")))?;

    graph
        .add(
            &ffmpeg_next::filter::find("buffersink").ok_or_else(|| {
                SiftError::VideoDecode("FFmpeg 'buffersink' filter not found".to_string())
            })?,
            "out",
            "",
        )
        .map_err(|e| SiftError::VideoDecode(format!("Failed to add buffersink filter: {e}")))?;

    let chain = format!("scale=320:-1,format=pix_fmts=yuv420p,scdet=threshold={threshold}");
    graph
        .output("in", 0)
        .map_err(|e| SiftError::VideoDecode(format!("Filter graph output error: {e}")))?
        .input("out", 0)
        .map_err(|e| SiftError::VideoDecode(format!("Filter graph input error: {e}")))?
        .parse(&chain)
        .map_err(|e| SiftError::VideoDecode(format!("Filter graph parse error: {e}")))?;

    graph
        .validate()
        .map_err(|e| SiftError::VideoDecode(format!("Filter graph validation: {e}")))?;

    Ok(graph)
}

/// Approximate boundaries from packet keyframes without decoding.
fn detect_cuts_from_keyframes(
    video: &mut VideoFile,
    options: &SceneOptions,
) -> Result<Vec<u64>, SiftError> {
    let stream_index = video.video_stream_index;
    let time_base = video
        .input
        .stream(stream_index)
        .ok_or(SiftError::NoVideoStream)?
        .time_base();
    let fps = video.info.frames_per_second;

    let max_pts = options
        .max_duration
        .map(|duration| conversion::duration_to_stream_timestamp(duration, time_base));

    let mut cuts = Vec::new();
    let mut video_packets: u64 = 0;
    let mut packet = Packet::empty();

    loop {
        match packet.read(&mut video.input) {
            Ok(()) => {
                if packet.stream() as usize != stream_index {
                    continue;
                }
                if let Some(max_pts) = max_pts
                    && packet.pts().is_some_and(|pts| pts > max_pts)
                {
                    break;
                }
                // The first key packet is just the start of the stream.
                if packet.is_key() && video_packets > 0 {
                    let pts = packet.pts().unwrap_or(0);
                    cuts.push(conversion::pts_to_frame_number(pts, time_base, fps));
                }
                video_packets += 1;
            }
            Err(FfmpegError::Eof) => break,
            Err(error) => return Err(SiftError::from(error)),
        }
    }

    Ok(cuts)
}

/// Read the `lavfi.scd.score` metadata value from a filtered frame.
///
/// `scdet` sets this key only on frames it considers scene changes.
fn scdet_score(frame: &VideoFrame) -> Option<f64> {
    // SAFETY: per-frame metadata is only reachable through the raw
    // AVFrame; ffmpeg-next does not expose the dictionary.
    unsafe {
        let frame_ptr = frame.as_ptr();
        if frame_ptr.is_null() {
            return None;
        }

        let metadata = (*frame_ptr).metadata;
        if metadata.is_null() {
            return None;
        }

        let key = c"lavfi.scd.score";
        let entry = ffmpeg_sys_next::av_dict_get(metadata, key.as_ptr(), std::ptr::null(), 0);
        if entry.is_null() {
            return None;
        }

        let value_ptr = (*entry).value;
        if value_ptr.is_null() {
            return None;
        }

        CStr::from_ptr(value_ptr).to_str().ok()?.parse::<f64>().ok()
    }
}
