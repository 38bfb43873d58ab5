//! The frame-decoder seam.
//!
//! [`FrameDecoder`] is the contract the pipeline's frame sources consume.
//! The FFmpeg-backed [`VideoFile`](crate::VideoFile) is the production
//! implementation; tests drive the pipeline with synthetic in-memory
//! decoders instead of fixture videos.

use image::RgbImage;

use crate::error::SiftError;

/// Callback receiving each decoded `(frame_number, image)` pair.
///
/// Returning an error stops decoding; sources use this to unwind when the
/// downstream channel has closed.
pub type FrameSink<'a> = &'a mut dyn FnMut(u64, RgbImage) -> Result<(), SiftError>;

/// Opens a fresh decoder on the thread that will drive it.
///
/// The factory crosses the thread boundary; the decoder it produces does
/// not.
pub type DecoderFactory = Box<dyn FnOnce() -> Result<Box<dyn FrameDecoder>, SiftError> + Send>;

/// Decoding operations the frame sources need from a video backend.
///
/// Implementations must tolerate non-monotonic seek targets in
/// [`for_each_at`](FrameDecoder::for_each_at) (callers sort, but the
/// contract does not depend on it beyond efficiency).
///
/// Decoders are not required to be [`Send`]: the pipeline constructs each
/// one *inside* the thread that uses it, via a [`DecoderFactory`] —
/// FFmpeg demuxer contexts do not travel between threads.
pub trait FrameDecoder {
    /// Estimated total number of frames in the video.
    fn frame_count(&self) -> u64;

    /// Frames per second (may be approximate for variable-frame-rate content).
    fn frames_per_second(&self) -> f64;

    /// Frame dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Decode the video sequentially, invoking `sink` for every
    /// `interval`-th frame (0, interval, 2·interval, …).
    ///
    /// Skipped frames must be advanced past as cheaply as the backend
    /// allows — decoded but never converted or copied. When `limit` is
    /// set, decoding stops once the frame counter reaches it.
    fn for_each_sampled(
        &mut self,
        interval: u64,
        limit: Option<u64>,
        sink: FrameSink<'_>,
    ) -> Result<(), SiftError>;

    /// Seek to and decode exactly the given frame numbers, invoking `sink`
    /// for each successfully decoded frame.
    ///
    /// `frame_numbers` should be sorted ascending. A seek or decode failure
    /// on a single frame is logged and skipped; it must not abort the
    /// remaining frames.
    fn for_each_at(&mut self, frame_numbers: &[u64], sink: FrameSink<'_>)
    -> Result<(), SiftError>;

    /// Decode a single frame.
    ///
    /// Used by the transcript-aligned workers, which fetch one frame per
    /// transcript segment.
    fn frame_at(&mut self, frame_number: u64) -> Result<RgbImage, SiftError> {
        let mut result = None;
        self.for_each_at(std::slice::from_ref(&frame_number), &mut |_, image| {
            result = Some(image);
            Ok(())
        })?;
        result.ok_or_else(|| {
            SiftError::VideoDecode(format!("Could not decode frame {frame_number}"))
        })
    }
}
