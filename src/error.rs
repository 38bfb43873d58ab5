//! Error types for the `framesift` crate.
//!
//! This module defines [`SiftError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry enough context to diagnose
//! the problem without additional logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framesift` operations.
///
/// Every public method that can fail returns `Result<T, SiftError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SiftError {
    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The file does not contain an audio stream.
    #[error("No audio stream found in file")]
    NoAudioStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecode(String),

    /// Audio data could not be decoded during extraction.
    #[error("Failed to decode audio: {0}")]
    AudioDecode(String),

    /// Audio data could not be re-encoded to the WAV output.
    #[error("Failed to encode audio: {0}")]
    AudioEncode(String),

    /// Extracting the audio track failed after the permissive retry.
    #[error("Audio extraction failed for {path}: {reason}")]
    AudioExtraction {
        /// The video the audio was being extracted from.
        path: PathBuf,
        /// Why both attempts failed.
        reason: String,
    },

    /// The text-recognition collaborator reported an error.
    #[error("Text recognition failed: {0}")]
    Recognition(String),

    /// The transcription collaborator reported an error.
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// A sampling interval of zero was provided.
    #[error("Sampling interval must be greater than zero")]
    InvalidInterval,

    /// A pipeline channel closed before its producer was finished.
    #[error("Pipeline channel closed unexpectedly")]
    ChannelClosed,

    /// A background pipeline task failed to complete.
    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// The manifest document could not be serialized or parsed.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl From<FfmpegError> for SiftError {
    fn from(error: FfmpegError) -> Self {
        SiftError::Ffmpeg(error.to_string())
    }
}
