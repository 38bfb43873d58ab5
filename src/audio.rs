//! Audio extraction for the transcript pipeline.
//!
//! Transcription models want 16 kHz mono PCM; this module pulls the best
//! audio stream out of a video and writes it as a WAV file in that shape.
//! A strict first attempt fails on any decode error; a second, permissive
//! attempt tolerates damaged packets mid-stream. If both fail the video is
//! considered untranscribable.

use std::path::Path;

use ffmpeg_next::{
    ChannelLayout, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::{Sample, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    media::Type,
    software::resampling::Context as ResamplingContext,
};

use crate::error::SiftError;

/// Sample rate expected by speech-to-text models.
const STT_SAMPLE_RATE: u32 = 16_000;

/// Extract the best audio stream to a 16 kHz mono WAV file.
///
/// Tries a strict pass first; on failure, retries permissively (decode
/// errors are logged and skipped).
///
/// # Errors
///
/// Returns [`SiftError::NoAudioStream`] if the video has no audio, or
/// [`SiftError::AudioExtraction`] when both passes fail.
pub fn extract_audio_16k<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    output_path: Q,
) -> Result<(), SiftError> {
    let video_path = video_path.as_ref();
    let output_path = output_path.as_ref();

    match extract_wav(video_path, output_path, false) {
        Ok(()) => Ok(()),
        Err(SiftError::NoAudioStream) => Err(SiftError::NoAudioStream),
        Err(first) => {
            log::warn!(
                "Strict audio extraction failed for {} ({first}); retrying permissively",
                video_path.display(),
            );
            extract_wav(video_path, output_path, true).map_err(|second| {
                SiftError::AudioExtraction {
                    path: video_path.to_path_buf(),
                    reason: format!("strict attempt: {first}; permissive attempt: {second}"),
                }
            })
        }
    }
}

/// Decode → resample (16 kHz mono s16) → encode (pcm_s16le) → WAV.
fn extract_wav(video_path: &Path, output_path: &Path, permissive: bool) -> Result<(), SiftError> {
    ffmpeg_next::init().map_err(|error| SiftError::Ffmpeg(error.to_string()))?;

    let mut input =
        ffmpeg_next::format::input(&video_path).map_err(|error| SiftError::FileOpen {
            path: video_path.to_path_buf(),
            reason: error.to_string(),
        })?;

    let stream = input
        .streams()
        .best(Type::Audio)
        .ok_or(SiftError::NoAudioStream)?;
    let audio_stream_index = stream.index();

    log::debug!(
        "Extracting audio from {} (stream={audio_stream_index}, permissive={permissive})",
        video_path.display(),
    );

    let decoder_context = CodecContext::from_parameters(stream.parameters())?;
    let mut decoder = decoder_context
        .decoder()
        .audio()
        .map_err(|error| SiftError::AudioDecode(error.to_string()))?;

    let output_format = Sample::I16(SampleType::Packed);
    let output_layout = ChannelLayout::MONO;

    let output_codec = ffmpeg_next::encoder::find(Id::PCM_S16LE)
        .ok_or_else(|| SiftError::AudioEncode("pcm_s16le encoder not found".to_string()))?;

    let mut encoder_context = CodecContext::new()
        .encoder()
        .audio()
        .map_err(|error| SiftError::AudioEncode(error.to_string()))?;
    encoder_context.set_rate(STT_SAMPLE_RATE as i32);
    encoder_context.set_channel_layout(output_layout);
    encoder_context.set_format(output_format);
    let encoder_time_base = Rational(1, STT_SAMPLE_RATE as i32);
    encoder_context.set_time_base(encoder_time_base);

    let mut encoder = encoder_context
        .open_as(output_codec)
        .map_err(|error| SiftError::AudioEncode(error.to_string()))?;

    let mut output = ffmpeg_next::format::output_as(&output_path, "wav")
        .map_err(|error| SiftError::AudioEncode(error.to_string()))?;
    {
        let mut output_stream = output.add_stream(output_codec)?;
        output_stream.set_parameters(&encoder);
        output_stream.set_time_base(encoder_time_base);
    }
    output
        .write_header()
        .map_err(|error| SiftError::AudioEncode(error.to_string()))?;

    let mut resampler = ResamplingContext::get(
        decoder.format(),
        decoder.channel_layout(),
        decoder.rate(),
        output_format,
        output_layout,
        STT_SAMPLE_RATE,
    )
    .map_err(|error| SiftError::AudioEncode(error.to_string()))?;

    let mut decoded = AudioFrame::empty();
    let mut resampled = AudioFrame::empty();
    let mut encoded = Packet::empty();
    let mut samples_written: i64 = 0;

    for (stream, packet) in input.packets() {
        if stream.index() != audio_stream_index {
            continue;
        }

        if let Err(error) = decoder.send_packet(&packet) {
            if permissive {
                log::warn!("Skipping undecodable audio packet: {error}");
                continue;
            }
            return Err(SiftError::AudioDecode(error.to_string()));
        }

        while decoder.receive_frame(&mut decoded).is_ok() {
            resample_encode_write(
                &mut resampler,
                &mut encoder,
                &decoded,
                &mut resampled,
                &mut encoded,
                &mut samples_written,
                encoder_time_base,
                &mut output,
            )?;
        }
    }

    // Flush the decoder, then the encoder.
    let _ = decoder.send_eof();
    while decoder.receive_frame(&mut decoded).is_ok() {
        resample_encode_write(
            &mut resampler,
            &mut encoder,
            &decoded,
            &mut resampled,
            &mut encoded,
            &mut samples_written,
            encoder_time_base,
            &mut output,
        )?;
    }

    let _ = encoder.send_eof();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(0);
        encoded.rescale_ts(encoder_time_base, encoder_time_base);
        encoded
            .write_interleaved(&mut output)
            .map_err(|error| SiftError::AudioEncode(error.to_string()))?;
    }

    output
        .write_trailer()
        .map_err(|error| SiftError::AudioEncode(error.to_string()))?;

    log::info!(
        "Extracted {:.1}s of audio to {}",
        samples_written as f64 / STT_SAMPLE_RATE as f64,
        output_path.display(),
    );

    Ok(())
}

/// Resample one decoded frame, encode it, and write the packets out.
#[allow(clippy::too_many_arguments)]
fn resample_encode_write(
    resampler: &mut ResamplingContext,
    encoder: &mut ffmpeg_next::encoder::Audio,
    decoded: &AudioFrame,
    resampled: &mut AudioFrame,
    encoded: &mut Packet,
    samples_written: &mut i64,
    encoder_time_base: Rational,
    output: &mut ffmpeg_next::format::context::Output,
) -> Result<(), SiftError> {
    resampler
        .run(decoded, resampled)
        .map_err(|error| SiftError::AudioEncode(error.to_string()))?;

    resampled.set_pts(Some(*samples_written));
    *samples_written += resampled.samples() as i64;

    encoder
        .send_frame(resampled)
        .map_err(|error| SiftError::AudioEncode(error.to_string()))?;

    while encoder.receive_packet(encoded).is_ok() {
        encoded.set_stream(0);
        encoded.rescale_ts(encoder_time_base, encoder_time_base);
        encoded
            .write_interleaved(output)
            .map_err(|error| SiftError::AudioEncode(error.to_string()))?;
    }

    Ok(())
}
