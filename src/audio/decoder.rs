//! Audio decoding using symphonia
//!
//! Decodes audio files to the FIRST channel only, as f32 at the source sample
//! rate. The analyzers never resample, so the decoder doesn't either.

use crate::error::{AnalyzeError, Result};
use crate::types::AudioBuffer;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Maximum file size we'll attempt to decode (2GB)
/// Prevents OOM on extremely large files
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Decode an audio file to a mono AudioBuffer (first channel)
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AnalyzeError::FileNotFound(path.to_path_buf())
        } else {
            AnalyzeError::decode_error(path, format!("Failed to read file metadata: {}", e))
        }
    })?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(AnalyzeError::decode_error(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| AnalyzeError::decode_error(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Provide a hint based on file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AnalyzeError::decode_error(path, format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalyzeError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AnalyzeError::decode_error(path, "Unknown sample rate"))?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1).max(1);
    let container_frames = codec_params.n_frames;

    debug!(
        "Decoding: {} @ {}Hz, {} channels (analysing channel 0)",
        path.display(),
        sample_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AnalyzeError::decode_error(path, format!("Failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // End of stream
            }
            Err(e) => {
                return Err(AnalyzeError::decode_error(path, format!("Failed to read packet: {}", e)));
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(AnalyzeError::decode_error(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend(first_channel(sample_buf.samples(), spec.channels.count()));
    }

    if samples.is_empty() {
        return Err(AnalyzeError::decode_error(path, "File contains no audio samples"));
    }

    let duration = track_duration(samples.len(), container_frames, sample_rate);
    debug!("Decoded {} samples ({:.2}s)", samples.len(), duration);

    Ok(AudioBuffer {
        samples,
        sample_rate,
        duration,
    })
}

/// Take every `channels`-th sample starting at channel 0
fn first_channel(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved.iter().step_by(channels.max(1)).copied()
}

/// Duration from the container's frame count when it is known, else from the decoded length
fn track_duration(decoded_len: usize, container_frames: Option<u64>, sample_rate: u32) -> f64 {
    let frames = match container_frames {
        Some(n) if n > 0 => n,
        _ => decoded_len as u64,
    };
    frames as f64 / sample_rate as f64
}
