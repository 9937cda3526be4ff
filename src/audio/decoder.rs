//! Audio decoding using symphonia
//!
//! Decodes audio files to mono f32 samples at the analysis sample rate.
//! Uses rubato for FFT-based resampling with proper anti-aliasing.

use crate::error::{Result, TunesmithError};
use crate::types::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Target sample rate for analysis (22050 Hz)
///
/// Sufficient for tempo, energy and chroma estimation (content < 11 kHz)
/// while halving the computation compared to 44.1 kHz
pub const TARGET_SAMPLE_RATE: u32 = 22050;

/// Maximum file size we'll attempt to decode (2GB).
/// Prevents OOM on extremely large files.
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Decode an audio file to a mono AudioBuffer at [`TARGET_SAMPLE_RATE`]
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TunesmithError::decode_error(path, format!("failed to read file metadata: {e}")))?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(TunesmithError::decode_error(
            path,
            format!(
                "file too large ({:.1} GB), maximum supported size is 2 GB",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| TunesmithError::decode_error(path, format!("failed to open file: {e}")))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Hint the probe with the file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| TunesmithError::decode_error(path, format!("failed to probe format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| TunesmithError::decode_error(path, "no audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    debug!(
        "Decoding {} @ {}Hz, {} channels",
        path.display(),
        source_sample_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| TunesmithError::decode_error(path, format!("failed to create decoder: {e}")))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // end of stream
            }
            Err(e) => {
                return Err(TunesmithError::decode_error(
                    path,
                    format!("failed to read packet: {e}"),
                ));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(TunesmithError::decode_error(path, format!("decode error: {e}")));
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        all_samples.extend(mix_to_mono(sample_buf.samples(), channels));
    }

    let final_samples = if source_sample_rate != TARGET_SAMPLE_RATE {
        resample(&all_samples, source_sample_rate, TARGET_SAMPLE_RATE)
    } else {
        all_samples
    };

    debug!(
        "Decoded {} samples ({:.2}s)",
        final_samples.len(),
        final_samples.len() as f64 / TARGET_SAMPLE_RATE as f64
    );

    Ok(AudioBuffer::new(final_samples, TARGET_SAMPLE_RATE))
}

/// Average interleaved multi-channel audio down to mono
fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// FFT-based resampling with an anti-aliasing filter.
///
/// Aliasing artifacts would leak into the spectral descriptors and the
/// chroma bins, so plain decimation is not an option here. Falls back to
/// linear interpolation only if rubato refuses the rate pair.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    const CHUNK_SIZE: usize = 1024;

    let mut resampler = match FftFixedInOut::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        1, // mono
    ) {
        Ok(r) => r,
        Err(e) => {
            debug!("Rubato initialization failed ({}), using linear fallback", e);
            return resample_linear_fallback(samples, from_rate, to_rate);
        }
    };

    let input_frames_per_chunk = resampler.input_frames_next();
    let output_frames_per_chunk = resampler.output_frames_next();

    let ratio = to_rate as f64 / from_rate as f64;
    let mut output = Vec::with_capacity((samples.len() as f64 * ratio).ceil() as usize);

    let mut pos = 0;
    while pos < samples.len() {
        let end = (pos + input_frames_per_chunk).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();

        // Zero-pad the final partial chunk
        if chunk.len() < input_frames_per_chunk {
            chunk.resize(input_frames_per_chunk, 0.0);
        }

        let input_channels = vec![chunk];

        match resampler.process(&input_channels, None) {
            Ok(resampled) => {
                if let Some(channel) = resampled.first() {
                    // Trim the output of the padded final chunk to the
                    // samples that correspond to real input
                    let valid_samples = if pos + input_frames_per_chunk > samples.len() {
                        let input_valid = samples.len() - pos;
                        let output_valid = (input_valid as f64 * ratio).ceil() as usize;
                        output_valid.min(output_frames_per_chunk)
                    } else {
                        output_frames_per_chunk
                    };
                    let safe_samples = valid_samples.min(channel.len());
                    output.extend_from_slice(&channel[..safe_samples]);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), using fallback for remaining", e);
                output.extend(resample_linear_fallback(&samples[pos..], from_rate, to_rate));
                break;
            }
        }

        pos += input_frames_per_chunk;
    }

    output
}

/// Linear-interpolation resampler, used only when rubato is unavailable
fn resample_linear_fallback(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < samples.len() {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };

        output.push(sample);
    }

    output
}
