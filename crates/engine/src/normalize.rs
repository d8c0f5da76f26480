//! Audio normalization
//!
//! Before an attempt is dispatched, the payload is checked against the
//! candidate provider's accepted formats. Compatible audio passes through
//! untouched. WAV input is transcoded (mono downmix, resample to the
//! provider's preferred rate, PCM16) when needed. Anything the engine
//! cannot convert is forwarded as-is: conversion failure is never fatal.
//! The provider gets to reject the bytes itself, and that rejection is an
//! ordinary fallback failure.

use std::io::Cursor;
use voice_orch_core::{detect_format, AudioFormat, Capabilities};

/// Result of a normalization pass
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    pub bytes: Vec<u8>,
    /// Format of `bytes` after normalization
    pub format: AudioFormat,
    /// Whether a transcode actually happened
    pub converted: bool,
}

#[derive(Debug, Default, Clone)]
pub struct AudioNormalizer;

impl AudioNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize `audio` for a provider with the given capabilities.
    pub fn normalize(&self, audio: &[u8], caps: &Capabilities) -> NormalizedAudio {
        let detected = detect_format(audio);

        let rate_ok = match (detected, caps.preferred_sample_rate) {
            (AudioFormat::Wav, Some(rate)) => wav_sample_rate(audio) == Some(rate),
            _ => true,
        };

        if caps.supports_format(detected) && rate_ok {
            return NormalizedAudio {
                bytes: audio.to_vec(),
                format: detected,
                converted: false,
            };
        }

        // Only WAV can be decoded here; compressed containers are forwarded
        // for the provider to accept or reject.
        if detected == AudioFormat::Wav
            && (caps.supports_format(AudioFormat::Wav) || caps.supports_format(AudioFormat::Pcm16))
        {
            match self.transcode_wav(audio, caps) {
                Ok(normalized) => return normalized,
                Err(err) => {
                    tracing::warn!(
                        format = %detected,
                        error = %err,
                        "audio conversion failed, forwarding original bytes"
                    );
                }
            }
        } else if !caps.supports_format(detected) {
            tracing::warn!(
                format = %detected,
                "provider does not accept this format and no conversion path exists, \
                 forwarding original bytes"
            );
        }

        NormalizedAudio {
            bytes: audio.to_vec(),
            format: detected,
            converted: false,
        }
    }

    /// Decode WAV, downmix to mono, resample, re-encode as PCM16 WAV (or
    /// raw PCM16 when that is the only thing the provider takes).
    fn transcode_wav(&self, audio: &[u8], caps: &Capabilities) -> Result<NormalizedAudio, String> {
        let mut reader =
            hound::WavReader::new(Cursor::new(audio)).map_err(|e| e.to_string())?;
        let spec = reader.spec();

        let mut samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| e.to_string())?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max))
                    .collect::<Result<_, _>>()
                    .map_err(|e| e.to_string())?
            }
        };

        if spec.channels > 1 {
            samples = downmix_mono(&samples, spec.channels as usize);
        }

        let target_rate = caps.preferred_sample_rate.unwrap_or(spec.sample_rate);
        if spec.sample_rate != target_rate {
            samples = resample(&samples, spec.sample_rate, target_rate)?;
        }

        let pcm16: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();

        if caps.supports_format(AudioFormat::Wav) {
            let out_spec = hound::WavSpec {
                channels: 1,
                sample_rate: target_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut out = Cursor::new(Vec::new());
            {
                let mut writer =
                    hound::WavWriter::new(&mut out, out_spec).map_err(|e| e.to_string())?;
                for s in &pcm16 {
                    writer.write_sample(*s).map_err(|e| e.to_string())?;
                }
                writer.finalize().map_err(|e| e.to_string())?;
            }
            Ok(NormalizedAudio {
                bytes: out.into_inner(),
                format: AudioFormat::Wav,
                converted: true,
            })
        } else {
            Ok(NormalizedAudio {
                bytes: pcm16.iter().flat_map(|s| s.to_le_bytes()).collect(),
                format: AudioFormat::Pcm16,
                converted: true,
            })
        }
    }
}

/// Sample rate from a WAV header without a full decode
fn wav_sample_rate(audio: &[u8]) -> Option<u32> {
    hound::WavReader::new(Cursor::new(audio))
        .ok()
        .map(|r| r.spec().sample_rate)
}

/// Duration of a WAV payload from its header, without a full decode.
/// `None` for anything that is not parseable WAV.
pub fn wav_duration(audio: &[u8]) -> Option<std::time::Duration> {
    hound::WavReader::new(Cursor::new(audio)).ok().map(|r| {
        let frames = r.duration();
        std::time::Duration::from_secs_f64(f64::from(frames) / f64::from(r.spec().sample_rate))
    })
}

fn downmix_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// FFT resampler with a linear-interpolation fallback for very short input
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, String> {
    use rubato::{FftFixedIn, Resampler};

    if samples.len() < 64 {
        return Ok(resample_linear(samples, from_rate, to_rate));
    }

    let chunk_size = samples.len().min(1024);
    let mut resampler = FftFixedIn::<f64>::new(
        from_rate as usize,
        to_rate as usize,
        chunk_size,
        2,
        1,
    )
    .map_err(|e| e.to_string())?;

    let mut output = Vec::new();
    let samples_f64: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    for chunk in samples_f64.chunks(chunk_size) {
        let frame = if chunk.len() == chunk_size {
            chunk.to_vec()
        } else {
            // Zero-pad the tail chunk to the fixed input size
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            padded
        };
        let processed = resampler
            .process(&[frame], None)
            .map_err(|e| e.to_string())?;
        output.extend(processed[0].iter().map(|&s| s as f32));
    }
    Ok(output)
}

fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio) as usize;

    let mut resampled = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx_floor = src_idx.floor() as usize;
        let idx_ceil = (idx_floor + 1).min(samples.len().saturating_sub(1));
        let frac = (src_idx - idx_floor as f64) as f32;
        resampled.push(samples[idx_floor] * (1.0 - frac) + samples[idx_ceil] * frac);
    }
    resampled
}
