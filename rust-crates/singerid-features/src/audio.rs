//! Audio decoding and resampling
//!
//! Turns an uploaded file into mono `f32` samples at the pipeline sample
//! rate. WAV goes through `hound`; everything else is detected by content
//! with Symphonia, so an MP3 saved under a `.wav` name still decodes.

use std::fs::File;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

use crate::error::{FeatureError, Result};

/// Frames fed to the sinc resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode `path` to mono and resample it to `target_rate`.
pub fn load_audio<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<AudioSignal> {
    let path = path.as_ref();

    let (samples, source_rate) = match load_wav(path) {
        Ok(decoded) => decoded,
        Err(wav_err) => {
            debug!("Not a PCM WAV ({}), probing content", wav_err);
            load_with_symphonia(path).map_err(|e| match e {
                FeatureError::Decode(msg) => FeatureError::decode(format!(
                    "{}: {} (WAV reader: {})",
                    path.display(),
                    msg,
                    wav_err
                )),
                other => other,
            })?
        }
    };

    if samples.is_empty() {
        return Err(FeatureError::decode(format!(
            "{}: audio stream contains no samples",
            path.display()
        )));
    }

    let samples = resample(&samples, source_rate, target_rate)?;
    let signal = AudioSignal::new(samples, target_rate);
    info!(
        "Decoded {}: {} samples at {} Hz ({:.2}s)",
        path.display(),
        signal.len(),
        signal.sample_rate,
        signal.duration_secs()
    );
    Ok(signal)
}

/// Load a WAV file as mono samples at its native rate.
fn load_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)
        .map_err(|e| FeatureError::decode(format!("Failed to open WAV: {}", e)))?;

    let spec = reader.spec();
    debug!(
        "WAV: {} Hz, {} channels, {} bits, {:?}",
        spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
    );

    if spec.channels == 0 {
        return Err(FeatureError::decode("WAV declares zero channels"));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FeatureError::decode(format!("Failed to read samples: {}", e)))?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(FeatureError::decode(format!(
                    "Unsupported bit depth: {}",
                    spec.bits_per_sample
                )));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| FeatureError::decode(format!("Failed to read samples: {}", e)))?
        }
    };

    Ok((downmix(samples, spec.channels as usize), spec.sample_rate))
}

/// Load audio using Symphonia (MP3 and anything else it recognises).
fn load_with_symphonia(path: &Path) -> Result<(Vec<f32>, u32)> {
    let file = File::open(path)
        .map_err(|e| FeatureError::decode(format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| FeatureError::decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FeatureError::decode("No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| FeatureError::decode(format!("Failed to create decoder: {}", e)))?;

    let mut interleaved = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(FeatureError::decode(format!(
                    "Failed to read packet: {}",
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(e) => return Err(FeatureError::decode(format!("Failed to decode: {}", e))),
        };

        let spec = *decoded.spec();
        sample_rate = Some(spec.rate);
        channels = spec.channels.count();

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
        });
        if buf.capacity() < decoded.capacity() * channels {
            *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        }
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    let sample_rate =
        sample_rate.ok_or_else(|| FeatureError::decode("Could not determine sample rate"))?;
    if channels == 0 {
        return Err(FeatureError::decode("Could not determine channel count"));
    }

    debug!(
        "Symphonia decoded {} interleaved samples: {} Hz, {} channels",
        interleaved.len(),
        sample_rate,
        channels
    );

    Ok((downmix(interleaved, channels), sample_rate))
}

/// Average interleaved channels into one.
pub fn downmix(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Band-limited resampling of a mono signal.
///
/// Output length is `ceil(len * to_rate / from_rate)`; an event at input
/// sample `p` lands at output sample `p * to_rate / from_rate`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(FeatureError::resample("Sample rate cannot be zero"));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    info!("Resampling from {} Hz to {} Hz", from_rate, to_rate);

    let ratio = to_rate as f64 / from_rate as f64;
    let expected_len = (samples.len() as f64 * ratio).ceil() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| FeatureError::resample(format!("Failed to create resampler: {:?}", e)))?;

    let mut output = Vec::with_capacity(expected_len + RESAMPLE_CHUNK);

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= samples.len() {
        let n = resampler.input_frames_next();
        let wave_in: [&[f32]; 1] = [&samples[pos..pos + n]];
        let chunk = resampler
            .process(&wave_in[..], None)
            .map_err(|e| FeatureError::resample(format!("Resampling failed: {:?}", e)))?;
        output.extend_from_slice(&chunk[0]);
        pos += n;
    }

    if pos < samples.len() {
        let wave_in: [&[f32]; 1] = [&samples[pos..]];
        let chunk = resampler
            .process_partial(Some(&wave_in[..]), None)
            .map_err(|e| FeatureError::resample(format!("Resampling failed: {:?}", e)))?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the filter tail
    while output.len() < expected_len {
        let chunk = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| FeatureError::resample(format!("Resampling failed: {:?}", e)))?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    output.resize(expected_len, 0.0);
    Ok(output)
}
