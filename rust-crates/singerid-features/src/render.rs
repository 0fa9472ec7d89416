//! Spectrogram rendering
//!
//! Rasterises a decibel mel spectrogram the way a plotting library draws a
//! quadmesh with the axes switched off: time runs left to right over equal
//! frame columns, mel bands run bottom to top on a symmetric-log frequency
//! axis, and values go through the magma colour map scaled to the data
//! range. The result is saved as JPEG.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::config::FeatureConfig;
use crate::error::{FeatureError, Result};
use crate::mel::{mel_frequencies, MelSpectrogram};

/// Linear region of the frequency axis, in Hz
const SYMLOG_LINTHRESH: f64 = 1000.0;
/// Log base above the linear region
const SYMLOG_BASE: f64 = 2.0;
/// Width of the linear region relative to one decade of the log region
const SYMLOG_LINSCALE: f64 = 1.0;

/// Entries in the colour lookup table
pub const COLORMAP_SIZE: usize = 256;

/// 256-entry magma lookup table
#[derive(Debug, Clone)]
pub struct Colormap {
    lut: Vec<Rgb<u8>>,
}

impl Colormap {
    pub fn magma() -> Self {
        let lut = (0..COLORMAP_SIZE)
            .map(|i| {
                let c = colorous::MAGMA.eval_rational(i, COLORMAP_SIZE);
                Rgb([c.r, c.g, c.b])
            })
            .collect();
        Self { lut }
    }

    /// Colour for a value already normalised to `[0, 1]`.
    ///
    /// `1.0` maps to the last entry; out-of-range input is clamped.
    pub fn color(&self, normalized: f32) -> Rgb<u8> {
        let n = self.lut.len();
        let scaled = (normalized.clamp(0.0, 1.0) * n as f32) as usize;
        self.lut[scaled.min(n - 1)]
    }
}

/// Symmetric-log transform of the frequency axis
fn symlog(hz: f64) -> f64 {
    let linscale_adj = SYMLOG_LINSCALE / (1.0 - 1.0 / SYMLOG_BASE);
    let magnitude = hz.abs();
    let out = if magnitude <= SYMLOG_LINTHRESH {
        magnitude * linscale_adj
    } else {
        SYMLOG_LINTHRESH * (linscale_adj + (magnitude / SYMLOG_LINTHRESH).log(SYMLOG_BASE))
    };
    out.copysign(hz)
}

/// Band edges in Hz for `n_mels` bands: halfway between neighbouring centre
/// frequencies, starting at 0 and ending at Nyquist.
pub fn mel_band_edges(n_mels: usize, sample_rate: u32) -> Vec<f64> {
    let fmax = sample_rate as f64 / 2.0;
    let centers = mel_frequencies(n_mels, 0.0, fmax);
    let mut edges = Vec::with_capacity(n_mels + 1);
    for (i, &c) in centers.iter().enumerate() {
        let edge = if i == 0 {
            c
        } else {
            c - 0.5 * (c - centers[i - 1])
        };
        edges.push(edge.max(0.0));
    }
    edges.push(fmax);
    edges
}

/// Map every image row (top to bottom) to the mel band drawn there.
fn row_bands(height: u32, n_mels: usize, sample_rate: u32) -> Vec<usize> {
    let edges: Vec<f64> = mel_band_edges(n_mels, sample_rate)
        .into_iter()
        .map(symlog)
        .collect();
    let (lo, hi) = (edges[0], edges[edges.len() - 1]);

    (0..height)
        .map(|y| {
            let from_bottom = (height - y) as f64 - 0.5;
            let t = lo + (hi - lo) * from_bottom / height as f64;
            let band = edges.partition_point(|&e| e <= t);
            band.saturating_sub(1).min(n_mels - 1)
        })
        .collect()
}

/// Map every image column to the STFT frame drawn there.
fn column_frames(width: u32, n_frames: usize) -> Vec<usize> {
    (0..width)
        .map(|x| {
            let pos = (x as f64 + 0.5) / width as f64 * n_frames as f64;
            (pos as usize).min(n_frames - 1)
        })
        .collect()
}

/// Render `spectrogram` into an RGB raster of the configured size.
pub fn render_image(spectrogram: &MelSpectrogram, config: &FeatureConfig) -> Result<RgbImage> {
    let n_mels = spectrogram.n_mels();
    let n_frames = spectrogram.n_frames();
    if n_mels == 0 || n_frames == 0 {
        return Err(FeatureError::invalid_config(
            "Cannot render an empty spectrogram",
        ));
    }

    let (width, height) = config.image_size();
    let vmin = spectrogram.min();
    let vmax = spectrogram.max();
    let range = vmax - vmin;

    let colormap = Colormap::magma();
    let rows = row_bands(height, n_mels, spectrogram.sample_rate);
    let cols = column_frames(width, n_frames);

    let image = RgbImage::from_fn(width, height, |x, y| {
        let value = spectrogram.values[[rows[y as usize], cols[x as usize]]];
        let normalized = if range > 0.0 {
            (value - vmin) / range
        } else {
            0.0
        };
        colormap.color(normalized)
    });

    debug!(
        "Rendered {}x{} spectrogram image ({} bands x {} frames, {:.1}..{:.1} dB)",
        width, height, n_mels, n_frames, vmin, vmax
    );
    Ok(image)
}

/// Render `spectrogram` and save it as JPEG at `path`.
pub fn save_spectrogram<P: AsRef<Path>>(
    spectrogram: &MelSpectrogram,
    config: &FeatureConfig,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let image = render_image(spectrogram, config)?;

    let file = File::create(path).map_err(|e| {
        FeatureError::image_io(format!("Failed to create {}: {}", path.display(), e))
    })?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), config.jpeg_quality);
    encoder.encode_image(&image).map_err(|e| {
        FeatureError::image_io(format!("Failed to encode {}: {}", path.display(), e))
    })?;

    debug!("Saved spectrogram to {}", path.display());
    Ok(())
}
