//! Model input tensor
//!
//! Reloads the saved spectrogram, resizes it and scales it to `[0, 1]`.
//! Pixels are kept in BGR order and resized with the fixed-point bilinear
//! filter used by OpenCV, which is how the training images were produced.

use std::path::Path;

use image::ImageReader;
use ndarray::{Array3, Array4, ArrayView4, Axis};
use tracing::debug;

use crate::config::TENSOR_CHANNELS;
use crate::error::{FeatureError, Result};

/// Fixed-point precision of the bilinear weights
const RESIZE_COEF_BITS: u32 = 11;
const RESIZE_COEF_SCALE: f32 = (1 << RESIZE_COEF_BITS) as f32;

/// Classifier input: `(1, side, side, 3)`, values in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    data: Array4<f32>,
}

impl FeatureTensor {
    /// Wrap `data`, checking batch size, channel count and value range.
    pub fn new(data: Array4<f32>) -> Result<Self> {
        let shape = data.shape();
        if shape[0] != 1 || shape[3] != TENSOR_CHANNELS || shape[1] == 0 || shape[2] == 0 {
            return Err(FeatureError::Shape(format!(
                "expected (1, H, W, {}), got {:?}",
                TENSOR_CHANNELS, shape
            )));
        }
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(FeatureError::Shape(format!(
                "tensor value {} outside [0, 1]",
                bad
            )));
        }
        Ok(Self { data })
    }

    /// All-zero tensor of the given side
    pub fn zeros(side: usize) -> Self {
        Self {
            data: Array4::zeros((1, side, side, TENSOR_CHANNELS)),
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }
}

/// Decode the image at `path` as 8-bit BGR, shape `(height, width, 3)`.
pub fn read_bgr<P: AsRef<Path>>(path: P) -> Result<Array3<u8>> {
    let path = path.as_ref();
    let image = ImageReader::open(path)
        .map_err(|e| FeatureError::image_io(format!("Failed to open {}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| FeatureError::image_io(format!("Failed to read {}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| {
            FeatureError::image_io(format!("Failed to decode {}: {}", path.display(), e))
        })?
        .to_rgb8();

    let (width, height) = image.dimensions();
    let mut bgr = Array3::<u8>::zeros((height as usize, width as usize, TENSOR_CHANNELS));
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (row, col) = (y as usize, x as usize);
        bgr[[row, col, 0]] = b;
        bgr[[row, col, 1]] = g;
        bgr[[row, col, 2]] = r;
    }
    Ok(bgr)
}

/// Interpolation taps for one output coordinate
#[derive(Debug, Clone, Copy)]
struct Tap {
    index: usize,
    /// Weight of `index`; the remainder goes to `index + 1`
    w0: i32,
    w1: i32,
}

fn linear_taps(src_len: usize, dst_len: usize) -> Vec<Tap> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let pos = ((d as f64 + 0.5) * scale - 0.5) as f32;
            let mut index = pos.floor() as isize;
            let mut frac = pos - index as f32;
            if index < 0 {
                index = 0;
                frac = 0.0;
            }
            if index as usize >= src_len - 1 {
                index = src_len as isize - 1;
                frac = 0.0;
            }
            Tap {
                index: index as usize,
                w0: ((1.0 - frac) * RESIZE_COEF_SCALE).round() as i32,
                w1: (frac * RESIZE_COEF_SCALE).round() as i32,
            }
        })
        .collect()
}

/// Bilinear resize of an 8-bit `(height, width, channels)` image.
///
/// Half-pixel centres, 11-bit fixed-point weights, results rounded back to
/// 8 bits. Matches OpenCV's `INTER_LINEAR` for `u8` images.
pub fn resize_bilinear(src: &Array3<u8>, dst_h: usize, dst_w: usize) -> Result<Array3<u8>> {
    let (src_h, src_w, channels) = src.dim();
    if src_h == 0 || src_w == 0 || dst_h == 0 || dst_w == 0 {
        return Err(FeatureError::Shape(format!(
            "cannot resize {}x{} to {}x{}",
            src_w, src_h, dst_w, dst_h
        )));
    }

    let x_taps = linear_taps(src_w, dst_w);
    let y_taps = linear_taps(src_h, dst_h);

    // Horizontal pass on one source row, scaled by RESIZE_COEF_SCALE
    let horizontal = |row: usize| -> Vec<i32> {
        let mut out = vec![0i32; dst_w * channels];
        for (dx, tap) in x_taps.iter().enumerate() {
            let next = (tap.index + 1).min(src_w - 1);
            for c in 0..channels {
                out[dx * channels + c] = src[[row, tap.index, c]] as i32 * tap.w0
                    + src[[row, next, c]] as i32 * tap.w1;
            }
        }
        out
    };

    let rounding = 1i64 << (2 * RESIZE_COEF_BITS - 1);
    let mut dst = Array3::<u8>::zeros((dst_h, dst_w, channels));
    for (dy, tap) in y_taps.iter().enumerate() {
        let row0 = horizontal(tap.index);
        let row1 = horizontal((tap.index + 1).min(src_h - 1));
        for dx in 0..dst_w {
            for c in 0..channels {
                let i = dx * channels + c;
                let acc = row0[i] as i64 * tap.w0 as i64 + row1[i] as i64 * tap.w1 as i64;
                let value = (acc + rounding) >> (2 * RESIZE_COEF_BITS);
                dst[[dy, dx, c]] = value.clamp(0, 255) as u8;
            }
        }
    }
    Ok(dst)
}

/// Build the classifier input from an 8-bit BGR image.
pub fn tensor_from_bgr(bgr: &Array3<u8>, side: usize) -> Result<FeatureTensor> {
    let resized = resize_bilinear(bgr, side, side)?;
    let scaled = resized.mapv(|v| v as f32 / 255.0);
    FeatureTensor::new(scaled.insert_axis(Axis(0)))
}

/// Reload the spectrogram image at `path` as a `(1, side, side, 3)` tensor.
pub fn load_tensor<P: AsRef<Path>>(path: P, side: usize) -> Result<FeatureTensor> {
    let bgr = read_bgr(&path)?;
    debug!(
        "Reloaded {} as {}x{} BGR",
        path.as_ref().display(),
        bgr.dim().1,
        bgr.dim().0
    );
    tensor_from_bgr(&bgr, side)
}
