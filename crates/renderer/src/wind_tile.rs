//! Fixed-point encoding of resampled wind into an RGB raster.
//!
//! Channel layout (one byte each, row 0 = north):
//! - R: U component, `round(u * scale) + zero_offset`
//! - G: V component, `round(v * scale) + zero_offset`
//! - B: speed, `round(sqrt(u^2 + v^2) * scale)`
//!
//! `scale = 127 / max(|value_min|, |value_max|)`, so `zero_offset` is exactly
//! 0 m/s. Masked cells encode as calm: U = V = `zero_offset`, speed = 0.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use wind_common::{PipelineError, ResampledField};

use crate::png;

/// Bytes per pixel in the encoded raster.
pub const CHANNELS: usize = 3;

/// Errors raised while building encoding parameters or writing tiles.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid encoding range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    #[error("range [{min}, {max}] does not fit a byte around zero offset {zero_offset}")]
    OffsetOutOfBounds { min: f64, max: f64, zero_offset: u8 },

    #[error("field has {actual} cells, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("PNG encoding failed: {0}")]
    Png(String),
}

impl From<EncodingError> for PipelineError {
    fn from(err: EncodingError) -> Self {
        match err {
            EncodingError::InvalidRange { .. } | EncodingError::OffsetOutOfBounds { .. } => {
                PipelineError::Config(err.to_string())
            }
            other => PipelineError::ProjectionFailure(other.to_string()),
        }
    }
}

/// Physical quantity carried by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindComponent {
    U,
    V,
    Magnitude,
}

/// Description of one raster channel, for consumers that decode tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub channel: String,
    pub component: WindComponent,
    pub unit: String,
    pub value_range: [f64; 2],
    pub zero_offset: u8,
}

/// Parameters needed to invert the quantisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodingParams {
    pub value_min: f64,
    pub value_max: f64,
    pub zero_offset: u8,
    pub scale: f64,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            value_min: -50.0,
            value_max: 50.0,
            zero_offset: 128,
            scale: 127.0 / 50.0,
        }
    }
}

impl EncodingParams {
    pub fn new(value_min: f64, value_max: f64, zero_offset: u8) -> Result<Self, EncodingError> {
        let bound = value_min.abs().max(value_max.abs());
        if !value_min.is_finite() || !value_max.is_finite() || value_min >= value_max || bound == 0.0
        {
            return Err(EncodingError::InvalidRange {
                min: value_min,
                max: value_max,
            });
        }
        let scale = 127.0 / bound;

        let lowest = (value_min * scale).round() + zero_offset as f64;
        let highest = (value_max * scale).round() + zero_offset as f64;
        if lowest < 0.0 || highest > 255.0 {
            return Err(EncodingError::OffsetOutOfBounds {
                min: value_min,
                max: value_max,
                zero_offset,
            });
        }

        Ok(Self {
            value_min,
            value_max,
            zero_offset,
            scale,
        })
    }

    /// Width of one quantisation step in m/s.
    pub fn step(&self) -> f64 {
        1.0 / self.scale
    }

    /// Quantise a signed component.
    #[inline]
    pub fn encode(&self, value: f32) -> u8 {
        if !value.is_finite() {
            return self.zero_offset;
        }
        let q = (value as f64 * self.scale).round() + self.zero_offset as f64;
        q.clamp(0.0, 255.0) as u8
    }

    /// Quantise a non-negative speed.
    #[inline]
    pub fn encode_magnitude(&self, speed: f32) -> u8 {
        if !speed.is_finite() {
            return 0;
        }
        (speed as f64 * self.scale).round().clamp(0.0, 255.0) as u8
    }

    /// Invert [`encode`](Self::encode).
    pub fn decode(&self, byte: u8) -> f64 {
        (byte as f64 - self.zero_offset as f64) / self.scale
    }

    /// Invert [`encode_magnitude`](Self::encode_magnitude).
    pub fn decode_magnitude(&self, byte: u8) -> f64 {
        byte as f64 / self.scale
    }

    fn in_range(&self, value: f32) -> bool {
        let v = value as f64;
        v >= self.value_min && v <= self.value_max
    }

    /// Channel semantics in R, G, B order.
    pub fn channels(&self) -> Vec<ChannelSpec> {
        vec![
            ChannelSpec {
                channel: "r".to_string(),
                component: WindComponent::U,
                unit: "m/s".to_string(),
                value_range: [self.value_min, self.value_max],
                zero_offset: self.zero_offset,
            },
            ChannelSpec {
                channel: "g".to_string(),
                component: WindComponent::V,
                unit: "m/s".to_string(),
                value_range: [self.value_min, self.value_max],
                zero_offset: self.zero_offset,
            },
            ChannelSpec {
                channel: "b".to_string(),
                component: WindComponent::Magnitude,
                unit: "m/s".to_string(),
                value_range: [0.0, 255.0 / self.scale],
                zero_offset: 0,
            },
        ]
    }
}

/// An encoded wind raster.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTile {
    pub width: usize,
    pub height: usize,
    /// Interleaved U, V, speed bytes; `width * height * 3` long.
    pub data: Vec<u8>,
    /// Validity mask carried over from reprojection.
    pub mask: Vec<bool>,
    pub params: EncodingParams,
}

impl EncodedTile {
    /// The three channel bytes of one pixel.
    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        let i = (row * self.width + col) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Interleaved RGBA bytes with alpha 255 on valid cells, 0 elsewhere.
    pub fn rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for (px, &valid) in self.data.chunks_exact(CHANNELS).zip(&self.mask) {
            out.extend_from_slice(px);
            out.push(if valid { 255 } else { 0 });
        }
        out
    }

    /// Serialise as PNG: RGB, or RGBA when `alpha_mask` is set.
    pub fn to_png(&self, alpha_mask: bool) -> Result<Vec<u8>, EncodingError> {
        let result = if alpha_mask {
            png::create_png(&self.rgba(), self.width, self.height)
        } else {
            png::create_png_rgb(&self.data, self.width, self.height)
        };
        result.map_err(EncodingError::Png)
    }
}

/// Counts gathered while encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeReport {
    /// Component values outside `[value_min, value_max]`.
    pub out_of_range: usize,
    /// Component values inspected (two per valid cell).
    pub total: usize,
}

impl EncodeReport {
    /// The warning-level error describing clamped values, if any.
    pub fn range_exceeded(&self) -> Option<PipelineError> {
        (self.out_of_range > 0).then_some(PipelineError::EncodingRangeExceeded {
            clamped: self.out_of_range,
            total: self.total,
        })
    }
}

/// Encode a resampled field.
///
/// Values outside the configured range are clamped and counted in the
/// report; they never fail the encode.
pub fn encode(
    field: &ResampledField,
    params: &EncodingParams,
) -> Result<(EncodedTile, EncodeReport), EncodingError> {
    let n = field.width * field.height;
    for len in [field.u.len(), field.v.len(), field.mask.len()] {
        if len != n {
            return Err(EncodingError::ShapeMismatch {
                expected: n,
                actual: len,
            });
        }
    }

    let mut data = vec![0u8; n * CHANNELS];
    let width = field.width.max(1);

    let out_of_range: usize = data
        .par_chunks_mut(width * CHANNELS)
        .enumerate()
        .map(|(row, out_row)| {
            let start = row * width;
            let mut exceeded = 0;
            for (col, px) in out_row.chunks_exact_mut(CHANNELS).enumerate() {
                let i = start + col;
                if !field.mask[i] {
                    px.copy_from_slice(&[params.zero_offset, params.zero_offset, 0]);
                    continue;
                }
                let (u, v) = (field.u[i], field.v[i]);
                exceeded += (!params.in_range(u)) as usize + (!params.in_range(v)) as usize;
                px[0] = params.encode(u);
                px[1] = params.encode(v);
                px[2] = params.encode_magnitude((u * u + v * v).sqrt());
            }
            exceeded
        })
        .sum();

    let report = EncodeReport {
        out_of_range,
        total: field.valid_count() * 2,
    };
    if let Some(err) = report.range_exceeded() {
        warn!(error = %err, "Clamped wind values outside encoding range");
    }
    debug!(width = field.width, height = field.height, "Encoded wind tile");

    Ok((
        EncodedTile {
            width: field.width,
            height: field.height,
            data,
            mask: field.mask.clone(),
            params: *params,
        },
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(u: Vec<f32>, v: Vec<f32>, mask: Vec<bool>, width: usize) -> ResampledField {
        let height = u.len() / width;
        ResampledField {
            width,
            height,
            u,
            v,
            mask,
        }
    }

    #[test]
    fn test_default_scale() {
        let p = EncodingParams::default();
        assert_eq!(p, EncodingParams::new(-50.0, 50.0, 128).unwrap());
        assert_eq!(p.scale, 2.54);
    }

    #[test]
    fn test_zero_maps_to_offset() {
        let p = EncodingParams::default();
        assert_eq!(p.encode(0.0), 128);
        assert_eq!(p.encode(-0.0), 128);
        assert_eq!(p.encode_magnitude(0.0), 0);
    }

    #[test]
    fn test_range_endpoints() {
        let p = EncodingParams::default();
        assert_eq!(p.encode(50.0), 255);
        assert_eq!(p.encode(-50.0), 1);
        assert_eq!(p.encode(500.0), 255);
        assert_eq!(p.encode(-500.0), 0);
        assert_eq!(p.encode_magnitude(100.0), 254);
    }

    #[test]
    fn test_masked_cells_are_calm() {
        let f = field(vec![10.0, 0.0], vec![-5.0, 0.0], vec![true, false], 2);
        let (tile, report) = encode(&f, &EncodingParams::default()).unwrap();
        assert_eq!(tile.pixel(0, 1), [128, 128, 0]);
        assert_eq!(tile.pixel(0, 0), [153, 115, 28]);
        assert_eq!(report, EncodeReport { out_of_range: 0, total: 2 });
    }

    #[test]
    fn test_out_of_range_is_reported_not_fatal() {
        let f = field(vec![80.0], vec![-60.0], vec![true], 1);
        let (tile, report) = encode(&f, &EncodingParams::default()).unwrap();
        assert_eq!(tile.pixel(0, 0)[0], 255);
        assert_eq!(tile.pixel(0, 0)[1], 0);
        assert_eq!(report.out_of_range, 2);
        assert!(matches!(
            report.range_exceeded(),
            Some(PipelineError::EncodingRangeExceeded { clamped: 2, total: 2 })
        ));
    }

    #[test]
    fn test_rejects_bad_params() {
        assert!(EncodingParams::new(50.0, -50.0, 128).is_err());
        assert!(EncodingParams::new(0.0, 0.0, 128).is_err());
        assert!(matches!(
            EncodingParams::new(-50.0, 50.0, 200),
            Err(EncodingError::OffsetOutOfBounds { .. })
        ));
        // asymmetric range with a matching offset is fine
        assert!(EncodingParams::new(-10.0, 50.0, 30).is_ok());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut f = field(vec![1.0, 2.0], vec![1.0, 2.0], vec![true, true], 2);
        f.mask.pop();
        assert!(matches!(
            encode(&f, &EncodingParams::default()),
            Err(EncodingError::ShapeMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_rgba_alpha_follows_mask() {
        let f = field(vec![1.0, 1.0], vec![1.0, 1.0], vec![false, true], 2);
        let (tile, _) = encode(&f, &EncodingParams::default()).unwrap();
        let rgba = tile.rgba();
        assert_eq!(rgba.len(), 8);
        assert_eq!(rgba[3], 0);
        assert_eq!(rgba[7], 255);
    }
}
