//! Wind raster encoding.
//!
//! Turns a [`wind_common::ResampledField`] into an 8-bit, 3-channel image:
//! - R: U component, signed around a zero offset
//! - G: V component, signed around a zero offset
//! - B: wind speed, unsigned
//!
//! The PNG writer stores bytes unfiltered so decoders recover the quantised
//! values exactly. [`pyramid`] cuts the same raster into Web Mercator XYZ
//! tiles for map clients.

pub mod png;
pub mod pyramid;
pub mod wind_tile;

pub use pyramid::{build_pyramid, PyramidConfig, PyramidTile, MAX_ZOOM};
pub use wind_tile::{
    encode, ChannelSpec, EncodeReport, EncodedTile, EncodingError, EncodingParams, WindComponent,
    CHANNELS,
};
