//! Per-track motion models.
//!
//! This module provides:
//! - `EmaVelocityFilter` - constant velocity with exponentially smoothed velocity
//! - `NoFilter` - baseline without a velocity term
//!
//! `FilterEnum` and `FilterFactoryEnum` wrap the implementations for static
//! dispatch, the same way the tracker stores one filter per track.

mod traits;
mod ema;
mod no_filter;

pub use traits::Filter;
pub use ema::{EmaVelocityFilter, DEFAULT_VELOCITY_ALPHA};
pub use no_filter::NoFilter;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Enum-based filter for static dispatch.
#[derive(Clone, Debug)]
pub enum FilterEnum {
    Ema(EmaVelocityFilter),
    None(NoFilter),
}

impl Filter for FilterEnum {
    #[inline(always)]
    fn predict(&mut self, dt: f64, drift: Vector2<f64>) {
        match self {
            FilterEnum::Ema(f) => f.predict(dt, drift),
            FilterEnum::None(f) => f.predict(dt, drift),
        }
    }

    #[inline(always)]
    fn update(&mut self, centroid: Vector2<f64>, dt: f64) {
        match self {
            FilterEnum::Ema(f) => f.update(centroid, dt),
            FilterEnum::None(f) => f.update(centroid, dt),
        }
    }

    #[inline(always)]
    fn position(&self) -> Vector2<f64> {
        match self {
            FilterEnum::Ema(f) => f.position(),
            FilterEnum::None(f) => f.position(),
        }
    }

    #[inline(always)]
    fn velocity(&self) -> Vector2<f64> {
        match self {
            FilterEnum::Ema(f) => f.velocity(),
            FilterEnum::None(f) => f.velocity(),
        }
    }
}

/// Serializable choice of motion model, used by the tracker configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterFactoryEnum {
    Ema { alpha: f64 },
    None,
}

impl Default for FilterFactoryEnum {
    fn default() -> Self {
        FilterFactoryEnum::Ema {
            alpha: DEFAULT_VELOCITY_ALPHA,
        }
    }
}

impl FilterFactoryEnum {
    /// Create a filter positioned at `initial`.
    pub fn create(&self, initial: Vector2<f64>) -> FilterEnum {
        match *self {
            FilterFactoryEnum::Ema { alpha } => FilterEnum::Ema(EmaVelocityFilter::new(initial, alpha)),
            FilterFactoryEnum::None => FilterEnum::None(NoFilter::new(initial)),
        }
    }
}
