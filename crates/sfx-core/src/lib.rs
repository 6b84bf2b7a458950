//! sfx-core: Shared types, errors and parameter definitions for spectral-fx
//!
//! This crate provides the foundational types used by the `sfx-dsp` processors.

mod error;
mod params;
mod sample;

pub use error::*;
pub use params::*;
pub use sample::*;
