//! SingerID command-line front end
//!
//! Configuration loading and the per-request pipeline behind the `singerid`
//! binary.

pub mod config;
pub mod pipeline;

pub use config::SingerIdConfig;
pub use pipeline::{render_spectrogram, SingerId};
