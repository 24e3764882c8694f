//! Animated fiber-optic background: generated light paths, a per-frame animator,
//! a layered canvas renderer and the quality controls around them.

pub mod animator;
mod component;
pub mod config;
pub mod device;
pub mod enhancement;
pub mod error;
pub mod generator;
pub mod performance;
pub mod render;
pub mod state;
pub mod storage;
pub mod types;

pub use component::{FiberBackground, FiberControls};
pub use config::FiberConfig;
pub use error::{FiberError, RenderError};
pub use types::QualityTier;
