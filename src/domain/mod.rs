//! Domain layer - pure value types with no runtime dependencies.
//!
//! - Second-resolution timestamps used as bucket keys
//! - Lookback windows and their inclusive bounds

pub mod timestamp;
pub mod window;
