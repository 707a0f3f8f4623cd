//! Centralized theme
//!
//! - `palette`: raw color constants
//! - `styles`: semantic style builders, including run phase colors

pub mod palette;
pub mod styles;
