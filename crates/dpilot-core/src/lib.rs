//! # dpilot-core - Core Domain Types
//!
//! Foundation crate for droidpilot. Provides domain types, error handling and
//! logging setup shared by every other crate in the workspace.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`Device`] - A device reported ready by the device bridge
//! - [`FlowPhase`] - Per-device run phase (Connecting, Running, Completed, ...)
//! - [`FlowEvent`] - Phase change notification emitted by the executor
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Logging (`logging`)
//! - [`logging::init()`] - Rolling file log plus optional console output
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use dpilot_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod prelude;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use types::{Device, FlowEvent, FlowPhase, EMULATOR_PREFIX};
