//! # Fature Core
//!
//! Core error definitions and shared plumbing for the Fature cache layer.
//! Every other crate in the workspace reports failures through
//! [`FatureError`] and [`FatureResult`].

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
