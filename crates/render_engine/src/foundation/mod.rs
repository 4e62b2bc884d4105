//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer:
//! - Math types and transform helpers
//! - Frame timing
//! - Logging initialisation

pub mod math;
pub mod time;
pub mod logging;
