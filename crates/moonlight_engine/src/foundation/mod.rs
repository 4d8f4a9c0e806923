//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and the entity transform
//! - Frame time
//! - Logging setup

pub mod logging;
pub mod math;
pub mod time;
