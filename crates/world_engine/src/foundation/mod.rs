//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Handle types for the mesh arena
//! - Logging utilities
//! - Lock helpers

pub mod math;
pub mod collections;
pub mod logging;
pub mod sync;
