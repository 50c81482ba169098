//! # CLI UI Module
//!
//! Consistent styling layer for docent CLI output.
//!
//! - `color`: color mode detection (respects `NO_COLOR` and TTY status)
//! - `style`: message types, prefixes, and styling functions

pub mod color;
pub mod style;

pub use color::ColorMode;
pub use style::{MessageType, Style};
