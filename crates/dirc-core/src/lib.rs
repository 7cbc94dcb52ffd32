//! dIRC Core - styled text model
//!
//! This crate provides the text model shared by the protocol and its consumers:
//! - Style spans over the visible text of a message
//! - The 16 entry mIRC color table
//! - Extraction of mIRC formatting codes (bold, italic, underline, color)

pub mod formatting;
pub mod style;

pub use formatting::{parse_formatting, Formatted};
pub use style::{Attribute, Color, ColorPair, TextStyle};
