//! Palette data and preview rendering for decoded images.

pub mod palette;
pub mod preview;
