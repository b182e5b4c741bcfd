//! Utility functions

pub mod cover_art;
mod time;

pub use cover_art::CoverImage;
pub use time::format_time;
