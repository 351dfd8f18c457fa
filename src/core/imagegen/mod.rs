pub mod auto_color;
pub mod image_utils;

pub use auto_color::auto_color;
pub use image_utils::{contrast, display_name, humanize_number, render_palette};

use std::fmt;
use thiserror::Error;

/// Where a cached background image lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageScope {
    Global,
    Guild(u64),
}

impl fmt::Display for ImageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageScope::Global => f.write_str("global"),
            ImageScope::Guild(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("The url provided is not a valid image")]
    InvalidImage,

    #[error("Image cache error: {0}")]
    Io(String),

    #[error("Failed to download image: {0}")]
    Http(String),
}
