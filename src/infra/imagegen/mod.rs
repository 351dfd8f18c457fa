pub mod image_cache;

pub use image_cache::ImageCache;
