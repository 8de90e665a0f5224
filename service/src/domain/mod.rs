//! Domain definitions.

pub mod image;

pub use self::image::Image;
