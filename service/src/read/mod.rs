//! Read entities definitions.

pub mod image;
