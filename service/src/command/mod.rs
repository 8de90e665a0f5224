//! [`Command`] definition.

pub mod create_image;
pub mod delete_image;
pub mod update_image;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_image::CreateImage, delete_image::DeleteImage,
    update_image::UpdateImage,
};
