//! [`Command`] for creating a new [`Image`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{image, Image},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for storing metadata of a new [`Image`].
#[derive(Clone, Debug)]
pub struct CreateImage {
    /// ID of a new [`Image`].
    pub id: image::Id,

    /// [`image::MimeType`] of a new [`Image`].
    pub mime_type: image::MimeType,

    /// Width of a new [`Image`].
    pub width: image::Dimension,

    /// Height of a new [`Image`].
    pub height: image::Dimension,

    /// [`image::ThumbHash`] of a new [`Image`].
    pub thumb_hash: image::ThumbHash,

    /// [`image::Location`] of a new [`Image`], if known.
    pub location: Option<image::Location>,

    /// [`image::Country`] of a new [`Image`], if known.
    pub country: Option<image::Country>,

    /// [`DateTime`] when a new [`Image`] was taken.
    ///
    /// Upload [`DateTime`] is used if [`None`].
    pub created_at: Option<image::CreationDateTime>,
}

impl<Db> Command<CreateImage> for Service<Db>
where
    Db: Database<Insert<Image>, Ok = bool, Err = Traced<database::Error>>,
{
    type Ok = Image;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateImage) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateImage {
            id,
            mime_type,
            width,
            height,
            thumb_hash,
            location,
            country,
            created_at,
        } = cmd;

        let uploaded_at = DateTime::now();
        let image = Image {
            id,
            mime_type,
            width,
            height,
            thumb_hash,
            location,
            country,
            created_at: created_at.unwrap_or_else(|| uploaded_at.coerce()),
            uploaded_at: uploaded_at.coerce(),
        };

        let inserted = self
            .database()
            .execute(Insert(image.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !inserted {
            return Err(tracerr::new!(E::Duplicate(image.id)));
        }

        tracing::info!(id = %image.id, "created `Image`");

        Ok(image)
    }
}

/// Error of [`CreateImage`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Image`] with the same ID exists already.
    #[display("`Image(id: {_0})` already exists")]
    #[from(ignore)]
    Duplicate(#[error(not(source))] image::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::image,
        infra::Memory,
        query::{self, Query as _},
        Command as _, Config, Service,
    };

    use super::{CreateImage, ExecutionError};

    fn create(id: &str) -> CreateImage {
        CreateImage {
            id: image::Id::new(id).unwrap(),
            mime_type: image::MimeType::new("image/png").unwrap(),
            width: 800.into(),
            height: 600.into(),
            thumb_hash: image::ThumbHash::new("3OcRJYB4d3h").unwrap(),
            location: image::Location::new(-33.45, -70.66),
            country: image::Country::new("Chile"),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn stores_image() {
        let svc = Service::new(Config::default(), Memory::new());

        let image = svc.execute(create("a1b2c3")).await.unwrap();
        assert_eq!(image.created_at, image.uploaded_at.coerce());

        let found = svc
            .execute(query::image::ById::by(image.id.clone()))
            .await
            .unwrap();
        assert_eq!(found, Some(image));
    }

    #[tokio::test]
    async fn rejects_duplicate() {
        let svc = Service::new(Config::default(), Memory::new());
        _ = svc.execute(create("a1b2c3")).await.unwrap();

        let err = svc.execute(create("a1b2c3")).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Duplicate(_)));
    }
}
