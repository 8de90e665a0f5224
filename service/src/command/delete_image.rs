//! [`Command`] for deleting an [`Image`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{image, Image},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting metadata of an [`Image`].
#[derive(Clone, Debug)]
pub struct DeleteImage {
    /// ID of the [`Image`] to be deleted.
    pub id: image::Id,
}

impl<Db> Command<DeleteImage> for Service<Db>
where
    Db: Database<
        Delete<By<Image, image::Id>>,
        Ok = Option<Image>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Image;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeleteImage { id }: DeleteImage,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let image = self
            .database()
            .execute(Delete(By::new(id.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotExists(id))
            .map_err(tracerr::wrap!())?;

        tracing::info!(id = %image.id, "deleted `Image`");

        Ok(image)
    }
}

/// Error of [`DeleteImage`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Image`] with the provided ID does not exist.
    #[display("`Image(id: {_0})` does not exist")]
    #[from(ignore)]
    NotExists(#[error(not(source))] image::Id),
}

#[cfg(test)]
mod spec {
    use common::{operations::Insert, DateTime};

    use crate::{
        domain::{image, Image},
        infra::{Database as _, Memory},
        query::{self, Query as _},
        Command as _, Config, Service,
    };

    use super::{DeleteImage, ExecutionError};

    #[tokio::test]
    async fn deletes_existing_image() {
        let db = Memory::new();
        let now = DateTime::now();
        let image = Image {
            id: image::Id::new("deadbeef0001").unwrap(),
            mime_type: image::MimeType::new("image/jpeg").unwrap(),
            width: 1.into(),
            height: 1.into(),
            thumb_hash: image::ThumbHash::default(),
            location: None,
            country: None,
            created_at: now.coerce(),
            uploaded_at: now.coerce(),
        };
        assert!(db.execute(Insert(image.clone())).await.unwrap());
        let svc = Service::new(Config::default(), db);

        let deleted = svc
            .execute(DeleteImage {
                id: image.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(deleted, image);

        let found = svc
            .execute(query::image::ById::by(image.id.clone()))
            .await
            .unwrap();
        assert_eq!(found, None);

        let err = svc.execute(DeleteImage { id: image.id }).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotExists(_)));
    }
}
