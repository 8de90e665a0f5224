//! [`Command`] for updating an [`Image`].

use common::operations::{By, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{image, Image},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for patching metadata of an existing [`Image`].
///
/// Fields left [`None`] keep their stored values.
#[derive(Clone, Debug)]
pub struct UpdateImage {
    /// ID of the [`Image`] to be updated.
    pub id: image::Id,

    /// New [`image::ThumbHash`] of the [`Image`].
    pub thumb_hash: Option<image::ThumbHash>,

    /// New [`image::Location`] of the [`Image`].
    pub location: Option<image::Location>,

    /// New [`image::Country`] of the [`Image`].
    pub country: Option<image::Country>,

    /// New [`image::CreationDateTime`] of the [`Image`].
    pub created_at: Option<image::CreationDateTime>,
}

impl<Db> Command<UpdateImage> for Service<Db>
where
    Db: Database<
            Select<By<Option<Image>, image::Id>>,
            Ok = Option<Image>,
            Err = Traced<database::Error>,
        > + Database<Update<Image>, Ok = bool, Err = Traced<database::Error>>,
{
    type Ok = Image;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateImage) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateImage {
            id,
            thumb_hash,
            location,
            country,
            created_at,
        } = cmd;

        let mut image = self
            .database()
            .execute(Select(By::<Option<Image>, _>::new(id.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::NotExists(id.clone()))
            .map_err(tracerr::wrap!())?;

        let before = image.clone();
        if let Some(hash) = thumb_hash {
            image.thumb_hash = hash;
        }
        if let Some(location) = location {
            image.location = Some(location);
        }
        if let Some(country) = country {
            image.country = Some(country);
        }
        if let Some(created_at) = created_at {
            image.created_at = created_at;
        }
        if image == before {
            return Ok(image);
        }

        let updated = self
            .database()
            .execute(Update(image.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        // Deleted in between.
        if !updated {
            return Err(tracerr::new!(E::NotExists(id)));
        }

        tracing::info!(id = %image.id, "updated `Image`");

        Ok(image)
    }
}

/// Error of [`UpdateImage`] [`Command`] execution.
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
    use common::{ListQuery, Order};

    use crate::{
        command::CreateImage,
        domain::image,
        infra::Memory,
        query::{self, Query as _},
        Command as _, Config, Service,
    };

    use super::{ExecutionError, UpdateImage};

    fn create(id: &str, country: &str) -> CreateImage {
        CreateImage {
            id: image::Id::new(id).unwrap(),
            mime_type: image::MimeType::new("image/jpeg").unwrap(),
            width: 640.into(),
            height: 480.into(),
            thumb_hash: image::ThumbHash::default(),
            location: None,
            country: image::Country::new(country),
            created_at: None,
        }
    }

    fn patch(id: &str) -> UpdateImage {
        UpdateImage {
            id: image::Id::new(id).unwrap(),
            thumb_hash: None,
            location: None,
            country: None,
            created_at: None,
        }
    }

    async fn chilean(svc: &Service<Memory>) -> Vec<String> {
        svc.execute(query::images::List(ListQuery {
            order: Some(Order::Ascending),
            filter: vec!["Chile".into()],
            ..ListQuery::default()
        }))
        .await
        .unwrap()
        .nodes()
        .map(|i| i.id.to_string())
        .collect()
    }

    #[tokio::test]
    async fn moves_image_between_countries() {
        let svc = Service::new(Config::default(), Memory::new());
        _ = svc.execute(create("img01", "Chile")).await.unwrap();
        _ = svc.execute(create("img02", "Peru")).await.unwrap();
        assert_eq!(chilean(&svc).await, ["img01"]);

        let updated = svc
            .execute(UpdateImage {
                country: image::Country::new("Chile"),
                location: image::Location::new(-18.48, -70.31),
                ..patch("img02")
            })
            .await
            .unwrap();
        assert_eq!(updated.country, image::Country::new("Chile"));
        assert_eq!(updated.location, image::Location::new(-18.48, -70.31));
        assert_eq!(chilean(&svc).await, ["img01", "img02"]);

        _ = svc
            .execute(UpdateImage {
                country: image::Country::new("Argentina"),
                ..patch("img01")
            })
            .await
            .unwrap();
        assert_eq!(chilean(&svc).await, ["img02"]);
    }

    #[tokio::test]
    async fn keeps_fields_left_unset() {
        let svc = Service::new(Config::default(), Memory::new());
        let created = svc.execute(create("img01", "Chile")).await.unwrap();

        let updated = svc.execute(patch("img01")).await.unwrap();

        assert_eq!(updated, created);
    }

    #[tokio::test]
    async fn fails_on_unknown_image() {
        let svc = Service::new(Config::default(), Memory::new());

        let err = svc.execute(patch("missing")).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotExists(_)));
    }
}
