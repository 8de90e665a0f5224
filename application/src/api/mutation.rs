//! GraphQL [`Mutation`]s definitions.

use common::DateTime;
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Stores metadata of a new `Image`.
    ///
    /// A random `id` is generated if omitted. `createdAt` defaults to the
    /// upload `DateTime`.
    ///
    /// Requires administrator credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `FORBIDDEN` - the request is not made by an administrator;
    /// - `IMAGE_EXISTS` - an `Image` with the provided ID exists already;
    /// - `INVALID_DIMENSION` - `width` or `height` is negative;
    /// - `INVALID_LOCATION` - only one of `latitude` and `longitude` is
    ///                        provided, or any of them is out of range.
    #[tracing::instrument(
        skip_all,
        fields(
            country = ?country.as_ref().map(ToString::to_string),
            gql.name = "createImage",
            id = ?id.as_ref().map(ToString::to_string),
            mime_type = %mime_type,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_image(
        id: Option<api::image::Id>,
        mime_type: api::image::MimeType,
        width: i32,
        height: i32,
        thumb_hash: Option<api::image::ThumbHash>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        country: Option<api::image::Country>,
        created_at: Option<DateTime>,
        ctx: &Context,
    ) -> Result<api::Image, Error> {
        ctx.require_admin().await?;

        let dimension = |d: i32| {
            u32::try_from(d)
                .map(domain::image::Dimension::from)
                .map_err(|_| api::image::ImageError::InvalidDimension.into())
                .map_err(ctx.error())
        };
        let location = parse_location(latitude, longitude, ctx)?;

        ctx.service()
            .execute(command::CreateImage {
                id: id.map_or_else(domain::image::Id::random, Into::into),
                mime_type: mime_type.into(),
                width: dimension(width)?,
                height: dimension(height)?,
                thumb_hash: thumb_hash.map(Into::into).unwrap_or_default(),
                location,
                country: country.map(Into::into),
                created_at: created_at.map(DateTime::coerce),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Patches metadata of the `Image` with the specified ID.
    ///
    /// Omitted arguments keep their stored values.
    ///
    /// Requires administrator credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `FORBIDDEN` - the request is not made by an administrator;
    /// - `IMAGE_NOT_EXISTS` - the `Image` with the specified ID does not
    ///                        exist;
    /// - `INVALID_LOCATION` - only one of `latitude` and `longitude` is
    ///                        provided, or any of them is out of range.
    #[tracing::instrument(
        skip_all,
        fields(
            country = ?country.as_ref().map(ToString::to_string),
            gql.name = "updateImage",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_image(
        id: api::image::Id,
        thumb_hash: Option<api::image::ThumbHash>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        country: Option<api::image::Country>,
        created_at: Option<DateTime>,
        ctx: &Context,
    ) -> Result<api::Image, Error> {
        ctx.require_admin().await?;

        let location = parse_location(latitude, longitude, ctx)?;

        ctx.service()
            .execute(command::UpdateImage {
                id: id.into(),
                thumb_hash: thumb_hash.map(Into::into),
                location,
                country: country.map(Into::into),
                created_at: created_at.map(DateTime::coerce),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes metadata of the `Image` with the specified ID.
    ///
    /// Requires administrator credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `FORBIDDEN` - the request is not made by an administrator;
    /// - `IMAGE_NOT_EXISTS` - the `Image` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteImage",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_image(
        id: api::image::Id,
        ctx: &Context,
    ) -> Result<api::Image, Error> {
        ctx.require_admin().await?;

        ctx.service()
            .execute(command::DeleteImage { id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::create_image::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Duplicate(_) => Some(api::image::ImageError::Exists.into()),
        }
    }
}

/// Parses an optional [`domain::image::Location`] out of GraphQL arguments.
///
/// # Errors
///
/// If only one coordinate is provided, or any of them is out of range.
fn parse_location(
    latitude: Option<f64>,
    longitude: Option<f64>,
    ctx: &Context,
) -> Result<Option<domain::image::Location>, Error> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(lat), Some(long)) => domain::image::Location::new(lat, long)
            .map(Some)
            .ok_or_else(|| api::image::ImageError::InvalidLocation.into()),
        (Some(_), None) | (None, Some(_)) => {
            Err(api::image::ImageError::InvalidLocation.into())
        }
    }
    .map_err(ctx.error())
}

impl AsError for command::update_image::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotExists(_) => {
                Some(api::image::ImageError::NotExists.into())
            }
        }
    }
}

impl AsError for command::delete_image::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotExists(_) => {
                Some(api::image::ImageError::NotExists.into())
            }
        }
    }
}
