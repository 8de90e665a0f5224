//! GraphQL [`Query`]s definitions.

use common::ListQuery;
use juniper::graphql_object;
use service::{query, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Image` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `IMAGE_NOT_EXISTS` - the `Image` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "image",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn image(
        id: api::image::Id,
        ctx: &Context,
    ) -> Result<api::Image, Error> {
        ctx.service()
            .execute(query::image::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::image::ImageError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches a page of `Image`s ordered by the `DateTime` they were taken.
    ///
    /// Either a `cursor` returned by a previous call is provided alone, or
    /// the list is started anew with the provided `countries`, `order`,
    /// `limit` and `page` (any of them may be omitted).
    ///
    /// A zero or omitted `limit` means the configured page size.
    ///
    /// `backward` reverses the returned page, which is handy for cursors
    /// paging backward.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the `cursor` is combined with
    ///                                      other list arguments;
    /// - `INVALID_CURSOR` - the `cursor` cannot be decoded;
    /// - `INVALID_LIMIT` - the `limit` or the `page` is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            backward = ?backward,
            countries = ?countries.as_ref().map(|cs| {
                cs.iter().map(ToString::to_string).collect::<Vec<_>>()
            }),
            cursor = ?cursor.as_ref().map(ToString::to_string),
            gql.name = "images",
            limit = ?limit,
            order = ?order,
            otel.name = Self::SPAN_NAME,
            page = ?page,
        ),
    )]
    pub async fn images(
        cursor: Option<api::image::Cursor>,
        countries: Option<Vec<api::image::Country>>,
        order: Option<api::image::Order>,
        limit: Option<i32>,
        page: Option<i32>,
        backward: Option<bool>,
        ctx: &Context,
    ) -> Result<api::image::List, Error> {
        let query = if let Some(cursor) = cursor {
            if countries.is_some()
                || order.is_some()
                || limit.is_some()
                || page.is_some()
            {
                return Err(api::PaginationError::Ambiguous.into())
                    .map_err(ctx.error());
            }
            cursor
                .decode()
                .map_err(AsError::into_error)
                .map_err(ctx.error())?
                .into_query()
        } else {
            ListQuery {
                order: Some(order.unwrap_or_default().into()),
                filter: countries
                    .unwrap_or_default()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                page: non_negative(page, ctx)?.unwrap_or_default(),
                anchor: None,
                limit: non_negative(limit, ctx)?
                    .filter(|l| *l > 0)
                    .unwrap_or(ctx.service().config().page_limit),
            }
        };

        let page = ctx
            .service()
            .execute(query::images::List(query))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(if backward.unwrap_or_default() {
            page.reverse()
        } else {
            page
        }
        .into())
    }

    /// Jumps to the `Image` with the specified ID, fetching up to `limit`
    /// of its neighbours on each side.
    ///
    /// Neighbours are taken in any of the provided `countries` (all if
    /// omitted) and ordered by the provided `order`. A zero or omitted
    /// `limit` means the configured number of neighbours.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `IMAGE_NOT_EXISTS` - the `Image` with the specified ID does not
    ///                        exist;
    /// - `INVALID_LIMIT` - the `limit` is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            countries = ?countries.as_ref().map(|cs| {
                cs.iter().map(ToString::to_string).collect::<Vec<_>>()
            }),
            gql.name = "imagesAround",
            id = %id,
            limit = ?limit,
            order = ?order,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn images_around(
        id: api::image::Id,
        countries: Option<Vec<api::image::Country>>,
        order: Option<api::image::Order>,
        limit: Option<i32>,
        ctx: &Context,
    ) -> Result<api::image::Window, Error> {
        ctx.service()
            .execute(query::images::Around {
                id: id.into(),
                order: order.unwrap_or_default().into(),
                filter: countries
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                limit: non_negative(limit, ctx)?,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

/// Converts the provided GraphQL integer argument into a [`u32`].
///
/// # Errors
///
/// If the argument is negative.
fn non_negative(arg: Option<i32>, ctx: &Context) -> Result<Option<u32>, Error> {
    arg.map(u32::try_from)
        .transpose()
        .map_err(|_| api::PaginationError::InvalidLimit.into())
        .map_err(ctx.error())
}
