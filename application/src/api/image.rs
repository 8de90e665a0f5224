//! [`Image`]-related definitions.

use common::{pagination::cursor, DateTime};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{domain, query, read, Query as _};

use crate::{api::scalar, AsError, Context, Error};

/// Metadata of a photo in the gallery.
#[derive(Clone, Debug, From)]
pub struct Image(domain::Image);

impl Image {
    /// Name of the [`tracing::Span`] for the [`Image`] fields.
    const SPAN_NAME: &'static str = "Image field";

    /// Fetches the [`Image`] adjacent to this one in the provided
    /// [`common::Order`].
    async fn neighbour(
        &self,
        order: common::Order,
        ctx: &Context,
    ) -> Result<Option<Self>, Error> {
        let query = common::ListQuery {
            order: Some(order),
            anchor: Some(self.0.id.to_string()),
            limit: 1,
            ..common::ListQuery::defaults()
        };
        ctx.service()
            .execute(query::images::List(query))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|page| page.edges.into_iter().next().map(|e| e.node.into()))
    }
}

#[graphql_object(context = Context)]
impl Image {
    /// Unique ID of this `Image`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "id",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.clone().into()
    }

    /// MIME type of this `Image`'s content.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "mimeType",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn mime_type(&self) -> MimeType {
        self.0.mime_type.clone().into()
    }

    /// Width of this `Image` in pixels.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "width",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn width(&self) -> i32 {
        i32::try_from(u32::from(self.0.width)).unwrap_or(i32::MAX)
    }

    /// Height of this `Image` in pixels.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "height",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn height(&self) -> i32 {
        i32::try_from(u32::from(self.0.height)).unwrap_or(i32::MAX)
    }

    /// Placeholder of this `Image` to show while its content loads.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "thumbHash",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn thumb_hash(&self) -> ThumbHash {
        self.0.thumb_hash.clone().into()
    }

    /// Latitude this `Image` was taken at, if known.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "latitude",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn latitude(&self) -> Option<f64> {
        self.0.location.map(|l| l.latitude())
    }

    /// Longitude this `Image` was taken at, if known.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "longitude",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn longitude(&self) -> Option<f64> {
        self.0.location.map(|l| l.longitude())
    }

    /// Country this `Image` was taken in, if known.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "country",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn country(&self) -> Option<Country> {
        self.0.country.clone().map(Into::into)
    }

    /// `DateTime` when this `Image` was taken.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createdAt",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Image` was uploaded.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "uploadedAt",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn uploaded_at(&self) -> DateTime {
        self.0.uploaded_at.coerce()
    }

    /// `Image` taken right before this one, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "previous",
            id = %self.0.id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn previous(
        &self,
        ctx: &Context,
    ) -> Result<Option<Image>, Error> {
        self.neighbour(common::Order::Descending, ctx).await
    }

    /// `Image` taken right after this one, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "next",
            id = %self.0.id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn next(
        &self,
        ctx: &Context,
    ) -> Result<Option<Image>, Error> {
        self.neighbour(common::Order::Ascending, ctx).await
    }
}

/// ID of an `Image`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "ImageId", with = scalar::Via::<domain::image::Id>)]
pub struct Id(domain::image::Id);

/// MIME type of an `Image`, like `image/jpeg`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "ImageMimeType", with = scalar::Via::<domain::image::MimeType>)]
pub struct MimeType(domain::image::MimeType);

/// [ThumbHash] of an `Image`, encoded in base64.
///
/// [ThumbHash]: https://evanw.github.io/thumbhash
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "ImageThumbHash", with = scalar::Via::<domain::image::ThumbHash>)]
pub struct ThumbHash(domain::image::ThumbHash);

/// Country an `Image` was taken in.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "Country", with = scalar::Via::<domain::image::Country>)]
pub struct Country(domain::image::Country);

/// Order `Image`s are listed in by the `DateTime` they were taken.
#[derive(Clone, Copy, Debug, Default, GraphQLEnum)]
#[graphql(name = "ImageOrder")]
pub enum Order {
    /// Oldest `Image`s go first.
    #[default]
    Ascending,

    /// Newest `Image`s go first.
    Descending,
}

impl From<Order> for common::Order {
    fn from(order: Order) -> Self {
        match order {
            Order::Ascending => Self::Ascending,
            Order::Descending => Self::Descending,
        }
    }
}

/// Opaque position in a list of `Image`s.
///
/// Passing it back continues the list from where it stopped, with the same
/// order, filter and page size.
#[derive(Clone, Debug, Display, GraphQLScalar)]
#[graphql(name = "ImageCursor", transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Decodes this [`Cursor`] into a [`common::Cursor`].
    ///
    /// # Errors
    ///
    /// If this [`Cursor`] is neither a base64-encoded nor a plain
    /// [`common::Cursor`].
    pub fn decode(&self) -> Result<common::Cursor, cursor::Error> {
        common::Cursor::parse(&self.0)
    }
}

impl From<&common::Cursor> for Cursor {
    fn from(cursor: &common::Cursor) -> Self {
        Self(cursor.encoded())
    }
}

/// Page of `Image`s.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "ImageList", context = Context)]
pub struct List {
    /// `Image`s of this page.
    pub images: Vec<Image>,

    /// `ImageCursor` fetching the next page.
    ///
    /// Remains pointing to the same position if this page is empty, so new
    /// `Image`s can be awaited.
    pub cursor: Cursor,
}

impl From<read::image::list::Page> for List {
    fn from(page: read::image::list::Page) -> Self {
        Self {
            cursor: (&page.continuation).into(),
            images: page.edges.into_iter().map(|e| e.node.into()).collect(),
        }
    }
}

/// `Image` together with its neighbours.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "ImageWindow", context = Context)]
pub struct Window {
    /// `Image` this window is built around.
    pub image: Image,

    /// Neighbours and the `Image` itself, in the requested order.
    pub images: Vec<Image>,

    /// `ImageCursor` fetching `Image`s preceding this window.
    ///
    /// Yields them backward, so pass `backward: true` to receive them in
    /// the requested order.
    ///
    /// Absent if preceding `Image`s failed to load.
    pub previous_cursor: Option<Cursor>,

    /// `ImageCursor` fetching `Image`s following this window.
    ///
    /// Absent if following `Image`s failed to load.
    pub next_cursor: Option<Cursor>,
}

impl From<query::images::Window> for Window {
    fn from(window: query::images::Window) -> Self {
        let query::images::Window {
            before,
            target,
            after,
        } = window;

        let before = before
            .inspect_err(|e| {
                tracing::warn!("failed to load preceding `Image`s: {e}");
            })
            .ok();
        let after = after
            .inspect_err(|e| {
                tracing::warn!("failed to load following `Image`s: {e}");
            })
            .ok();

        let previous_cursor =
            before.as_ref().map(|p| (&p.continuation).into());
        let next_cursor = after.as_ref().map(|p| (&p.continuation).into());

        let image = Image::from(target);
        let images = before
            .into_iter()
            .flat_map(|p| p.edges)
            .map(|e| e.node.into())
            .chain([image.clone()])
            .chain(
                after
                    .into_iter()
                    .flat_map(|p| p.edges)
                    .map(|e| e.node.into()),
            )
            .collect();

        Self {
            image,
            images,
            previous_cursor,
            next_cursor,
        }
    }
}

impl AsError for query::images::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Cursor(_) => None,
        }
    }
}

impl AsError for query::images::AroundError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotExists(_) => Some(ImageError::NotExists.into()),
        }
    }
}

crate::define_error! {
    enum ImageError {
        #[code = "IMAGE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Image` does not exist"]
        NotExists,

        #[code = "IMAGE_EXISTS"]
        #[status = CONFLICT]
        #[message = "`Image` with such ID already exists"]
        Exists,

        #[code = "INVALID_DIMENSION"]
        #[status = BAD_REQUEST]
        #[message = "`Image` width and height cannot be negative"]
        InvalidDimension,

        #[code = "INVALID_LOCATION"]
        #[status = BAD_REQUEST]
        #[message = "`Image` location needs both latitude and longitude \
                     within their ranges"]
        InvalidLocation,
    }
}
