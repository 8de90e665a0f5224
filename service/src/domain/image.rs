//! [`Image`] definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::{pagination::cursor, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};
use uuid::Uuid;

/// Metadata of a photo in the gallery.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    /// ID of this [`Image`].
    pub id: Id,

    /// [`MimeType`] of this [`Image`] file.
    pub mime_type: MimeType,

    /// Width of this [`Image`] in pixels.
    pub width: Dimension,

    /// Height of this [`Image`] in pixels.
    pub height: Dimension,

    /// [`ThumbHash`] placeholder of this [`Image`].
    pub thumb_hash: ThumbHash,

    /// [`Location`] this [`Image`] was taken at, if known.
    pub location: Option<Location>,

    /// [`Country`] this [`Image`] was taken in, if known.
    pub country: Option<Country>,

    /// [`DateTime`] when this [`Image`] was taken.
    ///
    /// Sort key of [`Image`] lists.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Image`] was uploaded.
    pub uploaded_at: UploadDateTime,
}

/// ID of an [`Image`].
///
/// Never contains [`cursor::RESERVED`] characters, so it's always usable as
/// a [`Cursor`] anchor.
///
/// [`Cursor`]: common::Cursor
#[derive(
    AsRef, Clone, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`] if the given `id` is valid.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        Self::check(&id).then_some(Self(id))
    }

    /// Generates a new random [`Id`].
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Checks whether the given `id` is a valid [`Id`].
    fn check(id: &str) -> bool {
        cursor::is_valid_value(id) && id.trim() == id && id.len() <= 64
    }
}

impl FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Id`")
    }
}

/// MIME type of an [`Image`] file, like `image/jpeg`.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct MimeType(String);

impl MimeType {
    /// Creates a new [`MimeType`] if the given `mime` is valid.
    #[must_use]
    pub fn new(mime: impl Into<String>) -> Option<Self> {
        let mime = mime.into();
        Self::check(&mime).then_some(Self(mime))
    }

    /// Checks whether the given `mime` is a valid [`MimeType`].
    fn check(mime: &str) -> bool {
        mime.split_once('/').is_some_and(|(ty, sub)| {
            !ty.is_empty()
                && !sub.is_empty()
                && !mime.contains(char::is_whitespace)
        }) && mime.len() <= 255
    }
}

impl FromStr for MimeType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `MimeType`")
    }
}

/// Size of an [`Image`] side in pixels.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Dimension(u32);

#[cfg(feature = "postgres")]
impl FromSql<'_> for Dimension {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(Self(u32::try_from(i32::from_sql(ty, raw)?)?))
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Dimension {
    accepts!(INT4);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut postgres_types::private::BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        i32::try_from(self.0)?.to_sql(ty, w)
    }
}

/// [ThumbHash] of an [`Image`], encoded in base64.
///
/// [ThumbHash]: https://evanw.github.io/thumbhash
#[derive(AsRef, Clone, Debug, Default, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct ThumbHash(String);

impl ThumbHash {
    /// Creates a new [`ThumbHash`] if the given `hash` is valid.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Option<Self> {
        let hash = hash.into();
        Self::check(&hash).then_some(Self(hash))
    }

    /// Checks whether the given `hash` is a valid [`ThumbHash`].
    fn check(hash: &str) -> bool {
        hash.len() <= 128
            && hash.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
            })
    }
}

impl FromStr for ThumbHash {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `ThumbHash`")
    }
}

/// Geographic coordinates an [`Image`] was taken at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// Latitude in degrees.
    latitude: f64,

    /// Longitude in degrees.
    longitude: f64,
}

impl Location {
    /// Creates a new [`Location`] if the given coordinates are within the
    /// valid range.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        ((-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude))
        .then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Returns the latitude of this [`Location`] in degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude of this [`Location`] in degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Country an [`Image`] was taken in.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Country(String);

impl Country {
    /// Creates a new [`Country`] if the given `country` is valid.
    #[must_use]
    pub fn new(country: impl Into<String>) -> Option<Self> {
        let country = country.into();
        Self::check(&country).then_some(Self(country))
    }

    /// Checks whether the given `country` is a valid [`Country`].
    ///
    /// [`cursor::RESERVED`] characters are disallowed, so a [`Country`] is
    /// always usable as a [`Cursor`] filter value.
    ///
    /// [`Cursor`]: common::Cursor
    fn check(country: &str) -> bool {
        cursor::is_valid_value(country)
            && country.trim() == country
            && country.len() <= 512
    }
}

impl FromStr for Country {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Country`")
    }
}

/// Marker of an [`Image`] being taken.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker of an [`Image`] being uploaded.
#[derive(Clone, Copy, Debug)]
pub struct Upload;

/// [`DateTime`] when an [`Image`] was taken.
pub type CreationDateTime = DateTimeOf<(Image, Creation)>;

/// [`DateTime`] when an [`Image`] was uploaded.
pub type UploadDateTime = DateTimeOf<(Image, Upload)>;

#[cfg(test)]
mod spec {
    use super::{Country, Id, Location, MimeType, ThumbHash};

    #[test]
    fn id_is_cursor_safe() {
        assert!(Id::new("2f9a1c0b3e4d").is_some());
        assert!(Id::new("").is_none());
        assert!(Id::new(" abc").is_none());
        for reserved in ["a|b", "a,b", "a:b"] {
            assert!(Id::new(reserved).is_none(), "{reserved}");
        }

        let random = Id::random();
        assert_eq!(AsRef::<str>::as_ref(&random).len(), 32);
        assert_eq!(random.to_string().parse::<Id>(), Ok(random));
    }

    #[test]
    fn country_is_cursor_safe() {
        assert!(Country::new("United States").is_some());
        assert!(Country::new("Chile,Peru").is_none());
        assert!(Country::new("Chile ").is_none());
        assert!(Country::new("").is_none());
    }

    #[test]
    fn validates_mime_type() {
        assert!(MimeType::new("image/jpeg").is_some());
        assert!(MimeType::new("jpeg").is_none());
        assert!(MimeType::new("image/").is_none());
        assert!(MimeType::new("image/ jpeg").is_none());
    }

    #[test]
    fn validates_thumb_hash() {
        assert!(ThumbHash::new("1QcSHQRnh493V4dIh4eXh1h4kJUI").is_some());
        assert!(ThumbHash::new("not base64!").is_none());
    }

    #[test]
    fn validates_location() {
        assert!(Location::new(-33.45, -70.66).is_some());
        assert!(Location::new(91.0, 0.0).is_none());
        assert!(Location::new(0.0, -180.5).is_none());
    }
}
