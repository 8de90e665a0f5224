//! [`Cursor`] definitions.
//!
//! A [`Cursor`] is a compact, URL-safe rendition of a [`ListQuery`]:
//!
//! ```text
//! o:ASC|c:Chile,Argentina|p:2|e:12345|l:2
//! ```
//!
//! Each segment is a single-character key and its value separated by `:`.
//! Segments are joined by `|`, and filter values by `,`. Only fields holding
//! non-default values are written, always in the `o`, `c`, `p`, `e`, `l`
//! order. Reading accepts segments in any order and skips unknown keys.

use std::{fmt, num::ParseIntError, str::FromStr, string::FromUtf8Error};

use base64::{prelude::BASE64_URL_SAFE, Engine as _};
use derive_more::{Display, Error as StdError};

use super::{ListQuery, Order};

/// Key of the [`ListQuery::order`].
const ORDER: char = 'o';

/// Key of the [`ListQuery::filter`].
const FILTER: char = 'c';

/// Key of the [`ListQuery::page`].
const PAGE: char = 'p';

/// Key of the [`ListQuery::anchor`].
const ANCHOR: char = 'e';

/// Key of the [`ListQuery::limit`].
const LIMIT: char = 'l';

/// Divider between `key:value` segments.
const DIVIDER: char = '|';

/// Separator between filter values.
const SEPARATOR: char = ',';

/// Separator between a key and its value.
const COLON: char = ':';

/// Characters which cannot appear inside [`Cursor`] values.
pub const RESERVED: [char; 3] = [DIVIDER, SEPARATOR, COLON];

/// Checks whether the provided `value` can be placed into a [`Cursor`].
#[must_use]
pub fn is_valid_value(value: &str) -> bool {
    !value.is_empty() && !value.contains(RESERVED)
}

/// Immutable [`ListQuery`] along with its plain string form.
///
/// Two [`Cursor`]s are equal when their plain string forms are equal.
#[derive(Clone, Debug)]
pub struct Cursor {
    /// Decoded [`ListQuery`].
    query: ListQuery,

    /// Plain (not base64-encoded) string form.
    plain: String,
}

impl Cursor {
    /// Creates a new [`Cursor`] out of the provided [`ListQuery`], encoding
    /// it canonically.
    ///
    /// # Errors
    ///
    /// If any string value of the [`ListQuery`] is empty or contains a
    /// [`RESERVED`] character.
    pub fn new(query: ListQuery) -> Result<Self, Error> {
        for value in &query.filter {
            check(FILTER, value)?;
        }
        if let Some(anchor) = &query.anchor {
            check(ANCHOR, anchor)?;
        }

        let plain = encode(&query);
        Ok(Self { query, plain })
    }

    /// Parses a [`Cursor`] which is either base64-encoded or plain.
    ///
    /// Base64 is tried first, falling back to the plain form.
    ///
    /// # Errors
    ///
    /// With [`Error::Undecodable`] if the `input` is neither a valid encoded
    /// nor a valid plain [`Cursor`].
    pub fn parse(input: &str) -> Result<Self, Error> {
        Self::from_encoded(input).or_else(|encoded| {
            Self::from_plain(input).map_err(|plain| Error::Undecodable {
                encoded: Box::new(encoded),
                plain: Box::new(plain),
            })
        })
    }

    /// Parses a base64-encoded [`Cursor`].
    ///
    /// # Errors
    ///
    /// If the `input` is not valid URL-safe base64 of a plain [`Cursor`].
    pub fn from_encoded(input: &str) -> Result<Self, Error> {
        let decoded = BASE64_URL_SAFE.decode(input).map_err(Error::Base64)?;
        Self::from_plain(&String::from_utf8(decoded).map_err(Error::Utf8)?)
    }

    /// Parses a plain [`Cursor`].
    ///
    /// An empty `input` results in a [`Cursor`] of [`ListQuery::defaults()`].
    /// Otherwise, the `input` is kept as the string form of the [`Cursor`].
    ///
    /// # Errors
    ///
    /// If the `input` is malformed.
    pub fn from_plain(input: &str) -> Result<Self, Error> {
        if input.is_empty() {
            return Self::new(ListQuery::defaults());
        }
        Ok(Self {
            query: decode(input)?,
            plain: input.to_owned(),
        })
    }

    /// Returns the [`ListQuery`] of this [`Cursor`].
    #[must_use]
    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    /// Consumes this [`Cursor`] returning its [`ListQuery`].
    #[must_use]
    pub fn into_query(self) -> ListQuery {
        self.query
    }

    /// Returns the plain string form of this [`Cursor`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.plain
    }

    /// Returns the URL-safe base64 form of this [`Cursor`].
    #[must_use]
    pub fn encoded(&self) -> String {
        BASE64_URL_SAFE.encode(self.plain.as_bytes())
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.plain == other.plain
    }
}

impl Eq for Cursor {}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain)
    }
}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_plain(s)
    }
}

/// Error of an invalid [`Cursor`].
#[derive(Clone, Debug, Display, Eq, PartialEq, StdError)]
pub enum Error {
    /// Key is not followed by `:` and a value.
    #[display("`{_0}` key has no value")]
    MissingValue(#[error(not(source))] char),

    /// Value is empty where it's not allowed.
    #[display("`{_0}` key has an empty value")]
    EmptyValue(#[error(not(source))] char),

    /// Value contains a [`RESERVED`] character.
    #[display("`{key}` key value `{value}` contains a reserved character")]
    ReservedCharacter {
        /// Key of the value.
        key: char,

        /// Offending value.
        value: String,
    },

    /// Unknown [`Order`] literal.
    #[display("`{_0}` is not a valid order")]
    InvalidOrder(#[error(not(source))] String),

    /// Value is not a non-negative integer.
    #[display("`{key}` key value is not a non-negative integer: {source}")]
    InvalidNumber {
        /// Key of the value.
        key: char,

        /// Parsing error.
        source: ParseIntError,
    },

    /// Input is not valid base64.
    #[display("Invalid base64: {_0}")]
    Base64(base64::DecodeError),

    /// Decoded input is not valid UTF-8.
    #[display("Invalid UTF-8: {_0}")]
    Utf8(FromUtf8Error),

    /// Input is neither a valid encoded nor a valid plain [`Cursor`].
    #[display("Neither encoded ({encoded}) nor plain ({plain}) cursor")]
    Undecodable {
        /// Error of decoding the input as an encoded [`Cursor`].
        encoded: Box<Error>,

        /// Error of decoding the input as a plain [`Cursor`].
        plain: Box<Error>,
    },
}

/// Checks the `value` of the `key` to be placed into a [`Cursor`].
fn check(key: char, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::EmptyValue(key));
    }
    if value.contains(RESERVED) {
        return Err(Error::ReservedCharacter {
            key,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Encodes the provided [`ListQuery`] into its canonical plain form.
fn encode(query: &ListQuery) -> String {
    let ListQuery {
        order,
        filter,
        page,
        anchor,
        limit,
    } = query;

    let mut segments = Vec::with_capacity(5);
    if let Some(order) = order {
        segments.push(format!("{ORDER}{COLON}{order}"));
    }
    if !filter.is_empty() {
        let sep = SEPARATOR.to_string();
        segments.push(format!("{FILTER}{COLON}{}", filter.join(&sep)));
    }
    if *page > 0 {
        segments.push(format!("{PAGE}{COLON}{page}"));
    }
    if let Some(anchor) = anchor.as_deref().filter(|a| !a.is_empty()) {
        segments.push(format!("{ANCHOR}{COLON}{anchor}"));
    }
    if *limit > 0 {
        segments.push(format!("{LIMIT}{COLON}{limit}"));
    }

    segments.join(&DIVIDER.to_string())
}

/// Decodes the provided non-empty plain form into a [`ListQuery`].
fn decode(plain: &str) -> Result<ListQuery, Error> {
    let mut query = ListQuery::default();

    for segment in plain.split(DIVIDER) {
        let mut chars = segment.chars();
        let Some(key) = chars.next() else {
            continue;
        };
        let known = [ORDER, FILTER, PAGE, ANCHOR, LIMIT].contains(&key);

        let Some(value) = chars.as_str().strip_prefix(COLON) else {
            if known {
                return Err(Error::MissingValue(key));
            }
            continue;
        };

        match key {
            ORDER => {
                query.order = Some(
                    value
                        .parse::<Order>()
                        .map_err(|_| Error::InvalidOrder(value.to_owned()))?,
                );
            }
            FILTER => {
                query.filter = value
                    .split(SEPARATOR)
                    .map(|v| check(FILTER, v).map(|()| v.to_owned()))
                    .collect::<Result<_, _>>()?;
            }
            PAGE => query.page = read_number(PAGE, value)?,
            ANCHOR => {
                query.anchor = if value.is_empty() {
                    None
                } else {
                    check(ANCHOR, value)?;
                    Some(value.to_owned())
                };
            }
            LIMIT => query.limit = read_number(LIMIT, value)?,
            // Unknown keys are skipped, so newer cursors stay readable.
            _ => {}
        }
    }

    Ok(query)
}

/// Reads a non-negative integer `value` of the `key`.
fn read_number(key: char, value: &str) -> Result<u32, Error> {
    value
        .parse()
        .map_err(|source| Error::InvalidNumber { key, source })
}

#[cfg(test)]
mod spec {
    use base64::{prelude::BASE64_URL_SAFE, Engine as _};

    use super::{Cursor, Error, ListQuery, Order};

    fn full() -> ListQuery {
        ListQuery {
            order: Some(Order::Ascending),
            filter: vec![
                "United States".into(),
                "Chile".into(),
                "Argentina".into(),
            ],
            page: 2,
            anchor: Some("abc567".into()),
            limit: 1000,
        }
    }

    #[test]
    fn encodes_canonically() {
        let cursor = Cursor::new(ListQuery {
            order: Some(Order::Ascending),
            filter: vec!["Chile".into(), "Argentina".into()],
            page: 2,
            anchor: Some("12345".into()),
            limit: 2,
        })
        .unwrap();

        assert_eq!(cursor.as_str(), "o:ASC|c:Chile,Argentina|p:2|e:12345|l:2");
        assert_eq!(cursor.to_string(), cursor.as_str());
    }

    #[test]
    fn omits_default_values() {
        for (query, expected) in [
            (ListQuery::default(), ""),
            (
                ListQuery {
                    filter: vec![
                        "United States".into(),
                        "Chile".into(),
                        "Argentina".into(),
                        "Bolivia".into(),
                    ],
                    ..ListQuery::default()
                },
                "c:United States,Chile,Argentina,Bolivia",
            ),
            (
                ListQuery {
                    page: 3,
                    ..ListQuery::default()
                },
                "p:3",
            ),
            (
                ListQuery {
                    page: 200,
                    anchor: Some("123jkl".into()),
                    ..ListQuery::default()
                },
                "p:200|e:123jkl",
            ),
            (
                ListQuery {
                    order: Some(Order::Ascending),
                    anchor: Some("abc123".into()),
                    ..ListQuery::default()
                },
                "o:ASC|e:abc123",
            ),
            (
                ListQuery {
                    order: Some(Order::Descending),
                    limit: 1,
                    ..ListQuery::default()
                },
                "o:DESC|l:1",
            ),
        ] {
            assert_eq!(Cursor::new(query).unwrap().as_str(), expected);
        }
    }

    #[test]
    fn is_smaller_than_json() {
        let queries = [
            full(),
            ListQuery::defaults(),
            ListQuery {
                filter: vec!["Chile".into()],
                anchor: Some("V1StGXR8_Z5jdHi6B-myT".into()),
                ..ListQuery::default()
            },
        ];

        for query in queries {
            let json = serde_json::json!({
                "order": query.order.map(|o| o.to_string()),
                "filter": query.filter,
                "page": query.page,
                "anchor": query.anchor,
                "limit": query.limit,
            });
            let json = BASE64_URL_SAFE.encode(json.to_string());

            let cursor = Cursor::new(query).unwrap();
            assert!(
                cursor.encoded().len() < json.len(),
                "`{cursor}` is not smaller than `{json}`",
            );
        }
    }

    #[test]
    fn blank_falls_back_to_defaults() {
        for cursor in [
            Cursor::parse("").unwrap(),
            Cursor::from_plain("").unwrap(),
            Cursor::from_encoded("").unwrap(),
        ] {
            assert_eq!(
                cursor.query(),
                &ListQuery {
                    order: Some(Order::Ascending),
                    filter: vec![],
                    page: 0,
                    anchor: None,
                    limit: 5,
                },
            );
            assert_eq!(cursor.as_str(), "o:ASC|l:5");
        }
    }

    #[test]
    fn parses_encoded_and_plain() {
        let cursor = Cursor::new(full()).unwrap();
        let expected = "o:ASC|c:United States,Chile,Argentina|p:2|e:abc567|l:1000";

        let encoded = Cursor::parse(&cursor.encoded()).unwrap();
        assert_eq!(encoded.query(), &full());
        assert_eq!(encoded.as_str(), expected);

        let plain = Cursor::parse(cursor.as_str()).unwrap();
        assert_eq!(plain.query(), &full());
        assert_eq!(plain.as_str(), expected);

        assert_eq!(encoded, plain);
    }

    #[test]
    fn round_trips_any_set_of_fields() {
        let full = full();
        for mask in 1_u8..32 {
            let query = ListQuery {
                order: (mask & 1 != 0).then_some(Order::Descending),
                filter: if mask & 2 != 0 {
                    full.filter.clone()
                } else {
                    vec![]
                },
                page: if mask & 4 != 0 { full.page } else { 0 },
                anchor: (mask & 8 != 0).then(|| full.anchor.clone()).flatten(),
                limit: if mask & 16 != 0 { full.limit } else { 0 },
            };

            let cursor = Cursor::new(query.clone()).unwrap();
            assert_eq!(Cursor::parse(&cursor.encoded()).unwrap().query(), &query);
        }
    }

    #[test]
    fn parses_keys_in_any_order() {
        for input in [
            "o:ASC|c:United States,Chile,Argentina|p:2|e:abc567|l:1000",
            "c:United States,Chile,Argentina|p:2|e:abc567|l:1000|o:ASC",
            "e:abc567|c:United States,Chile,Argentina|p:2|l:1000|o:ASC",
            "e:abc567|p:2|c:United States,Chile,Argentina|l:1000|o:ASC",
            "c:United States,Chile,Argentina|e:abc567|p:2|o:ASC|l:1000",
            "l:1000|e:abc567|p:2|o:ASC|c:United States,Chile,Argentina",
            "l:1000|e:abc567|o:ASC|c:United States,Chile,Argentina|p:2",
        ] {
            let cursor = Cursor::parse(input).unwrap();

            assert_eq!(cursor.query(), &full(), "input: {input}");
            assert_eq!(cursor.as_str(), input);
        }
    }

    #[test]
    fn equality_is_by_string_form() {
        let a = Cursor::parse("o:ASC|l:3").unwrap();
        let b = Cursor::parse("l:3|o:ASC").unwrap();

        assert_eq!(a.query(), b.query());
        assert_ne!(a, b);
    }

    #[test]
    fn skips_unknown_keys() {
        let cursor = Cursor::parse("x:1|o:DESC||zz|l:3").unwrap();

        assert_eq!(cursor.query().order, Some(Order::Descending));
        assert_eq!(cursor.query().limit, 3);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            "o:asc".parse::<Cursor>().unwrap_err(),
            Error::InvalidOrder("asc".into()),
        );
        assert_eq!("c".parse::<Cursor>().unwrap_err(), Error::MissingValue('c'));
        assert_eq!(
            "o:ASC|lim:5".parse::<Cursor>().unwrap_err(),
            Error::MissingValue('l'),
        );
        assert_eq!(
            "c:Chile,,Peru".parse::<Cursor>().unwrap_err(),
            Error::EmptyValue('c'),
        );
        assert!(matches!(
            "p:two".parse::<Cursor>().unwrap_err(),
            Error::InvalidNumber { key: 'p', .. },
        ));
        assert!(matches!(
            "l:-1".parse::<Cursor>().unwrap_err(),
            Error::InvalidNumber { key: 'l', .. },
        ));
        assert!(matches!(
            "e:a:b".parse::<Cursor>().unwrap_err(),
            Error::ReservedCharacter { key: 'e', .. },
        ));

        assert!(matches!(
            Cursor::parse("o:UP").unwrap_err(),
            Error::Undecodable { .. },
        ));
    }

    #[test]
    fn decoding_mode_can_be_forced() {
        let cursor = Cursor::new(full()).unwrap();

        assert!(matches!(
            Cursor::from_encoded(cursor.as_str()).unwrap_err(),
            Error::Base64(_),
        ));
        assert_eq!(
            Cursor::from_encoded(&cursor.encoded()).unwrap().query(),
            &full(),
        );
        assert_eq!(
            Cursor::from_plain(cursor.as_str()).unwrap().query(),
            &full(),
        );
    }

    #[test]
    fn rejects_reserved_characters() {
        for value in ["Chile|Peru", "Chile,Peru", "Chile:Peru", ""] {
            let err = Cursor::new(ListQuery {
                filter: vec![value.into()],
                ..ListQuery::default()
            })
            .unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::ReservedCharacter { key: 'c', .. }
                        | Error::EmptyValue('c'),
                ),
                "value: {value}",
            );
        }

        assert!(Cursor::new(ListQuery::default().after("a|b")).is_err());
        assert!(Cursor::new(ListQuery::default().after("")).is_err());
    }
}
