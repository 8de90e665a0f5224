//! Abstractions for keyset pagination.
//!
//! A [`ListQuery`] describes which part of an ordered collection is wanted.
//! It travels between requests inside a [`Cursor`], gets resolved into a
//! [`Selector`] for the storage layer, and comes back as a [`Page`] carrying
//! the [`Cursor`] to continue from.

pub mod cursor;

use std::{fmt, num::NonZeroU32};

use strum::{Display, EnumString};

pub use self::cursor::Cursor;

/// Page size used when a [`ListQuery`] doesn't specify one.
pub const DEFAULT_LIMIT: u32 = 5;

/// Order of pagination.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumString, Eq, Hash, PartialEq,
)]
pub enum Order {
    /// Ascending order.
    #[default]
    #[strum(to_string = "ASC")]
    Ascending,

    /// Descending order.
    #[strum(to_string = "DESC")]
    Descending,
}

impl Order {
    /// Returns the opposite [`Order`].
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Returns comparison operator selecting items after an anchor in this
    /// [`Order`].
    #[must_use]
    pub const fn operator(self) -> &'static str {
        match self {
            Self::Ascending => ">",
            Self::Descending => "<",
        }
    }

    /// Applies this [`Order`] to the natural (ascending) [`Ordering`] of two
    /// items.
    ///
    /// [`Ordering`]: std::cmp::Ordering
    #[must_use]
    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }

    #[cfg(feature = "postgres")]
    /// Returns SQL keyword representing this [`Order`].
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Parameters of a list request, the decoded form of a [`Cursor`].
///
/// Unset fields hold their "empty" values (`None`, `0`, empty [`Vec`]) and
/// are omitted from the [`Cursor`] encoding. Use [`ListQuery::order()`] and
/// [`ListQuery::limit()`] to read the effective values.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ListQuery {
    /// [`Order`] of the list.
    pub order: Option<Order>,

    /// Values the filtered field must be equal to (any of them).
    ///
    /// Empty means no filtering.
    pub filter: Vec<String>,

    /// Offset page number, starting from `1`. `0` means unset.
    pub page: u32,

    /// Key of the item right before the first item of the wanted page.
    pub anchor: Option<String>,

    /// Page size. `0` means unset.
    pub limit: u32,
}

impl ListQuery {
    /// Returns a [`ListQuery`] with the default [`Order`] and
    /// [`DEFAULT_LIMIT`] set explicitly.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            order: Some(Order::default()),
            limit: DEFAULT_LIMIT,
            ..Self::default()
        }
    }

    /// Returns the effective [`Order`] of this [`ListQuery`].
    #[must_use]
    pub fn order(&self) -> Order {
        self.order.unwrap_or_default()
    }

    /// Returns the effective page size of this [`ListQuery`].
    #[must_use]
    pub fn limit(&self) -> u32 {
        if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit
        }
    }

    /// Returns the anchor of this [`ListQuery`], if it's set and non-empty.
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref().filter(|a| !a.is_empty())
    }

    /// Resolves the [`Paging`] mode requested by this [`ListQuery`].
    ///
    /// A non-empty anchor takes precedence over the page number.
    #[must_use]
    pub fn paging(&self) -> Paging<&str> {
        match (self.anchor(), NonZeroU32::new(self.page)) {
            (None, Some(page)) => Paging::ByOffset(page),
            (anchor, _) => Paging::BySeekKey(anchor),
        }
    }

    /// Returns this [`ListQuery`] with the [`Order`] flipped.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.order = Some(self.order().reverse());
        self
    }

    /// Returns this [`ListQuery`] anchored after the provided key.
    #[must_use]
    pub fn after(mut self, anchor: impl fmt::Display) -> Self {
        self.anchor = Some(anchor.to_string());
        self
    }
}

/// Paging mode of a single fetch.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Paging<K> {
    /// Classic offset pagination by page number, starting from `1`.
    ByOffset(NonZeroU32),

    /// Keyset pagination seeking past the item with the provided key.
    ///
    /// [`None`] starts from the beginning of the list.
    BySeekKey(Option<K>),
}

impl<K> Paging<K> {
    /// Returns number of items to skip before taking a page of the provided
    /// `limit`.
    #[must_use]
    pub fn offset(&self, limit: u32) -> u64 {
        match self {
            Self::ByOffset(page) => {
                u64::from(limit) * u64::from(page.get() - 1)
            }
            Self::BySeekKey(_) => 0,
        }
    }

    /// Returns the seek key of this [`Paging`], if any.
    #[must_use]
    pub fn seek_key(&self) -> Option<&K> {
        match self {
            Self::BySeekKey(key) => key.as_ref(),
            Self::ByOffset(_) => None,
        }
    }

    /// Converts the seek key of this [`Paging`] with the provided fallible
    /// function.
    ///
    /// # Errors
    ///
    /// If the provided function fails.
    pub fn try_map<T, E>(
        self,
        f: impl FnOnce(K) -> Result<T, E>,
    ) -> Result<Paging<T>, E> {
        Ok(match self {
            Self::ByOffset(page) => Paging::ByOffset(page),
            Self::BySeekKey(key) => Paging::BySeekKey(key.map(f).transpose()?),
        })
    }
}

/// Resolved selection of a single page, passed to the storage layer.
#[derive(Clone, Debug)]
pub struct Selector<K, F> {
    /// [`Order`] of the items.
    pub order: Order,

    /// [`Paging`] mode.
    pub paging: Paging<K>,

    /// Maximum number of items to select.
    pub limit: u32,

    /// Additional filter being applied to the result.
    pub filter: F,
}

impl<K, F> Selector<K, F> {
    /// Resolves a [`Selector`] out of the provided [`ListQuery`].
    ///
    /// # Errors
    ///
    /// If the anchor of the [`ListQuery`] cannot be converted into a `K`.
    pub fn from_query<E>(
        query: &ListQuery,
        key: impl FnOnce(&str) -> Result<K, E>,
        filter: F,
    ) -> Result<Self, E> {
        Ok(Self {
            order: query.order(),
            paging: query.paging().try_map(key)?,
            limit: query.limit(),
            filter,
        })
    }
}

/// An edge in a [`Page`].
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, I> {
    /// Cursor (pagination key) of this [`Edge`].
    pub cursor: C,

    /// Node of this [`Edge`].
    pub node: I,
}

impl<C, I> From<(C, I)> for Edge<C, I> {
    fn from((cursor, node): (C, I)) -> Self {
        Self { cursor, node }
    }
}

/// A page of a list.
#[derive(Clone, Debug)]
pub struct Page<C, I> {
    /// [`Edge`]s in this [`Page`].
    pub edges: Vec<Edge<C, I>>,

    /// [`Cursor`] continuing the list after this [`Page`].
    pub continuation: Cursor,
}

impl<C, I> Page<C, I> {
    /// Creates a new [`Page`] of the provided [`Edge`]s fetched by the
    /// provided [`ListQuery`].
    ///
    /// The continuation is the same [`ListQuery`] anchored after the last
    /// [`Edge`], or left untouched if there are no [`Edge`]s.
    ///
    /// # Errors
    ///
    /// If the continuation [`Cursor`] cannot be encoded.
    pub fn new(
        query: &ListQuery,
        edges: impl IntoIterator<Item = impl Into<Edge<C, I>>>,
    ) -> Result<Self, cursor::Error>
    where
        C: fmt::Display,
    {
        let edges = edges.into_iter().map(Into::into).collect::<Vec<_>>();
        let continuation = match edges.last() {
            Some(last) => query.clone().after(&last.cursor),
            None => query.clone(),
        };
        Ok(Self {
            edges,
            continuation: Cursor::new(continuation)?,
        })
    }

    /// Reverses the [`Edge`]s of this [`Page`], keeping its continuation.
    #[must_use]
    pub fn reverse(mut self) -> Self {
        self.edges.reverse();
        self
    }

    /// Indicates whether this [`Page`] has no [`Edge`]s.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns an iterator over nodes of this [`Page`].
    pub fn nodes(&self) -> impl Iterator<Item = &I> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Edge of a [`Page`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;

        #[doc = "Paging mode of a [`Selector`]."]
        pub type Paging = $crate::pagination::Paging<$cursor>;
    };
}

#[cfg(test)]
mod spec {
    use std::num::NonZeroU32;

    use super::{Edge, ListQuery, Order, Page, Paging, Selector, DEFAULT_LIMIT};

    #[test]
    fn effective_values_fall_back_to_defaults() {
        let query = ListQuery::default();

        assert_eq!(query.order(), Order::Ascending);
        assert_eq!(query.limit(), DEFAULT_LIMIT);
        assert_eq!(query.anchor(), None);
        assert_eq!(query.paging(), Paging::BySeekKey(None));
    }

    #[test]
    fn anchor_takes_precedence_over_page() {
        let query = ListQuery {
            page: 200,
            anchor: Some("123jkl".into()),
            ..ListQuery::default()
        };
        assert_eq!(query.paging(), Paging::BySeekKey(Some("123jkl")));

        let query = ListQuery {
            page: 3,
            anchor: Some(String::new()),
            ..ListQuery::default()
        };
        assert_eq!(
            query.paging(),
            Paging::ByOffset(NonZeroU32::new(3).unwrap()),
        );
    }

    #[test]
    fn offset_skips_previous_pages() {
        let paging = Paging::<()>::ByOffset(NonZeroU32::new(3).unwrap());
        assert_eq!(paging.offset(5), 10);

        let paging = Paging::<()>::ByOffset(NonZeroU32::MIN);
        assert_eq!(paging.offset(5), 0);

        assert_eq!(Paging::BySeekKey(Some(1)).offset(5), 0);
    }

    #[test]
    fn reversed_flips_effective_order() {
        assert_eq!(ListQuery::default().reversed().order, Some(Order::Descending));
        assert_eq!(
            ListQuery::defaults().reversed().reversed().order,
            Some(Order::Ascending),
        );
    }

    #[test]
    fn selector_resolves_query_once() {
        let query = ListQuery {
            order: Some(Order::Descending),
            page: 4,
            limit: 2,
            ..ListQuery::default()
        };

        let selector =
            Selector::from_query(&query, |k| k.parse::<u32>(), ()).unwrap();
        assert_eq!(selector.order, Order::Descending);
        assert_eq!(selector.limit, 2);
        assert_eq!(selector.paging.offset(selector.limit), 6);

        let query = query.after("not-a-number");
        assert!(Selector::from_query(&query, |k| k.parse::<u32>(), ()).is_err());
    }

    #[test]
    fn continuation_is_anchored_after_last_edge() {
        let query = ListQuery {
            order: Some(Order::Ascending),
            filter: vec!["Chile".into()],
            limit: 2,
            ..ListQuery::default()
        };

        let page = Page::new(&query, [(1, 'a'), (2, 'b')]).unwrap();
        assert_eq!(page.continuation.query(), &query.clone().after(2));
        assert_eq!(page.nodes().copied().collect::<String>(), "ab");

        let page =
            Page::<u8, char>::new(&query, Vec::<Edge<u8, char>>::new()).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.continuation.query(), &query);
    }

    #[test]
    fn reverse_keeps_continuation() {
        let query = ListQuery::defaults();
        let page = Page::new(&query, [(1, 'a'), (2, 'b'), (3, 'c')]).unwrap();
        let continuation = page.continuation.clone();

        let page = page.reverse();
        assert_eq!(page.nodes().copied().collect::<String>(), "cba");
        assert_eq!(page.continuation, continuation);
    }
}
