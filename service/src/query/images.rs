//! [`Query`] collection related to lists of [`Image`]s.

use common::{
    operations::{By, Select},
    pagination::{cursor, ListQuery, Order},
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{image, Image},
    infra::{database, Database},
    read::image::list,
    Service,
};

use super::Query;

/// [`Query`] fetching a page of an [`Image`] list described by the
/// [`ListQuery`].
///
/// [`Image`]s are sorted by their [`image::CreationDateTime`] (ties are
/// broken by [`image::Id`]). An anchor unknown to the [`Database`] results in
/// an empty [`list::Page`].
#[derive(Clone, Debug)]
pub struct List(pub ListQuery);

/// [`Query`] fetching the page preceding the anchor of the [`ListQuery`].
///
/// The [`Order`] is flipped for fetching, and the result is reversed back
/// into the requested [`Order`]. Continuation of the resulting
/// [`list::Page`] keeps the flipped [`Order`], so it pages further backward.
#[derive(Clone, Debug)]
pub struct Preceding(pub ListQuery);

/// [`Query`] jumping to an [`Image`] and fetching its neighbours on both
/// sides.
#[derive(Clone, Debug)]
pub struct Around {
    /// ID of the [`Image`] to jump to.
    pub id: image::Id,

    /// [`Order`] of the neighbours.
    pub order: Order,

    /// [`image::Country`]s any of which the neighbours must be taken in.
    ///
    /// Empty means no filtering.
    pub filter: Vec<image::Country>,

    /// Maximum number of neighbours on each side.
    ///
    /// [`Config::neighbour_limit`] is used if [`None`] or zero.
    ///
    /// [`Config::neighbour_limit`]: crate::Config::neighbour_limit
    pub limit: Option<u32>,
}

/// Result of an [`Around`] [`Query`].
///
/// Each side is fetched independently, so it's reported on its own.
#[derive(Debug)]
pub struct Window {
    /// [`Image`]s preceding the [`Window::target`], in the requested
    /// [`Order`].
    pub before: Result<list::Page, Traced<ExecutionError>>,

    /// [`Image`] the [`Window`] is built around.
    pub target: Image,

    /// [`Image`]s following the [`Window::target`], in the requested
    /// [`Order`].
    pub after: Result<list::Page, Traced<ExecutionError>>,
}

impl<Db> Query<List> for Service<Db>
where
    Db: Database<
        Select<By<Vec<list::Edge>, list::Selector>>,
        Ok = Vec<list::Edge>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = list::Page;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        List(query): List,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Some(selector) = selector(&query) else {
            tracing::debug!(
                anchor = query.anchor(),
                "unresolvable `ListQuery`, nothing to list",
            );
            return list::Page::new(&query, Vec::<list::Edge>::new())
                .map_err(tracerr::from_and_wrap!(=> E));
        };
        tracing::debug!(paging = ?selector.paging, "listing `Image`s");

        let edges = self
            .database()
            .execute(Select(By::new(selector)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        list::Page::new(&query, edges).map_err(tracerr::from_and_wrap!(=> E))
    }
}

/// Resolves a [`list::Selector`] out of the provided [`ListQuery`].
///
/// [`None`] if the [`ListQuery`] refers to values no [`Image`] can have, so
/// nothing can be listed.
fn selector(query: &ListQuery) -> Option<list::Selector> {
    let countries = query
        .filter
        .iter()
        .map(|c| image::Country::new(c.as_str()))
        .collect::<Option<Vec<_>>>()?;

    list::Selector::from_query(
        query,
        |id| image::Id::new(id).ok_or(()),
        list::Filter { countries },
    )
    .ok()
}

impl<Db> Query<Preceding> for Service<Db>
where
    Self: Query<List, Ok = list::Page, Err = Traced<ExecutionError>>,
{
    type Ok = list::Page;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Preceding(query): Preceding,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(List(query.reversed()))
            .await
            .map(list::Page::reverse)
            .map_err(tracerr::wrap!())
    }
}

impl<Db> Query<Around> for Service<Db>
where
    Db: Database<
        Select<By<Option<Image>, image::Id>>,
        Ok = Option<Image>,
        Err = Traced<database::Error>,
    >,
    Self: Query<List, Ok = list::Page, Err = Traced<ExecutionError>>
        + Query<Preceding, Ok = list::Page, Err = Traced<ExecutionError>>,
{
    type Ok = Window;
    type Err = Traced<AroundError>;

    async fn execute(&self, around: Around) -> Result<Self::Ok, Self::Err> {
        use AroundError as E;

        let Around {
            id,
            order,
            filter,
            limit,
        } = around;

        let target = self
            .database()
            .execute(Select(By::<Option<Image>, _>::new(id.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotExists(id))
            .map_err(tracerr::wrap!())?;

        let query = ListQuery {
            order: Some(order),
            filter: filter.iter().map(ToString::to_string).collect(),
            page: 0,
            anchor: Some(target.id.to_string()),
            limit: limit
                .filter(|l| *l > 0)
                .unwrap_or(self.config().neighbour_limit),
        };

        let (before, after) = futures::join!(
            self.execute(Preceding(query.clone())),
            self.execute(List(query)),
        );

        Ok(Window {
            before,
            target,
            after,
        })
    }
}

/// Error of [`List`] or [`Preceding`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Continuation [`Cursor`] cannot be encoded.
    ///
    /// [`Cursor`]: common::Cursor
    #[display("Cannot encode continuation `Cursor`: {_0}")]
    Cursor(cursor::Error),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

/// Error of [`Around`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum AroundError {
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
    use std::time::Duration;

    use common::{
        operations::Insert,
        pagination::{ListQuery, Order},
        DateTime,
    };

    use crate::{
        domain::{image, Image},
        infra::{Database as _, Memory},
        Config, Query as _, Service,
    };

    use super::{Around, AroundError, List, Preceding};

    fn image(idx: usize, country: Option<&str>) -> Image {
        let secs = 1_700_000_000 + i64::try_from(idx).unwrap() * 60;
        let taken = DateTime::from_unix_timestamp(secs).unwrap();
        Image {
            id: image::Id::new(format!("img{idx:02}")).unwrap(),
            mime_type: image::MimeType::new("image/jpeg").unwrap(),
            width: 4032.into(),
            height: 3024.into(),
            thumb_hash: image::ThumbHash::default(),
            location: None,
            country: country.map(|c| image::Country::new(c).unwrap()),
            created_at: taken.coerce(),
            uploaded_at: (taken + Duration::from_secs(3600)).coerce(),
        }
    }

    async fn service(images: Vec<Image>) -> Service<Memory> {
        let db = Memory::new();
        for image in images {
            assert!(db.execute(Insert(image)).await.unwrap());
        }
        Service::new(Config::default(), db)
    }

    fn ids(page: &crate::read::image::list::Page) -> Vec<String> {
        page.nodes().map(|i| i.id.to_string()).collect()
    }

    fn id(idx: usize) -> String {
        format!("img{idx:02}")
    }

    #[tokio::test]
    async fn pages_through_everything_once() {
        let svc = service((0..7).map(|i| image(i, None)).collect()).await;

        for order in [Order::Ascending, Order::Descending] {
            let mut query = ListQuery {
                order: Some(order),
                limit: 3,
                ..ListQuery::default()
            };
            let mut seen = vec![];
            let mut pages = 0;
            loop {
                let page = svc.execute(List(query.clone())).await.unwrap();
                if page.is_empty() {
                    break;
                }
                pages += 1;
                seen.extend(ids(&page));
                query = page.continuation.into_query();
            }

            let mut expected = (0..7).map(id).collect::<Vec<_>>();
            if order == Order::Descending {
                expected.reverse();
            }
            assert_eq!(pages, 3, "order: {order}");
            assert_eq!(seen, expected, "order: {order}");
        }
    }

    #[tokio::test]
    async fn filters_by_countries_after_anchor() {
        let countries = [
            "United States",
            "Chile",
            "Argentina",
            "Chile",
            "Chile",
            "Chile",
            "Chile",
            "Bolivia",
            "Chile",
        ];
        let svc = service(
            countries
                .iter()
                .enumerate()
                .map(|(i, c)| image(i, Some(*c)))
                .collect(),
        )
        .await;

        for (filter, continuation) in [
            (vec!["Chile"], "o:ASC|c:Chile|e:img08|l:3"),
            (
                vec!["Chile", "Argentina"],
                "o:ASC|c:Chile,Argentina|e:img08|l:3",
            ),
        ] {
            let page = svc
                .execute(List(ListQuery {
                    order: Some(Order::Ascending),
                    filter: filter.iter().map(ToString::to_string).collect(),
                    anchor: Some(id(4)),
                    limit: 3,
                    ..ListQuery::default()
                }))
                .await
                .unwrap();

            assert_eq!(ids(&page), [id(5), id(6), id(8)], "{filter:?}");
            assert_eq!(page.continuation.as_str(), continuation);

            let next = svc
                .execute(List(page.continuation.into_query()))
                .await
                .unwrap();
            assert!(next.is_empty(), "{filter:?}");
        }
    }

    #[tokio::test]
    async fn unknown_anchor_gives_empty_page() {
        let svc = service((0..4).map(|i| image(i, None)).collect()).await;

        for order in [Order::Ascending, Order::Descending] {
            let query = ListQuery {
                order: Some(order),
                anchor: Some("missing".into()),
                ..ListQuery::default()
            };
            let page = svc.execute(List(query.clone())).await.unwrap();

            assert!(page.is_empty(), "order: {order}");
            assert_eq!(page.continuation.query(), &query);
        }
    }

    #[tokio::test]
    async fn unresolvable_filter_gives_empty_page() {
        let svc = service(vec![image(0, Some("Chile"))]).await;

        let page = svc
            .execute(List(ListQuery {
                filter: vec![" Chile".into()],
                ..ListQuery::default()
            }))
            .await
            .unwrap();

        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn pages_by_offset() {
        let svc = service((0..7).map(|i| image(i, None)).collect()).await;

        let page = svc
            .execute(List(ListQuery {
                order: Some(Order::Descending),
                page: 2,
                limit: 3,
                ..ListQuery::default()
            }))
            .await
            .unwrap();

        assert_eq!(ids(&page), [id(3), id(2), id(1)]);
    }

    #[tokio::test]
    async fn breaks_ties_by_id() {
        let mut images = (0..4).map(|i| image(i, None)).collect::<Vec<_>>();
        let same = images[0].created_at;
        for image in &mut images {
            image.created_at = same;
        }
        let svc = service(images).await;

        let page = svc
            .execute(List(ListQuery {
                anchor: Some(id(1)),
                limit: 2,
                ..ListQuery::default()
            }))
            .await
            .unwrap();

        assert_eq!(ids(&page), [id(2), id(3)]);
    }

    #[tokio::test]
    async fn precedes_in_natural_order() {
        let svc = service((0..7).map(|i| image(i, None)).collect()).await;

        let page = svc
            .execute(Preceding(ListQuery {
                order: Some(Order::Ascending),
                anchor: Some(id(5)),
                limit: 3,
                ..ListQuery::default()
            }))
            .await
            .unwrap();

        assert_eq!(ids(&page), [id(2), id(3), id(4)]);
        assert_eq!(page.continuation.query().order, Some(Order::Descending));
        assert_eq!(page.continuation.query().anchor(), Some(id(2).as_str()));
    }

    #[tokio::test]
    async fn fetches_neighbours_around() {
        let svc = service((0..7).map(|i| image(i, None)).collect()).await;

        let window = svc
            .execute(Around {
                id: image::Id::new(id(5)).unwrap(),
                order: Order::Ascending,
                filter: vec![],
                limit: Some(3),
            })
            .await
            .unwrap();

        assert_eq!(window.target.id.to_string(), id(5));
        assert_eq!(ids(&window.before.unwrap()), [id(2), id(3), id(4)]);
        assert_eq!(ids(&window.after.unwrap()), [id(6)]);
    }

    #[tokio::test]
    async fn limits_neighbours_by_config() {
        let svc = service((0..15).map(|i| image(i, None)).collect()).await;

        let window = svc
            .execute(Around {
                id: image::Id::new(id(7)).unwrap(),
                order: Order::Descending,
                filter: vec![],
                limit: None,
            })
            .await
            .unwrap();

        assert_eq!(
            ids(&window.before.unwrap()),
            (8..14).rev().map(id).collect::<Vec<_>>(),
        );
        assert_eq!(
            ids(&window.after.unwrap()),
            (1..7).rev().map(id).collect::<Vec<_>>(),
        );
    }

    #[tokio::test]
    async fn zero_neighbour_limit_falls_back_to_config() {
        let svc = service((0..15).map(|i| image(i, None)).collect()).await;

        let window = svc
            .execute(Around {
                id: image::Id::new(id(7)).unwrap(),
                order: Order::Ascending,
                filter: vec![],
                limit: Some(0),
            })
            .await
            .unwrap();

        assert_eq!(window.before.unwrap().edges.len(), 6);
        assert_eq!(window.after.unwrap().edges.len(), 6);
    }

    #[tokio::test]
    async fn around_unknown_image_fails() {
        let svc = service(vec![image(0, None)]).await;

        let err = svc
            .execute(Around {
                id: image::Id::new("missing").unwrap(),
                order: Order::Ascending,
                filter: vec![],
                limit: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), AroundError::NotExists(_)));
    }
}
