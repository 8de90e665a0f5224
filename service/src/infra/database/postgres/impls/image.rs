//! [`Image`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{image, Image},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Builds an [`Image`] out of the provided [`Row`].
///
/// The [`Row`] must contain all the columns of the `images` table.
fn image_from_row(row: &Row) -> Image {
    let latitude = row.get::<_, Option<f64>>("latitude");
    let longitude = row.get::<_, Option<f64>>("longitude");
    Image {
        id: row.get("id"),
        mime_type: row.get("mime_type"),
        width: row.get("width"),
        height: row.get("height"),
        thumb_hash: row.get("thumb_hash"),
        location: latitude
            .zip(longitude)
            .and_then(|(lat, long)| image::Location::new(lat, long)),
        country: row.get("country"),
        created_at: row.get("created_at"),
        uploaded_at: row.get("uploaded_at"),
    }
}

impl<C> Database<Select<By<Option<Image>, image::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Image>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Image>, image::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: image::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, mime_type, width, height, thumb_hash, \
                   latitude, longitude, country, \
                   created_at, uploaded_at \
            FROM images \
            WHERE id = $1::VARCHAR \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(image_from_row))
    }
}

impl<C> Database<Insert<Image>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(image): Insert<Image>,
    ) -> Result<Self::Ok, Self::Err> {
        let Image {
            id,
            mime_type,
            width,
            height,
            thumb_hash,
            location,
            country,
            created_at,
            uploaded_at,
        } = image;

        let latitude = location.map(|l| l.latitude());
        let longitude = location.map(|l| l.longitude());

        const SQL: &str = "\
            INSERT INTO images (\
                id, mime_type, width, height, thumb_hash, \
                latitude, longitude, country, \
                created_at, uploaded_at \
            ) VALUES (\
                $1::VARCHAR, $2::VARCHAR, $3::INT4, $4::INT4, $5::VARCHAR, \
                $6::FLOAT8, $7::FLOAT8, $8::VARCHAR, \
                $9::TIMESTAMPTZ, $10::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(
            SQL,
            &[
                &id,
                &mime_type,
                &width,
                &height,
                &thumb_hash,
                &latitude,
                &longitude,
                &country,
                &created_at,
                &uploaded_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|inserted| inserted > 0)
    }
}

impl<C> Database<Update<Image>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(image): Update<Image>,
    ) -> Result<Self::Ok, Self::Err> {
        let Image {
            id,
            mime_type,
            width,
            height,
            thumb_hash,
            location,
            country,
            created_at,
            uploaded_at: _,
        } = image;

        let latitude = location.map(|l| l.latitude());
        let longitude = location.map(|l| l.longitude());

        const SQL: &str = "\
            UPDATE images \
            SET mime_type = $2::VARCHAR, \
                width = $3::INT4, \
                height = $4::INT4, \
                thumb_hash = $5::VARCHAR, \
                latitude = $6::FLOAT8, \
                longitude = $7::FLOAT8, \
                country = $8::VARCHAR, \
                created_at = $9::TIMESTAMPTZ \
            WHERE id = $1::VARCHAR";
        self.exec(
            SQL,
            &[
                &id,
                &mime_type,
                &width,
                &height,
                &thumb_hash,
                &latitude,
                &longitude,
                &country,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|updated| updated > 0)
    }
}

impl<C> Database<Delete<By<Image, image::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Image>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Image, image::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: image::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM images \
            WHERE id = $1::VARCHAR \
            RETURNING id, mime_type, width, height, thumb_hash, \
                      latitude, longitude, country, \
                      created_at, uploaded_at";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(image_from_row))
    }
}

impl<C>
    Database<
        Select<By<Vec<read::image::list::Edge>, read::image::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::image::list::Edge>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::image::list::Edge>, read::image::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::image::list::Selector {
            order,
            paging,
            limit,
            filter: read::image::list::Filter { countries },
        } = by.into_inner();

        let offset = i64::try_from(paging.offset(limit)).unwrap_or(i64::MAX);
        let limit = i64::from(limit);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &offset];

        let anchor_idx = paging.seek_key().map(|id| {
            ps.push(id);
            ps.len()
        });
        let countries_idx = (!countries.is_empty()).then(|| {
            ps.push(&countries);
            ps.len()
        });

        let sql = list_sql(order, anchor_idx, countries_idx);

        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let image = image_from_row(row);
                read::image::list::Edge {
                    cursor: image.id.clone(),
                    node: image,
                }
            })
            .collect())
    }
}

/// Builds SQL selecting a page of [`Image`]s.
///
/// `$1` is the limit and `$2` is the offset. `anchor_idx` and
/// `countries_idx` are positions of the anchor [`image::Id`] and the
/// [`image::Country`] array parameters, if any.
fn list_sql(
    order: common::Order,
    anchor_idx: Option<usize>,
    countries_idx: Option<usize>,
) -> String {
    // Ties on `created_at` are broken by `id`, so the seek predicate
    // neither skips nor repeats rows on page boundaries.
    format!(
        "SELECT id, mime_type, width, height, thumb_hash, \
                latitude, longitude, country, \
                created_at, uploaded_at \
         FROM images \
         WHERE true\
               {anchor}\
               {countries} \
         ORDER BY created_at {order}, \
                  id {order} \
         LIMIT $1::INT8 \
         OFFSET $2::INT8",
        anchor = anchor_idx.into_iter().format_with("", |idx, f| {
            let op = order.operator();
            f(&format_args!(
                " AND (created_at, id) {op} (\
                     SELECT created_at, id \
                     FROM images \
                     WHERE id = ${idx}::VARCHAR\
                 )"
            ))
        }),
        countries = countries_idx.into_iter().format_with("", |idx, f| {
            f(&format_args!(" AND country = ANY(${idx}::VARCHAR[])"))
        }),
        order = order.sql(),
    )
}

#[cfg(test)]
mod spec {
    use common::Order;

    use super::list_sql;

    /// Collapses whitespace runs, so assertions don't depend on indentation.
    fn squash(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn lists_from_start_without_predicates() {
        let sql = squash(&list_sql(Order::Ascending, None, None));

        assert!(sql.contains("FROM images WHERE true ORDER BY"), "{sql}");
        assert!(
            sql.ends_with(
                "ORDER BY created_at ASC, id ASC LIMIT $1::INT8 OFFSET $2::INT8",
            ),
            "{sql}",
        );
        assert!(!sql.contains("ANY"), "{sql}");
    }

    #[test]
    fn seeks_after_anchor_by_composite_key() {
        let asc = squash(&list_sql(Order::Ascending, Some(3), None));
        let desc = squash(&list_sql(Order::Descending, Some(3), None));

        assert!(
            asc.contains(
                "WHERE true AND (created_at, id) > (SELECT created_at, id \
                 FROM images WHERE id = $3::VARCHAR) ORDER BY created_at ASC, \
                 id ASC",
            ),
            "{asc}",
        );
        assert!(
            desc.contains(
                "AND (created_at, id) < (SELECT created_at, id FROM images \
                 WHERE id = $3::VARCHAR) ORDER BY created_at DESC, id DESC",
            ),
            "{desc}",
        );
    }

    #[test]
    fn filters_countries_after_seek() {
        let sql = squash(&list_sql(Order::Ascending, Some(3), Some(4)));

        assert!(
            sql.contains(
                "WHERE id = $3::VARCHAR) AND country = ANY($4::VARCHAR[]) \
                 ORDER BY",
            ),
            "{sql}",
        );
    }

    #[test]
    fn filters_countries_without_anchor() {
        let sql = squash(&list_sql(Order::Descending, None, Some(3)));

        assert!(
            sql.contains(
                "WHERE true AND country = ANY($3::VARCHAR[]) ORDER BY \
                 created_at DESC, id DESC",
            ),
            "{sql}",
        );
    }
}
