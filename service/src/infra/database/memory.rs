//! In-memory [`Database`] implementation.

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use common::operations::{By, Delete, Insert, Select, Update};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{image, Image},
    infra::{database, Database},
    read,
};

/// [`Database`] keeping [`Image`]s in memory.
///
/// Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`Image`]s.
    images: Arc<RwLock<BTreeMap<image::Id, Image>>>,
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compares [`Image`]s by their sort key.
///
/// Equal [`image::CreationDateTime`]s are ordered by [`image::Id`].
fn compare(a: &Image, b: &Image) -> Ordering {
    (a.created_at, &a.id).cmp(&(b.created_at, &b.id))
}

impl Database<Select<By<Option<Image>, image::Id>>> for Memory {
    type Ok = Option<Image>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Image>, image::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.images.read().await.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Image>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(image): Insert<Image>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut images = self.images.write().await;
        if images.contains_key(&image.id) {
            return Ok(false);
        }
        _ = images.insert(image.id.clone(), image);
        Ok(true)
    }
}

impl Database<Update<Image>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(image): Update<Image>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .images
            .write()
            .await
            .get_mut(&image.id)
            .map(|stored| *stored = image)
            .is_some())
    }
}

impl Database<Delete<By<Image, image::Id>>> for Memory {
    type Ok = Option<Image>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Image, image::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.images.write().await.remove(&by.into_inner()))
    }
}

impl
    Database<
        Select<By<Vec<read::image::list::Edge>, read::image::list::Selector>>,
    > for Memory
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
            filter,
        } = by.into_inner();

        let images = self.images.read().await;

        let anchor = match paging.seek_key() {
            Some(id) => match images.get(id) {
                Some(anchor) => Some(anchor),
                // Nothing follows an unknown anchor.
                None => return Ok(vec![]),
            },
            None => None,
        };

        let mut selected = images
            .values()
            .filter(|i| filter.matches(i))
            .filter(|i| {
                anchor.map_or(true, |a| {
                    order.apply(compare(i, a)) == Ordering::Greater
                })
            })
            .collect::<Vec<_>>();
        selected.sort_by(|a, b| order.apply(compare(a, b)));

        let offset = usize::try_from(paging.offset(limit)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|i| read::image::list::Edge {
                cursor: i.id.clone(),
                node: i.clone(),
            })
            .collect())
    }
}
