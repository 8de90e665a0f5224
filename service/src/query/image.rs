//! [`Query`] collection related to a single [`Image`].

use common::operations::By;

use crate::domain::{image, Image};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Image`] by its [`image::Id`].
pub type ById = DatabaseQuery<By<Option<Image>, image::Id>>;
