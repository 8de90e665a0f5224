//! GraphQL API definitions.

pub mod image;
mod mutation;
mod query;
pub mod scalar;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{image::Image, mutation::Mutation, query::Query};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

/// Creates a new [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "`ImageCursor` cannot be combined with other list \
                     arguments"]
        Ambiguous,

        #[code = "INVALID_LIMIT"]
        #[status = BAD_REQUEST]
        #[message = "List limits cannot be negative"]
        InvalidLimit,
    }
}
