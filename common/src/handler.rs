//! [`Handler`] abstraction.

use std::future::Future;

/// Asynchronous operation executor, parametrized by its input.
///
/// Databases, queries and commands are all [`Handler`]s of the operations
/// they support.
pub trait Handler<Args = ()> {
    /// Successful outcome of the execution.
    type Ok;

    /// Error of the execution.
    type Err;

    /// Executes the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
