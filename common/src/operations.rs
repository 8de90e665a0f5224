//! Storage operations dispatched through a [`Handler`].
//!
//! [`Handler`]: crate::Handler

use std::marker::PhantomData;

/// Operation inserting a value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Operation updating a stored value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Operation deleting a value.
#[derive(Clone, Copy, Debug)]
pub struct Delete<T>(pub T);

/// Operation selecting a value.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Lookup of a `W` by the `B` value.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the looked up value.
    _what: PhantomData<W>,

    /// Value to look up by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] lookup.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns the value to look up by.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
