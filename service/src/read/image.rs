//! [`Image`]-related read definitions.

#[cfg(doc)]
use crate::domain::Image;

pub mod list {
    //! [`Image`] list definitions.

    use common::define_pagination;

    use crate::domain::{image, Image};

    define_pagination!(Cursor, Image, Filter);

    /// Cursor pointing to a specific [`Image`] in a list.
    pub type Cursor = image::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`image::Country`]s any of which a listed [`Image`] must be taken
        /// in.
        ///
        /// Empty means no filtering.
        pub countries: Vec<image::Country>,
    }

    impl Filter {
        /// Checks whether the provided [`Image`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, image: &Image) -> bool {
            self.countries.is_empty()
                || image
                    .country
                    .as_ref()
                    .is_some_and(|c| self.countries.contains(c))
        }
    }
}
