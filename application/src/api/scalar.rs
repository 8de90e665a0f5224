//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Helper type to use in `#[graphql(with = ..)]` attribute.
///
/// Lets a newtype over a domain value be a GraphQL string scalar, validated
/// by the [`FromStr`] impl of the wrapped `As` type and rendered by its
/// [`Display`] impl.
///
/// Target type must implement [`TryFrom`] and [`AsRef`] for `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Convert the target type into scalar [`Value`] by using [`Display`] impl
    /// of `As` type.
    ///
    /// [`Display`]: fmt::Display
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from scalar [`Value`] by using [`FromStr`]
    /// impl of `As` type.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the input value is not a string;
    /// - the input value cannot be parsed into `As` type;
    /// - the parsed value cannot be converted into the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr + fmt::Display,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = T::name(&()).unwrap_or("scalar");
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse input scalar `{name}`: expected string input \
                 value, found: {input}",
            )
        })?;
        s.parse::<As>()
            .map_err(|e| {
                format!(
                    "Cannot parse input scalar `{name}` from \"{s}\" string: \
                     {e}",
                )
            })?
            .try_into()
            .map_err(|e| format!("Cannot parse input scalar `{name}`: {e}"))
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue, Value};
    use service::domain;

    use crate::api::image;

    use super::Via;

    type ViaId = Via<domain::image::Id>;

    #[test]
    fn parses_valid_string() {
        let input = InputValue::<DefaultScalarValue>::scalar("img01".to_owned());

        let id: image::Id = ViaId::from_input(&input).unwrap();

        assert_eq!(id.to_string(), "img01");
        assert_eq!(
            ViaId::to_output::<_, DefaultScalarValue>(&id),
            Value::scalar("img01".to_owned()),
        );
    }

    #[test]
    fn rejects_invalid_string() {
        let input =
            InputValue::<DefaultScalarValue>::scalar("img|01".to_owned());

        let err = ViaId::from_input::<image::Id, _>(&input).unwrap_err();

        assert!(err.contains("`ImageId`"), "{err}");
        assert!(err.contains("img|01"), "{err}");
    }

    #[test]
    fn rejects_non_string() {
        let input = InputValue::<DefaultScalarValue>::scalar(42);

        let err = ViaId::from_input::<image::Id, _>(&input).unwrap_err();

        assert!(err.contains("expected string"), "{err}");
    }
}
