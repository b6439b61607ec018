//! Row conversion helpers shared by the repositories.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;
use transitdesk_domain::AnalyticDistribution;

/// Read a text column into one of the domain's string-backed enums.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

/// Optional variant of [`enum_column`].
pub(crate) fn optional_enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        raw.parse::<T>()
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
    })
    .transpose()
}

/// A NULL or empty column reads as an empty distribution.
pub(crate) fn distribution_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<AnalyticDistribution> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(AnalyticDistribution::new()),
        Some(raw) => AnalyticDistribution::from_json(raw).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
        }),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn int_to_bool(value: i64) -> bool {
    value != 0
}
