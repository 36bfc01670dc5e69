//! SQL generation for the bulk update statement.
//!
//! Names come from the manifest and are validated as plain identifiers before they get
//! here, then always quoted; values are always bound as parameters.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::manifest::storage::TargetDetails;

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table pattern is valid")
});

/// Plain identifier, optionally prefixed with a schema: `events` or `public.events`.
pub fn is_valid_table_name(table_name: &str) -> bool {
    TABLE_NAME.is_match(table_name)
}

/// Quotes an identifier so reserved words are safe as names.
///
/// The name is lowercased first, which is the case postgres folds an unquoted
/// identifier to, so `Events` and `events` keep meaning the same table.
#[inline]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.to_ascii_lowercase())
}

/// Formats a table name, handling schema.table format.
pub fn format_table_name(table_name: &str) -> String {
    match table_name.split_once('.') {
        Some((schema, table)) => {
            format!("{}.{}", quote_identifier(schema), quote_identifier(table))
        }
        None => quote_identifier(table_name),
    }
}

/// Builds the single statement applied per batch.
///
/// `$1` is the `BIGINT[]` of identifiers and `$2` the `TEXT[]` of values at the same
/// positions, so one execution updates every row of the batch.
pub fn build_bulk_update_sql(target: &TargetDetails) -> String {
    format!(
        "UPDATE {} AS target SET {} = data.value \
         FROM UNNEST($1::BIGINT[], $2::TEXT[]) AS data(id, value) \
         WHERE target.{} = data.id",
        format_table_name(&target.table),
        quote_identifier(&target.value_column),
        quote_identifier(&target.key_column),
    )
}
