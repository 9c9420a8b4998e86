//! Builders for the metadata queries issued on behalf of variable pickers.
//!
//! Each builder starts its query with a fixed prefix; the same prefixes
//! drive [`MetadataQueryKind::of`][super::MetadataQueryKind::of], so
//! construction and classification cannot drift apart. The `DESCRIBE
//! TABLE` statement returns tags and fields together, so the two
//! describe builders front-load a comment distinguishing which half the
//! caller wants back.

pub(super) const SHOW_TABLES_PREFIX: &str = "SHOW TABLES";
pub(super) const DESCRIBE_TAGS_PREFIX: &str = "-- TAG;\nDESCRIBE TABLE";
pub(super) const DESCRIBE_FIELDS_PREFIX: &str = "-- FIELD;\nDESCRIBE TABLE";
pub(super) const SHOW_TAG_VALUES_PREFIX: &str = "SHOW TAG VALUES";

/// The query listing every table of the current database.
pub fn show_tables() -> String {
    SHOW_TABLES_PREFIX.to_owned()
}

/// The query listing the tag columns of `table`.
pub fn describe_table_tags(table: &str) -> String {
    format!("{DESCRIBE_TAGS_PREFIX} {table}")
}

/// The query listing the field columns of `table`.
pub fn describe_table_fields(table: &str) -> String {
    format!("{DESCRIBE_FIELDS_PREFIX} {table}")
}

/// The query listing the values tag `key` takes in `table`.
pub fn show_tag_values(table: &str, key: &str) -> String {
    format!("{SHOW_TAG_VALUES_PREFIX} FROM {table} WITH KEY={key}")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builds_metadata_queries() {
        assert_eq!(show_tables(), "SHOW TABLES");
        assert_eq!(describe_table_tags("cpu"), "-- TAG;\nDESCRIBE TABLE cpu");
        assert_eq!(
            describe_table_fields("cpu"),
            "-- FIELD;\nDESCRIBE TABLE cpu"
        );
        assert_eq!(
            show_tag_values("cpu", "host"),
            "SHOW TAG VALUES FROM cpu WITH KEY=host"
        );
    }
}
