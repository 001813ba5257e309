//! Database ID type definition.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// Parse an opaque API identifier into a [DatabaseId].
///
/// Returns `None` if `raw` is not a positive integer, in which case it cannot
/// refer to any row.
pub(crate) fn parse_id(raw: &str) -> Option<DatabaseId> {
    raw.trim().parse::<DatabaseId>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::parse_id;

    #[test]
    fn parses_positive_integers() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id(" 7 "), Some(7));
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("1.5"), None);
    }
}
