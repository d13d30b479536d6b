use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Decode a JSON document column into `T`, returning CorruptRow on failure.
pub fn parse_document<T: DeserializeOwned>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid document: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use poker_core::Round;

    #[test]
    fn parse_document_success() {
        let round: Round = parse_document(r#"{"id":"round-2","votes":{"a":1}}"#, "sessions", "document").unwrap();
        assert_eq!(round.id.get(), 2);
    }

    #[test]
    fn parse_document_failure() {
        let result: Result<Round, _> = parse_document("not valid json", "sessions", "document");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "sessions", column: "document", .. })
        ));
    }
}
