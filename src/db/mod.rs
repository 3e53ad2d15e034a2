pub mod schema;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Name of the SQL scalar used for case-insensitive search.
pub const CASEFOLD_FN: &str = "casefold";

/// Open a fresh in-memory history table with the schema and SQL helpers installed.
///
/// The table is never backed by a file: the history store persists it by writing a
/// full image to the blob store after every mutation.
pub fn open_table() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    register_functions(&conn)?;
    schema::init_schema(&conn)?;
    tracing::debug!("in-memory history table ready");
    Ok(conn)
}

/// Register `casefold(text)`: Unicode lowercase, NULL-preserving.
///
/// SQLite's own `lower()` only folds ASCII, which would make search miss
/// accented and other non-ASCII letters.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        CASEFOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|s| s.to_lowercase()))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casefold_handles_unicode_and_null() {
        let conn = open_table().unwrap();

        let folded: String = conn
            .query_row("SELECT casefold('ÉCOLE Straße')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(folded, "école straße");

        let null: Option<String> = conn
            .query_row("SELECT casefold(NULL)", [], |r| r.get(0))
            .unwrap();
        assert!(null.is_none());
    }
}
