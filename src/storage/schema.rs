//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Ripple-Search index.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Hosts seen in any crawled or linked url
CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Every url referenced as a crawl target or link endpoint (exact text)
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    domain_id INTEGER NOT NULL REFERENCES domains(id)
);

-- Lowercased vocabulary
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE,
    is_ignored INTEGER NOT NULL DEFAULT 0
);

-- Directed edges of the crawl graph
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_url INTEGER NOT NULL REFERENCES urls(id),
    to_url INTEGER NOT NULL REFERENCES urls(id),
    UNIQUE(from_url, to_url)
);

CREATE INDEX IF NOT EXISTS idx_links_to ON links(to_url);

-- Token positions within page bodies
CREATE TABLE IF NOT EXISTS word_locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(id),
    word_id INTEGER NOT NULL REFERENCES words(id),
    location INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_word_locations_word ON word_locations(word_id, url_id, location);

-- Tokens within anchor texts
CREATE TABLE IF NOT EXISTS link_words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link_id INTEGER NOT NULL REFERENCES links(id),
    word_id INTEGER NOT NULL REFERENCES words(id)
);

CREATE INDEX IF NOT EXISTS idx_link_words_link ON link_words(link_id, word_id);

-- PageRank scores, fully rewritten by every ranking run
CREATE TABLE IF NOT EXISTS pagerank (
    url_id INTEGER PRIMARY KEY REFERENCES urls(id),
    score REAL NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        let result = initialize_schema(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = [
            "domains",
            "urls",
            "words",
            "links",
            "word_locations",
            "link_words",
            "pagerank",
        ];

        for table in tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_link_pair_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        conn.execute("INSERT INTO domains (name) VALUES ('example.com')", [])
            .unwrap();
        conn.execute("INSERT INTO urls (url, domain_id) VALUES ('a', 1), ('b', 1)", [])
            .unwrap();
        conn.execute("INSERT INTO links (from_url, to_url) VALUES (1, 2)", [])
            .unwrap();

        let duplicate = conn.execute("INSERT INTO links (from_url, to_url) VALUES (1, 2)", []);
        assert!(duplicate.is_err());
    }
}
