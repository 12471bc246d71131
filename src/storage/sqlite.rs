//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the `IndexStore` trait.
//! A small pool of connections on the same WAL database lets concurrent crawl
//! tasks read while another one writes; SQLite itself serializes the writes.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{IndexStore, StorageResult};
use crate::storage::{IndexStatistics, LinkRecord, PageDocument, WordLocationRecord};
use crate::text::is_preposition;
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite index backend
///
/// Unique keys resolved once are remembered in concurrent caches. Rows are
/// never deleted (except scores), so a cached id stays valid for the life of
/// the store.
pub struct SqliteIndexStore {
    pool: Vec<Mutex<Connection>>,
    next: AtomicUsize,
    domain_ids: DashMap<String, i64>,
    url_ids: DashMap<String, i64>,
    word_ids: DashMap<String, i64>,
    link_ids: DashMap<(i64, i64), i64>,
}

impl SqliteIndexStore {
    /// Opens or creates an index database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `pool_size` - Number of connections to open (at least one)
    pub fn open(path: &Path, pool_size: usize) -> StorageResult<Self> {
        let pool_size = pool_size.max(1);
        let mut pool = Vec::with_capacity(pool_size);

        for i in 0..pool_size {
            let conn = Connection::open(path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA temp_store = MEMORY;
            ",
            )?;

            if i == 0 {
                initialize_schema(&conn)?;
            }
            pool.push(Mutex::new(conn));
        }

        tracing::debug!(
            "Opened index database {} with {} connections",
            path.display(),
            pool_size
        );

        Ok(Self::with_pool(pool))
    }

    /// Creates an in-memory index with a single connection
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self::with_pool(vec![Mutex::new(conn)]))
    }

    fn with_pool(pool: Vec<Mutex<Connection>>) -> Self {
        Self {
            pool,
            next: AtomicUsize::new(0),
            domain_ids: DashMap::new(),
            url_ids: DashMap::new(),
            word_ids: DashMap::new(),
            link_ids: DashMap::new(),
        }
    }

    /// Takes an idle connection if there is one, otherwise waits for one in turn
    fn acquire(&self) -> MutexGuard<'_, Connection> {
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let len = self.pool.len();

        for offset in 0..len {
            if let Ok(conn) = self.pool[(start + offset) % len].try_lock() {
                return conn;
            }
        }

        // A panic while holding a connection leaves it usable; SQLite rolls back on its own.
        self.pool[start % len]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> StorageResult<T> {
        let mut conn = self.acquire();
        Ok(f(&mut conn)?)
    }
}

/// Returns the cached id for `key`, or resolves it with `load` and caches it
fn cached_id<K, Q>(
    cache: &DashMap<K, i64>,
    key: &Q,
    load: impl FnOnce() -> StorageResult<i64>,
) -> StorageResult<i64>
where
    K: Borrow<Q> + Eq + Hash,
    Q: ToOwned<Owned = K> + Eq + Hash + ?Sized,
{
    if let Some(id) = cache.get(key) {
        return Ok(*id);
    }

    let id = load()?;
    cache.insert(key.to_owned(), id);
    Ok(id)
}

/// Like [`cached_id`], but new ids go to `pending` until their transaction commits
fn pending_id<K, Q>(
    cache: &DashMap<K, i64>,
    pending: &mut HashMap<K, i64>,
    key: &Q,
    load: impl FnOnce() -> rusqlite::Result<i64>,
) -> rusqlite::Result<i64>
where
    K: Borrow<Q> + Eq + Hash,
    Q: ToOwned<Owned = K> + Eq + Hash + ?Sized,
{
    if let Some(id) = cache.get(key) {
        return Ok(*id);
    }
    if let Some(id) = pending.get(key) {
        return Ok(*id);
    }

    let id = load()?;
    pending.insert(key.to_owned(), id);
    Ok(id)
}

/// Ids created inside an uncommitted page transaction
#[derive(Default)]
struct PendingIds {
    domains: HashMap<String, i64>,
    urls: HashMap<String, i64>,
    words: HashMap<String, i64>,
    links: HashMap<(i64, i64), i64>,
}

impl PendingIds {
    fn publish(self, store: &SqliteIndexStore) {
        for (name, id) in self.domains {
            store.domain_ids.insert(name, id);
        }
        for (url, id) in self.urls {
            store.url_ids.insert(url, id);
        }
        for (word, id) in self.words {
            store.word_ids.insert(word, id);
        }
        for (pair, id) in self.links {
            store.link_ids.insert(pair, id);
        }
    }
}

/// Runs an `INSERT ... ON CONFLICT DO NOTHING`, falling back to a keyed select
/// when another writer already holds the key
fn insert_or_select(
    conn: &Connection,
    insert: &str,
    insert_params: &[&dyn rusqlite::ToSql],
    select: &str,
    select_params: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<i64> {
    if conn.execute(insert, insert_params)? == 1 {
        return Ok(conn.last_insert_rowid());
    }
    conn.query_row(select, select_params, |row| row.get(0))
}

fn domain_row(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    insert_or_select(
        conn,
        "INSERT INTO domains (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
        "SELECT id FROM domains WHERE name = ?1",
        params![name],
    )
}

fn url_row(conn: &Connection, url: &str, domain_id: i64) -> rusqlite::Result<i64> {
    insert_or_select(
        conn,
        "INSERT INTO urls (url, domain_id) VALUES (?1, ?2) ON CONFLICT(url) DO NOTHING",
        params![url, domain_id],
        "SELECT id FROM urls WHERE url = ?1",
        params![url],
    )
}

/// `word` must already be lowercased
fn word_row(conn: &Connection, word: &str) -> rusqlite::Result<i64> {
    insert_or_select(
        conn,
        "INSERT INTO words (word, is_ignored) VALUES (?1, ?2) ON CONFLICT(word) DO NOTHING",
        params![word, is_preposition(word)],
        "SELECT id FROM words WHERE word = ?1",
        params![word],
    )
}

fn link_row(conn: &Connection, from_url: i64, to_url: i64) -> rusqlite::Result<i64> {
    insert_or_select(
        conn,
        "INSERT INTO links (from_url, to_url) VALUES (?1, ?2)
         ON CONFLICT(from_url, to_url) DO NOTHING",
        params![from_url, to_url],
        "SELECT id FROM links WHERE from_url = ?1 AND to_url = ?2",
        params![from_url, to_url],
    )
}

fn word_location_row(
    conn: &Connection,
    url_id: i64,
    word_id: i64,
    location: u32,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO word_locations (url_id, word_id, location)
         SELECT ?1, ?2, ?3
         WHERE NOT EXISTS (
             SELECT 1 FROM word_locations
             WHERE word_id = ?2 AND url_id = ?1 AND location = ?3
         )",
        params![url_id, word_id, location],
    )?;
    Ok(())
}

fn link_word_row(conn: &Connection, link_id: i64, word_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO link_words (link_id, word_id)
         SELECT ?1, ?2
         WHERE NOT EXISTS (
             SELECT 1 FROM link_words WHERE link_id = ?1 AND word_id = ?2
         )",
        params![link_id, word_id],
    )?;
    Ok(())
}

impl SqliteIndexStore {
    /// Inserts every row of a page on `conn`, which holds an open transaction
    fn write_page_rows(
        &self,
        conn: &Connection,
        page: &PageDocument,
        pending: &mut PendingIds,
    ) -> rusqlite::Result<i64> {
        let domain = page.domain.as_str();
        let domain_id = pending_id(&self.domain_ids, &mut pending.domains, domain, || {
            domain_row(conn, domain)
        })?;
        let url = page.url.as_str();
        let url_id = pending_id(&self.url_ids, &mut pending.urls, url, || {
            url_row(conn, url, domain_id)
        })?;

        for (location, word) in page.words.iter().enumerate() {
            let word_id = self.pending_word(conn, word, pending)?;
            word_location_row(conn, url_id, word_id, location as u32)?;
        }

        for link in &page.links {
            let domain = link.domain.as_str();
            let target_domain = pending_id(&self.domain_ids, &mut pending.domains, domain, || {
                domain_row(conn, domain)
            })?;
            let url = link.url.as_str();
            let target = pending_id(&self.url_ids, &mut pending.urls, url, || {
                url_row(conn, url, target_domain)
            })?;
            let link_id = pending_id(&self.link_ids, &mut pending.links, &(url_id, target), || {
                link_row(conn, url_id, target)
            })?;

            for word in &link.words {
                let word_id = self.pending_word(conn, word, pending)?;
                link_word_row(conn, link_id, word_id)?;
            }
        }

        Ok(url_id)
    }

    fn pending_word(
        &self,
        conn: &Connection,
        word: &str,
        pending: &mut PendingIds,
    ) -> rusqlite::Result<i64> {
        let word = word.to_lowercase();
        pending_id(&self.word_ids, &mut pending.words, word.as_str(), || {
            word_row(conn, &word)
        })
    }
}

impl IndexStore for SqliteIndexStore {
    // ===== Get-or-create =====

    fn get_or_create_domain(&self, name: &str) -> StorageResult<i64> {
        cached_id(&self.domain_ids, name, || {
            self.with_conn(|conn| domain_row(conn, name))
        })
    }

    fn get_or_create_url(&self, url: &str, domain_id: i64) -> StorageResult<i64> {
        cached_id(&self.url_ids, url, || {
            self.with_conn(|conn| url_row(conn, url, domain_id))
        })
    }

    fn get_or_create_word(&self, word: &str) -> StorageResult<i64> {
        let word = word.to_lowercase();
        cached_id(&self.word_ids, word.as_str(), || {
            self.with_conn(|conn| word_row(conn, &word))
        })
    }

    fn get_or_create_link(&self, from_url: i64, to_url: i64) -> StorageResult<i64> {
        cached_id(&self.link_ids, &(from_url, to_url), || {
            self.with_conn(|conn| link_row(conn, from_url, to_url))
        })
    }

    // ===== Occurrences =====

    fn append_word_location(
        &self,
        url_id: i64,
        word_id: i64,
        location: u32,
    ) -> StorageResult<()> {
        self.with_conn(|conn| word_location_row(conn, url_id, word_id, location))
    }

    fn append_link_word(&self, link_id: i64, word_id: i64) -> StorageResult<()> {
        self.with_conn(|conn| link_word_row(conn, link_id, word_id))
    }

    // ===== Pages =====

    fn write_page(&self, page: &PageDocument) -> StorageResult<i64> {
        let mut pending = PendingIds::default();

        let url_id = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let url_id = self.write_page_rows(&tx, page, &mut pending)?;
            tx.commit()?;
            Ok(url_id)
        })?;

        // Rolled-back ids never reach the caches
        pending.publish(self);
        Ok(url_id)
    }

    // ===== Link graph =====

    fn all_urls(&self) -> StorageResult<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM urls ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    fn outgoing_links(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, from_url, to_url FROM links WHERE from_url = ?1 ORDER BY id",
            )?;
            let links = stmt
                .query_map(params![url_id], |row| {
                    Ok(LinkRecord {
                        id: row.get(0)?,
                        from_url: row.get(1)?,
                        to_url: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(links)
        })
    }

    fn incoming_links(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, from_url, to_url FROM links WHERE to_url = ?1 ORDER BY from_url",
            )?;
            let links = stmt
                .query_map(params![url_id], |row| {
                    Ok(LinkRecord {
                        id: row.get(0)?,
                        from_url: row.get(1)?,
                        to_url: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(links)
        })
    }

    fn out_degree(&self, url_id: i64) -> StorageResult<u64> {
        let count: i64 = self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM links WHERE from_url = ?1",
                params![url_id],
                |row| row.get(0),
            )
        })?;
        Ok(count as u64)
    }

    // ===== Lookups =====

    fn word_locations_for(&self, word_id: i64) -> StorageResult<Vec<WordLocationRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT url_id, location FROM word_locations
                 WHERE word_id = ?1 ORDER BY url_id, location",
            )?;
            let locations = stmt
                .query_map(params![word_id], |row| {
                    Ok(WordLocationRecord {
                        url_id: row.get(0)?,
                        location: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(locations)
        })
    }

    fn url_text(&self, url_id: i64) -> StorageResult<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT url FROM urls WHERE id = ?1",
                params![url_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn url_id(&self, url: &str) -> StorageResult<Option<i64>> {
        if let Some(id) = self.url_ids.get(url) {
            return Ok(Some(*id));
        }
        self.with_conn(|conn| {
            conn.query_row("SELECT id FROM urls WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    fn word_id(&self, word: &str) -> StorageResult<Option<i64>> {
        let word = word.to_lowercase();
        if let Some(id) = self.word_ids.get(word.as_str()) {
            return Ok(Some(*id));
        }
        self.with_conn(|conn| {
            conn.query_row("SELECT id FROM words WHERE word = ?1", params![word], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    // ===== PageRank =====

    fn reset_page_rank(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM pagerank", [])?;
            tx.execute(
                "INSERT INTO pagerank (url_id, score) SELECT id, 1.0 FROM urls",
                [],
            )?;
            tx.commit()
        })
    }

    fn write_score(&self, url_id: i64, score: f64) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pagerank (url_id, score) VALUES (?1, ?2)
                 ON CONFLICT(url_id) DO UPDATE SET score = excluded.score",
                params![url_id, score],
            )
        })?;
        Ok(())
    }

    fn write_scores(&self, scores: &[(i64, f64)]) -> StorageResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO pagerank (url_id, score) VALUES (?1, ?2)
                     ON CONFLICT(url_id) DO UPDATE SET score = excluded.score",
                )?;
                for &(url_id, score) in scores {
                    stmt.execute(params![url_id, score])?;
                }
            }
            tx.commit()
        })
    }

    fn page_rank(&self, url_id: i64) -> StorageResult<Option<f64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT score FROM pagerank WHERE url_id = ?1",
                params![url_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn top_page_ranks(&self, limit: usize) -> StorageResult<Vec<(String, f64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.url, p.score FROM pagerank p
                 JOIN urls u ON u.id = p.url_id
                 ORDER BY p.score DESC, p.url_id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // ===== Statistics =====

    fn statistics(&self) -> StorageResult<IndexStatistics> {
        self.with_conn(|conn| {
            let count = |table: &str| -> rusqlite::Result<u64> {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
                Ok(n as u64)
            };

            Ok(IndexStatistics {
                domains: count("domains")?,
                urls: count("urls")?,
                words: count("words")?,
                word_locations: count("word_locations")?,
                links: count("links")?,
                link_words: count("link_words")?,
                scored_urls: count("pagerank")?,
            })
        })
    }
}
