//! Sqlite-backed snapshot of the metadata symbol graph.
//!
//! The snapshot is read-only from the query engine's point of view; the
//! only write path is [`Store::replace_graph`], used by the ingest loader.
//! Reference collection runs against a [`SymbolGraph`] view obtained via
//! [`Store::with_snapshot`], which scopes all graph reads to one deferred
//! transaction so a query observes a single consistent snapshot even when
//! the host re-ingests concurrently.

use crate::config::Config;
use crate::error::QueryError;
use crate::ingest::{EdgeRow, SymbolRow};
use crate::model::{
    BackReference, MemberRole, Symbol, SymbolId, collection_for_type,
};
use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod migrations;

/// Feature names that represent transient relationships (index or cache
/// artifacts the exporter keeps for its own bookkeeping). Edges through
/// these never count as references.
const TRANSIENT_FEATURES: &[&str] = &["GeneratedType", "StandardAttributes", "InternalInfo"];

/// Read-consistent view of the symbol graph.
pub trait SymbolGraph {
    /// Resolve a `Type.Name` (or `Type.Name.Subtype.SubName`) FQN.
    fn resolve(&self, fqn: &str) -> Result<Symbol, QueryError>;

    /// Look up a symbol by row id.
    fn symbol(&self, id: SymbolId) -> Result<Option<Symbol>, QueryError>;

    /// All graph edges pointing at `id`.
    fn back_references(&self, id: SymbolId) -> Result<Vec<BackReference>, QueryError>;

    /// Owned members of a symbol with the given role, in declaration order.
    fn members(&self, id: SymbolId, role: MemberRole) -> Result<Vec<Symbol>, QueryError>;

    fn is_transient_feature(&self, feature: &str) -> bool {
        TRANSIENT_FEATURES.contains(&feature)
    }

    fn belongs_to_internal_namespace(&self, symbol: &Symbol) -> bool {
        symbol.internal
    }
}

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_secs(30))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        Ok(())
    }

    fn on_release(&self, _conn: Connection) {}
}

pub struct Store {
    db_path: PathBuf,
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Pool<SqliteConnectionManager>,
}

impl Store {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }

        let config = Config::get();

        let write_conn = Connection::open(db_path)
            .with_context(|| format!("open snapshot db at {}", db_path.display()))?;
        write_conn.busy_timeout(Duration::from_secs(30))?;
        write_conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        migrations::migrate(&write_conn)?;

        let manager = SqliteConnectionManager::file(db_path);
        let read_pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.pool_min_idle))
            .connection_timeout(Duration::from_secs(30))
            .connection_customizer(Box::new(ConnectionCustomizer))
            .build(manager)
            .with_context(|| "create connection pool")?;

        Ok(Self {
            db_path: db_path.to_path_buf(),
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` against a read-consistent graph view. All reads inside the
    /// closure observe one deferred transaction; concurrent writers become
    /// visible only to later snapshots.
    pub fn with_snapshot<T>(
        &self,
        f: impl FnOnce(&dyn SymbolGraph) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        let mut conn = self
            .read_pool
            .get()
            .map_err(|err| QueryError::StoreUnavailable(err.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(|err| QueryError::TransactionFailure(err.to_string()))?;
        let out = f(&GraphSnapshot { tx: &tx })?;
        tx.commit()
            .map_err(|err| QueryError::TransactionFailure(err.to_string()))?;
        Ok(out)
    }

    /// Replace the whole graph with the rows of an export, atomically.
    /// Containers and edges reference symbols by FQN; unknown FQNs are
    /// skipped with a warning rather than failing the whole load.
    pub fn replace_graph(&self, symbols: &[SymbolRow], edges: &[EdgeRow]) -> Result<(usize, usize)> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM symbols", [])?;

        let mut ids: HashMap<String, i64> = HashMap::with_capacity(symbols.len());
        let mut inserted_symbols = 0usize;
        {
            let mut insert = tx.prepare(
                "INSERT INTO symbols
                     (fqn, kind, name, collection, top_level, container_feature, member_role, ord, internal)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (ord, row) in symbols.iter().enumerate() {
                let name = row
                    .name
                    .clone()
                    .unwrap_or_else(|| last_segment(&row.fqn).to_string());
                let top_level = row.top_level.unwrap_or(row.container.is_none());
                insert.execute(params![
                    row.fqn,
                    row.kind,
                    name,
                    row.collection,
                    top_level,
                    row.container_feature,
                    row.member_role,
                    ord as i64,
                    row.internal.unwrap_or(false),
                ])?;
                ids.insert(row.fqn.clone(), tx.last_insert_rowid());
                inserted_symbols += 1;
            }
        }

        {
            let mut link = tx.prepare("UPDATE symbols SET container_id = ?1 WHERE id = ?2")?;
            for row in symbols {
                let Some(container_fqn) = &row.container else {
                    continue;
                };
                match (ids.get(container_fqn), ids.get(&row.fqn)) {
                    (Some(container_id), Some(id)) => {
                        link.execute(params![container_id, id])?;
                    }
                    _ => {
                        eprintln!(
                            "mdxref: ingest: unknown container {} for {}",
                            container_fqn, row.fqn
                        );
                    }
                }
            }
        }

        let mut inserted_edges = 0usize;
        {
            let mut insert = tx.prepare(
                "INSERT INTO edges (source_id, target_id, feature, transient)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for edge in edges {
                match (ids.get(&edge.source), ids.get(&edge.target)) {
                    (Some(source_id), Some(target_id)) => {
                        insert.execute(params![
                            source_id,
                            target_id,
                            edge.feature,
                            edge.transient.unwrap_or(false),
                        ])?;
                        inserted_edges += 1;
                    }
                    _ => {
                        eprintln!(
                            "mdxref: ingest: dangling edge {} -> {}",
                            edge.source, edge.target
                        );
                    }
                }
            }
        }

        tx.commit()?;
        Ok((inserted_symbols, inserted_edges))
    }
}

fn last_segment(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}

struct GraphSnapshot<'a> {
    tx: &'a rusqlite::Transaction<'a>,
}

const SYMBOL_COLUMNS: &str = "id, fqn, kind, name, collection, top_level, container_id, container_feature, member_role, internal";

fn row_to_symbol(row: &Row<'_>) -> rusqlite::Result<Symbol> {
    let member_role: Option<String> = row.get(8)?;
    Ok(Symbol {
        id: SymbolId(row.get(0)?),
        fqn: row.get(1)?,
        kind: row.get(2)?,
        name: row.get(3)?,
        collection: row.get(4)?,
        top_level: row.get(5)?,
        container_id: row.get::<_, Option<i64>>(6)?.map(SymbolId),
        container_feature: row.get(7)?,
        member_role: member_role.as_deref().and_then(MemberRole::parse),
        internal: row.get(9)?,
    })
}

fn store_err(err: rusqlite::Error) -> QueryError {
    QueryError::StoreUnavailable(err.to_string())
}

impl SymbolGraph for GraphSnapshot<'_> {
    fn resolve(&self, fqn: &str) -> Result<Symbol, QueryError> {
        let not_found = || QueryError::SymbolNotFound {
            fqn: fqn.to_string(),
        };
        let segments: Vec<&str> = fqn.split('.').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return Err(not_found());
        }
        let collection = collection_for_type(segments[0]).ok_or_else(not_found)?;

        let top_level: Symbol = self
            .tx
            .query_row(
                &format!(
                    "SELECT {SYMBOL_COLUMNS} FROM symbols
                     WHERE collection = ?1 AND name = ?2 COLLATE NOCASE AND top_level = 1"
                ),
                params![collection, segments[1]],
                row_to_symbol,
            )
            .optional()
            .map_err(store_err)?
            .ok_or_else(not_found)?;

        if segments.len() == 2 {
            return Ok(top_level);
        }

        // Deeper FQNs address an owned member; match the canonicalized
        // prefix plus the remaining segments against the stored FQN.
        let candidate = format!("{}.{}", top_level.fqn, segments[2..].join("."));
        self.tx
            .query_row(
                &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE fqn = ?1 COLLATE NOCASE"),
                params![candidate],
                row_to_symbol,
            )
            .optional()
            .map_err(store_err)?
            .ok_or_else(not_found)
    }

    fn symbol(&self, id: SymbolId) -> Result<Option<Symbol>, QueryError> {
        self.tx
            .query_row(
                &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE id = ?1"),
                params![id.0],
                row_to_symbol,
            )
            .optional()
            .map_err(store_err)
    }

    fn back_references(&self, id: SymbolId) -> Result<Vec<BackReference>, QueryError> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT e.feature, e.transient,
                        s.id, s.fqn, s.kind, s.name, s.collection, s.top_level,
                        s.container_id, s.container_feature, s.member_role, s.internal
                 FROM edges e JOIN symbols s ON s.id = e.source_id
                 WHERE e.target_id = ?1
                 ORDER BY e.id",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![id.0], |row| {
                let feature: String = row.get(0)?;
                let transient: bool = row.get(1)?;
                let member_role: Option<String> = row.get(10)?;
                Ok(BackReference {
                    feature,
                    transient,
                    source: Symbol {
                        id: SymbolId(row.get(2)?),
                        fqn: row.get(3)?,
                        kind: row.get(4)?,
                        name: row.get(5)?,
                        collection: row.get(6)?,
                        top_level: row.get(7)?,
                        container_id: row.get::<_, Option<i64>>(8)?.map(SymbolId),
                        container_feature: row.get(9)?,
                        member_role: member_role.as_deref().and_then(MemberRole::parse),
                        internal: row.get(11)?,
                    },
                })
            })
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(store_err)
    }

    fn members(&self, id: SymbolId, role: MemberRole) -> Result<Vec<Symbol>, QueryError> {
        let mut stmt = self
            .tx
            .prepare(&format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols
                 WHERE container_id = ?1 AND member_role = ?2
                 ORDER BY ord, id"
            ))
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![id.0, role.as_str()], row_to_symbol)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(store_err)
    }
}
