use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension};

pub const SCHEMA_VERSION: i64 = 1;

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        BEGIN;
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS symbols (
            id INTEGER PRIMARY KEY,
            fqn TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            collection TEXT,
            top_level INTEGER NOT NULL DEFAULT 0,
            container_id INTEGER,
            container_feature TEXT,
            member_role TEXT,
            ord INTEGER NOT NULL DEFAULT 0,
            internal INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(container_id) REFERENCES symbols(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_symbols_collection ON symbols(collection, name);
        CREATE INDEX IF NOT EXISTS idx_symbols_container ON symbols(container_id, member_role);

        CREATE TABLE IF NOT EXISTS edges (
            id INTEGER PRIMARY KEY,
            source_id INTEGER NOT NULL,
            target_id INTEGER NOT NULL,
            feature TEXT NOT NULL,
            transient INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(source_id) REFERENCES symbols(id) ON DELETE CASCADE,
            FOREIGN KEY(target_id) REFERENCES symbols(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
        CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
        COMMIT;
        ",
    )?;

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match version {
        None => {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                [SCHEMA_VERSION.to_string()],
            )?;
        }
        Some(v) if v == SCHEMA_VERSION.to_string() => {}
        Some(v) => {
            bail!(
                "snapshot schema version {} does not match expected {}; re-ingest the graph export",
                v,
                SCHEMA_VERSION
            );
        }
    }
    Ok(())
}
