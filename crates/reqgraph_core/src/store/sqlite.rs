//! SQLite record store.
//!
//! # Responsibility
//! - Persist one `graph_nodes` row per identity and ordered `graph_edges`
//!   rows per parent.
//! - Turn stored rows back into `StorageRecord`s, rejecting data that does not
//!   parse.
//!
//! # Invariants
//! - Each `put_record` runs in its own transaction: the node row and its edge
//!   rows are replaced together or not at all.
//! - Child order is `position ASC`.
//! - Removing a node row cascades to its own edge rows; edges that point at
//!   it from other parents stay until those parents are saved again.
//! - Access to the connection is serialized; the store is `Send + Sync`.

use super::{GraphStore, StoreError, StoreResult};
use crate::codec::StorageRecord;
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::attr::Attributes;
use crate::model::kind::NodeKind;
use crate::model::node::NodeId;
use log::debug;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Opens (or creates) a database file and wraps it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Creates the store from an already migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl GraphStore for SqliteGraphStore {
    fn put_record(&self, record: &StorageRecord) -> StoreResult<()> {
        let attributes = serde_json::to_string(&record.attributes)
            .map_err(|err| StoreError::InvalidData(format!("unencodable attributes: {err}")))?;
        let node_uuid = record.id.to_string();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO graph_nodes (node_uuid, kind, attributes)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(node_uuid) DO UPDATE SET
                kind = excluded.kind,
                attributes = excluded.attributes,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![node_uuid, record.kind.as_tag(), attributes],
        )?;
        tx.execute(
            "DELETE FROM graph_edges WHERE parent_uuid = ?1;",
            [&node_uuid],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO graph_edges (parent_uuid, position, child_uuid)
                 VALUES (?1, ?2, ?3);",
            )?;
            for (position, child) in record.children.iter().enumerate() {
                let position = i64::try_from(position).map_err(|_| {
                    StoreError::InvalidData(format!("edge position {position} out of range"))
                })?;
                insert.execute(params![node_uuid, position, child.to_string()])?;
            }
        }
        tx.commit()?;

        debug!(
            "event=record_put module=store status=ok backend=sqlite node={} kind={} children={}",
            record.id,
            record.kind,
            record.children.len()
        );
        Ok(())
    }

    fn get_record(&self, id: NodeId) -> StoreResult<Option<StorageRecord>> {
        let conn = self.conn.lock();
        read_record(&conn, id)
    }

    fn list_by_kind(&self, kind: NodeKind) -> StoreResult<Vec<StorageRecord>> {
        let conn = self.conn.lock();
        let ids = {
            let mut stmt = conn.prepare(
                "SELECT node_uuid
                 FROM graph_nodes
                 WHERE kind = ?1
                 ORDER BY node_uuid ASC;",
            )?;
            let rows = stmt.query_map([kind.as_tag()], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut records = Vec::with_capacity(ids.len());
        for raw in ids {
            let id = parse_uuid(&raw, "graph_nodes.node_uuid")?;
            if let Some(record) = read_record(&conn, id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn remove_record(&self, id: NodeId) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM graph_nodes WHERE node_uuid = ?1;",
            [id.to_string()],
        )?;
        debug!(
            "event=record_remove module=store status=ok backend=sqlite node={} found={}",
            id,
            deleted > 0
        );
        Ok(deleted > 0)
    }

    fn record_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM graph_nodes;", [], |row| {
            row.get(0)
        })?;
        count_from_sql(count)
    }
}

fn count_from_sql(count: i64) -> StoreResult<usize> {
    usize::try_from(count)
        .map_err(|_| StoreError::InvalidData(format!("record count {count} out of range")))
}

fn read_record(conn: &Connection, id: NodeId) -> StoreResult<Option<StorageRecord>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT kind, attributes
             FROM graph_nodes
             WHERE node_uuid = ?1;",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((kind_tag, raw_attributes)) = row else {
        return Ok(None);
    };

    let kind = NodeKind::from_tag(&kind_tag).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid node kind `{kind_tag}` in graph_nodes.kind"))
    })?;
    let attributes: Attributes = serde_json::from_str(&raw_attributes).map_err(|err| {
        StoreError::InvalidData(format!("unparsable graph_nodes.attributes: {err}"))
    })?;

    let mut stmt = conn.prepare(
        "SELECT child_uuid
         FROM graph_edges
         WHERE parent_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let raw_children = stmt
        .query_map([id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    let children = raw_children
        .iter()
        .map(|raw| parse_uuid(raw, "graph_edges.child_uuid"))
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Some(StorageRecord {
        id,
        kind,
        attributes,
        children,
    }))
}

fn parse_uuid(raw: &str, column: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{raw}` in {column}")))
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["graph_nodes", "graph_edges"] {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::{count_from_sql, SqliteGraphStore};
    use crate::store::StoreError;
    use rusqlite::Connection;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteGraphStore::try_new(conn)
            .err()
            .expect("bare connection must be rejected");
        assert!(matches!(
            err,
            StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn negative_count_is_invalid_data() {
        assert_eq!(count_from_sql(7).unwrap(), 7);
        match count_from_sql(-1) {
            Err(StoreError::InvalidData(message)) => assert!(message.contains("-1")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
