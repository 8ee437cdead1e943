//! # n8nctl Version Store
//!
//! Durable, user-scoped history of workflow snapshots keyed by workflow id.
//! Every mutation path snapshots the workflow before writing, so any change
//! made through the tool can be rolled back locally.
//!
//! ## Behavior
//!
//! - Version numbers increase monotonically per workflow id.
//! - Snapshots are immutable; inserts auto-prune to the 10 most recent
//!   (oldest first) unless the caller prunes with an explicit `keep`.
//! - Rollback writes a pre-rollback snapshot of the current state first
//!   (unless explicitly disabled), then returns the target state.
//! - The store directory is created with mode 0700; in strict-permissions
//!   mode a group/world-readable database refuses to load.
//! - A lock file serializes writers across concurrent invocations.

pub mod lock;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use n8nctl_core::{ErrorClass, Workflow};

use crate::lock::LockGuard;

/// Snapshots kept per workflow after auto-prune.
pub const DEFAULT_RETENTION: usize = 10;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflow_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workflow_id TEXT NOT NULL,
    version_number INTEGER NOT NULL,
    workflow_name TEXT NOT NULL DEFAULT '',
    node_count INTEGER NOT NULL DEFAULT 0,
    snapshot_json TEXT NOT NULL,
    trigger_kind TEXT NOT NULL,
    created_by TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (workflow_id, version_number)
);
CREATE INDEX IF NOT EXISTS idx_versions_workflow
    ON workflow_versions (workflow_id, version_number DESC);
"#;

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotTrigger {
    PartialUpdate,
    FullUpdate,
    Autofix,
    Rollback,
}

impl SnapshotTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotTrigger::PartialUpdate => "partial_update",
            SnapshotTrigger::FullUpdate => "full_update",
            SnapshotTrigger::Autofix => "autofix",
            SnapshotTrigger::Rollback => "rollback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "partial_update" => Some(SnapshotTrigger::PartialUpdate),
            "full_update" => Some(SnapshotTrigger::FullUpdate),
            "autofix" => Some(SnapshotTrigger::Autofix),
            "rollback" => Some(SnapshotTrigger::Rollback),
            _ => None,
        }
    }
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version store I/O failure: {message}")]
    Io { message: String },

    #[error("version store refused: {message}")]
    Permission { message: String },

    #[error("version {version} of workflow {workflow_id} not found")]
    VersionNotFound { workflow_id: String, version: u64 },

    #[error("another invocation holds the version store lock")]
    Locked,

    #[error("stored snapshot is corrupt: {message}")]
    Corrupt { message: String },
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::Io { .. } | StoreError::Corrupt { .. } => ErrorClass::Io,
            StoreError::Permission { .. } => ErrorClass::Permission,
            StoreError::VersionNotFound { .. } => ErrorClass::Data,
            StoreError::Locked => ErrorClass::TempFail,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "IO_ERROR",
            StoreError::Permission { .. } => "PERMISSION_DENIED",
            StoreError::VersionNotFound { .. } => "VERSION_NOT_FOUND",
            StoreError::Locked => "STORE_LOCKED",
            StoreError::Corrupt { .. } => "IO_ERROR",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            StoreError::Permission {
                message: err.to_string(),
            }
        } else {
            StoreError::Io {
                message: err.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Version metadata without the snapshot payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMeta {
    pub workflow_id: String,
    pub version_number: u64,
    pub workflow_name: String,
    pub node_count: usize,
    pub trigger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
}

/// A full stored snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub meta: VersionMeta,
    pub workflow: Workflow,
}

/// Structured difference between two snapshots.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiff {
    pub nodes_added: Vec<String>,
    pub nodes_removed: Vec<String>,
    pub nodes_modified: Vec<String>,
    pub connections_added: usize,
    pub connections_removed: usize,
    pub metadata_changed: Vec<String>,
}

impl VersionDiff {
    pub fn is_empty(&self) -> bool {
        self.nodes_added.is_empty()
            && self.nodes_removed.is_empty()
            && self.nodes_modified.is_empty()
            && self.connections_added == 0
            && self.connections_removed == 0
            && self.metadata_changed.is_empty()
    }
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub workflows: usize,
    pub snapshots: usize,
    pub database_bytes: u64,
}

/// Store configuration.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Refuse group/world-readable store files instead of warning.
    pub strict_permissions: bool,
}

/// The local version store over `data.db` in the user data directory.
pub struct VersionStore {
    conn: Mutex<Connection>,
    lock_path: PathBuf,
}

impl std::fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStore")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

impl VersionStore {
    /// Open (creating if needed) the store under `dir`.
    pub fn open(dir: &Path, options: &StoreOptions) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        restrict_dir_permissions(dir)?;

        let db_path = dir.join("data.db");
        check_file_permissions(&db_path, options.strict_permissions)?;

        let conn = Connection::open(&db_path)?;
        conn.execute_batch(SCHEMA)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        restrict_file_permissions(&db_path)?;

        Ok(Self {
            conn: Mutex::new(conn),
            lock_path: dir.join("data.db.lock"),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        static SEQ: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            lock_path: std::env::temp_dir()
                .join(format!("n8nctl-test-{}-{seq}.lock", std::process::id())),
        })
    }

    fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot a workflow. Returns the new version number.
    pub fn create_snapshot(
        &self,
        workflow_id: &str,
        workflow: &Workflow,
        trigger: SnapshotTrigger,
        created_by: Option<&str>,
    ) -> Result<u64> {
        let _lock = LockGuard::acquire(&self.lock_path)?;
        let snapshot_json =
            serde_json::to_string(workflow).map_err(|e| StoreError::Io {
                message: format!("failed to encode snapshot: {e}"),
            })?;

        let conn = self.connection();
        let next: u64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version_number), 0) + 1 FROM workflow_versions
                 WHERE workflow_id = ?1",
                params![workflow_id],
                |row| row.get(0),
            )?;

        conn.execute(
            "INSERT INTO workflow_versions
                (workflow_id, version_number, workflow_name, node_count, snapshot_json,
                 trigger_kind, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                workflow_id,
                next,
                workflow.name,
                workflow.nodes.len(),
                snapshot_json,
                trigger.as_str(),
                created_by,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let pruned = prune_with(&conn, workflow_id, DEFAULT_RETENTION)?;
        if pruned > 0 {
            debug!(workflow_id, pruned, "auto-pruned old snapshots");
        }
        Ok(next)
    }

    /// Most-recent-first version metadata.
    pub fn list(&self, workflow_id: &str, limit: usize) -> Result<Vec<VersionMeta>> {
        let conn = self.connection();
        let mut stmt = conn.prepare_cached(
            "SELECT workflow_id, version_number, workflow_name, node_count, trigger_kind,
                    created_by, created_at
             FROM workflow_versions
             WHERE workflow_id = ?1
             ORDER BY version_number DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![workflow_id, limit as i64], |row| {
            Ok(VersionMeta {
                workflow_id: row.get(0)?,
                version_number: row.get(1)?,
                workflow_name: row.get(2)?,
                node_count: row.get::<_, i64>(3)? as usize,
                trigger: row.get(4)?,
                created_by: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Fetch one snapshot.
    pub fn get(&self, workflow_id: &str, version: u64) -> Result<Option<Snapshot>> {
        let conn = self.connection();
        let row = conn
            .query_row(
                "SELECT workflow_id, version_number, workflow_name, node_count, trigger_kind,
                        created_by, created_at, snapshot_json
                 FROM workflow_versions
                 WHERE workflow_id = ?1 AND version_number = ?2",
                params![workflow_id, version],
                |row| {
                    Ok((
                        VersionMeta {
                            workflow_id: row.get(0)?,
                            version_number: row.get(1)?,
                            workflow_name: row.get(2)?,
                            node_count: row.get::<_, i64>(3)? as usize,
                            trigger: row.get(4)?,
                            created_by: row.get(5)?,
                            created_at: row.get(6)?,
                        },
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((meta, raw)) => {
                let workflow: Workflow =
                    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                        message: format!(
                            "snapshot {}#{} does not decode: {e}",
                            meta.workflow_id, meta.version_number
                        ),
                    })?;
                Ok(Some(Snapshot { meta, workflow }))
            }
        }
    }

    /// Structured comparison of two stored versions.
    pub fn compare(&self, workflow_id: &str, a: u64, b: u64) -> Result<VersionDiff> {
        let first = self
            .get(workflow_id, a)?
            .ok_or_else(|| StoreError::VersionNotFound {
                workflow_id: workflow_id.to_string(),
                version: a,
            })?;
        let second = self
            .get(workflow_id, b)?
            .ok_or_else(|| StoreError::VersionNotFound {
                workflow_id: workflow_id.to_string(),
                version: b,
            })?;
        Ok(diff_workflows(&first.workflow, &second.workflow))
    }

    /// Roll back to `target_version`.
    ///
    /// Snapshots the supplied current state first (trigger `rollback`)
    /// unless `backup` is false, then returns the target state for the
    /// caller to persist. The pre-rollback version number is returned with
    /// the restored workflow.
    pub fn rollback(
        &self,
        workflow_id: &str,
        current: &Workflow,
        target_version: u64,
        backup: bool,
    ) -> Result<(Workflow, Option<u64>)> {
        let target = self
            .get(workflow_id, target_version)?
            .ok_or_else(|| StoreError::VersionNotFound {
                workflow_id: workflow_id.to_string(),
                version: target_version,
            })?;

        let backup_version = if backup {
            Some(self.create_snapshot(
                workflow_id,
                current,
                SnapshotTrigger::Rollback,
                None,
            )?)
        } else {
            None
        };

        debug!(
            workflow_id,
            target_version,
            backup_version = backup_version.unwrap_or(0),
            "rolled back workflow state"
        );
        Ok((target.workflow, backup_version))
    }

    /// Keep the `keep` most recent snapshots; returns the number removed.
    pub fn prune(&self, workflow_id: &str, keep: usize) -> Result<usize> {
        let _lock = LockGuard::acquire(&self.lock_path)?;
        let conn = self.connection();
        prune_with(&conn, workflow_id, keep)
    }

    /// Remove every snapshot of one workflow.
    pub fn delete_all(&self, workflow_id: &str) -> Result<usize> {
        let _lock = LockGuard::acquire(&self.lock_path)?;
        let conn = self.connection();
        let removed = conn.execute(
            "DELETE FROM workflow_versions WHERE workflow_id = ?1",
            params![workflow_id],
        )?;
        Ok(removed)
    }

    /// Remove everything.
    pub fn truncate(&self) -> Result<usize> {
        let _lock = LockGuard::acquire(&self.lock_path)?;
        let conn = self.connection();
        let removed = conn.execute("DELETE FROM workflow_versions", [])?;
        Ok(removed)
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.connection();
        let (workflows, snapshots): (i64, i64) = conn.query_row(
            "SELECT COUNT(DISTINCT workflow_id), COUNT(*) FROM workflow_versions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let database_bytes: i64 = conn
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);
        Ok(StoreStats {
            workflows: workflows as usize,
            snapshots: snapshots as usize,
            database_bytes: database_bytes as u64,
        })
    }
}

fn prune_with(conn: &Connection, workflow_id: &str, keep: usize) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM workflow_versions
         WHERE workflow_id = ?1 AND version_number NOT IN (
             SELECT version_number FROM workflow_versions
             WHERE workflow_id = ?1
             ORDER BY version_number DESC
             LIMIT ?2
         )",
        params![workflow_id, keep as i64],
    )?;
    Ok(removed)
}

/// Node-level, connection-set, and metadata comparison.
pub fn diff_workflows(a: &Workflow, b: &Workflow) -> VersionDiff {
    use std::collections::{HashMap, HashSet};

    let mut diff = VersionDiff::default();

    let nodes_a: HashMap<&str, &n8nctl_core::Node> =
        a.nodes.iter().map(|n| (n.name.as_str(), n)).collect();
    let nodes_b: HashMap<&str, &n8nctl_core::Node> =
        b.nodes.iter().map(|n| (n.name.as_str(), n)).collect();

    for name in nodes_b.keys() {
        if !nodes_a.contains_key(name) {
            diff.nodes_added.push(name.to_string());
        }
    }
    for (name, node_a) in &nodes_a {
        match nodes_b.get(name) {
            None => diff.nodes_removed.push(name.to_string()),
            Some(node_b) if node_a != node_b => diff.nodes_modified.push(name.to_string()),
            _ => {}
        }
    }
    diff.nodes_added.sort();
    diff.nodes_removed.sort();
    diff.nodes_modified.sort();

    let edges = |workflow: &Workflow| -> HashSet<(String, String, usize, String, String, u32)> {
        workflow
            .endpoints()
            .map(|(source, kind, index, endpoint)| {
                (
                    source.to_string(),
                    kind.to_string(),
                    index,
                    endpoint.node.clone(),
                    endpoint.kind.clone(),
                    endpoint.index,
                )
            })
            .collect()
    };
    let edges_a = edges(a);
    let edges_b = edges(b);
    diff.connections_added = edges_b.difference(&edges_a).count();
    diff.connections_removed = edges_a.difference(&edges_b).count();

    if a.name != b.name {
        diff.metadata_changed.push("name".to_string());
    }
    if a.active != b.active {
        diff.metadata_changed.push("active".to_string());
    }
    if a.settings != b.settings {
        diff.metadata_changed.push("settings".to_string());
    }
    if a.tags != b.tags {
        diff.metadata_changed.push("tags".to_string());
    }

    diff
}

fn restrict_dir_permissions(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o700);
        std::fs::set_permissions(dir, permissions)?;
    }
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

fn restrict_file_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Warn on loose database permissions; refuse them in strict mode.
fn check_file_permissions(path: &Path, strict: bool) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let Ok(metadata) = std::fs::metadata(path) else {
            return Ok(()); // file does not exist yet
        };
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            if strict {
                return Err(StoreError::Permission {
                    message: format!(
                        "{} is readable by other users (mode {mode:o}); fix with chmod 600",
                        path.display()
                    ),
                });
            }
            warn!(
                path = %path.display(),
                mode = format!("{mode:o}"),
                "version store database is readable by other users"
            );
        }
    }
    #[cfg(not(unix))]
    let _ = (path, strict);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow(name: &str, nodes: usize) -> Workflow {
        let node_list: Vec<serde_json::Value> = (0..nodes)
            .map(|i| {
                json!({"name": format!("Node {i}"), "type": "n8n-nodes-base.set",
                       "typeVersion": 3.4, "position": [i as f64 * 100.0, 0.0],
                       "parameters": {}})
            })
            .collect();
        serde_json::from_value(json!({
            "name": name,
            "nodes": node_list,
            "connections": {}
        }))
        .unwrap()
    }

    #[test]
    fn version_numbers_are_monotonic_per_workflow() {
        let store = VersionStore::open_in_memory().unwrap();
        let wf = workflow("A", 1);
        assert_eq!(
            store
                .create_snapshot("w1", &wf, SnapshotTrigger::FullUpdate, None)
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .create_snapshot("w1", &wf, SnapshotTrigger::PartialUpdate, None)
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .create_snapshot("w2", &wf, SnapshotTrigger::FullUpdate, None)
                .unwrap(),
            1
        );
    }

    #[test]
    fn list_is_newest_first() {
        let store = VersionStore::open_in_memory().unwrap();
        for i in 0..3 {
            store
                .create_snapshot("w1", &workflow(&format!("v{i}"), 1), SnapshotTrigger::Autofix, None)
                .unwrap();
        }
        let versions = store.list("w1", 10).unwrap();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0].version_number, 3);
        assert_eq!(versions[2].version_number, 1);
        assert_eq!(versions[0].trigger, "autofix");
    }

    #[test]
    fn auto_prune_keeps_ten_most_recent() {
        let store = VersionStore::open_in_memory().unwrap();
        let wf = workflow("A", 1);
        for _ in 0..13 {
            store
                .create_snapshot("w1", &wf, SnapshotTrigger::PartialUpdate, None)
                .unwrap();
        }
        let versions = store.list("w1", 50).unwrap();
        assert_eq!(versions.len(), DEFAULT_RETENTION);
        assert_eq!(versions.last().unwrap().version_number, 4);
    }

    #[test]
    fn get_roundtrips_snapshot() {
        let store = VersionStore::open_in_memory().unwrap();
        let wf = workflow("Round", 2);
        let version = store
            .create_snapshot("w1", &wf, SnapshotTrigger::FullUpdate, Some("cli"))
            .unwrap();
        let snapshot = store.get("w1", version).unwrap().unwrap();
        assert_eq!(snapshot.workflow, wf);
        assert_eq!(snapshot.meta.node_count, 2);
        assert_eq!(snapshot.meta.created_by.as_deref(), Some("cli"));
        assert!(store.get("w1", 99).unwrap().is_none());
    }

    #[test]
    fn compare_reports_structured_changes() {
        let store = VersionStore::open_in_memory().unwrap();
        let before: Workflow = serde_json::from_value(json!({
            "name": "Before",
            "nodes": [
                {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "in"}},
                {"name": "Old", "type": "n8n-nodes-base.set", "typeVersion": 3.4,
                 "position": [100, 0], "parameters": {}}
            ],
            "connections": {
                "Hook": {"main": [[{"node": "Old", "type": "main", "index": 0}]]}
            }
        }))
        .unwrap();
        let after: Workflow = serde_json::from_value(json!({
            "name": "After",
            "nodes": [
                {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "changed"}},
                {"name": "New", "type": "n8n-nodes-base.set", "typeVersion": 3.4,
                 "position": [100, 0], "parameters": {}}
            ],
            "connections": {}
        }))
        .unwrap();

        store
            .create_snapshot("w1", &before, SnapshotTrigger::FullUpdate, None)
            .unwrap();
        store
            .create_snapshot("w1", &after, SnapshotTrigger::FullUpdate, None)
            .unwrap();

        let diff = store.compare("w1", 1, 2).unwrap();
        assert_eq!(diff.nodes_added, vec!["New"]);
        assert_eq!(diff.nodes_removed, vec!["Old"]);
        assert_eq!(diff.nodes_modified, vec!["Hook"]);
        assert_eq!(diff.connections_removed, 1);
        assert!(diff.metadata_changed.contains(&"name".to_string()));
    }

    #[test]
    fn rollback_snapshots_current_state_first() {
        let store = VersionStore::open_in_memory().unwrap();
        let v1 = workflow("v1", 1);
        let v2 = workflow("v2", 2);
        store
            .create_snapshot("w1", &v1, SnapshotTrigger::FullUpdate, None)
            .unwrap();

        let (restored, backup) = store.rollback("w1", &v2, 1, true).unwrap();
        assert_eq!(restored, v1);
        let backup_version = backup.unwrap();
        assert_eq!(backup_version, 2);
        let backup_snapshot = store.get("w1", backup_version).unwrap().unwrap();
        assert_eq!(backup_snapshot.workflow, v2);
        assert_eq!(backup_snapshot.meta.trigger, "rollback");

        let (_, no_backup) = store.rollback("w1", &v2, 1, false).unwrap();
        assert!(no_backup.is_none());
    }

    #[test]
    fn rollback_to_missing_version_fails() {
        let store = VersionStore::open_in_memory().unwrap();
        let err = store
            .rollback("w1", &workflow("x", 1), 7, true)
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionNotFound { version: 7, .. }));
        assert_eq!(err.class(), ErrorClass::Data);
    }

    #[test]
    fn prune_delete_truncate_stats() {
        let store = VersionStore::open_in_memory().unwrap();
        let wf = workflow("A", 1);
        for _ in 0..5 {
            store
                .create_snapshot("w1", &wf, SnapshotTrigger::PartialUpdate, None)
                .unwrap();
            store
                .create_snapshot("w2", &wf, SnapshotTrigger::PartialUpdate, None)
                .unwrap();
        }

        assert_eq!(store.prune("w1", 2).unwrap(), 3);
        assert_eq!(store.list("w1", 10).unwrap().len(), 2);

        let stats = store.stats().unwrap();
        assert_eq!(stats.workflows, 2);
        assert_eq!(stats.snapshots, 7);

        assert_eq!(store.delete_all("w2").unwrap(), 5);
        assert_eq!(store.truncate().unwrap(), 2);
        assert_eq!(store.stats().unwrap().snapshots, 0);
    }

    #[test]
    fn on_disk_store_sets_restrictive_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("n8nctl");
        let store = VersionStore::open(&store_dir, &StoreOptions::default()).unwrap();
        store
            .create_snapshot("w1", &workflow("A", 1), SnapshotTrigger::FullUpdate, None)
            .unwrap();
        drop(store);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let dir_mode = std::fs::metadata(&store_dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(dir_mode, 0o700);
            let db_mode = std::fs::metadata(store_dir.join("data.db"))
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(db_mode, 0o600);
        }

        // Reopen and read back.
        let reopened = VersionStore::open(&store_dir, &StoreOptions::default()).unwrap();
        assert_eq!(reopened.list("w1", 10).unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn strict_mode_refuses_loose_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("n8nctl");
        VersionStore::open(&store_dir, &StoreOptions::default()).unwrap();
        std::fs::set_permissions(
            store_dir.join("data.db"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let err = VersionStore::open(
            &store_dir,
            &StoreOptions {
                strict_permissions: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Permission { .. }));
    }
}
