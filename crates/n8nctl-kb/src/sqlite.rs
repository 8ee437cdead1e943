//! SQLite-backed catalog over the bundled `nodes.db`.
//!
//! The database ships read-only with the binary. Ranked search uses FTS5
//! (BM25) when the build and the bundle support it; availability is probed
//! once per handle, and FTS syntax errors degrade to `LIKE` substring search
//! so user queries never hard-fail on tokenizer quirks.

use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use rusqlite::{params, Connection, OpenFlags, Row};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::{qualified_candidates, NodeCatalog, SearchMode};
use crate::error::{KbError, Result};
use crate::similarity::rank_candidates;
use crate::types::{
    BreakingChange, NodeSearchHit, NodeTypeRecord, PropertySearchHit, TemplateRecord,
    TypeSuggestion,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    type TEXT PRIMARY KEY,
    alias TEXT NOT NULL,
    display_name TEXT NOT NULL,
    category TEXT NOT NULL,
    subcategory TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    latest_version REAL NOT NULL,
    supported_versions TEXT NOT NULL,
    properties_json TEXT NOT NULL DEFAULT '[]',
    credentials_json TEXT NOT NULL DEFAULT '[]',
    operations_json TEXT NOT NULL DEFAULT '[]',
    is_trigger INTEGER NOT NULL DEFAULT 0,
    supports_error_output INTEGER NOT NULL DEFAULT 1,
    output_count INTEGER,
    deprecated INTEGER NOT NULL DEFAULT 0,
    docs TEXT NOT NULL DEFAULT '',
    breaking_changes_json TEXT NOT NULL DEFAULT '[]'
);

CREATE VIRTUAL TABLE IF NOT EXISTS node_fts USING fts5(
    type, alias, display_name, description, category
);

CREATE VIRTUAL TABLE IF NOT EXISTS property_fts USING fts5(
    node_type, path, name, description, type_tag
);

CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    workflow_json TEXT NOT NULL,
    node_count INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL DEFAULT 0,
    complexity TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    tasks TEXT NOT NULL DEFAULT '[]',
    services TEXT NOT NULL DEFAULT '[]',
    setup_minutes INTEGER NOT NULL DEFAULT 0
);

CREATE VIRTUAL TABLE IF NOT EXISTS templates_fts USING fts5(
    id, name, description, tasks, services
);
"#;

/// Catalog handle over a SQLite database file.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    fts_available: OnceCell<bool>,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("fts_available", &self.fts_available.get())
            .finish()
    }
}

impl SqliteCatalog {
    /// Open the bundled database read-only. Missing file is fatal.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(KbError::MissingDatabase {
                path: path.display().to_string(),
            });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            fts_available: OnceCell::new(),
        })
    }

    /// Create (or open writable) a database with the catalog schema. Used by
    /// the bundle build tooling and by tests.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            fts_available: OnceCell::new(),
        })
    }

    /// Fresh in-memory database with the catalog schema.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            fts_available: OnceCell::new(),
        })
    }

    /// Insert one node record and its FTS rows.
    pub fn ingest_node(&self, record: &NodeTypeRecord) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO nodes (type, alias, display_name, category, subcategory,
                description, latest_version, supported_versions, properties_json,
                credentials_json, operations_json, is_trigger, supports_error_output,
                output_count, deprecated, docs, breaking_changes_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                record.node_type,
                record.alias,
                record.display_name,
                record.category,
                record.subcategory,
                record.description,
                record.latest_version,
                encode(&record.supported_versions)?,
                encode(&record.properties)?,
                encode(&record.credentials)?,
                encode(&record.operations)?,
                record.is_trigger,
                record.supports_error_output,
                record.output_count,
                record.deprecated,
                record.docs,
                encode(&record.breaking_changes)?,
            ],
        )?;
        conn.execute(
            "INSERT INTO node_fts (type, alias, display_name, description, category)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.node_type,
                record.alias,
                record.display_name,
                record.description,
                record.category
            ],
        )?;
        for property in &record.properties {
            conn.execute(
                "INSERT INTO property_fts (node_type, path, name, description, type_tag)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.node_type,
                    property.name,
                    property.name,
                    property.description,
                    serde_json::to_string(&property.kind).unwrap_or_default(),
                ],
            )?;
        }
        Ok(())
    }

    /// Insert one template and its FTS row.
    pub fn ingest_template(&self, template: &TemplateRecord) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO templates (id, name, description, workflow_json, node_count,
                views, complexity, category, tasks, services, setup_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                template.id,
                template.name,
                template.description,
                serde_json::to_string(&template.workflow).unwrap_or_default(),
                template.node_count,
                template.views,
                template.complexity,
                template.category,
                encode(&template.tasks)?,
                encode(&template.services)?,
                template.setup_minutes,
            ],
        )?;
        conn.execute(
            "INSERT INTO templates_fts (id, name, description, tasks, services)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                template.id.to_string(),
                template.name,
                template.description,
                template.tasks.join(" "),
                template.services.join(" "),
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means another thread panicked mid-query; the
        // connection itself is still usable for read-only work.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Probe FTS5 availability once per handle.
    fn fts_enabled(&self) -> bool {
        *self.fts_available.get_or_init(|| {
            let conn = self.lock();
            let probe: rusqlite::Result<i64> = conn.query_row(
                "SELECT count(*) FROM node_fts WHERE node_fts MATCH 'probe'",
                [],
                |row| row.get(0),
            );
            match probe {
                Ok(_) => true,
                Err(err) => {
                    debug!(error = %err, "FTS5 unavailable, using substring search");
                    false
                }
            }
        })
    }

    fn load_record(&self, qualified: &str) -> Result<Option<NodeTypeRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT type, alias, display_name, category, subcategory, description,
                    latest_version, supported_versions, properties_json, credentials_json,
                    operations_json, is_trigger, supports_error_output, output_count,
                    deprecated, docs, breaking_changes_json
             FROM nodes WHERE type = ?1 OR alias = ?1",
        )?;
        let mut rows = stmt.query(params![qualified])?;
        while let Some(row) = rows.next()? {
            match decode_node_row(row) {
                Ok(record) => return Ok(Some(record)),
                Err(err) => {
                    // Corrupt row: skip it rather than failing the command.
                    warn!(node_type = qualified, error = %err, "skipping corrupt catalog row");
                }
            }
        }
        Ok(None)
    }

    fn all_records(&self) -> Result<Vec<NodeTypeRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT type, alias, display_name, category, subcategory, description,
                    latest_version, supported_versions, properties_json, credentials_json,
                    operations_json, is_trigger, supports_error_output, output_count,
                    deprecated, docs, breaking_changes_json
             FROM nodes ORDER BY type",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            match decode_node_row(row) {
                Ok(record) => records.push(record),
                Err(err) => warn!(error = %err, "skipping corrupt catalog row"),
            }
        }
        Ok(records)
    }

    fn fts_search(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<NodeSearchHit>> {
        let match_expr = build_match_expression(query, mode);
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT f.type, n.display_name, n.category, n.description, bm25(node_fts) AS rank
             FROM node_fts f JOIN nodes n ON n.type = f.type
             WHERE node_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![match_expr, limit as i64], |row| {
            Ok(NodeSearchHit {
                node_type: row.get(0)?,
                display_name: row.get(1)?,
                category: row.get(2)?,
                description: row.get(3)?,
                // BM25 ranks ascending (smaller is better); invert for callers.
                score: -row.get::<_, f64>(4)?,
            })
        })?;
        let mut hits = Vec::new();
        for row in rows {
            hits.push(row?);
        }
        Ok(hits)
    }

    fn like_search(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<NodeSearchHit>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_ascii_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<NodeSearchHit> = Vec::new();
        for record in self.all_records()? {
            let haystack = format!(
                "{} {} {} {} {}",
                record.display_name,
                record.description,
                record.category,
                record.alias,
                record.node_type
            )
            .to_ascii_lowercase();
            let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
            let include = match mode {
                SearchMode::And => matched == terms.len(),
                _ => matched > 0,
            };
            if include {
                hits.push(NodeSearchHit {
                    node_type: record.node_type,
                    display_name: record.display_name,
                    category: record.category,
                    description: record.description,
                    score: matched as f64 / terms.len() as f64,
                });
            }
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_type.cmp(&b.node_type))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Exact-alias visibility boost for short queries.
    fn boost_short_query(&self, query: &str, hits: &mut Vec<NodeSearchHit>) -> Result<()> {
        if query.len() >= 6 || query.contains(' ') {
            return Ok(());
        }
        if let Some(record) = self.load_record(query.trim())? {
            if let Some(pos) = hits.iter().position(|h| h.node_type == record.node_type) {
                let mut hit = hits.remove(pos);
                hit.score += 10.0;
                hits.insert(0, hit);
            } else {
                hits.insert(
                    0,
                    NodeSearchHit {
                        node_type: record.node_type,
                        display_name: record.display_name,
                        category: record.category,
                        description: record.description,
                        score: 10.0,
                    },
                );
            }
        }
        Ok(())
    }
}

impl NodeCatalog for SqliteCatalog {
    fn lookup(&self, type_name: &str) -> Result<Option<NodeTypeRecord>> {
        for candidate in qualified_candidates(type_name) {
            if let Some(record) = self.load_record(&candidate)? {
                return Ok(Some(record));
            }
        }
        if !type_name.contains('.') {
            return self.load_record(type_name.trim());
        }
        Ok(None)
    }

    fn search(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<NodeSearchHit>> {
        let mut hits = if mode == SearchMode::Fuzzy {
            let records = self.all_records()?;
            rank_candidates(query, &records, limit)
                .into_iter()
                .filter_map(|s| {
                    records.iter().find(|r| r.node_type == s.value).map(|r| NodeSearchHit {
                        node_type: r.node_type.clone(),
                        display_name: r.display_name.clone(),
                        category: r.category.clone(),
                        description: r.description.clone(),
                        score: s.confidence,
                    })
                })
                .collect()
        } else if self.fts_enabled() {
            match self.fts_search(query, mode, limit) {
                Ok(hits) => hits,
                Err(err) => {
                    // Query-level FTS errors (tokenizer, bareword syntax)
                    // degrade to substring search.
                    debug!(error = %err, "FTS query failed, falling back to substring search");
                    self.like_search(query, mode, limit)?
                }
            }
        } else {
            self.like_search(query, mode, limit)?
        };

        self.boost_short_query(query, &mut hits)?;
        hits.truncate(limit);
        Ok(hits)
    }

    fn search_properties(
        &self,
        type_name: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PropertySearchHit>> {
        let Some(record) = self.lookup(type_name)? else {
            return Ok(Vec::new());
        };

        if self.fts_enabled() {
            let match_expr = build_match_expression(query, SearchMode::Or);
            let conn = self.lock();
            let stmt = conn.prepare_cached(
                "SELECT node_type, path, name, description, type_tag, bm25(property_fts) AS rank
                 FROM property_fts
                 WHERE property_fts MATCH ?1 AND node_type = ?2
                 ORDER BY rank
                 LIMIT ?3",
            );
            if let Ok(mut stmt) = stmt {
                let mapped = stmt.query_map(
                    params![match_expr, record.node_type, limit as i64],
                    |row| {
                        let tag: String = row.get(4)?;
                        Ok(PropertySearchHit {
                            node_type: row.get(0)?,
                            path: row.get(1)?,
                            name: row.get(2)?,
                            kind: serde_json::from_str(&tag)
                                .unwrap_or(crate::types::PropertyKind::String),
                            description: row.get(3)?,
                            score: -row.get::<_, f64>(5)?,
                        })
                    },
                );
                if let Ok(rows) = mapped {
                    let mut hits = Vec::new();
                    let mut failed = false;
                    for row in rows {
                        match row {
                            Ok(hit) => hits.push(hit),
                            Err(err) => {
                                debug!(error = %err, "property FTS failed, falling back");
                                failed = true;
                                break;
                            }
                        }
                    }
                    if !failed {
                        return Ok(hits);
                    }
                }
            }
        }

        // Substring fallback over the record's own property list.
        let needle = query.to_ascii_lowercase();
        let mut hits: Vec<PropertySearchHit> = record
            .properties
            .iter()
            .filter(|p| {
                p.name.to_ascii_lowercase().contains(&needle)
                    || p.description.to_ascii_lowercase().contains(&needle)
            })
            .map(|p| PropertySearchHit {
                node_type: record.node_type.clone(),
                path: p.name.clone(),
                name: p.name.clone(),
                kind: p.kind,
                description: p.description.clone(),
                score: 1.0,
            })
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }

    fn similar_types(&self, bad_type: &str, limit: usize) -> Result<Vec<TypeSuggestion>> {
        let records = self.all_records()?;
        Ok(rank_candidates(bad_type, &records, limit))
    }

    fn breaking_changes(&self, type_name: &str, from: f64, to: f64) -> Result<Vec<BreakingChange>> {
        Ok(self
            .lookup(type_name)?
            .map(|record| record.changes_between(from, to).into_iter().cloned().collect())
            .unwrap_or_default())
    }

    fn search_templates(&self, query: &str, limit: usize) -> Result<Vec<TemplateRecord>> {
        if self.fts_enabled() {
            let match_expr = build_match_expression(query, SearchMode::Or);
            let result = {
                let conn = self.lock();
                let mut stmt = conn.prepare_cached(
                    "SELECT t.id, t.name, t.description, t.workflow_json, t.node_count, t.views,
                            t.complexity, t.category, t.tasks, t.services, t.setup_minutes
                     FROM templates_fts f JOIN templates t ON t.id = CAST(f.id AS INTEGER)
                     WHERE templates_fts MATCH ?1
                     ORDER BY bm25(templates_fts)
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![match_expr, limit as i64], decode_template_row);
                rows.map(|mapped| mapped.collect::<rusqlite::Result<Vec<_>>>())
            };
            match result {
                Ok(Ok(hits)) => return Ok(hits),
                Ok(Err(err)) | Err(err) => {
                    debug!(error = %err, "template FTS failed, falling back to substring search");
                }
            }
        }

        let needle = format!("%{}%", query.to_ascii_lowercase());
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, description, workflow_json, node_count, views, complexity,
                    category, tasks, services, setup_minutes
             FROM templates
             WHERE lower(name) LIKE ?1 OR lower(description) LIKE ?1
                OR lower(tasks) LIKE ?1 OR lower(services) LIKE ?1
             ORDER BY views DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![needle, limit as i64], decode_template_row)?;
        let mut hits = Vec::new();
        for row in rows {
            hits.push(row?);
        }
        Ok(hits)
    }

    fn get_template(&self, id: i64) -> Result<Option<TemplateRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, description, workflow_json, node_count, views, complexity,
                    category, tasks, services, setup_minutes
             FROM templates WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], decode_template_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| KbError::QueryFailed {
        message: format!("failed to encode catalog payload: {e}"),
    })
}

fn decode_node_row(row: &Row<'_>) -> std::result::Result<NodeTypeRecord, KbError> {
    let node_type: String = row.get(0)?;
    let decode = |field: &str, raw: String| -> std::result::Result<Value, KbError> {
        serde_json::from_str(&raw).map_err(|e| KbError::CorruptRecord {
            node_type: node_type.clone(),
            message: format!("{field}: {e}"),
        })
    };

    let supported_versions: Vec<f64> =
        serde_json::from_value(decode("supported_versions", row.get(7)?)?).map_err(|e| {
            KbError::CorruptRecord {
                node_type: node_type.clone(),
                message: e.to_string(),
            }
        })?;
    let properties = serde_json::from_value(decode("properties_json", row.get(8)?)?)
        .map_err(|e| KbError::CorruptRecord {
            node_type: node_type.clone(),
            message: e.to_string(),
        })?;
    let credentials = serde_json::from_value(decode("credentials_json", row.get(9)?)?)
        .map_err(|e| KbError::CorruptRecord {
            node_type: node_type.clone(),
            message: e.to_string(),
        })?;
    let operations = serde_json::from_value(decode("operations_json", row.get(10)?)?)
        .map_err(|e| KbError::CorruptRecord {
            node_type: node_type.clone(),
            message: e.to_string(),
        })?;
    let breaking_changes = serde_json::from_value(decode("breaking_changes_json", row.get(16)?)?)
        .map_err(|e| KbError::CorruptRecord {
            node_type: node_type.clone(),
            message: e.to_string(),
        })?;

    Ok(NodeTypeRecord {
        node_type,
        alias: row.get(1)?,
        display_name: row.get(2)?,
        category: row.get(3)?,
        subcategory: row.get(4)?,
        description: row.get(5)?,
        latest_version: row.get(6)?,
        supported_versions,
        properties,
        credentials,
        operations,
        is_trigger: row.get(11)?,
        supports_error_output: row.get(12)?,
        output_count: row.get(13)?,
        deprecated: row.get(14)?,
        docs: row.get(15)?,
        breaking_changes,
    })
}

fn decode_template_row(row: &Row<'_>) -> rusqlite::Result<TemplateRecord> {
    let workflow_raw: String = row.get(3)?;
    let tasks_raw: String = row.get(8)?;
    let services_raw: String = row.get(9)?;
    Ok(TemplateRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        workflow: serde_json::from_str(&workflow_raw).unwrap_or(Value::Null),
        node_count: row.get(4)?,
        views: row.get(5)?,
        complexity: row.get(6)?,
        category: row.get(7)?,
        tasks: serde_json::from_str(&tasks_raw).unwrap_or_default(),
        services: serde_json::from_str(&services_raw).unwrap_or_default(),
        setup_minutes: row.get(10)?,
    })
}

/// Build an FTS5 MATCH expression from whitespace-separated terms.
fn build_match_expression(query: &str, mode: SearchMode) -> String {
    let joiner = match mode {
        SearchMode::And => " AND ",
        _ => " OR ",
    };
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "")))
        .collect::<Vec<_>>()
        .join(joiner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_catalog::{fixture_records, fixture_templates};

    fn seeded() -> SqliteCatalog {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        for record in fixture_records() {
            catalog.ingest_node(&record).unwrap();
        }
        for template in fixture_templates() {
            catalog.ingest_template(&template).unwrap();
        }
        catalog
    }

    #[test]
    fn missing_database_is_fatal() {
        let err = SqliteCatalog::open(Path::new("/nonexistent/nodes.db")).unwrap_err();
        assert!(matches!(err, KbError::MissingDatabase { .. }));
    }

    #[test]
    fn lookup_roundtrips_full_record() {
        let catalog = seeded();
        let record = catalog.lookup("n8n-nodes-base.postgres").unwrap().unwrap();
        assert_eq!(record.alias, "postgres");
        assert_eq!(record.latest_version, 2.6);
        assert!(record.properties.iter().any(|p| p.name == "query"));
        assert_eq!(record.operations.len(), 3);
    }

    #[test]
    fn lookup_resolves_short_alias() {
        let catalog = seeded();
        let record = catalog.lookup("webhook").unwrap().unwrap();
        assert_eq!(record.node_type, "n8n-nodes-base.webhook");
    }

    #[test]
    fn fts_search_ranks_http_request_for_http_query() {
        let catalog = seeded();
        let hits = catalog.search("http request", SearchMode::And, 10).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().any(|h| h.node_type == "n8n-nodes-base.httpRequest"));
    }

    #[test]
    fn fuzzy_search_tolerates_typos() {
        let catalog = seeded();
        let hits = catalog.search("webhok", SearchMode::Fuzzy, 5).unwrap();
        assert_eq!(hits[0].node_type, "n8n-nodes-base.webhook");
    }

    #[test]
    fn short_query_pins_exact_alias_first() {
        let catalog = seeded();
        let hits = catalog.search("set", SearchMode::Or, 5).unwrap();
        assert_eq!(hits[0].node_type, "n8n-nodes-base.set");
    }

    #[test]
    fn property_search_finds_url() {
        let catalog = seeded();
        let hits = catalog.search_properties("httpRequest", "url", 10).unwrap();
        assert!(hits.iter().any(|h| h.name == "url"));
    }

    #[test]
    fn similar_types_flags_autofixable_typo() {
        let catalog = seeded();
        let suggestions = catalog.similar_types("webhok", 5).unwrap();
        assert_eq!(suggestions[0].value, "n8n-nodes-base.webhook");
        assert!(suggestions[0].auto_fixable);
    }

    #[test]
    fn breaking_changes_filter_by_range() {
        let catalog = seeded();
        let changes = catalog
            .breaking_changes("n8n-nodes-base.switch", 2.0, 3.2)
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].auto_migratable);
    }

    #[test]
    fn template_search_and_fetch() {
        let catalog = seeded();
        let hits = catalog.search_templates("slack", 10).unwrap();
        assert!(hits.iter().any(|t| t.id == 1001));
        let template = catalog.get_template(1002).unwrap().unwrap();
        assert_eq!(template.node_count, 4);
        assert!(template.workflow.get("nodes").is_some());
    }

    #[test]
    fn corrupt_row_is_skipped() {
        let catalog = seeded();
        {
            let conn = catalog.lock();
            conn.execute(
                "UPDATE nodes SET properties_json = 'not json' WHERE type = 'n8n-nodes-base.set'",
                [],
            )
            .unwrap();
        }
        assert!(catalog.lookup("n8n-nodes-base.set").unwrap().is_none());
        // Other rows keep working.
        assert!(catalog.lookup("n8n-nodes-base.if").unwrap().is_some());
    }
}
