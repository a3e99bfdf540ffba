//! Codes, categories and merge state.

use anyhow::Context;
use rusqlite::{params, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use axial_core::{CanonicalIndex, CanonicalResolver, MergeRecord, Node, NodeStatus, NodeType};

use crate::pool::{DbError, DbPool, DbResult};

/// Create an active code, returning its id. Existing codes are left untouched.
pub fn insert_code(pool: &DbPool, project_id: &str, name: &str) -> DbResult<String> {
    pool.with_conn(|conn| {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM codes WHERE project_id = ?1 AND name = ?2",
                params![project_id, name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO codes (id, project_id, name) VALUES (?1, ?2, ?3)",
            params![id, project_id, name],
        )?;
        Ok(id)
    })
}

/// Create a category, returning its id. Existing categories are left untouched.
pub fn insert_category(pool: &DbPool, project_id: &str, name: &str) -> DbResult<String> {
    pool.with_conn(|conn| {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM categories WHERE project_id = ?1 AND name = ?2",
                params![project_id, name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO categories (id, project_id, name) VALUES (?1, ?2, ?3)",
            params![id, project_id, name],
        )?;
        Ok(id)
    })
}

/// Fold `alias` into `canonical`. Both codes must exist in the project.
pub fn merge_code(pool: &DbPool, project_id: &str, alias: &str, canonical: &str) -> DbResult<()> {
    if alias == canonical {
        return Err(DbError::InvalidRecord(format!("cannot merge code '{}' into itself", alias)));
    }

    pool.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE codes SET status = 'merged', canonical_pointer = ?3
             WHERE project_id = ?1 AND name = ?2
               AND EXISTS (SELECT 1 FROM codes WHERE project_id = ?1 AND name = ?3)",
            params![project_id, alias, canonical],
        )?;
        if updated == 0 {
            return Err(DbError::InvalidRecord(format!(
                "merge '{}' -> '{}' needs both codes in project {}",
                alias, canonical, project_id
            )));
        }
        debug!(project_id, alias, canonical, "Code merged");
        Ok(())
    })
}

/// All codes of a project, ordered by name.
pub fn list_codes(pool: &DbPool, project_id: &str) -> DbResult<Vec<Node>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, status, canonical_pointer
             FROM codes WHERE project_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            let status: String = row.get(3)?;
            Ok(Node {
                id: row.get(0)?,
                project_id: row.get(1)?,
                node_type: NodeType::Code,
                name: row.get(2)?,
                status: NodeStatus::parse_lenient(&status),
                canonical_pointer: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    })
}

/// Names of all categories in a project, ordered.
pub fn list_categories(pool: &DbPool, project_id: &str) -> DbResult<Vec<String>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM categories WHERE project_id = ?1 ORDER BY name")?;
        let rows = stmt.query_map(params![project_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    })
}

/// Merge state of every code in a project.
pub fn merge_records(pool: &DbPool, project_id: &str) -> DbResult<Vec<MergeRecord>> {
    Ok(list_codes(pool, project_id)?
        .into_iter()
        .map(|node| MergeRecord {
            name: node.name,
            status: node.status,
            canonical_pointer: node.canonical_pointer,
        })
        .collect())
}

impl CanonicalResolver for DbPool {
    fn canonical_index(&self, project_id: &str) -> anyhow::Result<CanonicalIndex> {
        let records = merge_records(self, project_id).context("Failed to load code merge state")?;
        Ok(CanonicalIndex::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_in_memory;

    #[test]
    fn test_insert_is_idempotent() {
        let pool = init_in_memory().unwrap();
        let a = insert_code(&pool, "p1", "trust").unwrap();
        let b = insert_code(&pool, "p1", "trust").unwrap();
        assert_eq!(a, b);
        let other = insert_code(&pool, "p2", "trust").unwrap();
        assert_ne!(a, other);
        assert_eq!(list_codes(&pool, "p1").unwrap().len(), 1);
    }

    #[test]
    fn test_merge_and_resolve() {
        let pool = init_in_memory().unwrap();
        for name in ["confianza", "trust", "faith"] {
            insert_code(&pool, "p1", name).unwrap();
        }
        merge_code(&pool, "p1", "faith", "confianza").unwrap();
        merge_code(&pool, "p1", "confianza", "trust").unwrap();

        let resolved = pool
            .resolve_bulk("p1", &["faith".to_string(), "trust".to_string()])
            .unwrap();
        assert_eq!(resolved["faith"], Some("trust".to_string()));
        assert_eq!(resolved["trust"], Some("trust".to_string()));
    }

    #[test]
    fn test_merge_is_tenant_scoped() {
        let pool = init_in_memory().unwrap();
        insert_code(&pool, "p1", "a").unwrap();
        insert_code(&pool, "p2", "b").unwrap();
        assert!(merge_code(&pool, "p1", "a", "b").is_err());
        assert!(merge_code(&pool, "p1", "a", "a").is_err());
    }

    #[test]
    fn test_categories() {
        let pool = init_in_memory().unwrap();
        insert_category(&pool, "p1", "Work").unwrap();
        insert_category(&pool, "p1", "Family").unwrap();
        insert_category(&pool, "p2", "Other").unwrap();
        assert_eq!(list_categories(&pool, "p1").unwrap(), vec!["Family", "Work"]);
    }
}
