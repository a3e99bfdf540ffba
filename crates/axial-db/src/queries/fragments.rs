//! Fragments and their coding.
//!
//! Fragment lookups take alias lists: a canonical code may still be recorded
//! under any of its merged names in `fragment_codes`.

use std::collections::HashMap;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

use axial_core::Fragment;

use super::{placeholders, text_values};
use crate::pool::{DbPool, DbResult};

/// Store a fragment. Fragments are immutable; re-inserting an id is a no-op.
pub fn insert_fragment(pool: &DbPool, fragment: &Fragment) -> DbResult<()> {
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO fragments
                (id, project_id, source_document, sequence_index, speaker_role, excerpt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                fragment.id,
                fragment.project_id,
                fragment.source_document,
                fragment.sequence_index,
                fragment.speaker_role,
                fragment.excerpt,
            ],
        )?;
        Ok(())
    })
}

/// Record that a fragment was coded with `code`.
pub fn code_fragment(pool: &DbPool, project_id: &str, fragment_id: &str, code: &str) -> DbResult<()> {
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO fragment_codes (project_id, fragment_id, code_name)
             SELECT ?1, id, ?3 FROM fragments WHERE id = ?2 AND project_id = ?1",
            params![project_id, fragment_id, code],
        )?;
        Ok(())
    })
}

/// Every `(fragment_id, code_name)` pair of a project, ordered.
pub fn fragment_codings(pool: &DbPool, project_id: &str) -> DbResult<Vec<(String, String)>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT fragment_id, code_name FROM fragment_codes
             WHERE project_id = ?1 ORDER BY fragment_id, code_name",
        )?;
        let rows = stmt.query_map(params![project_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    })
}

/// Load fragments by id, in the order the ids were given. Unknown ids are skipped.
pub fn get_fragments(pool: &DbPool, project_id: &str, ids: &[String]) -> DbResult<Vec<Fragment>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, project_id, source_document, sequence_index, speaker_role, excerpt
         FROM fragments WHERE project_id = ? AND id IN ({})",
        placeholders(ids.len())
    );

    let mut by_id: HashMap<String, Fragment> = pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let values = std::iter::once(Value::Text(project_id.to_string())).chain(text_values(ids));
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(Fragment {
                id: row.get(0)?,
                project_id: row.get(1)?,
                source_document: row.get(2)?,
                sequence_index: row.get(3)?,
                speaker_role: row.get(4)?,
                excerpt: row.get(5)?,
            })
        })?;
        let mut map = HashMap::new();
        for fragment in rows {
            let fragment = fragment?;
            map.insert(fragment.id.clone(), fragment);
        }
        Ok(map)
    })?;

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Fragments coded with any of `codes`, ordered by id.
pub fn fragments_with_code(pool: &DbPool, project_id: &str, codes: &[String], limit: usize) -> DbResult<Vec<String>> {
    if codes.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT DISTINCT fragment_id FROM fragment_codes
         WHERE project_id = ? AND code_name IN ({})
         ORDER BY fragment_id LIMIT ?",
        placeholders(codes.len())
    );

    let values: Vec<Value> = std::iter::once(Value::Text(project_id.to_string()))
        .chain(text_values(codes))
        .chain(std::iter::once(Value::Integer(limit as i64)))
        .collect();

    query_ids(pool, &sql, values)
}

/// Fragments coded with one of `left` and one of `right`, ordered by id.
pub fn cooccurrence_fragments(
    pool: &DbPool,
    project_id: &str,
    left: &[String],
    right: &[String],
    limit: usize,
) -> DbResult<Vec<String>> {
    if left.is_empty() || right.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT DISTINCT l.fragment_id
         FROM fragment_codes l
         JOIN fragment_codes r ON r.project_id = l.project_id AND r.fragment_id = l.fragment_id
         WHERE l.project_id = ? AND l.code_name IN ({}) AND r.code_name IN ({})
         ORDER BY l.fragment_id LIMIT ?",
        placeholders(left.len()),
        placeholders(right.len())
    );

    let values: Vec<Value> = std::iter::once(Value::Text(project_id.to_string()))
        .chain(text_values(left))
        .chain(text_values(right))
        .chain(std::iter::once(Value::Integer(limit as i64)))
        .collect();

    query_ids(pool, &sql, values)
}

/// Fragments coded with one of `present` and with none of `absent`, ordered by id.
pub fn contrast_fragments(
    pool: &DbPool,
    project_id: &str,
    present: &[String],
    absent: &[String],
    limit: usize,
) -> DbResult<Vec<String>> {
    if present.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    if absent.is_empty() {
        return fragments_with_code(pool, project_id, present, limit);
    }

    let sql = format!(
        "SELECT DISTINCT p.fragment_id
         FROM fragment_codes p
         WHERE p.project_id = ? AND p.code_name IN ({})
           AND NOT EXISTS (
               SELECT 1 FROM fragment_codes x
               WHERE x.project_id = p.project_id AND x.fragment_id = p.fragment_id
                 AND x.code_name IN ({})
           )
         ORDER BY p.fragment_id LIMIT ?",
        placeholders(present.len()),
        placeholders(absent.len())
    );

    let values: Vec<Value> = std::iter::once(Value::Text(project_id.to_string()))
        .chain(text_values(present))
        .chain(text_values(absent))
        .chain(std::iter::once(Value::Integer(limit as i64)))
        .collect();

    query_ids(pool, &sql, values)
}

fn query_ids(pool: &DbPool, sql: &str, values: Vec<Value>) -> DbResult<Vec<String>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_in_memory;

    fn seed(pool: &DbPool) {
        let rows = [
            ("f1", "interviewee", vec!["stress", "overtime"]),
            ("f2", "interviewee", vec!["stress", "overtime_hours"]),
            ("f3", "interviewer", vec!["stress"]),
            ("f4", "interviewee", vec!["overtime"]),
        ];
        for (i, (id, role, codes)) in rows.iter().enumerate() {
            insert_fragment(
                pool,
                &Fragment {
                    id: id.to_string(),
                    project_id: "p1".to_string(),
                    source_document: "doc-a".to_string(),
                    sequence_index: i as i64,
                    speaker_role: Some(role.to_string()),
                    excerpt: format!("excerpt {}", id),
                },
            )
            .unwrap();
            for code in codes {
                code_fragment(pool, "p1", id, code).unwrap();
            }
        }
    }

    fn s(items: &[&str]) -> Vec<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_get_fragments_keeps_requested_order() {
        let pool = init_in_memory().unwrap();
        seed(&pool);
        let found = get_fragments(&pool, "p1", &s(&["f3", "missing", "f1"])).unwrap();
        let ids: Vec<&str> = found.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f3", "f1"]);
        assert!(get_fragments(&pool, "p2", &s(&["f1"])).unwrap().is_empty());
    }

    #[test]
    fn test_cooccurrence_across_aliases() {
        let pool = init_in_memory().unwrap();
        seed(&pool);
        let ids = cooccurrence_fragments(&pool, "p1", &s(&["stress"]), &s(&["overtime", "overtime_hours"]), 10).unwrap();
        assert_eq!(ids, vec!["f1", "f2"]);
        let limited = cooccurrence_fragments(&pool, "p1", &s(&["stress"]), &s(&["overtime"]), 10).unwrap();
        assert_eq!(limited, vec!["f1"]);
    }

    #[test]
    fn test_contrast_fragments() {
        let pool = init_in_memory().unwrap();
        seed(&pool);
        let ids = contrast_fragments(&pool, "p1", &s(&["stress"]), &s(&["overtime", "overtime_hours"]), 10).unwrap();
        assert_eq!(ids, vec!["f3"]);
        let ids = contrast_fragments(&pool, "p1", &s(&["overtime"]), &s(&["stress"]), 10).unwrap();
        assert_eq!(ids, vec!["f4"]);
    }

    #[test]
    fn test_coding_requires_fragment_in_project() {
        let pool = init_in_memory().unwrap();
        seed(&pool);
        code_fragment(&pool, "p2", "f1", "stress").unwrap();
        assert!(fragment_codings(&pool, "p2").unwrap().is_empty());
        assert_eq!(fragment_codings(&pool, "p1").unwrap().len(), 6);
        assert_eq!(fragments_with_code(&pool, "p1", &s(&["overtime"]), 1).unwrap(), vec!["f1"]);
    }
}
