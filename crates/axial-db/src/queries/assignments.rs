//! Category to code assignments.

use rusqlite::params;

use crate::pool::{DbPool, DbResult};

/// Place a code under a category.
pub fn assign_code(pool: &DbPool, project_id: &str, category: &str, code: &str) -> DbResult<()> {
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO code_assignments (project_id, category_name, code_name)
             VALUES (?1, ?2, ?3)",
            params![project_id, category, code],
        )?;
        Ok(())
    })
}

/// `(category, code)` pairs of a project, ordered.
pub fn list_assignments(pool: &DbPool, project_id: &str) -> DbResult<Vec<(String, String)>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT category_name, code_name FROM code_assignments
             WHERE project_id = ?1 ORDER BY category_name, code_name",
        )?;
        let rows = stmt.query_map(params![project_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_in_memory;

    #[test]
    fn test_assignments_scoped_and_deduplicated() {
        let pool = init_in_memory().unwrap();
        assign_code(&pool, "p1", "Work", "stress").unwrap();
        assign_code(&pool, "p1", "Work", "stress").unwrap();
        assign_code(&pool, "p1", "Family", "care").unwrap();
        assign_code(&pool, "p2", "Work", "overtime").unwrap();

        let rows = list_assignments(&pool, "p1").unwrap();
        assert_eq!(
            rows,
            vec![
                ("Family".to_string(), "care".to_string()),
                ("Work".to_string(), "stress".to_string()),
            ]
        );
    }
}
