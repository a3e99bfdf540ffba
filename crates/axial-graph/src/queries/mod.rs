//! Native read queries used by extraction, discovery and evidence lookup.

pub mod discovery;
pub mod evidence;
pub mod extract;

/// Tenant filter shared by queries that walk coding-graph relations.
pub(crate) const RELATION_SCOPE: &str = "s.project_id = $project_id AND t.project_id = $project_id
         AND (s:Category OR s:Code) AND (t:Category OR t:Code)";
