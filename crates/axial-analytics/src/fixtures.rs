//! Shared test data: a small coded interview study.
//!
//! Categories `relationships {trust, care}` and `emotions {fear, hope}`;
//! `faith` is merged into `trust`. Fragment coding:
//!
//! | fragment | codes        | speaker     |
//! |----------|--------------|-------------|
//! | f1       | trust, care  | participant |
//! | f2       | faith, care  | interviewee |
//! | f3       | fear, hope   | participant |
//! | f4       | fear, trust  | interviewer |
//! | f5       | hope         | participant |
//! | f6       | care, hope   | (none)      |
//! | f7       | fear, hope   | participant |
//! | f8       | care, hope   | participant |
//!
//! One explicit relation: `trust -> fear` (causal).

use axial_core::{Edge, Fragment, RelationType};
use axial_db::queries::{assignments, codes, fragments, relations};
use axial_db::DbPool;

pub const PROJECT: &str = "study-1";

pub fn fragment(id: &str, role: Option<&str>, excerpt: &str) -> Fragment {
    Fragment {
        id: id.to_string(),
        project_id: PROJECT.to_string(),
        source_document: "interview-01".to_string(),
        sequence_index: id.trim_start_matches('f').parse().unwrap_or(0),
        speaker_role: role.map(str::to_string),
        excerpt: excerpt.to_string(),
    }
}

pub fn seeded_db() -> DbPool {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let db = axial_db::init_in_memory().unwrap();

    for code in ["trust", "faith", "care", "fear", "hope"] {
        codes::insert_code(&db, PROJECT, code).unwrap();
    }
    codes::merge_code(&db, PROJECT, "faith", "trust").unwrap();

    for category in ["relationships", "emotions"] {
        codes::insert_category(&db, PROJECT, category).unwrap();
    }
    for (category, code) in [
        ("relationships", "trust"),
        ("relationships", "faith"),
        ("relationships", "care"),
        ("emotions", "fear"),
        ("emotions", "hope"),
    ] {
        assignments::assign_code(&db, PROJECT, category, code).unwrap();
    }

    let coded: [(&str, Option<&str>, &str, &[&str]); 8] = [
        ("f1", Some("participant"), "I trust the nurses because they care about me", &["trust", "care"]),
        ("f2", Some("interviewee"), "Having faith in them made the care feel real", &["faith", "care"]),
        ("f3", Some("participant"), "I was afraid but still hoped it would pass", &["fear", "hope"]),
        ("f4", Some("interviewer"), "So fear made it hard to trust them?", &["fear", "trust"]),
        ("f5", Some("participant"), "Some days hope is all there is", &["hope"]),
        ("f6", None, "Being looked after gave me hope", &["care", "hope"]),
        ("f7", Some("participant"), "The fear never left, but neither did the hope", &["fear", "hope"]),
        ("f8", Some("participant"), "Their care is why I am hopeful", &["care", "hope"]),
    ];
    for (id, role, text, coded_as) in coded {
        fragments::insert_fragment(&db, &fragment(id, role, text)).unwrap();
        for code in coded_as {
            fragments::code_fragment(&db, PROJECT, id, code).unwrap();
        }
    }

    relations::insert_relation(
        &db,
        &Edge {
            project_id: PROJECT.to_string(),
            source_id: "code:trust".to_string(),
            target_id: "code:fear".to_string(),
            relation_type: RelationType::Causal,
            evidence: vec!["f4".to_string()],
            memo: None,
        },
    )
    .unwrap();

    db
}
