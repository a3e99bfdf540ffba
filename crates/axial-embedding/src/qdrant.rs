//! Qdrant collection of fragment vectors.
//!
//! One collection holds every project's fragments; searches are always
//! filtered on the `project_id` payload field.

use std::collections::HashMap;

use anyhow::{Context, Result};
use axial_core::{Fragment, FragmentHit};
use chrono::Utc;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    Filter, PointId, PointStruct, PointsIdsList, SearchPointsBuilder, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EmbeddingConfig;

/// Excerpt length stored in the payload.
const PAYLOAD_EXCERPT_CHARS: usize = 500;

#[derive(Clone)]
pub struct FragmentIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl FragmentIndex {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .context("Failed to create Qdrant client")?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            dimension: config.dimension,
        })
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .context("Failed to check collection")?;

        if exists {
            debug!(collection = %self.collection, "Collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine)),
            )
            .await
            .context("Failed to create collection")?;

        info!(collection = %self.collection, dimension = self.dimension, "Created Qdrant collection");
        Ok(())
    }

    pub async fn upsert_fragment(&self, fragment: &Fragment, vector: Vec<f32>) -> Result<()> {
        let point = PointStruct::new(
            point_id(&fragment.project_id, &fragment.id),
            vector,
            fragment_payload(fragment),
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .context("Failed to upsert fragment vector")?;

        debug!(fragment = %fragment.id, "Upserted fragment vector");
        Ok(())
    }

    /// Nearest fragments of one project.
    pub async fn search(&self, project_id: &str, vector: Vec<f32>, top_k: u64) -> Result<Vec<FragmentHit>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, top_k)
                    .with_payload(true)
                    .filter(Filter::must([Condition::matches("project_id", project_id.to_string())])),
            )
            .await
            .context("Failed to search fragment vectors")?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| payload_to_hit(&point.payload, point.score))
            .collect())
    }

    pub async fn delete_fragment(&self, project_id: &str, fragment_id: &str) -> Result<()> {
        let ids = PointsIdsList {
            ids: vec![PointId {
                point_id_options: Some(PointIdOptions::Uuid(point_id(project_id, fragment_id))),
            }],
        };

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(ids))
            .await
            .context("Failed to delete fragment vector")?;

        debug!(fragment = fragment_id, "Deleted fragment vector");
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .context("Failed to get collection info")?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }
}

/// Stable point id for a fragment, scoped by project.
fn point_id(project_id: &str, fragment_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}:{}", project_id, fragment_id).as_bytes()).to_string()
}

fn text_value(s: &str) -> Value {
    Value {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

fn fragment_payload(fragment: &Fragment) -> HashMap<String, Value> {
    let excerpt: String = fragment.excerpt.chars().take(PAYLOAD_EXCERPT_CHARS).collect();
    let mut payload = HashMap::new();
    payload.insert("project_id".to_string(), text_value(&fragment.project_id));
    payload.insert("fragment_id".to_string(), text_value(&fragment.id));
    payload.insert("source_document".to_string(), text_value(&fragment.source_document));
    payload.insert(
        "sequence_index".to_string(),
        Value {
            kind: Some(Kind::IntegerValue(fragment.sequence_index)),
        },
    );
    if let Some(role) = &fragment.speaker_role {
        payload.insert("speaker_role".to_string(), text_value(role));
    }
    payload.insert("excerpt".to_string(), text_value(&excerpt));
    payload.insert("indexed_at".to_string(), text_value(&Utc::now().to_rfc3339()));
    payload
}

fn payload_text(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Payloads without a fragment id are not ours and are skipped.
fn payload_to_hit(payload: &HashMap<String, Value>, score: f32) -> Option<FragmentHit> {
    Some(FragmentHit {
        fragment_id: payload_text(payload, "fragment_id")?,
        score,
        source_document: payload_text(payload, "source_document"),
        speaker_role: payload_text(payload, "speaker_role"),
        excerpt: payload_text(payload, "excerpt"),
    })
}
