//! Engine configuration.
//!
//! Every section has defaults, so an empty TOML document is a valid config.
//! A few settings can be overridden from the environment.

use std::path::Path;

use serde::Deserialize;

use crate::algorithm::Tier;
use crate::error::{AxialError, AxialResult};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub probe: ProbeConfig,
    pub algorithms: AlgorithmConfig,
    pub discovery: DiscoveryConfig,
    pub evidence: EvidenceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Seconds a capability probe result stays valid. `0` disables caching.
    pub cache_ttl_secs: u64,
    /// Skip probing and use this tier.
    pub force_tier: Option<Tier>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30,
            force_tier: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub persist_batch_size: usize,
    pub louvain_max_levels: usize,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
            persist_batch_size: 1000,
            louvain_max_levels: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Fragments two codes must share before co-occurrence counts.
    pub min_cooccurrence: usize,
    /// Fragment ids kept on each co-occurrence suggestion.
    pub evidence_sample: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_cooccurrence: 2,
            evidence_sample: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    pub positive_cap: usize,
    pub negative_cap: usize,
    pub positive_floor: usize,
    pub negative_floor: usize,
    pub excerpt_chars: usize,
    pub subject_roles: Vec<String>,
    pub semantic_top_k: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            positive_cap: 6,
            negative_cap: 4,
            positive_floor: 2,
            negative_floor: 1,
            excerpt_chars: 280,
            subject_roles: vec![
                "interviewee".to_string(),
                "participant".to_string(),
                "subject".to_string(),
            ],
            semantic_top_k: 8,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> AxialResult<Self> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> AxialResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `AXIAL_FORCE_TIER`, `AXIAL_PROBE_TTL_SECS` and `AXIAL_EXCERPT_CHARS`.
    pub fn apply_env(&mut self) -> AxialResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> AxialResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tier) = lookup("AXIAL_FORCE_TIER") {
            self.probe.force_tier = Some(tier.parse()?);
        }
        if let Some(ttl) = lookup("AXIAL_PROBE_TTL_SECS") {
            self.probe.cache_ttl_secs = ttl
                .parse()
                .map_err(|_| AxialError::Config(format!("AXIAL_PROBE_TTL_SECS is not a number: {}", ttl)))?;
        }
        if let Some(chars) = lookup("AXIAL_EXCERPT_CHARS") {
            self.evidence.excerpt_chars = chars
                .parse()
                .map_err(|_| AxialError::Config(format!("AXIAL_EXCERPT_CHARS is not a number: {}", chars)))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> AxialResult<()> {
        let a = &self.algorithms;
        if !(a.damping > 0.0 && a.damping < 1.0) {
            return Err(AxialError::Config(format!("damping must be in (0, 1), got {}", a.damping)));
        }
        if a.tolerance <= 0.0 {
            return Err(AxialError::Config("tolerance must be positive".to_string()));
        }
        if a.persist_batch_size == 0 {
            return Err(AxialError::Config("persist_batch_size must be at least 1".to_string()));
        }
        if self.evidence.positive_cap == 0 && self.evidence.negative_cap == 0 {
            return Err(AxialError::Config("evidence caps cannot both be zero".to_string()));
        }
        if self.discovery.min_cooccurrence == 0 {
            return Err(AxialError::Config("min_cooccurrence must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.evidence.positive_cap, 6);
        assert_eq!(config.evidence.negative_cap, 4);
        assert_eq!(config.algorithms.persist_batch_size, 1000);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [probe]
            force_tier = "in_process"

            [evidence]
            positive_cap = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.probe.force_tier, Some(Tier::InProcess));
        assert_eq!(config.probe.cache_ttl_secs, 30);
        assert_eq!(config.evidence.positive_cap, 3);
        assert_eq!(config.evidence.negative_cap, 4);
    }

    #[test]
    fn test_invalid_damping_rejected() {
        let err = EngineConfig::from_toml_str("[algorithms]\ndamping = 1.5").unwrap_err();
        assert!(matches!(err, AxialError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            [("AXIAL_FORCE_TIER", "mage"), ("AXIAL_EXCERPT_CHARS", "120")].into_iter().collect();
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.probe.force_tier, Some(Tier::Mage));
        assert_eq!(config.evidence.excerpt_chars, 120);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(|k| (k == "AXIAL_PROBE_TTL_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, AxialError::Config(_)));
    }
}
