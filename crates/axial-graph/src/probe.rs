//! Capability probing for the native analytics extensions.
//!
//! Each native tier is probed independently with a cheap call. A probe that
//! errors means the tier is unavailable, never that the operation fails.
//! Results are cached for a short TTL per engine.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use axial_core::config::ProbeConfig;
use axial_core::Tier;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::session::{Column, CypherQuery, GraphSession};

pub const GDS_PROBE: &str = "probe.gds";
pub const MAGE_PROBE: &str = "probe.mage";

/// Outcome of a capability probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityReport {
    /// Usable tiers, best first. Always ends with `Tier::InProcess`.
    pub tiers: Vec<Tier>,
    pub gds_version: Option<String>,
    pub mage_procedures: usize,
    /// Set when the chain came from configuration instead of probing.
    pub forced: bool,
}

impl CapabilityReport {
    pub fn in_process_only() -> Self {
        Self {
            tiers: vec![Tier::InProcess],
            gds_version: None,
            mage_procedures: 0,
            forced: false,
        }
    }

    /// Chain pinned to `tier`, with the in-process tier kept as the floor.
    pub fn forced(tier: Tier) -> Self {
        let mut tiers = vec![tier];
        if tier != Tier::InProcess {
            tiers.push(Tier::InProcess);
        }
        Self {
            tiers,
            gds_version: None,
            mage_procedures: 0,
            forced: true,
        }
    }

    /// Best usable tier.
    pub fn tier(&self) -> Tier {
        self.tiers.first().copied().unwrap_or(Tier::InProcess)
    }

    pub fn has(&self, tier: Tier) -> bool {
        self.tiers.contains(&tier)
    }
}

/// Probe both native tiers against a session.
pub async fn probe(session: &dyn GraphSession) -> CapabilityReport {
    let mut report = CapabilityReport::in_process_only();

    let gds = CypherQuery::new(GDS_PROBE, "RETURN gds.version() AS version").column("version", Column::Text);
    match session.query(gds).await {
        Ok(rows) => {
            let version = rows.first().map(|r| r.text("version")).filter(|v| !v.is_empty());
            if version.is_some() {
                report.gds_version = version;
                report.tiers.insert(0, Tier::Gds);
            }
        }
        Err(e) => debug!(error = %e, "GDS probe failed"),
    }

    let mage = CypherQuery::new(
        MAGE_PROBE,
        "CALL mg.procedures() YIELD name
         WITH name
         WHERE name STARTS WITH 'community_detection.'
            OR name STARTS WITH 'pagerank.'
            OR name STARTS WITH 'betweenness_centrality.'
         RETURN count(name) AS procedures",
    )
    .column("procedures", Column::Int);
    match session.query(mage).await {
        Ok(rows) => {
            let procedures = rows.first().and_then(|r| r.int("procedures")).unwrap_or(0);
            if procedures > 0 {
                report.mage_procedures = procedures as usize;
                let at = report.tiers.len() - 1;
                report.tiers.insert(at, Tier::Mage);
            }
        }
        Err(e) => debug!(error = %e, "MAGE probe failed"),
    }

    info!(
        tiers = ?report.tiers,
        gds_version = report.gds_version.as_deref().unwrap_or("-"),
        mage_procedures = report.mage_procedures,
        "Capability probe complete"
    );
    report
}

/// Short-lived cache of the last probe result.
#[derive(Debug)]
pub struct ProbeCache {
    ttl: Duration,
    force_tier: RwLock<Option<Tier>>,
    entry: RwLock<Option<(Instant, CapabilityReport)>>,
}

impl ProbeCache {
    pub fn new(ttl: Duration, force_tier: Option<Tier>) -> Self {
        Self {
            ttl,
            force_tier: RwLock::new(force_tier),
            entry: RwLock::new(None),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(Duration::from_secs(config.cache_ttl_secs), config.force_tier)
    }

    /// Pin or unpin the tier, bypassing probes.
    pub fn set_force_tier(&self, tier: Option<Tier>) {
        match self.force_tier.write() {
            Ok(mut guard) => *guard = tier,
            Err(_) => warn!("Probe cache lock poisoned, force tier not updated"),
        }
        self.invalidate();
    }

    pub fn invalidate(&self) {
        if let Ok(mut entry) = self.entry.write() {
            *entry = None;
        }
    }

    /// Report for this call: forced, cached, or freshly probed.
    ///
    /// Without a session only the in-process tier exists; that answer is not
    /// cached since the next caller may lend a session.
    pub async fn detect(&self, session: Option<&dyn GraphSession>) -> CapabilityReport {
        if let Some(tier) = self.force_tier.read().ok().and_then(|t| *t) {
            return CapabilityReport::forced(tier);
        }
        let Some(session) = session else {
            return CapabilityReport::in_process_only();
        };

        if let Some(report) = self.cached() {
            debug!(tier = %report.tier(), "Using cached capability probe");
            return report;
        }

        let report = probe(session).await;
        if !self.ttl.is_zero() {
            if let Ok(mut entry) = self.entry.write() {
                *entry = Some((Instant::now(), report.clone()));
            }
        }
        report
    }

    fn cached(&self) -> Option<CapabilityReport> {
        if self.ttl.is_zero() {
            return None;
        }
        let entry = self.entry.read().ok()?;
        entry
            .as_ref()
            .filter(|(at, _)| at.elapsed() < self.ttl)
            .map(|(_, report)| report.clone())
    }
}
