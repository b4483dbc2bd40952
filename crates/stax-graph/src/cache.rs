//! Compiled plan cache
//!
//! Plans are compiled once per shape. Literal values travel separately as
//! runtime parameters, so `age in [25, 25]` and `age in [30, 40]` share a
//! compiled plan. Entries live as long as the owning graph handle.

use crate::engine::Engine;
use stax_core::{Error, PlanId, Result};
use stax_query::{PlanSignature, QueryPlan};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Signature to compiled plan id mapping
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: RwLock<HashMap<PlanSignature, PlanId>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled id for `plan`, compiling it on a miss.
    ///
    /// Two callers racing on a new shape may both compile it; both store
    /// the same mapping.
    pub fn get_or_compile(&self, engine: &dyn Engine, plan: &QueryPlan) -> Result<PlanId> {
        let signature = plan.signature();

        if let Some(id) = self.lookup(&signature)? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(signature = signature.digest(), plan_id = %id, "Plan cache hit");
            return Ok(id);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let raw = engine.compile_query(plan)?;
        let id = PlanId::from_raw(raw).ok_or_else(|| {
            warn!(signature = signature.digest(), raw, "Engine rejected query plan");
            Error::Compilation(format!("engine returned invalid plan id {}", raw))
        })?;

        debug!(signature = signature.digest(), plan_id = %id, steps = plan.len(), "Compiled query plan");

        let mut plans = self
            .plans
            .write()
            .map_err(|_| Error::Internal("Failed to acquire plan cache lock".to_string()))?;
        plans.insert(signature, id);
        Ok(id)
    }

    fn lookup(&self, signature: &PlanSignature) -> Result<Option<PlanId>> {
        let plans = self
            .plans
            .read()
            .map_err(|_| Error::Internal("Failed to acquire plan cache lock".to_string()))?;
        Ok(plans.get(signature).copied())
    }

    /// Number of distinct shapes compiled
    pub fn len(&self) -> usize {
        self.plans.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
