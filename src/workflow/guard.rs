use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Per-module mutual exclusion for run requests.
#[derive(Debug, Clone, Default)]
pub struct InFlightRuns {
    runs: Arc<DashMap<String, Instant>>,
}

impl InFlightRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `module_id`, or `None` if a run is already in flight for it.
    /// The claim is released when the guard drops.
    pub fn try_acquire(&self, module_id: &str) -> Option<RunGuard> {
        match self.runs.entry(module_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Some(RunGuard { runs: self.runs.clone(), module_id: module_id.to_string() })
            }
        }
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.runs.contains_key(module_id)
    }
}

#[derive(Debug)]
pub struct RunGuard {
    runs: Arc<DashMap<String, Instant>>,
    module_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.runs.remove(&self.module_id);
    }
}
