//! Mapping from gateway plan identifiers to local membership levels.

use std::collections::HashMap;

/// Static plan→level mapping with a configured fallback.
///
/// Unmapped (or unresolvable) plans fall back to the configured default
/// level. This is a deliberate fail-open policy: a member who paid gets the
/// baseline level rather than nothing while the operator adds the mapping.
#[derive(Debug, Clone)]
pub struct PlanLevelMap {
    map: HashMap<String, u32>,
    fallback_level: u32,
}

impl PlanLevelMap {
    pub fn new(map: HashMap<String, u32>, fallback_level: u32) -> Self {
        PlanLevelMap {
            map,
            fallback_level,
        }
    }

    /// The level for a resolved plan id; the fallback when the plan is
    /// unknown or was never resolved.
    pub fn level_for(&self, plan_id: Option<&str>) -> u32 {
        match plan_id.and_then(|p| self.map.get(p)) {
            Some(&level) => level,
            None => {
                if let Some(plan) = plan_id {
                    tracing::warn!(plan_id = plan, fallback = self.fallback_level,
                        "unmapped gateway plan, using fallback level");
                }
                self.fallback_level
            }
        }
    }

    pub fn fallback_level(&self) -> u32 {
        self.fallback_level
    }
}

impl Default for PlanLevelMap {
    fn default() -> Self {
        PlanLevelMap::new(HashMap::new(), 1)
    }
}
