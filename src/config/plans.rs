//! Plan-to-level mapping configuration.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::PlanLevelMap;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct PlansConfig {
    /// Comma-separated `plan_id:level` pairs, e.g.
    /// `plf1e685f0478b0770faf2:1,plpremium:2`.
    #[serde(default)]
    pub level_map: String,
    /// Level granted when the plan is unknown or could not be resolved.
    #[serde(default = "default_fallback_level")]
    pub fallback_level: u32,
}

fn default_fallback_level() -> u32 {
    1
}

impl Default for PlansConfig {
    fn default() -> Self {
        PlansConfig {
            level_map: String::new(),
            fallback_level: default_fallback_level(),
        }
    }
}

impl PlansConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_plan_map().map(|_| ())
    }

    pub fn to_plan_map(&self) -> Result<PlanLevelMap, ConfigError> {
        if self.fallback_level == 0 {
            return Err(ConfigError::Validation(
                "plans.fallback_level must be positive".to_string(),
            ));
        }
        let mut map = HashMap::new();
        for entry in self
            .level_map
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
        {
            let Some((plan, level)) = entry.split_once(':') else {
                return Err(ConfigError::Validation(format!(
                    "plans.level_map entry `{entry}` is not `plan:level`"
                )));
            };
            let level: u32 = level.trim().parse().map_err(|_| {
                ConfigError::Validation(format!(
                    "plans.level_map entry `{entry}` has a non-numeric level"
                ))
            })?;
            map.insert(plan.trim().to_string(), level);
        }
        Ok(PlanLevelMap::new(map, self.fallback_level))
    }
}
