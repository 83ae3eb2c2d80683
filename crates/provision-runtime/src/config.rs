//! Datasource configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::DatasourceError;

/// Environment variable selecting the carryover mode (`none` | `combine`)
pub const ENV_COMBINE_PREVIOUS: &str = "PROVISION_COMBINE_PREVIOUS";
/// Environment variable for the carryover preference (`true` | `false`)
pub const ENV_PREFER_FALLBACK_VALUE: &str = "PROVISION_PREFER_FALLBACK_VALUE";
/// Environment variable selecting the persist policy (`all` | `results`)
pub const ENV_PERSIST_POLICY: &str = "PROVISION_PERSIST_POLICY";

/// Whether emitted states go through the carryover engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum CombinePreviousMode {
    /// States are emitted as reconciled, without fallbacks from the past.
    None,
    /// States are smoothed by the carryover engine.
    #[serde(rename_all = "camelCase")]
    Combine {
        /// On a loading state, carry the last value rather than the last
        /// error when both are remembered.
        prefer_fallback_value_over_fallback_error: bool,
    },
}

impl CombinePreviousMode {
    /// The preference flag, if carryover is enabled.
    pub fn preference(&self) -> Option<bool> {
        match self {
            Self::None => None,
            Self::Combine {
                prefer_fallback_value_over_fallback_error,
            } => Some(*prefer_fallback_value_over_fallback_error),
        }
    }
}

impl Default for CombinePreviousMode {
    fn default() -> Self {
        Self::Combine {
            prefer_fallback_value_over_fallback_error: true,
        }
    }
}

/// Which upstream states are handed to the cache persister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistPolicy {
    /// Every upstream state, loading and not-ready included.
    #[default]
    AllStates,
    /// Only `Result` states.
    ResultsOnly,
}

/// Configuration for a datasource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasourceConfig {
    /// Carryover of previous values and errors.
    pub combine_previous: CombinePreviousMode,
    /// What the cache persister receives.
    pub persist_policy: PersistPolicy,
}

impl DatasourceConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, DatasourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatasourceError::config(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DatasourceError::config(format!("Invalid JSON: {}", e)))?;

        Ok(config)
    }

    /// Merge with `PROVISION_*` environment variables.
    pub fn merge_with_env(&mut self) -> Result<(), DatasourceError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with `(name, value)` pairs using the environment variable names.
    /// Unrelated names are ignored. A preference given while carryover ends
    /// up disabled is rejected.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<(), DatasourceError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut mode = None;
        let mut prefer = None;

        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                ENV_COMBINE_PREVIOUS => mode = Some(value.to_ascii_lowercase()),
                ENV_PREFER_FALLBACK_VALUE => prefer = Some(parse_bool(ENV_PREFER_FALLBACK_VALUE, value)?),
                ENV_PERSIST_POLICY => self.set_from_string("persistPolicy", value)?,
                _ => {}
            }
        }

        // The preference applies whether the mode was set in this merge or earlier
        if let Some(mode) = mode {
            self.set_from_string("combinePrevious", &mode)?;
        }
        if let Some(prefer) = prefer {
            match &mut self.combine_previous {
                CombinePreviousMode::Combine {
                    prefer_fallback_value_over_fallback_error,
                } => *prefer_fallback_value_over_fallback_error = prefer,
                CombinePreviousMode::None => {
                    return Err(DatasourceError::config(format!(
                        "{} is set but carryover is disabled",
                        ENV_PREFER_FALLBACK_VALUE
                    )))
                }
            }
        }

        Ok(())
    }

    /// Set a single value by key.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), DatasourceError> {
        match key {
            "combinePrevious" => {
                self.combine_previous = match value.to_ascii_lowercase().as_str() {
                    "none" => CombinePreviousMode::None,
                    "combine" => match self.combine_previous {
                        CombinePreviousMode::None => CombinePreviousMode::default(),
                        keep @ CombinePreviousMode::Combine { .. } => keep,
                    },
                    other => {
                        return Err(DatasourceError::config(format!(
                            "Unknown combine previous mode: {}",
                            other
                        )))
                    }
                };
            }
            "persistPolicy" => {
                self.persist_policy = match value.to_ascii_lowercase().as_str() {
                    "all" | "allstates" => PersistPolicy::AllStates,
                    "results" | "resultsonly" => PersistPolicy::ResultsOnly,
                    other => {
                        return Err(DatasourceError::config(format!(
                            "Unknown persist policy: {}",
                            other
                        )))
                    }
                };
            }
            other => {
                return Err(DatasourceError::config(format!("Unknown config key: {}", other)));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DatasourceError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(DatasourceError::config(format!(
            "{} must be true or false, got {}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults() {
        let config = DatasourceConfig::default();
        assert_eq!(config.combine_previous.preference(), Some(true));
        assert_eq!(config.persist_policy, PersistPolicy::AllStates);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"combinePrevious":{"mode":"combine","preferFallbackValueOverFallbackError":false},"persistPolicy":"resultsOnly"}"#;
        let config: DatasourceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.combine_previous.preference(), Some(false));
        assert_eq!(config.persist_policy, PersistPolicy::ResultsOnly);

        let partial: DatasourceConfig = serde_json::from_str(r#"{"combinePrevious":{"mode":"none"}}"#).unwrap();
        assert_eq!(partial.combine_previous, CombinePreviousMode::None);
        assert_eq!(partial.persist_policy, PersistPolicy::AllStates);
    }

    #[test]
    fn test_merge_with_vars() {
        let mut config = DatasourceConfig::default();
        config
            .merge_with_vars([
                (ENV_PREFER_FALLBACK_VALUE, "false"),
                (ENV_PERSIST_POLICY, "results"),
                ("UNRELATED", "x"),
            ])
            .unwrap();
        assert_eq!(config.combine_previous.preference(), Some(false));
        assert_eq!(config.persist_policy, PersistPolicy::ResultsOnly);

        config.merge_with_vars([(ENV_COMBINE_PREVIOUS, "none")]).unwrap();
        assert_eq!(config.combine_previous, CombinePreviousMode::None);
    }

    #[test]
    fn test_merge_rejects_bad_values() {
        let mut config = DatasourceConfig::default();
        assert_matches!(
            config.merge_with_vars([(ENV_COMBINE_PREVIOUS, "sometimes")]),
            Err(DatasourceError::Config { .. })
        );
        assert_matches!(
            config.merge_with_vars([(ENV_PREFER_FALLBACK_VALUE, "maybe")]),
            Err(DatasourceError::Config { .. })
        );
        assert_matches!(
            config.set_from_string("retries", "3"),
            Err(DatasourceError::Config { .. })
        );
    }

    #[test]
    fn test_merge_rejects_preference_without_carryover() {
        let mut config = DatasourceConfig::default();
        assert_matches!(
            config.merge_with_vars([
                (ENV_COMBINE_PREVIOUS, "none"),
                (ENV_PREFER_FALLBACK_VALUE, "false"),
            ]),
            Err(DatasourceError::Config { message }) if message.contains(ENV_PREFER_FALLBACK_VALUE)
        );

        let mut disabled = DatasourceConfig {
            combine_previous: CombinePreviousMode::None,
            ..DatasourceConfig::default()
        };
        assert!(disabled
            .merge_with_vars([(ENV_PREFER_FALLBACK_VALUE, "true")])
            .is_err());

        // Re-enabling in the same merge makes the preference meaningful again
        disabled
            .merge_with_vars([
                (ENV_PREFER_FALLBACK_VALUE, "false"),
                (ENV_COMBINE_PREVIOUS, "combine"),
            ])
            .unwrap();
        assert_eq!(disabled.combine_previous.preference(), Some(false));
    }
}
