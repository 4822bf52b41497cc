use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use settlement_circuit::MAX_INTENTS;

use crate::error::{OperatorError, OperatorResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Seed the per-circuit aggregation proving keys are derived from.
    pub setup_seed: [u8; 32],
    /// Seed of the owner's ML-DSA attestation key.
    pub owner_seed: [u8; 32],
    pub max_intents_per_settlement: usize,
    /// Proving jobs allowed to run at once.
    pub proving_workers: usize,
}

impl OperatorConfig {
    pub fn load(path: impl AsRef<Path>) -> OperatorResult<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> OperatorResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> OperatorResult<()> {
        if self.max_intents_per_settlement == 0 || self.max_intents_per_settlement > MAX_INTENTS {
            return Err(OperatorError::InvalidConfig(format!(
                "max_intents_per_settlement must be within 1..={MAX_INTENTS}, got {}",
                self.max_intents_per_settlement
            )));
        }
        if self.proving_workers == 0 {
            return Err(OperatorError::InvalidConfig(
                "proving_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            setup_seed: [3u8; 32],
            owner_seed: [7u8; 32],
            max_intents_per_settlement: MAX_INTENTS,
            proving_workers: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operator.json");
        std::fs::write(&path, r#"{ "proving_workers": 4 }"#).unwrap();

        let config = OperatorConfig::load(&path).unwrap();
        assert_eq!(config.proving_workers, 4);
        assert_eq!(config.setup_seed, OperatorConfig::default().setup_seed);
        assert_eq!(config.max_intents_per_settlement, MAX_INTENTS);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operator.json");
        let mut config = OperatorConfig::default();
        config.owner_seed = [9u8; 32];
        config.max_intents_per_settlement = 10;
        config.save(&path).unwrap();
        assert_eq!(OperatorConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn rejects_out_of_range_limits() {
        let mut config = OperatorConfig::default();
        config.max_intents_per_settlement = MAX_INTENTS + 1;
        assert!(matches!(
            config.validate(),
            Err(OperatorError::InvalidConfig(_))
        ));
        config.max_intents_per_settlement = 1;
        config.proving_workers = 0;
        assert!(config.validate().is_err());
    }
}
