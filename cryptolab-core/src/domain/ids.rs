use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic dataset hash (content hash over every aligned column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic run ID: BLAKE3 over the canonical JSON of an analysis config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Hash any serializable configuration into a run ID.
    ///
    /// serde_json keeps struct field order, so the same config always
    /// produces the same bytes.
    pub fn for_config<T: Serialize>(config: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(config)?;
        Ok(Self(blake3::hash(&json).to_hex().to_string()))
    }

    /// First 12 hex characters, used for directory names.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Params {
        symbols: Vec<&'static str>,
        year: i32,
    }

    #[test]
    fn run_id_deterministic() {
        let a = Params { symbols: vec!["ETH", "LTC"], year: 2017 };
        let b = Params { symbols: vec!["ETH", "LTC"], year: 2017 };
        assert_eq!(RunId::for_config(&a).unwrap(), RunId::for_config(&b).unwrap());
    }

    #[test]
    fn run_id_changes_with_params() {
        let a = Params { symbols: vec!["ETH", "LTC"], year: 2017 };
        let b = Params { symbols: vec!["ETH", "LTC"], year: 2016 };
        assert_ne!(RunId::for_config(&a).unwrap(), RunId::for_config(&b).unwrap());
    }

    #[test]
    fn short_id_is_prefix() {
        let id = RunId::for_config(&Params { symbols: vec![], year: 1 }).unwrap();
        assert_eq!(id.short().len(), 12);
        assert!(id.0.starts_with(id.short()));
    }
}
