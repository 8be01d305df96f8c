use crate::bind::{decode_bytecode, Error, Result};
use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Compiled contract: its ABI and creation bytecode.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
struct RawArtifact {
    abi: JsonAbi,
    bytecode: RawBytecode,
}

// Hardhat stores the bytecode as a string, Foundry as `{ "object": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl Artifact {
    /// Parses a Hardhat or Foundry artifact.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: RawArtifact = serde_json::from_str(json).map_err(Error::MalformedArtifact)?;
        let hex = match raw.bytecode {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        };
        Ok(Self {
            abi: raw.abi,
            bytecode: decode_bytecode(&hex)?,
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|source| Error::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Whether this artifact's constructor takes the same parameters as the
    /// one declared in `abi`, so arguments encoded for one fit the other.
    pub fn constructor_matches(&self, abi: &JsonAbi) -> bool {
        let types = |abi: &JsonAbi| -> Vec<String> {
            abi.constructor()
                .map(|c| c.inputs.iter().map(|p| p.selector_type().into_owned()).collect())
                .unwrap_or_default()
        };
        types(&self.abi) == types(abi)
    }
}

/// Loads artifacts from a build directory, keeping each one after the first
/// read.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    memory_cache: HashMap<PathBuf, Artifact>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            memory_cache: HashMap::new(),
        }
    }

    /// Resolves `name` to `<dir>/<name>.json` unless it already is a path to
    /// a `.json` file.
    pub fn path_for(&self, name: &str) -> PathBuf {
        if name.ends_with(".json") {
            let path = PathBuf::from(name);
            if path.is_absolute() {
                return path;
            }
            return self.dir.join(path);
        }
        self.dir.join(format!("{}.json", name))
    }

    pub async fn get(&mut self, name: &str) -> Result<Artifact> {
        let path = self.path_for(name);
        if let Some(artifact) = self.memory_cache.get(&path) {
            debug!("Artifact cache hit for {:?}", path);
            return Ok(artifact.clone());
        }

        let artifact = Artifact::load(&path).await?;
        debug!(
            "Loaded artifact {:?} ({} bytes of bytecode)",
            path,
            artifact.bytecode.len()
        );
        self.memory_cache.insert(path, artifact.clone());
        Ok(artifact)
    }

    pub fn clear_cache(&mut self) {
        self.memory_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::offchain_aggregator::OffchainAggregator;
    use tempfile::tempdir;

    const HARDHAT: &str = r#"{
        "contractName": "Counter",
        "abi": [{"inputs": [], "stateMutability": "nonpayable", "type": "constructor"}],
        "bytecode": "0x6080604052"
    }"#;

    const FOUNDRY: &str = r#"{
        "abi": [],
        "bytecode": {"object": "0x60806040", "linkReferences": {}}
    }"#;

    #[test]
    fn test_parse_both_layouts() {
        let hardhat = Artifact::parse(HARDHAT).unwrap();
        assert_eq!(hardhat.bytecode, Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52]));
        assert!(hardhat.abi.constructor().is_some());

        let foundry = Artifact::parse(FOUNDRY).unwrap();
        assert_eq!(foundry.bytecode.len(), 4);
    }

    #[test]
    fn test_parse_rejects_bad_bytecode() {
        let err = Artifact::parse(r#"{"abi": [], "bytecode": "0xzz"}"#).unwrap_err();
        assert!(matches!(err, Error::Bytecode(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_artifact() {
        // Valid ABI, bytecode missing.
        let err = Artifact::parse(r#"{"abi": []}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedArtifact(_)));

        let err = Artifact::parse("not json").unwrap_err();
        assert!(matches!(err, Error::MalformedArtifact(_)));
        assert!(err.to_string().starts_with("malformed contract artifact"));
    }

    #[test]
    fn test_constructor_matches_binding() {
        let abi = OffchainAggregator::abi().unwrap();
        let artifact = Artifact {
            abi: abi.clone(),
            bytecode: Bytes::new(),
        };
        assert!(artifact.constructor_matches(&abi));

        let counter = Artifact::parse(HARDHAT).unwrap();
        assert!(!counter.constructor_matches(&abi));
    }

    #[tokio::test]
    async fn test_store_loads_and_caches() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("Counter.json");
        std::fs::write(&path, HARDHAT).unwrap();

        let mut store = ArtifactStore::new(temp_dir.path());
        let first = store.get("Counter").await.unwrap();

        // Served from memory once loaded.
        std::fs::remove_file(&path).unwrap();
        let second = store.get("Counter.json").await.unwrap();
        assert_eq!(first.bytecode, second.bytecode);

        store.clear_cache();
        let err = store.get("Counter").await.unwrap_err();
        assert!(matches!(err, Error::Artifact { .. }));
    }
}
