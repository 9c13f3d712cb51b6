use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::config::parse_ron;
use crate::error::{BridgeError, BridgeResult};
use crate::frame::RigidBodyId;

/// One rigid body as described by the capture server at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetDescription {
    pub id: RigidBodyId,
    pub name: String,
}

impl AssetDescription {
    pub fn new(id: RigidBodyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Rigid body id to name mapping, built once before streaming and never modified afterwards.
/// Names double as channel names and transform child frames, so they must be unique.
#[derive(Clone, Debug, Default)]
pub struct AssetRegistry {
    names: BTreeMap<RigidBodyId, String>,
}

impl AssetRegistry {
    pub fn new(descriptions: impl IntoIterator<Item = AssetDescription>) -> BridgeResult<Self> {
        let mut names = BTreeMap::new();
        let mut used = HashSet::new();
        for AssetDescription { id, name } in descriptions {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(BridgeError::InvalidAssetName(name));
            }
            if names.contains_key(&id) {
                return Err(BridgeError::DuplicateAssetId { id });
            }
            if !used.insert(name.clone()) {
                return Err(BridgeError::DuplicateAssetName { name });
            }
            names.insert(id, name);
        }
        Ok(Self { names })
    }

    /// Reads a RON list of `(id: .., name: "..")` entries.
    pub fn from_ron_str(ron: &str) -> BridgeResult<Self> {
        let descriptions: Vec<AssetDescription> = parse_ron(ron)?;
        Self::new(descriptions)
    }

    pub fn name(&self, id: RigidBodyId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn resolve(&self, id: RigidBodyId) -> BridgeResult<&str> {
        self.name(id).ok_or(BridgeError::UnregisteredAsset { id })
    }

    pub fn iter(&self) -> impl Iterator<Item = (RigidBodyId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = AssetRegistry::new([
            AssetDescription::new(7, "drone1"),
            AssetDescription::new(2, "wand"),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name(7), Some("drone1"));
        assert_eq!(registry.resolve(2).unwrap(), "wand");
        assert!(matches!(
            registry.resolve(3),
            Err(BridgeError::UnregisteredAsset { id: 3 })
        ));
        let ids: Vec<_> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 7]);
    }

    #[test]
    fn test_rejects_duplicates() {
        assert!(matches!(
            AssetRegistry::new([AssetDescription::new(1, "a"), AssetDescription::new(1, "b")]),
            Err(BridgeError::DuplicateAssetId { id: 1 })
        ));
        assert!(matches!(
            AssetRegistry::new([AssetDescription::new(1, "a"), AssetDescription::new(2, "a")]),
            Err(BridgeError::DuplicateAssetName { .. })
        ));
    }

    #[test]
    fn test_rejects_unusable_names() {
        assert!(matches!(
            AssetRegistry::new([AssetDescription::new(1, "")]),
            Err(BridgeError::InvalidAssetName(_))
        ));
        assert!(matches!(
            AssetRegistry::new([AssetDescription::new(1, "rigid body 1")]),
            Err(BridgeError::InvalidAssetName(_))
        ));
    }

    #[test]
    fn test_from_ron() {
        let registry =
            AssetRegistry::from_ron_str(r#"[(id: 7, name: "drone1"), (id: 8, name: "drone2")]"#)
                .unwrap();
        assert_eq!(registry.name(8), Some("drone2"));
    }
}
