use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chainroute_core::{ChainId, ChainProfile, PrivacyLevel};

use crate::error::RoutingError;

type ChainMap = BTreeMap<ChainId, ChainProfile>;

/// Registry of settlement backend capability profiles.
///
/// Writers clone the current map, apply their change and swap the `Arc`;
/// readers only ever see complete snapshots, so a routing computation can
/// never observe a half-applied update.
pub struct ChainRegistry {
    chains: RwLock<Arc<ChainMap>>,
}

impl ChainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            chains: RwLock::new(Arc::new(ChainMap::new())),
        }
    }

    /// Create a registry seeded with [`default_profiles`].
    pub fn with_defaults() -> Self {
        let map = default_profiles()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self {
            chains: RwLock::new(Arc::new(map)),
        }
    }

    /// Register a new chain. Fails if the id is taken or the profile is
    /// malformed.
    pub fn register(&self, profile: ChainProfile) -> Result<(), RoutingError> {
        profile
            .validate()
            .map_err(|e| RoutingError::InvalidChainProfile {
                id: profile.id.clone(),
                reason: e.to_string(),
            })?;

        self.update(|map| {
            if map.contains_key(&profile.id) {
                return Err(RoutingError::DuplicateChainId(profile.id.clone()));
            }
            tracing::info!(
                chain = %profile.id,
                privacy = %profile.privacy_level,
                "Registering chain"
            );
            map.insert(profile.id.clone(), profile);
            Ok(())
        })
    }

    /// Enable or disable a chain for subsequent routing decisions.
    pub fn set_enabled(&self, id: &ChainId, enabled: bool) -> Result<(), RoutingError> {
        self.update(|map| {
            let profile = map
                .get_mut(id)
                .ok_or_else(|| RoutingError::ChainNotFound(id.clone()))?;
            profile.enabled = enabled;
            tracing::info!(chain = %id, enabled, "Chain availability changed");
            Ok(())
        })
    }

    /// Remove a chain. Callers are responsible for making sure no in-flight
    /// payment still references it.
    pub fn deregister(&self, id: &ChainId) -> Result<ChainProfile, RoutingError> {
        self.update(|map| {
            map.remove(id)
                .ok_or_else(|| RoutingError::ChainNotFound(id.clone()))
        })
    }

    pub fn get(&self, id: &ChainId) -> Option<ChainProfile> {
        self.snapshot().get(id).cloned()
    }

    pub fn contains(&self, id: &ChainId) -> bool {
        self.snapshot().contains_key(id)
    }

    /// Snapshot of every registered profile, ordered by id.
    pub fn list_all(&self) -> Vec<ChainProfile> {
        self.snapshot().values().cloned().collect()
    }

    /// Snapshot of the enabled profiles, ordered by id.
    pub fn list_enabled(&self) -> Vec<ChainProfile> {
        self.snapshot()
            .values()
            .filter(|p| p.enabled)
            .cloned()
            .collect()
    }

    /// IDs of the enabled chains.
    pub fn enabled_ids(&self) -> Vec<ChainId> {
        self.snapshot()
            .values()
            .filter(|p| p.enabled)
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<ChainMap> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<T, F>(&self, f: F) -> Result<T, RoutingError>
    where
        F: FnOnce(&mut ChainMap) -> Result<T, RoutingError>,
    {
        let mut guard = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = ChainMap::clone(&guard);
        let out = f(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in backend profiles used when no chains are configured.
pub fn default_profiles() -> Vec<ChainProfile> {
    vec![
        ChainProfile::new("BTC", "Bitcoin", 0.0001, 100.0, 0.00005, 600_000, PrivacyLevel::Medium),
        ChainProfile::new(
            "BTC-LN",
            "Bitcoin Lightning",
            0.00000001,
            0.04,
            0.000001,
            1_500,
            PrivacyLevel::High,
        ),
        ChainProfile::new("ETH", "Ethereum", 0.001, 1_000.0, 0.0005, 15_000, PrivacyLevel::Low),
        ChainProfile::new("SOL", "Solana", 0.0001, 100_000.0, 0.000005, 400, PrivacyLevel::Low),
        ChainProfile::new(
            "USDC-POLY",
            "USDC on Polygon",
            0.01,
            1_000_000.0,
            0.01,
            2_000,
            PrivacyLevel::Low,
        )
        .with_asset("USDC"),
        ChainProfile::new(
            "XMR",
            "Monero",
            0.0001,
            10_000.0,
            0.00003,
            120_000,
            PrivacyLevel::Maximum,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> ChainProfile {
        ChainProfile::new(id, id, 0.1, 10.0, 0.01, 1_000, PrivacyLevel::Low)
    }

    #[test]
    fn test_register_and_get() {
        let reg = ChainRegistry::new();
        reg.register(profile("AAA")).unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(&ChainId::new("AAA")));
        assert_eq!(reg.get(&ChainId::new("AAA")).unwrap().name, "AAA");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let reg = ChainRegistry::new();
        reg.register(profile("AAA")).unwrap();
        let err = reg.register(profile("AAA")).unwrap_err();
        assert!(matches!(err, RoutingError::DuplicateChainId(id) if id.as_str() == "AAA"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let reg = ChainRegistry::new();
        let bad = ChainProfile { max_amount: 0.01, ..profile("BAD") };
        assert!(matches!(
            reg.register(bad),
            Err(RoutingError::InvalidChainProfile { .. })
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_set_enabled_filters_listing() {
        let reg = ChainRegistry::new();
        reg.register(profile("AAA")).unwrap();
        reg.register(profile("BBB")).unwrap();

        reg.set_enabled(&ChainId::new("AAA"), false).unwrap();
        let enabled = reg.enabled_ids();
        assert_eq!(enabled, vec![ChainId::new("BBB")]);
        assert_eq!(reg.list_all().len(), 2);

        reg.set_enabled(&ChainId::new("AAA"), true).unwrap();
        assert_eq!(reg.list_enabled().len(), 2);
    }

    #[test]
    fn test_set_enabled_unknown_chain() {
        let reg = ChainRegistry::new();
        assert!(matches!(
            reg.set_enabled(&ChainId::new("NOPE"), true),
            Err(RoutingError::ChainNotFound(_))
        ));
    }

    #[test]
    fn test_listing_is_a_snapshot() {
        let reg = ChainRegistry::new();
        reg.register(profile("AAA")).unwrap();
        let before = reg.list_enabled();

        reg.set_enabled(&ChainId::new("AAA"), false).unwrap();
        reg.register(profile("BBB")).unwrap();

        assert_eq!(before.len(), 1);
        assert!(before[0].enabled);
    }

    #[test]
    fn test_deregister() {
        let reg = ChainRegistry::new();
        reg.register(profile("AAA")).unwrap();
        let removed = reg.deregister(&ChainId::new("AAA")).unwrap();
        assert_eq!(removed.id.as_str(), "AAA");
        assert!(reg.is_empty());
        assert!(reg.deregister(&ChainId::new("AAA")).is_err());
    }

    #[test]
    fn test_defaults_are_valid_and_enabled() {
        let reg = ChainRegistry::with_defaults();
        assert_eq!(reg.len(), 6);
        for p in reg.list_all() {
            assert!(p.validate().is_ok(), "{} invalid", p.id);
            assert!(p.enabled);
        }
        assert_eq!(reg.get(&ChainId::new("BTC-LN")).unwrap().rate_asset(), "BTC");
        assert_eq!(reg.get(&ChainId::new("USDC-POLY")).unwrap().rate_asset(), "USDC");
    }

    #[test]
    fn test_concurrent_registration() {
        let reg = Arc::new(ChainRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.register(profile(&format!("C{i}"))).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.len(), 8);
    }
}
