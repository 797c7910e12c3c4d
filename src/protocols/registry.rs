//! Protocol registry
//!
//! Protocols are selected by id from an explicit registry populated at
//! startup; there is no filesystem discovery.

use std::collections::HashMap;

use super::{ProtocolFactory, ProtocolInfo};

/// Registry of available training protocols
#[derive(Default)]
pub struct ProtocolRegistry {
    factories: HashMap<String, Box<dyn ProtocolFactory>>,
    /// Registration order, for stable menu listings
    order: Vec<String>,
}

impl ProtocolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol factory
    pub fn register(&mut self, factory: Box<dyn ProtocolFactory>) {
        let id = factory.id().to_string();
        if self.factories.insert(id.clone(), factory).is_none() {
            self.order.push(id);
        }
    }

    /// Register all built-in protocols
    pub fn register_builtin(&mut self) {
        use super::shoot_dont_shoot::ShootDontShootFactory;
        use super::timed_holster::TimedHolsterFactory;

        log::info!("Registering built-in training protocols");

        self.register(Box::new(TimedHolsterFactory));
        self.register(Box::new(ShootDontShootFactory));

        log::info!("Registered {} built-in protocols", self.factories.len());
    }

    /// Check if a protocol is registered
    pub fn has_protocol(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Look up a factory by id
    pub fn get(&self, id: &str) -> Option<&dyn ProtocolFactory> {
        self.factories.get(id).map(|f| f.as_ref())
    }

    /// All registered ids, in registration order
    pub fn ids(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Descriptions of every registered protocol, for menu construction
    pub fn infos(&self) -> Vec<(&str, ProtocolInfo)> {
        self.order
            .iter()
            .filter_map(|id| {
                self.factories
                    .get(id)
                    .map(|f| (id.as_str(), f.info()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::{BoxedProtocol, TrainingProtocol};
    use crate::protocols::operations::ProtocolOps;
    use crate::targets::TargetSnapshot;
    use std::sync::Arc;

    struct TestProtocol;

    impl TrainingProtocol for TestProtocol {
        fn on_shot(
            &mut self,
            _shot: &crate::core::Shot,
            _item: crate::core::shot::ShotItemId,
            _is_hit: bool,
        ) {
        }
        fn on_hit(
            &mut self,
            _hit: &crate::hits::HitRegion,
            _shot: &crate::core::Shot,
            _item: crate::core::shot::ShotItemId,
        ) {
        }
        fn reset(&mut self, _targets: &[TargetSnapshot]) {}
        fn destroy(&mut self) {}
    }

    struct TestFactory;

    impl ProtocolFactory for TestFactory {
        fn id(&self) -> &'static str {
            "test-protocol"
        }
        fn info(&self) -> ProtocolInfo {
            ProtocolInfo {
                name: "Test Protocol".to_string(),
                version: "1.0".to_string(),
                creator: "tests".to_string(),
                description: "does nothing".to_string(),
            }
        }
        fn create(
            &self,
            _ops: Arc<dyn ProtocolOps>,
            _targets: &[TargetSnapshot],
        ) -> BoxedProtocol {
            Box::new(TestProtocol)
        }
    }

    #[test]
    fn test_registration() {
        let mut registry = ProtocolRegistry::new();
        registry.register(Box::new(TestFactory));

        assert!(registry.has_protocol("test-protocol"));
        assert!(!registry.has_protocol("unknown"));
        assert_eq!(registry.ids(), vec!["test-protocol"]);
    }

    #[test]
    fn test_builtin_registration() {
        let mut registry = ProtocolRegistry::new();
        registry.register_builtin();

        assert!(registry.has_protocol("timed-holster-drill"));
        assert!(registry.has_protocol("shoot-dont-shoot"));

        let infos = registry.infos();
        assert_eq!(infos.len(), 2);
        assert!(!infos[0].1.name.is_empty());
    }
}
