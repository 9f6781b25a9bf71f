//! Registry of camera types
//!
//! Maps a [`CameraId`] to the static configuration of that camera type and
//! the factory that builds its controller. A context holds the registry in an
//! `Arc`; it is immutable once the context exists.

use crate::controller::CameraController;
use crate::error::{CameraError, Result};
use crate::request::SharedExtension;
use crate::start_info::{CameraStartInfo, StartParams};
use crate::types::{CameraId, CameraPriority, CameraRank, PriorityClass};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh controller for one stack node
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn CameraController> + Send + Sync>;

/// Builds the extension attached to each new request
pub type ExtensionFactory = Arc<dyn Fn() -> SharedExtension + Send + Sync>;

/// Camera family, used by the resolver's hand-off rules
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CameraFamily {
    #[default]
    General,
    /// Cameras whose framing is remapped from the distance to their focus object
    DistanceRemapped,
}

/// Static configuration of one camera type
#[derive(Clone)]
pub struct CameraConfig {
    id: CameraId,
    family: CameraFamily,
    default_rank: CameraRank,
    default_priority: CameraPriority,
    default_start_info: CameraStartInfo,
    distance_partner: Option<CameraId>,
    params_size: usize,
    factory: ControllerFactory,
    extension_factory: Option<ExtensionFactory>,
}

impl CameraConfig {
    /// A Normal-rank, Gameplay-priority camera built by `factory`
    pub fn new<F>(id: CameraId, factory: F) -> Self
    where
        F: Fn() -> Box<dyn CameraController> + Send + Sync + 'static,
    {
        Self {
            id,
            family: CameraFamily::General,
            default_rank: CameraRank::Normal,
            default_priority: CameraPriority::of(PriorityClass::Gameplay),
            default_start_info: CameraStartInfo::default(),
            distance_partner: None,
            params_size: 0,
            factory: Arc::new(factory),
            extension_factory: None,
        }
    }

    pub fn with_rank(mut self, rank: CameraRank) -> Self {
        self.default_rank = rank;
        self
    }

    pub fn with_priority(mut self, priority: CameraPriority) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn with_family(mut self, family: CameraFamily) -> Self {
        self.family = family;
        self
    }

    /// Camera pushed on top of this one to hand off by distance
    pub fn with_distance_partner(mut self, partner: CameraId) -> Self {
        self.distance_partner = Some(partner);
        self
    }

    /// Start info used when a request does not bring its own
    pub fn with_start_info(mut self, start_info: CameraStartInfo) -> Self {
        self.default_start_info = start_info;
        self
    }

    /// Size of the controller's start parameter struct, checked at registration
    pub fn with_params<T: bytemuck::Pod>(mut self) -> Self {
        self.params_size = std::mem::size_of::<T>();
        self
    }

    pub fn with_extension<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> SharedExtension + Send + Sync + 'static,
    {
        self.extension_factory = Some(Arc::new(factory));
        self
    }

    pub fn id(&self) -> CameraId {
        self.id
    }

    pub fn family(&self) -> CameraFamily {
        self.family
    }

    pub fn default_rank(&self) -> CameraRank {
        self.default_rank
    }

    pub fn default_priority(&self) -> CameraPriority {
        self.default_priority
    }

    pub fn default_start_info(&self) -> &CameraStartInfo {
        &self.default_start_info
    }

    pub fn distance_partner(&self) -> Option<CameraId> {
        self.distance_partner
    }

    pub fn params_size(&self) -> usize {
        self.params_size
    }

    pub fn create_controller(&self) -> Box<dyn CameraController> {
        (self.factory)()
    }

    pub fn create_extension(&self) -> Option<SharedExtension> {
        self.extension_factory.as_ref().map(|factory| factory())
    }
}

impl fmt::Debug for CameraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraConfig")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("default_rank", &self.default_rank)
            .field("default_priority", &self.default_priority)
            .field("distance_partner", &self.distance_partner)
            .field("params_size", &self.params_size)
            .finish_non_exhaustive()
    }
}

/// All camera types known to a context
#[derive(Debug, Default)]
pub struct CameraRegistry {
    configs: FxHashMap<CameraId, CameraConfig>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in controllers
    pub fn with_builtin_cameras() -> Result<Self> {
        let mut registry = Self::new();
        crate::controllers::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Register a camera type
    pub fn register(&mut self, config: CameraConfig) -> Result<()> {
        if self.configs.contains_key(&config.id) {
            return Err(CameraError::DuplicateCamera(config.id));
        }
        if config.params_size > StartParams::MAX_BYTES {
            return Err(CameraError::StartParamsTooLarge {
                size: config.params_size,
                max: StartParams::MAX_BYTES,
            });
        }
        tracing::debug!(camera = %config.id, rank = ?config.default_rank, "registered camera");
        self.configs.insert(config.id, config);
        Ok(())
    }

    pub fn get(&self, id: CameraId) -> Option<&CameraConfig> {
        self.configs.get(&id)
    }

    /// Look a camera up by its registered name
    pub fn find_by_name(&self, name: &str) -> Option<&CameraConfig> {
        self.configs.values().find(|config| config.id.name() == name)
    }

    pub fn contains(&self, id: CameraId) -> bool {
        self.configs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = CameraId> + '_ {
        self.configs.keys().copied()
    }

    /// Every distance partner must itself be registered
    pub fn validate(&self) -> Result<()> {
        for config in self.configs.values() {
            if let Some(partner) = config.distance_partner {
                if !self.configs.contains_key(&partner) {
                    return Err(CameraError::UnknownCamera(partner));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::FixedCamera;
    use bytemuck::{Pod, Zeroable};

    #[derive(Clone, Copy, Pod, Zeroable)]
    #[repr(C)]
    struct Oversized {
        data: [f32; 64],
    }

    fn fixed(id: CameraId) -> CameraConfig {
        CameraConfig::new(id, || Box::new(FixedCamera::new()))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CameraRegistry::new();
        let id = CameraId::new("test-fixed");
        registry.register(fixed(id)).unwrap();
        assert!(registry.contains(id));
        assert_eq!(registry.find_by_name("test-fixed").map(|c| c.id()), Some(id));
        assert_eq!(
            registry.register(fixed(id)).unwrap_err(),
            CameraError::DuplicateCamera(id)
        );
    }

    #[test]
    fn test_oversized_params_rejected() {
        let mut registry = CameraRegistry::new();
        let config = fixed(CameraId::new("too-big")).with_params::<Oversized>();
        assert!(matches!(
            registry.register(config),
            Err(CameraError::StartParamsTooLarge { size: 256, .. })
        ));
    }

    #[test]
    fn test_missing_distance_partner() {
        let mut registry = CameraRegistry::new();
        let partner = CameraId::new("nowhere");
        registry
            .register(fixed(CameraId::new("paired")).with_distance_partner(partner))
            .unwrap();
        assert_eq!(registry.validate(), Err(CameraError::UnknownCamera(partner)));
    }

    #[test]
    fn test_builtin_registry_is_consistent() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        assert!(registry.validate().is_ok());
        assert_eq!(
            registry.get(CameraId::MANUAL_BASE).map(|c| c.default_rank()),
            Some(CameraRank::Bottom)
        );
        assert_eq!(
            registry.get(CameraId::FOLLOW).and_then(|c| c.distance_partner()),
            Some(CameraId::FOLLOW_DISTANCE)
        );
    }
}
