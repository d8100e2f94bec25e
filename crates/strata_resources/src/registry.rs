//! Resource registry for managing resource type implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};
use crate::pricing::PricingCatalog;
use crate::provider::Provider;
use crate::resource::{build, BuiltResource, Resource};
use crate::{aws, cloudflare, hetzner};

/// A registry of resource types.
///
/// Maps Terraform resource type names to their implementations. Built
/// explicitly at the composition root; nothing registers itself.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
        }
    }

    /// Registry holding every resource type shipped with Strata.
    pub fn standard() -> ResourceResult<Self> {
        let mut registry = Self::new();

        registry.register(Arc::new(aws::Vpc::new()?))?;
        registry.register(Arc::new(aws::Subnet::new()?))?;
        registry.register(Arc::new(aws::SecurityGroup::new()?))?;
        registry.register(Arc::new(aws::LoadBalancer::new()?))?;
        registry.register(Arc::new(aws::TargetGroup::new()?))?;
        registry.register(Arc::new(aws::Listener::new()?))?;
        registry.register(Arc::new(aws::Instance::new()?))?;
        registry.register(Arc::new(aws::LaunchTemplate::new()?))?;
        registry.register(Arc::new(aws::AutoscalingGroup::new()?))?;
        registry.register(Arc::new(aws::EksNodeGroup::new()?))?;
        registry.register(Arc::new(aws::CognitoUserPoolDomain::new()?))?;
        registry.register(Arc::new(aws::S3Bucket::new()?))?;
        registry.register(Arc::new(aws::S3Object::new()?))?;

        registry.register(Arc::new(cloudflare::Zone::new()?))?;
        registry.register(Arc::new(cloudflare::Record::new()?))?;
        registry.register(Arc::new(cloudflare::ListItem::new()?))?;

        registry.register(Arc::new(hetzner::Network::new()?))?;
        registry.register(Arc::new(hetzner::Firewall::new()?))?;
        registry.register(Arc::new(hetzner::Server::new()?))?;

        debug!("Standard registry holds {} resource types", registry.len());
        Ok(registry)
    }

    /// Register a resource type under its `resource_type()` name.
    ///
    /// The emission plan is checked against the schema first. A type with
    /// the same name is replaced.
    pub fn register(&mut self, resource: Arc<dyn Resource>) -> ResourceResult<()> {
        let name = resource.resource_type();
        resource.plan().verify(name, resource.schema())?;
        debug!("Registering resource type: {}", name);
        self.resources.insert(name.to_string(), resource);
        Ok(())
    }

    /// Get a resource type by name.
    pub fn get(&self, resource_type: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(resource_type).cloned()
    }

    /// Get a resource type by name, returning an error if not found.
    pub fn get_required(&self, resource_type: &str) -> ResourceResult<Arc<dyn Resource>> {
        self.get(resource_type)
            .ok_or_else(|| ResourceError::UnknownResourceType(resource_type.to_string()))
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.resources.contains_key(resource_type)
    }

    /// All registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.resources.keys().map(|s| s.as_str()).collect()
    }

    /// Resource types of one provider, sorted by name.
    pub fn by_provider(&self, provider: Provider) -> Vec<Arc<dyn Resource>> {
        self.resources
            .values()
            .filter(|r| r.provider() == provider)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Remove a resource type from the registry.
    pub fn unregister(&mut self, resource_type: &str) -> Option<Arc<dyn Resource>> {
        debug!("Unregistering resource type: {}", resource_type);
        self.resources.remove(resource_type)
    }

    /// Look up `resource_type` and build one instance of it.
    pub fn build(
        &self,
        resource_type: &str,
        name: &str,
        raw: &Value,
        pricing: &PricingCatalog,
    ) -> ResourceResult<BuiltResource> {
        let resource = self.get_required(resource_type)?;
        build(resource.as_ref(), name, raw, pricing)
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.names())
            .finish()
    }
}
