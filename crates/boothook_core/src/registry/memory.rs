//! In-process registries for dry runs and tests.

use crate::model::manifest::ServiceDescriptor;
use crate::registry::{
    BootComponent, BootComponentRegistry, RegistryError, RegistryResult, ServiceRegistry,
    ServiceRegistryProvider,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

/// Boot-component registry keyed by component name.
#[derive(Debug, Default)]
pub struct InMemoryBootRegistry {
    components: RefCell<BTreeMap<String, BootComponent>>,
}

impl InMemoryBootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.borrow().is_empty()
    }

    pub fn component(&self, name: &str) -> Option<BootComponent> {
        self.components.borrow().get(name).cloned()
    }

    /// Returns all components sorted by name.
    pub fn snapshot(&self) -> Vec<BootComponent> {
        self.components.borrow().values().cloned().collect()
    }
}

impl BootComponentRegistry for InMemoryBootRegistry {
    fn add_component(&self, component: BootComponent) -> RegistryResult<()> {
        self.components
            .borrow_mut()
            .insert(component.name().to_string(), component);
        Ok(())
    }

    fn remove_component(&self, name: &str) -> RegistryResult<()> {
        self.components.borrow_mut().remove(name);
        Ok(())
    }
}

/// Service registry keyed by service name.
#[derive(Debug, Default)]
pub struct InMemoryServiceRegistry {
    services: RefCell<BTreeMap<String, ServiceDescriptor>>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.services.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.borrow().is_empty()
    }

    pub fn service(&self, name: &str) -> Option<ServiceDescriptor> {
        self.services.borrow().get(name).cloned()
    }

    /// Returns all services sorted by name.
    pub fn snapshot(&self) -> Vec<ServiceDescriptor> {
        self.services.borrow().values().cloned().collect()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn install_service(&self, descriptor: &ServiceDescriptor) -> RegistryResult<()> {
        self.services
            .borrow_mut()
            .insert(descriptor.name.clone(), descriptor.clone());
        Ok(())
    }

    fn uninstall_service(&self, name: &str) -> RegistryResult<()> {
        match self.services.borrow_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(RegistryError::ServiceNotFound(name.to_string())),
        }
    }
}

/// Provider handing out one shared in-memory service registry.
#[derive(Debug, Default)]
pub struct InMemoryServiceProvider {
    registry: Rc<InMemoryServiceRegistry>,
    open_count: Cell<usize>,
}

impl InMemoryServiceProvider {
    pub fn new(registry: Rc<InMemoryServiceRegistry>) -> Self {
        Self {
            registry,
            open_count: Cell::new(0),
        }
    }

    pub fn registry(&self) -> Rc<InMemoryServiceRegistry> {
        Rc::clone(&self.registry)
    }

    /// Number of times a handle was requested.
    pub fn open_count(&self) -> usize {
        self.open_count.get()
    }
}

impl ServiceRegistryProvider for InMemoryServiceProvider {
    fn open(&self, _application_dir: &Path) -> RegistryResult<Rc<dyn ServiceRegistry>> {
        self.open_count.set(self.open_count.get() + 1);
        let registry: Rc<dyn ServiceRegistry> = self.registry.clone();
        Ok(registry)
    }
}
