//! Recording registry doubles shared by integration tests.
#![allow(dead_code)]

use boothook_core::{
    BootComponent, BootComponentRegistry, InstallContext, RegistryError, RegistryResult,
    ServiceDescriptor, ServiceRegistry, ServiceRegistryProvider,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;

/// One observed registry call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddComponent(String),
    RemoveComponent(String),
    InstallService(String),
    UninstallService(String),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Boot registry that records calls and optionally reports missing components.
#[derive(Default)]
pub struct RecordingBootRegistry {
    pub calls: CallLog,
    pub components: RefCell<BTreeMap<String, BootComponent>>,
    pub strict_remove: bool,
}

impl RecordingBootRegistry {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            components: RefCell::new(BTreeMap::new()),
            strict_remove: false,
        }
    }

    /// Variant whose `remove_component` fails with `ComponentNotFound` when absent.
    pub fn strict(calls: CallLog) -> Self {
        Self {
            strict_remove: true,
            ..Self::new(calls)
        }
    }

    pub fn component(&self, name: &str) -> Option<BootComponent> {
        self.components.borrow().get(name).cloned()
    }
}

impl BootComponentRegistry for RecordingBootRegistry {
    fn add_component(&self, component: BootComponent) -> RegistryResult<()> {
        self.calls
            .borrow_mut()
            .push(Call::AddComponent(component.name().to_string()));
        self.components
            .borrow_mut()
            .insert(component.name().to_string(), component);
        Ok(())
    }

    fn remove_component(&self, name: &str) -> RegistryResult<()> {
        self.calls
            .borrow_mut()
            .push(Call::RemoveComponent(name.to_string()));
        let removed = self.components.borrow_mut().remove(name);
        if removed.is_none() && self.strict_remove {
            return Err(RegistryError::ComponentNotFound(name.to_string()));
        }
        Ok(())
    }
}

/// Service registry that records calls and can be told to fail specific names.
#[derive(Default)]
pub struct RecordingServiceRegistry {
    pub calls: CallLog,
    pub services: RefCell<BTreeMap<String, ServiceDescriptor>>,
    pub failing_uninstall: BTreeSet<String>,
    pub reject_duplicates: bool,
}

impl RecordingServiceRegistry {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            ..Self::default()
        }
    }

    pub fn service(&self, name: &str) -> Option<ServiceDescriptor> {
        self.services.borrow().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.services.borrow().keys().cloned().collect()
    }
}

impl ServiceRegistry for RecordingServiceRegistry {
    fn install_service(&self, descriptor: &ServiceDescriptor) -> RegistryResult<()> {
        self.calls
            .borrow_mut()
            .push(Call::InstallService(descriptor.name.clone()));
        let mut services = self.services.borrow_mut();
        if self.reject_duplicates && services.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateService(descriptor.name.clone()));
        }
        services.insert(descriptor.name.clone(), descriptor.clone());
        Ok(())
    }

    fn uninstall_service(&self, name: &str) -> RegistryResult<()> {
        self.calls
            .borrow_mut()
            .push(Call::UninstallService(name.to_string()));
        if self.failing_uninstall.contains(name) {
            return Err(RegistryError::Rejected(format!("{name} is locked")));
        }
        match self.services.borrow_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(RegistryError::ServiceNotFound(name.to_string())),
        }
    }
}

/// Provider returning one shared recording registry, or failing on demand.
pub struct RecordingProvider {
    pub registry: Rc<RecordingServiceRegistry>,
    pub opens: Cell<usize>,
    pub fail: bool,
}

impl RecordingProvider {
    pub fn new(registry: Rc<RecordingServiceRegistry>) -> Self {
        Self {
            registry,
            opens: Cell::new(0),
            fail: false,
        }
    }

    pub fn failing(registry: Rc<RecordingServiceRegistry>) -> Self {
        Self {
            fail: true,
            ..Self::new(registry)
        }
    }
}

impl ServiceRegistryProvider for RecordingProvider {
    fn open(&self, _application_dir: &Path) -> RegistryResult<Rc<dyn ServiceRegistry>> {
        self.opens.set(self.opens.get() + 1);
        if self.fail {
            return Err(RegistryError::Unavailable("application boot failed".to_string()));
        }
        let registry: Rc<dyn ServiceRegistry> = self.registry.clone();
        Ok(registry)
    }
}

/// Fully wired recording fixture.
pub struct Fixture {
    pub calls: CallLog,
    pub boot: Rc<RecordingBootRegistry>,
    pub services: Rc<RecordingServiceRegistry>,
    pub provider: Rc<RecordingProvider>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_services(|registry| registry)
    }

    /// Builds a fixture after letting the caller tweak the service registry.
    pub fn with_services(
        tweak: impl FnOnce(RecordingServiceRegistry) -> RecordingServiceRegistry,
    ) -> Self {
        let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
        let services = Rc::new(tweak(RecordingServiceRegistry::new(calls.clone())));
        let provider = Rc::new(RecordingProvider::new(services.clone()));
        Self {
            boot: Rc::new(RecordingBootRegistry::new(calls.clone())),
            calls,
            services,
            provider,
        }
    }

    pub fn context(&self) -> InstallContext {
        InstallContext::new("/srv/app", self.provider.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}
