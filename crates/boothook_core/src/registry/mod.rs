//! Registry client contracts consumed by the reconciliation engine.
//!
//! # Responsibility
//! - Describe the narrow boot-component and service registry surfaces.
//! - Keep persistence and lookup algorithms on the registry side.
//!
//! # Invariants
//! - A boot component is the unit of registration and removal.
//! - Handles are single-threaded and owned by the caller; the engine never
//!   closes or re-initializes them.

use crate::model::manifest::{BootloaderGroup, ServiceDescriptor};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::rc::Rc;

pub mod memory;

pub use memory::{InMemoryBootRegistry, InMemoryServiceProvider, InMemoryServiceRegistry};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Named, ordered collection of bootloader groups for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootComponent {
    name: String,
    groups: Vec<BootloaderGroup>,
}

impl BootComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Appends one group, keeping declaration order.
    pub fn add(&mut self, group: BootloaderGroup) -> &mut Self {
        self.groups.push(group);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[BootloaderGroup] {
        &self.groups
    }
}

/// Host boot configuration: whole components added/removed by name.
pub trait BootComponentRegistry {
    /// Starts an empty component builder for `name`.
    fn create_component(&self, name: &str) -> BootComponent {
        BootComponent::new(name)
    }

    /// Commits a fully built component, replacing any with the same name.
    fn add_component(&self, component: BootComponent) -> RegistryResult<()>;

    /// Removes a component by name.
    ///
    /// Implementations should succeed when the component is absent; callers
    /// also tolerate `RegistryError::ComponentNotFound`.
    fn remove_component(&self, name: &str) -> RegistryResult<()>;
}

/// Running service registry of the host application.
pub trait ServiceRegistry {
    /// Registers or replaces a service by name.
    fn install_service(&self, descriptor: &ServiceDescriptor) -> RegistryResult<()>;

    /// Removes a service by name; fails with `ServiceNotFound` when absent.
    fn uninstall_service(&self, name: &str) -> RegistryResult<()>;
}

/// Opens a live service registry for an application root.
///
/// Opening can be expensive (it boots a minimal host application), so the
/// engine calls it at most once per package event and only when services
/// are declared.
pub trait ServiceRegistryProvider {
    fn open(&self, application_dir: &Path) -> RegistryResult<Rc<dyn ServiceRegistry>>;
}

/// Registry-side failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    ComponentNotFound(String),
    ServiceNotFound(String),
    DuplicateService(String),
    Unavailable(String),
    Rejected(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ComponentNotFound(name) => write!(f, "boot component not found: {name}"),
            Self::ServiceNotFound(name) => write!(f, "service not found: {name}"),
            Self::DuplicateService(name) => write!(f, "service already registered: {name}"),
            Self::Unavailable(message) => write!(f, "registry is unavailable: {message}"),
            Self::Rejected(message) => write!(f, "registry rejected the operation: {message}"),
        }
    }
}

impl Error for RegistryError {}
