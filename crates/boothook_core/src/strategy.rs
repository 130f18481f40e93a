//! Installer strategy selection.
//!
//! Packages may name a custom installer instead of the default engine. Custom
//! installers are registered up front in an [`InstallerCatalog`] under a
//! string id; the factory signature enforces the shared construction contract.

use crate::engine::{DefaultPackageInstaller, InstallContext, PackageInstaller};
use crate::model::manifest::is_declared;
use crate::registry::BootComponentRegistry;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Default declaration key naming a custom installer.
pub const DEFAULT_INSTALLER_KEY: &str = "installer-class";

/// Uniform two-handle constructor for installers.
pub type InstallerFactory =
    fn(Rc<dyn BootComponentRegistry>, InstallContext) -> Box<dyn PackageInstaller>;

/// Factory for the default reconciliation engine.
pub fn default_installer(
    boot: Rc<dyn BootComponentRegistry>,
    context: InstallContext,
) -> Box<dyn PackageInstaller> {
    Box::new(DefaultPackageInstaller::new(boot, context))
}

/// Lookup table from installer id to factory.
#[derive(Debug, Clone, Default)]
pub struct InstallerCatalog {
    factories: BTreeMap<String, InstallerFactory>,
}

impl InstallerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one custom installer under `id`.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        factory: InstallerFactory,
    ) -> Result<(), StrategyError> {
        let id = id.into();
        let normalized = id.trim();
        if normalized.is_empty() {
            return Err(StrategyError::InvalidInstallerId(id));
        }
        if self.factories.contains_key(normalized) {
            return Err(StrategyError::DuplicateInstaller(normalized.to_string()));
        }
        self.factories.insert(normalized.to_string(), factory);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id.trim())
    }

    /// Returns sorted installer ids.
    pub fn installer_ids(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Picks and constructs the installer for one package.
    ///
    /// Without an `installer_key` entry in `declaration` the default engine is
    /// used. The returned installer is not configured yet.
    pub fn select(
        &self,
        package_name: &str,
        declaration: &Value,
        installer_key: &str,
        boot: Rc<dyn BootComponentRegistry>,
        context: InstallContext,
    ) -> Result<Box<dyn PackageInstaller>, StrategyError> {
        let requested = declaration
            .get(installer_key)
            .filter(|value| is_declared(value));

        let factory = match requested {
            None => default_installer as InstallerFactory,
            Some(Value::String(id)) => {
                *self
                    .factories
                    .get(id.trim())
                    .ok_or_else(|| StrategyError::InstallerNotFound {
                        package: package_name.to_string(),
                        installer: id.clone(),
                    })?
            }
            Some(other) => {
                return Err(StrategyError::InvalidDeclaration {
                    package: package_name.to_string(),
                    value: other.to_string(),
                })
            }
        };

        debug!(
            "event=installer_select module=strategy status=ok package={} installer={}",
            package_name,
            requested.and_then(Value::as_str).unwrap_or("default")
        );
        Ok(factory(boot, context))
    }
}

/// Installer resolution errors; raised before any registry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    InvalidInstallerId(String),
    DuplicateInstaller(String),
    InstallerNotFound { package: String, installer: String },
    InvalidDeclaration { package: String, value: String },
}

impl Display for StrategyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInstallerId(value) => write!(f, "installer id is invalid: {value:?}"),
            Self::DuplicateInstaller(value) => {
                write!(f, "installer id already registered: {value}")
            }
            Self::InstallerNotFound { package, installer } => write!(
                f,
                "installer {installer} not found for package {package}"
            ),
            Self::InvalidDeclaration { package, value } => write!(
                f,
                "installer declaration must be a string for package {package}, got {value}"
            ),
        }
    }
}

impl Error for StrategyError {}
