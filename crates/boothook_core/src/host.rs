//! Host package-manager event adapter.
//!
//! # Responsibility
//! - Route install/update/uninstall events of supported package types to the
//!   selected installer.
//! - Emit the user-visible report line for each processed package.
//!
//! # Invariants
//! - Packages without a contribution declaration never reach a registry.
//! - Strategy resolution happens before any registry mutation.
//! - File installation/removal stays with the host; nothing here gates it.

use crate::config::HostConfig;
use crate::engine::{InstallContext, InstallError, PackageInstaller, UninstallReport};
use crate::model::manifest::is_declared;
use crate::registry::{BootComponentRegistry, RegistryError, ServiceRegistryProvider};
use crate::strategy::{InstallerCatalog, StrategyError};
use log::{debug, info};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// What the host package manager knows about one package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    pub name: String,
    pub package_type: String,
    /// Free-form extra metadata published by the package.
    pub extra: Value,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>, package_type: impl Into<String>, extra: Value) -> Self {
        Self {
            name: name.into(),
            package_type: package_type.into(),
            extra,
        }
    }
}

/// Result of handling one package event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The package declares no contributions.
    Skipped,
    Applied,
    Uninstalled(UninstallReport),
}

/// Adapter between host package events and contribution installers.
pub struct PackageEventHandler {
    config: HostConfig,
    boot: Rc<dyn BootComponentRegistry>,
    services: Rc<dyn ServiceRegistryProvider>,
    catalog: InstallerCatalog,
}

impl PackageEventHandler {
    pub fn new(
        config: HostConfig,
        boot: Rc<dyn BootComponentRegistry>,
        services: Rc<dyn ServiceRegistryProvider>,
        catalog: InstallerCatalog,
    ) -> Self {
        Self {
            config,
            boot,
            services,
            catalog,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Returns whether packages of `package_type` are handled here.
    pub fn supports(&self, package_type: &str) -> bool {
        package_type.starts_with(self.config.package_type_prefix.as_str())
    }

    pub fn on_install(&self, package: &PackageInfo) -> Result<Outcome, HostError> {
        let Some(installer) = self.installer_for(package)? else {
            return Ok(Outcome::Skipped);
        };
        installer.install()?;
        info!(
            "event=package_installed module=host status=ok package={}",
            package.name
        );
        Ok(Outcome::Applied)
    }

    /// Applies the target package's declaration; the initial one is not diffed.
    pub fn on_update(
        &self,
        initial: &PackageInfo,
        target: &PackageInfo,
    ) -> Result<Outcome, HostError> {
        debug!(
            "event=package_update module=host status=start package={} from={}",
            target.name, initial.name
        );
        let Some(installer) = self.installer_for(target)? else {
            return Ok(Outcome::Skipped);
        };
        installer.update()?;
        info!(
            "event=package_updated module=host status=ok package={}",
            target.name
        );
        Ok(Outcome::Applied)
    }

    pub fn on_uninstall(&self, package: &PackageInfo) -> Result<Outcome, HostError> {
        let Some(installer) = self.installer_for(package)? else {
            return Ok(Outcome::Skipped);
        };
        let report = match installer.uninstall() {
            Ok(report) => report,
            // Custom installers may surface a missing component as an error.
            Err(InstallError::Registry {
                source: RegistryError::ComponentNotFound(_),
                ..
            }) => UninstallReport::default(),
            Err(err) => return Err(err.into()),
        };
        info!(
            "event=package_uninstalled module=host status=ok package={} failed_services={}",
            package.name,
            report.failures.len()
        );
        Ok(Outcome::Uninstalled(report))
    }

    fn installer_for(
        &self,
        package: &PackageInfo,
    ) -> Result<Option<Box<dyn PackageInstaller>>, HostError> {
        let declaration = match package.extra.get(self.config.extra_key.as_str()) {
            Some(value) if is_declared(value) => value,
            _ => {
                debug!(
                    "event=package_event module=host status=skip package={} reason=no_declaration",
                    package.name
                );
                return Ok(None);
            }
        };

        let context = InstallContext::new(
            self.config.application_dir.clone(),
            Rc::clone(&self.services),
        );
        let mut installer = self.catalog.select(
            &package.name,
            declaration,
            &self.config.installer_key,
            Rc::clone(&self.boot),
            context,
        )?;
        installer.configure(declaration, &package.name)?;
        Ok(Some(installer))
    }
}

/// Host adapter failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Strategy(StrategyError),
    Install(InstallError),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strategy(err) => write!(f, "{err}"),
            Self::Install(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Strategy(err) => Some(err),
            Self::Install(err) => Some(err),
        }
    }
}

impl From<StrategyError> for HostError {
    fn from(value: StrategyError) -> Self {
        Self::Strategy(value)
    }
}

impl From<InstallError> for HostError {
    fn from(value: InstallError) -> Self {
        Self::Install(value)
    }
}
