//! Package-contribution reconciliation engine.
//!
//! # Responsibility
//! - Apply a parsed manifest to the boot-component and service registries on
//!   install and update.
//! - Remove a package's contributions on uninstall without aborting on a
//!   single failed service removal.
//!
//! # Invariants
//! - The manifest is validated before any registry mutation.
//! - All groups of a package are committed with exactly one `add_component`.
//! - Empty manifests never touch either registry.
//! - The service registry handle is opened at most once per engine instance.

use crate::model::manifest::{ContributionManifest, ManifestError};
use crate::registry::{
    BootComponentRegistry, RegistryError, ServiceRegistry, ServiceRegistryProvider,
};
use log::{debug, info, warn};
use once_cell::unsync::OnceCell;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::rc::Rc;

pub type InstallResult<T> = Result<T, InstallError>;

/// Three-operation contract shared by the default engine and custom installers.
pub trait PackageInstaller {
    /// Hands the installer its package declaration before any operation runs.
    fn configure(&mut self, _declaration: &Value, _package_name: &str) -> InstallResult<()> {
        Ok(())
    }

    fn install(&self) -> InstallResult<()>;

    fn update(&self) -> InstallResult<()>;

    fn uninstall(&self) -> InstallResult<UninstallReport>;
}

/// Application-level context every installer is constructed with.
#[derive(Clone)]
pub struct InstallContext {
    /// Application root; also used to open the service registry.
    pub application_dir: PathBuf,
    pub services: Rc<dyn ServiceRegistryProvider>,
}

impl InstallContext {
    pub fn new(
        application_dir: impl Into<PathBuf>,
        services: Rc<dyn ServiceRegistryProvider>,
    ) -> Self {
        Self {
            application_dir: application_dir.into(),
            services,
        }
    }
}

/// One service whose removal failed during uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub service: String,
    pub error: RegistryError,
}

/// Per-service outcomes of one uninstall run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    /// Services removed by this run.
    pub removed: Vec<String>,
    /// Services the registry did not know about.
    pub absent: Vec<String>,
    pub failures: Vec<ServiceFailure>,
}

impl UninstallReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Default reconciliation engine.
pub struct DefaultPackageInstaller {
    boot: Rc<dyn BootComponentRegistry>,
    context: InstallContext,
    manifest: ContributionManifest,
    service_registry: OnceCell<Rc<dyn ServiceRegistry>>,
}

impl DefaultPackageInstaller {
    /// Creates an engine with an empty manifest; see [`PackageInstaller::configure`].
    pub fn new(boot: Rc<dyn BootComponentRegistry>, context: InstallContext) -> Self {
        Self {
            boot,
            context,
            manifest: ContributionManifest::empty(""),
            service_registry: OnceCell::new(),
        }
    }

    /// Creates an engine for an already parsed manifest.
    pub fn with_manifest(
        boot: Rc<dyn BootComponentRegistry>,
        context: InstallContext,
        manifest: ContributionManifest,
    ) -> Self {
        Self {
            manifest,
            ..Self::new(boot, context)
        }
    }

    pub fn manifest(&self) -> &ContributionManifest {
        &self.manifest
    }

    fn package(&self) -> &str {
        self.manifest.package_name()
    }

    fn services(&self) -> InstallResult<Rc<dyn ServiceRegistry>> {
        self.service_registry
            .get_or_try_init(|| {
                debug!(
                    "event=service_registry_open module=engine status=start package={} app_dir={}",
                    self.package(),
                    self.context.application_dir.display()
                );
                self.context.services.open(&self.context.application_dir)
            })
            .map(Rc::clone)
            .map_err(|source| InstallError::ServiceRegistryUnavailable {
                package: self.package().to_string(),
                source,
            })
    }

    fn apply(&self, operation: &'static str) -> InstallResult<()> {
        if self.manifest.is_empty() {
            debug!(
                "event={operation} module=engine status=skip package={} reason=empty_manifest",
                self.package()
            );
            return Ok(());
        }

        if self.manifest.has_bootloaders() {
            self.install_bootloaders()?;
        }
        if self.manifest.has_services() {
            self.install_services()?;
        }

        info!(
            "event={operation} module=engine status=ok package={} groups={} services={}",
            self.package(),
            self.manifest.bootloader_groups().len(),
            self.manifest.services().len()
        );
        Ok(())
    }

    fn install_bootloaders(&self) -> InstallResult<()> {
        let mut component = self.boot.create_component(self.package());
        for group in self.manifest.bootloader_groups() {
            component.add(group.clone());
        }

        self.boot
            .add_component(component)
            .map_err(|source| self.registry_error(source))
    }

    fn install_services(&self) -> InstallResult<()> {
        let registry = self.services()?;
        for descriptor in self.manifest.services() {
            registry
                .install_service(descriptor)
                .map_err(|source| self.registry_error(source))?;
            debug!(
                "event=service_install module=engine status=ok package={} service={}",
                self.package(),
                descriptor.name
            );
        }
        Ok(())
    }

    fn uninstall_services(&self, report: &mut UninstallReport) -> InstallResult<()> {
        let registry = self.services()?;
        for descriptor in self.manifest.services() {
            match registry.uninstall_service(&descriptor.name) {
                Ok(()) => report.removed.push(descriptor.name.clone()),
                Err(RegistryError::ServiceNotFound(_)) => {
                    debug!(
                        "event=service_uninstall module=engine status=skip package={} service={} reason=absent",
                        self.package(),
                        descriptor.name
                    );
                    report.absent.push(descriptor.name.clone());
                }
                Err(error) => {
                    warn!(
                        "event=service_uninstall module=engine status=error package={} service={} error={}",
                        self.package(),
                        descriptor.name,
                        error
                    );
                    report.failures.push(ServiceFailure {
                        service: descriptor.name.clone(),
                        error,
                    });
                }
            }
        }
        Ok(())
    }

    fn registry_error(&self, source: RegistryError) -> InstallError {
        InstallError::Registry {
            package: self.package().to_string(),
            source,
        }
    }
}

impl PackageInstaller for DefaultPackageInstaller {
    fn configure(&mut self, declaration: &Value, package_name: &str) -> InstallResult<()> {
        self.manifest = ContributionManifest::parse(package_name, declaration)?;
        self.service_registry = OnceCell::new();
        Ok(())
    }

    fn install(&self) -> InstallResult<()> {
        self.apply("contributions_install")
    }

    /// Re-applies the target manifest; registries replace entries by name.
    fn update(&self) -> InstallResult<()> {
        self.apply("contributions_update")
    }

    fn uninstall(&self) -> InstallResult<UninstallReport> {
        let mut report = UninstallReport::default();
        if self.manifest.is_empty() {
            debug!(
                "event=contributions_uninstall module=engine status=skip package={} reason=empty_manifest",
                self.package()
            );
            return Ok(report);
        }

        if self.manifest.has_services() {
            self.uninstall_services(&mut report)?;
        }

        match self.boot.remove_component(self.package()) {
            Ok(()) | Err(RegistryError::ComponentNotFound(_)) => {}
            Err(source) => return Err(self.registry_error(source)),
        }

        info!(
            "event=contributions_uninstall module=engine status=ok package={} removed={} absent={} failed={}",
            self.package(),
            report.removed.len(),
            report.absent.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// Engine failures, always scoped to one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    Manifest(ManifestError),
    Registry {
        package: String,
        source: RegistryError,
    },
    ServiceRegistryUnavailable {
        package: String,
        source: RegistryError,
    },
}

impl Display for InstallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manifest(err) => write!(f, "{err}"),
            Self::Registry { package, source } => {
                write!(f, "registry operation failed for package {package}: {source}")
            }
            Self::ServiceRegistryUnavailable { package, source } => write!(
                f,
                "cannot open service registry for package {package}: {source}"
            ),
        }
    }
}

impl Error for InstallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Manifest(err) => Some(err),
            Self::Registry { source, .. } | Self::ServiceRegistryUnavailable { source, .. } => {
                Some(source)
            }
        }
    }
}

impl From<ManifestError> for InstallError {
    fn from(value: ManifestError) -> Self {
        Self::Manifest(value)
    }
}
