//! Package-contribution reconciliation for boothook hosts.
//! Applies a package's declared bootloader groups and services to the host's
//! boot-component and service registries on install, update and uninstall.

pub mod config;
pub mod engine;
pub mod host;
pub mod logging;
pub mod model;
pub mod registry;
pub mod strategy;

pub use config::{ConfigError, HostConfig};
pub use engine::{
    DefaultPackageInstaller, InstallContext, InstallError, InstallResult, PackageInstaller,
    ServiceFailure, UninstallReport,
};
pub use host::{HostError, Outcome, PackageEventHandler, PackageInfo};
pub use logging::{default_log_level, init_logging, init_stderr_logging};
pub use model::manifest::{BootloaderGroup, ContributionManifest, ManifestError, ServiceDescriptor};
pub use registry::{
    BootComponent, BootComponentRegistry, InMemoryBootRegistry, InMemoryServiceProvider,
    InMemoryServiceRegistry, RegistryError, RegistryResult, ServiceRegistry,
    ServiceRegistryProvider,
};
pub use strategy::{default_installer, InstallerCatalog, InstallerFactory, StrategyError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
