//! Command-line dry-run tool.
//!
//! # Responsibility
//! - Validate a package contribution declaration from a JSON file.
//! - Show what install/update/uninstall would leave in the registries,
//!   using in-memory registries only.

use boothook_core::{
    default_log_level, init_stderr_logging, BootComponent, ContributionManifest,
    DefaultPackageInstaller, InMemoryBootRegistry, InMemoryServiceProvider,
    InMemoryServiceRegistry, InstallContext, PackageInstaller, ServiceDescriptor,
    UninstallReport,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Debug, Parser)]
#[command(name = "boothook", version, about = "Inspect package contribution declarations")]
struct Cli {
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse and validate a declaration.
    Check {
        manifest: PathBuf,
        #[arg(long)]
        package: String,
    },
    /// Run an operation against empty in-memory registries and print the result.
    Plan {
        operation: Operation,
        manifest: PathBuf,
        #[arg(long)]
        package: String,
        /// Application root handed to the installer.
        #[arg(long, default_value = ".")]
        app_dir: PathBuf,
        /// Run the operation a second time.
        #[arg(long)]
        twice: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Operation {
    Install,
    Update,
    Uninstall,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    components: Vec<BootComponent>,
    services: Vec<ServiceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    uninstall_failures: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_stderr_logging(level) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Check { manifest, package } => {
            let raw = read_declaration(&manifest)?;
            let parsed = ContributionManifest::parse(&package, &raw).map_err(|err| err.to_string())?;
            println!("component={}", parsed.package_name());
            println!("groups={}", parsed.bootloader_groups().len());
            let names: Vec<&str> = parsed
                .services()
                .iter()
                .map(|service| service.name.as_str())
                .collect();
            println!("services={}", names.join(","));
            Ok(())
        }
        Command::Plan {
            operation,
            manifest,
            package,
            app_dir,
            twice,
        } => {
            let raw = read_declaration(&manifest)?;
            let output = plan(operation, &raw, &package, app_dir, twice)?;
            let rendered = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
            println!("{rendered}");
            Ok(())
        }
    }
}

fn plan(
    operation: Operation,
    raw: &Value,
    package: &str,
    app_dir: PathBuf,
    twice: bool,
) -> Result<PlanOutput, String> {
    let boot = Rc::new(InMemoryBootRegistry::new());
    let services = Rc::new(InMemoryServiceRegistry::new());
    let provider = Rc::new(InMemoryServiceProvider::new(services.clone()));

    let mut engine =
        DefaultPackageInstaller::new(boot.clone(), InstallContext::new(app_dir, provider));
    engine
        .configure(raw, package)
        .map_err(|err| err.to_string())?;

    let runs = if twice { 2 } else { 1 };
    let mut last_report = UninstallReport::default();
    match operation {
        Operation::Install => {
            for _ in 0..runs {
                engine.install().map_err(|err| err.to_string())?;
            }
        }
        Operation::Update => {
            for _ in 0..runs {
                engine.update().map_err(|err| err.to_string())?;
            }
        }
        Operation::Uninstall => {
            // Seed the registries with what the package would have installed.
            engine.install().map_err(|err| err.to_string())?;
            for _ in 0..runs {
                last_report = engine.uninstall().map_err(|err| err.to_string())?;
            }
        }
    }

    Ok(PlanOutput {
        components: boot.snapshot(),
        services: services.snapshot(),
        uninstall_failures: last_report
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.service, failure.error))
            .collect(),
    })
}

fn read_declaration(path: &Path) -> Result<Value, String> {
    let input = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
    serde_json::from_str(&input).map_err(|err| format!("invalid JSON in `{}`: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{plan, Operation};
    use serde_json::json;
    use std::path::PathBuf;

    fn widget() -> serde_json::Value {
        json!({
            "package": { "bootloaders": ["Boot\\Hook1", "Boot\\Hook2"] },
            "services": [ { "name": "cache", "class": "Svc\\Cache", "isActive": true } ]
        })
    }

    #[test]
    fn install_plan_lists_component_and_service() {
        let output = plan(Operation::Install, &widget(), "acme/widget", PathBuf::from("."), false)
            .expect("plan");
        assert_eq!(output.components.len(), 1);
        assert_eq!(output.components[0].name(), "acme/widget");
        assert_eq!(output.services.len(), 1);
    }

    #[test]
    fn uninstall_plan_twice_leaves_registries_empty() {
        let output = plan(Operation::Uninstall, &widget(), "acme/widget", PathBuf::from("."), true)
            .expect("plan");
        assert!(output.components.is_empty());
        assert!(output.services.is_empty());
        assert!(output.uninstall_failures.is_empty());
    }

    #[test]
    fn invalid_declaration_reports_package() {
        let raw = json!({ "package": { "applications": ["web"] } });
        let err = plan(Operation::Install, &raw, "acme/none", PathBuf::from("."), false)
            .expect_err("must fail");
        assert!(err.contains("acme/none"));
    }
}
