//! Contribution manifest parsing and validation.
//!
//! # Responsibility
//! - Parse one package's raw declaration into bootloader groups and services.
//! - Reject malformed declarations before any registry is touched.
//!
//! # Invariants
//! - `groups` and flat `bootloaders` are mutually exclusive in a package section.
//! - A present package section must declare one of the two forms.
//! - Services are an all-or-nothing set: one invalid entry fails the whole parse.
//!
//! Absent keys, `null`, `false`, empty strings, empty lists and empty objects
//! all count as "not declared".

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Package section key.
pub const PACKAGE: &str = "package";
/// Service list key.
pub const SERVICES: &str = "services";
/// Package name override key inside the package section.
pub const NAME: &str = "name";
/// Multi-group form key inside the package section.
pub const GROUPS: &str = "groups";
/// Flat single-group form key inside the package section.
pub const BOOTLOADERS: &str = "bootloaders";

/// One filterable set of bootloaders registered as part of a boot component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootloaderGroup {
    /// Bootstrap hook identifiers, in declared order. Never empty.
    pub bootloaders: Vec<String>,
    /// Application targets; empty means all applications.
    pub applications: BTreeSet<String>,
    /// Inclusion filter on active runtime tags, evaluated by the registry.
    pub runtime_tags: BTreeSet<String>,
    /// Exclusion filter on active runtime tags, evaluated by the registry.
    pub exclude_tags: BTreeSet<String>,
    pub is_active: bool,
    /// Logical sub-group; `None` is the default group.
    pub group: Option<String>,
}

/// Declared shape of one registrable service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub name: String,
    pub class_name: String,
    pub is_active: bool,
    pub config: Map<String, Value>,
    pub include_tags: BTreeSet<String>,
    pub exclude_tags: BTreeSet<String>,
}

/// Validated, in-memory form of one package's contributions.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionManifest {
    package_name: String,
    bootloader_groups: Vec<BootloaderGroup>,
    services: Vec<ServiceDescriptor>,
}

impl ContributionManifest {
    /// Creates a manifest that contributes nothing.
    pub fn empty(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            bootloader_groups: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Parses and validates a raw package declaration.
    ///
    /// `package_name` is the host's identifier for the package; a `name`
    /// inside the package section overrides it for every registry key.
    ///
    /// # Errors
    /// - `ConflictingDeclaration` when both `groups` and `bootloaders` are set.
    /// - `MissingContribution` when a package section declares neither.
    /// - `MissingBootloaders` when a group has no bootloaders.
    /// - `MissingServiceName` / `MissingServiceClass` for incomplete services.
    /// - `DuplicateServiceName` when two services share one name.
    /// - `Malformed` when a declared value has the wrong shape.
    pub fn parse(package_name: &str, raw: &Value) -> Result<Self, ManifestError> {
        if !is_declared(raw) {
            return Ok(Self::empty(package_name));
        }
        let Some(root) = raw.as_object() else {
            return Err(ManifestError::malformed(
                package_name,
                "declaration must be an object",
            ));
        };

        let package = match root.get(PACKAGE).filter(|value| is_declared(value)) {
            None => None,
            Some(Value::Object(section)) => Some(section),
            Some(_) => {
                return Err(ManifestError::malformed(
                    package_name,
                    "`package` must be an object",
                ))
            }
        };

        let resolved_name = match package.and_then(|section| section.get(NAME)) {
            Some(value) if is_declared(value) => match value {
                Value::String(name) => name.clone(),
                _ => {
                    return Err(ManifestError::malformed(
                        package_name,
                        "`package.name` must be a string",
                    ))
                }
            },
            _ => package_name.to_string(),
        };

        let bootloader_groups = match package {
            Some(section) => parse_groups(&resolved_name, section)?,
            None => Vec::new(),
        };

        let services = match root.get(SERVICES) {
            Some(Value::Array(entries)) => parse_services(&resolved_name, entries)?,
            _ => Vec::new(),
        };

        Ok(Self {
            package_name: resolved_name,
            bootloader_groups,
            services,
        })
    }

    /// Resolved package name used as the boot component key.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn bootloader_groups(&self) -> &[BootloaderGroup] {
        &self.bootloader_groups
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn has_bootloaders(&self) -> bool {
        !self.bootloader_groups.is_empty()
    }

    pub fn has_services(&self) -> bool {
        !self.services.is_empty()
    }

    /// Returns whether this manifest contributes nothing at all.
    pub fn is_empty(&self) -> bool {
        !self.has_bootloaders() && !self.has_services()
    }
}

/// Returns whether a raw value counts as a declaration.
pub(crate) fn is_declared(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Number(_) => true,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    bootloaders: Option<Vec<String>>,
    applications: Option<Vec<String>>,
    runtime_tags: Option<Vec<String>>,
    exclude_tags: Option<Vec<String>>,
    is_active: Option<bool>,
    group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawService {
    name: Option<String>,
    #[serde(rename = "class")]
    class_name: Option<String>,
    is_active: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_config")]
    config: Option<Map<String, Value>>,
    tags: Option<Vec<String>>,
    exclude_tags: Option<Vec<String>>,
}

/// Reads a service config map; an empty list stands for an empty map.
fn deserialize_config<'de, D>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Object(fields) => Ok(Some(fields)),
        Value::Array(items) if items.is_empty() => Ok(Some(Map::new())),
        other => Err(serde::de::Error::custom(format!(
            "invalid type: {other}, expected a map"
        ))),
    }
}

fn parse_groups(
    package_name: &str,
    section: &Map<String, Value>,
) -> Result<Vec<BootloaderGroup>, ManifestError> {
    let groups = section.get(GROUPS).filter(|value| is_declared(value));
    let flat = section.get(BOOTLOADERS).filter(|value| is_declared(value));

    let raw_groups: Vec<Value> = match (groups, flat) {
        (Some(_), Some(_)) => {
            return Err(ManifestError::ConflictingDeclaration {
                package: package_name.to_string(),
            })
        }
        (None, None) => {
            return Err(ManifestError::MissingContribution {
                package: package_name.to_string(),
            })
        }
        (Some(Value::Array(entries)), None) => entries.clone(),
        (Some(_), None) => {
            return Err(ManifestError::malformed(
                package_name,
                "`package.groups` must be a list",
            ))
        }
        // Flat form: the package section itself is the only group.
        (None, Some(_)) => vec![Value::Object(section.clone())],
    };

    raw_groups
        .into_iter()
        .enumerate()
        .map(|(index, value)| parse_group(package_name, index, value))
        .collect()
}

fn parse_group(
    package_name: &str,
    index: usize,
    value: Value,
) -> Result<BootloaderGroup, ManifestError> {
    let raw: RawGroup = serde_json::from_value(value).map_err(|err| {
        ManifestError::malformed(package_name, format!("bootloader group #{index}: {err}"))
    })?;

    let bootloaders = raw.bootloaders.unwrap_or_default();
    if bootloaders.is_empty() {
        return Err(ManifestError::MissingBootloaders {
            package: package_name.to_string(),
            group_index: index,
        });
    }

    Ok(BootloaderGroup {
        bootloaders,
        applications: into_set(raw.applications),
        runtime_tags: into_set(raw.runtime_tags),
        exclude_tags: into_set(raw.exclude_tags),
        is_active: raw.is_active.unwrap_or(true),
        group: raw.group.filter(|name| !name.is_empty()),
    })
}

fn parse_services(
    package_name: &str,
    entries: &[Value],
) -> Result<Vec<ServiceDescriptor>, ManifestError> {
    let mut seen = BTreeSet::new();
    let mut services = Vec::with_capacity(entries.len());

    for (index, value) in entries.iter().enumerate() {
        // An entry that is not an object cannot carry a name.
        if !value.is_object() {
            return Err(ManifestError::MissingServiceName {
                package: package_name.to_string(),
                index,
            });
        }
        let raw: RawService = serde_json::from_value(value.clone()).map_err(|err| {
            ManifestError::malformed(package_name, format!("service #{index}: {err}"))
        })?;

        let name = match raw.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(ManifestError::MissingServiceName {
                    package: package_name.to_string(),
                    index,
                })
            }
        };
        let class_name = match raw.class_name {
            Some(class_name) if !class_name.is_empty() => class_name,
            _ => {
                return Err(ManifestError::MissingServiceClass {
                    package: package_name.to_string(),
                    service: name,
                })
            }
        };
        if !seen.insert(name.clone()) {
            return Err(ManifestError::DuplicateServiceName {
                package: package_name.to_string(),
                service: name,
            });
        }

        services.push(ServiceDescriptor {
            name,
            class_name,
            is_active: raw.is_active.unwrap_or(false),
            config: raw.config.unwrap_or_default(),
            include_tags: into_set(raw.tags),
            exclude_tags: into_set(raw.exclude_tags),
        });
    }

    Ok(services)
}

fn into_set(values: Option<Vec<String>>) -> BTreeSet<String> {
    values.unwrap_or_default().into_iter().collect()
}

/// Structural/authoring errors in a package declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    Malformed { package: String, message: String },
    ConflictingDeclaration { package: String },
    MissingContribution { package: String },
    MissingBootloaders { package: String, group_index: usize },
    MissingServiceName { package: String, index: usize },
    MissingServiceClass { package: String, service: String },
    DuplicateServiceName { package: String, service: String },
}

impl ManifestError {
    fn malformed(package: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            package: package.to_string(),
            message: message.into(),
        }
    }

    /// Package the error is scoped to.
    pub fn package(&self) -> &str {
        match self {
            Self::Malformed { package, .. }
            | Self::ConflictingDeclaration { package }
            | Self::MissingContribution { package }
            | Self::MissingBootloaders { package, .. }
            | Self::MissingServiceName { package, .. }
            | Self::MissingServiceClass { package, .. }
            | Self::DuplicateServiceName { package, .. } => package,
        }
    }
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { package, message } => {
                write!(f, "malformed declaration for package {package}: {message}")
            }
            Self::ConflictingDeclaration { package } => write!(
                f,
                "groups and bootloaders cannot be declared at the same time for package {package}"
            ),
            Self::MissingContribution { package } => {
                write!(f, "bootloaders or groups must be declared for package {package}")
            }
            Self::MissingBootloaders {
                package,
                group_index,
            } => write!(
                f,
                "bootloader group #{group_index} declares no bootloaders for package {package}"
            ),
            Self::MissingServiceName { package, index } => {
                write!(f, "service #{index} has no name in package {package}")
            }
            Self::MissingServiceClass { package, service } => write!(
                f,
                "service class is not declared for service {service} in package {package}"
            ),
            Self::DuplicateServiceName { package, service } => {
                write!(f, "service {service} is declared twice in package {package}")
            }
        }
    }
}

impl Error for ManifestError {}
