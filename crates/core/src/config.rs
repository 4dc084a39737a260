//! Batch configuration.
//!
//! The batch is read from a JSON document and validated up front, before any
//! repository access. Everything that is wrong with the *shape* of the
//! configuration surfaces here as [`ModulizerError::Configuration`].

use crate::error::{ModulizerError, Result};
use modulizer_api::ArtifactCoordinate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

pub const DEFAULT_OUTPUT_DIRECTORY: &str = "target/generated-sources/modules";

/// What happens to the rest of the batch when one module fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort on the first module failure
    FailFast,
    /// Process every module and report all failures at the end
    #[default]
    Collect,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" => Ok(FailurePolicy::FailFast),
            "collect" => Ok(FailurePolicy::Collect),
            other => Err(format!(
                "unknown failure policy '{}', expected 'fail-fast' or 'collect'",
                other
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => f.write_str("fail-fast"),
            FailurePolicy::Collect => f.write_str("collect"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfiguration {
    /// Local repository; defaults to `~/.m2/repository`
    #[serde(default)]
    pub local: Option<PathBuf>,
    /// Remote repositories, consulted in order. Only `file://` URLs are supported.
    #[serde(default)]
    pub remotes: Vec<String>,
}

impl RepositoryConfiguration {
    pub fn local_root(&self) -> PathBuf {
        self.local.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".m2/repository")
        })
    }

    pub fn remote_roots(&self) -> Result<Vec<PathBuf>> {
        self.remotes
            .iter()
            .map(|remote| {
                let url = Url::parse(remote).map_err(|e| {
                    ModulizerError::Configuration(format!(
                        "invalid remote repository URL '{}': {}",
                        remote, e
                    ))
                })?;
                if url.scheme() != "file" {
                    return Err(ModulizerError::Configuration(format!(
                        "unsupported repository transport '{}' in '{}'",
                        url.scheme(),
                        remote
                    )));
                }
                url.to_file_path().map_err(|_| {
                    ModulizerError::Configuration(format!(
                        "remote repository URL '{}' is not a local path",
                        remote
                    ))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfoConfiguration {
    #[serde(default)]
    pub name: Option<String>,
    /// `;`-separated export rules
    #[serde(default)]
    pub exports: Option<String>,
    /// `;`-separated require rules
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default, deserialize_with = "deserialize_uses")]
    pub uses: Vec<String>,
    #[serde(default)]
    pub add_service_uses: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfiguration {
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub module_info: ModuleInfoConfiguration,
    #[serde(default)]
    pub additional_dependencies: Vec<String>,
}

/// Single-module overrides, processed instead of the configured module list.
#[derive(Debug, Clone, Default)]
pub struct ModuleOverrides {
    pub artifact: String,
    pub module_name: Option<String>,
    pub exports: Option<String>,
    /// Comma-separated coordinates
    pub additional_dependencies: Option<String>,
    pub add_service_uses: bool,
}

impl ModuleConfiguration {
    pub fn from_overrides(overrides: &ModuleOverrides) -> Self {
        let additional_dependencies = overrides
            .additional_dependencies
            .as_deref()
            .map(|deps| {
                deps.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            artifact: Some(overrides.artifact.clone()),
            file: None,
            module_info: ModuleInfoConfiguration {
                name: overrides.module_name.clone(),
                exports: overrides.exports.clone(),
                requires: None,
                uses: Vec::new(),
                add_service_uses: overrides.add_service_uses,
            },
            additional_dependencies,
        }
    }

    fn describe(&self) -> String {
        match (&self.artifact, &self.file) {
            (Some(artifact), _) => artifact.clone(),
            (None, Some(file)) => file.display().to_string(),
            (None, None) => "<unnamed module>".to_string(),
        }
    }

    /// Checks the configuration and turns it into a [`ModuleDefinition`].
    pub fn validate(&self) -> Result<ModuleDefinition> {
        let source = match (&self.artifact, &self.file) {
            (Some(artifact), Some(_)) => {
                return Err(ModulizerError::Configuration(format!(
                    "Only one of 'file' and 'artifact' may be specified, but both are given for {}",
                    artifact
                )));
            }
            (Some(artifact), None) => ModuleSource::Artifact(parse_coordinate(artifact)?),
            (None, Some(file)) => ModuleSource::File(file.clone()),
            (None, None) => {
                return Err(ModulizerError::Configuration(
                    "One of 'file' and 'artifact' must be specified".to_string(),
                ));
            }
        };

        let name = self
            .module_info
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ModulizerError::Configuration(format!(
                    "A module name must be specified for {}",
                    self.describe()
                ))
            })?
            .to_string();

        let additional_dependencies = self
            .additional_dependencies
            .iter()
            .map(|d| parse_coordinate(d))
            .collect::<Result<Vec<_>>>()?;

        Ok(ModuleDefinition {
            source,
            name,
            exports: self.module_info.exports.clone(),
            requires: self.module_info.requires.clone(),
            uses: self.module_info.uses.clone(),
            add_service_uses: self.module_info.add_service_uses,
            additional_dependencies,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Artifact(ArtifactCoordinate),
    File(PathBuf),
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Artifact(c) => write!(f, "{}", c),
            ModuleSource::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// A validated module configuration
#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    pub source: ModuleSource,
    pub name: String,
    pub exports: Option<String>,
    pub requires: Option<String>,
    pub uses: Vec<String>,
    pub add_service_uses: bool,
    pub additional_dependencies: Vec<ArtifactCoordinate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfiguration {
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub repository: RepositoryConfiguration,
    #[serde(default)]
    pub modules: Vec<ModuleConfiguration>,
}

/// The validated batch: the modules that make up the name registry and the
/// modules whose descriptors are generated in this run.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub declared: Vec<ModuleDefinition>,
    pub targets: Vec<ModuleDefinition>,
}

impl BatchPlan {
    /// Modules that receive registry names: the declared modules plus any
    /// target not among them. A target sharing its source with a declared
    /// module takes that module's place.
    pub fn registry_modules(&self) -> Vec<ModuleDefinition> {
        let mut modules: Vec<ModuleDefinition> = self
            .declared
            .iter()
            .map(|declared| {
                self.targets
                    .iter()
                    .find(|t| t.source == declared.source)
                    .unwrap_or(declared)
                    .clone()
            })
            .collect();
        for target in &self.targets {
            if !self.declared.iter().any(|d| d.source == target.source) {
                modules.push(target.clone());
            }
        }
        modules
    }
}

impl BatchConfiguration {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ModulizerError::io(path, e))?;
        Self::from_json_str(&content)
    }

    pub fn output_directory(&self) -> PathBuf {
        self.output_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY))
    }

    /// Validates the whole batch. With `overrides`, the override module is the
    /// only target while the configured modules still populate the registry.
    pub fn validate(&self, overrides: Option<&ModuleOverrides>) -> Result<BatchPlan> {
        self.repository.remote_roots()?;

        let declared = self
            .modules
            .iter()
            .map(ModuleConfiguration::validate)
            .collect::<Result<Vec<_>>>()?;

        let targets = match overrides {
            Some(overrides) => vec![ModuleConfiguration::from_overrides(overrides).validate()?],
            None if declared.is_empty() => {
                return Err(ModulizerError::Configuration(
                    "No modules configured".to_string(),
                ));
            }
            None => declared.clone(),
        };

        Ok(BatchPlan { declared, targets })
    }
}

fn parse_coordinate(value: &str) -> Result<ArtifactCoordinate> {
    value
        .parse()
        .map_err(|e| ModulizerError::Configuration(format!("invalid artifact: {}", e)))
}

fn deserialize_uses<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Uses {
        List(Vec<String>),
        Joined(String),
    }

    let entries = match Option::<Uses>::deserialize(deserializer)? {
        Some(Uses::List(list)) => list,
        Some(Uses::Joined(joined)) => joined.split(';').map(String::from).collect(),
        None => Vec::new(),
    };

    Ok(entries
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_configuration() {
        let config = BatchConfiguration::from_json_str(
            r#"{
                "failurePolicy": "collect",
                "repository": { "local": "/tmp/repo", "remotes": ["file:///srv/mirror"] },
                "modules": [{
                    "artifact": "com.example:a:1.0",
                    "moduleInfo": {
                        "name": "com.example.a",
                        "exports": "com.example.a.*",
                        "uses": "com.example.Spi; com.example.Other ;",
                        "addServiceUses": true
                    },
                    "additionalDependencies": ["com.example:extra:2.0"]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.failure_policy, FailurePolicy::Collect);
        assert!(!config.parallel);
        assert_eq!(
            config.output_directory(),
            PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)
        );
        assert_eq!(
            config.repository.remote_roots().unwrap(),
            vec![PathBuf::from("/srv/mirror")]
        );

        let plan = config.validate(None).unwrap();
        assert_eq!(plan.targets.len(), 1);
        let module = &plan.targets[0];
        assert_eq!(module.name, "com.example.a");
        assert_eq!(module.uses, vec!["com.example.Spi", "com.example.Other"]);
        assert!(module.add_service_uses);
        assert_eq!(
            module.source,
            ModuleSource::Artifact(ArtifactCoordinate::new("com.example", "a", "1.0"))
        );
        assert_eq!(
            module.additional_dependencies,
            vec![ArtifactCoordinate::new("com.example", "extra", "2.0")]
        );
    }

    #[test]
    fn test_uses_as_list() {
        let info: ModuleInfoConfiguration =
            serde_json::from_str(r#"{ "name": "m", "uses": ["a.B", " ", "c.D "] }"#).unwrap();
        assert_eq!(info.uses, vec!["a.B", "c.D"]);
    }

    #[test]
    fn test_file_and_artifact_are_exclusive() {
        let both = ModuleConfiguration {
            artifact: Some("g:a:1".to_string()),
            file: Some(PathBuf::from("a.jar")),
            module_info: ModuleInfoConfiguration {
                name: Some("a".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = both.validate().unwrap_err();
        assert!(err.is_batch_fatal());
        assert!(err.to_string().contains("Only one of 'file' and 'artifact'"));

        let neither = ModuleConfiguration {
            module_info: ModuleInfoConfiguration {
                name: Some("a".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            neither.validate(),
            Err(ModulizerError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_name_and_bad_coordinates() {
        let unnamed = ModuleConfiguration {
            artifact: Some("g:a:1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            unnamed.validate(),
            Err(ModulizerError::Configuration(_))
        ));

        let bad_extra = ModuleConfiguration {
            artifact: Some("g:a:1".to_string()),
            module_info: ModuleInfoConfiguration {
                name: Some("a".to_string()),
                ..Default::default()
            },
            additional_dependencies: vec!["not-a-coordinate".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            bad_extra.validate(),
            Err(ModulizerError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_batch_and_unsupported_remote() {
        assert!(matches!(
            BatchConfiguration::default().validate(None),
            Err(ModulizerError::Configuration(_))
        ));

        let config = BatchConfiguration {
            repository: RepositoryConfiguration {
                local: None,
                remotes: vec!["https://repo.maven.apache.org/maven2".to_string()],
            },
            ..Default::default()
        };
        let err = config.validate(None).unwrap_err();
        assert!(err.to_string().contains("unsupported repository transport"));
    }

    #[test]
    fn test_overrides_replace_targets_but_keep_declared() {
        let config = BatchConfiguration {
            modules: vec![ModuleConfiguration {
                artifact: Some("g:b:1".to_string()),
                module_info: ModuleInfoConfiguration {
                    name: Some("mod.b".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };
        let overrides = ModuleOverrides {
            artifact: "g:a:1".to_string(),
            module_name: Some("mod.a".to_string()),
            exports: Some("a.*".to_string()),
            additional_dependencies: Some("g:x:1, g:y:2,".to_string()),
            add_service_uses: true,
        };

        let plan = config.validate(Some(&overrides)).unwrap();
        assert_eq!(plan.declared.len(), 1);
        assert_eq!(plan.declared[0].name, "mod.b");
        assert_eq!(plan.targets.len(), 1);
        assert_eq!(plan.targets[0].name, "mod.a");
        assert_eq!(plan.targets[0].additional_dependencies.len(), 2);
        assert!(plan.targets[0].add_service_uses);

        let registered: Vec<String> = plan
            .registry_modules()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(registered, vec!["mod.b", "mod.a"]);
    }

    #[test]
    fn test_override_of_declared_module_takes_its_registry_place() {
        let config = BatchConfiguration {
            modules: vec![ModuleConfiguration {
                artifact: Some("g:a:1".to_string()),
                module_info: ModuleInfoConfiguration {
                    name: Some("configured.a".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };
        let overrides = ModuleOverrides {
            artifact: "g:a:1".to_string(),
            module_name: Some("override.a".to_string()),
            ..Default::default()
        };

        let plan = config.validate(Some(&overrides)).unwrap();
        let registered = plan.registry_modules();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].name, "override.a");
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("collect".parse::<FailurePolicy>(), Ok(FailurePolicy::Collect));
        assert_eq!("Fail-Fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
        assert!("sometimes".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Collect);
    }
}
