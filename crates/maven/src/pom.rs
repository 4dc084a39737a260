//! Minimal POM reader.
//!
//! Extracts the parts of a POM that dependency collection needs: project
//! identity, parent, properties, dependencies and dependency management.
//! Plugin and profile sections are ignored.

use modulizer_api::{DependencyScope, Exclusion};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static PROPERTY_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());
static PROPERTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<([A-Za-z_][\w.\-]*)>([^<]*)</([A-Za-z_][\w.\-]*)>").unwrap());
static DEPENDENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>").unwrap());
static EXCLUSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<exclusion>(.*?)</exclusion>").unwrap());

/// Sections whose nested elements would be mistaken for project-level ones
const IGNORED_SECTIONS: &[&str] = &[
    "profiles",
    "build",
    "reporting",
    "distributionManagement",
    "repositories",
    "pluginRepositories",
    "scm",
    "developers",
    "contributors",
    "licenses",
    "organization",
    "issueManagement",
    "ciManagement",
    "mailingLists",
];

/// Upper bound on nested property expansion
const MAX_INTERPOLATION_PASSES: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PomError {
    #[error("no <project> element")]
    NotAPom,
    #[error("dependency {group}:{name} has no version")]
    MissingVersion { group: String, name: String },
    #[error("dependency without {0}")]
    IncompleteDependency(&'static str),
    #[error("unresolved property in '{0}'")]
    UnresolvedProperty(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentReference {
    pub group: String,
    pub name: String,
    pub version: String,
}

/// A `<dependency>` entry, before interpolation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDependency {
    pub group: String,
    pub name: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl PomDependency {
    /// Key used to match against dependency management
    fn management_key(&self) -> (String, String, Option<String>) {
        (self.group.clone(), self.name.clone(), self.classifier.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub parent: Option<ParentReference>,
    pub properties: HashMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
}

/// A dependency with every property expanded and its version settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    pub scope: DependencyScope,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl Pom {
    pub fn parse(content: &str) -> Result<Self, PomError> {
        let content = COMMENT.replace_all(content, "");
        let project = section(&content, "project").ok_or(PomError::NotAPom)?;

        let mut rest = project.to_string();
        for name in IGNORED_SECTIONS {
            rest = remove_section(&rest, name);
        }

        let dependency_management = section(&rest, "dependencyManagement")
            .map(parse_dependencies)
            .transpose()?
            .unwrap_or_default();
        rest = remove_section(&rest, "dependencyManagement");

        let dependencies = section(&rest, "dependencies")
            .map(parse_dependencies)
            .transpose()?
            .unwrap_or_default();
        rest = remove_section(&rest, "dependencies");

        let parent = section(&rest, "parent").map(|p| ParentReference {
            group: element(p, "groupId").unwrap_or_default(),
            name: element(p, "artifactId").unwrap_or_default(),
            version: element(p, "version").unwrap_or_default(),
        });
        rest = remove_section(&rest, "parent");

        let properties = section(&rest, "properties")
            .map(parse_properties)
            .unwrap_or_default();
        rest = remove_section(&rest, "properties");

        Ok(Self {
            group: element(&rest, "groupId"),
            name: element(&rest, "artifactId"),
            version: element(&rest, "version"),
            parent,
            properties,
            dependencies,
            dependency_management,
        })
    }

    pub fn group(&self) -> Option<&str> {
        self.group
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.group.as_str()))
    }

    pub fn version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Folds a parent POM in: the parent's properties and managed versions
    /// apply wherever this POM does not declare its own.
    pub fn inherit(&mut self, parent: &Pom) {
        for (key, value) in &parent.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        for managed in &parent.dependency_management {
            let key = managed.management_key();
            if !self
                .dependency_management
                .iter()
                .any(|m| m.management_key() == key)
            {
                self.dependency_management.push(managed.clone());
            }
        }
        for dependency in &parent.dependencies {
            let key = dependency.management_key();
            if !self.dependencies.iter().any(|d| d.management_key() == key) {
                self.dependencies.push(dependency.clone());
            }
        }
    }

    /// Dependencies with properties expanded and managed versions filled in
    pub fn resolved_dependencies(&self) -> Result<Vec<ResolvedDependency>, PomError> {
        self.dependencies
            .iter()
            .map(|dependency| self.resolve_dependency(dependency))
            .collect()
    }

    fn resolve_dependency(&self, dependency: &PomDependency) -> Result<ResolvedDependency, PomError> {
        let group = self.interpolate(&dependency.group)?;
        let name = self.interpolate(&dependency.name)?;
        let classifier = dependency
            .classifier
            .as_deref()
            .map(|c| self.interpolate(c))
            .transpose()?;

        let managed = self.dependency_management.iter().find(|m| {
            self.interpolate(&m.group).ok().as_deref() == Some(group.as_str())
                && self.interpolate(&m.name).ok().as_deref() == Some(name.as_str())
                && m.classifier == dependency.classifier
        });

        let version = match (&dependency.version, managed.and_then(|m| m.version.as_ref())) {
            (Some(version), _) | (None, Some(version)) => self.interpolate(version)?,
            (None, None) => {
                return Err(PomError::MissingVersion {
                    group: group.clone(),
                    name: name.clone(),
                });
            }
        };

        let scope = dependency
            .scope
            .as_ref()
            .or(managed.and_then(|m| m.scope.as_ref()))
            .map(|s| self.interpolate(s))
            .transpose()?
            .map(|s| DependencyScope::from(s.as_str()))
            .unwrap_or(DependencyScope::Compile);

        let mut exclusions = dependency.exclusions.clone();
        if let Some(managed) = managed {
            exclusions.extend(managed.exclusions.iter().cloned());
        }

        Ok(ResolvedDependency {
            group,
            name,
            version,
            classifier,
            scope,
            optional: dependency.optional,
            exclusions,
        })
    }

    fn property(&self, key: &str) -> Option<String> {
        let value = match key {
            "project.version" | "pom.version" | "version" => self.version().map(String::from),
            "project.groupId" | "pom.groupId" | "groupId" => self.group().map(String::from),
            "project.artifactId" | "pom.artifactId" | "artifactId" => self.name.clone(),
            "project.parent.version" | "parent.version" => {
                self.parent.as_ref().map(|p| p.version.clone())
            }
            "project.parent.groupId" | "parent.groupId" => {
                self.parent.as_ref().map(|p| p.group.clone())
            }
            _ => None,
        };
        value.or_else(|| self.properties.get(key).cloned())
    }

    /// Expands `${...}` references
    pub fn interpolate(&self, value: &str) -> Result<String, PomError> {
        let mut current = value.to_string();
        for _ in 0..MAX_INTERPOLATION_PASSES {
            if !current.contains("${") {
                return Ok(current);
            }
            let mut missing = false;
            let expanded = PROPERTY_REF.replace_all(&current, |caps: &regex::Captures| {
                match self.property(&caps[1]) {
                    Some(value) => value,
                    None => {
                        missing = true;
                        caps[0].to_string()
                    }
                }
            });
            if missing {
                return Err(PomError::UnresolvedProperty(value.to_string()));
            }
            current = expanded.into_owned();
        }
        Err(PomError::UnresolvedProperty(value.to_string()))
    }
}

/// Content of the first `<name>` element
fn section<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{}", name);
    let close = format!("</{}>", name);

    let mut search = 0;
    let start = loop {
        let at = search + content[search..].find(&open)?;
        let after = &content[at + open.len()..];
        // `<dependency` must not match `<dependencyManagement`
        match after.chars().next() {
            Some('>') => break at + open.len() + 1,
            Some(c) if c.is_whitespace() => {
                break at + open.len() + after.find('>')? + 1;
            }
            _ => search = at + open.len(),
        }
    };
    let end = start + content[start..].find(&close)?;
    Some(&content[start..end])
}

/// Removes every `<name>` element
fn remove_section(content: &str, name: &str) -> String {
    let pattern = format!(r"(?s)<{0}(\s[^>]*)?>.*?</{0}>", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(content, "").into_owned(),
        Err(_) => content.to_string(),
    }
}

/// Trimmed text of the first `<name>` element
fn element(content: &str, name: &str) -> Option<String> {
    section(content, name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_properties(content: &str) -> HashMap<String, String> {
    PROPERTY
        .captures_iter(content)
        .filter(|caps| caps[1] == caps[3])
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect()
}

fn parse_dependencies(content: &str) -> Result<Vec<PomDependency>, PomError> {
    DEPENDENCY
        .captures_iter(content)
        .map(|caps| parse_dependency(&caps[1]))
        .collect()
}

fn parse_dependency(content: &str) -> Result<PomDependency, PomError> {
    let exclusions = section(content, "exclusions")
        .map(|block| {
            EXCLUSION
                .captures_iter(block)
                .filter_map(|caps| {
                    Some(Exclusion {
                        group: element(&caps[1], "groupId")?,
                        name: element(&caps[1], "artifactId")?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    let content = remove_section(content, "exclusions");

    let mut classifier = element(&content, "classifier");
    if classifier.is_none() && element(&content, "type").as_deref() == Some("test-jar") {
        classifier = Some("tests".to_string());
    }

    Ok(PomDependency {
        group: element(&content, "groupId").ok_or(PomError::IncompleteDependency("groupId"))?,
        name: element(&content, "artifactId")
            .ok_or(PomError::IncompleteDependency("artifactId"))?,
        version: element(&content, "version"),
        classifier,
        scope: element(&content, "scope"),
        optional: element(&content, "optional").as_deref() == Some("true"),
        exclusions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>com.example</groupId>
    <artifactId>parent</artifactId>
    <version>2.0</version>
  </parent>
  <artifactId>app</artifactId>
  <properties>
    <lib.version>1.4</lib.version>
    <nested.version>${lib.version}</nested.version>
  </properties>
  <!-- <dependencies><dependency><groupId>commented</groupId></dependency></dependencies> -->
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.managed</groupId>
        <artifactId>managed</artifactId>
        <version>3.3</version>
        <scope>runtime</scope>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>${project.groupId}</groupId>
      <artifactId>core</artifactId>
      <version>${project.version}</version>
      <exclusions>
        <exclusion>
          <groupId>org.unwanted</groupId>
          <artifactId>*</artifactId>
        </exclusion>
      </exclusions>
    </dependency>
    <dependency>
      <groupId>org.lib</groupId>
      <artifactId>lib</artifactId>
      <version>${nested.version}</version>
      <optional>true</optional>
    </dependency>
    <dependency>
      <groupId>org.managed</groupId>
      <artifactId>managed</artifactId>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
  <build>
    <plugins>
      <plugin>
        <artifactId>maven-compiler-plugin</artifactId>
        <dependencies>
          <dependency>
            <groupId>org.plugin</groupId>
            <artifactId>plugin-dep</artifactId>
            <version>1</version>
          </dependency>
        </dependencies>
      </plugin>
    </plugins>
  </build>
</project>
"#;

    #[test]
    fn test_parse_project() {
        let pom = Pom::parse(POM).unwrap();
        assert_eq!(pom.group(), Some("com.example"));
        assert_eq!(pom.version(), Some("2.0"));
        assert_eq!(pom.name.as_deref(), Some("app"));
        assert_eq!(pom.dependencies.len(), 4);
        assert_eq!(pom.dependency_management.len(), 1);
    }

    #[test]
    fn test_resolved_dependencies() {
        let deps = Pom::parse(POM).unwrap().resolved_dependencies().unwrap();

        assert_eq!(deps[0].group, "com.example");
        assert_eq!(deps[0].version, "2.0");
        assert_eq!(
            deps[0].exclusions,
            vec![Exclusion {
                group: "org.unwanted".to_string(),
                name: "*".to_string(),
            }]
        );

        assert_eq!(deps[1].version, "1.4");
        assert!(deps[1].optional);

        assert_eq!(deps[2].version, "3.3");
        assert_eq!(deps[2].scope, DependencyScope::Runtime);

        assert_eq!(deps[3].scope, DependencyScope::Test);
    }

    #[test]
    fn test_missing_version_and_unresolved_property() {
        let pom = Pom::parse(
            "<project><dependencies><dependency><groupId>a</groupId><artifactId>b</artifactId></dependency></dependencies></project>",
        )
        .unwrap();
        assert!(matches!(
            pom.resolved_dependencies(),
            Err(PomError::MissingVersion { .. })
        ));

        let pom = Pom::parse(
            "<project><dependencies><dependency><groupId>a</groupId><artifactId>b</artifactId><version>${nope}</version></dependency></dependencies></project>",
        )
        .unwrap();
        assert!(matches!(
            pom.resolved_dependencies(),
            Err(PomError::UnresolvedProperty(_))
        ));
    }

    #[test]
    fn test_inherit_from_parent() {
        let parent = Pom::parse(
            r#"<project>
                <groupId>com.example</groupId><artifactId>parent</artifactId><version>2.0</version>
                <properties><lib.version>9</lib.version><shared>yes</shared></properties>
                <dependencyManagement><dependencies><dependency>
                  <groupId>org.x</groupId><artifactId>x</artifactId><version>${lib.version}</version>
                </dependency></dependencies></dependencyManagement>
            </project>"#,
        )
        .unwrap();
        let mut child = Pom::parse(
            r#"<project>
                <artifactId>child</artifactId>
                <properties><lib.version>5</lib.version></properties>
                <dependencies><dependency><groupId>org.x</groupId><artifactId>x</artifactId></dependency></dependencies>
            </project>"#,
        )
        .unwrap();

        child.inherit(&parent);

        assert_eq!(child.properties.get("shared").map(String::as_str), Some("yes"));
        let deps = child.resolved_dependencies().unwrap();
        // The child's own property wins over the parent's
        assert_eq!(deps[0].version, "5");
    }

    #[test]
    fn test_not_a_pom() {
        assert_eq!(Pom::parse("<settings/>").unwrap_err(), PomError::NotAPom);
    }
}
