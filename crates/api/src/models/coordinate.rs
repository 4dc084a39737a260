use crate::error::CoordinateParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identity of an artifact in a repository.
///
/// Two coordinates are equal iff every field matches, classifier included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
}

impl ArtifactCoordinate {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = CoordinateParseError;

    /// Parses `group:name:version[:classifier]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let parts: Vec<&str> = input.split(':').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(CoordinateParseError::Malformed(input.to_string()));
        }

        for (field, value) in ["group", "name", "version"].into_iter().zip(&parts) {
            if value.is_empty() {
                return Err(CoordinateParseError::EmptyField {
                    field,
                    input: input.to_string(),
                });
            }
        }

        let classifier = match parts.get(3) {
            Some(c) if c.is_empty() => {
                return Err(CoordinateParseError::EmptyField {
                    field: "classifier",
                    input: input.to_string(),
                });
            }
            Some(c) => Some(c.to_string()),
            None => None,
        };

        Ok(Self {
            group: parts[0].to_string(),
            name: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier,
        })
    }
}

/// A coordinate together with the file it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub path: PathBuf,
}

impl ResolvedArtifact {
    pub fn new(coordinate: ArtifactCoordinate, path: PathBuf) -> Self {
        Self { coordinate, path }
    }
}

impl fmt::Display for ResolvedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.coordinate, self.path.display())
    }
}
