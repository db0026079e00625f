//! Artifact coordinates and exclusion patterns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{DepotError, Result};

/// Wildcard accepted in any coordinate field of an exclusion pattern.
pub const WILDCARD: &str = "*";

/// Packaging assumed when a descriptor does not name one.
pub const DEFAULT_PACKAGING: &str = "jar";

/// Dependency scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Compile,
    Runtime,
    Provided,
    Test,
    System,
    Import,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Provided => "provided",
            Scope::Test => "test",
            Scope::System => "system",
            Scope::Import => "import",
        }
    }

    /// Scopes whose edges are only followed from a root.
    pub fn is_root_only(&self) -> bool {
        matches!(self, Scope::Test | Scope::Provided)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Compile
    }
}

impl FromStr for Scope {
    type Err = DepotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "compile" => Ok(Scope::Compile),
            "runtime" => Ok(Scope::Runtime),
            "provided" => Ok(Scope::Provided),
            "test" => Ok(Scope::Test),
            "system" => Ok(Scope::System),
            "import" => Ok(Scope::Import),
            other => Err(DepotError::Config(format!("unknown dependency scope '{}'", other))),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of scopes requested for a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    pub fn new(scopes: impl IntoIterator<Item = Scope>) -> Self {
        Self(scopes.into_iter().collect())
    }

    pub fn compile() -> Self {
        Self::new([Scope::Compile])
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    /// The scopes that still apply one edge below a root.
    pub fn transitive(&self) -> Self {
        Self(self.0.iter().copied().filter(|s| !s.is_root_only()).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }

    pub fn parse_list(list: &str) -> Result<Self> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Scope::from_str)
            .collect::<Result<BTreeSet<_>>>()
            .map(Self)
    }
}

impl Default for ScopeSet {
    fn default() -> Self {
        Self::new([Scope::Compile, Scope::Runtime])
    }
}

/// Coordinates of a fetchable package plus the exclusions declared on the
/// edge that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// Packaging / type; `None` means the default for concrete descriptors
    /// and "any" for exclusion patterns.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Descriptor>,
}

impl Descriptor {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
            classifier: None,
            packaging: None,
            optional: false,
            scope: None,
            exclusions: Vec::new(),
        }
    }

    /// Exclusion pattern; `*` may be used for either field.
    pub fn exclusion(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self::new(group_id, artifact_id, None)
    }

    /// Parse `group:artifact[:version[:classifier]][@type]` or
    /// `group/artifact/version`.
    pub fn parse(coordinate: &str) -> Result<Self> {
        let coordinate = coordinate.trim();
        let (coordinate, packaging) = match coordinate.rsplit_once('@') {
            Some((head, ty)) if !ty.is_empty() => (head, Some(ty.to_string())),
            _ => (coordinate, None),
        };

        let parts: Vec<&str> = if coordinate.contains(':') {
            coordinate.split(':').collect()
        } else {
            coordinate.split('/').filter(|p| !p.is_empty()).collect()
        };

        if parts.len() < 2 || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(DepotError::InvalidCoordinate(coordinate.to_string()));
        }

        let mut descriptor = Self::new(parts[0], parts[1], parts.get(2).map(|v| v.to_string()));
        descriptor.classifier = parts.get(3).map(|c| c.to_string());
        descriptor.packaging = packaging;
        Ok(descriptor)
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Descriptor>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Effective packaging of a concrete descriptor.
    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or(DEFAULT_PACKAGING)
    }

    /// Artifact file extension; `bundle`/`maven-plugin` packagings ship jars.
    pub fn extension(&self) -> &str {
        match self.packaging() {
            "bundle" | "maven-plugin" | "ejb" | "test-jar" => "jar",
            other => other,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    /// Version or an error naming the coordinate.
    pub fn require_version(&self) -> Result<&str> {
        self.version
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DepotError::VersionNotFound(self.to_string()))
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.as_deref().is_some_and(|v| v.ends_with("-SNAPSHOT"))
    }

    /// `group:artifact`, the key used by dependency management.
    pub fn management_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Logical package name: versions of one artifact share a package.
    pub fn package_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}:{}:{}", self.group_id, self.artifact_id, c),
            None => self.management_key(),
        }
    }

    /// `org/example`
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `org/example/artifact/1.0`
    pub fn version_dir(&self) -> Result<String> {
        Ok(format!(
            "{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.require_version()?
        ))
    }

    /// `artifact-1.0[-classifier].<ext>`
    pub fn file_name(&self, extension: &str) -> Result<String> {
        let version = self.require_version()?;
        Ok(match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact_id, version, c, extension),
            None => format!("{}-{}.{}", self.artifact_id, version, extension),
        })
    }

    /// Repository-relative path of the artifact itself.
    pub fn artifact_path(&self) -> Result<String> {
        Ok(format!("{}/{}", self.version_dir()?, self.file_name(self.extension())?))
    }

    /// Repository-relative path of the descriptor file (never classified).
    pub fn pom_path(&self) -> Result<String> {
        let version = self.require_version()?;
        Ok(format!(
            "{}/{}-{}.pom",
            self.version_dir()?,
            self.artifact_id,
            version
        ))
    }

    /// Whether `self`, used as a pattern, matches `other`.
    ///
    /// Group and artifact must be equal or `*`; version, type and classifier
    /// must be equal, absent or `*` on the pattern side.
    pub fn matches(&self, other: &Descriptor) -> bool {
        fn field(pattern: &str, value: &str) -> bool {
            pattern == WILDCARD || pattern == value
        }
        fn optional(pattern: Option<&str>, value: Option<&str>) -> bool {
            match pattern {
                None => true,
                Some(WILDCARD) => true,
                Some(p) => Some(p) == value,
            }
        }

        field(&self.group_id, &other.group_id)
            && field(&self.artifact_id, &other.artifact_id)
            && optional(self.version.as_deref(), other.version.as_deref())
            && optional(self.classifier.as_deref(), other.classifier.as_deref())
            && optional(self.packaging.as_deref(), Some(other.packaging()))
    }

    /// Whether any pattern in `exclusions` matches this descriptor.
    pub fn is_excluded_by(&self, exclusions: &[Descriptor]) -> bool {
        exclusions.iter().any(|e| e.matches(self))
    }

    /// Coordinate identity, ignoring scope, optional flag and exclusions.
    pub fn same_coordinate(&self, other: &Descriptor) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.version == other.version
            && self.classifier == other.classifier
            && self.packaging == other.packaging
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
            if let Some(classifier) = &self.classifier {
                write!(f, ":{}", classifier)?;
            }
        }
        if let Some(packaging) = &self.packaging {
            write!(f, "@{}", packaging)?;
        }
        Ok(())
    }
}

/// Keep only the exclusions present in both lists.
pub fn intersect_exclusions(a: &[Descriptor], b: &[Descriptor]) -> Vec<Descriptor> {
    a.iter()
        .filter(|x| b.iter().any(|y| x.same_coordinate(y)))
        .cloned()
        .collect()
}

/// Append the exclusions of `extra` that `base` does not already contain.
pub fn union_exclusions(base: &[Descriptor], extra: &[Descriptor]) -> Vec<Descriptor> {
    let mut merged = base.to_vec();
    for e in extra {
        if !merged.iter().any(|m| m.same_coordinate(e)) {
            merged.push(e.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colon_form() {
        let d = Descriptor::parse("org.example:lib:1.2:natives@zip").unwrap();
        assert_eq!(d.group_id, "org.example");
        assert_eq!(d.artifact_id, "lib");
        assert_eq!(d.version.as_deref(), Some("1.2"));
        assert_eq!(d.classifier.as_deref(), Some("natives"));
        assert_eq!(d.packaging(), "zip");
    }

    #[test]
    fn test_parse_slash_form() {
        let d = Descriptor::parse("org.example/lib/1.2").unwrap();
        assert_eq!(d.group_id, "org.example");
        assert_eq!(d.artifact_id, "lib");
        assert_eq!(d.version.as_deref(), Some("1.2"));
        assert_eq!(d.packaging(), "jar");
    }

    #[test]
    fn test_parse_without_version() {
        let d = Descriptor::parse("org.example:lib").unwrap();
        assert!(d.version.is_none());
        assert!(d.require_version().is_err());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Descriptor::parse("lib").is_err());
        assert!(Descriptor::parse("a::b").is_err());
        assert!(Descriptor::parse("a:b:c:d:e").is_err());
    }

    #[test]
    fn test_paths() {
        let d = Descriptor::parse("org.example:lib:1.2:sources").unwrap();
        assert_eq!(d.artifact_path().unwrap(), "org/example/lib/1.2/lib-1.2-sources.jar");
        assert_eq!(d.pom_path().unwrap(), "org/example/lib/1.2/lib-1.2.pom");
        assert_eq!(d.package_name(), "org.example:lib:sources");
    }

    #[test]
    fn test_matches_with_wildcards() {
        let target = Descriptor::parse("org.example:lib:1.2").unwrap();

        assert!(Descriptor::exclusion("org.example", "lib").matches(&target));
        assert!(Descriptor::exclusion("org.example", "*").matches(&target));
        assert!(Descriptor::exclusion("*", "*").matches(&target));
        assert!(!Descriptor::exclusion("org.other", "*").matches(&target));
        assert!(!Descriptor::parse("org.example:lib:2.0").unwrap().matches(&target));
        assert!(Descriptor::parse("org.example:lib:*").unwrap().matches(&target));

        let mut test_jar = Descriptor::exclusion("org.example", "lib");
        test_jar.classifier = Some("tests".to_string());
        assert!(!test_jar.matches(&target));

        let mut plain_jar = Descriptor::exclusion("org.example", "lib");
        plain_jar.packaging = Some("jar".to_string());
        assert!(plain_jar.matches(&target));
    }

    #[test]
    fn test_exclusion_intersection() {
        let x = Descriptor::exclusion("org.x", "x");
        let y = Descriptor::exclusion("org.y", "y");

        assert!(intersect_exclusions(&[x.clone()], &[]).is_empty());
        assert_eq!(intersect_exclusions(&[x.clone(), y.clone()], &[y.clone()]), vec![y.clone()]);
        assert_eq!(union_exclusions(&[x.clone()], &[x.clone(), y.clone()]).len(), 2);
    }

    #[test]
    fn test_scope_set_transitive() {
        let scopes = ScopeSet::parse_list("compile,test,runtime").unwrap();
        assert!(scopes.contains(Scope::Test));

        let transitive = scopes.transitive();
        assert!(transitive.contains(Scope::Compile));
        assert!(transitive.contains(Scope::Runtime));
        assert!(!transitive.contains(Scope::Test));
    }

    #[test]
    fn test_display() {
        let d = Descriptor::parse("g:a:1:c@zip").unwrap();
        assert_eq!(d.to_string(), "g:a:1:c@zip");
        assert_eq!(Descriptor::exclusion("g", "a").to_string(), "g:a");
    }
}
