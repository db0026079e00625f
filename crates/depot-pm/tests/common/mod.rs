//! Fixtures shared by the integration tests: a local Maven-layout repository
//! and throwaway git repositories.

#![allow(dead_code)]

use depot_pm::{Config, RepositorySystem};
use git2::Repository;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A package root and a local repository next to each other.
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn repo(&self) -> PathBuf {
        self.temp.path().join("repo")
    }

    pub fn package_root(&self) -> PathBuf {
        self.temp.path().join("packages")
    }

    pub fn config(&self) -> Config {
        let mut config = Config::with_package_root(self.package_root());
        config.repositories = vec![self.repo().display().to_string()];
        config
    }

    pub fn system(&self) -> RepositorySystem {
        RepositorySystem::new(self.config()).unwrap()
    }

    /// Publish `group:artifact:version` with a jar and a descriptor whose
    /// `<project>` body is extended by `body`.
    pub fn publish(&self, group: &str, artifact: &str, version: &str, body: &str) {
        let dir = self
            .repo()
            .join(group.replace('.', "/"))
            .join(artifact)
            .join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{}-{}.pom", artifact, version)),
            format!(
                "<project><modelVersion>4.0.0</modelVersion>\
                 <groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>{}</project>",
                group, artifact, version, body
            ),
        )
        .unwrap();
        fs::write(dir.join(format!("{}-{}.jar", artifact, version)), artifact).unwrap();
    }

    /// Publish a descriptor written out in full, without a jar.
    pub fn publish_descriptor(&self, group: &str, artifact: &str, version: &str, xml: &str) {
        let dir = self
            .repo()
            .join(group.replace('.', "/"))
            .join(artifact)
            .join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}-{}.pom", artifact, version)), xml).unwrap();
    }

    /// Installed jar of `group:artifact:version`.
    pub fn jar(&self, group: &str, artifact: &str, version: &str) -> PathBuf {
        self.package_root()
            .join(format!("{}_{}", group, artifact))
            .join(version)
            .join(format!("{}-{}.jar", artifact, version))
    }
}

/// `<dependencies>` block for `(group, artifact, version)` triples.
pub fn dependencies(deps: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from("<dependencies>");
    for (group, artifact, version) in deps {
        xml.push_str(&dependency(group, artifact, version, ""));
    }
    xml.push_str("</dependencies>");
    xml
}

/// One `<dependency>` with extra child elements.
pub fn dependency(group: &str, artifact: &str, version: &str, extra: &str) -> String {
    format!(
        "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>{}</dependency>",
        group, artifact, version, extra
    )
}

/// Commit `files` into a new repository at `dir` and tag the commit.
pub fn git_repository(dir: &Path, files: &[(&str, &str)], tag: &str) -> Repository {
    fs::create_dir_all(dir).unwrap();
    let repo = Repository::init(dir).unwrap();
    {
        let mut index = repo.index().unwrap();
        for (path, contents) in files {
            let file = dir.join(path);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(&file, contents).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let commit = repo
            .commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        let commit = repo.find_commit(commit).unwrap();
        repo.tag_lightweight(tag, commit.as_object(), false).unwrap();
    }
    repo
}
