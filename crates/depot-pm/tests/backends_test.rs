/// Integration tests for the non-repository backends: git checkouts, source
/// trees built from a checkout, and plain file locators.
mod common;

use common::{git_repository, Workspace};
use depot_pm::RepositorySystem;
use std::fs;

const TREE_POM: &str = r#"<project>
    <groupId>t</groupId><artifactId>tree</artifactId><version>1.0</version>
    <packaging>pom</packaging>
    <modules><module>core</module><module>app</module></modules>
</project>"#;

const CORE_POM: &str = r#"<project>
    <parent><groupId>t</groupId><artifactId>tree</artifactId><version>1.0</version></parent>
    <artifactId>core</artifactId>
    <dependencies>
        <dependency><groupId>t</groupId><artifactId>lib</artifactId><version>2.0</version></dependency>
    </dependencies>
</project>"#;

const APP_POM: &str = r#"<project>
    <parent><groupId>t</groupId><artifactId>tree</artifactId><version>1.0</version></parent>
    <artifactId>app</artifactId>
    <dependencies>
        <dependency><groupId>t</groupId><artifactId>core</artifactId><version>${project.version}</version></dependency>
    </dependencies>
</project>"#;

#[test]
fn test_install_git_repository_at_tag() {
    let ws = Workspace::new();
    let upstream = ws.temp.path().join("widgets");
    git_repository(&upstream, &[("README", "hello")], "v1");

    let resolution = ws
        .system()
        .install(&format!("git://{}#v1", upstream.display()));
    assert!(resolution.is_success(), "{:?}", resolution.failures);

    let checkout = ws.package_root().join("widgets");
    assert_eq!(resolution.classpath, vec![checkout.clone()]);
    assert_eq!(fs::read_to_string(checkout.join("README")).unwrap(), "hello");
}

#[test]
fn test_install_source_tree_with_modules() {
    let ws = Workspace::new();
    let git_root = ws.temp.path().join("git");
    git_repository(
        &git_root.join("tree"),
        &[
            ("pom.xml", TREE_POM),
            ("core/pom.xml", CORE_POM),
            ("app/pom.xml", APP_POM),
        ],
        "1.0",
    );
    ws.publish("t", "lib", "2.0", "");

    let mut config = ws.config();
    config.vcs_url_template = format!("{}/{{artifactId}}", git_root.display());
    let system = RepositorySystem::new(config).unwrap();

    let resolution = system.install("maven-git://t/tree/1.0");
    assert!(resolution.is_success(), "{:?}", resolution.failures);

    let checkout = ws.package_root().join("t_tree").join("1.0");
    assert!(checkout.join("core/pom.xml").is_file());

    let names: Vec<&str> = resolution.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["t:tree", "t:core", "t:app", "t:lib"]);
    assert_eq!(
        resolution.classpath,
        vec![
            checkout.join("core/target/classes"),
            checkout.join("app/target/classes"),
            ws.jar("t", "lib", "2.0"),
        ]
    );

    // Modules are recorded so the next run skips the checkout entirely
    assert!(system.tags().load("t:core").is_some());
}

#[test]
fn test_module_installed_alone_keeps_its_dependencies() {
    let ws = Workspace::new();
    let git_root = ws.temp.path().join("git");
    git_repository(
        &git_root.join("tree"),
        &[
            ("pom.xml", TREE_POM),
            ("core/pom.xml", CORE_POM),
            ("app/pom.xml", APP_POM),
        ],
        "1.0",
    );
    ws.publish("t", "lib", "2.0", "");

    let mut config = ws.config();
    config.vcs_url_template = format!("{}/{{artifactId}}", git_root.display());
    let tree = RepositorySystem::new(config.clone()).unwrap();
    assert!(tree.install("maven-git://t/tree/1.0").is_success());

    let checkout = ws.package_root().join("t_tree").join("1.0");
    let core = RepositorySystem::new(config.clone())
        .unwrap()
        .install("maven-git://t/core/1.0");
    assert!(core.is_success(), "{:?}", core.failures);
    assert_eq!(
        core.classpath,
        vec![checkout.join("core/target/classes"), ws.jar("t", "lib", "2.0")]
    );
    assert!(core.packages.iter().all(|p| !p.fetched));

    // Edges to another module resolve to that module of the checkout
    let app = RepositorySystem::new(config)
        .unwrap()
        .install("maven-git://t/app/1.0");
    assert!(app.is_success(), "{:?}", app.failures);
    assert_eq!(
        app.classpath,
        vec![
            checkout.join("app/target/classes"),
            checkout.join("core/target/classes"),
            ws.jar("t", "lib", "2.0"),
        ]
    );
}

#[test]
fn test_install_file_url() {
    let ws = Workspace::new();
    let file = ws.temp.path().join("tool.jar");
    fs::write(&file, "jar").unwrap();

    let resolution = ws
        .system()
        .install(&format!("file://{}", file.display()));
    assert!(resolution.is_success(), "{:?}", resolution.failures);
    assert_eq!(resolution.classpath.len(), 1);
    assert_eq!(fs::read_to_string(&resolution.classpath[0]).unwrap(), "jar");
}
