//! Fetching backends, one per locator scheme.

pub mod copy;
pub mod git;
pub mod maven;
mod traits;
pub mod url;

pub use self::copy::{CopyLocation, CopyManager, COPY_SCHEME};
pub use self::git::{GitManager, GIT_SCHEME};
pub use self::maven::{
    MavenManager, MavenRepository, MavenVcsManager, MAVEN_GIT_SCHEME,
    MAVEN_ONLY_DEPENDENCIES_SCHEME, MAVEN_SCHEME,
};
pub use self::traits::{
    DependencyRequest, InstallOutcome, InstallRequest, Manager, PackageSpec, SubPackage,
};
pub use self::url::{UrlManager, URL_SCHEME};
