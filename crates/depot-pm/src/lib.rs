pub mod config;
pub mod error;
pub mod http;
pub mod messages;
pub mod package;
pub mod registry;
pub mod repository;
pub mod system;
pub mod util;

pub use config::Config;
pub use error::{DepotError, Result};
pub use messages::{LogMessageHandler, MessageHandler};
pub use package::{Descriptor, Package, PackageId, Scope, ScopeSet};
pub use registry::Registry;
pub use repository::{Manager, PackageSpec};
pub use system::{InstallFailure, InstalledPackage, RepositorySystem, Resolution};
