use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepotError {
    // Configuration errors
    #[error("Unknown locator scheme '{scheme}' in {locator}")]
    UnknownScheme { scheme: String, locator: String },

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Descriptor errors
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Failed to parse descriptor {document}: {reason}")]
    DescriptorParse { document: String, reason: String },

    #[error("Unresolved property ${{{name}}} in {document}")]
    UnresolvedProperty { name: String, document: String },

    #[error("Descriptor resolution failed: {0}")]
    DescriptorResolution(String),

    // Transport errors
    #[error("Download failed for {package}: {reason}")]
    DownloadFailed { package: String, reason: String },

    #[error("Checksum mismatch for {package}")]
    ChecksumMismatch { package: String },

    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Installation failed: {0}")]
    InstallationFailed(String),

    #[error("Package not found: {name}")]
    PackageNotFound { name: String },

    // Wrapped library errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

pub type Result<T> = std::result::Result<T, DepotError>;
