//! Version-control backend: `git://<remote>[#ref]`.

use chrono::{DateTime, Utc};
use git2::{build::RepoBuilder, Cred, FetchOptions, RemoteCallbacks, Repository};
use std::path::{Path, PathBuf};

use super::traits::{InstallOutcome, InstallRequest, Manager, PackageSpec};
use crate::package::{last_segment, split_fragment, split_scheme, Source};
use crate::util::latest_modification;
use crate::{DepotError, Result};

pub const GIT_SCHEME: &str = "git";

/// Clones and checks out git repositories with libgit2.
pub struct GitManager {
    ssh_key: Option<PathBuf>,
}

impl Default for GitManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GitManager {
    pub fn new() -> Self {
        Self { ssh_key: None }
    }

    /// Authenticate SSH remotes with this private key instead of the agent.
    pub fn with_ssh_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssh_key = Some(path.into());
        self
    }

    /// Make `dest` a checkout of `reference` in `remote`.
    ///
    /// An existing repository at `dest` is fetched into; anything else is a
    /// fresh clone.
    pub fn checkout_remote(&self, remote: &str, reference: Option<&str>, dest: &Path) -> Result<()> {
        if dest.join(".git").is_dir() {
            let repo = Repository::open(dest)?;
            self.fetch(&repo)?;
            return match reference {
                Some(reference) => checkout(&repo, reference),
                None => fast_forward_head(&repo),
            };
        }

        log::debug!("Cloning {} into {}", remote, dest.display());
        let mut builder = RepoBuilder::new();
        builder.fetch_options(self.fetch_options());
        let repo = builder.clone(remote, dest)?;

        if let Some(reference) = reference {
            checkout(&repo, reference)?;
        }
        Ok(())
    }

    /// Commit currently checked out at `repo_path`.
    pub fn head_commit(repo_path: &Path) -> Result<String> {
        let repo = Repository::open(repo_path)?;
        let commit = repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn fetch(&self, repo: &Repository) -> Result<()> {
        let mut remote = repo.find_remote("origin")?;
        remote.fetch(
            &["+refs/heads/*:refs/remotes/origin/*", "+refs/tags/*:refs/tags/*"],
            Some(&mut self.fetch_options()),
            None,
        )?;
        Ok(())
    }

    fn fetch_options(&self) -> FetchOptions<'static> {
        let ssh_key = self.ssh_key.clone();
        let use_ssh_agent = std::env::var_os("SSH_AUTH_SOCK").is_some();

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                let username = username_from_url.unwrap_or("git");

                if let Some(key_path) = &ssh_key {
                    return Cred::ssh_key(username, None, key_path, None);
                }

                if use_ssh_agent {
                    return Cred::ssh_key_from_agent(username);
                }

                if let Some(base_dirs) = directories::BaseDirs::new() {
                    for key in [".ssh/id_ed25519", ".ssh/id_rsa"] {
                        let key_path = base_dirs.home_dir().join(key);
                        if key_path.exists() {
                            return Cred::ssh_key(username, None, &key_path, None);
                        }
                    }
                }
            }

            if allowed_types.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
                if let (Ok(user), Ok(pass)) = (
                    std::env::var("DEPOT_GIT_USER"),
                    std::env::var("DEPOT_GIT_PASSWORD"),
                ) {
                    return Cred::userpass_plaintext(&user, &pass);
                }
            }

            if allowed_types.contains(git2::CredentialType::DEFAULT) {
                return Cred::default();
            }

            Err(git2::Error::from_str("no valid credentials found"))
        });

        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);
        fetch_opts
    }
}

impl Manager for GitManager {
    fn schemes(&self) -> Vec<&'static str> {
        vec![GIT_SCHEME]
    }

    fn create_package(&self, locator: &str) -> Result<PackageSpec> {
        let (_, rest) = split_scheme(locator)?;
        let (path, _) = split_fragment(rest);
        let name = last_segment(path)
            .ok_or_else(|| DepotError::InvalidLocator(locator.to_string()))?;

        Ok(PackageSpec::new(name, Source::new(GIT_SCHEME, locator)))
    }

    fn do_install(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        let remote = remote_url(request.source.path());
        self.checkout_remote(&remote, request.source.fragment(), &request.install_dir)?;
        if let Ok(commit) = Self::head_commit(&request.install_dir) {
            log::debug!("{} checked out at {}", request.name, commit);
        }
        Ok(InstallOutcome::with_classpath(request.install_dir.clone()))
    }

    /// Local repositories report their newest file; remotes are unknown.
    fn last_modified(&self, source: &Source) -> Option<DateTime<Utc>> {
        local_path(source.path()).and_then(|path| latest_modification(&path))
    }
}

/// Remote URL for the path part of a `git://` locator.
///
/// A full URL is used verbatim, `/`, `.` and `~` prefixes denote a local
/// repository, anything else is fetched over https.
pub fn remote_url(path: &str) -> String {
    if path.contains("://") {
        return path.to_string();
    }
    match local_path(path) {
        Some(local) => local.to_string_lossy().into_owned(),
        None => format!("https://{}", path),
    }
}

fn local_path(path: &str) -> Option<PathBuf> {
    if path.starts_with('/') || path.starts_with('.') || path.starts_with('~') {
        Some(PathBuf::from(shellexpand::tilde(path).as_ref()))
    } else {
        None
    }
}

/// Check out a commit, tag or branch and detach HEAD there.
fn checkout(repo: &Repository, reference: &str) -> Result<()> {
    let candidates = [
        format!("refs/tags/{}", reference),
        format!("refs/remotes/origin/{}", reference),
        format!("refs/heads/{}", reference),
    ];

    let commit = match candidates
        .iter()
        .find_map(|name| repo.find_reference(name).ok())
    {
        Some(found) => found.peel_to_commit()?,
        None => repo.revparse_single(reference)?.peel_to_commit()?,
    };

    repo.checkout_tree(commit.as_object(), Some(git2::build::CheckoutBuilder::new().force()))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

/// Move a branch checkout to its freshly fetched upstream.
fn fast_forward_head(repo: &Repository) -> Result<()> {
    let head = repo.head()?;
    if !head.is_branch() {
        return Ok(());
    }
    let Some(branch) = head.shorthand() else {
        return Ok(());
    };
    let upstream = format!("refs/remotes/origin/{}", branch);
    let Ok(target) = repo.find_reference(&upstream) else {
        return Ok(());
    };

    let commit = target.peel_to_commit()?;
    repo.checkout_tree(commit.as_object(), Some(git2::build::CheckoutBuilder::new().force()))?;
    let head_name = head.name().unwrap_or("HEAD").to_string();
    repo.reference(&head_name, commit.id(), true, "depot: fast-forward")?;
    Ok(())
}
