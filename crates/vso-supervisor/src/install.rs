//! Package installation.
//!
//! The registry and its package manager are out of scope here; this
//! module defines only the boundary the supervisor calls through. A
//! production deployment supplies its own [`PackageInstaller`] wired to
//! the real registry client.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SupervisorError;
use crate::record::PackageSpec;

/// The resolved launch descriptor for an installed package.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// Ensures a package is present locally and resolves it to a launch
/// descriptor. Implementations decide what "installed" means (a binary
/// shim on `PATH`, a package-manager run step, a container pull, ...).
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn install(
        &self,
        package: &PackageSpec,
        timeout: Duration,
    ) -> Result<InstalledPackage, SupervisorError>;
}

/// Resolves a package to an already-installed binary shim on `PATH`,
/// named after the package. This is the minimal installer a deployment
/// can use when packages are pre-provisioned by an external step; it
/// performs no network I/O and never fails on `timeout` since resolution
/// is local.
pub struct PathShimInstaller;

#[async_trait]
impl PackageInstaller for PathShimInstaller {
    async fn install(
        &self,
        package: &PackageSpec,
        _timeout: Duration,
    ) -> Result<InstalledPackage, SupervisorError> {
        Ok(InstalledPackage {
            command: package.name.clone(),
            args: Vec::new(),
            env: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn path_shim_installer_resolves_name_as_command() {
        let installer = PathShimInstaller;
        let spec = PackageSpec::new("echo-tool-server");
        let installed = installer
            .install(&spec, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(installed.command, "echo-tool-server");
        assert!(installed.args.is_empty());
    }
}
