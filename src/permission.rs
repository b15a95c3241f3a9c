//! Library access gate consulted before the first page is loaded.

use std::path::PathBuf;

use tracing::debug;

/// Platform permission layer: a check followed, when needed, by a request.
///
/// An `Err` from either call is treated the same as a denial.
#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    async fn check(&self) -> anyhow::Result<bool>;

    async fn request(&self) -> anyhow::Result<bool>;
}

/// Gate for sources that need no permission at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait::async_trait]
impl PermissionGate for AlwaysGranted {
    async fn check(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn request(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Grants access when the library directory can be listed.
///
/// There is no prompt to show on a filesystem, so `request` just checks again.
#[derive(Debug, Clone)]
pub struct DirectoryAccess {
    root: PathBuf,
}

impl DirectoryAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl PermissionGate for DirectoryAccess {
    async fn check(&self) -> anyhow::Result<bool> {
        match tokio::fs::read_dir(&self.root).await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("Cannot list {}: {}", self.root.display(), e);
                Ok(false)
            }
        }
    }

    async fn request(&self) -> anyhow::Result<bool> {
        self.check().await
    }
}

/// Run the check, then the request if the check fails.
pub async fn ensure_access(gate: &dyn PermissionGate) -> bool {
    match gate.check().await {
        Ok(true) => return true,
        Ok(false) => {}
        Err(e) => debug!("Permission check failed: {}", e),
    }
    match gate.request().await {
        Ok(granted) => granted,
        Err(e) => {
            debug!("Permission request failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Prompting {
        checked: bool,
        granted: anyhow::Result<bool>,
        requests: AtomicU32,
    }

    #[async_trait::async_trait]
    impl PermissionGate for Prompting {
        async fn check(&self) -> anyhow::Result<bool> {
            Ok(self.checked)
        }

        async fn request(&self) -> anyhow::Result<bool> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            match &self.granted {
                Ok(g) => Ok(*g),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    #[tokio::test]
    async fn test_granted_check_skips_request() {
        let gate = Prompting {
            checked: true,
            granted: Ok(false),
            requests: AtomicU32::new(0),
        };
        assert!(ensure_access(&gate).await);
        assert_eq!(gate.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_check_falls_back_to_request() {
        let gate = Prompting {
            checked: false,
            granted: Ok(true),
            requests: AtomicU32::new(0),
        };
        assert!(ensure_access(&gate).await);
        assert_eq!(gate.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_error_counts_as_denied() {
        let gate = Prompting {
            checked: false,
            granted: Err(anyhow::anyhow!("prompt dismissed")),
            requests: AtomicU32::new(0),
        };
        assert!(!ensure_access(&gate).await);
    }

    #[tokio::test]
    async fn test_directory_access() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_access(&DirectoryAccess::new(dir.path())).await);
        assert!(!ensure_access(&DirectoryAccess::new(dir.path().join("missing"))).await);
        assert!(ensure_access(&AlwaysGranted).await);
    }
}
