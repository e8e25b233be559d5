//! Directory-backed repository
//!
//! Maps node paths onto files below a root directory. A plain directory
//! offers no change observation, so `subscribe` always fails; hosts feed
//! change events themselves.

use super::event::SubscriptionFilter;
use super::path::NodePath;
use super::traits::{
    ChangeListener, ContentRepository, NodeContent, RepositoryError, SubscriptionId,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct FsRepository {
    root: PathBuf,
}

impl FsRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a node
    pub fn file_path(&self, node: &NodePath) -> PathBuf {
        node.segments().fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    /// Node path of a file below the root
    pub fn node_path(&self, file: &Path) -> Result<NodePath, RepositoryError> {
        let relative = file
            .strip_prefix(&self.root)
            .map_err(|_| RepositoryError::MalformedPath(file.display().to_string()))?;
        let joined: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        NodePath::parse(&format!("/{}", joined.join("/")))
    }
}

/// Detect MIME type from file extension.
fn detect_mime_type(path: &Path) -> Option<&'static str> {
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("md") | Some("markdown") => "text/markdown",
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("yaml") | Some("yml") => "text/yaml",
        Some("toml") => "text/toml",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

#[async_trait]
impl ContentRepository for FsRepository {
    fn observation_supported(&self) -> bool {
        false
    }

    fn subscribe(
        &self,
        _filter: SubscriptionFilter,
        _listener: Arc<dyn ChangeListener>,
    ) -> Result<SubscriptionId, RepositoryError> {
        Err(RepositoryError::ObservationUnsupported)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), RepositoryError> {
        Err(RepositoryError::UnknownSubscription(id))
    }

    fn resolve(&self, path: &NodePath) -> Result<NodePath, RepositoryError> {
        if self.file_path(path).is_file() {
            Ok(path.clone())
        } else {
            Err(RepositoryError::NotFound(path.to_string()))
        }
    }

    async fn read(&self, node: &NodePath) -> Result<NodeContent, RepositoryError> {
        let file = self.file_path(node);
        let data = match tokio::fs::read(&file).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::NotFound(node.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(NodeContent {
            data,
            mime_type: detect_mime_type(&file).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_maps_nodes_onto_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "# Title").unwrap();
        std::fs::write(dir.path().join("docs/blob"), [0u8, 1, 2]).unwrap();

        let repo = FsRepository::new(dir.path());
        let a = NodePath::parse("/docs/a.md").unwrap();
        assert_eq!(repo.resolve(&a).unwrap(), a);

        let content = repo.read(&a).await.unwrap();
        assert_eq!(content.data, b"# Title");
        assert_eq!(content.mime_type.as_deref(), Some("text/markdown"));

        let blob = repo.read(&NodePath::parse("/docs/blob").unwrap()).await.unwrap();
        assert_eq!(blob.mime_type, None);
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsRepository::new(dir.path());
        let missing = NodePath::parse("/nope.txt").unwrap();

        assert!(matches!(repo.resolve(&missing), Err(RepositoryError::NotFound(_))));
        assert!(matches!(repo.read(&missing).await, Err(RepositoryError::NotFound(_))));
        // Directories are not content nodes
        assert!(repo.resolve(&NodePath::root()).is_err());
    }

    #[test]
    fn node_path_is_relative_to_root() {
        let repo = FsRepository::new("/srv/content");
        let node = repo.node_path(Path::new("/srv/content/docs/a.md")).unwrap();
        assert_eq!(node.as_str(), "/docs/a.md");
        assert!(repo.node_path(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn observation_is_unsupported() {
        let repo = FsRepository::new("/srv/content");
        assert!(!repo.observation_supported());
    }
}
