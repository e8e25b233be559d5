//! Node identities: absolute hierarchical paths

use super::traits::RepositoryError;
use serde::{Deserialize, Serialize};

/// Identity of a content node in the watched repository
///
/// Always absolute and normalised: a leading `/`, no trailing `/`, no
/// empty, `.` or `..` segments. The root is `/`. Two resolutions of the
/// same node therefore compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse and normalise a path
    pub fn parse(raw: &str) -> Result<Self, RepositoryError> {
        if !raw.starts_with('/') {
            return Err(RepositoryError::MalformedPath(raw.to_string()));
        }
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        for segment in trimmed[1..].split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(RepositoryError::MalformedPath(raw.to_string()));
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path segments, root has none
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Append a relative path
    pub fn join(&self, relative: &str) -> Result<Self, RepositoryError> {
        let relative = relative.trim_start_matches('/');
        if self.is_root() {
            Self::parse(&format!("/{}", relative))
        } else {
            Self::parse(&format!("{}/{}", self.0, relative))
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// True if `self` is `ancestor` or lies below it
    pub fn is_within(&self, ancestor: &NodePath) -> bool {
        ancestor.is_root()
            || self.0 == ancestor.0
            || (self.0.starts_with(&ancestor.0) && self.0.as_bytes()[ancestor.0.len()] == b'/')
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for NodePath {
    type Error = RepositoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalises_trailing_slash() {
        assert_eq!(NodePath::parse("/docs/a.txt/").unwrap().as_str(), "/docs/a.txt");
        assert_eq!(NodePath::parse("/").unwrap(), NodePath::root());
        assert_eq!(NodePath::parse("///").unwrap(), NodePath::root());
    }

    #[test]
    fn parse_rejects_relative_and_dotted_paths() {
        assert!(NodePath::parse("docs/a").is_err());
        assert!(NodePath::parse("/docs//a").is_err());
        assert!(NodePath::parse("/docs/../a").is_err());
        assert!(NodePath::parse("").is_err());
    }

    #[test]
    fn parent_walks_up_to_root() {
        let path = NodePath::parse("/docs/a.txt").unwrap();
        let parent = path.parent().unwrap();
        assert_eq!(parent.as_str(), "/docs");
        assert_eq!(parent.parent().unwrap(), NodePath::root());
        assert!(NodePath::root().parent().is_none());
    }

    #[test]
    fn is_within_respects_segment_boundaries() {
        let docs = NodePath::parse("/docs").unwrap();
        assert!(NodePath::parse("/docs/a").unwrap().is_within(&docs));
        assert!(docs.is_within(&docs));
        assert!(!NodePath::parse("/docsets/a").unwrap().is_within(&docs));
        assert!(NodePath::parse("/anything").unwrap().is_within(&NodePath::root()));
    }

    #[test]
    fn join_appends_segments() {
        let root = NodePath::root();
        assert_eq!(root.join("a/b").unwrap().as_str(), "/a/b");
        assert_eq!(NodePath::parse("/a").unwrap().join("b").unwrap().as_str(), "/a/b");
    }

    #[test]
    fn deserialization_validates() {
        let ok: NodePath = serde_json::from_str("\"/a/b\"").unwrap();
        assert_eq!(ok.as_str(), "/a/b");
        assert!(serde_json::from_str::<NodePath>("\"a/b\"").is_err());
    }
}
