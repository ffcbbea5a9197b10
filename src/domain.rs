use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub const GROUP_KIND: &str = "G";
pub const ARCHIVE_TOKEN: &str = "jar";
pub const DESCRIPTOR_TOKEN: &str = "pom";
pub const DESCRIPTOR_SUFFIX: &str = ".pom";

/// Body of a tree-listing response: `{ "data": <node> }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TreeResponse {
    pub data: TreeNode,
}

/// One node of the repository hierarchy as returned by the tree-browsing API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeNode {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub leaf: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub node_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub children: Vec<TreeNode>,
    #[serde(deserialize_with = "null_as_default")]
    pub repository_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub locally_available: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub artifact_timestamp: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub artifact_uri: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pom_uri: String,
    #[serde(deserialize_with = "null_as_default")]
    pub group_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub artifact_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub extension: String,
    #[serde(deserialize_with = "null_as_default")]
    pub packaging: String,
}

/// Treats an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl TreeNode {
    pub fn is_group(&self) -> bool {
        self.kind == GROUP_KIND
    }

    /// A leaf with a non-empty `pomUri` has a descriptor file next to it.
    pub fn has_companion_metadata(&self) -> bool {
        !self.pom_uri.is_empty()
    }

    /// Root-relative path without the leading separator.
    pub fn relative_path(&self) -> &str {
        strip_separator(&self.path)
    }
}

pub fn strip_separator(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Path of the descriptor that accompanies `artifact_path`: the first `jar`
/// token is replaced by `pom`.
pub fn companion_path(artifact_path: &str) -> String {
    artifact_path.replacen(ARCHIVE_TOKEN, DESCRIPTOR_TOKEN, 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Xml,
    JavaArchive,
}

impl ContentType {
    pub fn for_path(path: &str) -> Self {
        if path.ends_with(DESCRIPTOR_SUFFIX) {
            ContentType::Xml
        } else {
            ContentType::JavaArchive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Xml => "application/xml",
            ContentType::JavaArchive => "application/java-archive",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One artifact move from the source server to the target server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source_url: String,
    pub target_url: String,
    pub content_type: ContentType,
}

#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub source: BasicAuth,
    pub target: BasicAuth,
}
