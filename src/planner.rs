use crate::config::Endpoints;
use crate::domain::{ContentType, TransferJob, TreeNode, companion_path, strip_separator};

/// What to do with one decoded tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Listing URLs of child groups that still have to be fetched.
    Descend(Vec<String>),
    /// Artifacts found beneath the node, ready to stream.
    Transfer(Vec<TransferJob>),
}

/// Probes the first child at each level until a leaf or an empty node is
/// reached. Siblings are assumed to be homogeneous.
pub fn has_artifacts(node: &TreeNode) -> bool {
    match node.children.first() {
        Some(child) if child.leaf => true,
        Some(child) => has_artifacts(child),
        None => false,
    }
}

/// Relative paths of every leaf beneath `node`, each followed by its
/// descriptor path when the leaf carries one.
pub fn artifact_paths(node: &TreeNode) -> Vec<String> {
    let mut paths = Vec::new();
    collect_artifacts(node, &mut paths);
    paths
}

fn collect_artifacts(node: &TreeNode, paths: &mut Vec<String>) {
    for child in &node.children {
        if child.leaf {
            let artifact = child.relative_path().to_string();
            let companion = child
                .has_companion_metadata()
                .then(|| companion_path(&artifact));
            paths.push(artifact);
            paths.extend(companion);
        } else {
            collect_artifacts(child, paths);
        }
    }
}

/// Relative paths of the direct children marked as groups.
pub fn group_paths(node: &TreeNode) -> Vec<String> {
    node.children
        .iter()
        .filter(|child| child.is_group())
        .map(|child| strip_separator(&child.path).to_string())
        .collect()
}

pub fn transfer_job(endpoints: &Endpoints, path: &str) -> TransferJob {
    TransferJob {
        source_url: endpoints.download_url(path),
        target_url: endpoints.upload_url(path),
        content_type: ContentType::for_path(path),
    }
}

pub fn plan_node(node: &TreeNode, endpoints: &Endpoints) -> Plan {
    if has_artifacts(node) {
        let jobs = artifact_paths(node)
            .iter()
            .map(|path| transfer_job(endpoints, path))
            .collect();
        Plan::Transfer(jobs)
    } else {
        let urls = group_paths(node)
            .iter()
            .map(|path| endpoints.listing_url(path))
            .collect();
        Plan::Descend(urls)
    }
}
