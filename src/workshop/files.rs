//! Project file store and its directory-tree projection.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::blueprint::Blueprint;
use super::preview::ENTRY_POINT;

/// A file of the project being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// Full relative path; unique within the store.
    pub file_name: String,
    /// Intent of the file, copied from the blueprint.
    pub description: String,
    /// Current source text.
    pub content: String,
}

/// Result of a store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The store changed (or already matched the request).
    Applied,
    /// The source path does not exist.
    Missing,
    /// `create_file` targeted a path that is already present.
    AlreadyExists,
    /// `rename_file` targeted a path that is already present.
    DestinationExists,
    /// The path is empty.
    InvalidPath,
}

impl FileOutcome {
    /// Whether the request took effect.
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Ordered collection of project files keyed by path.
///
/// Paths are unique: deserialization rejects duplicates and every mutation
/// preserves uniqueness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ProjectFile>", into = "Vec<ProjectFile>")]
pub struct FileStore {
    files: Vec<ProjectFile>,
}

impl TryFrom<Vec<ProjectFile>> for FileStore {
    type Error = String;

    fn try_from(files: Vec<ProjectFile>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        for file in &files {
            if !seen.insert(file.file_name.as_str()) {
                return Err(format!("duplicate project file {:?}", file.file_name));
            }
        }
        Ok(Self { files })
    }
}

impl From<FileStore> for Vec<ProjectFile> {
    fn from(store: FileStore) -> Self {
        store.files
    }
}

impl FileStore {
    /// One empty file per blueprint entry, in blueprint order.
    #[must_use]
    pub fn scaffold(blueprint: &Blueprint) -> Self {
        let files = blueprint
            .files
            .iter()
            .map(|f| ProjectFile {
                file_name: f.file_name.clone(),
                description: f.description.clone(),
                content: String::new(),
            })
            .collect();
        Self { files }
    }

    /// Replaces the content of `path`.
    pub fn set_content(&mut self, path: &str, content: impl Into<String>) -> FileOutcome {
        match self.get_mut(path) {
            Some(file) => {
                file.content = content.into();
                FileOutcome::Applied
            }
            None => FileOutcome::Missing,
        }
    }

    /// Appends a new file; never overwrites an existing one.
    pub fn create_file(
        &mut self,
        path: &str,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> FileOutcome {
        if path.trim().is_empty() {
            return FileOutcome::InvalidPath;
        }
        if self.contains(path) {
            return FileOutcome::AlreadyExists;
        }
        self.files.push(ProjectFile {
            file_name: path.to_string(),
            description: description.into(),
            content: content.into(),
        });
        FileOutcome::Applied
    }

    /// Removes `path`.
    pub fn delete_file(&mut self, path: &str) -> FileOutcome {
        let before = self.files.len();
        self.files.retain(|f| f.file_name != path);
        if self.files.len() == before {
            FileOutcome::Missing
        } else {
            FileOutcome::Applied
        }
    }

    /// Moves `path` to `new_path`, keeping its position in the store.
    ///
    /// A rename onto another existing file is refused.
    pub fn rename_file(&mut self, path: &str, new_path: &str) -> FileOutcome {
        if new_path.trim().is_empty() {
            return FileOutcome::InvalidPath;
        }
        if !self.contains(path) {
            return FileOutcome::Missing;
        }
        if path == new_path {
            return FileOutcome::Applied;
        }
        if self.contains(new_path) {
            return FileOutcome::DestinationExists;
        }
        if let Some(file) = self.get_mut(path) {
            file.file_name = new_path.to_string();
        }
        FileOutcome::Applied
    }

    /// Looks up a file by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.file_name == path)
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut ProjectFile> {
        self.files.iter_mut().find(|f| f.file_name == path)
    }

    /// Whether `path` is present.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// The preview entry point (`index.html`, case-insensitive).
    #[must_use]
    pub fn entry_point(&self) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.file_name.eq_ignore_ascii_case(ENTRY_POINT))
    }

    /// First file in store order.
    #[must_use]
    pub fn first(&self) -> Option<&ProjectFile> {
        self.files.first()
    }

    /// Files in store order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectFile> {
        self.files.iter()
    }

    /// Paths in store order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.file_name.as_str()).collect()
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Projects the store into nested directories.
    #[must_use]
    pub fn tree(&self) -> Vec<FileTreeNode> {
        build_tree(self.files.iter().map(|f| f.file_name.as_str()))
    }
}

/// Directory-tree view of the store. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTreeNode {
    /// A directory and its children (directories first, then files, by name).
    Directory {
        /// Last path segment.
        name: String,
        /// Path from the project root.
        path: String,
        /// Nested nodes.
        children: Vec<FileTreeNode>,
    },
    /// A file leaf.
    File {
        /// Last path segment.
        name: String,
        /// Full store path.
        path: String,
    },
}

impl FileTreeNode {
    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name, .. } | Self::File { name, .. } => name,
        }
    }
}

#[derive(Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    files: BTreeMap<String, String>,
}

impl DirBuilder {
    fn insert(&mut self, segments: &[&str], full_path: &str) {
        match segments {
            [] => {}
            [leaf] => {
                self.files.insert((*leaf).to_string(), full_path.to_string());
            }
            [dir, rest @ ..] => {
                self.dirs.entry((*dir).to_string()).or_default().insert(rest, full_path);
            }
        }
    }

    fn into_nodes(self, prefix: &str) -> Vec<FileTreeNode> {
        let mut nodes = Vec::with_capacity(self.dirs.len() + self.files.len());
        for (name, dir) in self.dirs {
            let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}/{name}") };
            let children = dir.into_nodes(&path);
            nodes.push(FileTreeNode::Directory { name, path, children });
        }
        for (name, path) in self.files {
            nodes.push(FileTreeNode::File { name, path });
        }
        nodes
    }
}

/// Builds a tree from `/`-separated paths. Empty segments are ignored.
pub fn build_tree<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<FileTreeNode> {
    let mut root = DirBuilder::default();
    for path in paths {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        root.insert(&segments, path);
    }
    root.into_nodes("")
}
