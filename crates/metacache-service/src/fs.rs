//! Metadata of files and directories on the local file system.

use std::collections::BTreeSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::cache::{PropertyEntry, PropertyError, PropertyMap};
use crate::provider::{ByteSize, Entity, MetadataProvider};

/// The size of a file in bytes. Directories have a size of `0`.
pub const SIZE: &str = "size";
/// The last modification time.
pub const MODIFICATION_TIME: &str = "modificationTime";
/// Whether the entry is a directory.
pub const IS_DIRECTORY: &str = "isDirectory";

/// A file or directory.
///
/// Symbolic links are not followed; a link is treated as a file of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FsEntry {
    path: PathBuf,
    is_dir: bool,
}

impl FsEntry {
    /// Looks up the entry at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PropertyError> {
        let path = path.into();
        let metadata = tokio::fs::symlink_metadata(&path).await?;
        Ok(Self {
            is_dir: metadata.is_dir(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Entity for FsEntry {
    type Key = PathBuf;

    fn key(&self) -> PathBuf {
        self.path.clone()
    }

    fn is_container(&self) -> bool {
        self.is_dir
    }

    fn list_children(&self) -> BoxFuture<'_, Result<Vec<Self>, PropertyError>> {
        Box::pin(async move {
            let mut read_dir = tokio::fs::read_dir(&self.path).await?;
            let mut children = Vec::new();
            while let Some(entry) = read_dir.next_entry().await? {
                let file_type = entry.file_type().await?;
                children.push(FsEntry {
                    path: entry.path(),
                    is_dir: file_type.is_dir(),
                });
            }
            children.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(children)
        })
    }
}

/// A property value of an [`FsEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FsValue {
    Size(u64),
    ModificationTime(SystemTime),
    IsDirectory(bool),
}

impl ByteSize for FsValue {
    fn byte_size(&self) -> Option<u64> {
        match self {
            FsValue::Size(size) => Some(*size),
            _ => None,
        }
    }
}

/// Loads [`SIZE`], [`MODIFICATION_TIME`] and [`IS_DIRECTORY`] from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadataProvider;

impl FsMetadataProvider {
    fn property(metadata: &Metadata, name: &str) -> PropertyEntry<FsValue> {
        match name {
            SIZE if metadata.is_dir() => Ok(FsValue::Size(0)),
            SIZE => Ok(FsValue::Size(metadata.len())),
            MODIFICATION_TIME => Ok(FsValue::ModificationTime(metadata.modified()?)),
            IS_DIRECTORY => Ok(FsValue::IsDirectory(metadata.is_dir())),
            other => Err(PropertyError::Unsupported(other.to_owned())),
        }
    }
}

impl MetadataProvider for FsMetadataProvider {
    type Entity = FsEntry;
    type Value = FsValue;

    fn load<'a>(
        &'a self,
        entity: &'a FsEntry,
        names: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<PropertyMap<FsValue>, PropertyError>> {
        Box::pin(async move {
            let metadata = tokio::fs::symlink_metadata(&entity.path).await?;
            Ok(names
                .iter()
                .map(|name| (name.clone(), Self::property(&metadata, name)))
                .collect())
        })
    }
}
