//! Disk Store Module
//!
//! Write-through persistence of namespaces as
//! `<root>/<namespace>/index.json` plus `<root>/<namespace>/items/<key>.dat`.
//!
//! Names too long for a file name are stored under a hashed component; a
//! hashed namespace directory also holds a `name` file with the real
//! namespace, and keys are always recovered from the index.
//!
//! Item file and index are written separately, so a crash between the two
//! can leave index entries without an item file. Loading treats those
//! entries as absent.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, warn};

use crate::cache::{CacheItem, Namespace};
use crate::error::Result;
use crate::persistence::{
    decode_component, is_hashed_component, path_component, IndexEntry, NamespaceIndex,
};

const INDEX_FILE: &str = "index.json";
const INDEX_TMP_FILE: &str = "index.json.tmp";
const NAME_FILE: &str = "name";
const ITEMS_DIR: &str = "items";
const ITEM_EXTENSION: &str = "dat";

// == Disk Store ==
/// File-system backed store for cache namespaces.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(path_component(namespace))
    }

    fn items_dir(&self, namespace: &str) -> PathBuf {
        self.namespace_dir(namespace).join(ITEMS_DIR)
    }

    fn index_path(&self, namespace: &str) -> PathBuf {
        self.namespace_dir(namespace).join(INDEX_FILE)
    }

    fn item_file_name(key: &str) -> String {
        format!("{}.{}", path_component(key), ITEM_EXTENSION)
    }

    fn item_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.items_dir(namespace).join(Self::item_file_name(key))
    }

    // == Index I/O ==
    /// Reads a namespace's index; a missing index is an empty one.
    pub async fn read_index(&self, namespace: &str) -> Result<NamespaceIndex> {
        match fs::read(self.index_path(namespace)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(NamespaceIndex::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the index through a temporary file renamed into place.
    pub async fn write_index(&self, namespace: &str, index: &NamespaceIndex) -> Result<()> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir).await?;
        if is_hashed_component(&path_component(namespace)) {
            fs::write(dir.join(NAME_FILE), namespace).await?;
        }

        let tmp = dir.join(INDEX_TMP_FILE);
        fs::write(&tmp, serde_json::to_vec_pretty(index)?).await?;
        fs::rename(&tmp, dir.join(INDEX_FILE)).await?;
        Ok(())
    }

    /// Index for a read-modify-write cycle; a corrupt index is replaced.
    async fn index_for_update(&self, namespace: &str) -> Result<NamespaceIndex> {
        match self.read_index(namespace).await {
            Ok(index) => Ok(index),
            Err(crate::error::CacheError::Serialization(err)) => {
                warn!(namespace = %namespace, error = %err, "Corrupt cache index, rebuilding");
                Ok(NamespaceIndex::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn write_item_file(&self, namespace: &str, item: &CacheItem) -> Result<()> {
        fs::create_dir_all(self.items_dir(namespace)).await?;
        let bytes = serde_json::to_vec(item.value())?;
        fs::write(self.item_path(namespace, item.key()), bytes).await?;
        Ok(())
    }

    // == Save One ==
    /// Writes one item's file, then records it in the namespace index.
    pub async fn save_item(&self, namespace: &str, item: &CacheItem) -> Result<()> {
        self.write_item_file(namespace, item).await?;

        let mut index = self.index_for_update(namespace).await?;
        index.insert(item.key().to_string(), IndexEntry::from(item));
        self.write_index(namespace, &index).await
    }

    // == Delete One ==
    /// Removes one item's file and index entry. Absence is success.
    pub async fn delete_item(&self, namespace: &str, key: &str) -> Result<()> {
        remove_file_if_exists(&self.item_path(namespace, key)).await?;

        let mut index = self.index_for_update(namespace).await?;
        if index.remove(key).is_some() {
            self.write_index(namespace, &index).await?;
        }
        Ok(())
    }

    // == Clear Namespace ==
    /// Deletes all item files and rewrites the index as empty.
    pub async fn clear_namespace(&self, namespace: &str) -> Result<()> {
        match fs::remove_dir_all(self.items_dir(namespace)).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        self.write_index(namespace, &NamespaceIndex::new()).await
    }

    // == Save All ==
    /// Writes every namespace's live items and index, skipping items already
    /// expired at `now`, and prunes item files no longer indexed.
    ///
    /// A failing namespace is logged and skipped. Returns how many
    /// namespaces were written.
    pub async fn save_all(
        &self,
        namespaces: &HashMap<String, Namespace>,
        now: DateTime<Utc>,
    ) -> usize {
        let mut saved = 0;
        for (name, namespace) in namespaces {
            match self.save_namespace(name, namespace, now).await {
                Ok(()) => saved += 1,
                Err(err) => {
                    warn!(namespace = %name, error = %err, "Failed to persist cache namespace");
                }
            }
        }
        saved
    }

    async fn save_namespace(
        &self,
        name: &str,
        namespace: &Namespace,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut index = NamespaceIndex::new();
        for item in namespace.items().filter(|item| !item.is_expired_at(now)) {
            match self.write_item_file(name, item).await {
                Ok(()) => {
                    index.insert(item.key().to_string(), IndexEntry::from(item));
                }
                Err(err) => {
                    warn!(namespace = %name, key = %item.key(), error = %err, "Failed to write cache item");
                }
            }
        }
        self.write_index(name, &index).await?;
        self.prune_orphans(name, &index).await
    }

    async fn prune_orphans(&self, namespace: &str, index: &NamespaceIndex) -> Result<()> {
        let expected: HashSet<String> = index.keys().map(|k| Self::item_file_name(k)).collect();

        let mut entries = match fs::read_dir(self.items_dir(namespace)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !expected.contains(&file_name) {
                debug!(namespace = %namespace, file = %file_name, "Pruning orphaned item file");
                remove_file_if_exists(&entry.path()).await?;
            }
        }
        Ok(())
    }

    // == Load All ==
    /// Loads every on-disk namespace, skipping entries expired at `now`.
    ///
    /// Corrupt indexes and unreadable items are logged and skipped; index
    /// entries without an item file are skipped silently. Only failure to
    /// list the root directory is an error.
    pub async fn load_all(&self, now: DateTime<Utc>) -> Result<HashMap<String, Vec<CacheItem>>> {
        let mut loaded = HashMap::new();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(loaded),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            let namespace = if is_hashed_component(&dir_name) {
                read_namespace_name(&entry.path(), &dir_name).await
            } else {
                decode_component(&dir_name)
            };
            let Some(namespace) = namespace else {
                warn!(directory = %dir_name, "Skipping unrecognised cache directory");
                continue;
            };

            let index = match self.read_index(&namespace).await {
                Ok(index) => index,
                Err(err) => {
                    warn!(namespace = %namespace, error = %err, "Skipping unreadable cache index");
                    continue;
                }
            };

            let items = self.load_namespace(&namespace, index, now).await;
            loaded.insert(namespace, items);
        }

        Ok(loaded)
    }

    async fn load_namespace(
        &self,
        namespace: &str,
        index: NamespaceIndex,
        now: DateTime<Utc>,
    ) -> Vec<CacheItem> {
        let mut items = Vec::with_capacity(index.len());
        for (key, entry) in index {
            if entry.is_expired_at(now) {
                continue;
            }

            let bytes = match fs::read(self.item_path(namespace, &key)).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(namespace = %namespace, key = %key, "Index entry without item file");
                    continue;
                }
                Err(err) => {
                    warn!(namespace = %namespace, key = %key, error = %err, "Failed to read cache item");
                    continue;
                }
            };

            let value = match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(err) => {
                    warn!(namespace = %namespace, key = %key, error = %err, "Skipping corrupt cache item");
                    continue;
                }
            };

            items.push(CacheItem::restore(
                key,
                value,
                entry.created_at,
                entry.expires_at,
                entry.metadata,
            ));
        }
        items.sort_by_key(|item| item.created_at());
        items
    }
}

/// Real name of a hashed namespace directory, if its `name` file matches.
async fn read_namespace_name(dir: &Path, dir_name: &str) -> Option<String> {
    let name = fs::read_to_string(dir.join(NAME_FILE)).await.ok()?;
    (path_component(&name) == dir_name).then_some(name)
}

async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
