//! Ordered collection of uploaded images and their compression state.
//!
//! The registry exclusively owns every [`Item`]. Other components get
//! borrowed views or clones of the immutable payloads, and all mutation goes
//! through the operations here.

use crate::archive::ArchiveEntry;
use crate::constants::MAX_BATCH_FILES;
use crate::engine::CompressedImage;
use crate::error::{CompressionError, Result};
use crate::sources::{LoadedFile, SourceFile};
use crate::utils::format_kib;
use std::fmt;
use std::sync::Arc;

/// Stable identity of an item, never reused within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    pub fn from_raw(raw: u64) -> Self {
        ItemId(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Compressed,
}

/// One uploaded image
#[derive(Debug, Clone)]
pub struct Item {
    id: ItemId,
    original_name: String,
    original_bytes: Arc<[u8]>,
    mime_type: String,
    compressed: Option<CompressedImage>,
}

impl Item {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn original_bytes(&self) -> &Arc<[u8]> {
        &self.original_bytes
    }

    pub fn original_size(&self) -> u64 {
        self.original_bytes.len() as u64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn compressed(&self) -> Option<&CompressedImage> {
        self.compressed.as_ref()
    }

    pub fn compressed_size(&self) -> Option<u64> {
        self.compressed.as_ref().map(|c| c.size())
    }

    pub fn state(&self) -> ItemState {
        if self.compressed.is_some() {
            ItemState::Compressed
        } else {
            ItemState::Pending
        }
    }

    /// Size shown to the user: the compressed size once there is one
    pub fn display_size(&self) -> u64 {
        self.compressed_size().unwrap_or_else(|| self.original_size())
    }

    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id,
            name: self.original_name.clone(),
            size: self.display_size(),
            state: self.state(),
        }
    }
}

/// A `(name, size)` row for display, tagged with identity and state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub id: ItemId,
    pub name: String,
    pub size: u64,
    pub state: ItemState,
}

impl ItemSummary {
    /// e.g. `cat.png (12.34 KB)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, format_kib(self.size))
    }
}

/// Callback fired when the batch becomes empty
pub type EmptyListener = Box<dyn FnMut() + Send>;

#[derive(Default)]
pub struct BatchRegistry {
    items: Vec<Item>,
    next_id: u64,
    on_empty: Option<EmptyListener>,
}

impl fmt::Debug for BatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRegistry")
            .field("items", &self.items)
            .field("next_id", &self.next_id)
            .field("on_empty", &self.on_empty.is_some())
            .finish()
    }
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback fired when `remove` empties the registry.
    pub fn on_empty<F>(&mut self, listener: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_empty = Some(Box::new(listener));
    }

    /// Reads every file in selection order and appends one pending item per
    /// successful read. Failed reads are logged and skipped.
    pub async fn add(&mut self, files: &[SourceFile]) -> Vec<ItemId> {
        let mut added = Vec::with_capacity(files.len());
        for file in files {
            let inserted = match file.read().await {
                Ok(loaded) => self.insert(loaded),
                Err(e) => Err(e),
            };
            match inserted {
                Ok(id) => added.push(id),
                Err(e) => crate::warn!("Skipping {}: {}", file.name, e),
            }
        }
        added
    }

    /// Appends an already-read file as a new pending item.
    pub fn insert(&mut self, loaded: LoadedFile) -> Result<ItemId> {
        if self.items.len() >= MAX_BATCH_FILES {
            return Err(CompressionError::BatchFileLimitExceeded(
                self.items.len() + 1,
                MAX_BATCH_FILES,
            ));
        }

        let id = ItemId(self.next_id);
        self.next_id += 1;
        crate::verbose!(
            "Added {} {} ({} bytes, {})",
            id,
            loaded.name,
            loaded.bytes.len(),
            loaded.mime_type
        );
        self.items.push(Item {
            id,
            original_name: loaded.name,
            original_bytes: loaded.bytes,
            mime_type: loaded.mime_type,
            compressed: None,
        });
        Ok(id)
    }

    /// Removes an item whatever its state.
    pub fn remove(&mut self, id: ItemId) -> Result<Item> {
        let (removed, emptied) = self.detach(id)?;
        if emptied {
            if let Some(listener) = self.on_empty.as_mut() {
                listener();
            }
        }
        Ok(removed)
    }

    /// Removes an item without firing the emptiness callback.
    ///
    /// The flag is `true` when this removal took the last item, so a caller
    /// holding the registry behind a lock can signal after releasing it.
    pub fn detach(&mut self, id: ItemId) -> Result<(Item, bool)> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        crate::verbose!("Removed {} {}", id, removed.original_name);
        Ok((removed, self.items.is_empty()))
    }

    /// Drops every item. Ids keep counting up.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Stores (or replaces) the compressed output of an item.
    pub fn record_compressed(&mut self, id: ItemId, output: CompressedImage) -> Result<()> {
        let index = self.position(id)?;
        let item = &mut self.items[index];
        if output.mime_type() != item.mime_type {
            return Err(CompressionError::MimeMismatch {
                expected: item.mime_type.clone(),
                actual: output.mime_type().to_string(),
            });
        }
        item.compressed = Some(output);
        Ok(())
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn list_all(&self) -> &[Item] {
        &self.items
    }

    pub fn list_pending(&self) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(|item| item.state() == ItemState::Pending)
    }

    pub fn list_compressed(&self) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(|item| item.state() == ItemState::Compressed)
    }

    /// Archive entries for every compressed item, under its original name.
    pub fn compressed_entries(&self) -> Vec<ArchiveEntry> {
        self.list_compressed()
            .filter_map(|item| {
                item.compressed.as_ref().map(|output| {
                    ArchiveEntry::new(item.original_name.clone(), output.bytes().clone())
                })
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<ItemSummary> {
        self.items.iter().map(Item::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: ItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or(CompressionError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loaded(name: &str, len: usize) -> LoadedFile {
        LoadedFile {
            name: name.to_string(),
            bytes: vec![0u8; len].into(),
            mime_type: "image/png".to_string(),
        }
    }

    fn output(bytes: &[u8], mime_type: &str) -> CompressedImage {
        CompressedImage::new(bytes.to_vec(), mime_type, 1, 1)
    }

    #[test]
    fn test_insert_preserves_order_and_assigns_unique_ids() {
        let mut registry = BatchRegistry::new();
        let a = registry.insert(loaded("a.png", 500)).unwrap();
        let b = registry.insert(loaded("b.png", 800)).unwrap();

        assert_ne!(a, b);
        let names: Vec<_> = registry.list_all().iter().map(|i| i.original_name()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert!(registry.list_all().iter().all(|i| i.state() == ItemState::Pending));
        assert_eq!(registry.get(b).unwrap().original_size(), 800);
    }

    #[test]
    fn test_ids_are_not_reused_after_remove_or_reset() {
        let mut registry = BatchRegistry::new();
        let a = registry.insert(loaded("a.png", 1)).unwrap();
        registry.remove(a).unwrap();
        let b = registry.insert(loaded("b.png", 1)).unwrap();
        registry.reset();
        let c = registry.insert(loaded("c.png", 1)).unwrap();

        assert!(a < b && b < c);
    }

    #[test]
    fn test_record_compressed_transitions_and_overwrites() {
        let mut registry = BatchRegistry::new();
        let id = registry.insert(loaded("a.png", 500)).unwrap();

        registry.record_compressed(id, output(&[1, 2, 3], "image/png")).unwrap();
        assert_eq!(registry.get(id).unwrap().state(), ItemState::Compressed);
        assert_eq!(registry.get(id).unwrap().compressed_size(), Some(3));

        registry.record_compressed(id, output(&[9], "image/png")).unwrap();
        let item = registry.get(id).unwrap();
        assert_eq!(&**item.compressed().unwrap().bytes(), &[9]);
        assert_eq!(item.display_size(), 1);
    }

    #[test]
    fn test_record_compressed_rejects_other_mime_type() {
        let mut registry = BatchRegistry::new();
        let id = registry.insert(loaded("a.png", 10)).unwrap();

        let result = registry.record_compressed(id, output(&[1], "image/jpeg"));
        assert!(matches!(result, Err(CompressionError::MimeMismatch { .. })));
        assert_eq!(registry.get(id).unwrap().state(), ItemState::Pending);
    }

    #[test]
    fn test_record_after_remove_is_not_found_and_does_not_resurrect() {
        let mut registry = BatchRegistry::new();
        let a = registry.insert(loaded("a.png", 10)).unwrap();
        registry.insert(loaded("b.png", 10)).unwrap();
        registry.remove(a).unwrap();

        let result = registry.record_compressed(a, output(&[1], "image/png"));
        assert!(matches!(result, Err(CompressionError::NotFound(id)) if id == a));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(a).is_none());
    }

    #[test]
    fn test_remove_unknown_id_is_not_found() {
        let mut registry = BatchRegistry::new();
        let result = registry.remove(ItemId::from_raw(42));
        assert!(matches!(result, Err(CompressionError::NotFound(_))));
    }

    #[test]
    fn test_empty_signal_fires_once_when_last_item_removed() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let mut registry = BatchRegistry::new();
        registry.on_empty(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let a = registry.insert(loaded("a.png", 1)).unwrap();
        let b = registry.insert(loaded("b.png", 1)).unwrap();

        registry.remove(a).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        registry.remove(b).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // No further transition, no further signal
        assert!(registry.remove(b).is_err());
        registry.reset();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detach_reports_emptying_without_signalling() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let mut registry = BatchRegistry::new();
        registry.on_empty(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let a = registry.insert(loaded("a.png", 1)).unwrap();
        let b = registry.insert(loaded("b.png", 1)).unwrap();

        let (item, emptied) = registry.detach(a).unwrap();
        assert_eq!(item.id(), a);
        assert!(!emptied);
        let (_, emptied) = registry.detach(b).unwrap();
        assert!(emptied);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pending_and_compressed_views() {
        let mut registry = BatchRegistry::new();
        let a = registry.insert(loaded("a.png", 1)).unwrap();
        registry.insert(loaded("b.png", 1)).unwrap();
        registry.record_compressed(a, output(&[5, 5], "image/png")).unwrap();

        let pending: Vec<_> = registry.list_pending().map(|i| i.original_name()).collect();
        assert_eq!(pending, vec!["b.png"]);

        let entries = registry.compressed_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.png");
        assert_eq!(&*entries[0].bytes, &[5, 5]);
    }

    #[test]
    fn test_summary_label() {
        let mut registry = BatchRegistry::new();
        registry.insert(loaded("cat.png", 2048)).unwrap();
        assert_eq!(registry.summaries()[0].label(), "cat.png (2.00 KB)");
    }

    #[tokio::test]
    async fn test_add_skips_failed_reads_without_aborting() {
        let mut registry = BatchRegistry::new();
        let files = vec![
            SourceFile::from_bytes("a.png", vec![1u8; 4]),
            SourceFile::from_path("/no/such/dir/missing.png"),
            SourceFile::from_bytes("b.png", vec![2u8; 8]),
        ];

        let added = registry.add(&files).await;
        assert_eq!(added.len(), 2);
        let names: Vec<_> = registry.list_all().iter().map(|i| i.original_name()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
