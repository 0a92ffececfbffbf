//! Batch pipeline tying the registry, the engine and the packager together.
//!
//! A [`BundleSession`] shares one [`BatchRegistry`] behind a mutex. File reads,
//! encoding and archiving run outside the lock; only registry mutations take
//! it, and never across an `.await`. Results always travel with their
//! [`ItemId`], so an item removed mid-compression is simply not updated.

use crate::archive::{self, ArchiveEntry};
use crate::constants::ARCHIVE_FILE_NAME;
use crate::engine::{self, CompressedImage, Quality};
use crate::error::{CompressionError, Result};
use crate::limits::{estimate_decoded_memory_mib, plan_parallelism};
use crate::registry::{BatchRegistry, EmptyListener, Item, ItemId, ItemState, ItemSummary};
use crate::sources::SourceFile;
use crate::utils::calculate_compression_ratio;
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_concurrency: Option<usize>,
    pub archive_name: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            archive_name: ARCHIVE_FILE_NAME.to_string(),
        }
    }
}

impl SessionOptions {
    /// `max_concurrency` of `None` or `0` means one task per CPU. Archive
    /// names always end in `.zip`.
    pub fn new(max_concurrency: Option<usize>, archive_name: Option<String>) -> Self {
        let archive_name = match archive_name {
            Some(name) if !name.trim().is_empty() => {
                let name = name.trim().to_string();
                if name.to_lowercase().ends_with(".zip") {
                    name
                } else {
                    format!("{}.zip", name)
                }
            }
            _ => ARCHIVE_FILE_NAME.to_string(),
        };

        Self {
            max_concurrency: max_concurrency.filter(|&n| n > 0),
            archive_name,
        }
    }
}

/// Outcome of [`BundleSession::add_files`]
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<ItemSummary>,
    pub failed: Vec<(String, CompressionError)>,
}

#[derive(Debug)]
pub struct ItemFailure {
    pub id: ItemId,
    pub name: String,
    pub error: CompressionError,
}

/// Outcome of one [`BundleSession::compress_all`] run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items whose new output was recorded, in registry id order
    pub compressed: Vec<ItemSummary>,
    pub failed: Vec<ItemFailure>,
    /// Items removed while their compression was in flight
    pub stale: Vec<ItemId>,
    pub original_total: u64,
    pub compressed_total: u64,
}

impl BatchReport {
    pub fn compression_ratio(&self) -> f64 {
        calculate_compression_ratio(self.original_total, self.compressed_total)
    }
}

/// The archive ready to hand to the user
#[derive(Debug, Clone)]
pub struct Bundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Shared handle on one batch. Clones see the same registry.
///
/// The emptiness callback lives outside the registry lock and runs after it is
/// released, so it may call back into the session.
#[derive(Clone, Default)]
pub struct BundleSession {
    registry: Arc<Mutex<BatchRegistry>>,
    on_empty: Arc<Mutex<Option<EmptyListener>>>,
    options: SessionOptions,
}

impl fmt::Debug for BundleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleSession")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BundleSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            registry: Arc::new(Mutex::new(BatchRegistry::new())),
            on_empty: Arc::new(Mutex::new(None)),
            options,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, BatchRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the callback fired when removal empties the batch.
    pub fn on_empty<F>(&self, listener: F)
    where
        F: FnMut() + Send + 'static,
    {
        let mut slot = self.on_empty.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Box::new(listener));
    }

    /// Reads all files concurrently and appends them in selection order.
    ///
    /// A file that cannot be read is logged and reported; the rest of the
    /// batch is still added.
    pub async fn add_files(&self, files: Vec<SourceFile>) -> AddReport {
        let reads: Vec<_> = files
            .into_iter()
            .map(|file| {
                let name = file.name.clone();
                (name, tokio::spawn(async move { file.read().await }))
            })
            .collect();

        let mut report = AddReport::default();
        for (name, handle) in reads {
            let loaded = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CompressionError::Task(e)),
            };
            let inserted = loaded.and_then(|loaded| {
                let mut registry = self.lock();
                let id = registry.insert(loaded)?;
                registry
                    .get(id)
                    .map(Item::summary)
                    .ok_or(CompressionError::NotFound(id))
            });

            match inserted {
                Ok(summary) => report.added.push(summary),
                Err(e) => {
                    crate::warn!("Skipping {}: {}", name, e);
                    report.failed.push((name, e));
                }
            }
        }
        report
    }

    pub fn remove(&self, id: ItemId) -> Result<()> {
        let (_, emptied) = self.lock().detach(id)?;
        if emptied {
            let mut slot = self.on_empty.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(listener) = slot.as_mut() {
                listener();
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn summaries(&self) -> Vec<ItemSummary> {
        self.lock().summaries()
    }

    /// Clone of an item as currently stored
    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Records a compression result by identity.
    ///
    /// # Returns
    /// * `Ok(true)` - the output was stored
    /// * `Ok(false)` - the item was removed in the meantime; nothing changed
    /// * `Err(_)` - the output was rejected
    pub fn record(&self, id: ItemId, output: CompressedImage) -> Result<bool> {
        match self.lock().record_compressed(id, output) {
            Ok(()) => Ok(true),
            Err(CompressionError::NotFound(_)) => {
                crate::verbose!("Dropping result for removed item {}", id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Compresses a single item.
    ///
    /// Returns `Ok(None)` when the item disappeared before its result landed.
    pub async fn compress_item(&self, id: ItemId, quality: Quality) -> Result<Option<ItemSummary>> {
        let item = self.item(id).ok_or(CompressionError::NotFound(id))?;
        let output = engine::compress_async(&item, quality).await?;

        if !self.record(id, output)? {
            return Ok(None);
        }
        Ok(self.lock().get(id).map(Item::summary))
    }

    /// Compresses every item currently in the batch.
    ///
    /// Items run concurrently up to the planned parallelism. A failing item is
    /// reported and keeps its previous state; it never stops its siblings.
    pub async fn compress_all(
        &self,
        quality: Quality,
        progress: Option<&ProgressBar>,
    ) -> Result<BatchReport> {
        let snapshot: Vec<Item> = self.lock().list_all().to_vec();
        if snapshot.is_empty() {
            return Ok(BatchReport::default());
        }

        let estimates: Vec<f64> = snapshot
            .iter()
            .map(|item| estimate_decoded_memory_mib(item.original_size(), item.mime_type()))
            .collect();
        let parallelism = plan_parallelism(&estimates, self.options.max_concurrency)?;
        crate::verbose!(
            "Compressing {} images at quality {} with {} parallel tasks",
            snapshot.len(),
            quality.value(),
            parallelism
        );

        let semaphore = Arc::new(Semaphore::new(parallelism));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        for item in snapshot {
            let semaphore = semaphore.clone();
            let owner = (item.id(), item.original_name().to_string());
            let handle = tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = engine::compress_async(&item, quality).await;
                (item, result)
            });
            in_flight.insert(handle.id(), owner);
        }

        Ok(self.collect_results(tasks, in_flight, progress).await)
    }

    async fn collect_results(
        &self,
        mut tasks: JoinSet<(Item, Result<CompressedImage>)>,
        mut in_flight: HashMap<task::Id, (ItemId, String)>,
        progress: Option<&ProgressBar>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            if let Some(pb) = progress {
                pb.inc(1);
            }

            let (item, result) = match joined {
                Ok((task_id, outcome)) => {
                    in_flight.remove(&task_id);
                    outcome
                }
                Err(e) => {
                    crate::error!("Compression task failed: {}", e);
                    if let Some((id, name)) = in_flight.remove(&e.id()) {
                        report.failed.push(ItemFailure {
                            id,
                            name,
                            error: CompressionError::Task(e),
                        });
                    }
                    continue;
                }
            };

            let recorded = result.and_then(|output| {
                let size = output.size();
                self.record(item.id(), output).map(|stored| stored.then_some(size))
            });

            match recorded {
                Ok(Some(size)) => {
                    report.original_total += item.original_size();
                    report.compressed_total += size;
                    report.compressed.push(ItemSummary {
                        id: item.id(),
                        name: item.original_name().to_string(),
                        size,
                        state: ItemState::Compressed,
                    });
                }
                Ok(None) => report.stale.push(item.id()),
                Err(e) => {
                    crate::error!("Failed to compress {}: {}", item.original_name(), e);
                    report.failed.push(ItemFailure {
                        id: item.id(),
                        name: item.original_name().to_string(),
                        error: e,
                    });
                }
            }
        }

        report.compressed.sort_by_key(|summary| summary.id);
        report.failed.sort_by_key(|failure| failure.id);
        report.stale.sort();
        report
    }

    /// Entries for every compressed item, in batch order
    pub fn compressed_entries(&self) -> Vec<ArchiveEntry> {
        self.lock().compressed_entries()
    }

    /// Packages all compressed outputs.
    ///
    /// Fails with `EmptyInput` when nothing has been compressed yet.
    pub async fn build_archive(&self) -> Result<Bundle> {
        let entries = self.compressed_entries();
        if entries.is_empty() {
            return Err(CompressionError::EmptyInput);
        }

        let bytes = archive::build_async(entries).await?;
        Ok(Bundle {
            file_name: self.options.archive_name.clone(),
            bytes,
        })
    }

    /// Builds the archive and writes it into `output_dir`.
    pub async fn write_archive(&self, output_dir: &Path) -> Result<PathBuf> {
        let bundle = self.build_archive().await?;
        tokio::fs::create_dir_all(output_dir).await?;

        let path = output_dir.join(&bundle.file_name);
        tokio::fs::write(&path, &bundle.bytes).await?;
        crate::verbose!("Wrote {} bytes to {:?}", bundle.bytes.len(), path);
        Ok(path)
    }
}
