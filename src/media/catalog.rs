use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::media::item::MediaItem;

/// Upper bound on the number of items a catalog may hold.
pub const MAX_ITEMS: usize = 100_000;

/// Ordered, fixed-capacity set of indexed items.
///
/// `capacity` is the dry-run count (capped at [`MAX_ITEMS`]); `items.len()` is
/// what the populate pass actually wrote and never exceeds it. `version` is an
/// opaque generation token for client-side caches.
#[derive(Debug, Default)]
pub struct Catalog {
    items: Vec<MediaItem>,
    capacity: usize,
    version: u64,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap populated items. Anything past `capacity` is dropped.
    pub fn new(mut items: Vec<MediaItem>, capacity: usize, version: u64) -> Self {
        let capacity = capacity.min(MAX_ITEMS);
        items.truncate(capacity);
        Self {
            items,
            capacity,
            version,
        }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// First item in catalog order carrying `id`. Ids are folded into a
    /// catalog-sized range and may collide; later duplicates are unreachable.
    pub fn lookup(&self, id: u32) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Number of items whose id was already taken by an earlier item.
    pub fn duplicate_ids(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.items.len());
        self.items.iter().filter(|item| !seen.insert(item.id)).count()
    }

    /// Make sure this catalog's version differs from (and sorts after) the one
    /// it replaces, even when both builds finished within the same second.
    pub fn ensure_newer_than(&mut self, previous: u64) {
        if self.version <= previous {
            self.version = previous.saturating_add(1);
        }
    }
}

/// Seconds since the Unix epoch, used as the catalog version.
pub fn current_version() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
