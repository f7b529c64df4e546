use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::{DirEntry, DirEntryExt, WalkDir};

use crate::media::catalog::{current_version, Catalog, MAX_ITEMS};
use crate::media::item::{MediaItem, MediaType};
use crate::media::kind::classify;

/// Build a catalog from `roots` in two passes.
///
/// The dry run counts indexable files so the item vector is allocated once at
/// its final size; the populate pass walks the same trees again and stops as
/// soon as that many items have been written. Unreadable roots and subtrees
/// are logged and skipped.
pub fn build(roots: &[PathBuf]) -> Catalog {
    let start = Instant::now();

    let mut found = 0usize;
    for root in roots {
        let _ = walk(root, |_, _| {
            found += 1;
            ControlFlow::Continue(())
        });
    }

    let capacity = if found > MAX_ITEMS {
        tracing::warn!("Item count capped to {} items ({} found)", MAX_ITEMS, found);
        MAX_ITEMS
    } else {
        found
    };

    let mut items = Vec::with_capacity(capacity);
    for root in roots {
        if items.len() == capacity {
            break;
        }
        tracing::info!("Collecting data from {}", root.display());
        let _ = walk(root, |entry, media_type| {
            if items.len() == capacity {
                return ControlFlow::Break(());
            }
            // indexable() only admits UTF-8 paths
            let Some(filepath) = entry.path().to_str() else {
                return ControlFlow::Continue(());
            };
            let file_name = entry.file_name().to_string_lossy();
            let id = item_id(entry.ino(), &file_name, capacity);
            let item = MediaItem::new(id, filepath.to_owned(), media_type);
            tracing::debug!("indexed {} -> {}", item.id, item.filepath());
            items.push(item);
            ControlFlow::Continue(())
        });
    }

    let catalog = Catalog::new(items, capacity, current_version());

    tracing::info!(
        "Indexed {}/{} items in {:.1}s",
        catalog.size(),
        catalog.capacity(),
        start.elapsed().as_secs_f64()
    );
    let duplicates = catalog.duplicate_ids();
    if duplicates > 0 {
        tracing::debug!("{} items share an id with an earlier item", duplicates);
    }

    catalog
}

/// Derive an item id from the file's inode number and name.
///
/// The hash is folded into `[capacity, 2 * capacity)`, so ids never collide
/// with zero but may collide with each other in large catalogs.
pub fn item_id(inode: u64, file_name: &str, capacity: usize) -> u32 {
    let message = format!("{inode}/{file_name}");
    let modulus = u32::try_from(capacity).unwrap_or(u32::MAX).max(1);
    (sax_hash(message.as_bytes()) % modulus) + modulus
}

/// Shift-add-xor hash. Bytes are sign-extended first so non-ASCII names hash
/// the same way as with a signed C `char`.
fn sax_hash(message: &[u8]) -> u32 {
    message.iter().fold(0u32, |h, &byte| {
        let c = i32::from(byte as i8) as u32;
        h ^ (h << 5).wrapping_add(h >> 2).wrapping_add(c)
    })
}

/// Depth-first walk of one root, subdirectories before files, calling `visit`
/// for every indexable regular file until it breaks.
fn walk<F>(root: &Path, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(&DirEntry, MediaType) -> ControlFlow<()>,
{
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(directories_first);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(media_type) = indexable(&entry) else {
            continue;
        };
        if visit(&entry, media_type).is_break() {
            return ControlFlow::Break(());
        }
    }

    ControlFlow::Continue(())
}

/// Both passes must agree on what counts, or the populate pass could write
/// fewer items than the dry run promised.
fn indexable(entry: &DirEntry) -> Option<MediaType> {
    entry.path().to_str()?;
    classify(entry.file_name().to_str()?)
}

fn directories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir.cmp(&a_dir).then_with(|| a.file_name().cmp(b.file_name()))
}
