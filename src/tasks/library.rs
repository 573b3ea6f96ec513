//! Item discovery and directory watching.
//!
//! Discovery runs once at startup and again whenever the watched directory
//! settles after a change; the host rebuilds the carousel wholesale from the
//! fresh list rather than patching tiles in place.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use notify::{Event, RecursiveMode, Watcher, recommended_watcher};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use tokio::sync::mpsc::{self, Sender};
use tokio::time::{Instant as TokioInstant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use walkdir::WalkDir;

use crate::carousel::GalleryItem;
use crate::config::LibraryOptions;
use crate::events::LibraryEvent;

const REDISCOVER_QUIET: Duration = Duration::from_millis(500);

/// Build the ordered item list: explicit config entries first, then a
/// recursive scan of `items-dir`. A configured seed makes the shuffle
/// deterministic; without one the discovery order is kept as scanned.
pub fn discover_items(cfg: &LibraryOptions) -> Result<Vec<GalleryItem>> {
    let mut items: Vec<GalleryItem> = cfg
        .items
        .iter()
        .map(|spec| {
            let caption = spec
                .caption
                .clone()
                .unwrap_or_else(|| humanize_stem(&spec.path));
            GalleryItem::from_path(spec.path.clone(), caption)
        })
        .collect();

    if let Some(dir) = cfg.items_dir.as_ref() {
        let mut scanned = Vec::new();
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path().to_path_buf();
            if is_media(&path) {
                let caption = humanize_stem(&path);
                scanned.push(GalleryItem::from_path(path, caption));
            }
        }
        if let Some(seed) = cfg.shuffle_seed {
            scanned.shuffle(&mut rand::rngs::StdRng::seed_from_u64(seed));
        }
        items.extend(scanned);
    }

    info!(discovered = items.len(), "item discovery complete");
    Ok(items)
}

/// Watch `items-dir` and emit a full re-discovery once the directory has
/// been quiet for a short period. No-ops (and returns immediately) when the
/// config names no directory or disables watching.
#[instrument(skip(cfg, to_host, cancel))]
pub async fn run(
    cfg: LibraryOptions,
    to_host: Sender<LibraryEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let Some(dir) = cfg.items_dir.clone().filter(|_| cfg.watch) else {
        debug!("library watching disabled");
        return Ok(());
    };

    // Bridge the notify callback into the async world.
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::Recursive)?;
    info!(watching = %dir.display(), "library watcher initialized (recursive)");

    let mut rediscover_at: Option<TokioInstant> = None;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting library task");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    if event.paths.iter().any(|p| is_media(p)) || event.paths.is_empty() {
                        debug!(kind = ?event.kind, paths = ?event.paths, "library change");
                        rediscover_at = Some(TokioInstant::now() + REDISCOVER_QUIET);
                    }
                }
                Err(err) => error!("watch error: {err}"),
            },

            _ = async {
                match rediscover_at {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => {
                rediscover_at = None;
                match discover_items(&cfg) {
                    Ok(items) => {
                        info!(items = items.len(), "library settled; publishing new item list");
                        if to_host.send(LibraryEvent::ItemsChanged(items)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => error!("re-discovery failed: {err:#}"),
                }
            }
        }
    }
    Ok(())
}

#[inline]
fn is_media(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "webp", "gif"].contains(&e.as_str())
    )
}

/// "sunset_over-bay.jpg" becomes "Sunset Over Bay".
fn humanize_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("Untitled");
    let mut out = String::with_capacity(stem.len());
    let mut start_of_word = true;
    for ch in stem.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !out.ends_with(' ') && !out.is_empty() {
                out.push(' ');
            }
            start_of_word = true;
        } else if start_of_word {
            out.extend(ch.to_uppercase());
            start_of_word = false;
        } else {
            out.push(ch);
        }
    }
    if out.is_empty() {
        "Untitled".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn humanizes_stems() {
        assert_eq!(humanize_stem(Path::new("sunset_over-bay.jpg")), "Sunset Over Bay");
        assert_eq!(humanize_stem(Path::new("IMG.png")), "IMG");
        assert_eq!(humanize_stem(Path::new("a.webp")), "A");
        assert_eq!(humanize_stem(Path::new("___.jpg")), "Untitled");
    }

    #[test]
    fn media_filter_is_case_insensitive() {
        assert!(is_media(Path::new("/a/b.JPG")));
        assert!(is_media(Path::new("/a/b.webp")));
        assert!(!is_media(Path::new("/a/b.txt")));
        assert!(!is_media(Path::new("/a/b")));
    }

    #[tokio::test]
    async fn run_returns_immediately_when_watching_is_disabled() {
        let mut cfg = LibraryOptions::default();
        cfg.watch = false;
        cfg.items_dir = Some(PathBuf::from("/anywhere"));
        let (tx, _rx) = mpsc::channel(4);
        run(cfg, tx, CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn run_honors_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = LibraryOptions::default();
        cfg.items_dir = Some(dir.path().to_path_buf());
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(cfg, tx, cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("library task did not stop on cancel")
            .unwrap()
            .unwrap();
    }
}
