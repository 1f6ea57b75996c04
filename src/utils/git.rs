//! Source-control history lookups for page dates.
//!
//! The repository is discovered from the file's directory with gix and the
//! history reachable from `HEAD` is walked for commits that changed the file.
//! Renames are not followed. A file outside a repository, an untracked file,
//! or an unborn `HEAD` all yield `None`; callers fall back to "now".

use super::date::from_unix_seconds;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use gix::{ObjectId, Repository};
use std::path::{Path, PathBuf};

/// Oldest and newest commit times of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct History {
    created: i64,
    modified: i64,
}

/// Time of the most recent commit touching `path`.
pub async fn last_modified(path: &Path) -> Option<DateTime<Utc>> {
    history(path).await.and_then(|h| from_unix_seconds(h.modified))
}

/// Time of the commit that first added `path`.
pub async fn created(path: &Path) -> Option<DateTime<Utc>> {
    history(path).await.and_then(|h| from_unix_seconds(h.created))
}

async fn history(path: &Path) -> Option<History> {
    let path = path.to_path_buf();
    // gix is blocking; keep it off the runtime threads.
    tokio::task::spawn_blocking(move || file_history(&path).ok().flatten())
        .await
        .ok()
        .flatten()
}

fn file_history(path: &Path) -> Result<Option<History>> {
    let path = path.canonicalize()?;
    let dir = path.parent().ok_or_else(|| anyhow!("file has no parent directory"))?;
    let repo = gix::discover(dir)?;
    let root = repo_root(&repo)?;
    let relative = path.strip_prefix(&root)?.to_path_buf();

    let Ok(head) = repo.head_commit() else {
        return Ok(None);
    };
    commit_history(&repo, head.id, &relative)
}

/// Working tree root, the parent of the `.git` directory.
fn repo_root(repo: &Repository) -> Result<PathBuf> {
    let root = repo
        .path()
        .parent()
        .ok_or_else(|| anyhow!("invalid repository path"))?;
    Ok(root.canonicalize()?)
}

/// Walk every commit reachable from `tip` and keep the times of those whose
/// entry for `relative` differs from their first parent's.
fn commit_history(repo: &Repository, tip: ObjectId, relative: &Path) -> Result<Option<History>> {
    let mut found: Option<History> = None;
    for info in repo.rev_walk([tip]).all()? {
        let commit = repo.find_commit(info?.id)?;
        let current = entry_id(commit.tree()?, relative)?;
        if current.is_none() {
            continue;
        }
        let parent = match commit.parent_ids().next() {
            Some(parent) => {
                let tree = repo.find_commit(parent.detach())?.tree()?;
                entry_id(tree, relative)?
            }
            None => None,
        };
        if current == parent {
            continue;
        }

        let seconds = commit.time()?.seconds;
        found = Some(match found {
            Some(h) => History {
                created: h.created.min(seconds),
                modified: h.modified.max(seconds),
            },
            None => History {
                created: seconds,
                modified: seconds,
            },
        });
    }
    Ok(found)
}

fn entry_id(tree: gix::Tree<'_>, relative: &Path) -> Result<Option<ObjectId>> {
    Ok(tree
        .lookup_entry_by_path(relative)?
        .map(|entry| entry.object_id()))
}
