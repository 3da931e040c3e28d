//! Directory listing and recursive filename search.

use std::sync::Arc;

use crate::error::VfsError;
use crate::vfs::{join, DeferredOpener, DirEntry, Vfs, ROOT};

use super::view::FileView;

/// List the immediate children of `dir`.
///
/// Children keep the order the filesystem returns them in. Nothing is opened;
/// each view gets a deferred opener bound to `dir/<name>`.
pub async fn list_files<V: Vfs>(vfs: &Arc<V>, dir: &str) -> Result<Vec<FileView<V>>, VfsError> {
    let entries = vfs.read_dir(dir).await?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let opener = DeferredOpener::new(Arc::clone(vfs), join(dir, &entry.name));
            FileView::new(entry, opener)
        })
        .collect())
}

/// Find every entry below `dir` whose path relative to `dir` contains
/// `query` (case-sensitive).
///
/// `dir` itself is never a result. Results come in depth-first, name-sorted
/// order and display their full relative path.
pub async fn search_files<V: Vfs>(
    vfs: &Arc<V>,
    dir: &str,
    query: &str,
) -> Result<Vec<FileView<V>>, VfsError> {
    let mut out = Vec::new();
    walk_dir(vfs.as_ref(), dir, |full_path, relative, entry| {
        if relative.contains(query) {
            let opener = DeferredOpener::new(Arc::clone(vfs), full_path);
            out.push(FileView::new(entry, opener).with_display_path(relative));
        }
    })
    .await?;
    Ok(out)
}

/// Walk the subtree under `dir` depth-first in name order, calling `visit`
/// with each entry's full path, its path relative to `dir`, and the entry.
///
/// `dir` itself is not visited. Any read failure stops the walk. The walk
/// yields at every directory read, so dropping the future abandons it.
pub async fn walk_dir<V, F>(vfs: &V, dir: &str, mut visit: F) -> Result<(), VfsError>
where
    V: Vfs + ?Sized,
    F: FnMut(String, String, DirEntry),
{
    // (full path, relative path, entry), popped from the back
    let mut stack: Vec<(String, String, DirEntry)> = Vec::new();
    push_children(&mut stack, vfs.read_dir(dir).await?, dir, None);

    while let Some((full_path, relative, entry)) = stack.pop() {
        let is_dir = entry.is_dir();
        visit(full_path.clone(), relative.clone(), entry);
        if is_dir {
            let children = vfs.read_dir(&full_path).await?;
            push_children(&mut stack, children, &full_path, Some(&relative));
        }
    }
    Ok(())
}

fn push_children(
    stack: &mut Vec<(String, String, DirEntry)>,
    children: Vec<DirEntry>,
    full_dir: &str,
    relative_dir: Option<&str>,
) {
    for entry in children.into_iter().rev() {
        let full_path = join(full_dir, &entry.name);
        let relative = match relative_dir {
            Some(rel) => join(rel, &entry.name),
            None => join(ROOT, &entry.name),
        };
        stack.push((full_path, relative, entry));
    }
}
