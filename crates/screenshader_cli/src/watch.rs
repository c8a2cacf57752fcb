//! Shader file watcher
//!
//! Watches the shader's directory rather than the file itself so editors
//! that save by rename still trigger a reload.

use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use screenshader_core::LoopFlags;

/// Whether a filesystem event should reload the shader named `file_name`
fn is_reload_trigger(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// Raise the reload flag whenever `shader` is modified or re-created
///
/// The returned watcher must be kept alive for as long as reloads are wanted.
pub fn watch_shader(shader: &Path, flags: &LoopFlags) -> Result<RecommendedWatcher> {
    let file_name = shader
        .file_name()
        .map(OsString::from)
        .with_context(|| format!("{} does not name a file", shader.display()))?;
    let dir = match shader.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    let reload = flags.reload_flag();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_reload_trigger(&event, &file_name) => {
            tracing::debug!("Shader changed on disk: {:?}", event.kind);
            reload.store(true, Ordering::SeqCst);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Shader watcher error: {}", e),
    })
    .context("Failed to create file watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    tracing::info!("Watching {} for changes", shader.display());
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    fn name() -> OsString {
        OsString::from("crt.frag")
    }

    #[test]
    fn test_modify_of_shader_triggers() {
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("/home/u/shaders/crt.frag".into());
        assert!(is_reload_trigger(&event, &name()));
    }

    #[test]
    fn test_recreate_triggers() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path("/home/u/shaders/crt.frag".into());
        assert!(is_reload_trigger(&event, &name()));
    }

    #[test]
    fn test_other_files_and_removals_ignored() {
        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path("/home/u/shaders/vhs.frag".into());
        assert!(!is_reload_trigger(&other, &name()));

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path("/home/u/shaders/crt.frag".into());
        assert!(!is_reload_trigger(&removed, &name()));
    }
}
