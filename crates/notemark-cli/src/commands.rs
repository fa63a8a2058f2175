//! Subcommand implementations, kept free of printing so they can be tested.

use miette::{IntoDiagnostic, Result, miette};
use notemark_core::{
    EditorConfig, LinkResolution, NoteStore, NoteTitles, Session, SyncOutcome, block,
    resolve_wikilinks,
};

/// Re-encode markdown in canonical form.
pub fn normalize(markdown: &str, config: &EditorConfig) -> String {
    block::encode_with(&block::decode(markdown), &config.encode_options())
}

/// Decoded blocks as pretty JSON.
pub fn blocks_json(markdown: &str) -> Result<String> {
    serde_json::to_string_pretty(&block::decode(markdown)).into_diagnostic()
}

/// One wikilink found in a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub note: String,
    pub target: String,
    pub resolution: LinkResolution,
}

/// Resolve every wikilink of every note against the store's note ids.
pub fn link_report(store: &impl NoteStore) -> Result<Vec<LinkReport>> {
    let ids = store.note_ids()?;
    let titles: NoteTitles = ids.iter().collect();

    let mut reports = Vec::new();
    for id in &ids {
        let markdown = store.load_markdown(id)?;
        let blocks = block::decode(&markdown);
        for (target, resolution) in resolve_wikilinks(&titles, &blocks) {
            reports.push(LinkReport {
                note: id.to_string(),
                target: target.to_string(),
                resolution,
            });
        }
    }
    Ok(reports)
}

/// Flip the `n`th (1-based) task of a note through an editing session and
/// save it back.
pub fn toggle_task(
    store: &mut impl NoteStore,
    config: &EditorConfig,
    note_id: &str,
    n: usize,
) -> Result<bool> {
    let mut session = Session::new(config.clone());
    session.open_from(&*store, note_id)?;

    let tasks = session
        .tree()
        .map(|tree| tree.task_items())
        .unwrap_or_default();
    let item = n
        .checked_sub(1)
        .and_then(|i| tasks.get(i).copied())
        .ok_or_else(|| miette!("note {note_id:?} has {} task(s), no task #{n}", tasks.len()))?;

    let outcome = session.toggle_task(item);
    tracing::info!(?outcome, note = note_id, task = n, "toggled task");
    if outcome == SyncOutcome::Unchanged {
        return Ok(false);
    }
    if session.has_unsaved_changes() {
        session.save_to(store)?;
    }

    let checked = session
        .tree()
        .and_then(|tree| tree.find_item(item))
        .is_some_and(|(_, item)| item.checked);
    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DirectoryStore;

    #[test]
    fn test_normalize_uses_configured_marker() {
        let config = EditorConfig {
            unordered_marker: '*',
            ..EditorConfig::default()
        };
        assert_eq!(normalize("# T\nbody\n- a\n", &config), "# T\n\nbody\n\n* a\n");
    }

    #[test]
    fn test_blocks_json() {
        let json = blocks_json("# Hi\n").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["heading"]["level"], 1);
    }

    #[test]
    fn test_link_report_flags_missing_notes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());
        store
            .save_markdown("inbox", "See [[Meeting Notes]] and [[todo]].\n")
            .unwrap();
        store.save_markdown("Todo", "- [ ] x\n").unwrap();

        let reports = link_report(&store).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].resolution, LinkResolution::NotFound);
        assert!(reports[1].resolution.is_found());
    }

    #[test]
    fn test_toggle_task_writes_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());
        store.save_markdown("todo", "- [ ] a\n- [ ] b\n").unwrap();

        let config = EditorConfig::default();
        assert!(toggle_task(&mut store, &config, "todo", 2).unwrap());
        assert_eq!(store.load_markdown("todo").unwrap(), "- [ ] a\n- [x] b\n");

        assert!(toggle_task(&mut store, &config, "todo", 3).is_err());
    }

    #[test]
    fn test_toggle_task_keeps_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());
        store.save_markdown("todo", "# Todo\n- [ ] milk\n").unwrap();

        assert!(toggle_task(&mut store, &EditorConfig::default(), "todo", 1).unwrap());
        assert_eq!(store.load_markdown("todo").unwrap(), "# Todo\n- [x] milk\n");
    }
}
