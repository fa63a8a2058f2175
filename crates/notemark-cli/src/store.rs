//! File-backed note storage: one `<id>.md` file per note in a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use notemark_core::{NoteError, NoteStore, SmolStr};

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn note_path(&self, note_id: &str) -> Result<PathBuf, NoteError> {
        let invalid = note_id.is_empty()
            || note_id == "."
            || note_id == ".."
            || note_id.contains(['/', '\\']);
        if invalid {
            return Err(NoteError::InvalidNoteId(note_id.to_string()));
        }
        Ok(self.root.join(format!("{note_id}.md")))
    }
}

impl NoteStore for DirectoryStore {
    fn load_markdown(&self, note_id: &str) -> Result<String, NoteError> {
        let path = self.note_path(note_id)?;
        match std::fs::read_to_string(&path) {
            Ok(markdown) => Ok(markdown),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(NoteError::NoteNotFound(note_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save_markdown(&mut self, note_id: &str, markdown: &str) -> Result<(), NoteError> {
        let path = self.note_path(note_id)?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&path, markdown)?;
        tracing::debug!(path = %path.display(), bytes = markdown.len(), "wrote note");
        Ok(())
    }

    fn note_ids(&self) -> Result<Vec<SmolStr>, NoteError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(SmolStr::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());

        store.save_markdown("inbox", "# Inbox\n").unwrap();
        store.save_markdown("groceries", "- [ ] milk\n").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "x").unwrap();

        assert_eq!(store.load_markdown("inbox").unwrap(), "# Inbox\n");
        assert_eq!(store.note_ids().unwrap(), vec!["groceries", "inbox"]);
    }

    #[test]
    fn test_missing_note() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        assert!(matches!(
            store.load_markdown("nope"),
            Err(NoteError::NoteNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());
        for id in ["../escape", "a/b", "", ".."] {
            assert!(matches!(
                store.save_markdown(id, "x"),
                Err(NoteError::InvalidNoteId(_))
            ));
        }
    }
}
