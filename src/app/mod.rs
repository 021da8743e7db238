use std::path::{Path, PathBuf};

use crate::document::{Document, FileFormat};
use crate::storage::{self, StorageError};

/// Result of a save request. A text save that would drop categories or tags
/// writes nothing until the caller confirms through the `allow_lossy`
/// variants; a document that has never been saved asks the caller to run its
/// save-as flow instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { path: PathBuf, message: String },
    PathRequired,
    LossyConfirmationRequired,
}

/// Collaborator-facing document lifecycle. The UI (or the CLI standing in for
/// it) owns selection and rendering; this owns the document and the
/// load/save/revert state machine. Every failure path leaves the document in
/// its last-known-consistent state.
#[derive(Debug, Default)]
pub struct Session {
    document: Document,
}

impl Session {
    pub fn new() -> Self {
        Self {
            document: Document::new(),
        }
    }

    pub fn with_document(document: Document) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn is_modified(&self) -> bool {
        self.document.is_dirty()
    }

    /// Discards the current document. Callers gate this behind their own
    /// confirm-save prompt when `is_modified` is true.
    pub fn new_document(&mut self) -> String {
        self.document = Document::new();
        "Created a new document. Don't forget to save your changes.".to_string()
    }

    /// The current document is replaced only after the load succeeds.
    pub fn open(&mut self, path: &Path) -> Result<String, StorageError> {
        let document = storage::load(path)?;
        self.document = document;
        Ok(format!("Remarks loaded from {}.", path.display()))
    }

    pub fn save(&mut self) -> Result<SaveOutcome, StorageError> {
        let Some(path) = self.document.path().map(Path::to_path_buf) else {
            return Ok(SaveOutcome::PathRequired);
        };
        let format = self.document.format();
        self.write_checked(path, format, false)
    }

    pub fn save_as(&mut self, path: &Path) -> Result<SaveOutcome, StorageError> {
        let format = storage::format_for_path(path)?;
        self.write_checked(path.to_path_buf(), format, false)
    }

    /// Confirmed lossy save to the current location.
    pub fn save_allow_lossy(&mut self) -> Result<SaveOutcome, StorageError> {
        let Some(path) = self.document.path().map(Path::to_path_buf) else {
            return Ok(SaveOutcome::PathRequired);
        };
        let format = self.document.format();
        self.write_checked(path, format, true)
    }

    pub fn save_as_allow_lossy(&mut self, path: &Path) -> Result<SaveOutcome, StorageError> {
        let format = storage::format_for_path(path)?;
        self.write_checked(path.to_path_buf(), format, true)
    }

    /// Reloads the document from disk, or resets a never-saved document to
    /// empty.
    pub fn revert(&mut self) -> Result<String, StorageError> {
        if let Some(path) = self.document.path().map(Path::to_path_buf) {
            let document = storage::load(&path)?;
            self.document = document;
        } else {
            self.document = Document::new();
        }
        Ok("All unsaved changes discarded; last saved state restored.".to_string())
    }

    fn write_checked(
        &mut self,
        path: PathBuf,
        format: FileFormat,
        allow_lossy: bool,
    ) -> Result<SaveOutcome, StorageError> {
        if format == FileFormat::Text && self.document.is_lossy_as_text() && !allow_lossy {
            tracing::debug!(path = %path.display(), "text save needs lossy confirmation");
            return Ok(SaveOutcome::LossyConfirmationRequired);
        }
        // On write failure the document keeps its dirty flag and location.
        storage::write(&path, format, &self.document)?;
        self.document.set_location(path.clone(), format);
        self.document.mark_clean();
        let message = format!("Remarks saved to {}.", path.display());
        Ok(SaveOutcome::Saved { path, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn save_without_path_asks_for_save_as() -> anyhow::Result<()> {
        let mut session = Session::new();
        session.document_mut().add_remark("note", "", &[]);
        assert_matches!(session.save()?, SaveOutcome::PathRequired);
        assert!(session.is_modified());
        Ok(())
    }

    #[test]
    fn save_as_round_trips_through_json() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("remarks.json");

        let mut session = Session::new();
        session
            .document_mut()
            .add_remark("weld check", "Welding", &["urgent".to_string()]);
        assert!(session.is_modified());
        assert_matches!(session.save_as(&path)?, SaveOutcome::Saved { .. });
        assert!(!session.is_modified());

        let mut reopened = Session::new();
        reopened.open(&path)?;
        let remarks = reopened.document().remarks_in("Welding");
        assert_eq!(remarks.len(), 1);
        assert!(remarks[0].tags.contains("urgent"));
        Ok(())
    }

    #[test]
    fn lossy_text_save_requires_explicit_confirmation() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("remarks.txt");

        let mut session = Session::new();
        session
            .document_mut()
            .add_remark("tagged", "Safety", &["urgent".to_string()]);
        assert_matches!(
            session.save_as(&path)?,
            SaveOutcome::LossyConfirmationRequired
        );
        assert!(!path.exists(), "nothing may be written before confirmation");
        assert!(session.is_modified());

        assert_matches!(session.save_as_allow_lossy(&path)?, SaveOutcome::Saved { .. });
        assert_eq!(fs::read_to_string(&path)?, "tagged\n");
        assert!(!session.is_modified());
        Ok(())
    }

    #[test]
    fn plain_text_document_saves_without_confirmation() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("remarks.txt");

        let mut session = Session::new();
        session.document_mut().add_remark("plain note", "", &[]);
        assert_matches!(session.save_as(&path)?, SaveOutcome::Saved { .. });
        assert_eq!(fs::read_to_string(&path)?, "plain note\n");
        Ok(())
    }

    #[test]
    fn failed_open_leaves_current_document_untouched() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut session = Session::new();
        session.document_mut().add_remark("keep me", "", &[]);

        let missing = temp.path().join("absent.json");
        assert!(session.open(&missing).is_err());
        assert_eq!(session.document().remark_count(), 1);
        assert!(session.is_modified());
        Ok(())
    }

    #[test]
    fn revert_restores_last_saved_state() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("remarks.json");

        let mut session = Session::new();
        session.document_mut().add_remark("saved", "Safety", &[]);
        session.save_as(&path)?;

        session.document_mut().add_remark("unsaved", "Safety", &[]);
        assert!(session.is_modified());
        session.revert()?;
        assert!(!session.is_modified());
        assert_eq!(session.document().remark_count(), 1);
        assert_eq!(session.document().remarks_in("Safety")[0].text, "saved");
        Ok(())
    }

    #[test]
    fn revert_on_unsaved_document_resets_to_empty() -> anyhow::Result<()> {
        let mut session = Session::new();
        session.document_mut().add_remark("scratch", "Temp", &[]);
        session.revert()?;
        assert!(session.document().is_empty());
        assert!(!session.is_modified());
        Ok(())
    }
}
