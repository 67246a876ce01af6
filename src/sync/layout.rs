//! On-disk layout of the data root.
//!
//! ```text
//! <root>/projects/<KEY>.json
//! <root>/issues/<ID>.json            active issues
//! <root>/archive/issues/<ID>.json    archived issues
//! <root>/deleted/issues/<ID>.json    deleted issues
//! <root>/boards/<KEY>-board.json
//! ```

use std::path::{Component, Path, PathBuf};

use crate::model::Lifecycle;
use crate::sync::types::{DocumentKind, DocumentLocation};

const BOARD_SUFFIX: &str = "-board";

/// Path arithmetic over a data root. Holds no open handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    #[must_use]
    pub fn boards_dir(&self) -> PathBuf {
        self.root.join("boards")
    }

    /// Directory holding issues of the given lifecycle category.
    #[must_use]
    pub fn issues_dir(&self, lifecycle: Lifecycle) -> PathBuf {
        match lifecycle {
            Lifecycle::Active => self.root.join("issues"),
            Lifecycle::Archived => self.root.join("archive").join("issues"),
            Lifecycle::Deleted => self.root.join("deleted").join("issues"),
        }
    }

    /// Every directory the tracker writes into.
    #[must_use]
    pub fn all_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.projects_dir(), self.boards_dir()];
        dirs.extend(Lifecycle::ALL.into_iter().map(|lc| self.issues_dir(lc)));
        dirs
    }

    #[must_use]
    pub fn project_file(&self, key: &str) -> PathBuf {
        self.projects_dir().join(format!("{key}.json"))
    }

    #[must_use]
    pub fn issue_file(&self, tracking_id: &str, lifecycle: Lifecycle) -> PathBuf {
        self.issues_dir(lifecycle).join(format!("{tracking_id}.json"))
    }

    #[must_use]
    pub fn board_file(&self, project_key: &str) -> PathBuf {
        self.boards_dir().join(format!("{project_key}{BOARD_SUFFIX}.json"))
    }

    /// Path relative to the data root with `/` separators, as stored in the index.
    ///
    /// Paths outside the root are returned unchanged.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Work out what a path under the root holds from its location alone.
    ///
    /// Returns `None` for anything that is not a `.json` document in one of
    /// the known directories (temp files, the index, stray files).
    #[must_use]
    pub fn classify(&self, path: &Path) -> Option<DocumentLocation> {
        let rel = path.strip_prefix(&self.root).ok()?;
        if rel.extension().and_then(|e| e.to_str()) != Some("json") {
            return None;
        }
        let stem = rel.file_stem()?.to_str()?;
        if stem.starts_with('.') || stem.is_empty() {
            return None;
        }

        let parts: Vec<&str> = rel
            .parent()?
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();

        let (kind, lifecycle) = match parts.as_slice() {
            ["projects"] => (DocumentKind::Project, None),
            ["boards"] => (DocumentKind::Board, None),
            ["issues"] => (DocumentKind::Issue, Some(Lifecycle::Active)),
            ["archive", "issues"] => (DocumentKind::Issue, Some(Lifecycle::Archived)),
            ["deleted", "issues"] => (DocumentKind::Issue, Some(Lifecycle::Deleted)),
            _ => return None,
        };

        let key = match kind {
            DocumentKind::Board => stem.strip_suffix(BOARD_SUFFIX).unwrap_or(stem),
            DocumentKind::Project | DocumentKind::Issue => stem,
        };

        Some(DocumentLocation {
            kind,
            lifecycle,
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout::new("/srv/data")
    }

    #[test]
    fn test_paths() {
        let l = layout();
        assert_eq!(l.project_file("ENG"), PathBuf::from("/srv/data/projects/ENG.json"));
        assert_eq!(
            l.issue_file("ENG-1", Lifecycle::Archived),
            PathBuf::from("/srv/data/archive/issues/ENG-1.json")
        );
        assert_eq!(
            l.issue_file("ENG-1", Lifecycle::Deleted),
            PathBuf::from("/srv/data/deleted/issues/ENG-1.json")
        );
        assert_eq!(l.board_file("ENG"), PathBuf::from("/srv/data/boards/ENG-board.json"));
    }

    #[test]
    fn test_relative() {
        let l = layout();
        assert_eq!(
            l.relative(&l.issue_file("ENG-2", Lifecycle::Archived)),
            "archive/issues/ENG-2.json"
        );
    }

    #[test]
    fn test_classify() {
        let l = layout();

        let issue = l.classify(&l.issue_file("ENG-7", Lifecycle::Deleted)).unwrap();
        assert_eq!(issue.kind, DocumentKind::Issue);
        assert_eq!(issue.lifecycle, Some(Lifecycle::Deleted));
        assert_eq!(issue.key, "ENG-7");

        let board = l.classify(&l.board_file("ENG")).unwrap();
        assert_eq!(board.kind, DocumentKind::Board);
        assert_eq!(board.key, "ENG");

        let project = l.classify(&l.project_file("OPS")).unwrap();
        assert_eq!(project.kind, DocumentKind::Project);
        assert_eq!(project.lifecycle, None);
    }

    #[test]
    fn test_classify_ignores_noise() {
        let l = layout();
        assert!(l.classify(Path::new("/srv/data/issues/.ENG-1.json.abc.tmp")).is_none());
        assert!(l.classify(Path::new("/srv/data/issues/notes.txt")).is_none());
        assert!(l.classify(Path::new("/srv/data/other/ENG-1.json")).is_none());
        assert!(l.classify(Path::new("/elsewhere/issues/ENG-1.json")).is_none());
    }
}
