//! Source file discovery for batch runs.
//!
//! Finds `.dbm` and `.frm` files below an input directory and groups them
//! into one project per directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::warn;

use super::BatchError;

/// Which role a source file plays in a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Document,
    Form,
}

/// Classify a path by extension, case-insensitively.
pub fn source_kind(path: &Path) -> Option<SourceKind> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "dbm" => Some(SourceKind::Document),
        "frm" => Some(SourceKind::Form),
        _ => None,
    }
}

/// The sources of one directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectGroup {
    pub dir: PathBuf,
    pub documents: Vec<PathBuf>,
    pub forms: Vec<PathBuf>,
}

impl ProjectGroup {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, ..Default::default() }
    }

    pub fn add(&mut self, path: PathBuf, kind: SourceKind) {
        match kind {
            SourceKind::Document => self.documents.push(path),
            SourceKind::Form => self.forms.push(path),
        }
    }
}

/// All `.dbm` and `.frm` files below `root`, sorted.
pub fn discover_sources(root: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let pattern = root.join("**").join("*");
    let pattern = pattern.to_string_lossy();
    let paths = glob(&pattern).map_err(|source| BatchError::Discovery { pattern: pattern.to_string(), source })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() && source_kind(&path).is_some() {
                    files.push(path);
                }
            }
            Err(e) => warn!("Error reading path during discovery: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Group sources by their parent directory.
pub fn group_by_directory(paths: impl IntoIterator<Item = PathBuf>) -> Vec<ProjectGroup> {
    let mut groups: BTreeMap<PathBuf, ProjectGroup> = BTreeMap::new();
    for path in paths {
        let Some(kind) = source_kind(&path) else {
            continue;
        };
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        groups.entry(dir.clone()).or_insert_with(|| ProjectGroup::new(dir)).add(path, kind);
    }
    groups.into_values().collect()
}

/// Sub-form files next to `document`.
pub fn sibling_forms(document: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let dir = document.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut forms = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && source_kind(&path) == Some(SourceKind::Form) {
            forms.push(path);
        }
    }
    forms.sort();
    Ok(forms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_source_kind() {
        assert_eq!(source_kind(Path::new("a/B.DBM")), Some(SourceKind::Document));
        assert_eq!(source_kind(Path::new("x.Frm")), Some(SourceKind::Form));
        assert_eq!(source_kind(Path::new("x.jdt")), None);
        assert_eq!(source_kind(Path::new("README")), None);
    }

    #[test]
    fn test_discover_and_group() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("casio")).unwrap();
        fs::create_dir_all(root.join("sibs")).unwrap();
        fs::write(root.join("casio/CASIO.DBM"), "").unwrap();
        fs::write(root.join("casio/casiof.frm"), "").unwrap();
        fs::write(root.join("casio/logo.jpg"), "").unwrap();
        fs::write(root.join("sibs/sibs.dbm"), "").unwrap();

        let files = discover_sources(root).unwrap();
        assert_eq!(files.len(), 3);

        let groups = group_by_directory(files);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].dir, root.join("casio"));
        assert_eq!(groups[0].documents, vec![root.join("casio/CASIO.DBM")]);
        assert_eq!(groups[0].forms, vec![root.join("casio/casiof.frm")]);
        assert!(groups[1].forms.is_empty());
    }

    #[test]
    fn test_sibling_forms() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("main.dbm"), "").unwrap();
        fs::write(root.join("b.frm"), "").unwrap();
        fs::write(root.join("a.FRM"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let forms = sibling_forms(&root.join("main.dbm")).unwrap();
        assert_eq!(forms, vec![root.join("a.FRM"), root.join("b.frm")]);
    }
}
