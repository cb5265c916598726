//! Referenced resource copying
//!
//! String literals naming an image, PDF or font file are looked up below the
//! input directory (file names compared case-insensitively) and copied into
//! the output directory next to the generated programs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};
use tracing::{error, info, warn};

use crate::lexer::{tokenize, TokenKind};

/// Extensions treated as external resources
pub const RESOURCE_EXTENSIONS: &[&str] = &["jpg", "tif", "eps", "png", "gif", "pdf", "ttf", "otf"];

/// Resource file names referenced by string literals in `source`.
pub fn referenced_resources(source: &str) -> Vec<String> {
    let (tokens, _) = tokenize(source);
    let mut names: Vec<String> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::String)
        .filter_map(|t| resource_name(&t.text))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// The literal's contents if it names a resource file.
fn resource_name(literal: &str) -> Option<String> {
    let name = literal.trim_matches(|c| matches!(c, '\'' | '"' | '(' | ')'));
    let (_, extension) = name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    RESOURCE_EXTENSIONS.contains(&extension.as_str()).then(|| name.to_string())
}

/// First file below `root` whose name matches `name`, ignoring case.
pub fn find_resource(root: &Path, name: &str) -> Option<PathBuf> {
    let pattern = root.join("**").join(Pattern::escape(name));
    let options = MatchOptions { case_sensitive: false, ..MatchOptions::new() };
    let paths = match glob_with(&pattern.to_string_lossy(), options) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid resource pattern for {}: {}", name, e);
            return None;
        }
    };
    let mut found: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    found.sort();
    found.into_iter().next()
}

/// Copy every resource referenced by `sources` from `input_dir` into
/// `output_dir`, leaving existing files untouched.
///
/// Returns the resolved name-to-path map. Copy failures are logged.
pub fn copy_resources<'a>(
    sources: impl IntoIterator<Item = &'a str>,
    input_dir: &Path,
    output_dir: &Path,
) -> BTreeMap<String, PathBuf> {
    let mut resolved = BTreeMap::new();
    for source in sources {
        for name in referenced_resources(source) {
            if resolved.contains_key(&name) {
                continue;
            }
            if let Some(path) = find_resource(input_dir, &name) {
                resolved.insert(name, path);
            }
        }
    }

    for path in resolved.values() {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let dest = output_dir.join(file_name);
        if dest.exists() {
            continue;
        }
        match fs::copy(path, &dest) {
            Ok(_) => info!("Copied resource: {} -> {}", path.display(), dest.display()),
            Err(e) => error!("Error copying resource {}: {}", path.display(), e),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_referenced_resources() {
        let source = "(logo.JPG) CACHE 0.5 SCALL\n(Hello) SHL\n(arial.ttf) (notes) (sig.eps) ICALL\n(logo.JPG) SCALL";
        assert_eq!(referenced_resources(source), vec!["arial.ttf", "logo.JPG", "sig.eps"]);
    }

    #[test]
    fn test_non_resource_literals() {
        assert!(referenced_resources("(Total 1.5) SHL (file.txt) SHL").is_empty());
    }

    #[test]
    fn test_find_resource_ignores_case() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("img")).unwrap();
        fs::write(temp.path().join("img/Logo.jpg"), b"x").unwrap();

        assert_eq!(find_resource(temp.path(), "LOGO.JPG"), Some(temp.path().join("img/Logo.jpg")));
        assert_eq!(find_resource(temp.path(), "other.jpg"), None);
    }

    #[test]
    fn test_copy_resources_keeps_existing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("logo.jpg"), b"new").unwrap();
        fs::write(input.path().join("sig.eps"), b"sig").unwrap();
        fs::write(output.path().join("sig.eps"), b"old").unwrap();

        let resolved = copy_resources(["(logo.jpg) SCALL (sig.eps) SCALL (gone.png) SCALL"], input.path(), output.path());

        assert_eq!(resolved.len(), 2);
        assert_eq!(fs::read(output.path().join("logo.jpg")).unwrap(), b"new");
        assert_eq!(fs::read(output.path().join("sig.eps")).unwrap(), b"old");
        assert!(!output.path().join("gone.png").exists());
    }
}
