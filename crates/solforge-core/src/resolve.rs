//! Transitive import resolution over a project file tree.
//!
//! Grows an insertion-ordered set of source files from the caller's
//! entry set by following `import "<path>"` declarations to a fixed
//! point. The resolved set feeds the compiler invocation; a single
//! unreadable file aborts the whole resolution.

use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};

/// Line-anchored import declaration: `import "<path>"`, permitting
/// any quoted string as the imported path.
static IMPORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s*"([^"]*)""#).unwrap());

/// Supplies file content to the resolver.
///
/// Paths are relative to the project root. The filesystem
/// implementation is [`DiskReader`]; tests substitute in-memory
/// maps.
pub trait SourceReader {
    /// Read the content of the file at `path`.
    fn read(&self, path: &str) -> std::io::Result<String>;
}

/// Reads sources from a project root on disk.
#[derive(Debug, Clone)]
pub struct DiskReader {
    root: PathBuf,
}

impl DiskReader {
    /// Create a reader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceReader for DiskReader {
    fn read(&self, path: &str) -> std::io::Result<String> {
        // Rooted paths are treated as root-relative.
        fs::read_to_string(self.root.join(path.trim_start_matches('/')))
    }
}

/// Computes the transitive closure of imported files.
pub struct ImportResolver<'a, R> {
    reader: &'a R,
}

impl<'a, R: SourceReader> ImportResolver<'a, R> {
    /// Create a resolver over the given reader.
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Resolve `entries` plus every file transitively reachable from
    /// them through import declarations.
    ///
    /// Each file appears at most once, in depth-first discovery
    /// order starting with the entries themselves. Import cycles
    /// terminate because a path is marked visited before its content
    /// is scanned.
    pub fn resolve(&self, entries: &[String]) -> Result<Vec<String>> {
        let mut visited = FxHashSet::default();
        let mut ordered = Vec::new();
        for entry in entries {
            self.visit(&normalize_path(entry), &mut visited, &mut ordered)?;
        }
        Ok(ordered)
    }

    fn visit(
        &self,
        path: &str,
        visited: &mut FxHashSet<String>,
        ordered: &mut Vec<String>,
    ) -> Result<()> {
        if !visited.insert(path.to_string()) {
            return Ok(());
        }
        ordered.push(path.to_string());

        let content = self.reader.read(path).map_err(|source| Error::SourceRead {
            path: path.to_string(),
            source,
        })?;

        for import in scan_imports(&content) {
            self.visit(&import, visited, ordered)?;
        }
        Ok(())
    }
}

/// Extract normalized import paths from file content.
pub(crate) fn scan_imports(content: &str) -> Vec<String> {
    IMPORT_PATTERN
        .captures_iter(content)
        .map(|caps| normalize_path(&caps[1]))
        .collect()
}

/// Strip a leading relative-directory marker from a path.
///
/// Entry paths, discovered import paths, and error locations all go
/// through this so the same file never appears under two spellings.
pub(crate) fn normalize_path(path: &str) -> String {
    path.strip_prefix("./").unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory reader for resolver tests.
    struct MapReader {
        files: HashMap<&'static str, &'static str>,
    }

    impl MapReader {
        fn new(files: &[(&'static str, &'static str)]) -> Self {
            Self {
                files: files.iter().copied().collect(),
            }
        }
    }

    impl SourceReader for MapReader {
        fn read(&self, path: &str) -> std::io::Result<String> {
            self.files
                .get(path)
                .map(|content| content.to_string())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }
    }

    #[test]
    fn test_transitive_closure() {
        let reader = MapReader::new(&[
            ("a.sol", "import \"b.sol\";\ncontract A {}"),
            ("b.sol", "import \"c.sol\";\ncontract B {}"),
            ("c.sol", "contract C {}"),
        ]);
        let resolver = ImportResolver::new(&reader);

        let files = resolver.resolve(&["a.sol".to_string()]).unwrap();
        assert_eq!(files, vec!["a.sol", "b.sol", "c.sol"]);
    }

    #[test]
    fn test_import_cycle_terminates() {
        let reader = MapReader::new(&[
            ("a.sol", "import \"b.sol\";"),
            ("b.sol", "import \"a.sol\";"),
        ]);
        let resolver = ImportResolver::new(&reader);

        let files = resolver.resolve(&["a.sol".to_string()]).unwrap();
        assert_eq!(files, vec!["a.sol", "b.sol"]);
    }

    #[test]
    fn test_shared_import_listed_once() {
        let reader = MapReader::new(&[
            ("a.sol", "import \"lib.sol\";"),
            ("b.sol", "import \"lib.sol\";"),
            ("lib.sol", "contract Lib {}"),
        ]);
        let resolver = ImportResolver::new(&reader);

        let files = resolver
            .resolve(&["a.sol".to_string(), "b.sol".to_string()])
            .unwrap();
        assert_eq!(files, vec!["a.sol", "lib.sol", "b.sol"]);
    }

    #[test]
    fn test_relative_marker_normalized_everywhere() {
        let reader = MapReader::new(&[
            ("a.sol", "import \"./lib.sol\";"),
            ("lib.sol", "contract Lib {}"),
        ]);
        let resolver = ImportResolver::new(&reader);

        // The same file spelled with and without the marker resolves
        // to a single entry.
        let files = resolver
            .resolve(&["./a.sol".to_string(), "lib.sol".to_string()])
            .unwrap();
        assert_eq!(files, vec!["a.sol", "lib.sol"]);
    }

    #[test]
    fn test_unreadable_file_aborts_resolution() {
        let reader = MapReader::new(&[("a.sol", "import \"missing.sol\";")]);
        let resolver = ImportResolver::new(&reader);

        let err = resolver.resolve(&["a.sol".to_string()]).unwrap_err();
        match err {
            Error::SourceRead { path, .. } => assert_eq!(path, "missing.sol"),
            other => panic!("expected SourceRead, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_imports_is_line_anchored() {
        let content = r#"
import "a.sol";
  import "b.sol";
// a comment mentioning import "c.sol"
contract Foo { string s = "import \"d.sol\""; }
"#;
        let imports = scan_imports(content);
        assert_eq!(imports, vec!["a.sol", "b.sol"]);
    }

    #[test]
    fn test_scan_imports_normalizes() {
        assert_eq!(scan_imports("import \"./x.sol\";"), vec!["x.sol"]);
    }
}
