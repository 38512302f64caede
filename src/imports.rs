//! Expansion of `import "path";` statements before a program is resolved.

use std::path::PathBuf;

use fnv::{FnvHashMap, FnvHashSet};
use tracing::debug;

use crate::{ast::{Import, Stmt}, errors, MinikError};

/// Supplies the source text of imported files.
pub trait SourceLoader {
    fn load(&mut self, path: &str) -> Result<String, MinikError>;
}

/// Reads imported files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl SourceLoader for FileLoader {
    fn load(&mut self, path: &str) -> Result<String, MinikError> {
        let content = std::fs::read(self.root.join(path))?;
        String::from_utf8(content).map_err(|_| errors::system(
            format!("The imported file '{}' is not a valid UTF-8 file.", path),
            "Make sure that the file is a valid UTF-8 file.",
        ))
    }
}

/// Serves sources from memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: FnvHashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source<P: Into<String>, S: Into<String>>(mut self, path: P, source: S) -> Self {
        self.sources.insert(path.into(), source.into());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&mut self, path: &str) -> Result<String, MinikError> {
        self.sources.get(path).cloned().ok_or_else(|| errors::system(
            format!("We could not find the imported file '{}'.", path),
            "Make sure that the path is spelled correctly.",
        ))
    }
}

/// Loads and parses every top-level file import, recursively. Each path is loaded at
/// most once, so repeated and cyclic imports expand to nothing.
pub fn expand(stmts: &mut [Stmt], loader: &mut dyn SourceLoader) -> Vec<MinikError> {
    let mut seen = FnvHashSet::default();
    expand_with(stmts, loader, &mut seen)
}

fn expand_with(stmts: &mut [Stmt], loader: &mut dyn SourceLoader, seen: &mut FnvHashSet<String>) -> Vec<MinikError> {
    let mut errs = Vec::new();

    for stmt in stmts.iter_mut() {
        if let Stmt::Import(_, Import::File { path, stmts: imported }) = stmt {
            if !seen.insert(path.clone()) {
                debug!(path = path.as_str(), "skipping file which was already imported");
                continue;
            }

            debug!(path = path.as_str(), "loading imported file");
            match loader.load(path) {
                Ok(source) => {
                    let (mut parsed, mut parse_errs) = crate::parse(&source);
                    errs.append(&mut parse_errs);
                    errs.append(&mut expand_with(&mut parsed, loader, seen));
                    *imported = parsed;
                },
                Err(err) => errs.push(err),
            }
        }
    }

    errs
}
