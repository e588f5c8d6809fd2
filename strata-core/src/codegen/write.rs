use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use miette::{Context, IntoDiagnostic, miette};
use walkdir::WalkDir;

use super::{Formatter, Writer};

/// Writes files under a directory on disk, creating parent
/// directories as needed.
#[derive(Debug)]
pub struct DiskWriter {
    root: PathBuf,
}

impl DiskWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Writer for DiskWriter {
    fn write(&mut self, path: &str, text: &str) -> miette::Result<()> {
        let path = self.root.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .into_diagnostic()
                .with_context(|| format!("Failed to create directory `{}`", parent.display()))?;
        }
        std::fs::write(&path, text)
            .into_diagnostic()
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }

    fn list_files(&self) -> miette::Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut files = vec![];
        for entry in WalkDir::new(&self.root) {
            let entry = entry
                .into_diagnostic()
                .with_context(|| format!("Failed to list `{}`", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).into_diagnostic()?;
            let path = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .join("/");
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &str) -> miette::Result<String> {
        let path = self.root.join(path);
        std::fs::read_to_string(&path)
            .into_diagnostic()
            .with_context(|| format!("Failed to read `{}`", path.display()))
    }
}

/// Keeps written files in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub files: BTreeMap<String, String>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for MemoryWriter {
    fn write(&mut self, path: &str, text: &str) -> miette::Result<()> {
        self.files.insert(path.to_owned(), text.to_owned());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn list_files(&self) -> miette::Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_file(&self, path: &str) -> miette::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| miette!("`{path}` wasn't written"))
    }
}

/// Strips trailing whitespace from every line of Python and JSON
/// files, and ends them with exactly one newline.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrailingNewline;

impl Formatter for TrailingNewline {
    fn accepts(&self, path: &str) -> bool {
        path.ends_with(".py") || path.ends_with(".json")
    }

    fn format(&self, _path: &str, text: &str) -> miette::Result<String> {
        let body = text.lines().map(str::trim_end).join("\n");
        let body = body.trim_end_matches('\n');
        Ok(if body.is_empty() {
            String::new()
        } else {
            format!("{body}\n")
        })
    }
}
