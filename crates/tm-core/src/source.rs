//! Script sources.
//!
//! A [`ScriptSource`] yields named SQL texts without the catalog knowing how
//! they are packaged: bundled into the binary, read from a directory, or
//! built in memory.

use crate::error::{CoreError, CoreResult};
use rust_embed::RustEmbed;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// An enumerable set of named text resources.
pub trait ScriptSource: Send + Sync {
    /// All resource names, `/`-separated.
    fn list(&self) -> CoreResult<Vec<String>>;

    /// Read one resource by the name returned from [`ScriptSource::list`].
    fn read(&self, name: &str) -> CoreResult<String>;

    /// Short human description for logs
    fn describe(&self) -> String;
}

/// Scripts compiled into the binary with `rust-embed`.
pub struct EmbeddedSource<E> {
    _assets: PhantomData<fn() -> E>,
}

impl<E: RustEmbed> EmbeddedSource<E> {
    pub fn new() -> Self {
        Self {
            _assets: PhantomData,
        }
    }
}

impl<E: RustEmbed> Default for EmbeddedSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RustEmbed> ScriptSource for EmbeddedSource<E> {
    fn list(&self) -> CoreResult<Vec<String>> {
        Ok(E::iter().map(|name| name.into_owned()).collect())
    }

    fn read(&self, name: &str) -> CoreResult<String> {
        let file = E::get(name).ok_or_else(|| CoreError::ScriptUnreadable {
            name: name.to_string(),
            reason: "not bundled".to_string(),
        })?;
        String::from_utf8(file.data.into_owned()).map_err(|e| CoreError::ScriptUnreadable {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        "bundled scripts".to_string()
    }
}

/// Scripts read from a directory tree at run time.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ScriptSource for DirectorySource {
    fn list(&self) -> CoreResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(CoreError::ScriptDirNotFound {
                path: self.root.display().to_string(),
            });
        }
        let mut names = Vec::new();
        collect_files(&self.root, &self.root, &mut names)?;
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> CoreResult<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).map_err(|e| CoreError::ScriptUnreadable {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Recursively collect file names relative to `root`
fn collect_files(root: &Path, dir: &Path, names: &mut Vec<String>) -> CoreResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, names)?;
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        names.push(name);
    }
    Ok(())
}

/// Scripts held in memory, in insertion order.
///
/// An entry without content is listed but fails to read.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    scripts: Vec<(String, Option<String>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.scripts.push((name.into(), Some(content.into())));
        self
    }

    pub fn with_unreadable(mut self, name: impl Into<String>) -> Self {
        self.scripts.push((name.into(), None));
        self
    }
}

impl ScriptSource for MemorySource {
    fn list(&self) -> CoreResult<Vec<String>> {
        Ok(self.scripts.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read(&self, name: &str) -> CoreResult<String> {
        match self.scripts.iter().find(|(n, _)| n == name) {
            Some((_, Some(content))) => Ok(content.clone()),
            Some((_, None)) => Err(CoreError::ScriptUnreadable {
                name: name.to_string(),
                reason: "content unavailable".to_string(),
            }),
            None => Err(CoreError::ScriptUnreadable {
                name: name.to_string(),
                reason: "not found".to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        format!("{} in-memory scripts", self.scripts.len())
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
