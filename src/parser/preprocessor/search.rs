//! Header lookup over unsaved buffers and the real file system.

use crate::source::{normalize_path, FileUniqueId};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Contents and metadata of a file read for the front end.
#[derive(Debug, Clone)]
pub struct FileData {
    pub name: String,
    pub contents: Arc<str>,
    pub mtime: Option<SystemTime>,
    pub unique_id: Option<FileUniqueId>,
}

/// File access with in-memory overrides taking precedence over the disk.
#[derive(Debug, Clone, Default)]
pub struct FileSystem {
    overlay: Vec<(String, Arc<str>)>,
}

impl FileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an in-memory file.
    pub fn add(&mut self, name: &str, contents: &str) {
        let key = normalize(name);
        self.overlay.retain(|(existing, _)| *existing != key);
        self.overlay.push((key, Arc::from(contents)));
    }

    pub fn read(&self, path: &str) -> Option<FileData> {
        let key = normalize(path);
        if let Some((_, contents)) = self.overlay.iter().find(|(name, _)| *name == key) {
            return Some(FileData {
                name: path.to_string(),
                contents: contents.clone(),
                mtime: None,
                unique_id: None,
            });
        }

        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        let bytes = std::fs::read(path).ok()?;
        let contents: Arc<str> = match String::from_utf8(bytes) {
            Ok(text) => Arc::from(text),
            Err(err) => Arc::from(String::from_utf8_lossy(err.as_bytes()).into_owned()),
        };
        let mtime = metadata.modified().ok();
        Some(FileData {
            name: path.to_string(),
            contents,
            mtime,
            unique_id: unique_id(&metadata, mtime),
        })
    }

    /// Every in-memory file, in insertion order.
    pub fn overlay(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overlay
            .iter()
            .map(|(name, contents)| (name.as_str(), &**contents))
    }
}

#[cfg(unix)]
fn unique_id(metadata: &std::fs::Metadata, mtime: Option<SystemTime>) -> Option<FileUniqueId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileUniqueId {
        device: metadata.dev(),
        inode: metadata.ino(),
        mtime: mtime
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs()),
    })
}

#[cfg(not(unix))]
fn unique_id(_: &std::fs::Metadata, _: Option<SystemTime>) -> Option<FileUniqueId> {
    None
}

fn normalize(path: &str) -> String {
    normalize_path(Path::new(path))
        .to_string_lossy()
        .into_owned()
}

/// Include directories in search order.
#[derive(Debug, Clone, Default)]
pub struct HeaderSearch {
    pub quote_dirs: Vec<String>,
    pub angled_dirs: Vec<String>,
    pub system_dirs: Vec<String>,
}

/// One place a header may live, and whether it counts as a system header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub is_system: bool,
}

impl HeaderSearch {
    /// Paths to try for an include, in order.
    pub fn candidates(&self, name: &str, angled: bool, includer_dir: Option<&str>) -> Vec<Candidate> {
        if Path::new(name).is_absolute() {
            return vec![Candidate {
                path: name.to_string(),
                is_system: false,
            }];
        }

        let mut out = Vec::new();
        let mut push = |dir: &str, is_system: bool| {
            out.push(Candidate {
                path: join(dir, name),
                is_system,
            });
        };
        if !angled {
            push(includer_dir.unwrap_or(""), false);
            for dir in &self.quote_dirs {
                push(dir, false);
            }
        }
        for dir in &self.angled_dirs {
            push(dir, false);
        }
        for dir in &self.system_dirs {
            push(dir, true);
        }
        out
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return normalize(name);
    }
    normalize_path(&Path::new(dir).join(name))
        .to_string_lossy()
        .into_owned()
}

/// Directory part of a file name, `None` for a bare name.
pub fn parent_dir(name: &str) -> Option<String> {
    Path::new(name)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_shadows_disk() {
        let mut fs = FileSystem::new();
        fs.add("./inc/a.h", "int a;");
        let data = fs.read("inc/a.h").unwrap();
        assert_eq!(&*data.contents, "int a;");
        assert!(fs.read("inc/missing.h").is_none());
    }

    #[test]
    fn test_candidate_order() {
        let search = HeaderSearch {
            quote_dirs: vec!["q".to_string()],
            angled_dirs: vec!["i".to_string()],
            system_dirs: vec!["sys".to_string()],
        };
        let quoted: Vec<_> = search
            .candidates("x.h", false, Some("src"))
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(quoted, vec!["src/x.h", "q/x.h", "i/x.h", "sys/x.h"]);

        let angled = search.candidates("x.h", true, Some("src"));
        assert_eq!(angled.len(), 2);
        assert!(angled[1].is_system);
    }

    #[test]
    fn test_disk_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.h");
        std::fs::write(&path, "#define H 1\n").unwrap();
        let fs = FileSystem::new();
        let data = fs.read(path.to_str().unwrap()).unwrap();
        assert_eq!(&*data.contents, "#define H 1\n");
        assert!(data.mtime.is_some());
    }
}
