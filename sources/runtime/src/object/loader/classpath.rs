use std::{
    fmt, fs,
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};
use zip::{result::ZipError, ZipArchive};

/// Where a class's bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSource {
    Directory(PathBuf),
    Jar(PathBuf),
    Memory(String),
}

impl fmt::Display for ClassSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSource::Directory(path) => write!(f, "{}", path.display()),
            ClassSource::Jar(path) => write!(f, "jar:{}", path.display()),
            ClassSource::Memory(label) => write!(f, "memory:{}", label),
        }
    }
}

/// A located class file, buffered and ready to parse.
#[derive(Debug)]
pub struct ClassSearchResult {
    source: ClassSource,
    buffer: Vec<u8>,
}

impl ClassSearchResult {
    pub fn new(source: ClassSource, buffer: Vec<u8>) -> Self {
        Self { source, buffer }
    }

    pub fn source(&self) -> &ClassSource {
        &self.source
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Releases the buffer. Callers do this once parsing is done, whether or not it worked.
    pub fn close_resource(self) {
        debug!("Releasing {} bytes from {}", self.buffer.len(), self.source);
    }
}

pub trait ClassPath: Send + Sync {
    /// Looks up a binary name like `java/lang/Object`.
    fn search(&self, binary_name: &str) -> Option<ClassSearchResult>;
}

pub struct DirectoryClassPath {
    root: PathBuf,
}

impl DirectoryClassPath {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Binary names are relative, slash-separated and must not climb out of the root.
fn is_relative_binary_name(binary_name: &str) -> bool {
    !binary_name.contains(['\\', '\0'])
        && !Path::new(binary_name).is_absolute()
        && binary_name
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

impl ClassPath for DirectoryClassPath {
    fn search(&self, binary_name: &str) -> Option<ClassSearchResult> {
        if !is_relative_binary_name(binary_name) {
            debug!("Refusing to search {} for {:?}", self.root.display(), binary_name);
            return None;
        }

        let path = self.root.join(format!("{}.class", binary_name));
        if !path.is_file() {
            return None;
        }

        match fs::read(&path) {
            Ok(bytes) => Some(ClassSearchResult::new(ClassSource::Directory(path), bytes)),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                None
            }
        }
    }
}

pub struct JarClassPath {
    path: PathBuf,
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
}

impl JarClassPath {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(path, bytes)
    }

    pub fn from_bytes(label: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self> {
        let path = label.into();
        let archive = ZipArchive::new(Cursor::new(bytes))
            .with_context(|| format!("opening archive {}", path.display()))?;

        Ok(Self {
            path,
            archive: Mutex::new(archive),
        })
    }
}

impl ClassPath for JarClassPath {
    fn search(&self, binary_name: &str) -> Option<ClassSearchResult> {
        let entry_name = format!("{}.class", binary_name);
        let mut archive = self.archive.lock();

        let mut entry = match archive.by_name(&entry_name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return None,
            Err(e) => {
                warn!("Could not read {} from {}: {}", entry_name, self.path.display(), e);
                return None;
            }
        };

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut bytes) {
            warn!("Could not read {} from {}: {}", entry_name, self.path.display(), e);
            return None;
        }

        Some(ClassSearchResult::new(
            ClassSource::Jar(self.path.clone()),
            bytes,
        ))
    }
}

/// An ordered set of class path entries. The first entry to know a class wins.
#[derive(Default)]
pub struct ClassPathManager {
    entries: Vec<Box<dyn ClassPath>>,
}

impl ClassPathManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: impl ClassPath + 'static) -> &mut Self {
        self.entries.push(Box::new(entry));
        self
    }

    /// Adds a directory, or an archive if the path ends in `.jar` or `.zip`.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) -> Result<&mut Self> {
        let path = path.into();
        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);

        if is_archive {
            let jar = JarClassPath::open(&path)?;
            Ok(self.add(jar))
        } else {
            Ok(self.add(DirectoryClassPath::new(path)))
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ClassPath for ClassPathManager {
    fn search(&self, binary_name: &str) -> Option<ClassSearchResult> {
        self.entries.iter().find_map(|entry| entry.search(binary_name))
    }
}
