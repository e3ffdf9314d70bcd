//! System include directory discovery.
//!
//! Cross toolchains ship their libc headers next to the compiler, e.g.
//! `<prefix>/bin/arm-none-eabi-gcc` and `<prefix>/arm-none-eabi/include`.
//! The compiler finds them implicitly, but tooling reading the compilation
//! database does not, so every command gets them appended as `-I` flags.

use indexmap::IndexMap;
use log::debug;
use std::io;
use std::path::{Path, PathBuf};

/// Number of distinct compilers remembered per resolver.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Strategy for finding the system include directories of a compiler.
///
/// Implementations must not fail: anything that goes wrong yields an empty
/// list.
pub trait IncludeLookup {
    fn lookup(&self, compiler: &str) -> Vec<PathBuf>;
}

impl<F> IncludeLookup for F
where
    F: Fn(&str) -> Vec<PathBuf>,
{
    fn lookup(&self, compiler: &str) -> Vec<PathBuf> {
        self(compiler)
    }
}

/// Looks the compiler up on `PATH` and globs `*/include` under its prefix.
///
/// Relative compiler paths such as `./toolchain/bin/gcc` are resolved
/// against the build directory when one is set, else the working directory.
#[derive(Debug, Clone, Default)]
pub struct ToolchainLookup {
    cwd: Option<PathBuf>,
}

impl ToolchainLookup {
    /// Resolve relative compiler paths against `dir`, where make runs.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(dir.into()),
        }
    }
}

impl IncludeLookup for ToolchainLookup {
    fn lookup(&self, compiler: &str) -> Vec<PathBuf> {
        match toolchain_includes(compiler, self.cwd.as_deref()) {
            Ok(dirs) => {
                debug!("System includes for {}: {:?}", compiler, dirs);
                dirs
            }
            Err(e) => {
                debug!("No system includes for {}: {}", compiler, e);
                Vec::new()
            }
        }
    }
}

fn toolchain_includes(compiler: &str, cwd: Option<&Path>) -> io::Result<Vec<PathBuf>> {
    let found = match cwd {
        Some(cwd) => which::which_in(compiler, std::env::var_os("PATH"), cwd),
        None => which::which(compiler),
    };
    let exe = found
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?
        .canonicalize()?;

    // <prefix>/bin/<tool> -> <prefix>
    let prefix = exe
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no prefix"))?;

    include_dirs_under(prefix)
}

/// Directories matching `<prefix>/*/include`, canonicalized and sorted.
///
/// Dot-directories match too, like `pathlib`'s glob.
pub fn include_dirs_under(prefix: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();

    for entry in std::fs::read_dir(prefix)? {
        let Ok(entry) = entry else { continue };
        let candidate = entry.path().join("include");
        if candidate.is_dir() {
            if let Ok(dir) = candidate.canonicalize() {
                dirs.push(dir);
            }
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Memoizing front end over an [`IncludeLookup`].
///
/// Each compiler name is looked up at most once while it stays in the cache,
/// including lookups that found nothing. The cache holds a bounded number of
/// names and evicts the oldest entry first.
#[derive(Debug)]
pub struct SystemIncludeResolver<L = ToolchainLookup> {
    lookup: L,
    cache: IndexMap<String, Vec<PathBuf>>,
    capacity: usize,
}

impl SystemIncludeResolver<ToolchainLookup> {
    pub fn new() -> Self {
        Self::with_lookup(ToolchainLookup::default())
    }

    /// Resolver for a build running in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::with_lookup(ToolchainLookup::in_dir(dir))
    }
}

impl Default for SystemIncludeResolver<ToolchainLookup> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: IncludeLookup> SystemIncludeResolver<L> {
    /// Create a resolver backed by a custom lookup.
    pub fn with_lookup(lookup: L) -> Self {
        Self {
            lookup,
            cache: IndexMap::new(),
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Set the number of compilers remembered (at least one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// System include directories for `compiler`, in lookup order.
    pub fn resolve(&mut self, compiler: &str) -> &[PathBuf] {
        if !self.cache.contains_key(compiler) {
            let dirs = self.lookup.lookup(compiler);
            while self.cache.len() >= self.capacity {
                self.cache.shift_remove_index(0);
            }
            self.cache.insert(compiler.to_string(), dirs);
        }

        self.cache.get(compiler).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of compilers currently cached.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
