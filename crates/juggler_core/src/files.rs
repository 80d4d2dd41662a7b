//! Worker-private template copies.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::axis::Axis;
use crate::error::{Result, SweepError};

/// Path of the private copy of `template` owned by `slot`.
///
/// The slot number is inserted before the extension (`a.cfg` becomes
/// `a_3.cfg`), or appended when the file name has none.
#[must_use]
pub fn private_path(template: &Path, slot: usize) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match template.extension() {
        Some(ext) => format!("{stem}_{slot}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{slot}"),
    };
    template.with_file_name(name)
}

/// Registry of the private copies created during one run.
///
/// Every path is copied from its template once and removed by [`cleanup`].
///
/// [`cleanup`]: PrivateFiles::cleanup
#[derive(Debug, Default)]
pub struct PrivateFiles {
    paths: Vec<PathBuf>,
    seen: FxHashSet<PathBuf>,
}

impl PrivateFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every axis template to its private path for `slot`.
    ///
    /// Axes sharing a template share the copy, so it is made only once.
    pub fn materialize(&mut self, axes: &[Axis], slot: usize) -> Result<()> {
        for axis in axes {
            let target = private_path(axis.template(), slot);
            if self.seen.contains(&target) {
                continue;
            }
            fs::copy(axis.template(), &target).map_err(|e| SweepError::io(&target, e))?;
            tracing::debug!(slot, path = %target.display(), "created private copy");
            self.seen.insert(target.clone());
            self.paths.push(target);
        }
        Ok(())
    }

    /// Paths registered so far, in creation order
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete every registered copy and clear the registry.
    ///
    /// Copies already gone are ignored; the first other failure is returned
    /// after all removals have been attempted.
    pub fn cleanup(&mut self) -> Result<()> {
        let mut first_error = None;
        for path in self.paths.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove private copy");
                    if first_error.is_none() {
                        first_error = Some(SweepError::io(&path, e));
                    }
                }
            }
        }
        self.seen.clear();
        first_error.map_or(Ok(()), Err)
    }
}
