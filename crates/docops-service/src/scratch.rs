// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-invocation scratch directory, removed when dropped.

use std::path::Path;

use docops_core::error::Result;
use tempfile::TempDir;
use tracing::debug;

/// Private working directory for one invocation. Removed on drop, which
/// covers success, failure, and unwinding alike.
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a fresh directory under `root`, or under the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docops-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Scratch space created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        debug!(path = %self.dir.path().display(), "Releasing scratch space");
    }
}
