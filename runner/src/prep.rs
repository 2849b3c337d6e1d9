//! Working-directory preparation before a harness launch.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use tickbridge_config::RunConfig;

/// License acknowledgement file some hosts refuse to start without.
pub const EULA_FILE: &str = "eula.txt";

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("failed to create test directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// A test directory that exists and is ready to launch in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDir {
    path: PathBuf,
    eula_accepted: bool,
}

impl PreparedDir {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn eula_accepted(&self) -> bool {
        self.eula_accepted
    }
}

/// Create `base_dir/test_dir` and, if configured, accept the EULA in it.
pub fn prepare(run: &RunConfig, base_dir: &Path) -> Result<PreparedDir, PrepError> {
    let path = base_dir.join(run.test_dir());
    fs::create_dir_all(&path).map_err(|source| PrepError::CreateDir {
        path: path.clone(),
        source,
    })?;

    if run.accept_eula() {
        let eula = path.join(EULA_FILE);
        write_atomic(&eula, b"eula=true\n").map_err(|source| PrepError::Write {
            path: eula.clone(),
            source,
        })?;
        tracing::info!(path = %eula.display(), "Accepted EULA");
    }

    tracing::info!(path = %path.display(), "Prepared test directory");
    Ok(PreparedDir {
        path,
        eula_accepted: run.accept_eula(),
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
