use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{DONE_DIR, OUT_DIR, RAW_DIR, VALID_IMAGE_EXTENSIONS};

pub trait PathExt {
    fn ext_lower(&self) -> String;

    fn is_image(&self) -> bool;
}

impl PathExt for Path {
    fn ext_lower(&self) -> String {
        self.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn is_image(&self) -> bool {
        VALID_IMAGE_EXTENSIONS.contains(&self.ext_lower().as_str())
    }
}

pub fn raw_dir(workflow_path: impl AsRef<Path>) -> PathBuf {
    workflow_path.as_ref().join(RAW_DIR)
}

pub fn done_dir(workflow_path: impl AsRef<Path>) -> PathBuf {
    workflow_path.as_ref().join(DONE_DIR)
}

pub fn out_dir(workflow_path: impl AsRef<Path>) -> PathBuf {
    workflow_path.as_ref().join(OUT_DIR)
}

/// File name of the page at `index` (zero based), e.g. `007.png`.
pub fn page_file_name(index: usize, ext: impl AsRef<str>) -> String {
    format!("{:03}.{}", index, ext.as_ref())
}

/// Create `dir` and its parents, with a readable error.
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory tree {:?}", dir))?;
    Ok(dir.to_path_buf())
}
