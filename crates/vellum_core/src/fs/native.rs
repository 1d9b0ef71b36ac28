//! Native filesystem implementation.
//!
//! Only available on non-WASM targets.

use std::fs;
use std::io::Result;
use std::path::Path;
use std::time::UNIX_EPOCH;

use super::FileSystem;

/// Maps directly to `std::fs` reads.
#[derive(Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn get_modified_time(&self, path: &Path) -> Option<i64> {
        let modified = fs::metadata(path).ok()?.modified().ok()?;
        let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
        i64::try_from(since_epoch.as_millis()).ok()
    }
}
