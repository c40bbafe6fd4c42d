//! Path context for the two ways a family file can fail: reading it and
//! parsing it. Snapshots and record imports share both.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

pub trait IoResultExt<T> {
    /// Wrap an I/O error as `OperationFailed`, naming the action and file.
    ///
    /// ```ignore
    /// std::fs::read_to_string(&path).with_path_context("read snapshot", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

pub trait TomlResultExt<T> {
    /// Wrap a parse error, including a rejected rank schema, as `Snapshot`
    /// for the file it came from.
    fn with_file(self, path: &Path) -> ApplicationResult<T>;
}

impl<T> TomlResultExt<T> for Result<T, toml::de::Error> {
    fn with_file(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
