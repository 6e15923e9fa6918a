mod schema;
mod settings;
mod storage;

use std::io;
use std::path::{Path, PathBuf};

pub use schema::SchemaManager;
pub use settings::{Auth, Database, Logger, Scheduler, Server, Settings, Sms};
pub use storage::Storage;

pub(crate) fn normalize_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    Ok(std::env::current_dir()?.join(path))
}
