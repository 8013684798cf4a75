//! File-backed storage for the guestbook.
//!
//! The whole log lives in a single JSON array, oldest entry first. Every
//! mutation rewrites the file through a temp file and a rename, so readers
//! only ever observe a complete document.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::model::Post;

/// File name of the post log inside the data directory.
pub const DATA_FILE: &str = "data.json";

/// Number of most recent posts kept on disk.
pub const RETAINED_POSTS: usize = 10;

#[derive(Debug)]
pub struct PostStore {
    dir: PathBuf,
    path: PathBuf,
    // Guards the load/append/persist cycle; the data itself is on disk.
    lock: Mutex<()>,
}

impl PostStore {
    pub fn open<P: AsRef<Path>>(data_path: P) -> PostStore {
        let dir = match data_path.as_ref() {
            p if p.as_os_str().is_empty() => PathBuf::from("."),
            p => p.to_path_buf(),
        };
        let path = dir.join(DATA_FILE);
        PostStore {
            dir: dir,
            path: path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every stored post, oldest first.
    pub fn load(&self) -> Result<Vec<Post>, StoreError> {
        let _guard = self.lock();
        self.read_posts()
    }

    /// Returns every stored post, newest first.
    pub fn recent(&self) -> Result<Vec<Post>, StoreError> {
        let mut posts = self.load()?;
        posts.reverse();
        Ok(posts)
    }

    /// Appends `post` and keeps only the last [`RETAINED_POSTS`] entries.
    ///
    /// On error the file on disk is left exactly as it was.
    pub fn save(&self, post: Post) -> Result<(), StoreError> {
        let _guard = self.lock();

        let mut posts = self.read_posts()?;
        posts.push(post);
        if posts.len() > RETAINED_POSTS {
            let excess = posts.len() - RETAINED_POSTS;
            posts.drain(..excess);
        }

        let payload = serde_json::to_vec(&posts).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        atomic_write(&self.dir, &self.path, &payload).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        debug!("saved post log with {} entries to {}", posts.len(), self.path.display());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_posts(&self) -> Result<Vec<Post>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Mode given to a post log that did not exist before.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Writes `data` to a temp file in `dir`, syncs it and renames it over `target`.
///
/// The target keeps its permissions across the replace. The directory is
/// synced after the rename so the new entry survives a crash.
fn atomic_write(dir: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;

    match fs::metadata(target) {
        Ok(metadata) => temp.as_file().set_permissions(metadata.permissions())?,
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                temp.as_file()
                    .set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))?;
            }
        }
        Err(e) => return Err(e),
    }

    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;

    #[cfg(unix)]
    fs::File::open(dir)?.sync_all()?;

    Ok(())
}
