use std::collections::HashMap;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Key/value slot the cart snapshot is written to.
pub trait CartStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One file per key under `dir`.
pub struct FileCartStorage {
    dir: PathBuf,
}

impl FileCartStorage {
    pub fn new(dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(FileCartStorage { dir })
    }

    fn path_of(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(io::Error::new(ErrorKind::InvalidInput, format!("Invalid storage key {}", key)));
        }
        Ok(self.dir.join(key))
    }
}

impl CartStorage for FileCartStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_of(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes a sibling temp file and renames it over the old one, so a
    /// reader never sees a half written cart.
    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_of(key)?;
        let tmp = self.dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_of(key)?) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Clones share the same slots.
#[derive(Clone, Default)]
pub struct MemoryCartStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCartStorage {
    fn slots(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.slots.lock().map_err(|_| io::Error::new(ErrorKind::Other, "cart storage lock poisoned"))
    }
}

impl CartStorage for MemoryCartStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.slots()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        self.slots()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.slots()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileCartStorage::new(dir.path().join("carts"))?;

        assert_eq!(storage.load("wecut_cart.json")?, None);
        storage.save("wecut_cart.json", "[1]")?;
        storage.save("wecut_cart.json", "[2]")?;
        assert_eq!(storage.load("wecut_cart.json")?, Some("[2]".to_string()));
        assert!(!dir.path().join("carts").join(".wecut_cart.json.tmp").exists());

        storage.remove("wecut_cart.json")?;
        storage.remove("wecut_cart.json")?;
        assert_eq!(storage.load("wecut_cart.json")?, None);
        Ok(())
    }

    #[test]
    fn test_file_storage_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileCartStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(storage.save("../escape", "x").is_err());
        assert!(storage.load("").is_err());
    }
}
