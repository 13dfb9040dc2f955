use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::auth::Session;

use super::{check_object_path, ObjectStorage};

/// Files in a directory that Rocket serves at `/uploads`.
pub struct LocalStorage {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalStorage {
            dir: dir.into(),
            url_prefix: "/uploads/".to_string(),
        }
    }
}

impl ObjectStorage for LocalStorage {
    fn upload(
        &self,
        _session: &Session,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, String> {
        check_object_path(path)?;
        fs::create_dir_all(&self.dir).map_err(|e| e.to_string())?;
        let dest = self.dir.join(path);
        if dest.exists() {
            return Err(format!("Object already exists: {}", path));
        }
        fs::write(&dest, bytes).map_err(|e| e.to_string())?;
        Ok(self.public_url(path))
    }

    fn delete(&self, _session: &Session, path: &str) -> Result<(), String> {
        check_object_path(path)?;
        match fs::remove_file(self.dir.join(path)) {
            Ok(()) => Ok(()),
            // Already gone is what the caller wanted.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn public_prefix(&self) -> String {
        self.url_prefix.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("basecamp-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn upload_then_delete() {
        let dir = temp_dir();
        let storage = LocalStorage::new(&dir);
        let session = Session::for_tests();

        let url = storage
            .upload(&session, "a.jpg", b"jpeg bytes", "image/jpeg")
            .unwrap();
        assert_eq!(url, "/uploads/a.jpg");
        assert_eq!(fs::read(dir.join("a.jpg")).unwrap(), b"jpeg bytes");

        assert!(storage.upload(&session, "a.jpg", b"again", "image/jpeg").is_err());

        storage.delete(&session, "a.jpg").unwrap();
        assert!(!dir.join("a.jpg").exists());
        // Second delete is a no-op.
        storage.delete(&session, "a.jpg").unwrap();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn traversal_is_refused() {
        let storage = LocalStorage::new(temp_dir());
        let session = Session::for_tests();
        assert!(storage.upload(&session, "../x.jpg", b"x", "image/jpeg").is_err());
    }
}
