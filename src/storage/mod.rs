use crate::auth::Session;

pub mod hosted;
pub mod local;

/// Where uploaded image bytes live. Objects are publicly readable; writes are
/// authorised by the signed-in session.
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `path` and return the public URL.
    fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, String>;

    fn delete(&self, session: &Session, path: &str) -> Result<(), String>;

    /// URL prefix every object in this storage is served under.
    fn public_prefix(&self) -> String;

    fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_prefix(), path)
    }
}

/// Object names are generated by us; anything that could escape the bucket
/// or directory is refused.
pub(crate) fn check_object_path(path: &str) -> Result<(), String> {
    if path.is_empty()
        || path.contains('/')
        || path.contains('\\')
        || path.starts_with('.')
        || path.contains("..")
    {
        return Err(format!("Invalid object path: {}", path));
    }
    Ok(())
}
