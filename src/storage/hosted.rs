use reqwest::Method;
use serde_json::json;

use crate::auth::Session;
use crate::hosted::{send, HostedClient};

use super::{check_object_path, ObjectStorage};

/// Public bucket in the managed object store.
pub struct HostedStorage {
    client: HostedClient,
    bucket: String,
}

impl HostedStorage {
    pub fn new(client: HostedClient, bucket: &str) -> Self {
        HostedStorage {
            client,
            bucket: bucket.to_string(),
        }
    }
}

impl ObjectStorage for HostedStorage {
    fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, String> {
        check_object_path(path)?;
        let url = self
            .client
            .storage_url(&format!("object/{}/{}", self.bucket, path));
        let request = self
            .client
            .request(Method::POST, &url, session.access_token.as_deref())
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes.to_vec());
        send(request, "storage upload")?;
        Ok(self.public_url(path))
    }

    fn delete(&self, session: &Session, path: &str) -> Result<(), String> {
        check_object_path(path)?;
        let url = self.client.storage_url(&format!("object/{}", self.bucket));
        let request = self
            .client
            .request(Method::DELETE, &url, session.access_token.as_deref())
            .json(&json!({ "prefixes": [path] }));
        send(request, "storage delete")?;
        Ok(())
    }

    fn public_prefix(&self) -> String {
        format!(
            "{}/",
            self.client
                .storage_url(&format!("object/public/{}", self.bucket))
        )
    }
}
