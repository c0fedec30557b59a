//! HTTP layout store — persistence bridge to a remote store service that
//! speaks the layout-store API (`GET`/`PUT /api/v1/layout-store`).
//!
//! No retry or backoff: a failed save surfaces through the saver's
//! last-error slot and the next debounced save supersedes it.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::errors::LayoutError;
use crate::grid::persist::{GridItemRecord, LayoutStore, StoredLayout};

pub struct HttpLayoutStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLayoutStore {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, user_id: Uuid) -> String {
        format!("{}/api/v1/layout-store?user_id={user_id}", self.base_url)
    }
}

#[async_trait]
impl LayoutStore for HttpLayoutStore {
    async fn load(&self, user_id: Uuid) -> Result<StoredLayout, LayoutError> {
        let response = self
            .client
            .get(self.endpoint(user_id))
            .send()
            .await
            .map_err(|e| LayoutError::LoadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LayoutError::LoadFailed(format!(
                "store returned status {status}"
            )));
        }

        response
            .json::<StoredLayout>()
            .await
            .map_err(|e| LayoutError::LoadFailed(format!("invalid store response: {e}")))
    }

    async fn save(
        &self,
        user_id: Uuid,
        items: &[GridItemRecord],
    ) -> Result<StoredLayout, LayoutError> {
        let response = self
            .client
            .put(self.endpoint(user_id))
            .json(&json!({ "items": items }))
            .send()
            .await
            .map_err(|e| LayoutError::SaveFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LayoutError::SaveFailed(format!(
                "store returned status {status}"
            )));
        }

        response
            .json::<StoredLayout>()
            .await
            .map_err(|e| LayoutError::SaveFailed(format!("invalid store response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let user = Uuid::new_v4();
        let with_slash = HttpLayoutStore::new("http://store:8080/".to_string());
        let without = HttpLayoutStore::new("http://store:8080".to_string());
        assert_eq!(with_slash.endpoint(user), without.endpoint(user));
    }
}
