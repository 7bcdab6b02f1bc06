//! Preview handles for staged images.
//!
//! A preview is the gateway's counterpart of a browser object URL: a handle
//! that serves the staged image bytes until it is revoked. Each surface owns
//! at most one preview at a time.

use std::collections::HashMap;

use agrisave_models::ClassificationRequest;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Image served under a preview handle.
#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Path a preview is served under.
pub fn preview_url(id: Uuid) -> String {
    format!("/api/previews/{}", id)
}

#[derive(Default)]
pub struct PreviewStore {
    previews: RwLock<HashMap<Uuid, Preview>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke `previous` (if any), then publish `image` under a new handle.
    pub async fn replace(&self, previous: Option<Uuid>, image: &ClassificationRequest) -> Uuid {
        let id = Uuid::new_v4();
        let mut previews = self.previews.write().await;
        if let Some(old) = previous {
            if previews.remove(&old).is_some() {
                debug!(preview_id = %old, "Preview revoked");
            }
        }
        previews.insert(
            id,
            Preview {
                bytes: image.bytes.clone(),
                mime_type: image.mime_type.clone(),
            },
        );
        id
    }

    /// Revoke a preview. Returns false if it was not live.
    pub async fn revoke(&self, id: Uuid) -> bool {
        let revoked = self.previews.write().await.remove(&id).is_some();
        if revoked {
            debug!(preview_id = %id, "Preview revoked");
        }
        revoked
    }

    pub async fn get(&self, id: Uuid) -> Option<Preview> {
        self.previews.read().await.get(&id).cloned()
    }

    /// Number of live previews.
    pub async fn len(&self) -> usize {
        self.previews.read().await.len()
    }
}
