//! Create-or-update of bundles.

use crate::client::CatalogClient;
use catalogx_common::Result;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::info;

/// How [`upsert_bundle`] picks between creating and updating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpsertMode {
    /// Update when the bundle is already registered, create otherwise.
    #[default]
    Auto,
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertAction::Created => write!(f, "created"),
            UpsertAction::Updated => write!(f, "updated"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub action: UpsertAction,
    pub response: Value,
}

/// Register the archive for `bundle_id`, creating or updating it per `mode`.
pub async fn upsert_bundle(
    client: &dyn CatalogClient,
    archive: &Path,
    bundle_id: &str,
    mode: UpsertMode,
) -> Result<UpsertOutcome> {
    let action = match mode {
        UpsertMode::Create => UpsertAction::Created,
        UpsertMode::Update => UpsertAction::Updated,
        UpsertMode::Auto => {
            let existing = client.list_bundles().await?;
            if existing.iter().any(|id| id == bundle_id) {
                info!("Bundle {} already registered, updating", bundle_id);
                UpsertAction::Updated
            } else {
                info!("Bundle {} not registered yet, creating", bundle_id);
                UpsertAction::Created
            }
        }
    };

    let response = match action {
        UpsertAction::Created => client.create_bundle(archive).await?,
        UpsertAction::Updated => client.update_bundle(archive).await?,
    };
    Ok(UpsertOutcome { action, response })
}
