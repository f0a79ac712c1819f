//! Pin and lock flags. Two independent booleans; every transition is legal
//! for a moderator or above, and repeating a transition is a no-op success.

use chrono::Utc;
use domains::{Action, Caller, PolicyContext, Result};
use tracing::instrument;
use uuid::Uuid;

use super::{authenticated, authorize, ForumService};

impl ForumService {
    #[instrument(skip(self, caller), fields(caller = ?caller.user().map(|u| u.id)))]
    pub async fn set_pinned(&self, caller: &Caller, topic_id: Uuid, pinned: bool) -> Result<()> {
        authenticated(caller)?;
        authorize(caller, Action::PinTopic, &PolicyContext::default())?;
        self.ports.topics.set_pinned(topic_id, pinned, Utc::now()).await?;
        tracing::info!("topic pin flag set");
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller = ?caller.user().map(|u| u.id)))]
    pub async fn set_locked(&self, caller: &Caller, topic_id: Uuid, locked: bool) -> Result<()> {
        authenticated(caller)?;
        authorize(caller, Action::LockTopic, &PolicyContext::default())?;
        self.ports.topics.set_locked(topic_id, locked, Utc::now()).await?;
        tracing::info!("topic lock flag set");
        Ok(())
    }
}
