//! Turns alert state changes into folder notes and follow-up activities.

use std::sync::Arc;

use tracing::{debug, warn};
use transitdesk_domain::{AlertState, Folder, NewActivity, UserId};

use super::ports::MessagingPort;
use super::transition::{AlertTransition, FollowUp};
use crate::clock::Clock;
use crate::folder::ports::ActivityPort;

/// What a notification actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub transition: Option<AlertTransition>,
    pub note_posted: bool,
    pub activity_scheduled: bool,
}

/// Posts a note for every alert transition and plans follow-up work when a
/// folder leaves the open state.
pub struct AlertTransitionNotifier {
    messaging: Arc<dyn MessagingPort>,
    activities: Arc<dyn ActivityPort>,
    clock: Arc<dyn Clock>,
}

impl AlertTransitionNotifier {
    pub fn new(
        messaging: Arc<dyn MessagingPort>,
        activities: Arc<dyn ActivityPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { messaging, activities, clock }
    }

    /// Notify about `old -> new` on `folder`.
    ///
    /// Failures are logged and reflected in the outcome, never returned.
    /// `actor` receives the follow-up activity when the folder has no owner.
    pub async fn notify(
        &self,
        folder: &Folder,
        old: AlertState,
        new: AlertState,
        actor: Option<UserId>,
    ) -> TransitionOutcome {
        let Some(transition) = AlertTransition::between(old, new) else {
            return TransitionOutcome::default();
        };
        if !folder.is_persisted() {
            debug!(folder = %folder.name, "skipping alert notification for unsaved folder");
            return TransitionOutcome::default();
        }

        let mut outcome = TransitionOutcome { transition: Some(transition), ..Default::default() };

        let message = transition.message(&folder.name);
        match self.messaging.post_note(folder.id, &message).await {
            Ok(()) => outcome.note_posted = true,
            Err(err) => {
                warn!(folder = %folder.name, error = %err, "failed to post alert note");
            }
        }

        if let Some(follow_up) = transition.follow_up(&folder.name, folder.eta) {
            outcome.activity_scheduled = self.schedule_follow_up(folder, follow_up, actor).await;
        }

        outcome
    }

    async fn schedule_follow_up(
        &self,
        folder: &Folder,
        follow_up: FollowUp,
        actor: Option<UserId>,
    ) -> bool {
        let activity_type = match self.activities.find_type(follow_up.activity_type_key).await {
            Ok(Some(activity_type)) => activity_type,
            Ok(None) => {
                warn!(
                    folder = %folder.name,
                    activity_type = follow_up.activity_type_key,
                    "alert activity type not configured; skipping follow-up"
                );
                return false;
            }
            Err(err) => {
                warn!(folder = %folder.name, error = %err, "failed to look up alert activity type");
                return false;
            }
        };

        let activity = NewActivity {
            folder_id: folder.id,
            activity_type_id: activity_type.id,
            summary: follow_up.summary,
            note: Some(follow_up.note),
            user_id: folder.user_id.or(actor),
            due_date: self.clock.today(),
        };

        match self.activities.schedule(activity).await {
            Ok(_) => true,
            Err(err) => {
                warn!(folder = %folder.name, error = %err, "failed to schedule alert follow-up");
                false
            }
        }
    }
}
