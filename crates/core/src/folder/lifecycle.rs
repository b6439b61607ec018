//! Folder lifecycle: creation, stage moves and the controlled write paths.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, instrument, warn};
use transitdesk_domain::constants::{
    ACTIVITY_FOLDER_OPENED, ACTIVITY_ORDER_RECEIVED, ACTIVITY_SHIPPING_START,
    FULL_DISTRIBUTION_WEIGHT, MAX_CONTAINER_NUMBER_LENGTH, NEXT_ACTIVITY_DELAY_DAYS,
    PLACEHOLDER_FOLDER_NAME, STAGE_POSITION_BASE, STAGE_POSITION_COUNTER_PREFIX,
    VALIDATION_STAGE_NUMBER,
};
use transitdesk_domain::{
    Activity, ActivityId, ActivityType, AnalyticDistribution, ChecklistTask, Folder, FolderId,
    FolderLine, FolderLineKind, NewActivity, NewFolder, NewFolderLine, NewPackageLine,
    PackageLine, Result, Stage, StageId, StageKind, TransitDeskError, UserId,
};

use super::ports::{
    ActivityPort, ChecklistRepository, FolderRepository, SequencePort, StageRepository,
};
use crate::alerts::engine::evaluate;
use crate::alerts::notifier::AlertTransitionNotifier;
use crate::alerts::ports::UserDirectory;
use crate::analytic::ports::AnalyticRepository;
use crate::clock::Clock;

/// Collaborators of [`FolderLifecycleController`].
#[derive(Clone)]
pub struct FolderPorts {
    pub folders: Arc<dyn FolderRepository>,
    pub stages: Arc<dyn StageRepository>,
    pub checklist: Arc<dyn ChecklistRepository>,
    pub activities: Arc<dyn ActivityPort>,
    pub analytic: Arc<dyn AnalyticRepository>,
    pub sequence: Arc<dyn SequencePort>,
    pub users: Arc<dyn UserDirectory>,
}

/// Outcome of a validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The folder can move on.
    Ready,
    /// The user must confirm validating without these references.
    NeedsConfirmation { missing: Vec<&'static str> },
}

/// Creates folders and guards every write that carries business rules.
pub struct FolderLifecycleController {
    ports: FolderPorts,
    notifier: Arc<AlertTransitionNotifier>,
    clock: Arc<dyn Clock>,
}

impl FolderLifecycleController {
    pub fn new(
        ports: FolderPorts,
        notifier: Arc<AlertTransitionNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { ports, notifier, clock }
    }

    /// Fetch a folder or fail with `NotFound`.
    pub async fn get_folder(&self, id: FolderId) -> Result<Folder> {
        self.ports
            .folders
            .get(id)
            .await?
            .ok_or_else(|| TransitDeskError::NotFound(format!("folder {id}")))
    }

    /// Create a folder with its case number, analytic account and, for
    /// transit folders, the two opening checklist entries.
    #[instrument(skip(self, input))]
    pub async fn create_folder(&self, input: NewFolder, actor: UserId) -> Result<Folder> {
        let kind = input.stage_kind.unwrap_or(StageKind::Transit);
        let today = self.clock.today();

        let name = match input.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() && name != PLACEHOLDER_FOLDER_NAME => name.to_string(),
            _ => {
                let value = self.ports.sequence.next_value(kind.case_counter()).await?;
                kind.format_case_number(value)
            }
        };

        let mut folder = Folder::draft(name, kind, input.date_open.unwrap_or(today));
        folder.eta = input.eta;
        folder.alert_state = evaluate(today, input.eta);
        folder.deadline = input.deadline;
        folder.customer = input.customer;
        folder.user_id = input.user_id;
        folder.bill_of_lading = input.bill_of_lading;
        folder.order_reference = input.order_reference;
        folder.besc = input.besc;
        folder.rvc = input.rvc;
        folder.goods = input.goods;

        if let Some(stage) = self.ports.stages.list_for_kind(kind).await?.into_iter().next() {
            folder.stage_id = Some(stage.id);
            folder.stage_number = stage.number;
        }

        folder.id = self.ports.folders.create(&folder).await?;
        info!(folder = %folder.name, id = folder.id, %kind, "folder created");

        self.provision_analytic_account(&mut folder).await?;

        if kind == StageKind::Transit {
            self.complete_opening_activities(&folder, actor).await?;
        }

        self.get_folder(folder.id).await
    }

    async fn provision_analytic_account(&self, folder: &mut Folder) -> Result<()> {
        let Some(plan) = self.ports.analytic.plan_for_kind(folder.stage_kind).await? else {
            warn!(
                folder = %folder.name,
                kind = %folder.stage_kind,
                "no analytic plan configured; folder has no analytic account"
            );
            return Ok(());
        };

        let account = self.ports.analytic.create_account(&folder.name, plan.id).await?;
        folder.analytic_account_id = Some(account.id);
        folder.analytic_distribution =
            AnalyticDistribution::single(account.id, FULL_DISTRIBUTION_WEIGHT);
        folder.task_total = self.ports.activities.count_types(folder.stage_kind).await?;
        self.ports.folders.update(folder).await?;
        debug!(folder = %folder.name, account = account.id, "analytic account provisioned");
        Ok(())
    }

    async fn complete_opening_activities(&self, folder: &Folder, actor: UserId) -> Result<()> {
        let responsible = self.user_name(actor).await;
        let today = self.clock.today();

        for key in [ACTIVITY_ORDER_RECEIVED, ACTIVITY_FOLDER_OPENED] {
            let Some(activity_type) = self.ports.activities.find_type(key).await? else {
                warn!(folder = %folder.name, activity_type = key, "opening activity type missing");
                continue;
            };
            let activity = self
                .ports
                .activities
                .schedule(NewActivity {
                    folder_id: folder.id,
                    activity_type_id: activity_type.id,
                    summary: activity_type.name.clone(),
                    note: None,
                    user_id: Some(actor),
                    due_date: folder.date_open,
                })
                .await?;
            self.ports.activities.mark_done(activity.id, today, responsible.clone()).await?;
        }
        Ok(())
    }

    /// Move a folder to `stage_id`.
    ///
    /// Stages 105 and 106 require a started checklist and no open activity.
    /// An unnumbered target stage receives the next free position first.
    #[instrument(skip(self))]
    pub async fn advance_stage(&self, folder_id: FolderId, stage_id: StageId) -> Result<Folder> {
        let mut folder = self.get_folder(folder_id).await?;
        let stage = self.get_stage(stage_id).await?;

        if stage.stage_kind != folder.stage_kind {
            return Err(TransitDeskError::Validation(format!(
                "Stage {} does not belong to {} folders",
                stage.name, folder.stage_kind
            )));
        }

        if stage.is_gated() {
            if !self.ports.activities.open_activities(folder.id).await?.is_empty() {
                return Err(TransitDeskError::Validation(
                    "Please finish all tasks before moving to this stage".into(),
                ));
            }
            if self.checklist_progress(&folder).await? <= 0.0 {
                return Err(TransitDeskError::Validation(
                    "Please plan before moving to this stage".into(),
                ));
            }
        }

        let number = self.stage_number(&stage).await?;
        folder.stage_id = Some(stage.id);
        folder.stage_number = number;
        self.ports.folders.update(&folder).await?;
        info!(folder = %folder.name, stage = %stage.name, number, "folder moved to stage");
        Ok(folder)
    }

    async fn stage_number(&self, stage: &Stage) -> Result<i32> {
        if stage.is_numbered() {
            return Ok(stage.number);
        }
        let counter = format!("{STAGE_POSITION_COUNTER_PREFIX}.{}", stage.stage_kind);
        let value = self.ports.sequence.next_value(&counter).await?;
        let offset = i32::try_from(value).map_err(|_| {
            TransitDeskError::Internal(format!("stage position counter overflow: {value}"))
        })?;
        self.ports.stages.claim_number(stage.id, STAGE_POSITION_BASE + offset).await
    }

    /// Change the ETA, recompute the alert and notify about the change.
    #[instrument(skip(self))]
    pub async fn set_eta(
        &self,
        folder_id: FolderId,
        eta: Option<NaiveDate>,
        actor: Option<UserId>,
    ) -> Result<Folder> {
        let mut folder = self.get_folder(folder_id).await?;
        let old = folder.alert_state;
        folder.eta = eta;
        folder.alert_state = evaluate(self.clock.today(), eta);
        self.ports.folders.update(&folder).await?;
        self.notifier.notify(&folder, old, folder.alert_state, actor).await;
        Ok(folder)
    }

    /// Rename a folder and its analytic account.
    pub async fn rename_folder(&self, folder_id: FolderId, name: &str) -> Result<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TransitDeskError::Validation("A folder needs a name".into()));
        }
        let mut folder = self.get_folder(folder_id).await?;
        folder.name = name.to_string();
        self.ports.folders.update(&folder).await?;

        if let Some(account_id) = folder.analytic_distribution.first_account_id() {
            if self.ports.analytic.get_account(account_id).await?.is_some() {
                self.ports.analytic.rename_account(account_id, name).await?;
            }
        }
        Ok(folder)
    }

    /// Archive or restore a folder.
    pub async fn set_archived(&self, folder_id: FolderId, archived: bool) -> Result<()> {
        self.get_folder(folder_id).await?;
        self.ports.folders.set_active(folder_id, !archived).await
    }

    /// Flip the archived flag and return whether the folder is now active.
    pub async fn toggle_active(&self, folder_id: FolderId) -> Result<bool> {
        let folder = self.get_folder(folder_id).await?;
        let active = !folder.active;
        self.ports.folders.set_active(folder_id, active).await?;
        Ok(active)
    }

    /// Remove a folder with everything it owns.
    pub async fn delete_folder(&self, folder_id: FolderId) -> Result<()> {
        let folder = self.get_folder(folder_id).await?;
        self.ports.folders.delete(folder_id).await?;
        info!(folder = %folder.name, "folder deleted");
        Ok(())
    }

    /// Check that a folder at the validation stage can be validated.
    pub async fn validate_folder(&self, folder_id: FolderId) -> Result<ValidationOutcome> {
        let folder = self.get_folder(folder_id).await?;
        if folder.stage_number != VALIDATION_STAGE_NUMBER {
            return Ok(ValidationOutcome::Ready);
        }
        if folder.eta.is_none() {
            return Err(TransitDeskError::Validation(
                "This folder cannot be validated without an ETA".into(),
            ));
        }

        let missing: Vec<&'static str> = [("BESC", &folder.besc), ("RVC", &folder.rvc)]
            .into_iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(label, _)| label)
            .collect();

        if missing.is_empty() {
            Ok(ValidationOutcome::Ready)
        } else {
            Ok(ValidationOutcome::NeedsConfirmation { missing })
        }
    }

    /// Completed checklist entries as a percentage of the kind's activity
    /// types.
    #[allow(clippy::cast_precision_loss)]
    pub async fn checklist_progress(&self, folder: &Folder) -> Result<f64> {
        let completed = self.ports.checklist.count_for_folder(folder.id).await?;
        let configured = self.ports.activities.count_types(folder.stage_kind).await?;
        let total = if configured > 0 {
            configured
        } else if folder.task_total > 0 {
            folder.task_total
        } else {
            1
        };
        Ok(completed as f64 * 100.0 / total as f64)
    }

    /// Mark an open activity done and record it on the checklist.
    pub async fn complete_activity(
        &self,
        activity_id: ActivityId,
        actor: UserId,
    ) -> Result<ChecklistTask> {
        let activity = match self.ports.activities.get_activity(activity_id).await? {
            Some(activity) if !activity.done => activity,
            _ => {
                return Err(TransitDeskError::Validation(
                    "No activity in progress to validate".into(),
                ));
            }
        };

        let responsible = self.user_name(actor).await;
        let task = self
            .ports
            .activities
            .mark_done(activity.id, self.clock.today(), responsible)
            .await?;

        let mut folder = self.get_folder(activity.folder_id).await?;
        if folder.stage_kind != StageKind::Ship {
            return Ok(task);
        }

        let linked_stage = self
            .ports
            .activities
            .get_type(activity.activity_type_id)
            .await?
            .and_then(|activity_type| activity_type.stage_id);
        if let Some(stage_id) = linked_stage {
            let stage = self.get_stage(stage_id).await?;
            folder.stage_id = Some(stage.id);
            folder.stage_number = stage.number;
            self.ports.folders.update(&folder).await?;
        }
        Ok(task)
    }

    /// Plan the folder's next activity.
    pub async fn schedule_next_activity(&self, folder_id: FolderId) -> Result<Activity> {
        let folder = self.get_folder(folder_id).await?;
        let completed = self.ports.checklist.count_for_folder(folder.id).await?;

        let activity_type = if completed == 0 {
            let key = match folder.stage_kind {
                StageKind::Transit | StageKind::Accone => ACTIVITY_ORDER_RECEIVED,
                StageKind::Ship => ACTIVITY_SHIPPING_START,
            };
            self.ports.activities.find_type(key).await?.ok_or_else(|| {
                TransitDeskError::Config(format!("activity type '{key}' is not configured"))
            })?
        } else {
            self.next_type_after(folder.stage_kind, completed).await?
        };

        let activity = self
            .ports
            .activities
            .schedule(NewActivity {
                folder_id: folder.id,
                activity_type_id: activity_type.id,
                summary: activity_type.name.clone(),
                note: None,
                user_id: activity_type.responsible_user_id,
                due_date: folder.date_open + Duration::days(NEXT_ACTIVITY_DELAY_DAYS),
            })
            .await?;
        debug!(folder = %folder.name, activity = %activity.summary, "next activity scheduled");
        Ok(activity)
    }

    async fn next_type_after(&self, kind: StageKind, completed: i64) -> Result<ActivityType> {
        let types = self.ports.activities.list_types(kind).await?;
        usize::try_from(completed)
            .ok()
            .and_then(|index| types.into_iter().nth(index))
            .ok_or_else(|| {
                TransitDeskError::Validation("Every activity of this folder is already done".into())
            })
    }

    /// Add a service or merchandise line.
    pub async fn add_line(
        &self,
        folder_id: FolderId,
        kind: FolderLineKind,
        description: &str,
        quantity: f64,
        amount: f64,
    ) -> Result<FolderLine> {
        self.get_folder(folder_id).await?;
        if description.trim().is_empty() {
            return Err(TransitDeskError::InvalidInput("line description is empty".into()));
        }
        self.ports
            .folders
            .add_line(NewFolderLine {
                folder_id,
                kind,
                description: description.trim().to_string(),
                quantity,
                amount,
            })
            .await
    }

    pub async fn lines(
        &self,
        folder_id: FolderId,
        kind: Option<FolderLineKind>,
    ) -> Result<Vec<FolderLine>> {
        self.ports.folders.lines(folder_id, kind).await
    }

    /// Track a container on a folder.
    pub async fn add_package(&self, package: NewPackageLine) -> Result<PackageLine> {
        let number = package.container_number.trim();
        if number.is_empty() || number.chars().count() > MAX_CONTAINER_NUMBER_LENGTH {
            return Err(TransitDeskError::InvalidInput(format!(
                "container number must have 1 to {MAX_CONTAINER_NUMBER_LENGTH} characters"
            )));
        }
        self.get_folder(package.folder_id).await?;
        let package = NewPackageLine { container_number: number.to_string(), ..package };
        self.ports.folders.add_package(package).await
    }

    pub async fn packages(&self, folder_id: FolderId) -> Result<Vec<PackageLine>> {
        self.ports.folders.packages(folder_id).await
    }

    async fn get_stage(&self, id: StageId) -> Result<Stage> {
        self.ports
            .stages
            .get(id)
            .await?
            .ok_or_else(|| TransitDeskError::NotFound(format!("stage {id}")))
    }

    async fn user_name(&self, id: UserId) -> Option<String> {
        match self.ports.users.get(id).await {
            Ok(user) => user.map(|user| user.name),
            Err(err) => {
                warn!(user_id = id, error = %err, "failed to resolve user name");
                None
            }
        }
    }
}
