//! In-memory implementation of every core port.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use transitdesk_core::{
    ActivityPort, AnalyticRepository, ChecklistRepository, FolderRepository, MessagingPort,
    SequencePort, StageRepository, UserDirectory,
};
use transitdesk_domain::{
    AccountId, Activity, ActivityId, ActivityType, ActivityTypeId, AlertState, AnalyticLine,
    AnalyticPlan, ChecklistTask, Folder, FolderId, FolderLine, FolderLineKind, FolderQuery,
    LedgerAccount, MailState, MoveType, NewActivity, NewFolderLine, NewPackageLine, PackageLine, PlanId,
    Result as DomainResult, Stage, StageId, StageKind, TransitDeskError, User, UserId,
};

/// Mail captured by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_html: String,
}

#[derive(Default)]
struct State {
    next_id: i64,
    folders: BTreeMap<FolderId, Folder>,
    stages: BTreeMap<StageId, Stage>,
    checklist: Vec<ChecklistTask>,
    activity_types: Vec<ActivityType>,
    activities: BTreeMap<ActivityId, Activity>,
    counters: HashMap<String, i64>,
    users: Vec<User>,
    plans: Vec<AnalyticPlan>,
    accounts: BTreeMap<AccountId, LedgerAccount>,
    analytic_lines: Vec<AnalyticLine>,
    documents: Vec<(i64, MoveType, Vec<AccountId>)>,
    folder_lines: Vec<FolderLine>,
    packages: Vec<PackageLine>,
    notes: Vec<(FolderId, String)>,
    mails: Vec<SentMail>,
    fail_mail: bool,
    queue_mail: bool,
    failing_alert_writes: HashSet<FolderId>,
    analytic_queries: usize,
}

impl State {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn add_user(&self, name: &str, email: Option<&str>, roles: &[&str]) -> UserId {
        let mut state = self.state.lock();
        let id = state.id();
        state.users.push(User {
            id,
            name: name.into(),
            email: email.map(Into::into),
            roles: roles.iter().map(|role| (*role).to_string()).collect(),
        });
        id
    }

    pub fn add_stage(&self, name: &str, number: i32, kind: StageKind) -> StageId {
        let mut state = self.state.lock();
        let id = state.id();
        state.stages.insert(id, Stage { id, name: name.into(), number, stage_kind: kind });
        id
    }

    pub fn stage(&self, id: StageId) -> Stage {
        self.state.lock().stages[&id].clone()
    }

    pub fn add_activity_type(
        &self,
        key: &str,
        name: &str,
        kind: StageKind,
        sequence: i32,
    ) -> ActivityTypeId {
        self.add_activity_type_with_stage(key, name, Some(kind), sequence, None)
    }

    pub fn add_activity_type_with_stage(
        &self,
        key: &str,
        name: &str,
        kind: Option<StageKind>,
        sequence: i32,
        stage_id: Option<StageId>,
    ) -> ActivityTypeId {
        let mut state = self.state.lock();
        let id = state.id();
        state.activity_types.push(ActivityType {
            id,
            key: key.into(),
            name: name.into(),
            stage_kind: kind,
            sequence,
            responsible_user_id: None,
            stage_id,
        });
        id
    }

    /// Standard transit templates plus the two alert templates.
    pub fn seed_transit_templates(&self) {
        self.add_activity_type("order_received", "Order received", StageKind::Transit, 1);
        self.add_activity_type("folder_opened", "Folder opened", StageKind::Transit, 2);
        self.add_activity_type("declaration", "Declaration filed", StageKind::Transit, 3);
        self.add_activity_type("release", "Goods released", StageKind::Transit, 4);
        self.seed_alert_templates();
    }

    pub fn seed_alert_templates(&self) {
        self.add_activity_type_with_stage("alert_danger", "ETA alert", None, 90, None);
        self.add_activity_type_with_stage("alert_overdue", "ETA overdue", None, 91, None);
    }

    pub fn add_plan(&self, kind: StageKind) -> PlanId {
        let mut state = self.state.lock();
        let id = state.id();
        state.plans.push(AnalyticPlan { id, name: format!("{kind} plan"), stage_kind: Some(kind) });
        id
    }

    pub fn post_line(&self, amount: f64, account_ids: &[AccountId]) -> i64 {
        let mut state = self.state.lock();
        let id = state.id();
        state.analytic_lines.push(AnalyticLine {
            id,
            name: format!("line {id}"),
            amount,
            account_ids: account_ids.to_vec(),
        });
        id
    }

    pub fn post_document(&self, move_type: MoveType, account_ids: &[AccountId]) -> i64 {
        let mut state = self.state.lock();
        let id = state.id();
        state.documents.push((id, move_type, account_ids.to_vec()));
        id
    }

    /// Insert a folder as-is, bypassing the lifecycle controller.
    pub fn insert_folder(&self, mut folder: Folder) -> FolderId {
        let mut state = self.state.lock();
        let id = state.id();
        folder.id = id;
        state.folders.insert(id, folder);
        id
    }

    pub fn folder(&self, id: FolderId) -> Folder {
        self.state.lock().folders[&id].clone()
    }

    pub fn account(&self, id: AccountId) -> Option<LedgerAccount> {
        self.state.lock().accounts.get(&id).cloned()
    }

    pub fn notes_for(&self, folder_id: FolderId) -> Vec<String> {
        let state = self.state.lock();
        state.notes.iter().filter(|(id, _)| *id == folder_id).map(|(_, b)| b.clone()).collect()
    }

    pub fn activities_for(&self, folder_id: FolderId) -> Vec<Activity> {
        let state = self.state.lock();
        state.activities.values().filter(|a| a.folder_id == folder_id).cloned().collect()
    }

    pub fn checklist_for(&self, folder_id: FolderId) -> Vec<ChecklistTask> {
        let state = self.state.lock();
        state.checklist.iter().filter(|t| t.folder_id == folder_id).cloned().collect()
    }

    pub fn mails(&self) -> Vec<SentMail> {
        self.state.lock().mails.clone()
    }

    pub fn fail_mail(&self, fail: bool) {
        self.state.lock().fail_mail = fail;
    }

    /// Record mails without a relay, as a desk without SMTP does.
    pub fn queue_mail(&self, queue: bool) {
        self.state.lock().queue_mail = queue;
    }

    pub fn fail_alert_writes_for(&self, folder_id: FolderId) {
        self.state.lock().failing_alert_writes.insert(folder_id);
    }

    pub fn analytic_queries(&self) -> usize {
        self.state.lock().analytic_queries
    }
}

fn not_found(what: &str, id: i64) -> TransitDeskError {
    TransitDeskError::NotFound(format!("{what} {id}"))
}

#[async_trait]
impl FolderRepository for InMemoryStore {
    async fn create(&self, folder: &Folder) -> DomainResult<FolderId> {
        let mut state = self.state.lock();
        if state.folders.values().any(|f| f.name == folder.name) {
            return Err(TransitDeskError::Database("unique constraint violation".into()));
        }
        let id = state.id();
        let mut folder = folder.clone();
        folder.id = id;
        state.folders.insert(id, folder);
        Ok(id)
    }

    async fn get(&self, id: FolderId) -> DomainResult<Option<Folder>> {
        Ok(self.state.lock().folders.get(&id).cloned())
    }

    async fn update(&self, folder: &Folder) -> DomainResult<()> {
        let mut state = self.state.lock();
        let slot = state.folders.get_mut(&folder.id).ok_or_else(|| not_found("folder", folder.id))?;
        *slot = folder.clone();
        Ok(())
    }

    async fn set_alert_state(&self, id: FolderId, alert: AlertState) -> DomainResult<()> {
        let mut state = self.state.lock();
        if state.failing_alert_writes.contains(&id) {
            return Err(TransitDeskError::Database("database is locked".into()));
        }
        let folder = state.folders.get_mut(&id).ok_or_else(|| not_found("folder", id))?;
        folder.alert_state = alert;
        Ok(())
    }

    async fn list(&self, query: FolderQuery) -> DomainResult<Vec<Folder>> {
        let state = self.state.lock();
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| query.include_archived || f.active)
            .filter(|f| !query.with_eta_only || f.eta.is_some())
            .filter(|f| query.stage_kind.map_or(true, |kind| f.stage_kind == kind))
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn set_active(&self, id: FolderId, active: bool) -> DomainResult<()> {
        let mut state = self.state.lock();
        let folder = state.folders.get_mut(&id).ok_or_else(|| not_found("folder", id))?;
        folder.active = active;
        Ok(())
    }

    async fn delete(&self, id: FolderId) -> DomainResult<()> {
        let mut state = self.state.lock();
        state.folders.remove(&id).ok_or_else(|| not_found("folder", id))?;
        state.checklist.retain(|t| t.folder_id != id);
        state.activities.retain(|_, a| a.folder_id != id);
        state.folder_lines.retain(|l| l.folder_id != id);
        state.packages.retain(|p| p.folder_id != id);
        state.notes.retain(|(folder_id, _)| *folder_id != id);
        Ok(())
    }

    async fn add_line(&self, line: NewFolderLine) -> DomainResult<FolderLine> {
        let mut state = self.state.lock();
        let id = state.id();
        let line = FolderLine {
            id,
            folder_id: line.folder_id,
            kind: line.kind,
            description: line.description,
            quantity: line.quantity,
            amount: line.amount,
        };
        state.folder_lines.push(line.clone());
        Ok(line)
    }

    async fn lines(
        &self,
        folder_id: FolderId,
        kind: Option<FolderLineKind>,
    ) -> DomainResult<Vec<FolderLine>> {
        let state = self.state.lock();
        Ok(state
            .folder_lines
            .iter()
            .filter(|l| l.folder_id == folder_id && kind.map_or(true, |k| l.kind == k))
            .cloned()
            .collect())
    }

    async fn add_package(&self, package: NewPackageLine) -> DomainResult<PackageLine> {
        let mut state = self.state.lock();
        let id = state.id();
        let package = PackageLine {
            id,
            folder_id: package.folder_id,
            container_number: package.container_number,
            container_type: package.container_type,
            received_on: package.received_on,
            output_on: package.output_on,
            delivered_on: package.delivered_on,
            removed_on: package.removed_on,
            returned_on: package.returned_on,
        };
        state.packages.push(package.clone());
        Ok(package)
    }

    async fn packages(&self, folder_id: FolderId) -> DomainResult<Vec<PackageLine>> {
        let state = self.state.lock();
        Ok(state.packages.iter().filter(|p| p.folder_id == folder_id).cloned().collect())
    }
}

#[async_trait]
impl StageRepository for InMemoryStore {
    async fn get(&self, id: StageId) -> DomainResult<Option<Stage>> {
        Ok(self.state.lock().stages.get(&id).cloned())
    }

    async fn list_for_kind(&self, kind: StageKind) -> DomainResult<Vec<Stage>> {
        let state = self.state.lock();
        let mut stages: Vec<Stage> =
            state.stages.values().filter(|s| s.stage_kind == kind).cloned().collect();
        stages.sort_by_key(|s| (s.number == 0, s.number, s.id));
        Ok(stages)
    }

    async fn claim_number(&self, id: StageId, number: i32) -> DomainResult<i32> {
        let mut state = self.state.lock();
        let stage = state.stages.get_mut(&id).ok_or_else(|| not_found("stage", id))?;
        if stage.number == 0 {
            stage.number = number;
        }
        Ok(stage.number)
    }
}

#[async_trait]
impl ChecklistRepository for InMemoryStore {
    async fn list_for_folder(&self, folder_id: FolderId) -> DomainResult<Vec<ChecklistTask>> {
        Ok(self.checklist_for(folder_id))
    }

    async fn count_for_folder(&self, folder_id: FolderId) -> DomainResult<i64> {
        Ok(self.checklist_for(folder_id).len() as i64)
    }
}

#[async_trait]
impl ActivityPort for InMemoryStore {
    async fn find_type(&self, key: &str) -> DomainResult<Option<ActivityType>> {
        Ok(self.state.lock().activity_types.iter().find(|t| t.key == key).cloned())
    }

    async fn get_type(&self, id: ActivityTypeId) -> DomainResult<Option<ActivityType>> {
        Ok(self.state.lock().activity_types.iter().find(|t| t.id == id).cloned())
    }

    async fn list_types(&self, kind: StageKind) -> DomainResult<Vec<ActivityType>> {
        let state = self.state.lock();
        let mut types: Vec<ActivityType> = state
            .activity_types
            .iter()
            .filter(|t| t.stage_kind == Some(kind))
            .cloned()
            .collect();
        types.sort_by_key(|t| (t.sequence, t.id));
        Ok(types)
    }

    async fn count_types(&self, kind: StageKind) -> DomainResult<i64> {
        Ok(self.list_types(kind).await?.len() as i64)
    }

    async fn schedule(&self, activity: NewActivity) -> DomainResult<Activity> {
        let mut state = self.state.lock();
        let id = state.id();
        let activity = Activity {
            id,
            folder_id: activity.folder_id,
            activity_type_id: activity.activity_type_id,
            summary: activity.summary,
            note: activity.note,
            user_id: activity.user_id,
            due_date: activity.due_date,
            done: false,
        };
        state.activities.insert(id, activity.clone());
        Ok(activity)
    }

    async fn get_activity(&self, id: ActivityId) -> DomainResult<Option<Activity>> {
        Ok(self.state.lock().activities.get(&id).cloned())
    }

    async fn open_activities(&self, folder_id: FolderId) -> DomainResult<Vec<Activity>> {
        let state = self.state.lock();
        Ok(state
            .activities
            .values()
            .filter(|a| a.folder_id == folder_id && !a.done)
            .cloned()
            .collect())
    }

    async fn mark_done(
        &self,
        id: ActivityId,
        completed_on: NaiveDate,
        responsible: Option<String>,
    ) -> DomainResult<ChecklistTask> {
        let mut state = self.state.lock();
        let activity = state.activities.get(&id).cloned().ok_or_else(|| not_found("activity", id))?;
        let type_name = state
            .activity_types
            .iter()
            .find(|t| t.id == activity.activity_type_id)
            .map_or_else(|| activity.summary.clone(), |t| t.name.clone());
        if let Some(stored) = state.activities.get_mut(&id) {
            stored.done = true;
        }
        let task_id = state.id();
        let task = ChecklistTask {
            id: task_id,
            folder_id: activity.folder_id,
            name: type_name,
            responsible,
            date_start: Some(activity.due_date),
            date_validated: Some(completed_on),
        };
        state.checklist.push(task.clone());
        Ok(task)
    }
}

#[async_trait]
impl SequencePort for InMemoryStore {
    async fn next_value(&self, counter: &str) -> DomainResult<i64> {
        let mut state = self.state.lock();
        let value = state.counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[async_trait]
impl MessagingPort for InMemoryStore {
    async fn post_note(&self, folder_id: FolderId, body: &str) -> DomainResult<()> {
        self.state.lock().notes.push((folder_id, body.to_string()));
        Ok(())
    }

    async fn send_mail(
        &self,
        recipients: &[String],
        subject: &str,
        body_html: &str,
    ) -> DomainResult<MailState> {
        let mut state = self.state.lock();
        if state.fail_mail {
            return Err(TransitDeskError::Messaging("smtp relay unreachable".into()));
        }
        state.mails.push(SentMail {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            body_html: body_html.to_string(),
        });
        Ok(if state.queue_mail { MailState::Queued } else { MailState::Sent })
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(self.state.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn members_of_role(&self, role: &str) -> DomainResult<Vec<User>> {
        let state = self.state.lock();
        Ok(state.users.iter().filter(|u| u.roles.iter().any(|r| r == role)).cloned().collect())
    }
}

#[async_trait]
impl AnalyticRepository for InMemoryStore {
    async fn plan_for_kind(&self, kind: StageKind) -> DomainResult<Option<AnalyticPlan>> {
        Ok(self.state.lock().plans.iter().find(|p| p.stage_kind == Some(kind)).cloned())
    }

    async fn create_account(&self, name: &str, plan_id: PlanId) -> DomainResult<LedgerAccount> {
        let mut state = self.state.lock();
        let id = state.id();
        let account = LedgerAccount { id, name: name.to_string(), plan_id };
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> DomainResult<Option<LedgerAccount>> {
        Ok(self.account(id))
    }

    async fn rename_account(&self, id: AccountId, name: &str) -> DomainResult<()> {
        let mut state = self.state.lock();
        let account = state.accounts.get_mut(&id).ok_or_else(|| not_found("account", id))?;
        account.name = name.to_string();
        Ok(())
    }

    async fn lines_for_accounts(
        &self,
        account_ids: &BTreeSet<AccountId>,
    ) -> DomainResult<Vec<AnalyticLine>> {
        let mut state = self.state.lock();
        state.analytic_queries += 1;
        Ok(state
            .analytic_lines
            .iter()
            .filter(|line| line.account_ids.iter().any(|id| account_ids.contains(id)))
            .cloned()
            .collect())
    }

    async fn count_documents(
        &self,
        account_ids: &BTreeSet<AccountId>,
        move_types: &[MoveType],
    ) -> DomainResult<i64> {
        let mut state = self.state.lock();
        state.analytic_queries += 1;
        let ids: BTreeSet<i64> = state
            .documents
            .iter()
            .filter(|(_, move_type, _)| move_types.contains(move_type))
            .filter(|(_, _, accounts)| accounts.iter().any(|id| account_ids.contains(id)))
            .map(|(id, _, _)| *id)
            .collect();
        Ok(ids.len() as i64)
    }
}
