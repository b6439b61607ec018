//! Shared fixtures for infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;
use transitdesk_domain::{Stage, StageKind, User};
use transitdesk_infra::database::{
    DbManager, NewActivityType, SqlCipherActivityRepository, SqlCipherAnalyticRepository,
    SqlCipherChecklistRepository, SqlCipherFolderRepository, SqlCipherMessageRepository,
    SqlCipherSequenceRepository, SqlCipherStageRepository, SqlCipherUserDirectory,
};

pub const TEST_DB_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// Temporary migrated database that lives as long as the harness.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db_path = temp_dir.path().join("transitdesk-test.db");

        let manager = Arc::new(
            DbManager::new(&db_path, 4, Some(TEST_DB_KEY))
                .expect("database manager should initialise"),
        );
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager, _temp_dir: temp_dir }
    }

    pub fn folders(&self) -> SqlCipherFolderRepository {
        SqlCipherFolderRepository::new(Arc::clone(&self.manager))
    }

    pub fn stages(&self) -> SqlCipherStageRepository {
        SqlCipherStageRepository::new(Arc::clone(&self.manager))
    }

    pub fn checklist(&self) -> SqlCipherChecklistRepository {
        SqlCipherChecklistRepository::new(Arc::clone(&self.manager))
    }

    pub fn activities(&self) -> SqlCipherActivityRepository {
        SqlCipherActivityRepository::new(Arc::clone(&self.manager))
    }

    pub fn analytic(&self) -> SqlCipherAnalyticRepository {
        SqlCipherAnalyticRepository::new(Arc::clone(&self.manager))
    }

    pub fn sequences(&self) -> SqlCipherSequenceRepository {
        SqlCipherSequenceRepository::new(Arc::clone(&self.manager))
    }

    pub fn users(&self) -> SqlCipherUserDirectory {
        SqlCipherUserDirectory::new(Arc::clone(&self.manager))
    }

    pub fn messages(&self) -> SqlCipherMessageRepository {
        SqlCipherMessageRepository::new(Arc::clone(&self.manager))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn activity_type(key: &str, name: &str, kind: Option<StageKind>, sequence: i32) -> NewActivityType {
    NewActivityType {
        key: key.to_string(),
        name: name.to_string(),
        stage_kind: kind,
        sequence,
        responsible_user_id: None,
        stage_id: None,
    }
}

/// Reference data for transit folders: stages, activity templates, the
/// analytic plan and one operator.
pub struct TransitSeed {
    pub draft: Stage,
    pub validation: Stage,
    pub in_progress: Stage,
    pub operator: User,
    pub manager: User,
}

pub async fn seed_transit(db: &TestDatabase) -> TransitSeed {
    let stages = db.stages();
    let draft = stages.insert("Draft", 10, StageKind::Transit).await.expect("draft stage");
    let validation =
        stages.insert("Validation", 104, StageKind::Transit).await.expect("validation stage");
    let in_progress =
        stages.insert("In progress", 0, StageKind::Transit).await.expect("unnumbered stage");

    let activities = db.activities();
    for (index, (key, name)) in [
        ("order_received", "Order received"),
        ("folder_opened", "Folder opened"),
        ("declaration_filed", "Declaration filed"),
        ("goods_released", "Goods released"),
    ]
    .into_iter()
    .enumerate()
    {
        let sequence = i32::try_from(index).expect("small index") * 10;
        activities
            .insert_type(activity_type(key, name, Some(StageKind::Transit), sequence))
            .await
            .expect("activity type");
    }
    for (key, name) in [("alert_danger", "ETA alert"), ("alert_overdue", "ETA overdue")] {
        activities.insert_type(activity_type(key, name, None, 100)).await.expect("alert type");
    }

    db.analytic().insert_plan("Transit", Some(StageKind::Transit)).await.expect("plan");

    let users = db.users();
    let operator =
        users.insert("Awa Diop", Some("awa@example.com"), &["operator"]).await.expect("operator");
    let manager = users
        .insert("Moussa Ba", Some("moussa@example.com"), &["transit_manager"])
        .await
        .expect("manager");

    TransitSeed { draft, validation, in_progress, operator, manager }
}
