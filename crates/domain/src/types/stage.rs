//! Stage definitions.

use serde::{Deserialize, Serialize};

use super::{StageId, StageKind};
use crate::constants::{GATED_STAGE_NUMBERS, UNASSIGNED_STAGE_NUMBER};

/// Ordered step of a folder's workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    /// Position within the kind; zero until assigned.
    pub number: i32,
    pub stage_kind: StageKind,
}

impl Stage {
    pub const fn is_numbered(&self) -> bool {
        self.number != UNASSIGNED_STAGE_NUMBER
    }

    /// Stages that require a planned and fully completed checklist.
    pub fn is_gated(&self) -> bool {
        GATED_STAGE_NUMBERS.contains(&self.number)
    }
}
