//! Domain constants
//!
//! Stage numbers, counter names and activity template keys shared by the
//! business logic and the adapters.

// Alert window
pub const DANGER_WINDOW_DAYS: i64 = 3;

// Stage numbers with special meaning
pub const VALIDATION_STAGE_NUMBER: i32 = 104;
pub const GATED_STAGE_NUMBERS: [i32; 2] = [105, 106];
/// Unassigned stage position.
pub const UNASSIGNED_STAGE_NUMBER: i32 = 0;
/// Positions handed out to unnumbered stages start above this value.
pub const STAGE_POSITION_BASE: i32 = 50;

// Folder naming
pub const PLACEHOLDER_FOLDER_NAME: &str = "New";
pub const TRANSIT_CASE_COUNTER: &str = "transit.invoice";
pub const ACCONAGE_CASE_COUNTER: &str = "transit.acconage";
pub const SHIPPING_CASE_COUNTER: &str = "transit.shipping";
pub const STAGE_POSITION_COUNTER_PREFIX: &str = "stage.position";
pub const CASE_NUMBER_WIDTH: usize = 5;

// Activity templates
pub const ACTIVITY_ORDER_RECEIVED: &str = "order_received";
pub const ACTIVITY_FOLDER_OPENED: &str = "folder_opened";
pub const ACTIVITY_SHIPPING_START: &str = "shipping_start";
pub const ACTIVITY_ALERT_DANGER: &str = "alert_danger";
pub const ACTIVITY_ALERT_OVERDUE: &str = "alert_overdue";
/// Days between the open date and the due date of a planned activity.
pub const NEXT_ACTIVITY_DELAY_DAYS: i64 = 2;

// Analytic distribution
pub const FULL_DISTRIBUTION_WEIGHT: f64 = 100.0;

// Containers
pub const MAX_CONTAINER_NUMBER_LENGTH: usize = 11;

// Alert report placeholders
pub const REPORT_MISSING_VALUE: &str = "N/A";
pub const REPORT_UNASSIGNED_OWNER: &str = "Unassigned";
pub const DEFAULT_MANAGER_ROLE: &str = "transit_manager";
