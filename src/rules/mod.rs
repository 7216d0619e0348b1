//! Business rules: man-hours, status lifecycle, role policy, dashboard totals.
//!
//! Everything here is pure; the services call these before and after
//! talking to the gateway.

pub mod dashboard;
pub mod lifecycle;
pub mod man_hours;
pub mod policy;

pub use dashboard::{DashboardStats, MonthlyHh};
pub use lifecycle::{build_payload, ensure_editable, ensure_requester, validate_submission, SubmitAction};
pub use man_hours::{duration_hours, format_hours, man_hours, man_hours_decimal, HhSummary};
pub use policy::{authorize, is_visible, visible_menu, MenuItem, VIEW_ALL_ASES, VIEW_LOGS};
