//! Operations behind each screen
//!
//! Services hold a gateway already scoped to the acting user and translate
//! gateway failures into `AseError`: reads become "could not load", writes
//! keep the backend's message.

pub mod ase_service;
pub mod dashboard_service;
pub mod registry_service;
pub mod team_draft;

pub use ase_service::{AseService, EditableAse, FormOptions, ListMode, ShareLink};
pub use dashboard_service::DashboardService;
pub use registry_service::{ImportFailure, ImportReport, RegistryService};
pub use team_draft::TeamDraft;
