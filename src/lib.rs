//! ASE Fidel - extraordinary service authorization (overtime work order) admin
//!
//! Users sign in, fill an authorization form (date and time window, sector,
//! approving manager, discipline, team), save it as a draft or submit it for
//! approval, and follow it through the status lifecycle. A dashboard sums
//! counts and man-hours; the personnel registry (Efetivo) is fed from
//! spreadsheet imports.
//!
//! ## Layers
//! - `rules`: man-hours, status lifecycle, role policy, dashboard totals (pure)
//! - `gateway`: typed access to the hosted backend's collections
//! - `session`: identity provider and per-user session context
//! - `services`: operations behind each screen
//! - `api`: HTTP routes for the browser front end (feature `server`)
//!
//! ## Quick Start
//!
//! ```rust
//! use ase_fidel::rules::{format_hours, man_hours_decimal};
//! use chrono::NaiveTime;
//!
//! let start = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
//! let end = NaiveTime::from_hms_opt(19, 30, 0).unwrap();
//! assert_eq!(format_hours(man_hours_decimal(start, end, 4)), "10.0");
//! ```

// Core error handling
pub mod error;

pub mod config;
pub mod models;

// Business rules
pub mod rules;

// Backend access and identity
pub mod gateway;
pub mod session;

pub mod services;

// Spreadsheet import, document export and share links
pub mod export;
pub mod import;

// REST API (when enabled)
#[cfg(feature = "server")]
pub mod api;

pub use config::AppConfig;
pub use error::{AseError, AseResult};
pub use gateway::{AseGateway, GatewayProvider, InMemoryGateway, RestGateway};
pub use session::{HostedIdentity, IdentityProvider, InMemoryIdentity, SessionContext};
