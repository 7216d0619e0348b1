//! Typed records for every collection the application touches.
//!
//! Records are parsed at the gateway boundary; a row that does not match its
//! shape is an error there, never an untyped value passed further in.

pub mod ase;
pub mod employee;
pub mod reference;
pub mod role;
pub mod status;

pub use ase::{
    Ase, AseForm, AseListItem, AsePayload, AseQuery, AseStatRow, AseWithTeam, TeamSnapshot,
};
pub use employee::{Employee, EmployeeListItem, EmployeeUpsert};
pub use reference::{Discipline, Person, Profile, Sector, Subdiscipline};
pub use role::{PersonType, Role};
pub use status::{status_badge, AseStatus, StatusBadge, StatusIcon};

/// Serde adapter for wall-clock times.
///
/// Accepts `HH:MM` (form input) and `HH:MM:SS` (store output); always writes `HH:MM`.
pub mod wall_time {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| D::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_both_forms() {
            let hm = parse("17:00").unwrap();
            let hms = parse("17:00:00").unwrap();
            assert_eq!(hm, hms);
            assert_eq!(parse("07:30:15.5").unwrap().format("%H:%M").to_string(), "07:30");
            assert!(parse("25:00").is_err());
        }
    }
}
