//! Status-lifecycle guard and submission validation.
//!
//! Only the two user-triggered entry transitions live here: save-as-draft
//! (→ RASCUNHO) and submit-for-approval (→ PENDENTE). Approval, rejection and
//! hand-off to HR are performed outside this application.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{AseForm, AsePayload, AseStatus, Profile};

/// User action that saves the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitAction {
    SaveDraft,
    SubmitForApproval,
}

impl SubmitAction {
    pub fn target_status(&self) -> AseStatus {
        match self {
            SubmitAction::SaveDraft => AseStatus::Draft,
            SubmitAction::SubmitForApproval => AseStatus::Pending,
        }
    }
}

/// Any save needs a requester; no identity, no record.
pub fn ensure_requester(profile: Option<&Profile>) -> Result<Uuid, ValidationError> {
    profile
        .map(|p| p.id)
        .ok_or(ValidationError::MissingRequester)
}

/// Existing records can only be rewritten while still in an early state.
pub fn ensure_editable(current: AseStatus) -> Result<(), ValidationError> {
    if current.is_editable() {
        Ok(())
    } else {
        Err(ValidationError::NotEditable {
            status: current.to_string(),
        })
    }
}

/// Check the form for `action`, collecting every problem.
///
/// Drafts only need the references a stored record cannot lack. Submitting
/// for approval also needs a positive window, a team and a justification.
pub fn validate_submission(
    form: &AseForm,
    team_size: usize,
    action: SubmitAction,
) -> Result<(), ValidationError> {
    let mut problems = Vec::new();

    let required = [
        ("sector_id", form.sector_id),
        ("manager_id", form.manager_id),
        ("discipline_id", form.discipline_id),
        ("subdiscipline_id", form.subdiscipline_id),
    ];
    for (field, value) in required {
        if value.is_none() {
            problems.push(ValidationError::MissingField { field });
        }
    }

    if action == SubmitAction::SubmitForApproval {
        if form.end_time <= form.start_time {
            problems.push(ValidationError::InvalidTimeWindow {
                start: form.start_time.format("%H:%M").to_string(),
                end: form.end_time.format("%H:%M").to_string(),
            });
        }
        if team_size == 0 {
            problems.push(ValidationError::EmptyTeam);
        }
        if form.justification.trim().is_empty() {
            problems.push(ValidationError::MissingField {
                field: "justification",
            });
        }
    }

    ValidationError::from_list(problems)
}

/// Validate and assemble the write payload for the `ase` collection.
pub fn build_payload(
    form: &AseForm,
    team_size: usize,
    requester: Option<&Profile>,
    action: SubmitAction,
) -> Result<AsePayload, ValidationError> {
    let requester_user_id = ensure_requester(requester)?;
    validate_submission(form, team_size, action)?;

    let missing = |field: &'static str| ValidationError::MissingField { field };
    Ok(AsePayload {
        date: form.date,
        start_time: form.start_time,
        end_time: form.end_time,
        sector_id: form.sector_id.ok_or_else(|| missing("sector_id"))?,
        manager_id: form.manager_id.ok_or_else(|| missing("manager_id"))?,
        supervisor_id: form.supervisor_id,
        encarregado_id: form.encarregado_id,
        discipline_id: form.discipline_id.ok_or_else(|| missing("discipline_id"))?,
        subdiscipline_id: form
            .subdiscipline_id
            .ok_or_else(|| missing("subdiscipline_id"))?,
        justification: form.justification.trim().to_string(),
        status: action.target_status(),
        requester_user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{NaiveDate, NaiveTime};

    fn complete_form() -> AseForm {
        let mut form = AseForm::blank(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        form.sector_id = Some(Uuid::new_v4());
        form.manager_id = Some(Uuid::new_v4());
        form.discipline_id = Some(Uuid::new_v4());
        form.subdiscipline_id = Some(Uuid::new_v4());
        form.justification = "Parada programada da caldeira".into();
        form
    }

    fn requester() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "solicitante@hc.eng.br".into(),
            role: Role::Supervisor,
        }
    }

    #[test]
    fn test_target_statuses() {
        assert_eq!(SubmitAction::SaveDraft.target_status(), AseStatus::Draft);
        assert_eq!(
            SubmitAction::SubmitForApproval.target_status(),
            AseStatus::Pending
        );
    }

    #[test]
    fn test_missing_requester_rejected() {
        let err = build_payload(&complete_form(), 2, None, SubmitAction::SaveDraft).unwrap_err();
        assert_eq!(err, ValidationError::MissingRequester);
    }

    #[test]
    fn test_draft_allows_empty_team_and_inverted_window() {
        let mut form = complete_form();
        form.start_time = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        form.end_time = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        form.justification.clear();
        let profile = requester();
        let payload = build_payload(&form, 0, Some(&profile), SubmitAction::SaveDraft).unwrap();
        assert_eq!(payload.status, AseStatus::Draft);
        assert_eq!(payload.requester_user_id, profile.id);
    }

    #[test]
    fn test_submit_requires_team_window_and_justification() {
        let mut form = complete_form();
        form.end_time = form.start_time;
        form.justification = "   ".into();
        let err = validate_submission(&form, 0, SubmitAction::SubmitForApproval).unwrap_err();
        match err {
            ValidationError::Multiple(problems) => {
                assert_eq!(problems.len(), 3);
                assert!(problems.contains(&ValidationError::EmptyTeam));
            }
            other => panic!("Expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn test_drafts_still_need_references() {
        let mut form = complete_form();
        form.manager_id = None;
        assert_eq!(
            validate_submission(&form, 1, SubmitAction::SaveDraft),
            Err(ValidationError::MissingField { field: "manager_id" })
        );
    }

    #[test]
    fn test_editable_states() {
        assert!(ensure_editable(AseStatus::Draft).is_ok());
        assert!(ensure_editable(AseStatus::Pending).is_ok());
        for status in [
            AseStatus::Approved,
            AseStatus::Rejected,
            AseStatus::SentToHr,
            AseStatus::Completed,
        ] {
            assert!(ensure_editable(status).is_err(), "{status} should be locked");
        }
    }
}
