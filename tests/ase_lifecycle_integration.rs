//! Authorization form, list and dashboard flows against the in-memory backend
//!
//! Run with: cargo test --test ase_lifecycle_integration

mod helpers;

use std::sync::Arc;

use rust_decimal::Decimal;

use ase_fidel::error::{AseError, ValidationError};
use ase_fidel::models::{AseStatus, Role};
use ase_fidel::rules::SubmitAction;
use ase_fidel::services::{AseService, DashboardService, ListMode, TeamDraft};
use ase_fidel::gateway::collections;
use ase_fidel::models::AseQuery;
use ase_fidel::AseGateway;

use helpers::{time, Fixture};

fn service(fx: &Fixture) -> AseService {
    AseService::new(Arc::new(fx.gateway.clone()) as Arc<dyn AseGateway>)
}

#[tokio::test]
async fn submit_without_requester_creates_nothing() {
    let fx = Fixture::new().await;
    let result = service(&fx)
        .submit(
            None,
            None,
            &fx.complete_form(),
            &fx.team(&[0]),
            SubmitAction::SubmitForApproval,
        )
        .await;

    assert!(matches!(
        result,
        Err(AseError::Validation(ValidationError::MissingRequester))
    ));
    assert_eq!(fx.gateway.ase_count().await, 0);
}

#[tokio::test]
async fn submit_for_approval_creates_pending_with_team() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;

    let saved = service(&fx)
        .submit(
            ctx.requester(),
            None,
            &fx.complete_form(),
            &fx.team(&[0, 1]),
            SubmitAction::SubmitForApproval,
        )
        .await
        .unwrap();

    assert_eq!(saved.status, AseStatus::Pending);
    assert_eq!(saved.requester_user_id, ctx.user().id);
    assert!(saved.number.starts_with("ASE-2026-"));
    assert_eq!(fx.gateway.team_of(saved.id).await.len(), 2);
}

#[tokio::test]
async fn draft_may_be_incomplete_but_approval_may_not() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let mut form = fx.complete_form();
    form.start_time = time(20, 0);
    form.end_time = time(18, 0);
    form.justification = "   ".into();

    let draft = service(&fx)
        .submit(ctx.requester(), None, &form, &[], SubmitAction::SaveDraft)
        .await
        .unwrap();
    assert_eq!(draft.status, AseStatus::Draft);

    let err = service(&fx)
        .submit(
            ctx.requester(),
            Some(draft.id),
            &form,
            &[],
            SubmitAction::SubmitForApproval,
        )
        .await
        .unwrap_err();
    match err {
        AseError::Validation(ValidationError::Multiple(problems)) => {
            assert!(problems.contains(&ValidationError::EmptyTeam));
            assert!(problems
                .iter()
                .any(|p| matches!(p, ValidationError::InvalidTimeWindow { .. })));
            assert!(problems.contains(&ValidationError::MissingField {
                field: "justification"
            }));
        }
        other => panic!("expected validation problems, got {other:?}"),
    }
}

#[tokio::test]
async fn editing_replaces_the_whole_team() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let svc = service(&fx);
    let form = fx.complete_form();

    let saved = svc
        .submit(ctx.requester(), None, &form, &fx.team(&[0, 1]), SubmitAction::SaveDraft)
        .await
        .unwrap();
    svc.submit(
        ctx.requester(),
        Some(saved.id),
        &form,
        &fx.team(&[1, 2]),
        SubmitAction::SubmitForApproval,
    )
    .await
    .unwrap();

    let mut ids: Vec<_> = fx
        .gateway
        .team_of(saved.id)
        .await
        .into_iter()
        .map(|m| m.employee_id)
        .collect();
    ids.sort();
    let mut expected = vec![fx.employees[1].id, fx.employees[2].id];
    expected.sort();
    assert_eq!(ids, expected);

    let editable = svc.load_for_edit(saved.id).await.unwrap();
    assert_eq!(editable.ase.status, AseStatus::Pending);
    assert_eq!(editable.team.len(), 2);
    assert_eq!(editable.subdisciplines, vec![fx.subdiscipline.clone()]);
    assert_eq!(editable.hh.display, "4.0");
}

#[tokio::test]
async fn duplicate_team_members_are_saved_once() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let saved = service(&fx)
        .submit(
            ctx.requester(),
            None,
            &fx.complete_form(),
            &fx.team(&[0, 0, 1]),
            SubmitAction::SaveDraft,
        )
        .await
        .unwrap();
    assert_eq!(fx.gateway.team_of(saved.id).await.len(), 2);
}

#[tokio::test]
async fn write_failure_surfaces_backend_text() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    fx.gateway
        .fail_writes(Some("new row violates row-level security policy"))
        .await;

    let err = service(&fx)
        .submit(
            ctx.requester(),
            None,
            &fx.complete_form(),
            &fx.team(&[0]),
            SubmitAction::SaveDraft,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "new row violates row-level security policy"
    );
}

#[tokio::test]
async fn failed_team_write_never_leaves_a_pending_record_without_team() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let svc = service(&fx);
    fx.gateway
        .fail_writes_to(collections::ASE_TEAM, "insert on ase_team violates foreign key")
        .await;

    let err = svc
        .submit(
            ctx.requester(),
            None,
            &fx.complete_form(),
            &fx.team(&[0]),
            SubmitAction::SubmitForApproval,
        )
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "insert on ase_team violates foreign key");

    let stored = fx.gateway.list_ases(&AseQuery::all()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ase.status, AseStatus::Draft);
    assert_eq!(stored[0].team_size, 0);
}

#[tokio::test]
async fn failed_team_write_keeps_existing_record_unchanged() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let svc = service(&fx);
    let form = fx.complete_form();
    let saved = svc
        .submit(
            ctx.requester(),
            None,
            &form,
            &fx.team(&[0, 1]),
            SubmitAction::SubmitForApproval,
        )
        .await
        .unwrap();

    fx.gateway
        .fail_writes_to(collections::ASE_TEAM, "ase_team unavailable")
        .await;
    let mut edited = form.clone();
    edited.end_time = time(21, 0);
    assert!(svc
        .submit(
            ctx.requester(),
            Some(saved.id),
            &edited,
            &fx.team(&[2]),
            SubmitAction::SubmitForApproval,
        )
        .await
        .is_err());

    let editable = svc.load_for_edit(saved.id).await.unwrap();
    assert_eq!(editable.ase.status, AseStatus::Pending);
    assert_eq!(editable.ase.end_time, form.end_time);
    assert_eq!(editable.team.len(), 2);
}

#[tokio::test]
async fn list_modes_respect_requester_and_role() {
    let fx = Fixture::new().await;
    let ana = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let carlos = fx.sign_in("carlos@hc.eng.br", Role::Gerente).await;
    let svc = service(&fx);
    let form = fx.complete_form();

    svc.submit(ana.requester(), None, &form, &fx.team(&[0]), SubmitAction::SaveDraft)
        .await
        .unwrap();
    let latest = svc
        .submit(carlos.requester(), None, &form, &fx.team(&[1, 2]), SubmitAction::SaveDraft)
        .await
        .unwrap();

    let mine = svc.list(&ana, ListMode::My, None).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].requester_email.as_deref(), Some("ana@hc.eng.br"));
    assert_eq!(mine[0].sector_name.as_deref(), Some("Manutenção"));
    assert_eq!(mine[0].manager_name.as_deref(), Some("Carlos Lima"));

    let all = svc.list(&carlos, ListMode::All, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].ase.id, latest.id);
    assert_eq!(all[0].team_size, 2);

    let denied = svc.list(&ana, ListMode::All, None).await.unwrap_err();
    assert!(matches!(denied, AseError::Forbidden { .. }));

    let by_sector = svc.list(&carlos, ListMode::All, Some("MANUT")).await.unwrap();
    assert_eq!(by_sector.len(), 2);
    let none = svc.list(&carlos, ListMode::All, Some("elétrica")).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn approved_records_are_locked_and_counted() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let svc = service(&fx);
    let form = fx.complete_form();

    let saved = svc
        .submit(ctx.requester(), None, &form, &fx.team(&[0, 1, 2]), SubmitAction::SubmitForApproval)
        .await
        .unwrap();
    fx.gateway.set_status(saved.id, AseStatus::Approved).await;

    let err = svc
        .submit(ctx.requester(), Some(saved.id), &form, &fx.team(&[0]), SubmitAction::SaveDraft)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AseError::Validation(ValidationError::NotEditable { .. })
    ));
    assert_eq!(fx.gateway.team_of(saved.id).await.len(), 3);

    svc.submit(ctx.requester(), None, &form, &fx.team(&[0]), SubmitAction::SubmitForApproval)
        .await
        .unwrap();

    let stats = DashboardService::new(Arc::new(fx.gateway.clone()))
        .stats()
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.total_hh, Decimal::new(60, 1));
    assert_eq!(stats.monthly_hh.len(), 1);
    assert_eq!(stats.monthly_hh[0].label, "Abr");
}

#[tokio::test]
async fn form_options_split_people_by_type() {
    let fx = Fixture::new().await;
    let options = service(&fx).form_options().await.unwrap();
    assert_eq!(options.managers, vec![fx.manager.clone()]);
    assert_eq!(options.supervisors, vec![fx.supervisor.clone()]);
    assert_eq!(options.foremen.len(), 1);
    assert_eq!(options.sectors[0].name, "Elétrica");
    assert_eq!(options.employees.len(), 3);

    let mut draft = TeamDraft::new();
    let roster: Vec<_> = options.employees.iter().map(|e| e.employee.clone()).collect();
    assert!(draft.add(&roster[0]));
    assert_eq!(draft.available(&roster, "100").len(), 2);
}

#[tokio::test]
async fn export_and_share_use_resolved_names() {
    let fx = Fixture::new().await;
    let ctx = fx.sign_in("ana@hc.eng.br", Role::Supervisor).await;
    let svc = service(&fx);
    let saved = svc
        .submit(ctx.requester(), None, &fx.complete_form(), &fx.team(&[0]), SubmitAction::SaveDraft)
        .await
        .unwrap();

    let generated = chrono::NaiveDate::from_ymd_opt(2026, 4, 11)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let doc = svc.export(saved.id, generated).await.unwrap();
    assert_eq!(doc.file_name, format!("{}.txt", saved.number));
    assert!(doc.body.contains("Setor: Manutenção"));
    assert!(doc.body.contains("Solicitante: ana@hc.eng.br"));

    let link = svc.share(saved.id, "https://ase.hc.eng.br").await.unwrap();
    assert_eq!(link.deep_link, format!("https://ase.hc.eng.br/#/ase/{}", saved.id));
    assert!(link.url.starts_with("https://wa.me/?text="));

    let missing = svc.detail(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, AseError::NotFound { .. }));
}
