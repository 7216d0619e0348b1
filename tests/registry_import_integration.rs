//! Personnel registry import against the in-memory backend
//!
//! Run with: cargo test --test registry_import_integration

mod helpers;

use std::sync::Arc;

use serde_json::{json, Map, Value};

use ase_fidel::import::{self, ImportRow};
use ase_fidel::services::RegistryService;

use helpers::Fixture;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[tokio::test]
async fn only_rows_with_matricula_and_name_are_imported() {
    let fx = Fixture::new().await;
    let registry = RegistryService::new(Arc::new(fx.gateway.clone()));

    let rows = import::from_json_rows(&[
        object(json!({ "matricula": "", "nome": "João" })),
        object(json!({
            "matricula": "123",
            "nome": "João",
            "funcao": "Eletricista",
            "setor": "Manutenção"
        })),
    ]);
    assert_eq!(rows.len(), 1);

    let report = registry.confirm_import(&rows).await.unwrap();
    assert_eq!(report.imported, 1);
    assert!(report.failed.is_empty());

    let joao = registry.list_employees(Some("123")).await.unwrap();
    assert_eq!(joao.len(), 1);
    assert_eq!(joao[0].employee.name, "João");
    assert_eq!(joao[0].employee.sector_id, Some(fx.sector.id));
    assert_eq!(joao[0].sector_name.as_deref(), Some("Manutenção"));
}

#[tokio::test]
async fn import_upserts_on_matricula_and_leaves_unknown_sector_empty() {
    let fx = Fixture::new().await;
    let registry = RegistryService::new(Arc::new(fx.gateway.clone()));

    let csv = "Matricula;Nome;Cargo;Setor\n1002;Bruno Dias Filho;Supervisor;Almoxarifado\n2001;Davi Lopes;Pintor;ELÉTRICA\n";
    let rows = registry.preview_import(csv).unwrap();
    assert_eq!(rows.len(), 2);

    let report = registry.confirm_import(&rows).await.unwrap();
    assert_eq!(report.imported, 2);

    let all = registry.list_employees(None).await.unwrap();
    assert_eq!(all.len(), 4);

    let bruno = registry.list_employees(Some("1002")).await.unwrap();
    assert_eq!(bruno[0].employee.name, "Bruno Dias Filho");
    assert_eq!(bruno[0].employee.function.as_deref(), Some("Supervisor"));
    assert_eq!(bruno[0].employee.sector_id, None);

    let davi = registry.list_employees(Some("davi")).await.unwrap();
    assert_eq!(davi[0].sector_name.as_deref(), Some("Elétrica"));
}

#[tokio::test]
async fn failed_rows_are_reported_and_import_continues() {
    let fx = Fixture::new().await;
    let registry = RegistryService::new(Arc::new(fx.gateway.clone()));
    fx.gateway.fail_writes(Some("permission denied for table employees")).await;

    let rows = vec![
        ImportRow {
            matricula: "9001".into(),
            name: "Eva Prado".into(),
            function: String::new(),
            sector_name: String::new(),
            email: None,
        },
        ImportRow {
            matricula: "9002".into(),
            name: "Fábio Reis".into(),
            function: String::new(),
            sector_name: String::new(),
            email: None,
        },
    ];
    let report = registry.confirm_import(&rows).await.unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[1].matricula, "9002");
    assert_eq!(report.failed[0].message, "permission denied for table employees");
}
