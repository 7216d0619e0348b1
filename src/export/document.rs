//! Printable authorization document
//!
//! Rendered as plain text; turning it into PDF is left to the client.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::AseListItem;

pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ExportDocument {
    /// `Content-Disposition` value for a download response
    pub fn disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

pub fn render(item: &AseListItem, generated_at: NaiveDateTime) -> ExportDocument {
    let ase = &item.ase;
    let lines = [
        "ASE FIDEL".to_string(),
        "Autorização de Serviço Extraordinário".to_string(),
        String::new(),
        format!("Nº: {}", ase.number),
        format!("Status: {}", ase.status),
        format!("Data: {}", ase.date.format("%d/%m/%Y")),
        format!("Setor: {}", or_dash(item.sector_name.as_deref())),
        format!(
            "Início: {}   Fim: {}",
            ase.start_time.format("%H:%M"),
            ase.end_time.format("%H:%M")
        ),
        format!("Solicitante: {}", or_dash(item.requester_email.as_deref())),
        format!("Gerente: {}", or_dash(item.manager_name.as_deref())),
        format!("Equipe: {} colaborador(es)", item.team_size),
        String::new(),
        "Justificativa:".to_string(),
        or_dash(Some(ase.justification.as_str())).to_string(),
        String::new(),
        format!(
            "Gerado em {} - HC Engenharia",
            generated_at.format("%d/%m/%Y %H:%M")
        ),
    ];

    ExportDocument {
        file_name: format!("{}.txt", ase.number),
        content_type: CONTENT_TYPE,
        body: lines.join("\n") + "\n",
    }
}
