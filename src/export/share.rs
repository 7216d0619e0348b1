//! Prefilled messaging share link

use crate::models::AseListItem;

const WHATSAPP_BASE: &str = "https://wa.me/?text=";

/// Deep link into the front end for one authorization
pub fn deep_link(origin: &str, item: &AseListItem) -> String {
    format!("{}/#/ase/{}", origin.trim_end_matches('/'), item.ase.id)
}

pub fn share_text(origin: &str, item: &AseListItem) -> String {
    format!(
        "*ASE Fidel - HC Engenharia*\n*Nº:* {}\n*Status:* {}\n*Data:* {}\n*Setor:* {}\n*Link:* {}",
        item.ase.number,
        item.ase.status,
        item.ase.date.format("%d/%m/%Y"),
        item.sector_name.as_deref().unwrap_or("-"),
        deep_link(origin, item)
    )
}

pub fn whatsapp_url(origin: &str, item: &AseListItem) -> String {
    format!(
        "{}{}",
        WHATSAPP_BASE,
        urlencoding::encode(&share_text(origin, item))
    )
}
