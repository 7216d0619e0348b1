//! Document export and share links

pub mod document;
pub mod share;

pub use document::{render, ExportDocument};
pub use share::{deep_link, share_text, whatsapp_url};
