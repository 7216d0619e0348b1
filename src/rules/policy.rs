//! Role-based visibility policy.
//!
//! One predicate decides every visibility question: the navigation menu and
//! the API both go through `is_visible`.

use serde::Serialize;

use crate::error::AseError;
use crate::models::Role;

/// Roles that may see every requester's authorizations
pub const VIEW_ALL_ASES: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::Gerente];

/// Roles that may see the audit log screen
pub const VIEW_LOGS: &[Role] = &[Role::SuperAdmin, Role::Admin];

/// An absent or empty list means unrestricted.
pub fn is_visible(role: Role, allowed: Option<&[Role]>) -> bool {
    match allowed {
        None => true,
        Some(roles) => roles.is_empty() || roles.contains(&role),
    }
}

/// Same predicate for callers that may not have a profile yet: unrestricted
/// items stay visible, restricted ones need a role.
pub fn is_visible_to(role: Option<Role>, allowed: Option<&[Role]>) -> bool {
    match role {
        Some(role) => is_visible(role, allowed),
        None => allowed.map_or(true, <[Role]>::is_empty),
    }
}

/// Enforcement-point form of `is_visible`
pub fn authorize(role: Role, allowed: &[Role], action: &str) -> Result<(), AseError> {
    if is_visible(role, Some(allowed)) {
        Ok(())
    } else {
        Err(AseError::Forbidden {
            role: role.to_string(),
            action: action.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuLink {
    pub label: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub label: &'static str,
    pub path: &'static str,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<&'static [Role]>,
    #[serde(skip_serializing_if = "<[MenuLink]>::is_empty")]
    pub children: &'static [MenuLink],
}

const fn item(
    label: &'static str,
    path: &'static str,
    icon: &'static str,
    roles: Option<&'static [Role]>,
) -> MenuItem {
    MenuItem {
        label,
        path,
        icon,
        roles,
        children: &[],
    }
}

const CADASTROS: &[MenuLink] = &[
    MenuLink { label: "Efetivo", path: "/cadastros/efetivo" },
    MenuLink { label: "Pessoas", path: "/cadastros/pessoas" },
    MenuLink { label: "Setores", path: "/cadastros/setores" },
    MenuLink { label: "Disciplinas", path: "/cadastros/disciplinas" },
    MenuLink { label: "Destinatários", path: "/cadastros/destinatarios" },
];

static MENU: [MenuItem; 7] = [
    item("Dashboard", "/", "layout-dashboard", None),
    item("Novo ASE", "/ase/new", "plus-circle", None),
    item("Minhas ASE", "/ase/my", "file-text", None),
    item("Todas ASE", "/ase/all", "file-text", Some(VIEW_ALL_ASES)),
    MenuItem {
        label: "Cadastros",
        path: "/cadastros",
        icon: "users",
        roles: None,
        children: CADASTROS,
    },
    item("Relatórios", "/relatorios", "bar-chart-3", None),
    item("Logs", "/logs", "history", Some(VIEW_LOGS)),
];

/// Full navigation menu, before filtering
pub fn menu() -> &'static [MenuItem] {
    &MENU
}

/// Menu entries the given role may see, in menu order
pub fn visible_menu(role: Option<Role>) -> Vec<&'static MenuItem> {
    MENU.iter()
        .filter(|entry| is_visible_to(role, entry.roles))
        .collect()
}
