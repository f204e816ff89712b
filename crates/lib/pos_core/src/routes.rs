//! Dashboard pages, their access requirements, and the role-filtered sidebar.

use crate::models::Role;

pub const HOME: &str = "/";
pub const LOGIN: &str = "/auth/login";
pub const DASHBOARD: &str = "/dashboard";

const ADMINS: &[Role] = &[Role::Admin, Role::Superadmin];
const SUPERADMINS: &[Role] = &[Role::Superadmin];

/// Gates a page mounts behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// No gate.
    Public,
    /// RequireAuth only.
    Authenticated,
    /// RequireAuth and RequireRole with the listed roles.
    Roles(&'static [Role]),
}

/// A dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub path: &'static str,
    pub requirement: Requirement,
}

const fn page(path: &'static str, requirement: Requirement) -> Page {
    Page { path, requirement }
}

/// Every routable page. `/` only forwards through the home redirect.
pub const PAGES: &[Page] = &[
    page(HOME, Requirement::Public),
    page(LOGIN, Requirement::Public),
    page(DASHBOARD, Requirement::Authenticated),
    page("/products", Requirement::Authenticated),
    page("/categories", Requirement::Authenticated),
    page("/checkout", Requirement::Authenticated),
    page("/orders", Requirement::Authenticated),
    page("/admin/users", Requirement::Roles(ADMINS)),
    page("/analytics", Requirement::Roles(ADMINS)),
    page("/stock", Requirement::Roles(ADMINS)),
    page("/admin/stores", Requirement::Roles(SUPERADMINS)),
    page("/admin/audit-logs", Requirement::Roles(SUPERADMINS)),
    page("/admin/roles", Requirement::Roles(SUPERADMINS)),
];

/// Requirement of a known page. Trailing slashes are ignored.
pub fn requirement_for(path: &str) -> Option<Requirement> {
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() { HOME } else { trimmed };
    PAGES
        .iter()
        .find(|page| page.path == path)
        .map(|page| page.requirement)
}

/// Sidebar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    /// `None` means visible to everyone signed in.
    pub roles: Option<&'static [Role]>,
}

const fn nav_item(
    label: &'static str,
    href: &'static str,
    roles: Option<&'static [Role]>,
) -> NavItem {
    NavItem { label, href, roles }
}

pub const NAVIGATION: &[NavItem] = &[
    nav_item("Dashboard", DASHBOARD, None),
    nav_item("Products", "/products", None),
    nav_item("Categories", "/categories", None),
    nav_item("Checkout", "/checkout", None),
    nav_item("Orders", "/orders", None),
    nav_item("User Management", "/admin/users", Some(ADMINS)),
    nav_item("Analytics", "/analytics", Some(ADMINS)),
    nav_item("Stock Ops", "/stock", Some(ADMINS)),
    nav_item("Stores", "/admin/stores", Some(SUPERADMINS)),
    nav_item("Audit Logs", "/admin/audit-logs", Some(SUPERADMINS)),
    nav_item("Role Settings", "/admin/roles", Some(SUPERADMINS)),
];

/// Sidebar items visible to `role`.
pub fn visible_navigation(role: Option<Role>) -> Vec<&'static NavItem> {
    NAVIGATION
        .iter()
        .filter(|item| match item.roles {
            None => true,
            Some(roles) => role.is_some_and(|r| roles.contains(&r)),
        })
        .collect()
}
