//! Static route table consulted by the navigation guard.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Login,
    /// Landing page; always needs a session even without role requirements.
    Home,
    Forbidden,
    #[default]
    Page,
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKind::Login => write!(f, "login"),
            RouteKind::Home => write!(f, "home"),
            RouteKind::Forbidden => write!(f, "forbidden"),
            RouteKind::Page => write!(f, "page"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: RouteKind,
    /// Empty means any visitor may open the route.
    #[serde(default, alias = "roles")]
    pub required_roles: BTreeSet<String>,
    #[serde(default)]
    pub hide_in_menu: bool,
}

impl RouteDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: RouteKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            title: String::new(),
            kind,
            required_roles: BTreeSet::new(),
            hide_in_menu: kind != RouteKind::Page,
        }
    }

    pub fn page(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, RouteKind::Page)
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.required_roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide_in_menu = true;
        self
    }

    pub fn is_login(&self) -> bool {
        self.kind == RouteKind::Login
    }

    pub fn requires_login(&self) -> bool {
        !self.required_roles.is_empty() || self.kind == RouteKind::Home
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("duplicate route name: {0}")]
    Duplicate(String),
    #[error("route table has no {0} route")]
    Missing(RouteKind),
    #[error("route table has more than one {0} route")]
    Multiple(RouteKind),
}

#[derive(Debug, Deserialize)]
struct RouteFile {
    routes: Vec<RouteDescriptor>,
}

/// Immutable after construction. Holds exactly one login, home and
/// forbidden route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    login: usize,
    home: usize,
    forbidden: usize,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDescriptor>) -> Result<Self, RouteTableError> {
        let mut seen = HashSet::new();
        for route in &routes {
            if !seen.insert(route.name.as_str()) {
                return Err(RouteTableError::Duplicate(route.name.clone()));
            }
        }

        let login = unique_index(&routes, RouteKind::Login)?;
        let home = unique_index(&routes, RouteKind::Home)?;
        let forbidden = unique_index(&routes, RouteKind::Forbidden)?;

        Ok(Self {
            routes,
            login,
            home,
            forbidden,
        })
    }

    /// The admin console's built-in screens.
    pub fn console_default() -> Self {
        let routes = vec![
            RouteDescriptor::new("login", "/login", RouteKind::Login).titled("Login"),
            RouteDescriptor::new("home", "/home", RouteKind::Home).titled("Home"),
            RouteDescriptor::new("forbidden", "/401", RouteKind::Forbidden).titled("Forbidden"),
            RouteDescriptor::page("admin_users", "/admin/users")
                .titled("Users")
                .with_roles(&["admin"]),
            RouteDescriptor::page("admin_tags", "/admin/tags")
                .titled("Tags")
                .with_roles(&["admin"]),
            RouteDescriptor::page("admin_categories", "/admin/categories")
                .titled("Categories")
                .with_roles(&["admin"]),
            RouteDescriptor::page("admin_articles", "/admin/articles")
                .titled("Articles")
                .with_roles(&["admin"]),
            RouteDescriptor::page("admin_subcategories", "/admin/category/:category_id/subs")
                .titled("Subcategories")
                .with_roles(&["admin"])
                .hidden(),
        ];
        Self {
            routes,
            login: 0,
            home: 1,
            forbidden: 2,
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: RouteFile = serde_yaml::from_str(content).context("parse route table")?;
        Ok(Self::new(file.routes)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("invalid route table {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn login(&self) -> &RouteDescriptor {
        &self.routes[self.login]
    }

    pub fn home(&self) -> &RouteDescriptor {
        &self.routes[self.home]
    }

    pub fn forbidden(&self) -> &RouteDescriptor {
        &self.routes[self.forbidden]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    /// Routes shown in the navigation menu.
    pub fn menu(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().filter(|r| !r.hide_in_menu)
    }
}

fn unique_index(routes: &[RouteDescriptor], kind: RouteKind) -> Result<usize, RouteTableError> {
    let mut found = routes.iter().enumerate().filter(|(_, r)| r.kind == kind);
    let (index, _) = found.next().ok_or(RouteTableError::Missing(kind))?;
    if found.next().is_some() {
        return Err(RouteTableError::Multiple(kind));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_marks_admin_routes() {
        let table = RouteTable::console_default();

        assert_eq!(table.login().name, "login");
        assert_eq!(table.home().name, "home");
        assert_eq!(table.forbidden().name, "forbidden");

        let users = table.get("admin_users").unwrap();
        assert!(users.requires_login());
        assert!(users.required_roles.contains("admin"));
        assert!(table.home().requires_login());
        assert!(!table.login().requires_login());
        assert!(!table.forbidden().requires_login());
    }

    #[test]
    fn default_table_passes_validation() {
        let table = RouteTable::console_default();
        let rebuilt = RouteTable::new(table.iter().cloned().collect()).unwrap();
        assert_eq!(rebuilt.login(), table.login());
        assert_eq!(rebuilt.home(), table.home());
        assert_eq!(rebuilt.forbidden(), table.forbidden());
    }

    #[test]
    fn menu_skips_hidden_routes() {
        let table = RouteTable::console_default();
        let names: Vec<_> = table.menu().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["admin_users", "admin_tags", "admin_categories", "admin_articles"]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = RouteTable::new(vec![
            RouteDescriptor::new("login", "/login", RouteKind::Login),
            RouteDescriptor::new("home", "/home", RouteKind::Home),
            RouteDescriptor::new("forbidden", "/401", RouteKind::Forbidden),
            RouteDescriptor::page("home", "/other"),
        ])
        .unwrap_err();
        assert_eq!(err, RouteTableError::Duplicate("home".into()));
    }

    #[test]
    fn missing_login_is_rejected() {
        let err = RouteTable::new(vec![
            RouteDescriptor::new("home", "/home", RouteKind::Home),
            RouteDescriptor::new("forbidden", "/401", RouteKind::Forbidden),
        ])
        .unwrap_err();
        assert_eq!(err, RouteTableError::Missing(RouteKind::Login));
    }

    #[test]
    fn yaml_table_accepts_roles_alias() {
        let table = RouteTable::from_yaml_str(
            r#"routes:
  - name: login
    path: /login
    kind: login
  - name: home
    path: /home
    kind: home
  - name: forbidden
    path: /401
    kind: forbidden
  - name: editor_drafts
    path: /drafts
    roles: [editor, admin]
"#,
        )
        .unwrap();

        let drafts = table.get("editor_drafts").unwrap();
        assert_eq!(drafts.kind, RouteKind::Page);
        assert_eq!(drafts.required_roles.len(), 2);
        assert!(!drafts.hide_in_menu);
    }
}
