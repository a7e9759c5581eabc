use crate::auth::{Role, RoleSet};

/// What a console path requires before it is rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    /// Never gated: sign-in, error pages, health, assets
    Public,
    /// Any signed-in user
    Authenticated,
    /// Signed-in user holding at least one of these roles
    Roles(Vec<Role>),
}

impl RouteAccess {
    pub fn allows(&self, roles: &RoleSet) -> bool {
        match self {
            RouteAccess::Public | RouteAccess::Authenticated => true,
            RouteAccess::Roles(allowed) => roles.intersects(allowed),
        }
    }
}

static DEFAULT_ACCESS: RouteAccess = RouteAccess::Authenticated;

/// Prefix rules matched on whole path segments, longest prefix wins
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<(String, RouteAccess)>,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn console_default() -> Self {
        Self::empty()
            .with_rule("/auth", RouteAccess::Public)
            .with_rule("/unauthorized", RouteAccess::Public)
            .with_rule("/health", RouteAccess::Public)
            .with_rule("/assets", RouteAccess::Public)
            .with_rule("/super-admin", RouteAccess::Roles(vec![Role::SuperAdmin]))
            .with_rule("/admin", RouteAccess::Roles(vec![Role::Admin, Role::SuperAdmin]))
            .with_rule("/coach", RouteAccess::Roles(vec![Role::Coach]))
            .with_rule("/student", RouteAccess::Roles(vec![Role::Student]))
            .with_rule("/parent", RouteAccess::Roles(vec![Role::Parent]))
            .with_rule("/volunteer", RouteAccess::Roles(vec![Role::Volunteer]))
            .with_rule("/account", RouteAccess::Authenticated)
            .with_rule("/", RouteAccess::Authenticated)
    }

    pub fn with_rule(mut self, prefix: &str, access: RouteAccess) -> Self {
        let prefix = match prefix.trim_end_matches('/') {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        self.rules.retain(|(existing, _)| *existing != prefix);
        self.rules.push((prefix, access));
        self
    }

    /// Access rule for `path`; unmatched paths require a signed-in user
    pub fn access_for(&self, path: &str) -> &RouteAccess {
        self.rules
            .iter()
            .filter(|(prefix, _)| segment_prefix(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, access)| access)
            .unwrap_or(&DEFAULT_ACCESS)
    }
}

fn segment_prefix(prefix: &str, path: &str) -> bool {
    prefix == "/"
        || path == prefix
        || path
            .strip_prefix(prefix)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_segment_prefix_wins() {
        let table = RouteTable::console_default();
        assert_eq!(table.access_for("/admin/programs/42"), &RouteAccess::Roles(vec![Role::Admin, Role::SuperAdmin]));
        assert_eq!(table.access_for("/super-admin/tenants"), &RouteAccess::Roles(vec![Role::SuperAdmin]));
        assert_eq!(table.access_for("/auth/callback"), &RouteAccess::Public);
        assert_eq!(table.access_for("/"), &RouteAccess::Authenticated);
        assert_eq!(table.access_for("/settings"), &RouteAccess::Authenticated);
    }

    #[test]
    fn prefixes_do_not_match_inside_segments() {
        let table = RouteTable::console_default();
        // "/administrators" is not under "/admin"
        assert_eq!(table.access_for("/administrators"), &RouteAccess::Authenticated);
        assert_eq!(table.access_for("/authors"), &RouteAccess::Authenticated);
    }

    #[test]
    fn with_rule_replaces_existing_prefix() {
        let table = RouteTable::console_default().with_rule("/coach/", RouteAccess::Roles(vec![Role::Coach, Role::Admin]));
        assert_eq!(table.access_for("/coach"), &RouteAccess::Roles(vec![Role::Coach, Role::Admin]));
    }

    #[test]
    fn role_requirements() {
        let coach: RoleSet = [Role::Coach].into_iter().collect();
        assert!(RouteAccess::Authenticated.allows(&RoleSet::new()));
        assert!(RouteAccess::Roles(vec![Role::Coach]).allows(&coach));
        assert!(!RouteAccess::Roles(vec![Role::Admin, Role::SuperAdmin]).allows(&coach));
    }
}
