use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{RawRole, UserProfile};

/// Console roles, ordered by home-dashboard precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Coach,
    Student,
    Parent,
    Volunteer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Coach,
        Role::Student,
        Role::Parent,
        Role::Volunteer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::Admin => "admin",
            Role::Coach => "coach",
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Volunteer => "volunteer",
        }
    }

    /// Dashboard a user with this role lands on
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "/super-admin",
            Role::Admin => "/admin",
            Role::Coach => "/coach",
            Role::Student => "/student",
            Role::Parent => "/parent",
            Role::Volunteer => "/volunteer",
        }
    }

    /// Roles a visitor may pick for themselves on the signup page
    pub fn is_self_registrable(&self) -> bool {
        matches!(self, Role::Coach | Role::Student | Role::Parent | Role::Volunteer)
    }

    /// Normalize a free-form role name: trim, lowercase, `_`/whitespace to `-`, resolve aliases
    pub fn normalize(name: &str) -> Option<Role> {
        let slug = name
            .trim()
            .to_lowercase()
            .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        match slug.as_str() {
            "super-admin" | "superadmin" | "platform-admin" => Some(Role::SuperAdmin),
            "admin" | "administrator" | "tenant-admin" => Some(Role::Admin),
            "coach" | "teacher" | "instructor" => Some(Role::Coach),
            "student" | "learner" => Some(Role::Student),
            "parent" | "guardian" => Some(Role::Parent),
            "volunteer" => Some(Role::Volunteer),
            _ => None,
        }
    }

    /// Resolve a backend role entry, preferring metadata over display names
    pub fn from_raw(raw: &RawRole) -> Option<Role> {
        match raw {
            RawRole::Name(name) => Role::normalize(name),
            RawRole::Detailed { name, key, slug, metadata } => {
                let from_metadata = metadata.as_ref().and_then(|m| {
                    ["role", "key"]
                        .iter()
                        .find_map(|field| m.get(*field).and_then(Value::as_str))
                });

                from_metadata
                    .into_iter()
                    .chain(key.as_deref())
                    .chain(slug.as_deref())
                    .chain(name.as_deref())
                    .find_map(Role::normalize)
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::normalize(s).ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Normalized, de-duplicated roles of one principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect roles from the profile, its membership and the super-admin flag
    pub fn from_profile(profile: &UserProfile) -> Self {
        let membership_roles = profile.membership.iter().flat_map(|m| m.roles.iter());

        let mut roles: RoleSet = profile
            .roles
            .iter()
            .chain(membership_roles)
            .filter_map(|raw| {
                let role = Role::from_raw(raw);
                if role.is_none() {
                    tracing::debug!("Ignoring unrecognized role entry: {:?}", raw);
                }
                role
            })
            .collect();

        if profile.is_super_admin {
            roles.insert(Role::SuperAdmin);
        }
        roles
    }

    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// True when at least one of `required` is held
    pub fn intersects(&self, required: &[Role]) -> bool {
        required.iter().any(|role| self.0.contains(role))
    }

    /// Highest-precedence role's dashboard
    pub fn home_path(&self) -> &'static str {
        self.0
            .iter()
            .next()
            .map(Role::home_path)
            .unwrap_or("/unauthorized")
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
