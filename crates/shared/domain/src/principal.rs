//! Authenticated user and authority matching.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::ROLE_PREFIX;
use crate::entity::{same_identity, Id};

/// The authenticated user of a request.
///
/// `privileges` are the granted authority names; roles are the ones
/// carrying the `ROLE_` prefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPrincipal {
    pub id: Option<Id>,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub enabled: bool,
    pub privileges: Vec<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub jti: Option<String>,
    pub additional_information: BTreeMap<String, serde_json::Value>,
}

impl PartialEq for UserPrincipal {
    fn eq(&self, other: &Self) -> bool {
        same_identity(self.id, other.id)
    }
}

impl UserPrincipal {
    pub fn authorities(&self) -> impl Iterator<Item = &str> {
        self.privileges.iter().map(String::as_str)
    }
}

/// Role inheritance such as `ROLE_ADMIN > ROLE_STAFF`.
#[derive(Debug, Clone, Default)]
pub struct RoleHierarchy {
    reachable: BTreeMap<String, BTreeSet<String>>,
}

impl RoleHierarchy {
    /// Parse one rule per line; a line may chain (`A > B > C`).
    pub fn parse(definition: &str) -> Self {
        let mut direct: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for line in definition.lines() {
            let roles: Vec<&str> = line
                .split('>')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .collect();

            for pair in roles.windows(2) {
                direct
                    .entry(pair[0].to_string())
                    .or_default()
                    .insert(pair[1].to_string());
            }
        }

        let reachable = direct
            .keys()
            .map(|role| (role.clone(), Self::closure(&direct, role)))
            .collect();

        Self { reachable }
    }

    fn closure(direct: &BTreeMap<String, BTreeSet<String>>, role: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<&str> = vec![role];

        while let Some(current) = pending.pop() {
            if let Some(children) = direct.get(current) {
                for child in children {
                    if seen.insert(child.clone()) {
                        pending.push(child);
                    }
                }
            }
        }

        seen.remove(role);
        seen
    }

    /// Granted authorities plus everything they inherit.
    pub fn reachable_authorities<'a>(
        &self,
        granted: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<String> {
        let mut all = BTreeSet::new();
        for authority in granted {
            all.insert(authority.to_string());
            if let Some(inherited) = self.reachable.get(authority) {
                all.extend(inherited.iter().cloned());
            }
        }
        all
    }
}

/// Effective authorities of a principal, with optional hierarchy expansion.
#[derive(Debug, Clone, Default)]
pub struct GrantedAuthorities {
    authorities: Option<BTreeSet<String>>,
}

impl GrantedAuthorities {
    /// `None` principal means anonymous: every check fails.
    pub fn resolve(principal: Option<&UserPrincipal>, hierarchy: Option<&RoleHierarchy>) -> Self {
        let authorities = principal.map(|p| match hierarchy {
            Some(h) => h.reachable_authorities(p.authorities()),
            None => p.authorities().map(str::to_string).collect(),
        });
        Self { authorities }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authorities.is_some()
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.has_any_authority(&[authority])
    }

    pub fn has_any_authority(&self, authorities: &[&str]) -> bool {
        self.matches_any(None, authorities)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.has_any_role(&[role])
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.matches_any(Some(ROLE_PREFIX), roles)
    }

    fn matches_any(&self, prefix: Option<&str>, names: &[&str]) -> bool {
        let Some(granted) = &self.authorities else {
            return false;
        };

        names.iter().any(|name| {
            let name = match prefix {
                Some(prefix) if !name.starts_with(prefix) => format!("{prefix}{name}"),
                _ => name.to_string(),
            };
            granted.contains(&name)
        })
    }
}
