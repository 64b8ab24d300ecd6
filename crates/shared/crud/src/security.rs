//! Request-scoped security context.
//!
//! The authentication middleware runs each request inside [`scope`]; the
//! repository and service layers read the current user from here for audit
//! stamps and authority checks. Outside a scope (background jobs, tests) the
//! caller is anonymous.

use std::future::Future;
use std::sync::Arc;

use domain::{GrantedAuthorities, Id, RoleHierarchy, UserPrincipal, DEFAULT_LANGUAGE};

/// What the current request runs as.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<UserPrincipal>,
    pub language: Option<String>,
    pub hierarchy: Option<Arc<RoleHierarchy>>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(principal: UserPrincipal) -> Self {
        Self {
            principal: Some(principal),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: Option<Arc<RoleHierarchy>>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn authorities(&self) -> GrantedAuthorities {
        GrantedAuthorities::resolve(self.principal.as_ref(), self.hierarchy.as_deref())
    }
}

tokio::task_local! {
    static CONTEXT: RequestContext;
}

/// Run `future` with `context` as the current request context.
pub async fn scope<F: Future>(context: RequestContext, future: F) -> F::Output {
    CONTEXT.scope(context, future).await
}

fn with_context<R>(f: impl FnOnce(&RequestContext) -> R) -> Option<R> {
    CONTEXT.try_with(f).ok()
}

pub fn current_principal() -> Option<UserPrincipal> {
    with_context(|ctx| ctx.principal.clone()).flatten()
}

/// Id of the authenticated user, used for audit stamps.
pub fn current_user_id() -> Option<Id> {
    with_context(|ctx| ctx.principal.as_ref().and_then(|p| p.id)).flatten()
}

pub fn current_username() -> Option<String> {
    with_context(|ctx| ctx.principal.as_ref().map(|p| p.username.clone())).flatten()
}

/// Request language, `vi` when none was negotiated.
pub fn current_language() -> String {
    with_context(|ctx| ctx.language.clone())
        .flatten()
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

fn authorities() -> GrantedAuthorities {
    with_context(RequestContext::authorities).unwrap_or_default()
}

pub fn is_authenticated() -> bool {
    authorities().is_authenticated()
}

pub fn has_authority(authority: &str) -> bool {
    authorities().has_authority(authority)
}

pub fn has_any_authority(names: &[&str]) -> bool {
    authorities().has_any_authority(names)
}

pub fn has_role(role: &str) -> bool {
    authorities().has_role(role)
}

pub fn has_any_role(roles: &[&str]) -> bool {
    authorities().has_any_role(roles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lecturer() -> UserPrincipal {
        UserPrincipal {
            id: Some(12),
            username: "lecturer".to_string(),
            enabled: true,
            privileges: vec!["ROLE_STAFF".to_string()],
            ..UserPrincipal::default()
        }
    }

    #[tokio::test]
    async fn test_anonymous_outside_scope() {
        assert_eq!(current_user_id(), None);
        assert_eq!(current_language(), "vi");
        assert!(!is_authenticated());
        assert!(!has_role("STAFF"));
    }

    #[tokio::test]
    async fn test_scope_exposes_principal() {
        let context = RequestContext::for_user(lecturer()).with_language("en");

        scope(context, async {
            assert_eq!(current_user_id(), Some(12));
            assert_eq!(current_username().as_deref(), Some("lecturer"));
            assert_eq!(current_language(), "en");
            assert!(has_role("STAFF"));
            assert!(has_any_role(&["ADMIN", "ROLE_STAFF"]));
            assert!(!has_authority("COURSE_DELETE"));
        })
        .await;

        assert_eq!(current_user_id(), None);
    }

    #[tokio::test]
    async fn test_hierarchy_applies_in_scope() {
        let hierarchy = Arc::new(RoleHierarchy::parse("ROLE_STAFF > COURSE_READ"));
        let context = RequestContext::for_user(lecturer()).with_hierarchy(Some(hierarchy));

        scope(context, async {
            assert!(has_authority("COURSE_READ"));
            assert!(has_any_authority(&["COURSE_READ", "COURSE_WRITE"]));
        })
        .await;
    }
}
