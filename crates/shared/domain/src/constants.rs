//! Domain-level constants.

use crate::Id;

// =============================================================================
// Soft delete
// =============================================================================

/// Value of the `deleted` marker for live rows.
pub const NOT_DELETED: Id = 0;

// =============================================================================
// Serialized property names
// =============================================================================

pub const PROPERTY_ID: &str = "id";
pub const PROPERTY_ACTIVE: &str = "active";
pub const PROPERTY_CODE: &str = "code";
pub const PROPERTY_MESSAGE: &str = "message";

/// Audit properties are maintained by persistence and never copied from a DTO.
pub const AUDIT_PROPERTIES: &[&str] = &["createdAt", "updatedAt", "createdBy", "updatedBy"];

// =============================================================================
// Security
// =============================================================================

/// Prefix distinguishing roles from plain authorities
pub const ROLE_PREFIX: &str = "ROLE_";

/// Administrator role
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

// =============================================================================
// Localization
// =============================================================================

/// Language used when a request carries no hint
pub const DEFAULT_LANGUAGE: &str = "vi";
