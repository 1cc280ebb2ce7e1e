//! Tenant resolution, onboarding and lifecycle.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{StoreResult, TenancyError};
use crate::models::{Tenant, TenantStatus};
use crate::storage::Storage;

/// Path segments that can never be tenant slugs, since `/api/<slug>/...`
/// shares its first segment with these routes.
pub const RESERVED_SLUGS: &[&str] = &["admin", "api", "auth", "health", "tenants"];

const MIN_SLUG_LEN: usize = 3;
const MAX_SLUG_LEN: usize = 63;

impl TenantStatus {
    /// pending -> active -> suspended, nothing else. Suspension is final.
    pub fn can_transition_to(self, next: TenantStatus) -> bool {
        matches!(
            (self, next),
            (TenantStatus::Pending, TenantStatus::Active)
                | (TenantStatus::Active, TenantStatus::Suspended)
        )
    }
}

/// Look a tenant up by slug through the slug index.
pub fn resolve_tenant(storage: &Storage, slug: &str) -> StoreResult<Option<Tenant>> {
    storage.find_by::<Tenant>("slug", &slug.to_ascii_lowercase())
}

/// Derive a slug candidate from a display name ("Masjid Al-Ikhlas" -> "masjid-al-ikhlas").
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

pub fn validate_slug(slug: &str) -> Result<(), TenancyError> {
    let invalid = |reason| TenancyError::InvalidSlug {
        slug: slug.to_string(),
        reason,
    };

    if slug.len() < MIN_SLUG_LEN || slug.len() > MAX_SLUG_LEN {
        return Err(invalid("must be 3 to 63 characters"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(invalid("hyphens must separate words"));
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Err(invalid("reserved word"));
    }
    Ok(())
}

/// Fields needed to onboard a mosque.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub slug: Option<String>,
    pub owner_id: String,
    pub address: Option<String>,
}

/// Create a tenant in `pending` status, claiming its slug atomically.
pub fn register_tenant(storage: &Storage, input: NewTenant) -> Result<Tenant, TenancyError> {
    let slug = match input.slug {
        Some(slug) => slug.trim().to_ascii_lowercase(),
        None => slugify(&input.name),
    };
    validate_slug(&slug)?;

    let tenant = Tenant {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        slug,
        owner_id: input.owner_id,
        created_at: Utc::now(),
        status: TenantStatus::Pending,
        address: input.address,
        bank_info: None,
        bio: None,
        phone: None,
    };
    storage.create(&tenant)?;

    info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant registered, awaiting approval");
    Ok(tenant)
}

/// Move a tenant along the status machine. `Ok(None)` if the tenant does not exist.
pub fn transition_status(
    storage: &Storage,
    tenant_id: &str,
    next: TenantStatus,
) -> Result<Option<Tenant>, TenancyError> {
    let updated = storage.update(tenant_id, |mut tenant: Tenant| {
        if !tenant.status.can_transition_to(next) {
            return Err(TenancyError::InvalidTransition {
                from: tenant.status,
                to: next,
            });
        }
        tenant.status = next;
        Ok(tenant)
    })?;

    if let Some(tenant) = &updated {
        info!(tenant_id = %tenant.id, status = %tenant.status, "Tenant status changed");
    }
    Ok(updated)
}
