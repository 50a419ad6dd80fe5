//! Tenant organizations.

use chrono::{DateTime, Utc};
use paystore_shared::types::OrganizationId;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::fee::FeePolicy;

/// A tenant with its own fee policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID.
    pub id: OrganizationId,
    /// Display name, unique across tenants.
    pub name: String,
    /// URL-safe reference, unique across tenants.
    pub slug: String,
    /// Fee policy applied to new records.
    pub fee_policy: FeePolicy,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Builds a validated organization.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        fee_policy: FeePolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let name = name.into().trim().to_string();
        let slug = slug.into();

        if name.is_empty() {
            return Err(LedgerError::InvalidOrganization("name is required".into()));
        }
        validate_slug(&slug)?;
        fee_policy.validate()?;

        Ok(Self {
            id: OrganizationId::new(),
            name,
            slug,
            fee_policy,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the fee policy. Existing records keep the fees they were created with.
    pub fn set_fee_policy(
        &mut self,
        fee_policy: FeePolicy,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        fee_policy.validate()?;
        self.fee_policy = fee_policy;
        self.updated_at = now;
        Ok(())
    }
}

/// Slugs are 3-64 characters of lowercase letters, digits, and hyphens.
fn validate_slug(slug: &str) -> Result<(), LedgerError> {
    let valid_chars = slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if !(3..=64).contains(&slug.len()) || !valid_chars {
        return Err(LedgerError::InvalidOrganization(format!(
            "invalid slug '{slug}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_organization() {
        let org = Organization::new(" Acme ", "acme", FeePolicy::Fixed(100), Utc::now()).unwrap();
        assert_eq!(org.name, "Acme");
        assert_eq!(org.slug, "acme");
    }

    #[rstest]
    #[case("ab")]
    #[case("Acme")]
    #[case("acme corp")]
    #[case("acme_corp")]
    fn test_invalid_slug(#[case] slug: &str) {
        assert!(matches!(
            Organization::new("Acme", slug, FeePolicy::Fixed(0), Utc::now()),
            Err(LedgerError::InvalidOrganization(_))
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Organization::new("  ", "acme", FeePolicy::Fixed(0), Utc::now()).is_err());
    }

    #[test]
    fn test_set_fee_policy() {
        let mut org = Organization::new("Acme", "acme-2", FeePolicy::Fixed(100), Utc::now()).unwrap();
        org.set_fee_policy(FeePolicy::Percent(5), Utc::now()).unwrap();
        assert_eq!(org.fee_policy, FeePolicy::Percent(5));
        assert!(org.set_fee_policy(FeePolicy::Percent(150), Utc::now()).is_err());
        assert_eq!(org.fee_policy, FeePolicy::Percent(5));
    }
}
