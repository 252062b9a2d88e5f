//! Multi-tenancy name mapping
//!
//! In a multi-tenant repository a tenant's store identifiers carry an
//! `@domain@` prefix (`workspace://@acme@SpacesStore`). Everything handed to
//! callers is expressed in the tenant-neutral base form.

use crate::node::{NodeRef, StoreRef};

const TENANT_SEPARATOR: char = '@';

pub trait TenantMapper {
    fn base_store(&self, store: &StoreRef) -> StoreRef;

    fn base_node_ref(&self, node: &NodeRef) -> NodeRef {
        NodeRef::new(self.base_store(&node.store), node.id.clone())
    }
}

/// Identity mapping for single-tenant deployments
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleTenant;

impl TenantMapper for SingleTenant {
    fn base_store(&self, store: &StoreRef) -> StoreRef {
        store.clone()
    }
}

/// Strips the `@domain@` prefix from store identifiers.
///
/// With a configured domain only that domain is stripped; without one any
/// well-formed prefix is.
#[derive(Debug, Clone, Default)]
pub struct TenantDomainMapper {
    domain: Option<String>,
}

impl TenantDomainMapper {
    pub fn new(domain: Option<String>) -> Self {
        Self { domain }
    }

    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self::new(Some(domain.into()))
    }

    fn strip<'a>(&self, identifier: &'a str) -> Option<&'a str> {
        let rest = identifier.strip_prefix(TENANT_SEPARATOR)?;
        let (domain, base) = rest.split_once(TENANT_SEPARATOR)?;
        if domain.is_empty() || base.is_empty() {
            return None;
        }
        match &self.domain {
            Some(expected) if !expected.eq_ignore_ascii_case(domain) => None,
            _ => Some(base),
        }
    }
}

impl TenantMapper for TenantDomainMapper {
    fn base_store(&self, store: &StoreRef) -> StoreRef {
        match self.strip(&store.identifier) {
            Some(base) => StoreRef::new(store.protocol.clone(), base),
            None => store.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tenant_is_identity() {
        let store = StoreRef::new("workspace", "@acme@SpacesStore");
        assert_eq!(SingleTenant.base_store(&store), store);
    }

    #[test]
    fn test_any_domain_is_stripped() {
        let mapper = TenantDomainMapper::default();
        let node = NodeRef::new(StoreRef::new("workspace", "@acme@SpacesStore"), "n1");
        assert_eq!(
            mapper.base_node_ref(&node).to_string(),
            "workspace://SpacesStore/n1"
        );
    }

    #[test]
    fn test_only_configured_domain_is_stripped() {
        let mapper = TenantDomainMapper::for_domain("acme");
        let other = StoreRef::new("workspace", "@other@SpacesStore");
        assert_eq!(mapper.base_store(&other), other);
        assert_eq!(
            mapper.base_store(&StoreRef::new("workspace", "@ACME@SpacesStore")),
            StoreRef::workspace()
        );
    }

    #[test]
    fn test_malformed_prefix_left_alone() {
        let mapper = TenantDomainMapper::default();
        for identifier in ["@@SpacesStore", "@acme", "acme@SpacesStore"] {
            let store = StoreRef::new("workspace", identifier);
            assert_eq!(mapper.base_store(&store), store);
        }
    }
}
