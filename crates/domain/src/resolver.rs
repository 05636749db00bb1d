//! Hierarchical access resolution over one organization snapshot.
//!
//! Precedence, highest first:
//! 1. global admin override, for any organization id, known or not;
//! 2. the nearest membership on the ancestor chain, searched over the whole
//!    chain before any delegation is looked at;
//! 3. the nearest live delegation, yielding the synthetic reporter role.
//!
//! Delegation scopes are reported only at the organization the delegation
//! was recorded at. Inherited reporter grants carry an empty scope set.

use std::collections::{BTreeSet, HashMap};

use orgaccess_core::OrganizationId;

use crate::{AccessGrant, DelegationIndex, MembershipIndex, MembershipRole, OrganizationGraph};

/// Pure resolver combining a graph snapshot with one user's grants.
#[derive(Debug, Clone, Copy)]
pub struct AccessResolver<'a> {
    graph: &'a OrganizationGraph,
    memberships: &'a MembershipIndex,
    delegations: &'a DelegationIndex,
    global_admin: bool,
}

impl<'a> AccessResolver<'a> {
    /// Creates a resolver for a non-admin user.
    #[must_use]
    pub fn new(
        graph: &'a OrganizationGraph,
        memberships: &'a MembershipIndex,
        delegations: &'a DelegationIndex,
    ) -> Self {
        Self {
            graph,
            memberships,
            delegations,
            global_admin: false,
        }
    }

    /// Applies the outcome of the global admin capability check.
    #[must_use]
    pub fn with_global_admin(mut self, global_admin: bool) -> Self {
        self.global_admin = global_admin;
        self
    }

    /// Resolves effective access for one organization.
    ///
    /// Returns `None` for unknown organizations and for organizations the
    /// user cannot reach through any grant.
    #[must_use]
    pub fn resolve_organization_access(
        &self,
        organization_id: &OrganizationId,
    ) -> Option<AccessGrant> {
        if self.global_admin {
            return Some(AccessGrant::global_admin(organization_id.clone()));
        }

        let chain: Vec<&OrganizationId> = self.graph.ancestor_chain(organization_id)?.collect();

        let membership = chain.iter().find_map(|ancestor| {
            self.memberships
                .role_at(ancestor)
                .map(|role| (*ancestor, role))
        });
        if let Some((origin, role)) = membership {
            return Some(AccessGrant::from_membership(
                organization_id.clone(),
                role,
                origin.clone(),
            ));
        }

        chain.iter().find_map(|ancestor| {
            self.delegations.scopes_at(ancestor).map(|scopes| {
                AccessGrant::from_delegation(organization_id.clone(), (*ancestor).clone(), scopes)
            })
        })
    }

    /// Lists every organization the user can access, ordered by id.
    ///
    /// Callers must not rely on the ordering.
    #[must_use]
    pub fn list_accessible_organizations(&self) -> Vec<AccessGrant> {
        if self.global_admin {
            let mut grants: Vec<AccessGrant> = self
                .graph
                .organization_ids()
                .cloned()
                .map(AccessGrant::global_admin)
                .collect();
            grants.sort_by(|left, right| left.organization_id.cmp(&right.organization_id));
            return grants;
        }

        let membership_reach = self.membership_reach();
        let delegation_reach = self.delegation_reach();

        let mut merged: HashMap<&OrganizationId, AccessGrant> =
            HashMap::with_capacity(membership_reach.len() + delegation_reach.len());

        for (organization_id, reach) in delegation_reach {
            merged.insert(
                organization_id,
                AccessGrant::from_delegation(
                    organization_id.clone(),
                    reach.origin.clone(),
                    reach.value,
                ),
            );
        }

        // Membership-derived entries replace delegation-derived ones entirely.
        for (organization_id, reach) in membership_reach {
            merged.insert(
                organization_id,
                AccessGrant::from_membership(
                    organization_id.clone(),
                    reach.value,
                    reach.origin.clone(),
                ),
            );
        }

        let mut grants: Vec<AccessGrant> = merged.into_values().collect();
        grants.sort_by(|left, right| left.organization_id.cmp(&right.organization_id));
        grants
    }

    fn membership_reach(&self) -> HashMap<&'a OrganizationId, Reach<'a, MembershipRole>> {
        let mut reach = HashMap::new();
        for (origin, role) in self.memberships.iter() {
            self.spread(&mut reach, origin, role);
        }
        reach
    }

    fn delegation_reach(&self) -> HashMap<&'a OrganizationId, Reach<'a, &'a BTreeSet<String>>> {
        let mut reach = HashMap::new();
        for (origin, scopes) in self.delegations.iter() {
            if !scopes.is_empty() {
                self.spread(&mut reach, origin, scopes);
            }
        }
        reach
    }

    /// Assigns `value` to the subtree of `origin`, keeping the deepest origin per node.
    fn spread<T: Copy>(
        &self,
        reach: &mut HashMap<&'a OrganizationId, Reach<'a, T>>,
        origin: &OrganizationId,
        value: T,
    ) {
        let graph = self.graph;
        let (Some(origin_depth), Some(subtree)) = (graph.depth(origin), graph.descendants(origin))
        else {
            return;
        };
        let Some(origin) = subtree.first().copied() else {
            return;
        };

        for organization_id in subtree {
            let candidate = Reach {
                origin,
                origin_depth,
                value,
            };
            reach
                .entry(organization_id)
                .and_modify(|current| {
                    if current.origin_depth < origin_depth {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }
    }
}

/// Nearest grant origin found so far for one organization.
#[derive(Debug, Clone, Copy)]
struct Reach<'a, T> {
    origin: &'a OrganizationId,
    origin_depth: usize,
    value: T,
}
