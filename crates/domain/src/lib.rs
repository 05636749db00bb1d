//! Domain entities and invariants for hierarchical organization access.

#![forbid(unsafe_code)]

mod grant;
mod graph;
mod index;
mod organization;
mod resolver;
mod role;

pub use grant::{AccessGrant, AccessSource, DelegationGrant, MembershipGrant, MembershipStatus};
pub use graph::{Ancestors, GraphAnomaly, OrganizationGraph};
pub use index::{DelegationIndex, IndexAnomaly, MembershipIndex};
pub use organization::{Organization, OrganizationStatus, OrganizationType};
pub use resolver::AccessResolver;
pub use role::{AccessRole, MembershipRole};
