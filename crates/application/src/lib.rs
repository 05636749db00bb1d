//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod access_service;

pub use access_ports::{
    AccessCache, CachedAccess, DelegationRepository, GlobalAdminCheck, MembershipRepository,
    OrganizationRepository,
};
pub use access_service::AccessService;
