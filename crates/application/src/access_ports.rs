mod admin;
mod cache;
mod repository;

pub use admin::GlobalAdminCheck;
pub use cache::{AccessCache, CachedAccess};
pub use repository::{DelegationRepository, MembershipRepository, OrganizationRepository};
