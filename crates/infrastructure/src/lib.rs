//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod access_fixture;
mod in_memory_access_cache;
mod in_memory_access_repository;
mod postgres_access_grant_repository;
mod postgres_organization_repository;
mod static_global_admin_check;

pub use access_fixture::AccessFixture;
pub use in_memory_access_cache::InMemoryAccessCache;
pub use in_memory_access_repository::InMemoryAccessRepository;
pub use postgres_access_grant_repository::PostgresAccessGrantRepository;
pub use postgres_organization_repository::PostgresOrganizationRepository;
pub use static_global_admin_check::StaticGlobalAdminCheck;
