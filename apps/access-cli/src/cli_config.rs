use std::env;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use orgaccess_core::{AppError, AppResult, OrganizationId, UserId};

const USAGE: &str = "usage: orgaccess-cli <user-id> [organization-id] | orgaccess-cli migrate";
const DEFAULT_ACCESS_CACHE_TTL_SECONDS: u32 = 5;

/// Where the organization snapshot is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    Postgres { database_url: String },
    Fixture { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Migrate,
    Resolve {
        user_id: UserId,
        organization_id: Option<OrganizationId>,
    },
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub command: CliCommand,
    pub source: SnapshotSource,
    pub cache_ttl_seconds: u32,
    pub global_admin_user_ids: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_sources(env::args().skip(1), |name| env::var(name).ok())
    }

    fn from_sources(
        args: impl IntoIterator<Item = String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let lookup_non_empty =
            |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let command = parse_command(args)?;

        let source = match (
            lookup_non_empty("DATABASE_URL"),
            lookup_non_empty("ACCESS_FIXTURE_PATH"),
        ) {
            (Some(database_url), _) => SnapshotSource::Postgres { database_url },
            (None, Some(path)) if command != CliCommand::Migrate => SnapshotSource::Fixture {
                path: PathBuf::from(path),
            },
            _ => {
                return Err(AppError::Validation(
                    "DATABASE_URL is required, or ACCESS_FIXTURE_PATH for offline inspection"
                        .to_owned(),
                ));
            }
        };

        let cache_ttl_seconds = match lookup_non_empty("ACCESS_CACHE_TTL_SECONDS") {
            Some(value) => value.trim().parse::<u32>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid ACCESS_CACHE_TTL_SECONDS value '{value}': {error}"
                ))
            })?,
            None => DEFAULT_ACCESS_CACHE_TTL_SECONDS,
        };

        let evaluated_at = lookup_non_empty("ACCESS_EVALUATED_AT")
            .map(|value| {
                DateTime::parse_from_rfc3339(value.trim())
                    .map(|timestamp| timestamp.with_timezone(&Utc))
                    .map_err(|error| {
                        AppError::Validation(format!(
                            "invalid ACCESS_EVALUATED_AT value '{value}': {error}"
                        ))
                    })
            })
            .transpose()?
            .unwrap_or_else(Utc::now);

        Ok(Self {
            command,
            source,
            cache_ttl_seconds,
            global_admin_user_ids: lookup_non_empty("GLOBAL_ADMIN_USER_IDS"),
            evaluated_at,
        })
    }
}

fn parse_command(args: impl IntoIterator<Item = String>) -> AppResult<CliCommand> {
    let args: Vec<String> = args.into_iter().collect();

    match args.as_slice() {
        [command] if command == "migrate" => Ok(CliCommand::Migrate),
        [user_id] => Ok(CliCommand::Resolve {
            user_id: UserId::new(user_id.as_str())?,
            organization_id: None,
        }),
        [user_id, organization_id] => Ok(CliCommand::Resolve {
            user_id: UserId::new(user_id.as_str())?,
            organization_id: Some(OrganizationId::new(organization_id.as_str())?),
        }),
        _ => Err(AppError::Validation(USAGE.to_owned())),
    }
}
