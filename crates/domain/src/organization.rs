use std::str::FromStr;

use orgaccess_core::{AppError, OrganizationId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an organization record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    /// Organization is operating normally.
    Active,
    /// Organization has been deactivated.
    Inactive,
}

impl OrganizationStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for OrganizationStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(AppError::Validation(format!(
                "unknown organization status '{value}'"
            ))),
        }
    }
}

/// Kind of organization within the governance tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    /// National or international governing body.
    GoverningBody,
    /// Provincial or regional body.
    Region,
    /// League operated below a governing body or region.
    League,
    /// Club, usually a leaf of the tree.
    Club,
}

impl OrganizationType {
    /// Returns a stable storage value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoverningBody => "governing_body",
            Self::Region => "region",
            Self::League => "league",
            Self::Club => "club",
        }
    }
}

impl FromStr for OrganizationType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "governing_body" => Ok(Self::GoverningBody),
            "region" => Ok(Self::Region),
            "league" => Ok(Self::League),
            "club" => Ok(Self::Club),
            _ => Err(AppError::Validation(format!(
                "unknown organization type '{value}'"
            ))),
        }
    }
}

/// One node of the organization tree as read from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    id: OrganizationId,
    parent_organization_id: Option<OrganizationId>,
    status: OrganizationStatus,
    organization_type: OrganizationType,
}

impl Organization {
    /// Creates an organization record. A `None` parent marks a root.
    #[must_use]
    pub fn new(
        id: OrganizationId,
        parent_organization_id: Option<OrganizationId>,
        status: OrganizationStatus,
        organization_type: OrganizationType,
    ) -> Self {
        Self {
            id,
            parent_organization_id,
            status,
            organization_type,
        }
    }

    /// Returns the organization identifier.
    #[must_use]
    pub fn id(&self) -> &OrganizationId {
        &self.id
    }

    /// Returns the parent identifier as stored, before any integrity repair.
    #[must_use]
    pub fn parent_organization_id(&self) -> Option<&OrganizationId> {
        self.parent_organization_id.as_ref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> OrganizationStatus {
        self.status
    }

    /// Returns the organization type.
    #[must_use]
    pub fn organization_type(&self) -> OrganizationType {
        self.organization_type
    }
}
