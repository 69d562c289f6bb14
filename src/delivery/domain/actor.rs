//! Identities that drive delivery transitions.

use super::{DeliveryValidationError, ResidentId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Back-office staff member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffMember {
    id: String,
    name: String,
}

impl StaffMember {
    /// Creates a staff identity.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryValidationError::MissingActor`] when the identifier
    /// is blank.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, DeliveryValidationError> {
        let raw_id = id.into();
        let trimmed = raw_id.trim();
        if trimmed.is_empty() {
            return Err(DeliveryValidationError::MissingActor);
        }
        Ok(Self {
            id: trimmed.to_owned(),
            name: name.into().trim().to_owned(),
        })
    }

    /// Returns the staff identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Who performed a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Actor {
    /// A staff member acting in the back office.
    Staff(StaffMember),
    /// A resident acting on their own request.
    Resident {
        /// Resident identifier.
        resident_id: ResidentId,
    },
}

impl Actor {
    /// Creates a resident actor.
    #[must_use]
    pub const fn resident(resident_id: ResidentId) -> Self {
        Self::Resident { resident_id }
    }

    /// Creates a staff actor.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryValidationError::MissingActor`] for a blank id.
    pub fn staff(
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, DeliveryValidationError> {
        StaffMember::new(id, name).map(Self::Staff)
    }

    /// Returns the role name used in errors and storage.
    #[must_use]
    pub const fn role(&self) -> &'static str {
        match self {
            Self::Staff(_) => "staff",
            Self::Resident { .. } => "resident",
        }
    }

    /// Returns whether this actor is staff.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self, Self::Staff(_))
    }

    /// Returns whether this actor is the given resident.
    #[must_use]
    pub fn is_resident(&self, owner: ResidentId) -> bool {
        matches!(self, Self::Resident { resident_id } if *resident_id == owner)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staff(member) => write!(f, "staff:{}", member.id()),
            Self::Resident { resident_id } => write!(f, "resident:{resident_id}"),
        }
    }
}
