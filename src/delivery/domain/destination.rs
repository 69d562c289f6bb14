//! Destination, scheduling preference, and evidence value types.

use super::{DeliveryType, DeliveryValidationError, TimeSlot};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Structured postal address for courier delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    region_code: String,
    city_code: String,
    area_code: String,
    street_line: String,
    postal_code: Option<String>,
    landmark: Option<String>,
}

/// Unvalidated address fields as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressInput {
    /// Region (province) code.
    pub region_code: String,
    /// City code.
    pub city_code: String,
    /// Area code.
    pub area_code: String,
    /// Free-text street line.
    pub street_line: String,
    /// Optional postal code.
    pub postal_code: Option<String>,
    /// Optional landmark hint for the courier.
    pub landmark: Option<String>,
}

impl AddressInput {
    /// Creates input with the four mandatory fields.
    #[must_use]
    pub fn new(
        region_code: impl Into<String>,
        city_code: impl Into<String>,
        area_code: impl Into<String>,
        street_line: impl Into<String>,
    ) -> Self {
        Self {
            region_code: region_code.into(),
            city_code: city_code.into(),
            area_code: area_code.into(),
            street_line: street_line.into(),
            postal_code: None,
            landmark: None,
        }
    }

    /// Sets the postal code.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    /// Sets the landmark.
    #[must_use]
    pub fn with_landmark(mut self, landmark: impl Into<String>) -> Self {
        self.landmark = Some(landmark.into());
        self
    }
}

impl Address {
    /// Validates caller input into an address.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryValidationError::MissingAddressField`] naming the
    /// first of region, city, area, or street that is blank.
    pub fn new(input: AddressInput) -> Result<Self, DeliveryValidationError> {
        Ok(Self {
            region_code: required(input.region_code, "region code")?,
            city_code: required(input.city_code, "city code")?,
            area_code: required(input.area_code, "area code")?,
            street_line: required(input.street_line, "street line")?,
            postal_code: optional(input.postal_code),
            landmark: optional(input.landmark),
        })
    }

    /// Returns the region code.
    #[must_use]
    pub fn region_code(&self) -> &str {
        &self.region_code
    }

    /// Returns the city code.
    #[must_use]
    pub fn city_code(&self) -> &str {
        &self.city_code
    }

    /// Returns the area code.
    #[must_use]
    pub fn area_code(&self) -> &str {
        &self.area_code
    }

    /// Returns the street line.
    #[must_use]
    pub fn street_line(&self) -> &str {
        &self.street_line
    }

    /// Returns the postal code, if any.
    #[must_use]
    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    /// Returns the landmark, if any.
    #[must_use]
    pub fn landmark(&self) -> Option<&str> {
        self.landmark.as_deref()
    }

    /// Returns a copy with the street-level fields replaced.
    ///
    /// Region, city, and area codes are kept; only the street line,
    /// postal code, and landmark are corrected by residents.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryValidationError::MissingAddressField`] when the new
    /// street line is blank.
    pub fn with_corrected_street(
        &self,
        correction: StreetCorrection,
    ) -> Result<Self, DeliveryValidationError> {
        Ok(Self {
            street_line: required(correction.street_line, "street line")?,
            postal_code: optional(correction.postal_code).or_else(|| self.postal_code.clone()),
            landmark: optional(correction.landmark).or_else(|| self.landmark.clone()),
            ..self.clone()
        })
    }
}

/// Corrected street details supplied after a `wrong_address` failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreetCorrection {
    /// Replacement street line.
    pub street_line: String,
    /// Replacement postal code; keeps the old one when `None`.
    pub postal_code: Option<String>,
    /// Replacement landmark; keeps the old one when `None`.
    pub landmark: Option<String>,
}

impl StreetCorrection {
    /// Creates a correction with only a new street line.
    #[must_use]
    pub fn new(street_line: impl Into<String>) -> Self {
        Self {
            street_line: street_line.into(),
            postal_code: None,
            landmark: None,
        }
    }
}

fn required(value: String, field: &'static str) -> Result<String, DeliveryValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DeliveryValidationError::MissingAddressField(field));
    }
    Ok(trimmed.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}

/// Where the card ends up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    /// Courier delivery to a postal address.
    Delivery {
        /// Validated destination address.
        address: Address,
    },
    /// Collection at the municipal office.
    Pickup,
}

impl Destination {
    /// Returns the delivery type discriminator.
    #[must_use]
    pub const fn delivery_type(&self) -> DeliveryType {
        match self {
            Self::Delivery { .. } => DeliveryType::Delivery,
            Self::Pickup => DeliveryType::Pickup,
        }
    }

    /// Returns the courier address when this is a delivery.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        match self {
            Self::Delivery { address } => Some(address),
            Self::Pickup => None,
        }
    }
}

/// Resident scheduling preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPreferences {
    /// Preferred delivery date.
    pub preferred_date: Option<NaiveDate>,
    /// Preferred delivery window.
    pub time_slot: Option<TimeSlot>,
    /// Free-text notes for the courier.
    pub notes: Option<String>,
}

impl DeliveryPreferences {
    /// Creates preferences for a date and optional window.
    #[must_use]
    pub const fn on(preferred_date: NaiveDate, time_slot: Option<TimeSlot>) -> Self {
        Self {
            preferred_date: Some(preferred_date),
            time_slot,
            notes: None,
        }
    }

    /// Sets courier notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Opaque reference to a stored file (photo, signature image).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(String);

impl FileRef {
    /// Creates a validated file reference.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryValidationError::EmptyReference`] tagged with
    /// `kind` when the trimmed value is empty.
    pub fn new(
        value: impl Into<String>,
        kind: &'static str,
    ) -> Result<Self, DeliveryValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DeliveryValidationError::EmptyReference(kind));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the reference as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Evidence a resident submits when self-confirming receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEvidence {
    photo_proof: FileRef,
    signature: FileRef,
}

impl DeliveryEvidence {
    /// Creates validated delivery evidence.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryValidationError::EmptyReference`] when either
    /// reference is blank.
    pub fn new(
        photo_proof: impl Into<String>,
        signature: impl Into<String>,
    ) -> Result<Self, DeliveryValidationError> {
        Ok(Self {
            photo_proof: FileRef::new(photo_proof, "photo proof")?,
            signature: FileRef::new(signature, "signature")?,
        })
    }

    /// Stamps the evidence into a confirmation record.
    #[must_use]
    pub fn confirm_at(&self, confirmed_at: DateTime<Utc>) -> DeliveryConfirmation {
        DeliveryConfirmation {
            confirmed_at,
            photo_proof: self.photo_proof.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// Confirmation evidence stored once on self-confirmed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    /// When the resident confirmed receipt.
    pub confirmed_at: DateTime<Utc>,
    /// Photo proof of handover.
    pub photo_proof: FileRef,
    /// Recipient signature.
    pub signature: FileRef,
}
