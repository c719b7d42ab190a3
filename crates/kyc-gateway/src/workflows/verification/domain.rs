use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque identifier the vendor assigns to a submitted case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseReference(pub String);

impl fmt::Display for CaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer profile supplied by the caller. Never mutated by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub documents: Vec<IdentityDocument>,
}

impl Customer {
    /// Reject profiles that no vendor would accept as a case subject.
    pub fn validate(&self) -> Result<(), CustomerValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(CustomerValidationError::MissingField("first_name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(CustomerValidationError::MissingField("last_name"));
        }
        Ok(())
    }

    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().map(str::trim) {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Flatten the customer's documents into attachable evidence, skipping empty images.
    pub fn evidence(&self) -> Vec<Evidence> {
        self.documents
            .iter()
            .flat_map(|document| {
                [
                    (DocumentSide::Front, document.front.as_ref()),
                    (DocumentSide::Back, document.back.as_ref()),
                ]
                .into_iter()
                .filter_map(move |(side, image)| {
                    image.and_then(|image| Evidence::from_image(document, side, image))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomerValidationError {
    #[error("customer is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Postal address; `country` is an ISO 3166-1 alpha-3 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    pub town: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub street: String,
    #[serde(default)]
    pub building_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    IdCard,
    DrivingLicense,
    ResidencePermit,
    UtilityBill,
    Selfie,
    Other(String),
}

impl DocumentType {
    pub fn label(&self) -> &str {
        match self {
            DocumentType::Passport => "passport",
            DocumentType::IdCard => "id_card",
            DocumentType::DrivingLicense => "driving_license",
            DocumentType::ResidencePermit => "residence_permit",
            DocumentType::UtilityBill => "utility_bill",
            DocumentType::Selfie => "selfie",
            DocumentType::Other(label) => label.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    Front,
    Back,
}

impl DocumentSide {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentSide::Front => "front",
            DocumentSide::Back => "back",
        }
    }
}

/// Identity document with up to two scanned sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDocument {
    pub doc_type: DocumentType,
    pub country: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub front: Option<DocumentImage>,
    #[serde(default)]
    pub back: Option<DocumentImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentImage {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A single attachable piece of proof derived from an identity document.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub document_type: DocumentType,
    pub side: DocumentSide,
    pub country: String,
    pub number: Option<String>,
    pub filename: String,
    pub mime: mime::Mime,
    pub content: Vec<u8>,
}

impl Evidence {
    fn from_image(
        document: &IdentityDocument,
        side: DocumentSide,
        image: &DocumentImage,
    ) -> Option<Self> {
        if image.data.is_empty() {
            tracing::debug!(
                filename = %image.filename,
                doc_type = document.doc_type.label(),
                "skipping empty document image"
            );
            return None;
        }

        let mime = image
            .content_type
            .parse::<mime::Mime>()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);

        Some(Self {
            document_type: document.doc_type.clone(),
            side,
            country: document.country.clone(),
            number: document.number.clone(),
            filename: image.filename.clone(),
            mime,
            content: image.data.clone(),
        })
    }

    /// Human readable label used in logs and error messages.
    pub fn describe(&self) -> String {
        format!(
            "{} ({} {})",
            self.filename,
            self.document_type.label(),
            self.side.label()
        )
    }
}
