//! # Catalogs
//!
//! Closed code lists used by the pipeline: the authority environment, the
//! flow direction of a run, and the document type codes. Every `match` over
//! these enums is exhaustive so that adding a code forces each consumer to
//! decide how to handle it.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// -- Environment -------------------------------------------------------------

/// Authority environment a document is issued against (`ambiente`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Environment {
    /// Test environment, code `00`.
    #[default]
    #[serde(rename = "00")]
    Sandbox,
    /// Production environment, code `01`.
    #[serde(rename = "01")]
    Production,
}

impl Environment {
    /// The two-digit code carried in the document.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sandbox => "00",
            Self::Production => "01",
        }
    }

    /// Lowercase name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }

    /// Parse either the document code or a mode name.
    ///
    /// Accepts `00`/`sandbox`/`test` and `01`/`prod`/`production`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "00" | "sandbox" | "test" => Ok(Self::Sandbox),
            "01" | "prod" | "production" => Ok(Self::Production),
            _ => Err(ValidationError::UnknownEnvironment(value.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// -- FlowType ----------------------------------------------------------------

/// Direction of a run: documents the business issues, or documents it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    /// Issued by the business. Validated, signed and transmitted; adds tax debit.
    #[default]
    Emission,
    /// Issued by a counterparty. Booked only; may add tax credit.
    Reception,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emission => "emission",
            Self::Reception => "reception",
        }
    }
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- DocumentType ------------------------------------------------------------

/// Document type (`tipoDte`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentType {
    /// 01: consumer invoice.
    Invoice,
    /// 03: tax credit voucher.
    TaxCreditVoucher,
    /// 04: delivery note.
    DeliveryNote,
    /// 05: credit note.
    CreditNote,
    /// 06: debit note.
    DebitNote,
    /// 07: withholding voucher.
    WithholdingVoucher,
    /// 08: settlement voucher.
    SettlementVoucher,
    /// 09: accounting settlement document.
    AccountingSettlement,
    /// 11: export invoice.
    ExportInvoice,
    /// 14: excluded-subject invoice.
    ExcludedSubjectInvoice,
    /// 15: donation voucher.
    DonationVoucher,
}

impl DocumentType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invoice => "01",
            Self::TaxCreditVoucher => "03",
            Self::DeliveryNote => "04",
            Self::CreditNote => "05",
            Self::DebitNote => "06",
            Self::WithholdingVoucher => "07",
            Self::SettlementVoucher => "08",
            Self::AccountingSettlement => "09",
            Self::ExportInvoice => "11",
            Self::ExcludedSubjectInvoice => "14",
            Self::DonationVoucher => "15",
        }
    }

    /// Parse a two-digit code.
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        match code {
            "01" => Ok(Self::Invoice),
            "03" => Ok(Self::TaxCreditVoucher),
            "04" => Ok(Self::DeliveryNote),
            "05" => Ok(Self::CreditNote),
            "06" => Ok(Self::DebitNote),
            "07" => Ok(Self::WithholdingVoucher),
            "08" => Ok(Self::SettlementVoucher),
            "09" => Ok(Self::AccountingSettlement),
            "11" => Ok(Self::ExportInvoice),
            "14" => Ok(Self::ExcludedSubjectInvoice),
            "15" => Ok(Self::DonationVoucher),
            other => Err(ValidationError::UnknownDocumentType(other.to_string())),
        }
    }

    /// Received documents of this type produce fiscal credit.
    pub fn is_credit_eligible(&self) -> bool {
        matches!(
            self,
            Self::TaxCreditVoucher | Self::CreditNote | Self::ExcludedSubjectInvoice
        )
    }

    /// Received documents of this type carry VAT withheld by the counterparty.
    pub fn is_withholding(&self) -> bool {
        matches!(self, Self::WithholdingVoucher)
    }

    pub fn all() -> &'static [DocumentType] {
        &[
            Self::Invoice,
            Self::TaxCreditVoucher,
            Self::DeliveryNote,
            Self::CreditNote,
            Self::DebitNote,
            Self::WithholdingVoucher,
            Self::SettlementVoucher,
            Self::AccountingSettlement,
            Self::ExportInvoice,
            Self::ExcludedSubjectInvoice,
            Self::DonationVoucher,
        ]
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for DocumentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_code(&raw).map_err(serde::de::Error::custom)
    }
}
