//! Canonical accounting fields.
//!
//! The catalog is closed: every header is mapped onto one of the seventeen
//! identifiers below or left unmapped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::knowledge::Extensions;
use crate::synonym::SynonymEntry;

/// Identifier of a canonical accounting field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    JournalEntryId,
    LineNumber,
    Description,
    LineDescription,
    PostingDate,
    FiscalYear,
    PeriodNumber,
    GlAccountNumber,
    Amount,
    DebitAmount,
    CreditAmount,
    DebitCreditIndicator,
    PreparedBy,
    EntryDate,
    EntryTime,
    GlAccountName,
    VendorId,
}

impl FieldId {
    /// All canonical fields in catalog order.
    pub const ALL: [FieldId; 17] = [
        Self::JournalEntryId,
        Self::LineNumber,
        Self::Description,
        Self::LineDescription,
        Self::PostingDate,
        Self::FiscalYear,
        Self::PeriodNumber,
        Self::GlAccountNumber,
        Self::Amount,
        Self::DebitAmount,
        Self::CreditAmount,
        Self::DebitCreditIndicator,
        Self::PreparedBy,
        Self::EntryDate,
        Self::EntryTime,
        Self::GlAccountName,
        Self::VendorId,
    ];

    /// The persisted identifier, e.g. `journal_entry_id`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JournalEntryId => "journal_entry_id",
            Self::LineNumber => "line_number",
            Self::Description => "description",
            Self::LineDescription => "line_description",
            Self::PostingDate => "posting_date",
            Self::FiscalYear => "fiscal_year",
            Self::PeriodNumber => "period_number",
            Self::GlAccountNumber => "gl_account_number",
            Self::Amount => "amount",
            Self::DebitAmount => "debit_amount",
            Self::CreditAmount => "credit_amount",
            Self::DebitCreditIndicator => "debit_credit_indicator",
            Self::PreparedBy => "prepared_by",
            Self::EntryDate => "entry_date",
            Self::EntryTime => "entry_time",
            Self::GlAccountName => "gl_account_name",
            Self::VendorId => "vendor_id",
        }
    }

    /// Default display name used when seeding a catalog.
    pub fn default_display_name(&self) -> &'static str {
        match self {
            Self::JournalEntryId => "Journal Entry ID",
            Self::LineNumber => "Line Number",
            Self::Description => "Description",
            Self::LineDescription => "Line Description",
            Self::PostingDate => "Posting Date",
            Self::FiscalYear => "Fiscal Year",
            Self::PeriodNumber => "Period Number",
            Self::GlAccountNumber => "GL Account Number",
            Self::Amount => "Amount",
            Self::DebitAmount => "Debit Amount",
            Self::CreditAmount => "Credit Amount",
            Self::DebitCreditIndicator => "Debit/Credit Indicator",
            Self::PreparedBy => "Prepared By",
            Self::EntryDate => "Entry Date",
            Self::EntryTime => "Entry Time",
            Self::GlAccountName => "GL Account Name",
            Self::VendorId => "Vendor ID",
        }
    }

    /// Default data type used when seeding a catalog.
    pub fn default_data_type(&self) -> DataType {
        match self {
            Self::LineNumber
            | Self::FiscalYear
            | Self::PeriodNumber
            | Self::Amount
            | Self::DebitAmount
            | Self::CreditAmount => DataType::Numeric,
            Self::PostingDate | Self::EntryDate => DataType::Date,
            Self::DebitCreditIndicator => DataType::Enum,
            _ => DataType::Alphanumeric,
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ModelError::UnknownField(s.to_string()))
    }
}

/// Data type tag of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Numeric,
    Date,
    Alphanumeric,
    Enum,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Alphanumeric => "alphanumeric",
            Self::Enum => "enum",
        }
    }
}

impl FromStr for DataType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" | "currency" => Ok(Self::Numeric),
            "date" => Ok(Self::Date),
            "alphanumeric" | "text" | "string" => Ok(Self::Alphanumeric),
            "enum" => Ok(Self::Enum),
            _ => Err(ModelError::UnknownDataType(s.to_string())),
        }
    }
}

/// A canonical field together with the synonyms learned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: FieldId,
    /// Display name, also matched as a canonical name.
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    /// Inactive fields never produce candidates.
    pub active: bool,
    /// Synonyms ordered by ERP name, insertion order within an ERP.
    pub synonyms: Vec<SynonymEntry>,
    /// Keys the document carried that this version does not interpret.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl FieldDefinition {
    /// Create an active definition with the default name and data type.
    pub fn new(id: FieldId) -> Self {
        Self {
            id,
            name: id.default_display_name().to_string(),
            description: String::new(),
            data_type: id.default_data_type(),
            active: true,
            synonyms: Vec::new(),
            extensions: Extensions::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Synonyms registered for one ERP (case-insensitive ERP name).
    pub fn synonyms_for<'a>(&'a self, erp: &'a str) -> impl Iterator<Item = &'a SynonymEntry> {
        self.synonyms
            .iter()
            .filter(move |s| s.erp_name.eq_ignore_ascii_case(erp))
    }

    /// Insert keeping entries grouped and ordered by ERP name.
    pub(crate) fn insert_synonym(&mut self, entry: SynonymEntry) {
        let position = self
            .synonyms
            .iter()
            .rposition(|s| s.erp_name <= entry.erp_name)
            .map_or(0, |idx| idx + 1);
        self.synonyms.insert(position, entry);
    }
}
