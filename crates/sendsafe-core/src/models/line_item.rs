//! Line items ("products") extracted from NF-e/CT-e documents.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::extract::amounts::parse_amount;

/// Unit used when a document does not state one.
pub const DEFAULT_UNIT: &str = "UN";

/// Value used for absent quantities and amounts.
pub const DEFAULT_AMOUNT: &str = "0";

/// One line of an invoice document.
///
/// Quantities and amounts stay as the text found in the document so that
/// saving an edited set never reformats the original representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Zero-based position within the edit session.
    pub index: u32,

    /// Product code (cProd), or a synthesized `ITEM_<n>`.
    #[serde(default)]
    pub code: String,

    /// Product description (xProd).
    pub description: String,

    /// NCM tax classification.
    #[serde(default, alias = "ncm")]
    pub tax_code: String,

    /// CFOP operation code.
    #[serde(default, alias = "cfop")]
    pub operation_code: String,

    /// Commercial unit.
    #[serde(default = "default_unit")]
    pub unit: String,

    #[serde(default = "default_amount")]
    pub quantity: String,

    #[serde(default = "default_amount")]
    pub unit_value: String,

    #[serde(default = "default_amount")]
    pub total_value: String,

    /// ICMS calculation base (vBC).
    #[serde(default = "default_amount")]
    pub tax_base_value: String,

    #[serde(default = "default_amount")]
    pub icms_value: String,

    #[serde(default = "default_amount")]
    pub ipi_value: String,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn default_amount() -> String {
    DEFAULT_AMOUNT.to_string()
}

impl LineItem {
    /// A line item with every field at its default.
    pub fn blank(index: u32) -> Self {
        Self {
            index,
            code: String::new(),
            description: String::new(),
            tax_code: String::new(),
            operation_code: String::new(),
            unit: default_unit(),
            quantity: default_amount(),
            unit_value: default_amount(),
            total_value: default_amount(),
            tax_base_value: default_amount(),
            icms_value: default_amount(),
            ipi_value: default_amount(),
        }
    }

    /// Read a single field as text.
    pub fn field(&self, field: LineItemField) -> &str {
        match field {
            LineItemField::Code => &self.code,
            LineItemField::Description => &self.description,
            LineItemField::TaxCode => &self.tax_code,
            LineItemField::OperationCode => &self.operation_code,
            LineItemField::Unit => &self.unit,
            LineItemField::Quantity => &self.quantity,
            LineItemField::UnitValue => &self.unit_value,
            LineItemField::TotalValue => &self.total_value,
            LineItemField::TaxBaseValue => &self.tax_base_value,
            LineItemField::IcmsValue => &self.icms_value,
            LineItemField::IpiValue => &self.ipi_value,
        }
    }

    /// Replace a single field.
    pub fn set_field(&mut self, field: LineItemField, value: impl Into<String>) {
        let slot = match field {
            LineItemField::Code => &mut self.code,
            LineItemField::Description => &mut self.description,
            LineItemField::TaxCode => &mut self.tax_code,
            LineItemField::OperationCode => &mut self.operation_code,
            LineItemField::Unit => &mut self.unit,
            LineItemField::Quantity => &mut self.quantity,
            LineItemField::UnitValue => &mut self.unit_value,
            LineItemField::TotalValue => &mut self.total_value,
            LineItemField::TaxBaseValue => &mut self.tax_base_value,
            LineItemField::IcmsValue => &mut self.icms_value,
            LineItemField::IpiValue => &mut self.ipi_value,
        };
        *slot = value.into();
    }
}

/// Editable fields of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineItemField {
    Code,
    Description,
    TaxCode,
    OperationCode,
    Unit,
    Quantity,
    UnitValue,
    TotalValue,
    TaxBaseValue,
    IcmsValue,
    IpiValue,
}

impl LineItemField {
    pub const ALL: [LineItemField; 11] = [
        LineItemField::Code,
        LineItemField::Description,
        LineItemField::TaxCode,
        LineItemField::OperationCode,
        LineItemField::Unit,
        LineItemField::Quantity,
        LineItemField::UnitValue,
        LineItemField::TotalValue,
        LineItemField::TaxBaseValue,
        LineItemField::IcmsValue,
        LineItemField::IpiValue,
    ];

    /// Wire name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            LineItemField::Code => "code",
            LineItemField::Description => "description",
            LineItemField::TaxCode => "taxCode",
            LineItemField::OperationCode => "operationCode",
            LineItemField::Unit => "unit",
            LineItemField::Quantity => "quantity",
            LineItemField::UnitValue => "unitValue",
            LineItemField::TotalValue => "totalValue",
            LineItemField::TaxBaseValue => "taxBaseValue",
            LineItemField::IcmsValue => "icmsValue",
            LineItemField::IpiValue => "ipiValue",
        }
    }
}

impl fmt::Display for LineItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LineItemField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        // Accept the NF-e tag names as well.
        let alias = match wanted.to_ascii_lowercase().as_str() {
            "ncm" => Some(LineItemField::TaxCode),
            "cfop" => Some(LineItemField::OperationCode),
            "cprod" => Some(LineItemField::Code),
            "xprod" => Some(LineItemField::Description),
            _ => None,
        };

        alias
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|f| f.name().eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| ValidationError::UnknownField(wanted.to_string()))
    }
}

/// Totals computed over a set of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemTotals {
    pub total_value: Decimal,
    pub icms_value: Decimal,
    pub ipi_value: Decimal,
    /// Items whose amounts could not be read as numbers.
    pub unparsed: usize,
}

/// An edit session over the line items of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemSet {
    items: Vec<LineItem>,
}

impl LineItemSet {
    pub fn new(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&LineItem> {
        self.items.iter().find(|item| item.index == index)
    }

    /// Append a blank item and return it.
    ///
    /// The new index is the current length, unless an earlier removal left
    /// that value in use; then it is one past the highest index.
    pub fn add(&mut self) -> &LineItem {
        let len = self.items.len() as u32;
        let index = if self.get(len).is_some() {
            self.items.iter().map(|i| i.index).max().map_or(len, |m| m + 1)
        } else {
            len
        };
        self.items.push(LineItem::blank(index));
        &self.items[self.items.len() - 1]
    }

    /// Replace one field of the item with the given index.
    pub fn set_field(
        &mut self,
        index: u32,
        field: LineItemField,
        value: impl Into<String>,
    ) -> Result<&LineItem, ValidationError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.index == index)
            .ok_or(ValidationError::ItemNotFound(index))?;
        item.set_field(field, value);
        Ok(item)
    }

    /// Remove the item with the given index.
    pub fn remove(&mut self, index: u32) -> Result<LineItem, ValidationError> {
        let pos = self
            .items
            .iter()
            .position(|item| item.index == index)
            .ok_or(ValidationError::ItemNotFound(index))?;
        Ok(self.items.remove(pos))
    }

    /// Check that no two items share an index.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.index) {
                return Err(ValidationError::DuplicateIndex(item.index));
            }
        }
        Ok(())
    }

    /// Sum total, ICMS and IPI values.
    pub fn totals(&self) -> LineItemTotals {
        let mut totals = LineItemTotals::default();

        for item in &self.items {
            let amounts = (
                parse_amount(&item.total_value),
                parse_amount(&item.icms_value),
                parse_amount(&item.ipi_value),
            );
            match amounts {
                (Some(total), Some(icms), Some(ipi)) => {
                    totals.total_value += total;
                    totals.icms_value += icms;
                    totals.ipi_value += ipi;
                }
                _ => totals.unparsed += 1,
            }
        }

        totals
    }
}

impl From<Vec<LineItem>> for LineItemSet {
    fn from(items: Vec<LineItem>) -> Self {
        Self::new(items)
    }
}
