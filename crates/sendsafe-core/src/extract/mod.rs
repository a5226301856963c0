//! Line item extraction from NF-e/CT-e documents.
//!
//! Two fixed schemas are tried in order:
//! - the invoice schema, `det` elements with a nested `prod`;
//! - a generic schema of `item` elements, used only when the invoice schema
//!   yields nothing.
//!
//! Extraction never fails. Unparseable text or an unknown structure give an
//! empty list, which callers present as "no items found".

pub mod amounts;
mod tree;

pub use tree::{DocumentParser, Element, Node, XmlTreeParser};

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::config::ExtractionConfig;
use crate::models::line_item::LineItem;

/// Tag names of the invoice (NF-e) schema.
mod invoice_tags {
    pub const DETAIL: &str = "det";
    pub const PRODUCT: &str = "prod";
    pub const CODE: &str = "cProd";
    pub const DESCRIPTION: &str = "xProd";
    pub const NCM: &str = "NCM";
    pub const CFOP: &str = "CFOP";
    pub const UNIT: &str = "uCom";
    pub const QUANTITY: &str = "qCom";
    pub const UNIT_VALUE: &str = "vUnCom";
    pub const TOTAL_VALUE: &str = "vProd";
    pub const TAX_BASE: &str = "vBC";
    pub const ICMS: &str = "vICMS";
    pub const IPI: &str = "vIPI";
}

/// Tag names of the generic schema, as (first convention, second convention).
mod generic_tags {
    pub const ITEM: &str = "item";
    pub const DESCRIPTION: (&str, &str) = ("description", "descricao");
    pub const QUANTITY: (&str, &str) = ("quantity", "quantidade");
    pub const UNIT_VALUE: (&str, &str) = ("unitValue", "valorUnitario");
    pub const TOTAL_VALUE: (&str, &str) = ("totalValue", "valorTotal");
}

/// Which schema produced the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// `det`/`prod` invoice details.
    Invoice,
    /// Generic `item` elements.
    Generic,
}

/// Result of line item extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted items, in document order.
    pub items: Vec<LineItem>,
    /// Schema the items came from, `None` when nothing was found.
    pub schema: Option<Schema>,
    /// Problems met along the way.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Extracts line items from document text.
#[derive(Debug, Clone)]
pub struct LineItemExtractor<P = XmlTreeParser> {
    parser: P,
    default_unit: String,
    default_amount: String,
}

impl LineItemExtractor<XmlTreeParser> {
    /// Create an extractor using the built-in XML parser.
    pub fn new() -> Self {
        Self::with_parser(XmlTreeParser::new())
    }
}

impl Default for LineItemExtractor<XmlTreeParser> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: DocumentParser> LineItemExtractor<P> {
    /// Create an extractor with a custom parser.
    pub fn with_parser(parser: P) -> Self {
        let defaults = ExtractionConfig::default();
        Self {
            parser,
            default_unit: defaults.default_unit,
            default_amount: defaults.default_amount,
        }
    }

    /// Apply extraction defaults from configuration.
    pub fn with_config(mut self, config: &ExtractionConfig) -> Self {
        self.default_unit = config.default_unit.clone();
        self.default_amount = config.default_amount.clone();
        self
    }

    /// Extract line items. Never fails; see the module documentation.
    pub fn extract(&self, text: &str) -> Vec<LineItem> {
        self.extract_detailed(text).items
    }

    /// Extract line items and report how they were found.
    pub fn extract_detailed(&self, text: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut warnings = Vec::new();

        let root = match self.parser.parse(text) {
            Ok(root) => Some(root),
            Err(e) => {
                warn!("Document could not be parsed: {}", e);
                warnings.push(format!("document could not be parsed: {}", e));
                None
            }
        };

        let (items, schema) = match &root {
            Some(root) => {
                let primary = self.extract_invoice(root);
                if !primary.is_empty() {
                    (primary, Some(Schema::Invoice))
                } else {
                    debug!("No invoice details found, trying generic items");
                    let secondary = self.extract_generic(root);
                    let schema = (!secondary.is_empty()).then_some(Schema::Generic);
                    (secondary, schema)
                }
            }
            None => (Vec::new(), None),
        };

        if items.is_empty() {
            warnings.push("no line items found".to_string());
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} line items ({:?}) in {}ms",
            items.len(),
            schema,
            processing_time_ms
        );

        ExtractionResult {
            items,
            schema,
            warnings,
            processing_time_ms,
        }
    }

    fn or_default(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| self.default_amount.clone())
    }

    fn extract_invoice(&self, root: &Element) -> Vec<LineItem> {
        use invoice_tags::*;

        let mut items = Vec::new();

        for (position, detail) in root.find_all(DETAIL).into_iter().enumerate() {
            let Some(product) = detail.find(PRODUCT) else {
                debug!("Detail {} has no product element, skipping", position);
                continue;
            };
            let Some(description) = product.field(DESCRIPTION) else {
                debug!("Detail {} has no description, skipping", position);
                continue;
            };

            // Tax amounts live under `imposto`, a sibling of `prod`.
            let tax = |name: &str| product.field(name).or_else(|| detail.field(name));

            items.push(LineItem {
                index: items.len() as u32,
                code: product.field(CODE).unwrap_or_default(),
                description,
                tax_code: product.field(NCM).unwrap_or_default(),
                operation_code: product.field(CFOP).unwrap_or_default(),
                unit: product
                    .field(UNIT)
                    .unwrap_or_else(|| self.default_unit.clone()),
                quantity: self.or_default(product.field(QUANTITY)),
                unit_value: self.or_default(product.field(UNIT_VALUE)),
                total_value: self.or_default(product.field(TOTAL_VALUE)),
                tax_base_value: self.or_default(tax(TAX_BASE)),
                icms_value: self.or_default(tax(ICMS)),
                ipi_value: self.or_default(tax(IPI)),
            });
        }

        items
    }

    fn extract_generic(&self, root: &Element) -> Vec<LineItem> {
        use generic_tags::*;

        let either = |item: &Element, (first, second): (&str, &str)| {
            item.field(first).or_else(|| item.field(second))
        };

        let mut items = Vec::new();

        for item in root.find_all(ITEM) {
            let Some(description) = either(item, DESCRIPTION) else {
                continue;
            };

            let index = items.len() as u32;
            items.push(LineItem {
                index,
                code: format!("ITEM_{}", index + 1),
                description,
                quantity: self.or_default(either(item, QUANTITY)),
                unit_value: self.or_default(either(item, UNIT_VALUE)),
                total_value: self.or_default(either(item, TOTAL_VALUE)),
                tax_base_value: self.default_amount.clone(),
                icms_value: self.default_amount.clone(),
                ipi_value: self.default_amount.clone(),
                unit: self.default_unit.clone(),
                ..LineItem::blank(index)
            });
        }

        items
    }
}
