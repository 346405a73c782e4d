//! Asset inventory records as they come out of the record store.
//!
//! Stored documents are loosely typed: the same field may hold a string in one
//! document and a number in the next, and any field may be missing.  [`Record`]
//! accepts all of those shapes during deserialization and exposes typed
//! accessors on top, with the zero-default policy for amounts defined once in
//! [`parse_amount`].

use std::fmt;
use std::str::FromStr;

use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Grouping key used for records without a cost center.
pub const UNASSIGNED_COST_CENTER: &str = "Unassigned";

/// Maximum number of images stored on a single record.
pub const MAX_RECORD_IMAGES: usize = 3;

const DATA_URI_IMAGE_PREFIX: &str = "data:image";

/// One asset of the inventory.
///
/// Field names on the wire follow the stored documents (`placa`, `nome`,
/// `valorAtual`, ...).  Amounts are kept in their raw textual form and only
/// turned into decimals through [`Record::current_value`] and
/// [`Record::market_value`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "placa", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    plate: Option<String>,
    #[serde(rename = "nome", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "descricao", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "conservacao", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    conservation_state: Option<String>,
    #[serde(rename = "valorAtual", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    current_value: Option<String>,
    #[serde(rename = "valorMercado", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    market_value: Option<String>,
    #[serde(rename = "centroCusto", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    cost_center: Option<String>,
    #[serde(rename = "imgBlob", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    image_1: Option<String>,
    #[serde(rename = "imgBlob_02", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    image_2: Option<String>,
    #[serde(rename = "imgBlob_03", default, deserialize_with = "loose_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    image_3: Option<String>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object, accepting the loose field types of the store.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn plate(&self) -> Option<&str> {
        self.plate.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn conservation_state(&self) -> Option<&str> {
        self.conservation_state.as_deref()
    }

    /// Returns the cost center exactly as stored, if any.
    pub fn cost_center(&self) -> Option<&str> {
        self.cost_center.as_deref()
    }

    /// Returns the grouping key: the stored cost center, or
    /// [`UNASSIGNED_COST_CENTER`] when it is missing or blank.
    pub fn cost_center_key(&self) -> &str {
        match self.cost_center.as_deref() {
            Some(value) if !value.trim().is_empty() => value,
            _ => UNASSIGNED_COST_CENTER,
        }
    }

    /// Parsed current value; missing or malformed input counts as zero.
    pub fn current_value(&self) -> Decimal {
        parse_amount(self.current_value.as_deref())
    }

    /// Parsed market value; missing or malformed input counts as zero.
    pub fn market_value(&self) -> Decimal {
        parse_amount(self.market_value.as_deref())
    }

    /// Returns the non-empty image payloads in storage order.
    pub fn images(&self) -> Vec<ImagePayload<'_>> {
        [&self.image_1, &self.image_2, &self.image_3]
            .into_iter()
            .filter_map(|slot| slot.as_deref())
            .filter(|raw| !raw.trim().is_empty())
            .map(ImagePayload::new)
            .collect()
    }

    pub fn with_plate(mut self, plate: impl Into<String>) -> Self {
        self.plate = Some(plate.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_conservation_state(mut self, state: impl Into<String>) -> Self {
        self.conservation_state = Some(state.into());
        self
    }

    pub fn with_current_value(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }

    pub fn with_market_value(mut self, value: impl Into<String>) -> Self {
        self.market_value = Some(value.into());
        self
    }

    pub fn with_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = Some(cost_center.into());
        self
    }

    /// Stores `payload` in the first free image slot.  Payloads beyond
    /// [`MAX_RECORD_IMAGES`] are ignored.
    pub fn with_image(mut self, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        for slot in [&mut self.image_1, &mut self.image_2, &mut self.image_3] {
            if slot.is_none() {
                *slot = Some(payload);
                break;
            }
        }
        self
    }
}

/// Parses a stored amount into a decimal.
///
/// Plain decimals (`"10.5"`, `" 20 "`, `"-3"`) and scientific notation
/// (`"1e3"`) are accepted.  Missing, blank or otherwise unparsable input is
/// zero; this never fails.
pub fn parse_amount(raw: Option<&str>) -> Decimal {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Decimal::ZERO;
    };

    match Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
        Ok(value) => value,
        Err(err) => {
            debug!("Treating unparsable amount {:?} as zero: {}", raw, err);
            Decimal::ZERO
        }
    }
}

/// An encoded image attached to a record.
///
/// Payloads are base64 data, optionally preceded by a data URI header such as
/// `data:image/png;base64,`.  The header, when present, is the format marker
/// used to pick a decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImagePayload<'a> {
    marker: Option<&'a str>,
    data: &'a str,
}

impl<'a> ImagePayload<'a> {
    /// Splits a raw stored payload into its optional marker and data part.
    pub fn new(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with(DATA_URI_IMAGE_PREFIX) {
            if let Some((header, data)) = trimmed.split_once(',') {
                return Self {
                    marker: Some(header),
                    data,
                };
            }
        }

        Self {
            marker: None,
            data: trimmed,
        }
    }

    /// Returns the data URI header, e.g. `data:image/png;base64`.
    pub fn marker(&self) -> Option<&'a str> {
        self.marker
    }

    /// Returns the encoded image data without the marker.
    pub fn data(&self) -> &'a str {
        self.data
    }
}

/// Which records a report covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportScope {
    /// Every record in the store, grouped by cost center.
    All,
    /// Only the records of one cost center.
    CostCenter(String),
}

impl ReportScope {
    /// Title printed at the top of the document.
    pub fn title(&self) -> String {
        match self {
            Self::All => "Relatório Geral de Ativos".to_string(),
            Self::CostCenter(id) => format!("Relatório de Ativos - {id}"),
        }
    }

    /// File name used when the document is delivered.
    pub fn file_name(&self) -> String {
        match self {
            Self::All => "relatorio.pdf".to_string(),
            Self::CostCenter(id) => format!("relatorio-{}.pdf", sanitize_file_component(id)),
        }
    }

    /// Whether the grand-total section is printed after the groups.
    ///
    /// A scoped report has a single group whose subtotal already is the total.
    pub fn includes_grand_total(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all cost centers"),
            Self::CostCenter(id) => write!(f, "cost center {id}"),
        }
    }
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_` so caller
/// supplied identifiers cannot escape the output directory.
pub fn sanitize_file_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|ch| ch == '.') {
        "_".repeat(sanitized.len().max(1))
    } else {
        sanitized
    }
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) | None => None,
    })
}
