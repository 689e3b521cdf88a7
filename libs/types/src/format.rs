//! Flat and keyed item representations
//!
//! Storage and response layers exchange items either as positional rows or as records keyed by
//! field name. An [`ItemFormat`] is the ordered field list both forms agree on; converting rows
//! to records and back is lossless for items fully covered by the list.

use serde_json::{Map, Value};

use crate::endpoint::Endpoint;
use crate::error::TypesError;
use crate::items::Item;
use crate::params::ParamName;

/// Field-keyed representation of one item
pub type Record = Map<String, Value>;
/// Positional representation of one item
pub type Row = Vec<Value>;

/// Ordered field list shared by the row and record forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFormat {
    fields: Vec<ParamName>,
}

impl ItemFormat {
    pub fn new(fields: Vec<ParamName>) -> Self {
        Self { fields }
    }

    /// Standard format of an endpoint's items, where one is defined
    pub fn for_endpoint(endpoint: Endpoint) -> Option<Self> {
        match endpoint {
            Endpoint::Trade | Endpoint::TradeHistory => Some(Self::new(vec![
                ParamName::PlatformId,
                ParamName::Symbol,
                ParamName::Timestamp,
                ParamName::ItemId,
                ParamName::Price,
                ParamName::Amount,
                ParamName::Direction,
            ])),
            Endpoint::Candle => Some(Self::new(vec![
                ParamName::PlatformId,
                ParamName::Symbol,
                ParamName::Timestamp,
                ParamName::Interval,
                ParamName::PriceOpen,
                ParamName::PriceHigh,
                ParamName::PriceLow,
                ParamName::PriceClose,
                ParamName::Amount,
                ParamName::TradesCount,
            ])),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[ParamName] {
        &self.fields
    }

    pub fn to_row(&self, item: &Item) -> Row {
        self.fields
            .iter()
            .map(|name| item.field(name).unwrap_or(Value::Null))
            .collect()
    }

    pub fn to_record(&self, item: &Item) -> Record {
        self.fields
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    item.field(name).unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    pub fn to_rows(&self, items: &[Item]) -> Vec<Row> {
        items.iter().map(|item| self.to_row(item)).collect()
    }

    pub fn to_records(&self, items: &[Item]) -> Vec<Record> {
        items.iter().map(|item| self.to_record(item)).collect()
    }

    /// Positional rows to keyed records; every row must have one value per field
    pub fn rows_to_records(&self, rows: &[Row]) -> Result<Vec<Record>, TypesError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.fields.len() {
                    return Err(TypesError::RowLength {
                        expected: self.fields.len(),
                        found: row.len(),
                    });
                }
                Ok(self
                    .fields
                    .iter()
                    .zip(row)
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect())
            })
            .collect()
    }

    /// Keyed records to positional rows; missing keys become `null`
    pub fn records_to_rows(&self, records: &[Record]) -> Vec<Row> {
        records
            .iter()
            .map(|record| {
                self.fields
                    .iter()
                    .map(|name| record.get(name.as_str()).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }
}
