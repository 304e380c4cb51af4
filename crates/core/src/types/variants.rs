//! Variant stock mapping (`color -> size -> available units`).
//!
//! Products keep their per-variant inventory as JSON text. The stored shape is
//! loose: quantities may be numbers or numeric strings, and older rows hold
//! the whole document double-encoded as a JSON string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors raised while reading or adjusting variant stock.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("variants are not valid JSON: {0}")]
    Malformed(String),

    #[error("variants must be a JSON object of colors")]
    NotAnObject,

    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i32),

    #[error("insufficient stock for {color}/{size}: {available} available, {requested} requested")]
    Insufficient {
        color: String,
        size: String,
        available: i32,
        requested: i32,
    },
}

/// Per-product inventory keyed by color, then size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantStock(BTreeMap<String, BTreeMap<String, i32>>);

impl VariantStock {
    /// Parse stored variants text.
    ///
    /// Sizes whose quantity is not a number (or numeric string) count as zero.
    ///
    /// # Errors
    ///
    /// Returns `StockError::Malformed` for invalid JSON and
    /// `StockError::NotAnObject` when the document is not a color map.
    pub fn parse(raw: &str) -> Result<Self, StockError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let mut value: Value =
            serde_json::from_str(trimmed).map_err(|e| StockError::Malformed(e.to_string()))?;

        // double-encoded
        if let Value::String(inner) = &value {
            value =
                serde_json::from_str(inner).map_err(|e| StockError::Malformed(e.to_string()))?;
        }

        let Value::Object(colors) = value else {
            return Err(StockError::NotAnObject);
        };

        let mut stock = BTreeMap::new();
        for (color, sizes) in colors {
            let Value::Object(sizes) = sizes else {
                return Err(StockError::NotAnObject);
            };
            let sizes = sizes
                .into_iter()
                .map(|(size, qty)| (size, quantity_from_value(&qty)))
                .collect();
            stock.insert(color, sizes);
        }

        Ok(Self(stock))
    }

    /// Units available for a color/size pair, zero when absent.
    #[must_use]
    pub fn available(&self, color: &str, size: &str) -> i32 {
        self.0
            .get(color)
            .and_then(|sizes| sizes.get(size))
            .copied()
            .unwrap_or(0)
    }

    /// Remove `quantity` units from a variant and return what remains.
    ///
    /// # Errors
    ///
    /// Returns `StockError::InvalidQuantity` for non-positive quantities and
    /// `StockError::Insufficient` when the variant cannot cover the request.
    /// The mapping is left untouched on error.
    pub fn decrement(&mut self, color: &str, size: &str, quantity: i32) -> Result<i32, StockError> {
        if quantity < 1 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        let available = self.available(color, size);
        if available < quantity {
            return Err(StockError::Insufficient {
                color: color.to_owned(),
                size: size.to_owned(),
                available,
                requested: quantity,
            });
        }

        let remaining = available - quantity;
        self.0
            .entry(color.to_owned())
            .or_default()
            .insert(size.to_owned(), remaining);
        Ok(remaining)
    }

    /// Sum of units across every variant.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.0
            .values()
            .flat_map(BTreeMap::values)
            .map(|&qty| i64::from(qty.max(0)))
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize back to the stored JSON text form.
    #[must_use]
    pub fn to_json(&self) -> String {
        Value::from(
            self.0
                .iter()
                .map(|(color, sizes)| {
                    let sizes = sizes
                        .iter()
                        .map(|(size, qty)| (size.clone(), Value::from(*qty)))
                        .collect::<serde_json::Map<_, _>>();
                    (color.clone(), Value::Object(sizes))
                })
                .collect::<serde_json::Map<_, _>>(),
        )
        .to_string()
    }
}

#[allow(clippy::cast_possible_truncation)] // floor of a stock count, saturated below
fn quantity_from_value(value: &Value) -> i32 {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    raw.map_or(0, |n| {
        i32::try_from(n).unwrap_or(if n < 0 { i32::MIN } else { i32::MAX })
    })
}
