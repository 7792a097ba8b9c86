//! The structured knowledge base learned about the user.
//!
//! These are the value objects at the heart of the learning loop:
//! the model emits a `FactDelta` (untrusted candidate values), the merge
//! engine folds the valid subset into the canonical `KnowledgeRecord`, and
//! the accepted differences come back out as a `ChangeSet` for the caller
//! to surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum stored length of any field value, in characters, after trimming.
pub const MAX_VALUE_LEN: usize = 80;

/// The closed set of car-transaction attributes the assistant tracks.
///
/// Declaration order is the canonical merge order — `BTreeMap` iteration and
/// the merge engine both follow it, which keeps every observable iteration
/// deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum TrackedField {
    Intent,
    Budget,
    CarType,
    Make,
    Model,
    Year,
    Mileage,
    Condition,
    Timeline,
    Location,
    TradeIn,
    Financing,
    SellerAsk,
    Recipient,
}

impl TrackedField {
    /// All tracked fields, in canonical order.
    pub const ALL: [TrackedField; 14] = [
        TrackedField::Intent,
        TrackedField::Budget,
        TrackedField::CarType,
        TrackedField::Make,
        TrackedField::Model,
        TrackedField::Year,
        TrackedField::Mileage,
        TrackedField::Condition,
        TrackedField::Timeline,
        TrackedField::Location,
        TrackedField::TradeIn,
        TrackedField::Financing,
        TrackedField::SellerAsk,
        TrackedField::Recipient,
    ];

    /// The wire name of this field (the JSON key in deltas and stores).
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Intent => "intent",
            TrackedField::Budget => "budget",
            TrackedField::CarType => "carType",
            TrackedField::Make => "make",
            TrackedField::Model => "model",
            TrackedField::Year => "year",
            TrackedField::Mileage => "mileage",
            TrackedField::Condition => "condition",
            TrackedField::Timeline => "timeline",
            TrackedField::Location => "location",
            TrackedField::TradeIn => "tradeIn",
            TrackedField::Financing => "financing",
            TrackedField::SellerAsk => "sellerAsk",
            TrackedField::Recipient => "recipient",
        }
    }

    /// Look up a field by its exact wire name. Unknown keys return `None` —
    /// this is the allowlist-by-construction the merge engine relies on.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }

    /// For enum-typed fields, the fixed set of allowed values (already
    /// lower-case). Free-text fields return `None`.
    pub fn allowed_values(&self) -> Option<&'static [&'static str]> {
        match self {
            TrackedField::Intent => Some(&["buy", "sell"]),
            TrackedField::TradeIn | TrackedField::Financing => Some(&["yes", "no"]),
            _ => None,
        }
    }

    /// Human-readable label for notifications.
    pub fn label(&self) -> &'static str {
        match self {
            TrackedField::Intent => "Intent",
            TrackedField::Budget => "Budget",
            TrackedField::CarType => "Car type",
            TrackedField::Make => "Make",
            TrackedField::Model => "Model",
            TrackedField::Year => "Year",
            TrackedField::Mileage => "Mileage",
            TrackedField::Condition => "Condition",
            TrackedField::Timeline => "Timeline",
            TrackedField::Location => "Location",
            TrackedField::TradeIn => "Trade-in",
            TrackedField::Financing => "Financing",
            TrackedField::SellerAsk => "Asking price",
            TrackedField::Recipient => "Recipient",
        }
    }
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The canonical record of everything known about the user so far.
///
/// Monotonically accreting: values survive until explicitly overwritten by
/// a newer accepted value, and the record only empties via an explicit
/// reset. Mutated exclusively by the merge engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeRecord(BTreeMap<TrackedField, String>);

impl KnowledgeRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current value for a field, if set.
    pub fn get(&self, field: TrackedField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Set a field's value. Only the merge engine (and tests) should call
    /// this.
    pub fn set(&mut self, field: TrackedField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    /// Whether nothing is known yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with a known value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over known fields in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackedField, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// Render the known, non-empty fields as `name: value` lines for
    /// injection into the system context. Empty string when nothing is
    /// known.
    pub fn render(&self) -> String {
        self.iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(f, v)| format!("  {}: {}", f.as_str(), v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An untrusted set of candidate field values extracted from one model
/// response. Transient — only its validated subset ever survives, inside
/// the `KnowledgeRecord`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactDelta(serde_json::Map<String, serde_json::Value>);

impl FactDelta {
    /// Build a delta from a parsed JSON value. Returns `None` unless the
    /// value is an object — arrays, strings, numbers etc. are ignored
    /// wholesale.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The raw candidate value for a tracked field, if present.
    pub fn get(&self, field: TrackedField) -> Option<&serde_json::Value> {
        self.0.get(field.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for FactDelta {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// The accepted subset of a delta that actually differed from the prior
/// record. Returned to the caller for notification only, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<TrackedField, String>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: TrackedField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn get(&self, field: TrackedField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over changed fields in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackedField, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }
}
