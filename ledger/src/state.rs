//! Ledger states
//!
//! A state is an immutable typed record with named participants. It has no
//! identity of its own until referenced as a transaction output.

use pactum_core::{Party, StateRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed attribute value carried by states and command payloads.
///
/// Ordering comparisons are only meaningful between values of the same tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Amount(u128),
    Boolean(bool),
    Bytes(Vec<u8>),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<u128> {
        match self {
            AttributeValue::Amount(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => write!(f, "{s}"),
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::Amount(a) => write!(f, "{a}"),
            AttributeValue::Boolean(b) => write!(f, "{b}"),
            AttributeValue::Bytes(b) => write!(f, "{} bytes", b.len()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

/// An immutable ledger record with a type tag, typed attributes, and the
/// parties entitled to be notified of and retain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Type tag keying the contract rules that govern this state
    pub state_type: String,
    /// Named attributes, stored ordered so encoding is canonical
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Parties that store this state in their vaults
    pub participants: Vec<Party>,
}

impl State {
    pub fn new(state_type: impl Into<String>) -> Self {
        Self {
            state_type: state_type.into(),
            attributes: BTreeMap::new(),
            participants: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_participant(mut self, party: Party) -> Self {
        self.participants.push(party);
        self
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Check whether a party participates in this state
    pub fn has_participant(&self, party: &Party) -> bool {
        self.participants.contains(party)
    }
}

/// A state paired with the reference that points to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub state_ref: StateRef,
    pub state: State,
}

impl StateAndRef {
    pub fn new(state_ref: StateRef, state: State) -> Self {
        Self { state_ref, state }
    }
}
