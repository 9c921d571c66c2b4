//! Transaction commands
//!
//! A command authorizes and parameterizes contract verification. It carries
//! no state data itself, only an optional payload and the public keys whose
//! signatures the transaction requires.

use pactum_core::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::AttributeValue;

/// Command payload: a type tag plus optional verification parameters.
///
/// Type-only commands carry an empty payload and serve purely to select the
/// verification rule and attach signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandData {
    pub command_type: String,
    pub payload: BTreeMap<String, AttributeValue>,
}

impl CommandData {
    /// A command that only selects a rule and attaches signers
    pub fn type_only(command_type: impl Into<String>) -> Self {
        Self {
            command_type: command_type.into(),
            payload: BTreeMap::new(),
        }
    }

    pub fn with_payload(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    pub fn payload_value(&self, name: &str) -> Option<&AttributeValue> {
        self.payload.get(name)
    }
}

/// A command paired with the keys required to sign the transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub data: CommandData,
    pub signers: Vec<PublicKey>,
}

impl Command {
    pub fn new(data: CommandData, signers: Vec<PublicKey>) -> Self {
        Self { data, signers }
    }

    pub fn command_type(&self) -> &str {
        &self.data.command_type
    }

    pub fn requires_signer(&self, key: &PublicKey) -> bool {
        self.signers.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_only_command() {
        let cmd = Command::new(CommandData::type_only("agreement.issue"), vec![PublicKey([1u8; 32])]);
        assert_eq!(cmd.command_type(), "agreement.issue");
        assert!(cmd.data.payload.is_empty());
        assert!(cmd.requires_signer(&PublicKey([1u8; 32])));
        assert!(!cmd.requires_signer(&PublicKey([2u8; 32])));
    }

    #[test]
    fn test_command_payload() {
        let data = CommandData::type_only("agreement.amend").with_payload("data", "new data");
        assert_eq!(
            data.payload_value("data").and_then(|v| v.as_text()),
            Some("new data")
        );
        assert!(data.payload_value("missing").is_none());
    }
}
