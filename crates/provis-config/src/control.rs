//! Per-node control directive
//!
//! Every node in the tree carries a reserved `ControlOption` field selecting
//! Add/Update/Delete semantics. An empty string or an absent field means
//! `Add`, matching the wire convention of the configuration documents.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Directive selecting how a declared object is reconciled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ControlOption {
    /// Create the remote object (default)
    #[default]
    Add,
    /// Update the remote object in place
    Update,
    /// Remove the remote object
    Delete,
}

impl ControlOption {
    /// Canonical wire spelling
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for ControlOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ControlOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ControlOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ControlVisitor;

        impl Visitor<'_> for ControlVisitor {
            type Value = ControlOption;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(r#""", "Add", "Update" or "Delete""#)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ControlOption, E> {
                match value {
                    "" | "Add" => Ok(ControlOption::Add),
                    "Update" => Ok(ControlOption::Update),
                    "Delete" => Ok(ControlOption::Delete),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_str(ControlVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(rename = "ControlOption", default)]
        control: ControlOption,
    }

    #[test]
    fn absent_field_means_add() {
        let probe: Probe = serde_json::from_str("{}").unwrap();
        assert_eq!(probe.control, ControlOption::Add);
    }

    #[test]
    fn empty_string_means_add() {
        let probe: Probe = serde_json::from_str(r#"{"ControlOption": ""}"#).unwrap();
        assert_eq!(probe.control, ControlOption::Add);
    }

    #[test]
    fn explicit_variants_parse() {
        let update: Probe = serde_json::from_str(r#"{"ControlOption": "Update"}"#).unwrap();
        assert_eq!(update.control, ControlOption::Update);

        let delete: Probe = serde_json::from_str(r#"{"ControlOption": "Delete"}"#).unwrap();
        assert_eq!(delete.control, ControlOption::Delete);
    }

    #[test]
    fn unknown_value_rejected() {
        let result: Result<Probe, _> = serde_json::from_str(r#"{"ControlOption": "Upsert"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn serializes_canonical_spelling() {
        assert_eq!(
            serde_json::to_string(&ControlOption::Delete).unwrap(),
            r#""Delete""#
        );
    }
}
