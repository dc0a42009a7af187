//! Registry domain types and wire DTOs.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Schema definition language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    #[default]
    Avro,
    Protobuf,
    Json,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Avro => "AVRO",
            SchemaType::Protobuf => "PROTOBUF",
            SchemaType::Json => "JSON",
        }
    }

    fn is_default(&self) -> bool {
        *self == SchemaType::Avro
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compatibility level enforced when registering new versions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityLevel {
    /// No compatibility checking
    None,
    /// New schema can read data written with the previous version
    #[default]
    Backward,
    /// New schema can read data written with all previous versions
    BackwardTransitive,
    /// Previous version can read data written with the new schema
    Forward,
    /// All previous versions can read data written with the new schema
    ForwardTransitive,
    /// Both backward and forward against the previous version
    Full,
    /// Both backward and forward against all previous versions
    FullTransitive,
}

impl CompatibilityLevel {
    pub const ALL: [CompatibilityLevel; 7] = [
        CompatibilityLevel::None,
        CompatibilityLevel::Backward,
        CompatibilityLevel::BackwardTransitive,
        CompatibilityLevel::Forward,
        CompatibilityLevel::ForwardTransitive,
        CompatibilityLevel::Full,
        CompatibilityLevel::FullTransitive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityLevel::None => "NONE",
            CompatibilityLevel::Backward => "BACKWARD",
            CompatibilityLevel::BackwardTransitive => "BACKWARD_TRANSITIVE",
            CompatibilityLevel::Forward => "FORWARD",
            CompatibilityLevel::ForwardTransitive => "FORWARD_TRANSITIVE",
            CompatibilityLevel::Full => "FULL",
            CompatibilityLevel::FullTransitive => "FULL_TRANSITIVE",
        }
    }

    /// Whether the level checks against every earlier version, not just the latest
    pub fn is_transitive(&self) -> bool {
        matches!(
            self,
            CompatibilityLevel::BackwardTransitive
                | CompatibilityLevel::ForwardTransitive
                | CompatibilityLevel::FullTransitive
        )
    }
}

impl fmt::Display for CompatibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompatibilityLevel {
    type Err = RegistryError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|l| l.as_str()).collect();
                RegistryError::InvalidArgument(format!(
                    "invalid compatibility level '{}', expected one of: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Which version of a subject to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Number(i32),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Latest => f.write_str("latest"),
            VersionSelector::Number(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for VersionSelector {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") || s == "-1" {
            return Ok(VersionSelector::Latest);
        }
        match s.parse::<i32>() {
            Ok(n) if n > 0 => Ok(VersionSelector::Number(n)),
            _ => Err(RegistryError::InvalidArgument(format!(
                "invalid version '{}', expected a positive integer or 'latest'",
                s
            ))),
        }
    }
}

impl From<i32> for VersionSelector {
    fn from(version: i32) -> Self {
        VersionSelector::Number(version)
    }
}

/// One immutable version of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub subject: String,
    pub version: i32,
    pub id: u32,
    pub schema: String,
    #[serde(
        rename = "schemaType",
        default,
        skip_serializing_if = "SchemaType::is_default"
    )]
    pub schema_type: SchemaType,
}

/// Schema definition fetched by global ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub schema: String,
    #[serde(
        rename = "schemaType",
        default,
        skip_serializing_if = "SchemaType::is_default"
    )]
    pub schema_type: SchemaType,
}

/// Result of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSchema {
    pub id: u32,
    pub version: i32,
}

/// Result of a compatibility check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompatibilityCheck {
    pub is_compatible: bool,
    pub messages: Vec<String>,
}

/// Verdict of the compatibility pre-check run before an update registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    Compatible,
    /// The subject has no versions yet
    FirstVersion,
    Incompatible(Vec<String>),
    /// The check itself failed; the registry decides on registration
    Unchecked(String),
}

/// Outcome of [`crate::SchemaRegistryClient::update_schema`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaUpdate {
    pub registered: RegisteredSchema,
    /// True when the subject had no version before this update
    pub first_version: bool,
    /// Registered despite a failed compatibility check
    pub forced: bool,
    /// Non-fatal problems hit during the pre-registration check
    pub warnings: Vec<String>,
}

// Wire DTOs

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSchemaRequest {
    pub schema: String,
    #[serde(
        rename = "schemaType",
        default,
        skip_serializing_if = "SchemaType::is_default"
    )]
    pub schema_type: SchemaType,
}

impl RegisterSchemaRequest {
    pub fn avro(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            schema_type: SchemaType::Avro,
        }
    }
}

/// Registry answer to a registration; some registries omit `version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSchemaResponse {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityResponse {
    pub is_compatible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

/// Body of `GET /config`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    #[serde(rename = "compatibilityLevel")]
    pub compatibility_level: CompatibilityLevel,
}

/// Body of `PUT /config`, echoed back by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub compatibility: CompatibilityLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_level_parsing_is_case_insensitive() {
        assert_eq!(
            "backward".parse::<CompatibilityLevel>().unwrap(),
            CompatibilityLevel::Backward
        );
        assert_eq!(
            " Full_Transitive ".parse::<CompatibilityLevel>().unwrap(),
            CompatibilityLevel::FullTransitive
        );
        assert!(matches!(
            "SIDEWAYS".parse::<CompatibilityLevel>(),
            Err(RegistryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_compatibility_level_wire_names() {
        for level in CompatibilityLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
        let config: ConfigResponse =
            serde_json::from_str(r#"{"compatibilityLevel":"FORWARD_TRANSITIVE"}"#).unwrap();
        assert_eq!(config.compatibility_level, CompatibilityLevel::ForwardTransitive);
    }

    #[test]
    fn test_version_selector() {
        assert_eq!("latest".parse::<VersionSelector>().unwrap(), VersionSelector::Latest);
        assert_eq!("3".parse::<VersionSelector>().unwrap(), VersionSelector::Number(3));
        assert!("0".parse::<VersionSelector>().is_err());
        assert!("v2".parse::<VersionSelector>().is_err());
        assert_eq!(VersionSelector::Number(7).to_string(), "7");
    }

    #[test]
    fn test_schema_version_defaults_to_avro() {
        let version: SchemaVersion = serde_json::from_str(
            r#"{"subject":"s","version":1,"id":10,"schema":"\"string\""}"#,
        )
        .unwrap();
        assert_eq!(version.schema_type, SchemaType::Avro);

        let request = RegisterSchemaRequest::avro("\"string\"");
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("schemaType").is_none());
    }
}
