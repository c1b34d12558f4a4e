//! Indexed documents and facet buckets.

use serde::{Deserialize, Deserializer, Serialize};

/// A full document from the corpus index.
///
/// Mirrors the index mapping: `type`, `line_id`, `play_name`,
/// `speech_number`, `line_number`, `speaker`, `text_entry`. Missing fields
/// deserialize to their defaults; act and scene headers carry no speaker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineDocument {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub line_id: u64,
    #[serde(default)]
    pub play_name: String,
    /// Act and scene headers index this as `""`.
    #[serde(
        default,
        deserialize_with = "speech_number_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub speech_number: Option<u64>,
    /// Act.scene.line reference, e.g. `"3.1.64"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub line_number: String,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text_entry: String,
}

fn speech_number_lenient<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse().map(Some).map_err(|_| {
                serde::de::Error::custom(format!("invalid speech_number '{text}'"))
            })
        }
    }
}

/// A document shown around a looked-up line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLine {
    #[serde(flatten)]
    pub document: LineDocument,
    pub is_current: bool,
}

/// Count of matching documents for one play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayFacet {
    pub name: String,
    pub count: u64,
}
