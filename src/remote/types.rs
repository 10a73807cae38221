//! Generation request/response types and their JSON wire representation

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::response::base64;

/// Temperature applied when a request leaves it unset
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Binary payload with its declared MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl InlineData {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// One segment of a generation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationPart {
    Text(String),
    InlineBinary(InlineData),
}

impl GenerationPart {
    pub fn text(text: impl Into<String>) -> Self {
        GenerationPart::Text(text.into())
    }

    pub fn inline(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        GenerationPart::InlineBinary(InlineData::new(data, mime_type))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            GenerationPart::Text(text) => Some(text),
            GenerationPart::InlineBinary(_) => None,
        }
    }

    pub fn as_inline(&self) -> Option<&InlineData> {
        match self {
            GenerationPart::Text(_) => None,
            GenerationPart::InlineBinary(inline) => Some(inline),
        }
    }
}

impl From<InlineData> for GenerationPart {
    fn from(inline: InlineData) -> Self {
        GenerationPart::InlineBinary(inline)
    }
}

/// Sampling configuration sent alongside a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// One turn sent to the remote model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub parts: Vec<GenerationPart>,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(parts: Vec<GenerationPart>) -> Self {
        Self {
            parts,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Configuration as dispatched, with the temperature default applied
    pub fn effective_config(&self) -> GenerationConfig {
        let mut config = self.config.clone();
        config.temperature.get_or_insert(DEFAULT_TEMPERATURE);
        config
    }

    /// Build the provider JSON payload for this request
    pub fn to_payload(&self) -> WireRequest {
        WireRequest {
            contents: vec![WireContent {
                role: None,
                parts: self.parts.iter().map(WirePart::from).collect(),
            }],
            generation_config: Some(self.effective_config()),
        }
    }
}

/// Response from the remote model: one part list per candidate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub candidates: Vec<Vec<GenerationPart>>,
}

impl GenerationResponse {
    fn first_candidate(&self) -> &[GenerationPart] {
        self.candidates.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// First inline-binary part of the first candidate
    pub fn first_inline_binary(&self) -> Option<&InlineData> {
        self.first_candidate().iter().find_map(GenerationPart::as_inline)
    }

    /// First text part of the first candidate
    pub fn first_text(&self) -> Option<&str> {
        self.first_candidate().iter().find_map(GenerationPart::as_text)
    }

    pub fn from_wire(wire: WireResponse) -> Result<Self> {
        let candidates = wire
            .candidates
            .into_iter()
            .map(|candidate| {
                candidate
                    .content
                    .map(|content| content.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|part| decode_part(part).transpose())
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { candidates })
    }
}

/// Top-level `generateContent` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    pub contents: Vec<WireContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content container used in both requests and responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

/// Untagged union of provider content parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: WireInlineData,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInlineData {
    #[serde(default = "default_mime_type", alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

fn default_mime_type() -> String {
    "image/png".to_string()
}

/// Top-level `generateContent` response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub candidates: Vec<WireCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCandidate {
    #[serde(default)]
    pub content: Option<WireContent>,
}

impl From<&GenerationPart> for WirePart {
    fn from(part: &GenerationPart) -> Self {
        match part {
            GenerationPart::Text(text) => WirePart::Text { text: text.clone() },
            GenerationPart::InlineBinary(inline) => WirePart::InlineData {
                inline_data: WireInlineData {
                    mime_type: inline.mime_type.clone(),
                    data: base64::encode(&inline.data),
                },
            },
        }
    }
}

/// Parts the crate does not model decode to `None`.
fn decode_part(part: WirePart) -> Result<Option<GenerationPart>> {
    match part {
        WirePart::Text { text } => Ok(Some(GenerationPart::Text(text))),
        WirePart::InlineData { inline_data } => {
            let data = base64::decode(&inline_data.data).map_err(|e| {
                AppError::transport(format!("Malformed inline data in response: {}", e))
            })?;
            Ok(Some(GenerationPart::inline(data, inline_data.mime_type)))
        }
        WirePart::Other(_) => Ok(None),
    }
}
