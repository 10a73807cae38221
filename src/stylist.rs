//! Styling commentary for a garment
//!
//! Two text calls: a short `type|color|style` analysis of the garment image,
//! then a structured JSON recommendation request built from that analysis.
//! Any failure along the way yields [`StyleRecommendations::fallback`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::remote::{generate_text, GenerationConfig, InlineData, RemoteGeneration};

const ANALYSIS_PROMPT: &str =
    "Identify the garment type, main color, and style. Return only: type|color|style";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSummary {
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub compatibility: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub rating: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylingTip {
    #[serde(default)]
    pub icon: String,
    pub tip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMatch {
    pub color: String,
    #[serde(default)]
    pub hex: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareInstruction {
    #[serde(default)]
    pub icon: String,
    pub instruction: String,
}

/// Structured styling advice for one garment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRecommendations {
    #[serde(default)]
    pub summary: StyleSummary,
    #[serde(default)]
    pub styling_tips: Vec<StylingTip>,
    #[serde(default)]
    pub color_matches: Vec<ColorMatch>,
    #[serde(default)]
    pub occasions: Vec<String>,
    #[serde(default)]
    pub care_instructions: Vec<CareInstruction>,
    #[serde(default)]
    pub key_features: Vec<String>,
}

impl StyleRecommendations {
    /// Generic advice returned when the model cannot be used
    pub fn fallback() -> Self {
        let tip = |icon: &str, tip: &str| StylingTip {
            icon: icon.to_string(),
            tip: tip.to_string(),
        };
        let color = |color: &str, hex: &str, description: &str| ColorMatch {
            color: color.to_string(),
            hex: hex.to_string(),
            description: description.to_string(),
        };
        let care = |icon: &str, instruction: &str| CareInstruction {
            icon: icon.to_string(),
            instruction: instruction.to_string(),
        };

        Self {
            summary: StyleSummary {
                style: "Classic Elegant".to_string(),
                compatibility: "92%".to_string(),
                season: "All Seasons".to_string(),
                rating: "4.5/5".to_string(),
            },
            styling_tips: vec![
                tip("👠", "Pair with nude heels for an elongated silhouette"),
                tip("💍", "Add delicate gold jewelry for sophistication"),
                tip("👜", "Complete with a small clutch or chain bag"),
            ],
            color_matches: vec![
                color("Gold", "#FFD700", "Perfect match"),
                color("Nude", "#F5DEB3", "Elegant"),
                color("Black", "#000000", "Classic"),
            ],
            occasions: ["Cocktail Party", "Formal Dinner", "Wedding Guest", "Date Night"]
                .into_iter()
                .map(String::from)
                .collect(),
            care_instructions: vec![
                care("🌡️", "30°C Wash"),
                care("🚫", "No Bleach"),
                care("♨️", "Low Iron"),
            ],
            key_features: ["Versatile styling", "Timeless design", "Premium quality"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Result of the first, short analysis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarmentAnalysis {
    pub garment_type: String,
    pub color: String,
    pub style: String,
}

impl GarmentAnalysis {
    /// Parse a `type|color|style` answer. Missing fields become empty.
    pub fn parse(text: &str) -> Self {
        let mut fields = text.trim().splitn(3, '|').map(|s| s.trim().to_string());
        Self {
            garment_type: fields.next().unwrap_or_default(),
            color: fields.next().unwrap_or_default(),
            style: fields.next().unwrap_or_default(),
        }
    }
}

/// Instruction for the structured recommendation call
pub fn recommendation_prompt(analysis: &GarmentAnalysis) -> String {
    format!(
        r##"Analyze this {kind} and provide styling recommendations in JSON format.

Garment details:
- Type: {kind}
- Color: {color}
- Style: {style}

Return ONLY valid JSON in this exact structure:
{{
  "summary": {{"style": "max 3 words", "compatibility": "percentage", "season": "suitable seasons", "rating": "number out of 5"}},
  "styling_tips": [{{"icon": "emoji", "tip": "one line tip"}}],
  "color_matches": [{{"color": "name", "hex": "#code", "description": "2-3 words"}}],
  "occasions": ["occasion"],
  "care_instructions": [{{"icon": "emoji", "instruction": "short instruction"}}],
  "key_features": ["feature"]
}}

At most 5 tips, 5 colors, 8 occasions and 6 care instructions.
Keep all text concise. Use fashion industry standard terms."##,
        kind = analysis.garment_type,
        color = analysis.color,
        style = analysis.style,
    )
}

/// The span from the first `{` to the last `}`, if any
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Produces styling commentary through the text model
pub struct Stylist {
    remote: Arc<dyn RemoteGeneration>,
    model: String,
}

impl Stylist {
    pub fn new(remote: Arc<dyn RemoteGeneration>, model: impl Into<String>) -> Self {
        Self {
            remote,
            model: model.into(),
        }
    }

    pub async fn analyze_garment(&self, garment_image: InlineData) -> Result<GarmentAnalysis> {
        let text = generate_text(
            self.remote.as_ref(),
            &self.model,
            ANALYSIS_PROMPT,
            Some(garment_image),
            GenerationConfig::default(),
        )
        .await?;
        Ok(GarmentAnalysis::parse(&text))
    }

    async fn try_recommend(&self, garment_image: InlineData) -> Result<StyleRecommendations> {
        let analysis = self.analyze_garment(garment_image).await?;
        debug!(garment_type = %analysis.garment_type, color = %analysis.color, "Garment analyzed");

        let text = generate_text(
            self.remote.as_ref(),
            &self.model,
            &recommendation_prompt(&analysis),
            None,
            GenerationConfig::default(),
        )
        .await?;

        let json = extract_json_object(&text)
            .ok_or_else(|| AppError::transport("Invalid JSON response: no object found"))?;
        Ok(serde_json::from_str(json)?)
    }

    /// Styling recommendations for a garment image. Never fails.
    pub async fn recommend(&self, garment_image: InlineData) -> StyleRecommendations {
        match self.try_recommend(garment_image).await {
            Ok(recommendations) => recommendations,
            Err(e) => {
                warn!(error = %e, "Style recommendation failed, using fallback");
                StyleRecommendations::fallback()
            }
        }
    }
}
