//! Result of the secondary enhancement pass

use crate::error::AppError;
use crate::remote::InlineData;
use crate::response::base64;

/// Output of [`super::TryOnOrchestrator::cleanup`]
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    /// Enhanced image, or the untouched try-on image
    pub image: InlineData,
    pub enhanced: bool,
    /// Why the pass was skipped, for diagnostics
    pub error: Option<String>,
}

impl EnhancementResult {
    pub(crate) fn enhanced(image: InlineData) -> Self {
        Self {
            image,
            enhanced: true,
            error: None,
        }
    }

    pub(crate) fn unchanged(image: InlineData, error: AppError) -> Self {
        Self {
            image,
            enhanced: false,
            error: Some(error.to_string()),
        }
    }

    pub fn success(&self) -> bool {
        self.enhanced
    }

    pub fn data_url(&self) -> String {
        base64::create_data_url(&self.image.data, &self.image.mime_type)
    }
}
