//! Vision prompt construction.

use bidscout_core::ValuationRequest;
use serde::{Deserialize, Serialize};

const APPRAISER_INSTRUCTIONS: &str = r#"As an expert appraiser, analyze this auction item for resale value.
Use the attached images and description, paying close attention to condition, authenticity, unique features, and any visible flaws. Reference specific images or details where possible.

For "valueRange", give a specific price range in USD, ideally no wider than 20% of the estimated midpoint unless uncertainty is high. If you cannot be precise, explain why in "specialConsiderations".

Where possible, cite comparable recent sales or typical auction results for similar items, adjusted for current market trends and demand.

Respond with a JSON object with exactly these fields:
{
  "valueRange": "$X–$Y USD",
  "context": "Brief analysis of condition, authenticity, and value factors, referencing the images and description.",
  "demand": "Current market demand and buyer insights.",
  "specialConsiderations": "Important notes or warnings, including unclear or insufficient images or any uncertainty in the valuation."
}
If you cannot estimate, set "valueRange" to "Unknown" and explain why in "context". Keep each field under 100 words.

Example:
{
  "valueRange": "$120–$140 USD",
  "context": "Excellent condition with a clear maker's mark in image 2. Recent sales of similar items average $130.",
  "demand": "High demand among collectors this season.",
  "specialConsiderations": "Estimate is precise due to clear images and recent comparable sales."
}"#;

/// One chat message in the provider's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// A part of a multi-modal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// How an image link reaches the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Fetched by the provider.
    Remote(String),
    /// `data:image/...` URL carried in the request.
    Inline(String),
}

impl ImageSource {
    /// Classify a link; anything that is neither http(s) nor an inline image is dropped.
    pub fn classify(link: &str) -> Option<Self> {
        let link = link.trim();
        if link.starts_with("http") {
            Some(ImageSource::Remote(link.to_string()))
        } else if link.starts_with("data:image/") {
            Some(ImageSource::Inline(link.to_string()))
        } else {
            None
        }
    }

    fn into_part(self) -> ContentPart {
        let url = match self {
            ImageSource::Remote(url) | ImageSource::Inline(url) => url,
        };
        ContentPart::ImageUrl { image_url: ImageUrl { url } }
    }
}

/// Build the single user message for a valuation request.
pub fn build_messages(request: &ValuationRequest) -> Vec<ChatMessage> {
    let mut content = vec![
        ContentPart::Text { text: APPRAISER_INSTRUCTIONS.to_string() },
        ContentPart::Text {
            text: format!("Item Name: {}\nDescription: {}", request.item_name, request.item_description),
        },
    ];

    let mut dropped = 0usize;
    for link in &request.image_links {
        match ImageSource::classify(link) {
            Some(source) => content.push(source.into_part()),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "ignoring image links in unsupported formats");
    }

    vec![ChatMessage { role: "user".to_string(), content }]
}
