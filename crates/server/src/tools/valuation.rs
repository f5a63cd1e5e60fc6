//! Valuation tools: single estimate and ordered batch.

use bidscout_client::ValuationService;
use bidscout_core::{Error, ValuationRequest, ValuationResult};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the estimate_value tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EstimateValueParams {
    /// Item name as listed.
    #[serde(default, alias = "itemName")]
    pub item_name: String,

    /// Item description as listed.
    #[serde(default, alias = "itemDescription")]
    pub item_description: String,

    /// Optional image URLs (remote or data URLs).
    #[serde(default, alias = "imageLinks")]
    pub image_links: Vec<String>,
}

/// Parameters for the estimate_values_batch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EstimateBatchParams {
    /// Items to value, answered in the same order.
    #[serde(default)]
    pub items: Vec<EstimateValueParams>,
}

/// Output from the estimate_values_batch tool.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    pub results: Vec<ValuationResult>,
}

impl EstimateValueParams {
    fn is_complete(&self) -> bool {
        !self.item_name.trim().is_empty() && !self.item_description.trim().is_empty()
    }

    fn into_request(self) -> ValuationRequest {
        ValuationRequest::new(self.item_name, self.item_description, self.image_links)
    }
}

pub(crate) fn validate_single(params: EstimateValueParams) -> Result<ValuationRequest, Error> {
    if !params.is_complete() {
        return Err(Error::InvalidInput("item_name and item_description are required".to_string()));
    }
    Ok(params.into_request())
}

/// Every entry is checked before any of them is valued.
pub(crate) fn validate_batch(params: EstimateBatchParams) -> Result<Vec<ValuationRequest>, Error> {
    if let Some(index) = params.items.iter().position(|item| !item.is_complete()) {
        return Err(Error::InvalidInput(format!("items[{index}]: item_name and item_description are required")));
    }
    Ok(params.items.into_iter().map(EstimateValueParams::into_request).collect())
}

pub async fn estimate_value_impl(
    service: &ValuationService, params: EstimateValueParams,
) -> Result<CallToolResult, McpError> {
    let request = validate_single(params)?;

    tracing::info!(item = %request.item_name, images = request.image_links.len(), "estimate_value");

    let result = service.get_valuation(&request).await?;
    json_result(&result)
}

pub async fn estimate_values_batch_impl(
    service: &ValuationService, params: EstimateBatchParams,
) -> Result<CallToolResult, McpError> {
    let requests = validate_batch(params)?;

    tracing::info!(count = requests.len(), "estimate_values_batch");

    let results = service.get_valuations_batch(&requests).await?;
    json_result(&BatchOutput { results })
}
