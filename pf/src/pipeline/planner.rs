//! Plan generator: product data to an ordered list of sections

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::PipelineError;
use crate::domain::{DesignPlan, ProductData};
use crate::llm::{Content, GenerateRequest, LlmClient, Part, ResponseFormat};

const PLAN_INSTRUCTION: &str = "이 상품을 위한 6단계 상세페이지를 기획하세요.\n\
    1번은 히어로(hero), 2~5번은 특장점(usp), 6번은 반드시 정보고시/스펙(specs)이어야 합니다.\n\
    각 섹션별로 이미지를 생성할 상세 프롬프트만 JSON으로 반환하세요.";

/// Response schema for the plan call
pub fn plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "sections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "prompt": { "type": "STRING" },
                        "type": { "type": "STRING", "enum": ["hero", "usp", "specs"] }
                    },
                    "required": ["title", "prompt", "type"]
                }
            }
        },
        "required": ["sections"]
    })
}

/// Build the plan request for `product`
pub fn plan_request(model: &str, product: &ProductData) -> GenerateRequest {
    let mut parts = vec![Part::Text(format!(
        "상품명: {}, 스펙: {}.\n{}",
        product.name, product.specs, PLAN_INSTRUCTION
    ))];
    parts.extend(product.images.iter().cloned().map(Part::InlineData));

    GenerateRequest::new(model, vec![Content::user(parts)]).with_response(ResponseFormat::Json(plan_schema()))
}

/// Parse the plan response body
///
/// Empty text is read as `{}`, which lacks `sections` and fails.
pub fn parse_plan(text: &str) -> Result<DesignPlan, PipelineError> {
    let body = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(body).map_err(|e| PipelineError::ExternalService {
        operation: "Plan generation",
        message: format!("unusable plan: {}", e),
    })
}

/// Ask the backend for a page plan
///
/// Deviations from the hero/usp/specs layout are logged, not rejected.
pub async fn generate_plan(
    llm: &dyn LlmClient,
    model: &str,
    product: &ProductData,
) -> Result<DesignPlan, PipelineError> {
    debug!(name = %product.name, images = product.images.len(), "generate_plan: called");
    let response = llm
        .generate(plan_request(model, product))
        .await
        .map_err(|e| PipelineError::service("Plan generation", e))?;

    let plan = parse_plan(&response.text_content())?;
    if !plan.follows_convention() {
        warn!(
            sections = ?plan.sections.iter().map(|s| s.section_type).collect::<Vec<_>>(),
            "Plan does not follow the hero/usp/specs layout"
        );
    }
    info!(sections = plan.sections.len(), "Plan retrieved");
    Ok(plan)
}
