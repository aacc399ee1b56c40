//! Section renderer: one planned section to one finished slice
//!
//! Two backend calls per section: the image first, then the copy written
//! against that image.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{PipelineError, PipelineModels};
use crate::domain::{GeneratedSlice, ImageData, ProductData, SectionDescriptor, SectionType};
use crate::llm::{Content, GenerateRequest, LlmClient, Part, ResponseFormat};
use crate::sanitize::sanitize;

/// Aspect ratio requested for every slide image
pub const IMAGE_ASPECT_RATIO: &str = "9:16";

const SPECS_INSTRUCTION: &str =
    "이미지를 보고 제품의 핵심 스펙과 정보고시를 요약하세요. 카피는 'PRODUCT SPECS', 설명은 스펙 나열.";

const COPY_INSTRUCTION: &str =
    "이미지의 분위기에 맞춰 10자 이내의 강렬한 카피와 30자 이내의 설명을 작성하세요. 아주 간결해야 합니다.";

/// Finalized slide text, already sanitized
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SliceText {
    #[serde(default)]
    pub copy: String,
    #[serde(default)]
    pub description: String,
}

/// Wrap a section prompt in the fixed photographic style
pub fn style_prompt(prompt: &str) -> String {
    format!(
        "Commercial high-end photography. {}. High contrast, professional studio lighting. \
         9:16 vertical aspect. Clean top area for text overlay.",
        prompt
    )
}

/// Copy guidance for a section type
pub fn text_instruction(section_type: SectionType) -> &'static str {
    match section_type {
        SectionType::Specs => SPECS_INSTRUCTION,
        SectionType::Hero | SectionType::Usp => COPY_INSTRUCTION,
    }
}

fn text_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "copy": { "type": "STRING" },
            "description": { "type": "STRING" }
        }
    })
}

/// Generate the section image
///
/// A response without an image part is `Ok(None)`.
pub async fn generate_image(
    llm: &dyn LlmClient,
    model: &str,
    prompt: &str,
    reference: Option<&ImageData>,
) -> Result<Option<ImageData>, PipelineError> {
    debug!(has_reference = reference.is_some(), "generate_image: called");
    let mut parts = vec![Part::Text(style_prompt(prompt))];
    if let Some(image) = reference {
        parts.push(Part::InlineData(image.clone()));
    }

    let request = GenerateRequest::new(model, vec![Content::user(parts)]).with_response(ResponseFormat::Image {
        aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
    });

    let response = llm
        .generate(request)
        .await
        .map_err(|e| PipelineError::service("Image generation", e))?;

    let image = response.first_image().cloned();
    if image.is_none() {
        warn!("Image model returned no image, slide will have no picture");
    }
    Ok(image)
}

/// Write the headline and description for a rendered section
///
/// An unparseable response yields empty strings rather than an error.
pub async fn finalize_text(
    llm: &dyn LlmClient,
    model: &str,
    image: Option<&ImageData>,
    product: &ProductData,
    section_type: SectionType,
    title: &str,
) -> Result<SliceText, PipelineError> {
    debug!(%section_type, %title, has_image = image.is_some(), "finalize_text: called");
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = image {
        parts.push(Part::InlineData(image.clone()));
    }
    parts.push(Part::Text(format!(
        "상품: {}. 주제: {}. {}",
        product.name,
        title,
        text_instruction(section_type)
    )));

    let request =
        GenerateRequest::new(model, vec![Content::user(parts)]).with_response(ResponseFormat::Json(text_schema()));

    let response = llm
        .generate(request)
        .await
        .map_err(|e| PipelineError::service("Text generation", e))?;

    let raw: SliceText = serde_json::from_str(&response.text_content()).unwrap_or_else(|e| {
        warn!(error = %e, "Text model returned unusable JSON, using empty copy");
        SliceText::default()
    });

    Ok(SliceText {
        copy: sanitize(&raw.copy),
        description: sanitize(&raw.description),
    })
}

/// Render one section: image, then text, then assemble the slice
pub async fn render_section(
    llm: &dyn LlmClient,
    models: &PipelineModels,
    section: &SectionDescriptor,
    product: &ProductData,
) -> Result<GeneratedSlice, PipelineError> {
    debug!(title = %section.title, section_type = %section.section_type, "render_section: called");
    let image = generate_image(llm, &models.image, &section.prompt, product.reference_image()).await?;
    let text = finalize_text(
        llm,
        &models.text,
        image.as_ref(),
        product,
        section.section_type,
        &section.title,
    )
    .await?;

    Ok(GeneratedSlice::new(
        image,
        section.title.clone(),
        &text.copy,
        &text.description,
        section.section_type,
    ))
}
