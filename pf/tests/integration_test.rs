//! Integration tests for PageForge
//!
//! Build a page and edit it through chat against a scripted backend, with the
//! session kept on disk between steps.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pageforge::agent::{ChatAgent, ChatSession};
use pageforge::domain::{ImageData, PipelineStage, ProductData, SectionType};
use pageforge::export::Exporter;
use pageforge::llm::{GenerateRequest, GenerateResponse, LlmClient, LlmError, Part};
use pageforge::pipeline::{Pipeline, PipelineError, PipelineModels};
use pageforge::state::{FileSessionPersistence, StateManager};
use tempfile::TempDir;

/// Answers by model name; records every request
struct ScriptedClient {
    chat_reply: String,
    fail_image_at: Option<usize>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    fn new(chat_reply: &str) -> Self {
        Self {
            chat_reply: chat_reply.to_string(),
            fail_image_at: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing_image(at: usize) -> Self {
        Self {
            fail_image_at: Some(at),
            ..Self::new("")
        }
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn image_calls(&self) -> usize {
        self.requests().iter().filter(|r| r.model == "image").count()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let model = request.model.clone();
        let image_calls = self.image_calls();
        self.requests.lock().unwrap().push(request);

        match model.as_str() {
            "plan" => Ok(GenerateResponse::text(
                r#"{"sections":[
                    {"title":"Hero","prompt":"earbuds floating","type":"hero"},
                    {"title":"Bass","prompt":"sound waves","type":"usp"},
                    {"title":"Battery","prompt":"charging case","type":"usp"},
                    {"title":"Specs","prompt":"flat lay","type":"specs"}
                ],"brandTheme":"dark"}"#,
            )),
            "image" => {
                if self.fail_image_at == Some(image_calls) {
                    return Err(LlmError::ApiError {
                        status: 429,
                        message: "quota exceeded".to_string(),
                    });
                }
                Ok(GenerateResponse::image(ImageData::from_bytes("image/png", &tiny_png())))
            }
            "text" => Ok(GenerateResponse::text(format!(
                r#"{{"copy":"사운드 {}","description":"설명 {}"}}"#,
                image_calls, image_calls
            ))),
            "chat" => Ok(GenerateResponse::text(self.chat_reply.clone())),
            other => Err(LlmError::InvalidResponse(format!("unexpected model {}", other))),
        }
    }
}

fn tiny_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 30, 30, 255]))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn models() -> PipelineModels {
    PipelineModels {
        plan: "plan".to_string(),
        image: "image".to_string(),
        text: "text".to_string(),
    }
}

fn product() -> ProductData {
    ProductData::new(
        "Aero Buds",
        "BT 5.3, 30h battery",
        vec![ImageData::from_bytes("image/jpeg", b"front"), ImageData::from_bytes("image/jpeg", b"side")],
    )
}

fn open_state(dir: &TempDir) -> StateManager {
    StateManager::spawn(FileSessionPersistence::open(dir.path()).unwrap())
}

// =============================================================================
// Build
// =============================================================================

#[tokio::test]
async fn test_build_persists_session_across_restarts() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let client = Arc::new(ScriptedClient::new(""));

    let state = open_state(&temp_dir);
    let pipeline = Pipeline::new(client.clone(), state.clone(), models());
    let slices = pipeline.build(&product()).await.unwrap();
    assert_eq!(slices.len(), 4);
    state.flush().await.unwrap();
    state.shutdown().await.unwrap();

    let restored = open_state(&temp_dir);
    let session = restored.snapshot().await.unwrap();
    assert_eq!(session.stage, PipelineStage::Completed);
    assert_eq!(session.slices.len(), 4);
    assert_eq!(session.product.as_ref().map(|p| p.name.as_str()), Some("Aero Buds"));

    let types: Vec<SectionType> = session.slices.iter().map(|s| s.section_type).collect();
    assert_eq!(
        types,
        vec![SectionType::Hero, SectionType::Usp, SectionType::Usp, SectionType::Specs]
    );
    assert_eq!(session.slices.get(1).unwrap().copy, "사운드 2");
    assert!(session.slices.get(0).unwrap().url.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_every_image_call_carries_the_first_product_image() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let client = Arc::new(ScriptedClient::new(""));
    let pipeline = Pipeline::new(client.clone(), open_state(&temp_dir), models());

    pipeline.build(&product()).await.unwrap();

    let reference = Part::InlineData(ImageData::from_bytes("image/jpeg", b"front"));
    let image_requests: Vec<GenerateRequest> = client.requests().into_iter().filter(|r| r.model == "image").collect();
    assert_eq!(image_requests.len(), 4);
    for request in image_requests {
        assert!(request.contents[0].parts.contains(&reference));
        assert_eq!(request.image_count(), 1);
    }
}

#[tokio::test]
async fn test_failed_build_is_recorded_and_restorable() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let client = Arc::new(ScriptedClient::failing_image(2));

    let state = open_state(&temp_dir);
    let pipeline = Pipeline::new(client, state.clone(), models());
    let result = pipeline.build(&product()).await;
    assert!(matches!(result, Err(PipelineError::ExternalService { .. })));
    state.flush().await.unwrap();
    state.shutdown().await.unwrap();

    let session = open_state(&temp_dir).snapshot().await.unwrap();
    assert_eq!(session.stage, PipelineStage::Error);
    assert_eq!(session.slices.len(), 2);
    assert!(session.last_error.unwrap().contains("quota exceeded"));
}

// =============================================================================
// Chat editing
// =============================================================================

#[tokio::test]
async fn test_chat_directive_patches_focused_slide() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let client = Arc::new(ScriptedClient::new(
        r#"좋아요! [UPDATE_CONTENT: {"copy": "압도적 저음", "description": "귀를 울리는 사운드"}] 반영했습니다."#,
    ));
    let state = open_state(&temp_dir);
    Pipeline::new(client.clone(), state.clone(), models())
        .build(&product())
        .await
        .unwrap();

    assert_eq!(state.set_focus(1).await.unwrap(), 1);
    let chat = ChatSession::new(ChatAgent::new(client.clone(), "chat"), state.clone());
    let reply = chat.exchange("저음을 강조해줘").await.unwrap();

    assert_eq!(reply.text, "좋아요! 반영했습니다.");
    let session = state.snapshot().await.unwrap();
    let edited = session.slices.get(1).unwrap();
    assert_eq!(edited.copy, "압도적 저음");
    assert_eq!(edited.description, "귀를 울리는 사운드");
    assert_eq!(session.slices.get(0).unwrap().copy, "사운드 1");
    assert_eq!(session.chat.len(), 2);

    // The focused slide's current copy travels with the message
    let chat_request = client.requests().into_iter().rfind(|r| r.model == "chat").unwrap();
    match &chat_request.contents.last().unwrap().parts[0] {
        Part::Text(text) => assert_eq!(text, "[현재 2페이지 문구: 사운드 2] 저음을 강조해줘"),
        other => panic!("expected text part, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_without_directive_leaves_slides_alone() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let client = Arc::new(ScriptedClient::new("어떤 느낌을 원하시나요?"));
    let state = open_state(&temp_dir);
    let before = Pipeline::new(client.clone(), state.clone(), models())
        .build(&product())
        .await
        .unwrap();

    let chat = ChatSession::new(ChatAgent::new(client, "chat"), state.clone());
    let reply = chat.exchange("바꿔줘").await.unwrap();

    assert!(reply.action.is_none());
    assert_eq!(state.slices().await.unwrap(), before);
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_export_all_writes_one_png_per_slide() {
    let state_dir = TempDir::new().expect("Failed to create temp dir");
    let out_dir = TempDir::new().expect("Failed to create temp dir");
    let client = Arc::new(ScriptedClient::new(""));
    let slices = Pipeline::new(client, open_state(&state_dir), models())
        .build(&product())
        .await
        .unwrap();

    let exporter = Exporter::new(None, std::time::Duration::from_millis(1));
    exporter.export_all(&slices, out_dir.path()).wait().await;

    for n in 1..=4 {
        let path = out_dir.path().join(format!("page_{}.png", n));
        let image = image::open(&path).unwrap();
        assert_eq!((image.width(), image.height()), (1080, 1920));
    }
}
