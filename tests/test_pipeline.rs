use async_trait::async_trait;
use fridge_chef::config::{
    ChefConfig, ExtractionConfig, FetcherConfig, IllustrationConfig, ProviderConfig, RecipeConfig,
};
use fridge_chef::providers::{GenerationRequest, ImageGenerator, LlmProvider, ProviderError};
use fridge_chef::stages::{ExtractionStage, IllustrationStage, RecipeStage};
use fridge_chef::{ChefError, ImageFetcher, MealPreferences, PersonalChef};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Answers extraction requests (the ones carrying an image) and recipe
/// requests with fixed text, counting each kind
struct FakeModel {
    fridge: String,
    recipe: String,
    extraction_calls: AtomicUsize,
    recipe_calls: AtomicUsize,
}

impl FakeModel {
    fn new(fridge: &str, recipe: &str) -> Arc<Self> {
        Arc::new(FakeModel {
            fridge: fridge.to_string(),
            recipe: recipe.to_string(),
            extraction_calls: AtomicUsize::new(0),
            recipe_calls: AtomicUsize::new(0),
        })
    }

    fn extraction_calls(&self) -> usize {
        self.extraction_calls.load(Ordering::SeqCst)
    }

    fn recipe_calls(&self) -> usize {
        self.recipe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeModel {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        if request.image.is_some() {
            self.extraction_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.fridge.clone())
        } else {
            self.recipe_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.recipe.clone())
        }
    }
}

/// Returns the given image, or fails when there is none
struct FakePainter {
    image: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl ImageGenerator for FakePainter {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.image
            .clone()
            .ok_or_else(|| ProviderError::NoMedia("fake".to_string()))
    }
}

fn chef(server: &ServerGuard, model: Arc<FakeModel>, painter: Option<Arc<FakePainter>>) -> PersonalChef {
    let fetcher = ImageFetcher::new(&FetcherConfig {
        storage_base_url: server.url(),
        storage_access_token: Some("token".to_string()),
        ..Default::default()
    })
    .unwrap();
    let model: Arc<dyn LlmProvider> = model;

    PersonalChef::new(
        fetcher,
        ExtractionStage::new(model.clone(), &ExtractionConfig::default()),
        RecipeStage::new(model, &RecipeConfig::default()),
        painter.map(|painter| {
            let painter: Arc<dyn ImageGenerator> = painter;
            IllustrationStage::new(painter, &IllustrationConfig::default())
        }),
    )
}

fn dinner() -> MealPreferences {
    MealPreferences::new("dinner", "italian").unwrap()
}

async fn serve_fridge(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/fridge.jpg")
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(JPEG)
        .create_async()
        .await
}

/// One fetch, one extraction, one recipe call, non-empty recipe
#[tokio::test]
async fn test_http_image_to_recipe() {
    let mut server = Server::new_async().await;
    let image = serve_fridge(&mut server).await;
    let model = FakeModel::new(
        r#"[{"title": "tomato", "quantity": 4}, {"title": "mozzarella", "quantity": 1}]"#,
        "Caprese salad\n\n1. Slice the tomatoes...",
    );

    let result = chef(&server, model.clone(), None)
        .run(&format!("{}/fridge.jpg", server.url()), &dinner())
        .await
        .unwrap();

    assert!(result.recipe.starts_with("Caprese salad"));
    assert_eq!(result.result_image, None);
    assert_eq!(model.extraction_calls(), 1);
    assert_eq!(model.recipe_calls(), 1);
    image.assert_async().await;
}

/// A missing storage object stops the run before any model call
#[tokio::test]
async fn test_missing_storage_object() {
    let mut server = Server::new_async().await;
    let metadata = server
        .mock("GET", "/storage/v1/b/my-bucket/o/missing.jpg")
        .with_status(404)
        .create_async()
        .await;
    let model = FakeModel::new("[]", "unused");
    let painter = Arc::new(FakePainter {
        image: None,
        calls: AtomicUsize::new(0),
    });

    let err = chef(&server, model.clone(), Some(painter.clone()))
        .run("gs://my-bucket/missing.jpg", &dinner())
        .await
        .unwrap_err();

    assert!(matches!(err, ChefError::FetchError(_)));
    assert!(err.to_string().contains("object not found"));
    assert_eq!(model.extraction_calls(), 0);
    assert_eq!(model.recipe_calls(), 0);
    assert_eq!(painter.calls.load(Ordering::SeqCst), 0);
    metadata.assert_async().await;
}

/// An item without a quantity fails extraction and the recipe model is never asked
#[tokio::test]
async fn test_invalid_extraction_output() {
    let mut server = Server::new_async().await;
    let _image = serve_fridge(&mut server).await;
    let model = FakeModel::new(r#"[{"title": "egg"}]"#, "unused");

    let err = chef(&server, model.clone(), None)
        .run(&format!("{}/fridge.jpg", server.url()), &dinner())
        .await
        .unwrap_err();

    assert!(matches!(err, ChefError::ExtractionError(_)));
    assert_eq!(err.stage(), "extraction");
    assert_eq!(model.extraction_calls(), 1);
    assert_eq!(model.recipe_calls(), 0);
}

#[tokio::test]
async fn test_unrecognized_scheme() {
    let server = Server::new_async().await;
    let model = FakeModel::new("[]", "unused");

    for reference in ["ftp://example.com/fridge.jpg", "file:///tmp/fridge.jpg", "gs://bucket"] {
        let err = chef(&server, model.clone(), None)
            .run(reference, &dinner())
            .await
            .unwrap_err();
        assert!(matches!(err, ChefError::FetchError(_)), "{}", reference);
    }
    assert_eq!(model.extraction_calls(), 0);
}

#[tokio::test]
async fn test_empty_fridge_still_gets_a_recipe() {
    let mut server = Server::new_async().await;
    let _image = serve_fridge(&mut server).await;
    let model = FakeModel::new("[]", "Pasta with garlic and oil");

    let result = chef(&server, model.clone(), None)
        .run(&format!("{}/fridge.jpg", server.url()), &dinner())
        .await
        .unwrap();

    assert!(!result.recipe.is_empty());
    assert_eq!(model.recipe_calls(), 1);
}

#[tokio::test]
async fn test_illustration_failure_does_not_change_recipe() {
    let mut server = Server::new_async().await;
    let _image = serve_fridge(&mut server).await;
    let fridge = r#"[{"title": "egg", "quantity": 6}]"#;
    let url = format!("{}/fridge.jpg", server.url());

    let plain = chef(&server, FakeModel::new(fridge, "Omelette"), None)
        .run(&url, &dinner())
        .await
        .unwrap();

    let painter = Arc::new(FakePainter {
        image: None,
        calls: AtomicUsize::new(0),
    });
    let illustrated = chef(&server, FakeModel::new(fridge, "Omelette"), Some(painter.clone()))
        .run(&url, &dinner())
        .await
        .unwrap();

    assert_eq!(plain, illustrated);
    assert_eq!(painter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_result_json_uses_result_image_key() {
    let mut server = Server::new_async().await;
    let _image = serve_fridge(&mut server).await;
    let painter = Arc::new(FakePainter {
        image: Some("https://images.example.com/omelette.png".to_string()),
        calls: AtomicUsize::new(0),
    });

    let result = chef(
        &server,
        FakeModel::new(r#"[{"title": "egg", "quantity": 6}]"#, "Omelette"),
        Some(painter),
    )
    .run(&format!("{}/fridge.jpg", server.url()), &dinner())
    .await
    .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "recipe": "Omelette",
            "resultImage": "https://images.example.com/omelette.png"
        })
    );
}

#[tokio::test]
async fn test_shared_chef_runs_concurrently() {
    let mut server = Server::new_async().await;
    let image = server
        .mock("GET", "/fridge.jpg")
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(JPEG)
        .expect(4)
        .create_async()
        .await;
    let model = FakeModel::new(r#"[{"title": "rice", "quantity": 1}]"#, "Fried rice");
    let chef = Arc::new(chef(&server, model.clone(), None));
    let url = format!("{}/fridge.jpg", server.url());

    let mut handles = Vec::new();
    for cuisine in ["chinese", "korean", "thai", "indonesian"] {
        let chef = chef.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            let prefs = MealPreferences::new("lunch", cuisine).unwrap();
            chef.run(&url, &prefs).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().recipe, "Fried rice");
    }

    assert_eq!(model.extraction_calls(), 4);
    assert_eq!(model.recipe_calls(), 4);
    image.assert_async().await;
}

/// Storage download, Gemini extraction and recipe, Imagen illustration, all
/// wired from configuration
#[tokio::test]
async fn test_configured_pipeline_against_google_apis() {
    let mut server = Server::new_async().await;

    let metadata = server
        .mock("GET", "/storage/v1/b/my-bucket/o/fridge.jpg")
        .match_header("authorization", "Bearer storage-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"contentType": "image/jpeg", "size": "10"}"#)
        .create_async()
        .await;
    let media = server
        .mock("GET", "/storage/v1/b/my-bucket/o/fridge.jpg")
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .with_status(200)
        .with_body(JPEG)
        .create_async()
        .await;
    let extraction = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("which items of food can be seen".to_string()),
            Matcher::PartialJson(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"candidates": [{"content": {"parts": [
                {"text": "```json\n[{\"title\": \"egg\", \"quantity\": 6}, {\"title\": \"spinach\", \"quantity\": 1}]\n```"}
            ]}}]}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let recipe = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("breakfast recipe in the italian style".to_string()),
            Matcher::Regex(r"- egg \(6\)".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "Spinach frittata"}]}}]}"#)
        .expect(1)
        .create_async()
        .await;
    let illustration = server
        .mock("POST", "/v1beta/models/imagen-3.0-generate-002:predict")
        .match_body(Matcher::PartialJson(json!({
            "instances": [{"prompt": "Photo of the final result of the following recipe: Spinach frittata."}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"predictions": [{"bytesBase64Encoded": "iVBORw0KGgo=", "mimeType": "image/png"}]}"#)
        .create_async()
        .await;

    let mut config = ChefConfig::with_provider(
        "google",
        ProviderConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some(server.url()),
            ..ProviderConfig::new("gemini-1.5-flash")
        },
    );
    config.fetcher.storage_base_url = server.url();
    config.fetcher.storage_access_token = Some("storage-token".to_string());
    config.illustration.enabled = true;

    let chef = PersonalChef::from_config(&config).unwrap();
    let prefs = MealPreferences::new("breakfast", "italian").unwrap();
    let result = chef.run("gs://my-bucket/fridge.jpg", &prefs).await.unwrap();

    assert_eq!(result.recipe, "Spinach frittata");
    assert_eq!(
        result.result_image.as_deref(),
        Some("data:image/png;base64,iVBORw0KGgo=")
    );
    metadata.assert_async().await;
    media.assert_async().await;
    extraction.assert_async().await;
    recipe.assert_async().await;
    illustration.assert_async().await;
}

/// This test is ignored by default since it requires network access, a
/// GOOGLE_API_KEY and FRIDGE_CHEF_TEST_IMAGE pointing at a fridge photo
#[tokio::test]
#[ignore]
async fn test_cook_from_real_image() {
    let image = std::env::var("FRIDGE_CHEF_TEST_IMAGE").expect("FRIDGE_CHEF_TEST_IMAGE must be set");
    let result = fridge_chef::cook_from_image(&image, "dinner", "italian").await;

    assert!(result.is_ok());
    assert!(!result.unwrap().recipe.is_empty());
}
