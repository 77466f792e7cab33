use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use pokedex_core::{
    ChainLink, EvolutionChain, FakeDataSource, Pokemon, PokemonSprites, RateLimitSettings,
    ValidationLimits,
};
use pokedex_databases::{FavoritesStore, SQLiteFavoritesStore};

use crate::handlers::ApiState;
use crate::rate_limit::RateLimiter;
use crate::server::build_router;

const BODY_LIMIT: usize = 10 * 1024;

struct TestApp {
    router: Router,
    store: Arc<SQLiteFavoritesStore>,
}

impl TestApp {
    async fn new(source: FakeDataSource) -> Self {
        Self::with_rate_limit(source, RateLimitSettings::default()).await
    }

    async fn with_rate_limit(source: FakeDataSource, rate_limit: RateLimitSettings) -> Self {
        let store = Arc::new(SQLiteFavoritesStore::in_memory().unwrap());
        store.initialize_schema().await.unwrap();

        let state = Arc::new(ApiState {
            data_source: Arc::new(source),
            favorites: store.clone(),
            limits: ValidationLimits::default(),
        });
        let router = build_router(state, Arc::new(RateLimiter::new(rate_limit)), BODY_LIMIT);

        Self { router, store }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }
}

fn pikachu_payload() -> Value {
    json!({
        "pokemonId": 25,
        "pokemonName": "Pikachu",
        "pokemonSprite": "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png"
    })
}

fn eevee_chain() -> EvolutionChain {
    EvolutionChain {
        id: 67,
        chain: ChainLink::leaf("pokemon-1").with_children(vec![
            ChainLink::leaf("pokemon-2").with_children(vec![ChainLink::leaf("pokemon-4")]),
            ChainLink::leaf("pokemon-3"),
        ]),
    }
}

fn source_with_pikachu() -> FakeDataSource {
    FakeDataSource::new()
        .with_generated(30)
        .with_pokemon(FakeDataSource::sample_pokemon(25, "pikachu"))
}

#[tokio::test]
async fn test_health_and_index() {
    let app = TestApp::new(FakeDataSource::new()).await;

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body["timestamp"].is_string());

    let (status, body) = app.get("/api/v1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["favorites"]["add"], "POST /api/v1/favorites");
}

#[tokio::test]
async fn test_unmatched_route_returns_not_found_envelope() {
    let app = TestApp::new(FakeDataSource::new()).await;

    let (status, body) = app.get("/api/v2/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Can't find /api/v2/nothing on this server");
}

#[tokio::test]
async fn test_list_defaults_and_limit_bounds() {
    let app = TestApp::new(FakeDataSource::new().with_generated(120)).await;

    let (status, body) = app.get("/api/v1/pokemon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 10);
    assert_eq!(body["data"]["pokemon"][0]["id"], 1);

    let (status, body) = app.get("/api/v1/pokemon?limit=5&offset=20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 5);
    assert_eq!(body["data"]["pokemon"][0]["id"], 21);

    for bad in ["0", "101"] {
        let (status, body) = app.get(&format!("/api/v1/pokemon?limit={bad}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "limit={bad}");
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Limit must be between 1 and 100");
    }

    let (status, body) = app.get("/api/v1/pokemon?limit=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 100);

    let (status, body) = app.get("/api/v1/pokemon?offset=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Offset must be non-negative");
}

#[tokio::test]
async fn test_list_fails_whole_page_when_one_detail_fails() {
    let source = FakeDataSource::new()
        .with_generated(10)
        .with_failing_detail("pokemon-4");
    let app = TestApp::new(source).await;

    let (status, body) = app.get("/api/v1/pokemon?limit=10").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Failed to fetch Pokemon data");
}

#[tokio::test]
async fn test_get_one_by_numeric_id_returns_matching_record() {
    let app = TestApp::new(FakeDataSource::new().with_generated(40)).await;

    for id in [1, 7, 25, 40] {
        let (status, body) = app.get(&format!("/api/v1/pokemon/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pokemon"]["id"], id);
        assert_eq!(body["data"]["evolutions"], json!([]));
    }
}

#[tokio::test]
async fn test_get_one_by_name_and_failures() {
    let app = TestApp::new(source_with_pikachu()).await;

    let (status, body) = app.get("/api/v1/pokemon/PIKACHU").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pokemon"]["name"], "pikachu");

    let (status, body) = app.get("/api/v1/pokemon/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No Pokemon found with that ID or name");

    let (status, body) = app.get("/api/v1/pokemon/2000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Pokemon ID must be between 1 and 1025");

    let (status, _) = app.get("/api/v1/pokemon/mr.mime").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_one_includes_evolutions() {
    let source = FakeDataSource::new()
        .with_generated(5)
        .with_evolution_chain(eevee_chain());
    let app = TestApp::new(source).await;

    let (status, body) = app.get("/api/v1/pokemon/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["evolutions"],
        json!(["pokemon-1", "pokemon-2", "pokemon-4", "pokemon-3"])
    );
}

#[tokio::test]
async fn test_evolution_failure_yields_empty_list() {
    let source = FakeDataSource::new()
        .with_generated(5)
        .with_evolution_chain(eevee_chain())
        .with_failing_evolutions();
    let app = TestApp::new(source).await;

    let (status, body) = app.get("/api/v1/pokemon/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pokemon"]["id"], 2);
    assert_eq!(body["data"]["evolutions"], json!([]));
}

#[tokio::test]
async fn test_missing_sprites_fall_back_to_empty_string() {
    let bare = Pokemon {
        sprites: PokemonSprites::default(),
        ..FakeDataSource::sample_pokemon(132, "ditto")
    };
    let app = TestApp::new(FakeDataSource::new().with_pokemon(bare)).await;

    let (status, body) = app.get("/api/v1/pokemon/132").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pokemon"]["sprites"]["front_default"], "");
}

#[tokio::test]
async fn test_search_validation_and_lookup() {
    let source = source_with_pikachu().with_pokemon(FakeDataSource::sample_pokemon(31, "pikachu-2"));
    let app = TestApp::new(source).await;

    let (status, body) = app.get("/api/v1/pokemon/search/Pikachu").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pokemon"]["id"], 25);

    let (status, _) = app.get("/api/v1/pokemon/search/pikachu-2").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/v1/pokemon/search/pikachu!!").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid Pokemon name format. Use only letters, numbers, and hyphens"
    );

    let long_name = "a".repeat(51);
    let (status, body) = app.get(&format!("/api/v1/pokemon/search/{long_name}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Pokemon name too long");

    let (status, body) = app.get("/api/v1/pokemon/search/missingno").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No Pokemon found with that name");
}

#[tokio::test]
async fn test_add_favorite_and_duplicate_conflict() {
    let app = TestApp::new(source_with_pikachu()).await;

    let (status, body) = app.post("/api/v1/favorites", pikachu_payload()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["favorite"]["pokemonId"], 25);
    assert_eq!(body["data"]["favorite"]["pokemonName"], "pikachu");
    assert!(body["data"]["favorite"]["addedAt"].is_string());

    let (status, body) = app.post("/api/v1/favorites", pikachu_payload()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "This Pokemon is already in favorites");
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_add_favorite_verification_failures() {
    let app = TestApp::new(source_with_pikachu()).await;

    let cases = [
        (json!({"pokemonName": "pikachu"}), StatusCode::BAD_REQUEST, "Pokemon ID is required"),
        (
            json!({"pokemonId": 5000, "pokemonName": "pikachu"}),
            StatusCode::BAD_REQUEST,
            "Pokemon ID out of range",
        ),
        (
            json!({"pokemonId": 25, "pokemonName": "raichu"}),
            StatusCode::BAD_REQUEST,
            "Pokemon ID and name do not match",
        ),
        (
            json!({"pokemonId": 25, "pokemonName": "raichu", "pokemonSprite": "not-a-url"}),
            StatusCode::BAD_REQUEST,
            "Pokemon ID and name do not match",
        ),
        (
            json!({"pokemonId": 900, "pokemonName": "nobody", "pokemonSprite": "not-a-url"}),
            StatusCode::NOT_FOUND,
            "Pokemon does not exist",
        ),
        (
            json!({"pokemonId": 900, "pokemonName": "nobody"}),
            StatusCode::NOT_FOUND,
            "Pokemon does not exist",
        ),
        (
            json!({"pokemonId": 25, "pokemonName": "pikachu", "pokemonSprite": "not-a-url"}),
            StatusCode::BAD_REQUEST,
            "Invalid sprite URL format",
        ),
        (
            json!({"pokemonId": 25, "pokemonName": "pikachu", "pokemonSprite": "https://evil.example.com/25.png"}),
            StatusCode::BAD_REQUEST,
            "Sprite URL must be from PokeAPI",
        ),
    ];

    for (payload, expected_status, expected_message) in cases {
        let (status, body) = app.post("/api/v1/favorites", payload).await;
        assert_eq!(status, expected_status, "{expected_message}");
        assert_eq!(body["message"], expected_message);
    }
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_favorite_upstream_failure_is_server_error() {
    let app = TestApp::new(FakeDataSource::new().with_error("connection refused")).await;

    let (status, body) = app.post("/api/v1/favorites", pikachu_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Failed to verify Pokemon existence");
}

#[tokio::test]
async fn test_malformed_json_body_is_rejected() {
    let app = TestApp::new(source_with_pikachu()).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/favorites")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_check_and_list_favorites() {
    let app = TestApp::new(source_with_pikachu()).await;
    app.post("/api/v1/favorites", pikachu_payload()).await;
    app.post(
        "/api/v1/favorites",
        json!({"pokemonId": 4, "pokemonName": "pokemon-4"}),
    )
    .await;

    let (status, body) = app.get("/api/v1/favorites").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 2);
    assert_eq!(body["data"]["favorites"][0]["pokemonId"], 4);

    let (_, body) = app.get("/api/v1/favorites/check/25").await;
    assert_eq!(body["data"]["isFavorite"], true);

    let (status, body) = app.delete("/api/v1/favorites/25").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Favorite removed successfully");
    assert!(body["data"].is_null());

    let (_, body) = app.get("/api/v1/favorites/check/25").await;
    assert_eq!(body["data"]["isFavorite"], false);

    let (status, body) = app.delete("/api/v1/favorites/25").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No favorite found with that Pokemon ID");
    assert_eq!(app.store.count().await.unwrap(), 1);

    let (status, _) = app.delete("/api/v1/favorites/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_favorites_twice() {
    let app = TestApp::new(source_with_pikachu()).await;
    app.post("/api/v1/favorites", pikachu_payload()).await;

    for _ in 0..2 {
        let (status, body) = app.delete("/api/v1/favorites/clear").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "All favorites cleared successfully");
        assert_eq!(app.store.count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_rate_limit_rejects_after_cap() {
    let settings = RateLimitSettings {
        max_requests: 2,
        ..RateLimitSettings::default()
    };
    let app = TestApp::with_rate_limit(FakeDataSource::new(), settings).await;

    for _ in 0..2 {
        let (status, _) = app.get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], "fail");
    assert_eq!(
        body["message"],
        "Too many requests from this IP, please try again in an hour"
    );
}

#[tokio::test]
async fn test_rate_limit_only_counts_api_paths() {
    let settings = RateLimitSettings {
        max_requests: 2,
        ..RateLimitSettings::default()
    };
    let app = TestApp::with_rate_limit(FakeDataSource::new(), settings).await;

    for _ in 0..5 {
        let (status, body) = app.get("/favicon.ico").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Can't find /favicon.ico on this server");
    }

    let (status, _) = app.get("/api/v1/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_responses_carry_rate_limit_and_security_headers() {
    let app = TestApp::new(FakeDataSource::new()).await;

    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers["ratelimit-limit"], "1000");
    assert_eq!(headers["ratelimit-remaining"], "999");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");

    let request = Request::builder()
        .uri("/robots.txt")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.headers().get("ratelimit-limit").is_none());
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}
