/// Content API Handlers
///
/// HTTP adapter over `RecommendationService`: query parsing, enrichment and
/// the error payload. No pipeline logic lives here.
mod enrichment;
mod error;

pub use enrichment::{ContentResponse, Enricher};
pub use error::{AppError, ErrorEntry, Result};

use crate::controllers::ControllerRegistry;
use crate::metrics;
use crate::models::{ContentId, RecommendationRequest, RequestConfig, UserId, ANONYMOUS_USER};
use crate::services::RecommendationService;
use actix_web::error::{PathError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Header carrying the caller's user id; absent or invalid means anonymous.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared handler state
pub struct AppState {
    pub service: Arc<RecommendationService>,
    pub enricher: Enricher,
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Query parameters for GET /api/v1/content
///
/// Flags are true only for the literal string "true".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    pub page: Option<u32>,
    pub limit: Option<usize>,
    pub controller: Option<String>,
    #[serde(rename = "content_id")]
    pub content_id: Option<String>,
    pub seed: Option<String>,
    pub two_tower: Option<String>,
    pub collab_filter: Option<String>,
    pub your_choice: Option<String>,
    pub policy_filter_one: Option<String>,
    pub policy_filter_two: Option<String>,
    pub linear_regression: Option<String>,
    pub inverse_filter: Option<String>,
    pub random_predictions: Option<String>,
    pub inverse_ranker: Option<String>,
}

fn flag(value: &Option<String>, default: bool) -> bool {
    value.as_deref().map_or(default, |v| v == "true")
}

impl ContentQuery {
    pub fn request_config(&self) -> Result<RequestConfig> {
        let defaults = RequestConfig::default();
        let config = RequestConfig {
            two_tower: flag(&self.two_tower, defaults.two_tower),
            collab_filter: flag(&self.collab_filter, defaults.collab_filter),
            your_choice: flag(&self.your_choice, defaults.your_choice),
            policy_filter_one: flag(&self.policy_filter_one, defaults.policy_filter_one),
            policy_filter_two: flag(&self.policy_filter_two, defaults.policy_filter_two),
            linear_model: flag(&self.linear_regression, defaults.linear_model),
            inverse_filter: flag(&self.inverse_filter, defaults.inverse_filter),
            random_predictions: flag(&self.random_predictions, defaults.random_predictions),
            inverse_ranker: flag(&self.inverse_ranker, defaults.inverse_ranker),
            ..defaults
        };

        Ok(match self.anchor()? {
            Some(anchor) => config.with_anchor(anchor),
            None => config,
        })
    }

    /// `content_id`, where "undefined" or empty means no anchor.
    fn anchor(&self) -> Result<Option<ContentId>> {
        match self.content_id.as_deref().map(str::trim) {
            None | Some("") | Some("undefined") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::BadRequest(format!("content_id must be an integer, got {:?}", raw))),
        }
    }

    fn seed(&self) -> Result<f64> {
        match self.seed.as_deref().map(str::trim) {
            None | Some("") => Ok(rand::random::<f64>()),
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::BadRequest(format!("seed must be a number, got {:?}", raw))),
        }
    }

    pub fn to_request(&self, user_id: UserId, default_limit: usize, max_limit: usize) -> Result<RecommendationRequest> {
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        let mut request = RecommendationRequest::new(user_id, limit, self.seed()?)
            .with_page(self.page.unwrap_or(0))
            .with_config(self.request_config()?);
        request.controller = self.controller.clone().filter(|name| !name.trim().is_empty());
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct ControllerEntry {
    pub controller: &'static str,
}

fn user_id(req: &HttpRequest) -> UserId {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(ANONYMOUS_USER)
}

async fn recommend(state: &AppState, user_id: UserId, request: RecommendationRequest) -> Result<HttpResponse> {
    debug!(
        user_id,
        controller = request.controller.as_deref().unwrap_or("default"),
        page = request.page,
        limit = request.limit,
        "Content requested"
    );

    let ranked = state.service.recommend(request).await?;
    let responses = state.enricher.enrich(user_id, &ranked).await?;

    Ok(HttpResponse::Ok().json(responses))
}

/// GET /api/v1/content
pub async fn get_content(
    req: HttpRequest,
    query: web::Query<ContentQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = user_id(&req);
    let request = query.to_request(user_id, state.default_limit, state.max_limit)?;
    recommend(&state, user_id, request).await
}

/// GET /api/v1/content/similarcontent/{content_id}
pub async fn get_similar_content(
    req: HttpRequest,
    path: web::Path<ContentId>,
    query: web::Query<ContentQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = user_id(&req);
    let mut request = query.to_request(user_id, state.default_limit, state.max_limit)?;
    request.config = request.config.with_anchor(path.into_inner());
    recommend(&state, user_id, request).await
}

/// GET /api/v1/content/listcontrollers
pub async fn list_controllers() -> HttpResponse {
    let entries: Vec<ControllerEntry> = ControllerRegistry::list()
        .into_iter()
        .map(|controller| ControllerEntry { controller })
        .collect();
    HttpResponse::Ok().json(entries)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed query or path values get the same payload as other bad requests.
fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .service(
            web::scope("/api/v1/content")
                .route("", web::get().to(get_content))
                .route("/listcontrollers", web::get().to(list_controllers))
                .route("/similarcontent/{content_id}", web::get().to(get_similar_content)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::{PipelineContext, PipelineSettings};
    use crate::services::prediction::LinearModelWeights;
    use crate::store::fixtures::{self, ACTIVE_USER};
    use actix_web::{test as actix_test, App};

    fn state() -> web::Data<AppState> {
        let store = fixtures::memory_store();
        let context = PipelineContext::new(
            fixtures::stores(),
            PipelineSettings::default(),
            LinearModelWeights::default(),
        );
        web::Data::new(AppState {
            service: Arc::new(RecommendationService::new(&context)),
            enricher: Enricher::new(store.clone(), store),
            default_limit: 10,
            max_limit: 100,
        })
    }

    #[test]
    fn test_query_flags_follow_literal_true() {
        let query = ContentQuery {
            two_tower: Some("false".to_string()),
            inverse_ranker: Some("true".to_string()),
            random_predictions: Some("1".to_string()),
            content_id: Some("undefined".to_string()),
            ..ContentQuery::default()
        };

        let config = query.request_config().unwrap();
        assert!(!config.two_tower);
        assert!(config.collab_filter);
        assert!(config.inverse_ranker);
        assert!(!config.random_predictions);
        assert_eq!(config.anchor_content_id, None);
    }

    #[test]
    fn test_limit_is_clamped() {
        let query = ContentQuery {
            limit: Some(5000),
            seed: Some("0.5".to_string()),
            ..ContentQuery::default()
        };

        let request = query.to_request(ACTIVE_USER, 10, 100).unwrap();
        assert_eq!(request.limit, 100);
        assert_eq!(request.seed, 0.5);
        assert_eq!(request.controller, None);
    }

    #[test]
    fn test_bad_content_id_is_rejected() {
        let query = ContentQuery {
            content_id: Some("abc".to_string()),
            ..ContentQuery::default()
        };
        assert!(matches!(query.request_config(), Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn test_get_content_returns_enriched_items() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/content?controller=Foxtrot&limit=5&seed=0.5")
            .insert_header((USER_ID_HEADER, ACTIVE_USER.to_string()))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: Vec<serde_json::Value> = actix_test::read_body_json(resp).await;
        assert!(!body.is_empty());
        assert!(body.len() <= 5);
        assert!(body.iter().all(|item| item.get("total_likes").is_some()));
    }

    #[actix_web::test]
    async fn test_list_controllers_route() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = actix_test::TestRequest::get().uri("/api/v1/content/listcontrollers").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            body,
            serde_json::json!([{ "controller": "Random" }, { "controller": "Foxtrot" }])
        );
    }

    #[actix_web::test]
    async fn test_similar_content_route() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/content/similarcontent/7?controller=Foxtrot&twoTower=false&collabFilter=false&seed=0.5")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: Vec<serde_json::Value> = actix_test::read_body_json(resp).await;
        assert!(!body.is_empty());
        assert!(body.iter().all(|item| item["id"] != 7));
    }

    #[actix_web::test]
    async fn test_bad_seed_returns_error_payload() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = actix_test::TestRequest::get().uri("/api/v1/content?seed=abc").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body[0]["id"], 0);
        assert!(body[0]["errors"].as_str().unwrap().contains("seed"));
    }

    #[actix_web::test]
    async fn test_malformed_limit_returns_error_payload() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = actix_test::TestRequest::get().uri("/api/v1/content?limit=many").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body[0]["id"], 0);
        assert!(body[0]["errors"].as_str().unwrap().starts_with("Bad request"));
    }

    #[actix_web::test]
    async fn test_malformed_path_id_returns_error_payload() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/content/similarcontent/abc")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body[0]["id"], 0);
    }
}
