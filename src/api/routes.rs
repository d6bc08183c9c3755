use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Json, State},
    http::{
        header::{X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderMap, HeaderValue,
    },
    middleware,
    response::{Html, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::api::middleware::{check_origin, client_ip};
use crate::api::models::{
    GenerateListRequest, ItemDetails, ItemDetailsRequest, SuggestionsResponse,
};
use crate::api::response;
use crate::content::{get_language_instruction, render_markdown_in_result};
use crate::error::{AppError, Result};
use crate::llm::{generate_item_details, generate_item_list};
use crate::rate_limit::RouteClass;
use crate::wikipedia::fetch_wikipedia_images;
use crate::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Overall budget for one model-backed request
const HANDLER_TIMEOUT: Duration = Duration::from_secs(90);

const MAX_TEXT_CHARS: usize = 200;
const MAX_LANGUAGE_CHARS: usize = 5;
const MAX_PROPERTIES: usize = 10;
const MAX_PROPERTY_CHARS: usize = 50;
const DEFAULT_COUNT: u32 = 10;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/suggestions", get(suggestions_handler))
        .route("/api/generate-list", post(generate_list_handler))
        .route("/api/get-item-details", post(item_details_handler))
        .layer(middleware::from_fn(check_origin))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn language_or_default(language: Option<&str>) -> String {
    match language {
        Some(code) if !code.is_empty() => truncate_chars(code, MAX_LANGUAGE_CHARS),
        _ => "en".to_string(),
    }
}

async fn index(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Result<Html<&'static str>> {
    state.limiter.check(RouteClass::Default, &client_ip(connect_info))?;
    Ok(Html(INDEX_HTML))
}

async fn suggestions_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<SuggestionsResponse>> {
    state.limiter.check(RouteClass::Suggestions, &client_ip(connect_info))?;
    let suggestions = state.suggestions.get_or_generate(state.model.as_ref()).await;
    Ok(Json(SuggestionsResponse { suggestions }))
}

async fn generate_list_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<GenerateListRequest>, JsonRejection>,
) -> Result<Response> {
    let ip = client_ip(connect_info);
    state.limiter.check(RouteClass::GenerateList, &ip)?;
    let Json(req) = payload?;

    let category = truncate_chars(req.category.as_deref().unwrap_or(""), MAX_TEXT_CHARS);
    if category.is_empty() {
        return Err(AppError::BadRequest("Category is required".to_string()));
    }
    if category.trim().chars().count() < 2 {
        return Err(AppError::BadRequest(
            "Category must be at least 2 characters".to_string(),
        ));
    }
    let count = req.count_or(DEFAULT_COUNT);
    let language = language_or_default(req.language.as_deref());

    info!(%category, count, %language, "Generating item list");
    let start_time = Instant::now();
    let list = tokio::time::timeout(
        HANDLER_TIMEOUT,
        generate_item_list(
            state.model.as_ref(),
            &category,
            count,
            &get_language_instruction(&language),
        ),
    )
    .await
    .map_err(|_| AppError::Timeout)??;
    info!(
        items = list.items.len(),
        properties = list.properties.len(),
        elapsed = ?start_time.elapsed(),
        "Item list generated"
    );

    let session = state.sessions.open(response::session_id(&headers).as_deref(), &ip);
    state.sessions.with_session(&session.id, |data| {
        data.category = Some(category);
        data.language = language;
        data.items = list.items.clone();
        data.properties = list.properties.clone();
        data.details_cache.clear();
    });

    Ok(response::success(list, &session))
}

async fn item_details_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ItemDetailsRequest>, JsonRejection>,
) -> Result<Response> {
    let ip = client_ip(connect_info);
    state.limiter.check(RouteClass::ItemDetails, &ip)?;
    let Json(req) = payload?;

    let item = truncate_chars(req.item.as_deref().unwrap_or(""), MAX_TEXT_CHARS);
    if item.is_empty() {
        return Err(AppError::BadRequest("Item is required".to_string()));
    }
    let category = truncate_chars(req.category.as_deref().unwrap_or(""), MAX_TEXT_CHARS);
    let properties: Vec<String> = req
        .properties
        .unwrap_or_default()
        .iter()
        .take(MAX_PROPERTIES)
        .filter_map(Value::as_str)
        .map(|p| truncate_chars(p, MAX_PROPERTY_CHARS))
        .collect();
    let language = language_or_default(req.language.as_deref());

    let session = state.sessions.open(response::session_id(&headers).as_deref(), &ip);
    let (cached, session_category, session_properties, session_language) = state
        .sessions
        .with_session(&session.id, |data| {
            (
                data.details_cache.get(&item).cloned(),
                data.category.clone(),
                data.properties.clone(),
                data.language.clone(),
            )
        })
        .unwrap_or_default();

    if let Some(details) = cached {
        debug!(%item, "Item details served from session cache");
        return Ok(response::success(details, &session));
    }

    let category = if category.is_empty() {
        session_category.unwrap_or_else(|| "general".to_string())
    } else {
        category
    };
    let properties = if properties.is_empty() { session_properties } else { properties };
    let language = if language == "en" && !session_language.is_empty() {
        session_language
    } else {
        language
    };

    let start_time = Instant::now();
    let details = tokio::time::timeout(
        HANDLER_TIMEOUT,
        build_item_details(&state, &item, &category, &properties, &language),
    )
    .await
    .map_err(|_| AppError::Timeout)??;
    info!(
        %item,
        image_status = ?details.image_status,
        elapsed = ?start_time.elapsed(),
        "Item details generated"
    );

    state.sessions.with_session(&session.id, |data| {
        data.details_cache.insert(item.clone(), details.clone());
    });
    Ok(response::success(details, &session))
}

/// Text details from the model, rendered, plus images found on Wikipedia.
async fn build_item_details(
    state: &AppState,
    item: &str,
    category: &str,
    properties: &[String],
    language: &str,
) -> Result<ItemDetails> {
    let mut result = generate_item_details(
        state.model.as_ref(),
        item,
        category,
        properties,
        language,
        &get_language_instruction(language),
    )
    .await?;
    render_markdown_in_result(&mut result);

    let mut object = match result {
        Value::Object(object) => object,
        _ => return Err(AppError::ParseError("expected a JSON object".to_string())),
    };
    // English names find far better Wikipedia pages than translated ones.
    let english_name = take_text(object.remove("english_name"));
    let english_category = take_text(object.remove("english_category"));
    let search_name = english_name.as_deref().unwrap_or(item);
    let search_category = english_category.as_deref().unwrap_or(category);

    let images = fetch_wikipedia_images(
        state.wiki.as_ref(),
        search_name,
        Some(search_category),
        state.max_images,
        &state.image_scoring,
    )
    .await;

    Ok(ItemDetails {
        name: take_text(object.remove("name")).unwrap_or_else(|| item.to_string()),
        description: take_text(object.remove("description")).unwrap_or_default(),
        properties: match object.remove("properties") {
            Some(Value::Object(properties)) => properties,
            _ => Default::default(),
        },
        images: images.images,
        image_status: images.status,
        image_source: images.source_page,
    })
}

fn take_text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}
