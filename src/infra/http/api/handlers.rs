use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use headway_api_types::{ArticleCreateRequest, ArticleUpdateRequest, HealthResponse, MutationResponse};
use serde::Deserialize;

use crate::application::content::{ArticleListQuery, ProductListQuery};
use crate::application::wordpress::PostListQuery;
use crate::domain::entities::{ArticleChanges, ArticleRecord, NewArticle};

use super::error::ApiError;
use super::middleware::MutationGrant;
use super::state::ApiState;

const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ArticleListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    pub limit: Option<i64>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Headway is running".to_string(),
    })
}

pub async fn db_health(State(state): State<ApiState>) -> Response {
    crate::infra::http::db_health_response(state.db.health_check().await)
}

pub async fn list_articles(
    State(state): State<ApiState>,
    Query(params): Query<ArticleListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = ArticleListQuery::default();
    let query = ArticleListQuery {
        limit: params.limit.unwrap_or(defaults.limit).clamp(1, MAX_LIST_LIMIT),
        offset: params.offset.unwrap_or(defaults.offset).max(0),
    };
    let articles = state.content.articles(query).await?;
    Ok(Json(articles))
}

pub async fn get_article(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.content.article(id).await?;
    Ok(Json(article))
}

pub async fn create_article(
    _grant: MutationGrant,
    State(state): State<ApiState>,
    Json(payload): Json<ArticleCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .articles
        .create(NewArticle {
            title: payload.title,
            content: payload.content,
            author: payload.author,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(mutation_response("Article created successfully", Some(article))),
    ))
}

pub async fn update_article(
    _grant: MutationGrant,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(payload): Json<ArticleUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .articles
        .update(
            id,
            ArticleChanges {
                title: payload.title,
                content: payload.content,
                author: payload.author,
            },
        )
        .await?;

    Ok(Json(mutation_response(
        "Article updated successfully",
        Some(article),
    )))
}

pub async fn delete_article(
    _grant: MutationGrant,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.articles.delete(id).await?;
    Ok(Json(mutation_response("Article deleted successfully", None)))
}

pub async fn list_products(
    State(state): State<ApiState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let category = params
        .category
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let products = state.content.products(ProductListQuery { category }).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.content.product(id).await?;
    Ok(Json(product))
}

pub async fn list_team(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let members = state.content.team_members().await?;
    Ok(Json(members))
}

pub async fn list_wordpress_posts(
    State(state): State<ApiState>,
    Query(params): Query<PostListParams>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(PostListQuery::default().limit)
        .clamp(1, MAX_LIST_LIMIT);
    Json(state.wordpress.posts(PostListQuery { limit }).await)
}

pub async fn get_wordpress_post(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .wordpress
        .post(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("WordPress post not found"))
}

fn mutation_response(
    message: &str,
    article: Option<ArticleRecord>,
) -> MutationResponse<ArticleRecord> {
    MutationResponse {
        success: true,
        message: message.to_string(),
        article,
    }
}
