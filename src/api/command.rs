use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::Result,
    state::AppState,
    storage::{Article, ArticleDraft, ContentRepository, NewArticleTag, Subscriber},
};

use super::body_rejection;

/// 创建文章
///
/// 请求体缺失的字段在 [`ArticleDraft::validate`] 中统一报告，成功返回 201。
pub async fn create_article<R: ContentRepository>(
    State(state): State<AppState<R>>,
    payload: core::result::Result<Json<ArticleDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Article>)> {
    let Json(draft) = payload.map_err(body_rejection)?;

    let article = state.repo().create_article(draft).await?;
    tracing::info!(id = article.id, slug = %article.slug, "article created");

    Ok((StatusCode::CREATED, Json(article)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscribePayload {
    pub email: Option<String>,
}

/// 新增订阅者，邮箱重复返回 409。
pub async fn add_subscriber<R: ContentRepository>(
    State(state): State<AppState<R>>,
    payload: core::result::Result<Json<SubscribePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Subscriber>)> {
    let Json(data) = payload.map_err(body_rejection)?;

    let subscriber = state
        .repo()
        .add_subscriber(data.email.unwrap_or_default())
        .await?;
    tracing::info!(id = subscriber.id, "subscriber added");

    Ok((StatusCode::CREATED, Json(subscriber)))
}

pub async fn add_article_tag<R: ContentRepository>(
    State(state): State<AppState<R>>,
    payload: core::result::Result<Json<NewArticleTag>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(link) = payload.map_err(body_rejection)?;

    state.repo().add_tag_to_article(link).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Tag added to article successfully" })),
    ))
}
