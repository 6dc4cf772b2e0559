use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::Query;
use serde::Deserialize;

use crate::{
    error::{ApiError, Result, ValidationErrors},
    state::AppState,
    storage::{ArticleDetail, Category, ContentRepository, PopularTag, Tag},
};

/// 缺省页码
pub const DEFAULT_PAGE: i64 = 1;
/// 缺省每页条数
pub const DEFAULT_LIMIT: i64 = 10;
/// 每页条数上限
pub const MAX_LIMIT: i64 = 100;
/// 搜索词的最小长度（字符数）
pub const MIN_SEARCH_LEN: usize = 2;

/// 分页查询参数
///
/// 缺失、无法解析或非正数的值回落到默认值，`limit` 不超过 [`MAX_LIMIT`]。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageParams {
    page: Option<String>,
    limit: Option<String>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        positive(self.limit.as_deref()).map_or(DEFAULT_LIMIT, |l| l.min(MAX_LIMIT))
    }
}

fn positive(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

/// 获取所有分类。
pub async fn category_list<R: ContentRepository>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<Category>>> {
    state.repo().categories().await.map(Json)
}

/// 根据 slug 获取分类，不存在返回 404。
pub async fn category<R: ContentRepository>(
    Path(slug): Path<String>,
    State(state): State<AppState<R>>,
) -> Result<Json<Category>> {
    let category = state
        .repo()
        .category_by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(category))
}

/// 分页获取分类下的文章，分类不存在时返回空列表。
pub async fn category_articles<R: ContentRepository>(
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<ArticleDetail>>> {
    state
        .repo()
        .articles_by_category(&slug, params.page(), params.limit())
        .await
        .map(Json)
}

/// 分页获取文章列表，按发布时间倒序。
pub async fn article_list<R: ContentRepository>(
    Query(params): Query<PageParams>,
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<ArticleDetail>>> {
    state
        .repo()
        .list_articles(params.page(), params.limit())
        .await
        .map(Json)
}

pub async fn featured_articles<R: ContentRepository>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<ArticleDetail>>> {
    state.repo().featured_articles().await.map(Json)
}

/// 根据 slug 获取单篇文章。
///
/// 返回 [`ArticleDetail`]，如果文章不存在返回 404。
pub async fn article<R: ContentRepository>(
    Path(slug): Path<String>,
    State(state): State<AppState<R>>,
) -> Result<Json<ArticleDetail>> {
    let article = state
        .repo()
        .article_detail(&slug)
        .await?
        .ok_or(ApiError::NotFound("Article"))?;
    Ok(Json(article))
}

pub async fn tag_list<R: ContentRepository>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<Tag>>> {
    state.repo().tags().await.map(Json)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LimitParams {
    limit: Option<String>,
}

/// 获取热门标签，`limit` 规则同分页参数。
pub async fn popular_tags<R: ContentRepository>(
    Query(params): Query<LimitParams>,
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<PopularTag>>> {
    let limit = positive(params.limit.as_deref()).map_or(DEFAULT_LIMIT, |l| l.min(MAX_LIMIT));
    state.repo().popular_tags(limit).await.map(Json)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    q: Option<String>,
}

/// 搜索文章。
///
/// 去除首尾空白后少于 [`MIN_SEARCH_LEN`] 个字符的查询返回 400。
pub async fn search<R: ContentRepository>(
    Query(params): Query<SearchParams>,
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<ArticleDetail>>> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.chars().count() < MIN_SEARCH_LEN {
        ValidationErrors::single(
            "q",
            format!("Search query must be at least {MIN_SEARCH_LEN} characters"),
        )
        .check()?;
    }

    state.repo().search_articles(query).await.map(Json)
}
