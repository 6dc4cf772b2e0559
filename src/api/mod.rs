mod command;
mod health;
mod query;

use axum::{
    Router,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::{
    config::Config,
    error::{Error, Result, ValidationErrors},
    state::AppState,
    storage::ContentRepository,
};

/// 设置应用的路由。
///
/// `/api` 下为内容查询和管理接口，`/health` 为存活检查。
/// `/api` 下成功的 GET 响应带有 `Cache-Control: public, max-age=<cache_max_age>`。
pub fn setup_route<R: ContentRepository>(app: AppState<R>, cache_max_age: u64) -> Router {
    let api = Router::new()
        .route("/categories", get(query::category_list::<R>))
        .route("/categories/{slug}", get(query::category::<R>))
        .route(
            "/categories/{slug}/articles",
            get(query::category_articles::<R>),
        )
        .route(
            "/articles",
            get(query::article_list::<R>).post(command::create_article::<R>),
        )
        .route("/articles/featured", get(query::featured_articles::<R>))
        .route("/articles/{slug}", get(query::article::<R>))
        .route("/tags", get(query::tag_list::<R>))
        .route("/tags/popular", get(query::popular_tags::<R>))
        .route("/search", get(query::search::<R>))
        .route("/subscribers", post(command::add_subscriber::<R>))
        .route("/article-tags", post(command::add_article_tag::<R>))
        .layer(middleware::from_fn_with_state(
            CacheMaxAge(cache_max_age),
            cache_control,
        ));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health::health::<R>))
        .with_state(app)
}

/// 启动 HTTP 服务，并使用给定的路由处理请求。
///
/// 收到 Ctrl-C 后停止接收新连接，等待处理中的请求结束。
#[instrument(name = "http server", skip_all)]
pub async fn run_server_with_router(router: Router, listen: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;

    tracing::info!("listening on {listen}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// 启动 HTTP 服务，自动设置路由和中间件。
///
/// 1. 生成路由
/// 2. 添加日志和追踪中间件
/// 3. 启动服务器
pub async fn run_server<R: ContentRepository>(app: AppState<R>, config: &Config) -> Result<()> {
    let router = setup_route(app, config.cache_max_age);
    let router = add_middlewares(router);
    run_server_with_router(router, &config.listen).await
}

/// 为路由添加中间件，包括请求追踪和失败日志记录。
///
/// 日志记录会在请求失败时输出错误信息。
fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(
        TraceLayer::new_for_http()
            .on_failure(log_failure)
            .on_request(|_req: &_, _span: &tracing::Span| {
                // 空实现，关闭请求日志
            }),
    )
}

#[derive(Clone, Copy)]
struct CacheMaxAge(u64);

/// 为成功的 GET 响应补充缓存头
async fn cache_control(
    State(CacheMaxAge(max_age)): State<CacheMaxAge>,
    req: Request,
    next: Next,
) -> Response {
    let cacheable = req.method() == Method::GET;
    let mut response = next.run(req).await;

    if cacheable && response.status().is_success() {
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={max_age}")) {
            response
                .headers_mut()
                .entry(header::CACHE_CONTROL)
                .or_insert(value);
        }
    }
    response
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(%e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// 请求体中可能出现的字段名
const BODY_FIELDS: &[&str] = &[
    "title",
    "slug",
    "excerpt",
    "content",
    "featuredImage",
    "authorId",
    "categoryId",
    "publishedAt",
    "isFeatured",
    "readTime",
    "email",
    "articleId",
    "tagId",
];

/// 把请求体解析失败转换为字段级校验错误
///
/// 字段类型错误时归到该字段，其余情况归到 `body`。
fn body_rejection(rejection: JsonRejection) -> Error {
    let message = rejection.body_text();
    let field = match rejection {
        JsonRejection::JsonDataError(_) => rejected_field(&message),
        _ => None,
    };
    Error::Validation(ValidationErrors::single(field.unwrap_or("body"), message))
}

/// 从 `<说明>: <字段路径>: <原因>` 中取出字段名
fn rejected_field(message: &str) -> Option<&'static str> {
    let (_, detail) = message.split_once(": ")?;
    let (path, _) = detail.split_once(": ")?;
    BODY_FIELDS.iter().copied().find(|field| *field == path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_field() {
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: authorId: \
                 invalid type: string \"x\", expected i32 at line 1 column 15"
            ),
            Some("authorId")
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: \
                 missing field `tagId` at line 1 column 15"
            ),
            None
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: \
                 invalid type: sequence, expected struct ArticleDraft"
            ),
            None
        );
    }
}
