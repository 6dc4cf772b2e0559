use std::{fmt, io};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

pub type Result<T> = core::result::Result<T, Error>;

/// 单个字段的校验失败信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// 字段名，与请求体中的 camelCase 名称一致
    pub field: &'static str,
    /// 失败原因
    pub message: String,
}

/// 字段级校验错误集合
///
/// 收集一次校验中所有失败的字段，最终通过 [`ValidationErrors::check`] 转换为 [`Error::Validation`]。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只包含一个字段错误
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 所有失败字段的名称
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }

    /// 没有错误时返回 `Ok(())`，否则返回 [`Error::Validation`]
    pub fn check(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid data: {0}")]
    Validation(ValidationErrors),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    ApiError(#[from] ApiError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Invalid request data", "errors": errors })),
            )
                .into_response(),
            Error::Conflict(_) => (
                StatusCode::CONFLICT,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
            Error::ApiError(api_error) => match api_error {
                ApiError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "message": api_error.to_string() })),
                )
                    .into_response(),
            },
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
                internal_error()
            }
            Error::Io(e) => {
                tracing::error!(%e, "file io error");
                internal_error()
            }
            e @ (Error::Toml(_) | Error::Yaml(_) | Error::Config(_)) => {
                tracing::error!(%e, "configuration error");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal Server Error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_check() {
        assert!(ValidationErrors::new().check().is_ok());

        let mut errors = ValidationErrors::new();
        errors.push("title", "Required");
        errors.push("slug", "Required");
        assert_eq!(errors.to_string(), "title: Required; slug: Required");

        match errors.check() {
            Err(Error::Validation(e)) => {
                assert_eq!(e.fields().collect::<Vec<_>>(), vec!["title", "slug"])
            }
            other => panic!("应为校验错误: {other:?}"),
        }
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (
                Error::Validation(ValidationErrors::single("email", "Required")),
                StatusCode::BAD_REQUEST,
            ),
            (Error::Conflict("subscriber email"), StatusCode::CONFLICT),
            (
                Error::ApiError(ApiError::NotFound("Article")),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::Sqlx(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Config("DATABASE_URL not set".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
