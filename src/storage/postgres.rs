use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::error::{Error, Result};

/// 数据库连接池类型
pub type Db = sqlx::PgPool;

/// 建表语句，启动时按需执行
pub const SCHEMA: &str = include_str!("../../sql/01-CREATE_TABLE.sql");

/// 根据连接 URL 创建新的数据库连接池
///
/// 连接池配置：
///
/// - 最大空闲时间 60 秒
/// - 最大生存时间 1500 秒（约 25 分钟）
/// - 最大连接数 10
/// - 获取连接超时 2 秒
/// - 获取前测试连接
/// - 最小连接数 2
pub async fn new_db_pool(conn_url: &str) -> Result<Db> {
    let pool = PgPoolOptions::new()
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1500))
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(2))
        .test_before_acquire(true)
        .min_connections(2)
        .connect(conn_url)
        .await?;
    Ok(pool)
}

/// 执行一段 SQL 迁移脚本
///
/// 将内容按 `;` 分割，每条 SQL 单独执行，空语句跳过
pub async fn migrate(db: &Db, script: &str) -> Result<()> {
    for sql in script.split(';') {
        if sql.trim().is_empty() {
            continue;
        }
        sqlx::query(sql).execute(db).await?;
    }
    Ok(())
}

/// 执行 SQL 文件中的迁移语句
pub async fn migrate_file(db: &Db, file: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    migrate(db, &content).await
}

/// 唯一约束冲突转换为 [`Error::Conflict`]，其余保持为存储错误
pub(crate) fn conflict_or(err: sqlx::Error, what: &'static str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Error::Conflict(what),
        _ => Error::Sqlx(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_are_separable() {
        let statements: Vec<_> = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        for table in [
            "categories",
            "authors",
            "tags",
            "articles",
            "article_tags",
            "subscribers",
        ] {
            let create = format!("CREATE TABLE IF NOT EXISTS {table} ");
            assert!(
                statements.iter().any(|s| s.starts_with(&create)),
                "缺少建表语句: {table}"
            );
        }
        assert!(statements.iter().all(|s| s.contains("IF NOT EXISTS")));
    }

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        assert!(matches!(
            conflict_or(sqlx::Error::RowNotFound, "tag"),
            Error::Sqlx(sqlx::Error::RowNotFound)
        ));
    }
}
