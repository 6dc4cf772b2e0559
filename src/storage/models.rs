use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationErrors};

/// 所有实体的主键类型，对应 Postgres 的 `SERIAL`
pub type Id = i32;

/// 文章分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Id,
    /// 分类名，唯一
    pub name: String,
    /// 路由使用的唯一标识
    pub slug: String,
    pub description: Option<String>,
    /// 前端展示用的主题色，如 `#3B82F6`
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// 文章作者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Author {
    pub id: Id,
    pub name: String,
    /// 邮箱，唯一
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAuthor {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// 标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

/// 热门标签：标签本身加上引用它的关联行数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PopularTag {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub tag: Tag,
    pub count: i64,
}

/// 文章行，不含作者、分类、标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Id,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub author_id: Id,
    pub category_id: Id,
    pub published_at: DateTime<Utc>,
    pub is_featured: bool,
    pub read_time: i32,
}

/// 文章详情
///
/// 在 [`Article`] 的基础上附带解析出的作者、分类和标签。
/// 作者或分类不存在时对应字段为 `null`，不会导致整个查询失败。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub author: Option<Author>,
    pub category: Option<Category>,
    /// 关联的标签，按关联顺序，重复的关联行会重复出现
    pub tags: Vec<Tag>,
}

/// 文章与标签的关联行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArticleTag {
    pub id: Id,
    pub article_id: Id,
    pub tag_id: Id,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticleTag {
    pub article_id: Id,
    pub tag_id: Id,
}

/// 订阅者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Id,
    pub email: String,
    pub subscription_date: DateTime<Utc>,
}

/// 通过校验、可以直接写入存储的文章
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub author_id: Id,
    pub category_id: Id,
    pub published_at: DateTime<Utc>,
    pub is_featured: bool,
    pub read_time: i32,
}

/// 创建文章的原始请求数据
///
/// 所有字段都是可选的，由 [`ArticleDraft::validate`] 统一检查并给出字段级错误。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleDraft {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub author_id: Option<Id>,
    pub category_id: Option<Id>,
    /// RFC 3339 时间或 `YYYY-MM-DD` 等常见格式
    pub published_at: Option<String>,
    pub is_featured: Option<bool>,
    pub read_time: Option<i32>,
}

impl ArticleDraft {
    /// 阅读时长的默认值（分钟）
    pub const DEFAULT_READ_TIME: i32 = 5;

    /// 检查必填字段和格式，成功时返回 [`NewArticle`]
    pub fn validate(self) -> Result<NewArticle> {
        let mut errors = ValidationErrors::new();

        let title = required(&mut errors, "title", self.title);
        let excerpt = required(&mut errors, "excerpt", self.excerpt);
        let content = required(&mut errors, "content", self.content);
        let slug = required(&mut errors, "slug", self.slug);
        if let Some(s) = slug.as_deref() {
            if !is_valid_slug(s) {
                errors.push("slug", "Slug may only contain a-z, 0-9 and '-'");
            }
        }

        if self.author_id.is_none() {
            errors.push("authorId", "Required");
        }
        if self.category_id.is_none() {
            errors.push("categoryId", "Required");
        }

        let published_at = match self.published_at.as_deref() {
            None => {
                errors.push("publishedAt", "Required");
                None
            }
            Some(s) => {
                let parsed = parse_timestamp(s);
                if parsed.is_none() {
                    errors.push("publishedAt", format!("Invalid date: {s}"));
                }
                parsed
            }
        };

        let read_time = self.read_time.unwrap_or(Self::DEFAULT_READ_TIME);
        if read_time < 1 {
            errors.push("readTime", "Read time must be a positive integer");
        }

        errors.check()?;

        Ok(NewArticle {
            title: title.unwrap_or_default(),
            slug: slug.unwrap_or_default(),
            excerpt: excerpt.unwrap_or_default(),
            content: content.unwrap_or_default(),
            featured_image: self.featured_image.filter(|s| !s.trim().is_empty()),
            author_id: self.author_id.unwrap_or_default(),
            category_id: self.category_id.unwrap_or_default(),
            published_at: published_at.unwrap_or_default(),
            is_featured: self.is_featured.unwrap_or(false),
            read_time,
        })
    }
}

fn required(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            errors.push(field, "Required");
            None
        }
    }
}

/// slug 只允许小写字母、数字和 `-`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// 解析时间字符串为 UTC 时间
///
/// 只接受 ISO 8601 形式：依次尝试 RFC 3339、不带时区的日期时间、
/// 纯日期（按当天零点）。不带时区的时间按 UTC 处理。
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive_dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::Error;

    fn complete_draft() -> ArticleDraft {
        ArticleDraft {
            title: Some("Building Serverless Applications".into()),
            slug: Some("building-serverless-applications".into()),
            excerpt: Some("Learn Lambda".into()),
            content: Some("# Lambda".into()),
            author_id: Some(1),
            category_id: Some(2),
            published_at: Some("2024-06-01T08:30:00Z".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_complete_draft_uses_defaults() {
        let article = complete_draft().validate().expect("应通过校验");

        assert_eq!(article.slug, "building-serverless-applications");
        assert_eq!(article.author_id, 1);
        assert_eq!(article.category_id, 2);
        assert!(!article.is_featured);
        assert_eq!(article.read_time, ArticleDraft::DEFAULT_READ_TIME);
        assert_eq!(
            article.published_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let Err(Error::Validation(errors)) = ArticleDraft::default().validate() else {
            panic!("空数据应校验失败");
        };

        let fields: Vec<_> = errors.fields().collect();
        for field in [
            "title",
            "excerpt",
            "content",
            "slug",
            "authorId",
            "categoryId",
            "publishedAt",
        ] {
            assert!(fields.contains(&field), "缺少字段错误: {field}");
        }
    }

    #[test]
    fn test_validate_rejects_malformed_values() {
        let draft = ArticleDraft {
            slug: Some("Not A Slug".into()),
            published_at: Some("yesterday".into()),
            read_time: Some(0),
            title: Some("   ".into()),
            ..complete_draft()
        };

        let Err(Error::Validation(errors)) = draft.validate() else {
            panic!("应校验失败");
        };
        let fields: Vec<_> = errors.fields().collect();
        assert_eq!(fields, vec!["title", "slug", "publishedAt", "readTime"]);
    }

    #[test]
    fn test_validate_rejects_non_iso_published_at() {
        for value in ["2023/06/20", "2023/06/20 08:00:00", "06-20-2023"] {
            let draft = ArticleDraft {
                published_at: Some(value.into()),
                ..complete_draft()
            };

            let Err(Error::Validation(errors)) = draft.validate() else {
                panic!("{value} 应校验失败");
            };
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["publishedAt"]);
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2023, 6, 20, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2023-06-20"), Some(midnight));
        assert_eq!(parse_timestamp("2023-06-20T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2023-06-20T00:00:00.000Z"), Some(midnight));
        assert_eq!(parse_timestamp("2023-06-20T08:00:00+08:00"), Some(midnight));
        assert_eq!(parse_timestamp("2023-06-20 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("20/06/2023"), None);
        assert_eq!(parse_timestamp("2023/06/20"), None);
        assert_eq!(parse_timestamp("2023/06/20 08:00:00"), None);
    }

    #[test]
    fn test_slug_rules() {
        assert!(is_valid_slug("aws-lambda-101"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("AWS"));
        assert!(!is_valid_slug("a b"));
    }

    #[test]
    fn test_article_detail_json_shape() {
        let detail = ArticleDetail {
            article: Article {
                id: 1,
                title: "T".into(),
                slug: "t".into(),
                excerpt: "E".into(),
                content: "C".into(),
                featured_image: None,
                author_id: 7,
                category_id: 3,
                published_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                is_featured: true,
                read_time: 5,
            },
            author: None,
            category: None,
            tags: vec![Tag {
                id: 1,
                name: "Lambda".into(),
                slug: "lambda".into(),
            }],
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["authorId"], 7);
        assert_eq!(value["isFeatured"], true);
        assert_eq!(value["readTime"], 5);
        assert_eq!(value["publishedAt"], "2024-01-02T03:04:05Z");
        assert!(value["author"].is_null());
        assert_eq!(value["tags"][0]["slug"], "lambda");
    }
}
