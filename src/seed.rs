//! 种子数据
//!
//! YAML 文档描述一批分类、作者、标签和文章。文章通过作者邮箱、分类 slug、
//! 标签 slug 引用同一批数据中的实体，写入时再解析为 id。

use std::{collections::HashMap, future::Future, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result, ValidationErrors},
    storage::{
        Article, ArticleDraft, Author, Category, Id, NewArticle, NewArticleTag, NewAuthor,
        NewCategory, NewTag, Subscriber, Tag, normalize_email,
    },
};

/// 一批种子数据
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub categories: Vec<NewCategory>,
    pub authors: Vec<NewAuthor>,
    pub tags: Vec<NewTag>,
    pub articles: Vec<SeedArticle>,
    /// 订阅者邮箱
    pub subscribers: Vec<String>,
}

/// 种子文章，通过 slug / 邮箱引用其他实体
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedArticle {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    /// 作者邮箱
    pub author: String,
    /// 分类 slug
    pub category: String,
    pub published_at: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub read_time: Option<i32>,
    /// 标签 slug
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 写入的行数统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categories: usize,
    pub authors: usize,
    pub tags: usize,
    pub articles: usize,
    pub article_tags: usize,
    pub subscribers: usize,
}

impl SeedData {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(Into::into)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// 种子数据的写入目标
///
/// 由具备事务语义的存储实现，[`apply`] 只负责解析引用和写入顺序。
pub trait SeedSink: Send {
    fn insert_category(
        &mut self,
        category: &NewCategory,
    ) -> impl Future<Output = Result<Category>> + Send;

    fn insert_author(&mut self, author: &NewAuthor) -> impl Future<Output = Result<Author>> + Send;

    fn insert_tag(&mut self, tag: &NewTag) -> impl Future<Output = Result<Tag>> + Send;

    fn insert_article(
        &mut self,
        article: &NewArticle,
    ) -> impl Future<Output = Result<Article>> + Send;

    fn insert_article_tag(&mut self, link: NewArticleTag)
    -> impl Future<Output = Result<()>> + Send;

    fn insert_subscriber(&mut self, email: &str)
    -> impl Future<Output = Result<Subscriber>> + Send;
}

/// 将种子数据写入 `sink`
///
/// 依次写入分类、作者、标签、文章及其标签关联，最后是订阅者。
/// 任一步失败立即返回，由调用方负责回滚。
pub async fn apply<S: SeedSink>(sink: &mut S, data: SeedData) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let mut categories = HashMap::new();
    for category in &data.categories {
        let row = sink.insert_category(category).await?;
        categories.insert(row.slug, row.id);
        report.categories += 1;
    }

    let mut authors = HashMap::new();
    for author in &data.authors {
        let row = sink.insert_author(author).await?;
        authors.insert(row.email, row.id);
        report.authors += 1;
    }

    let mut tags = HashMap::new();
    for tag in &data.tags {
        let row = sink.insert_tag(tag).await?;
        tags.insert(row.slug, row.id);
        report.tags += 1;
    }

    for article in data.articles {
        let tag_ids = article
            .tags
            .iter()
            .map(|slug| lookup(&tags, slug, "tags", &article.slug))
            .collect::<Result<Vec<_>>>()?;

        let draft = ArticleDraft {
            author_id: Some(lookup(&authors, &article.author, "author", &article.slug)?),
            category_id: Some(lookup(
                &categories,
                &article.category,
                "category",
                &article.slug,
            )?),
            title: Some(article.title),
            slug: Some(article.slug),
            excerpt: Some(article.excerpt),
            content: Some(article.content),
            featured_image: article.featured_image,
            published_at: Some(article.published_at),
            is_featured: Some(article.is_featured),
            read_time: article.read_time,
        };

        let row = sink.insert_article(&draft.validate()?).await?;
        report.articles += 1;

        for tag_id in tag_ids {
            sink.insert_article_tag(NewArticleTag {
                article_id: row.id,
                tag_id,
            })
            .await?;
            report.article_tags += 1;
        }
    }

    for email in &data.subscribers {
        sink.insert_subscriber(&normalize_email(email)?).await?;
        report.subscribers += 1;
    }

    Ok(report)
}

fn lookup(ids: &HashMap<String, Id>, key: &str, field: &'static str, article: &str) -> Result<Id> {
    ids.get(key).copied().ok_or_else(|| {
        Error::Validation(ValidationErrors::single(
            field,
            format!("article '{article}' references unknown {field} '{key}'"),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
categories:
  - { name: AWS, slug: aws, description: Everything about Amazon Web Services, color: "#FF9900" }
authors:
  - { name: Alex Stevens, email: alex@stackloom.com }
tags:
  - { name: Lambda, slug: lambda }
  - { name: S3, slug: s3 }
articles:
  - title: Building Serverless Applications with AWS Lambda
    slug: building-serverless-applications-with-aws-lambda
    excerpt: Learn Lambda
    content: "# Lambda"
    author: alex@stackloom.com
    category: aws
    publishedAt: 2023-06-20
    isFeatured: true
    tags: [lambda, s3]
subscribers:
  - reader@example.com
"##;

    #[test]
    fn test_seed_yaml_parses() {
        let data = SeedData::from_yaml(SAMPLE).expect("解析种子数据失败");

        assert_eq!(data.categories.len(), 1);
        assert_eq!(data.categories[0].color.as_deref(), Some("#FF9900"));
        assert_eq!(data.authors[0].bio, None);
        assert_eq!(data.tags.len(), 2);

        let article = &data.articles[0];
        assert!(article.is_featured);
        assert_eq!(article.read_time, None);
        assert_eq!(article.tags, vec!["lambda", "s3"]);
        assert_eq!(data.subscribers, vec!["reader@example.com"]);
    }

    #[test]
    fn test_seed_yaml_missing_sections_default_to_empty() {
        let data = SeedData::from_yaml("tags: []").expect("解析种子数据失败");
        assert!(data.categories.is_empty());
        assert!(data.articles.is_empty());
        assert!(data.subscribers.is_empty());
    }

    #[test]
    fn test_bundled_demo_seed_parses() {
        let data = SeedData::from_yaml(include_str!("../seed/demo.yaml")).expect("解析 demo 失败");

        assert!(!data.articles.is_empty());
        assert!(data.articles.iter().any(|a| a.is_featured));
        assert_eq!(data.subscribers.len(), 3);
        for article in &data.articles {
            assert!(data.authors.iter().any(|a| a.email == article.author));
            assert!(data.categories.iter().any(|c| c.slug == article.category));
            for tag in &article.tags {
                assert!(data.tags.iter().any(|t| &t.slug == tag), "未知标签 {tag}");
            }
        }
    }
}
