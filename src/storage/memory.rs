use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{Error, Result},
    seed::{self, SeedData, SeedReport, SeedSink},
};

use super::{
    models::{
        Article, ArticleDraft, ArticleTag, Author, Category, Id, NewArticle, NewArticleTag,
        NewAuthor, NewCategory, NewTag, PopularTag, Subscriber, Tag,
    },
    repository::{ContentRepository, Page, check_link, check_tag_limit, normalize_email},
};

/// 每张表独立的自增 id
#[derive(Debug, Default, Clone)]
struct Sequences {
    category: Id,
    author: Id,
    tag: Id,
    article: Id,
    article_tag: Id,
    subscriber: Id,
}

fn next_id(seq: &mut Id) -> Id {
    *seq += 1;
    *seq
}

/// 内存中的全部数据，行按插入顺序保存
#[derive(Debug, Default, Clone)]
struct Tables {
    categories: Vec<Category>,
    authors: Vec<Author>,
    tags: Vec<Tag>,
    articles: Vec<Article>,
    article_tags: Vec<ArticleTag>,
    subscribers: Vec<Subscriber>,
    seq: Sequences,
}

impl Tables {
    fn insert_category(&mut self, category: &NewCategory) -> Result<Category> {
        if self.categories.iter().any(|c| c.name == category.name) {
            return Err(Error::Conflict("category name"));
        }
        if self.categories.iter().any(|c| c.slug == category.slug) {
            return Err(Error::Conflict("category slug"));
        }

        let row = Category {
            id: next_id(&mut self.seq.category),
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            color: category.color.clone(),
        };
        self.categories.push(row.clone());
        Ok(row)
    }

    fn insert_author(&mut self, author: &NewAuthor) -> Result<Author> {
        if self.authors.iter().any(|a| a.email == author.email) {
            return Err(Error::Conflict("author email"));
        }

        let row = Author {
            id: next_id(&mut self.seq.author),
            name: author.name.clone(),
            email: author.email.clone(),
            bio: author.bio.clone(),
            avatar: author.avatar.clone(),
        };
        self.authors.push(row.clone());
        Ok(row)
    }

    fn insert_tag(&mut self, tag: &NewTag) -> Result<Tag> {
        if self.tags.iter().any(|t| t.name == tag.name) {
            return Err(Error::Conflict("tag name"));
        }
        if self.tags.iter().any(|t| t.slug == tag.slug) {
            return Err(Error::Conflict("tag slug"));
        }

        let row = Tag {
            id: next_id(&mut self.seq.tag),
            name: tag.name.clone(),
            slug: tag.slug.clone(),
        };
        self.tags.push(row.clone());
        Ok(row)
    }

    fn insert_article(&mut self, article: &NewArticle) -> Result<Article> {
        if self.articles.iter().any(|a| a.slug == article.slug) {
            return Err(Error::Conflict("article slug"));
        }

        let row = Article {
            id: next_id(&mut self.seq.article),
            title: article.title.clone(),
            slug: article.slug.clone(),
            excerpt: article.excerpt.clone(),
            content: article.content.clone(),
            featured_image: article.featured_image.clone(),
            author_id: article.author_id,
            category_id: article.category_id,
            published_at: article.published_at,
            is_featured: article.is_featured,
            read_time: article.read_time,
        };
        self.articles.push(row.clone());
        Ok(row)
    }

    fn insert_article_tag(&mut self, link: NewArticleTag) -> Result<()> {
        check_link(
            link,
            self.articles.iter().any(|a| a.id == link.article_id),
            self.tags.iter().any(|t| t.id == link.tag_id),
        )?;

        let id = next_id(&mut self.seq.article_tag);
        self.article_tags.push(ArticleTag {
            id,
            article_id: link.article_id,
            tag_id: link.tag_id,
        });
        Ok(())
    }

    fn insert_subscriber(&mut self, email: String) -> Result<Subscriber> {
        if self.subscribers.iter().any(|s| s.email == email) {
            return Err(Error::Conflict("subscriber email"));
        }

        let row = Subscriber {
            id: next_id(&mut self.seq.subscriber),
            email,
            subscription_date: Utc::now(),
        };
        self.subscribers.push(row.clone());
        Ok(row)
    }

    /// 按发布时间倒序的文章，时间相同保持插入顺序
    fn articles_newest_first(&self, filter: impl Fn(&Article) -> bool) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| filter(a))
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles
    }
}

impl SeedSink for Tables {
    async fn insert_category(&mut self, category: &NewCategory) -> Result<Category> {
        Tables::insert_category(self, category)
    }

    async fn insert_author(&mut self, author: &NewAuthor) -> Result<Author> {
        Tables::insert_author(self, author)
    }

    async fn insert_tag(&mut self, tag: &NewTag) -> Result<Tag> {
        Tables::insert_tag(self, tag)
    }

    async fn insert_article(&mut self, article: &NewArticle) -> Result<Article> {
        Tables::insert_article(self, article)
    }

    async fn insert_article_tag(&mut self, link: NewArticleTag) -> Result<()> {
        Tables::insert_article_tag(self, link)
    }

    async fn insert_subscriber(&mut self, email: &str) -> Result<Subscriber> {
        Tables::insert_subscriber(self, email.to_string())
    }
}

/// 内存实现的 [`ContentRepository`]
///
/// 用于测试和无数据库的演示模式，进程退出后数据丢失。
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentRepository for MemoryRepository {
    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.tables.read().await.categories.clone())
    }

    async fn category_by_id(&self, id: Id) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        self.tables.write().await.insert_category(&category)
    }

    async fn author_by_id(&self, id: Id) -> Result<Option<Author>> {
        let tables = self.tables.read().await;
        Ok(tables.authors.iter().find(|a| a.id == id).cloned())
    }

    async fn create_author(&self, author: NewAuthor) -> Result<Author> {
        self.tables.write().await.insert_author(&author)
    }

    async fn tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tables.read().await.tags.clone())
    }

    async fn tag_by_id(&self, id: Id) -> Result<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.iter().find(|t| t.slug == slug).cloned())
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag> {
        self.tables.write().await.insert_tag(&tag)
    }

    async fn tags_by_article(&self, article_id: Id) -> Result<Vec<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables
            .article_tags
            .iter()
            .filter(|link| link.article_id == article_id)
            .filter_map(|link| tables.tags.iter().find(|t| t.id == link.tag_id))
            .cloned()
            .collect())
    }

    async fn popular_tags(&self, limit: i64) -> Result<Vec<PopularTag>> {
        check_tag_limit(limit)?;
        let tables = self.tables.read().await;

        let mut counts: HashMap<Id, i64> = HashMap::new();
        for link in &tables.article_tags {
            *counts.entry(link.tag_id).or_default() += 1;
        }

        // tags 按 id 升序保存，稳定排序后同数量的标签保持 id 顺序
        let mut ranked: Vec<PopularTag> = tables
            .tags
            .iter()
            .filter_map(|tag| {
                counts.get(&tag.id).map(|&count| PopularTag {
                    tag: tag.clone(),
                    count,
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(ranked)
    }

    async fn article_page(&self, window: Page, category_id: Option<Id>) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        let articles =
            tables.articles_newest_first(|a| category_id.is_none_or(|id| a.category_id == id));

        Ok(articles
            .into_iter()
            .skip(usize::try_from(window.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit()).unwrap_or(usize::MAX))
            .collect())
    }

    async fn featured(&self) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        Ok(tables.articles_newest_first(|a| a.is_featured))
    }

    async fn article_by_id(&self, id: Id) -> Result<Option<Article>> {
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.slug == slug).cloned())
    }

    async fn search(&self, query: &str, cap: i64) -> Result<Vec<Article>> {
        let query = query.to_lowercase();
        let tables = self.tables.read().await;

        let mut matches = tables.articles_newest_first(|a| {
            a.title.to_lowercase().contains(&query)
                || a.excerpt.to_lowercase().contains(&query)
                || a.content.to_lowercase().contains(&query)
        });
        matches.truncate(usize::try_from(cap).unwrap_or(0));
        Ok(matches)
    }

    async fn create_article(&self, draft: ArticleDraft) -> Result<Article> {
        let article = draft.validate()?;
        self.tables.write().await.insert_article(&article)
    }

    async fn add_tag_to_article(&self, link: NewArticleTag) -> Result<()> {
        self.tables.write().await.insert_article_tag(link)
    }

    async fn add_subscriber(&self, email: String) -> Result<Subscriber> {
        let email = normalize_email(&email)?;
        self.tables.write().await.insert_subscriber(email)
    }

    async fn seed(&self, data: SeedData) -> Result<SeedReport> {
        let mut tables = self.tables.write().await;

        // 在副本上写入，全部成功后再替换
        let mut staged = tables.clone();
        let report = seed::apply(&mut staged, data).await?;
        *tables = staged;
        Ok(report)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}
