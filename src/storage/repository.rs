use std::future::Future;

use crate::{
    error::{Error, Result, ValidationErrors},
    seed::{SeedData, SeedReport},
};

use super::models::{
    Article, ArticleDetail, ArticleDraft, Author, Category, Id, NewArticleTag, NewAuthor,
    NewCategory, NewTag, PopularTag, Subscriber, Tag,
};

/// 搜索结果的最大条数
pub const SEARCH_RESULT_CAP: i64 = 5;

/// 分页窗口
///
/// 页码从 1 开始，窗口为 `(page - 1) * limit .. page * limit`。
/// 构造时拒绝非正数，不做钳制。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: i64,
    limit: i64,
}

impl Page {
    pub fn new(page: i64, limit: i64) -> Result<Self> {
        let mut errors = ValidationErrors::new();
        if page < 1 {
            errors.push("page", "Page must be a positive integer");
        }
        if limit < 1 {
            errors.push("limit", "Limit must be a positive integer");
        }
        errors.check()?;
        Ok(Self { page, limit })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// 跳过的行数
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// 内容仓储
///
/// 博客所需的全部读写能力。实现者只需提供存储原语，
/// 分页校验、按分类过滤、文章详情填充等查询策略由默认方法统一实现，
/// 保证不同存储之间行为一致。
///
/// 所有按 `published_at` 倒序的查询在时间相同时按 `id` 升序排列。
pub trait ContentRepository: Send + Sync + 'static {
    /// 全部分类，按创建顺序
    fn categories(&self) -> impl Future<Output = Result<Vec<Category>>> + Send;

    fn category_by_id(&self, id: Id) -> impl Future<Output = Result<Option<Category>>> + Send;

    fn category_by_slug(&self, slug: &str)
    -> impl Future<Output = Result<Option<Category>>> + Send;

    fn create_category(
        &self,
        category: NewCategory,
    ) -> impl Future<Output = Result<Category>> + Send;

    fn author_by_id(&self, id: Id) -> impl Future<Output = Result<Option<Author>>> + Send;

    fn create_author(&self, author: NewAuthor) -> impl Future<Output = Result<Author>> + Send;

    /// 全部标签，按创建顺序
    fn tags(&self) -> impl Future<Output = Result<Vec<Tag>>> + Send;

    fn tag_by_id(&self, id: Id) -> impl Future<Output = Result<Option<Tag>>> + Send;

    fn tag_by_slug(&self, slug: &str) -> impl Future<Output = Result<Option<Tag>>> + Send;

    fn create_tag(&self, tag: NewTag) -> impl Future<Output = Result<Tag>> + Send;

    /// 文章关联的标签，按关联行顺序，保留重复
    fn tags_by_article(&self, article_id: Id) -> impl Future<Output = Result<Vec<Tag>>> + Send;

    /// 按关联行数量倒序的标签，未被引用的标签不出现
    ///
    /// 数量相同时按标签 `id` 升序。`limit` 必须为正数。
    fn popular_tags(&self, limit: i64) -> impl Future<Output = Result<Vec<PopularTag>>> + Send;

    /// 一页文章行，可选按分类过滤
    fn article_page(
        &self,
        window: Page,
        category_id: Option<Id>,
    ) -> impl Future<Output = Result<Vec<Article>>> + Send;

    /// 所有精选文章行
    fn featured(&self) -> impl Future<Output = Result<Vec<Article>>> + Send;

    fn article_by_id(&self, id: Id) -> impl Future<Output = Result<Option<Article>>> + Send;

    fn article_by_slug(&self, slug: &str) -> impl Future<Output = Result<Option<Article>>> + Send;

    /// 在标题、摘要、正文中做不区分大小写的子串匹配，最多返回 `cap` 条
    fn search(&self, query: &str, cap: i64) -> impl Future<Output = Result<Vec<Article>>> + Send;

    /// 校验并保存新文章
    fn create_article(&self, draft: ArticleDraft) -> impl Future<Output = Result<Article>> + Send;

    /// 添加一条文章与标签的关联
    ///
    /// 文章或标签不存在时返回校验错误；重复关联不会被拒绝。
    fn add_tag_to_article(&self, link: NewArticleTag) -> impl Future<Output = Result<()>> + Send;

    /// 添加订阅者，邮箱重复时返回 [`crate::error::Error::Conflict`]
    fn add_subscriber(&self, email: String) -> impl Future<Output = Result<Subscriber>> + Send;

    /// 原子地写入一批种子数据，失败时不留下任何数据
    fn seed(&self, data: SeedData) -> impl Future<Output = Result<SeedReport>> + Send;

    /// 检查存储是否可用
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// 释放存储资源
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// 为文章填充作者、分类和标签
    ///
    /// 三个查询并发执行；作者或分类不存在时对应字段为 `None`。
    fn enrich(&self, article: Article) -> impl Future<Output = Result<ArticleDetail>> + Send {
        async move {
            let (author, category, tags) = tokio::try_join!(
                self.author_by_id(article.author_id),
                self.category_by_id(article.category_id),
                self.tags_by_article(article.id),
            )?;

            Ok(ArticleDetail {
                article,
                author,
                category,
                tags,
            })
        }
    }

    fn enrich_all(
        &self,
        articles: Vec<Article>,
    ) -> impl Future<Output = Result<Vec<ArticleDetail>>> + Send {
        async move {
            let mut details = Vec::with_capacity(articles.len());
            for article in articles {
                details.push(self.enrich(article).await?);
            }
            Ok(details)
        }
    }

    /// 分页查询文章详情，按发布时间倒序
    fn list_articles(
        &self,
        page: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ArticleDetail>>> + Send {
        async move {
            let window = Page::new(page, limit)?;
            let articles = self.article_page(window, None).await?;
            self.enrich_all(articles).await
        }
    }

    /// 分页查询某分类下的文章详情
    ///
    /// 分类不存在时返回空列表。
    fn articles_by_category(
        &self,
        category_slug: &str,
        page: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ArticleDetail>>> + Send {
        async move {
            let window = Page::new(page, limit)?;
            let Some(category) = self.category_by_slug(category_slug).await? else {
                return Ok(Vec::new());
            };
            let articles = self.article_page(window, Some(category.id)).await?;
            self.enrich_all(articles).await
        }
    }

    /// 所有精选文章详情，按发布时间倒序，不做数量限制
    fn featured_articles(&self) -> impl Future<Output = Result<Vec<ArticleDetail>>> + Send {
        async move {
            let articles = self.featured().await?;
            self.enrich_all(articles).await
        }
    }

    /// 按 slug 查询文章详情
    fn article_detail(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<ArticleDetail>>> + Send {
        async move {
            match self.article_by_slug(slug).await? {
                Some(article) => self.enrich(article).await.map(Some),
                None => Ok(None),
            }
        }
    }

    /// 搜索文章详情，最多 [`SEARCH_RESULT_CAP`] 条
    fn search_articles(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ArticleDetail>>> + Send {
        async move {
            let articles = self.search(query, SEARCH_RESULT_CAP).await?;
            self.enrich_all(articles).await
        }
    }
}

/// 检查订阅邮箱，返回去除首尾空白后的值
pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::Validation(ValidationErrors::single("email", "Required")));
    }
    Ok(email.to_string())
}

/// 关联的文章和标签都必须存在
pub(crate) fn check_link(link: NewArticleTag, article_exists: bool, tag_exists: bool) -> Result<()> {
    let mut errors = ValidationErrors::new();
    if !article_exists {
        errors.push(
            "articleId",
            format!("Article {} does not exist", link.article_id),
        );
    }
    if !tag_exists {
        errors.push("tagId", format!("Tag {} does not exist", link.tag_id));
    }
    errors.check()
}

/// 检查热门标签的数量参数
pub(crate) fn check_tag_limit(limit: i64) -> Result<()> {
    if limit < 1 {
        return ValidationErrors::single("limit", "Limit must be a positive integer").check();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        let page = Page::new(3, 10).unwrap();
        assert_eq!(page.offset(), 20);
        assert_eq!(page.limit(), 10);
        assert_eq!(Page::new(1, 1).unwrap().offset(), 0);
    }

    #[test]
    fn test_page_rejects_non_positive() {
        for (page, limit) in [(0, 10), (1, 0), (-1, 10), (1, -5)] {
            assert!(
                matches!(Page::new(page, limit), Err(Error::Validation(_))),
                "page={page} limit={limit} 应被拒绝"
            );
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  a@b.io ").unwrap(), "a@b.io");
        assert!(matches!(normalize_email("   "), Err(Error::Validation(_))));
    }
}
