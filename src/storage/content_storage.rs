use std::future::Future;

use chrono::Utc;
use sqlx::PgExecutor;

use crate::{
    error::Result,
    seed::SeedSink,
};

use super::{
    Db,
    models::{
        Article, Author, Category, NewArticle, NewArticleTag, NewAuthor, NewCategory, NewTag,
        Subscriber, Tag,
    },
    postgres::conflict_or,
};

/// 提供内容写入的数据库操作接口
///
/// 同一套 SQL 既可以直接在连接池上执行，也可以在事务中执行，
/// 取决于 [`ContentStorage::executor`] 返回的执行器。
pub trait ContentStorage: Send {
    /// 获取 SQL 执行器，用于 [`sqlx::query()`] 执行
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t>;

    /// 插入分类
    fn insert_category(
        &mut self,
        category: &NewCategory,
    ) -> impl Future<Output = Result<Category>> + Send {
        async move {
            sqlx::query_as::<_, Category>(
                "
                INSERT INTO categories (name, slug, description, color)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, slug, description, color
                ",
            )
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(&category.color)
            .fetch_one(self.executor())
            .await
            .map_err(|e| conflict_or(e, "category"))
        }
    }

    /// 插入作者
    fn insert_author(&mut self, author: &NewAuthor) -> impl Future<Output = Result<Author>> + Send {
        async move {
            sqlx::query_as::<_, Author>(
                "
                INSERT INTO authors (name, email, bio, avatar)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, email, bio, avatar
                ",
            )
            .bind(&author.name)
            .bind(&author.email)
            .bind(&author.bio)
            .bind(&author.avatar)
            .fetch_one(self.executor())
            .await
            .map_err(|e| conflict_or(e, "author email"))
        }
    }

    /// 插入标签
    fn insert_tag(&mut self, tag: &NewTag) -> impl Future<Output = Result<Tag>> + Send {
        async move {
            sqlx::query_as::<_, Tag>(
                "
                INSERT INTO tags (name, slug)
                VALUES ($1, $2)
                RETURNING id, name, slug
                ",
            )
            .bind(&tag.name)
            .bind(&tag.slug)
            .fetch_one(self.executor())
            .await
            .map_err(|e| conflict_or(e, "tag"))
        }
    }

    /// 插入已通过校验的文章
    fn insert_article(
        &mut self,
        article: &NewArticle,
    ) -> impl Future<Output = Result<Article>> + Send {
        async move {
            sqlx::query_as::<_, Article>(
                "
                INSERT INTO articles
                    (title, slug, excerpt, content, featured_image, author_id, category_id,
                     published_at, is_featured, read_time)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id, title, slug, excerpt, content, featured_image, author_id,
                          category_id, published_at, is_featured, read_time
                ",
            )
            .bind(&article.title)
            .bind(&article.slug)
            .bind(&article.excerpt)
            .bind(&article.content)
            .bind(&article.featured_image)
            .bind(article.author_id)
            .bind(article.category_id)
            .bind(article.published_at)
            .bind(article.is_featured)
            .bind(article.read_time)
            .fetch_one(self.executor())
            .await
            .map_err(|e| conflict_or(e, "article slug"))
        }
    }

    /// 插入文章与标签的关联行，不检查重复
    fn insert_article_tag(&mut self, link: NewArticleTag) -> impl Future<Output = Result<()>> + Send {
        async move {
            sqlx::query("INSERT INTO article_tags (article_id, tag_id) VALUES ($1, $2)")
                .bind(link.article_id)
                .bind(link.tag_id)
                .execute(self.executor())
                .await?;
            Ok(())
        }
    }

    /// 插入订阅者，订阅时间为当前时间
    fn insert_subscriber(&mut self, email: &str) -> impl Future<Output = Result<Subscriber>> + Send {
        async move {
            sqlx::query_as::<_, Subscriber>(
                "
                INSERT INTO subscribers (email, subscription_date)
                VALUES ($1, $2)
                RETURNING id, email, subscription_date
                ",
            )
            .bind(email)
            .bind(Utc::now())
            .fetch_one(self.executor())
            .await
            .map_err(|e| conflict_or(e, "subscriber email"))
        }
    }
}

/// 为 [`sqlx::PgTransaction`] 实现 [`ContentStorage`]
impl ContentStorage for sqlx::PgTransaction<'_> {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        self.as_mut()
    }
}

/// 为 [`Db`] 实现 [`ContentStorage`]
impl ContentStorage for &'_ Db {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        *self
    }
}

/// 种子数据在事务中写入
impl SeedSink for sqlx::PgTransaction<'_> {
    fn insert_category(
        &mut self,
        category: &NewCategory,
    ) -> impl Future<Output = Result<Category>> + Send {
        ContentStorage::insert_category(self, category)
    }

    fn insert_author(&mut self, author: &NewAuthor) -> impl Future<Output = Result<Author>> + Send {
        ContentStorage::insert_author(self, author)
    }

    fn insert_tag(&mut self, tag: &NewTag) -> impl Future<Output = Result<Tag>> + Send {
        ContentStorage::insert_tag(self, tag)
    }

    fn insert_article(
        &mut self,
        article: &NewArticle,
    ) -> impl Future<Output = Result<Article>> + Send {
        ContentStorage::insert_article(self, article)
    }

    fn insert_article_tag(&mut self, link: NewArticleTag) -> impl Future<Output = Result<()>> + Send {
        ContentStorage::insert_article_tag(self, link)
    }

    fn insert_subscriber(
        &mut self,
        email: &str,
    ) -> impl Future<Output = Result<Subscriber>> + Send {
        ContentStorage::insert_subscriber(self, email)
    }
}
