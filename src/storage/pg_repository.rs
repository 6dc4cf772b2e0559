use crate::{
    error::Result,
    seed::{self, SeedData, SeedReport},
};

use super::{
    ContentStorage, Db,
    models::{
        Article, ArticleDraft, Author, Category, Id, NewArticleTag, NewAuthor, NewCategory, NewTag,
        PopularTag, Subscriber, Tag,
    },
    repository::{ContentRepository, Page, check_link, check_tag_limit, normalize_email},
};

/// 文章行的查询列
///
/// 所有返回 [`Article`] 的查询都使用这组列，顺序与结构体字段一致。
macro_rules! article_columns {
    () => {
        "id, title, slug, excerpt, content, featured_image, author_id, category_id, \
         published_at, is_featured, read_time"
    };
}

/// Postgres 实现的 [`ContentRepository`]
///
/// 持有连接池，所有读操作都是单条语句；种子数据在一个事务中写入。
#[derive(Debug, Clone)]
pub struct PgRepository {
    db: Db,
}

impl PgRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// 获取数据库连接池
    pub fn db(&self) -> &Db {
        &self.db
    }
}

impl ContentRepository for PgRepository {
    async fn categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, color FROM categories ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn category_by_id(&self, id: Id) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, color FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, color FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        let mut db = &self.db;
        db.insert_category(&category).await
    }

    async fn author_by_id(&self, id: Id) -> Result<Option<Author>> {
        let row = sqlx::query_as::<_, Author>(
            "SELECT id, name, email, bio, avatar FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create_author(&self, author: NewAuthor) -> Result<Author> {
        let mut db = &self.db;
        db.insert_author(&author).await
    }

    async fn tags(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn tag_by_id(&self, id: Id) -> Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag> {
        let mut db = &self.db;
        db.insert_tag(&tag).await
    }

    async fn tags_by_article(&self, article_id: Id) -> Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.slug
            FROM article_tags l
            INNER JOIN tags t ON t.id = l.tag_id
            WHERE l.article_id = $1
            ORDER BY l.id
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn popular_tags(&self, limit: i64) -> Result<Vec<PopularTag>> {
        check_tag_limit(limit)?;
        let rows = sqlx::query_as::<_, PopularTag>(
            r#"
            SELECT t.id, t.name, t.slug, COUNT(l.id) AS count
            FROM article_tags l
            INNER JOIN tags t ON t.id = l.tag_id
            GROUP BY t.id, t.name, t.slug
            ORDER BY count DESC, t.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn article_page(&self, window: Page, category_id: Option<Id>) -> Result<Vec<Article>> {
        let mut builder =
            sqlx::QueryBuilder::new(concat!("SELECT ", article_columns!(), " FROM articles"));

        if let Some(id) = category_id {
            builder.push(" WHERE category_id = ").push_bind(id);
        }

        builder.push(" ORDER BY published_at DESC, id ASC");
        builder.push(" LIMIT ").push_bind(window.limit());
        builder.push(" OFFSET ").push_bind(window.offset());

        let query = builder.build_query_as::<Article>();
        let rows = query.fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn featured(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, Article>(concat!(
            "SELECT ",
            article_columns!(),
            " FROM articles WHERE is_featured = TRUE ORDER BY published_at DESC, id ASC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn article_by_id(&self, id: Id) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, Article>(concat!(
            "SELECT ",
            article_columns!(),
            " FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, Article>(concat!(
            "SELECT ",
            article_columns!(),
            " FROM articles WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn search(&self, query: &str, cap: i64) -> Result<Vec<Article>> {
        // strpos 做纯子串匹配，查询中的 % 和 _ 不会被当作通配符
        let rows = sqlx::query_as::<_, Article>(concat!(
            "SELECT ",
            article_columns!(),
            r#"
            FROM articles
            WHERE strpos(lower(title), lower($1)) > 0
               OR strpos(lower(excerpt), lower($1)) > 0
               OR strpos(lower(content), lower($1)) > 0
            ORDER BY published_at DESC, id ASC
            LIMIT $2
            "#
        ))
        .bind(query)
        .bind(cap)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create_article(&self, draft: ArticleDraft) -> Result<Article> {
        let article = draft.validate()?;
        let mut db = &self.db;
        db.insert_article(&article).await
    }

    async fn add_tag_to_article(&self, link: NewArticleTag) -> Result<()> {
        let (article_exists, tag_exists): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM articles WHERE id = $1),
                EXISTS (SELECT 1 FROM tags WHERE id = $2)
            "#,
        )
        .bind(link.article_id)
        .bind(link.tag_id)
        .fetch_one(&self.db)
        .await?;

        check_link(link, article_exists, tag_exists)?;

        let mut db = &self.db;
        db.insert_article_tag(link).await
    }

    async fn add_subscriber(&self, email: String) -> Result<Subscriber> {
        let email = normalize_email(&email)?;
        let mut db = &self.db;
        db.insert_subscriber(&email).await
    }

    async fn seed(&self, data: SeedData) -> Result<SeedReport> {
        let mut tx = self.db.begin().await?;

        match seed::apply(&mut tx, data).await {
            Ok(report) => {
                tx.commit().await?;
                Ok(report)
            }
            Err(e) => {
                tx.rollback().await.ok();
                tracing::error!(%e, "seed rolled back");
                Err(e)
            }
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
