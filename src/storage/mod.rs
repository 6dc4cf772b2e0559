mod content_storage;
mod memory;
mod models;
mod pg_repository;
mod postgres;
mod repository;

pub use self::{
    content_storage::ContentStorage,
    memory::MemoryRepository,
    models::{
        Article, ArticleDetail, ArticleDraft, ArticleTag, Author, Category, Id, NewArticle,
        NewArticleTag, NewAuthor, NewCategory, NewTag, PopularTag, Subscriber, Tag,
        is_valid_slug, parse_timestamp,
    },
    pg_repository::PgRepository,
    postgres::{Db, SCHEMA, migrate, migrate_file, new_db_pool},
    repository::{ContentRepository, Page, SEARCH_RESULT_CAP},
};

pub(crate) use self::repository::normalize_email;
