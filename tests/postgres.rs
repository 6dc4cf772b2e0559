#![cfg(feature = "db_tests")]

use stackloom::{
    error::Error,
    seed::SeedData,
    storage::{
        self, ArticleDraft, ContentRepository, NewArticleTag, NewCategory, PgRepository,
    },
};

/// 连接 `DATABASE_URL` 指向的数据库并清空所有表
async fn fresh_repo() -> PgRepository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let db = storage::new_db_pool(&url).await.expect("连接数据库失败");
    storage::migrate_file(&db, "sql/01-CREATE_TABLE.sql")
        .await
        .expect("初始化sql失败");

    let repo = PgRepository::new(db);
    sqlx::query(
        "TRUNCATE article_tags, articles, tags, authors, categories, subscribers RESTART IDENTITY CASCADE",
    )
    .execute(repo.db())
    .await
    .expect("清空数据失败");

    repo
}

fn draft(slug: &str, published_at: &str) -> ArticleDraft {
    ArticleDraft {
        title: Some(format!("Title {slug}")),
        slug: Some(slug.to_string()),
        excerpt: Some("excerpt".into()),
        content: Some("content".into()),
        author_id: Some(1),
        category_id: Some(1),
        published_at: Some(published_at.into()),
        ..Default::default()
    }
}

// 所有场景共用一个数据库，放在同一个测试里顺序执行
#[tokio::test]
#[ignore = "需要可用的 Postgres 数据库"]
async fn test_postgres_repository() {
    let repo = fresh_repo().await;
    repo.ping().await.expect("ping 失败");

    // 种子数据
    let data = SeedData::from_yaml(include_str!("../seed/demo.yaml")).expect("解析种子数据失败");
    let report = repo.seed(data).await.expect("写入种子数据失败");
    assert_eq!(report.categories, 4);
    assert_eq!(report.tags, 16);
    assert_eq!(report.articles, 4);
    assert_eq!(report.subscribers, 3);
    assert!(matches!(
        repo.add_subscriber("subscriber2@example.com".into()).await,
        Err(Error::Conflict(_))
    ));

    // 按 id / slug 查询
    let docker = repo.tag_by_slug("docker").await.unwrap().expect("标签不存在");
    assert_eq!(docker.id, 14);
    assert_eq!(repo.tag_by_id(docker.id).await.unwrap(), Some(docker));
    assert_eq!(repo.tag_by_id(999).await.unwrap(), None);
    assert_eq!(repo.tag_by_slug("rust").await.unwrap(), None);

    let first = repo.article_by_id(1).await.unwrap().expect("文章不存在");
    assert_eq!(first.slug, "building-serverless-applications-with-aws-lambda");
    assert_eq!(repo.article_by_id(999).await.unwrap(), None);

    // 分页和排序
    let page = repo.list_articles(1, 3).await.unwrap();
    assert_eq!(
        page.iter()
            .map(|d| d.article.slug.as_str())
            .collect::<Vec<_>>(),
        [
            "building-serverless-applications-with-aws-lambda",
            "python-best-practices-for-cloud-applications",
            "building-scalable-apis-with-express-and-nodejs",
        ]
    );
    assert_eq!(repo.list_articles(2, 3).await.unwrap().len(), 1);
    assert!(matches!(
        repo.list_articles(0, 3).await,
        Err(Error::Validation(_))
    ));

    let aws = repo.articles_by_category("aws", 1, 10).await.unwrap();
    assert_eq!(aws.len(), 1);
    assert_eq!(aws[0].category.as_ref().unwrap().slug, "aws");
    assert!(repo.articles_by_category("nope", 1, 10).await.unwrap().is_empty());

    assert_eq!(repo.featured_articles().await.unwrap().len(), 3);

    // 热门标签
    let popular = repo.popular_tags(2).await.unwrap();
    assert_eq!(
        popular
            .iter()
            .map(|p| (p.tag.slug.as_str(), p.count))
            .collect::<Vec<_>>(),
        [("docker", 3), ("serverless", 2)]
    );

    // 搜索不区分大小写，通配符按字面匹配
    let found = repo.search_articles("LAMBDA").await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(repo.search_articles("100%").await.unwrap().is_empty());

    // 详情
    let detail = repo
        .article_detail("microservices-architecture-in-aws")
        .await
        .unwrap()
        .expect("文章不存在");
    assert_eq!(detail.author.unwrap().email, "alex@stackloom.com");
    assert_eq!(detail.tags.len(), 4);
    assert!(repo.article_detail("missing").await.unwrap().is_none());

    // 创建文章
    let created = repo
        .create_article(draft("fresh-post", "2030-01-01"))
        .await
        .expect("创建文章失败");
    assert_eq!(created.read_time, 5);
    assert!(!created.is_featured);
    assert_eq!(
        repo.list_articles(1, 1).await.unwrap()[0].article.slug,
        "fresh-post"
    );
    assert!(matches!(
        repo.create_article(draft("fresh-post", "2030-01-02")).await,
        Err(Error::Conflict(_))
    ));

    // 标签关联
    repo.add_tag_to_article(NewArticleTag {
        article_id: created.id,
        tag_id: 1,
    })
    .await
    .expect("添加标签失败");
    assert_eq!(repo.tags_by_article(created.id).await.unwrap().len(), 1);
    assert!(matches!(
        repo.add_tag_to_article(NewArticleTag {
            article_id: created.id,
            tag_id: 999,
        })
        .await,
        Err(Error::Validation(_))
    ));

    // 订阅者
    repo.add_subscriber("reader@example.com".into())
        .await
        .expect("订阅失败");
    assert!(matches!(
        repo.add_subscriber(" reader@example.com ".into()).await,
        Err(Error::Conflict(_))
    ));

    // 唯一约束
    assert!(matches!(
        repo.create_category(NewCategory {
            name: "Other".into(),
            slug: "aws".into(),
            description: None,
            color: None,
        })
        .await,
        Err(Error::Conflict(_))
    ));

    // 种子数据失败时整体回滚
    let broken = SeedData::from_yaml(
        r#"
categories:
  - { name: Rust, slug: rust }
articles:
  - { title: T, slug: t, excerpt: E, content: C, author: nobody@example.com, category: rust, publishedAt: "2024-01-01" }
"#,
    )
    .unwrap();
    assert!(repo.seed(broken).await.is_err());
    assert!(repo.category_by_slug("rust").await.unwrap().is_none());

    // 重复的订阅者同样使整批回滚
    let duplicate = SeedData::from_yaml(
        r#"
categories:
  - { name: Go, slug: go }
subscribers:
  - subscriber3@example.com
"#,
    )
    .unwrap();
    assert!(matches!(repo.seed(duplicate).await, Err(Error::Conflict(_))));
    assert!(repo.category_by_slug("go").await.unwrap().is_none());

    repo.close().await;
}
