use stackloom::{config::Config, error::Result, seed::SeedData, storage::ContentRepository};

fn print_usage_and_exit() -> ! {
    eprintln!("Usage: stackloom-seed <file>");
    std::process::exit(1);
}

async fn seed(path: &str) -> Result<()> {
    let data = SeedData::from_file(path)?;
    let config = Config::load()?;

    let repo = stackloom::connect_postgres(&config).await?;
    let result = repo.seed(data).await;
    repo.close().await;

    let report = result?;
    tracing::info!(
        categories = report.categories,
        authors = report.authors,
        tags = report.tags,
        articles = report.articles,
        article_tags = report.article_tags,
        subscribers = report.subscribers,
        "seed applied"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1); // 跳过程序名

    let path = args.next().unwrap_or_else(|| {
        eprintln!("Missing <file>");
        print_usage_and_exit();
    });

    if args.next().is_some() {
        eprintln!("Too many arguments provided.");
        print_usage_and_exit();
    }

    stackloom::init_tracing();

    if let Err(e) = seed(&path).await {
        eprintln!("seed failed: {e}");
        std::process::exit(1);
    }
}
