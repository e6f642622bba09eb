use anyhow::Context;
use richness_core::config::Config;
use richness_core::labels::parse_property_list;
use richness_core::remote::RemoteSparqlSource;
use richness_core::server::{router, AppState};
use richness_core::store::LocalStoreSource;
use richness_core::{AnalysisMode, EntityCountSource, InequalityAnalyzer};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let analyzer = InequalityAnalyzer::new(build_source(&config)?, config.analysis.clone());

    let args: Vec<String> = env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("analyze") {
        let class_id = args
            .get(1)
            .context("usage: richness analyze <classId> [properties]")?;
        let labels = args.get(2).map(|raw| parse_property_list(raw)).unwrap_or_default();

        let result = analyzer
            .analyze(class_id, &AnalysisMode::from_labels(labels))
            .await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(Arc::new(AppState::new(analyzer)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Richness engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_source(config: &Config) -> anyhow::Result<Arc<dyn EntityCountSource>> {
    if config.is_local() {
        let source = open_local_store(config)?
            .with_vocabulary(config.vocabulary.clone())
            .with_limit(config.limit());
        if let Some(path) = &config.data_path {
            source.load_file(path)?;
        }
        tracing::info!(
            data = ?config.data_path,
            store = ?config.store_path,
            "Analyzing local RDF data"
        );
        return Ok(Arc::new(source));
    }

    let source =
        RemoteSparqlSource::new(&config.endpoint, &config.user_agent, config.request_timeout)?
            .with_vocabulary(config.vocabulary.clone())
            .with_limit(config.limit());
    tracing::info!(endpoint = source.endpoint(), "Analyzing remote SPARQL endpoint");
    Ok(Arc::new(source))
}

fn open_local_store(config: &Config) -> anyhow::Result<LocalStoreSource> {
    match &config.store_path {
        #[cfg(feature = "rocksdb")]
        Some(path) => LocalStoreSource::open(path),
        #[cfg(not(feature = "rocksdb"))]
        Some(path) => anyhow::bail!(
            "RDF_STORE_PATH={} needs a build with the `rocksdb` feature",
            path.display()
        ),
        None => LocalStoreSource::in_memory(),
    }
}
