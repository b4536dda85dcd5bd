//! The `enrich` command: drive the full batch-enrichment loop.

use anyhow::Context;
use sqlx::PgPool;

use carscope_core::AppConfig;
use carscope_enrich::{run_enrichment, EnrichConfig, PgProfileStore};
use carscope_gemini::GeminiClient;

pub(crate) async fn run_enrich(
    pool: &PgPool,
    config: &AppConfig,
    batch_size: Option<i64>,
    chunk_size: Option<usize>,
    max_retries: Option<u32>,
) -> anyhow::Result<()> {
    let client = GeminiClient::with_base_url(
        &config.gemini_api_key,
        &config.gemini_model,
        config.gemini_timeout_secs,
        &config.gemini_base_url,
    )
    .context("constructing Gemini client")?;

    let mut enrich_config = EnrichConfig::from_app_config(config);
    if let Some(b) = batch_size {
        enrich_config.batch_size = b;
    }
    if let Some(c) = chunk_size {
        enrich_config.chunk_size = c;
    }
    if let Some(r) = max_retries {
        enrich_config.max_retries = r;
    }

    tracing::info!(
        batch_size = enrich_config.batch_size,
        chunk_size = enrich_config.chunk_size,
        max_retries = enrich_config.max_retries,
        "starting enrichment run"
    );

    let store = PgProfileStore::new(pool);
    let summary = run_enrichment(&store, &client, &enrich_config).await?;

    println!("Enrichment run complete:");
    println!("  batches fetched:   {}", summary.batches);
    println!("  chunks processed:  {}", summary.chunks);
    println!("  chunks abandoned:  {}", summary.chunks_abandoned);
    println!("  profiles updated:  {}", summary.updated);
    println!("  not found:         {}", summary.not_found);
    println!("  updates rejected:  {}", summary.rejected);
    println!("  record failures:   {}", summary.failed);

    Ok(())
}
