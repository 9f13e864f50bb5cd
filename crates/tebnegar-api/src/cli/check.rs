//! `tebnegar check` - verify the configured LLM provider answers.

use std::time::Instant;

use anyhow::Result;
use console::style;

use tebnegar_infra::llm::{create_provider, resolve_api_key, test_provider_connection};

use crate::state::Storage;

pub async fn check(storage: &Storage, json: bool) -> Result<()> {
    let config = &storage.config.provider;
    let provider = create_provider(config, resolve_api_key(config)?)?;

    let start = Instant::now();
    let result = test_provider_connection(&provider).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if json {
        let check = serde_json::json!({
            "provider": provider.name(),
            "model": provider.model(),
            "healthy": result.is_ok(),
            "elapsed_ms": elapsed_ms,
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&check)?);
    } else {
        println!();
        match &result {
            Ok(()) => println!(
                "  {} {} ({}) answered in {elapsed_ms} ms",
                style("✓").green(),
                style(provider.name()).cyan(),
                provider.model()
            ),
            Err(e) => println!(
                "  {} {} ({}): {e}",
                style("✗").red(),
                style(provider.name()).cyan(),
                provider.model()
            ),
        }
        println!();
    }

    result.map_err(Into::into)
}
