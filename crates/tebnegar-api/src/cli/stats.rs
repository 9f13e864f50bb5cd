//! `tebnegar stats` - dashboard counts without starting the server.

use anyhow::Result;
use console::style;

use tebnegar_core::repository::feedback::FeedbackRepository;
use tebnegar_infra::sqlite::feedback::SqliteFeedbackRepository;

use crate::state::Storage;

pub async fn stats(storage: &Storage, json: bool) -> Result<()> {
    let repo = SqliteFeedbackRepository::new(storage.db_pool.clone());
    let stats = repo.dashboard_stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} TebNegar v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "  {}",
        style(storage.data_dir.display().to_string()).dim()
    );
    println!();
    println!("  Sessions       {}", style(stats.total_sessions).cyan());
    println!("  Conversations  {}", style(stats.total_conversations).cyan());
    println!("  Messages       {}", style(stats.total_messages).cyan());
    println!(
        "  Feedback       {} {}  {} {}",
        style(stats.like_count).green(),
        style("likes").dim(),
        style(stats.dislike_count).red(),
        style("dislikes").dim()
    );
    println!();

    Ok(())
}
