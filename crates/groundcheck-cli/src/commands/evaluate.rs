use std::sync::Arc;

use anyhow::{Context, Result};
use groundcheck::report::{export, QualityReport};
use groundcheck::{evaluate_batch, Evaluator, EvaluatorConfig};
use tracing::info;

use super::{load, take, Turns};
use crate::cli::EvaluateArgs;

pub async fn run(mut config: EvaluatorConfig, args: &EvaluateArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let turns = if args.first_turn_only { Turns::FirstPerSession } else { Turns::All };
    let conversations = take(load(&config, turns)?, args.limit);
    let run_verification = !args.no_verification;

    info!("╔══════════════════════════════════════════════════════════════");
    info!("║ EVALUATE: {} conversations", conversations.len());
    info!("║ Provider: {} | mode: {} | prompt: {}", config.provider, config.mode, config.prompt_version);
    info!("║ Verification: {} | workers: {}", run_verification, config.max_workers);
    info!("╚══════════════════════════════════════════════════════════════");

    let evaluator = Arc::new(Evaluator::from_config(&config)?);
    let results = evaluate_batch(evaluator, conversations, run_verification, config.max_workers).await;

    let ts = export::timestamp();
    let csv_path = export::output_path(&config.output_dir, "evaluation", &ts, "csv");
    let json_path = export::output_path(&config.output_dir, "evaluation", &ts, "json");
    export::write_results_csv(&csv_path, &results).context("writing evaluation CSV")?;
    export::write_json(&json_path, &results).context("writing evaluation JSON")?;

    println!("{}", QualityReport::from_results(&results));
    println!("Results: {}", csv_path.display());
    println!("         {}", json_path.display());
    Ok(())
}
