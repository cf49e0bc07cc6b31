use std::sync::Arc;

use anyhow::{Context, Result};
use groundcheck::report::{sample_indices, PatternAnalysis};
use groundcheck::{evaluate_batch, ConversationData, EvaluationMode, Evaluator, EvaluatorConfig};
use tracing::info;

use super::{load, Turns};
use crate::cli::AnalyzeArgs;

const OUTPUT_FILE: &str = "hallucination_analysis_detailed.csv";

pub async fn run(mut config: EvaluatorConfig, args: &AnalyzeArgs) -> Result<()> {
    config.mode = EvaluationMode::MultiAgent;
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    config.validate()?;

    let sample = spread(load(&config, Turns::FirstPerSession)?, args.limit);
    info!("📊 Analyzing {} conversations spread across the dataset", sample.len());

    let evaluator = Arc::new(Evaluator::from_config(&config)?);
    let results = evaluate_batch(evaluator, sample.clone(), true, config.max_workers).await;
    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        info!("⚠ {} evaluations failed and are left out of the analysis", failed);
    }

    let analysis = PatternAnalysis::build(&sample, &results);
    println!("{analysis}");

    let examples = analysis.examples(args.examples);
    let total = examples.len();
    for (i, row) in examples.into_iter().enumerate() {
        println!("\n{}", row.render_example(i + 1, total));
    }

    let summaries = analysis.severity_summaries();
    if !summaries.is_empty() {
        println!("\nHALLUCINATION SUMMARY BY SEVERITY");
        for summary in summaries {
            println!("{}: {} cases", summary.severity.as_str().to_uppercase(), summary.cases);
            println!("  Avg document length: {:.0} chars", summary.avg_doc_length);
            println!("  Avg documents provided: {:.1}", summary.avg_doc_count);
            println!("  Avg grounding ratio: {:.0}%", summary.avg_grounding_ratio * 100.0);
            println!("  Documents had answer: {}/{}", summary.had_answer, summary.cases);
        }
    }

    let path = config.output_dir.join(OUTPUT_FILE);
    analysis.write_csv(&path).context("writing pattern analysis")?;
    println!("\n💾 Saved detailed analysis to: {}", path.display());
    Ok(())
}

/// Picks `limit` conversations evenly spaced over the whole list.
fn spread(conversations: Vec<ConversationData>, limit: usize) -> Vec<ConversationData> {
    let indices = sample_indices(conversations.len(), limit);
    let mut slots: Vec<Option<ConversationData>> = conversations.into_iter().map(Some).collect();
    indices.into_iter().filter_map(|i| slots[i].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn spreads_sample_over_dataset() {
        let conversations: Vec<ConversationData> =
            (0..10).map(|i| ConversationData::new(format!("s{i}"), "q", "a", "d")).collect();
        let ids: Vec<String> = spread(conversations, 4).into_iter().map(|c| c.session_id).collect();
        assert_eq!(ids, vec!["s0", "s3", "s6", "s9"]);
    }
}
