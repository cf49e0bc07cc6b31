//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use groundcheck::{EvaluationMode, EvaluatorConfig, PromptVersion, ProviderKind};

#[derive(Debug, Parser)]
#[command(name = "groundcheck", version, about = "LLM judges for hallucination and grounding checks")]
pub struct Cli {
    /// Directory holding the four input CSV exports.
    #[arg(long, global = true, env = "GROUNDCHECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON file with evaluator settings; environment and flags override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Debug logging (RUST_LOG still wins when set).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate conversations and write CSV/JSON results.
    Evaluate(EvaluateArgs),
    /// Compare the lenient and strict hallucination prompts on the same conversations.
    AbTest(AbTestArgs),
    /// Look for patterns shared by hallucinating answers.
    Analyze(AnalyzeArgs),
    /// Report missing credentials and input files.
    CheckSetup,
    /// List Gemini models that support generateContent.
    ListModels,
}

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Evaluate at most this many conversations.
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    #[arg(long, value_enum)]
    pub prompt_version: Option<VersionArg>,

    /// Skip the verification pass.
    #[arg(long)]
    pub no_verification: bool,

    /// Conversations evaluated concurrently.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Only the first turn of each session.
    #[arg(long)]
    pub first_turn_only: bool,
}

#[derive(Debug, Args)]
pub struct AbTestArgs {
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    #[arg(long, default_value = "./ab_test_results")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Sample size, spread evenly over all sessions.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Hallucination examples to print.
    #[arg(long, default_value_t = 10)]
    pub examples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Gemini,
    Vertex,
    #[value(name = "openai")]
    OpenAi,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Gemini => Self::Gemini,
            ProviderArg::Vertex => Self::Vertex,
            ProviderArg::OpenAi => Self::OpenAi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    MultiAgent,
    Unified,
}

impl From<ModeArg> for EvaluationMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::MultiAgent => Self::MultiAgent,
            ModeArg::Unified => Self::Unified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VersionArg {
    V1,
    V2,
}

impl From<VersionArg> for PromptVersion {
    fn from(arg: VersionArg) -> Self {
        match arg {
            VersionArg::V1 => Self::V1,
            VersionArg::V2 => Self::V2,
        }
    }
}

impl Cli {
    /// Defaults, then the config file, then environment, then global flags.
    pub fn evaluator_config(&self) -> Result<EvaluatorConfig> {
        let base = match &self.config {
            Some(path) => EvaluatorConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => EvaluatorConfig::default(),
        };

        let mut config = base.with_env();
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(provider) = self.provider {
            config.provider = provider.into();
        }
        Ok(config)
    }
}

impl EvaluateArgs {
    pub fn apply(&self, config: &mut EvaluatorConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(version) = self.prompt_version {
            config.prompt_version = version.into();
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_evaluate_flags() {
        let cli = Cli::parse_from([
            "groundcheck",
            "--provider",
            "openai",
            "evaluate",
            "--limit",
            "5",
            "--mode",
            "unified",
            "--prompt-version",
            "v2",
            "--no-verification",
            "--workers",
            "4",
        ]);
        assert_eq!(cli.provider, Some(ProviderArg::OpenAi));

        let Command::Evaluate(args) = &cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.limit, Some(5));
        assert!(args.no_verification);

        let mut config = EvaluatorConfig::default();
        args.apply(&mut config);
        assert_eq!(config.mode, EvaluationMode::Unified);
        assert_eq!(config.prompt_version, PromptVersion::V2);
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn ab_test_and_analyze_defaults() {
        let cli = Cli::parse_from(["groundcheck", "ab-test"]);
        let Command::AbTest(args) = cli.command else {
            panic!("expected ab-test");
        };
        assert_eq!(args.limit, 20);
        assert_eq!(args.output_dir, PathBuf::from("./ab_test_results"));

        let cli = Cli::parse_from(["groundcheck", "analyze", "--examples", "3", "--verbose"]);
        assert!(cli.verbose);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.limit, 50);
        assert_eq!(args.examples, 3);
    }

    #[test]
    fn global_flags_override_config() {
        let cli = Cli::parse_from(["groundcheck", "--data-dir", "/data/export", "--provider", "vertex", "check-setup"]);
        let config = cli.evaluator_config().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/data/export"));
        assert_eq!(config.provider, ProviderKind::Vertex);
    }
}
