//! Environment checks and model discovery.

use std::path::Path;

use anyhow::{bail, Context, Result};
use groundcheck::{EvaluatorConfig, GeminiClient, GenerationSettings, ModelInfo, ProviderKind};

const RULE: &str = "════════════════════════════════════════════════════════════";
const PLACEHOLDERS: [&str; 3] = ["your-gemini-api-key-here", "your-project-id-here", "changeme"];

/// Preferred models per tier, best first.
const PRO_CANDIDATES: [&str; 3] = ["gemini-1.5-pro", "gemini-1.5-pro-latest", "gemini-pro"];
const FLASH_CANDIDATES: [&str; 3] = ["gemini-2.0-flash-exp", "gemini-1.5-flash", "gemini-1.5-flash-latest"];

/// Prints what is configured and fails when anything required is missing.
pub fn check(config: &EvaluatorConfig) -> Result<()> {
    let mut problems = Vec::new();

    println!("{RULE}");
    println!("🔍 GROUNDCHECK SETUP VERIFICATION");
    println!("{RULE}");

    println!("\n1. Environment");
    if Path::new(".env").exists() {
        println!("   ✅ .env file found");
    } else {
        println!("   ⚠️  .env file not found (using process environment)");
    }

    println!("\n2. Credentials (provider: {})", config.provider);
    let gemini = credential_line("GEMINI_API_KEY", config.gemini_api_key.as_deref(), true);
    let vertex = credential_line("VERTEX_PROJECT_ID", config.vertex_project_id.as_deref(), false);
    let openai = credential_line("OPENAI_API_KEY", config.openai_api_key.as_deref(), true);
    for line in [&gemini, &vertex, &openai] {
        println!("   {}", line.text);
    }
    if config.provider == ProviderKind::Vertex {
        println!("   ℹ️  Vertex location: {}", config.vertex_location);
    }
    if let Some(base) = &config.openai_api_base {
        println!("   ℹ️  OpenAI-compatible base: {base}");
    }
    let selected_usable = match config.provider {
        ProviderKind::Gemini => gemini.usable,
        ProviderKind::Vertex => vertex.usable,
        ProviderKind::OpenAi => openai.usable || config.openai_api_base.is_some(),
    };
    if !selected_usable {
        problems.push(format!("no usable credential for the {} provider", config.provider));
    }
    if let Err(e) = config.validate() {
        problems.push(e.to_string());
    }

    println!("\n3. Data files ({})", config.data_dir.display());
    for (table, path) in config.data_paths().entries() {
        match std::fs::metadata(path) {
            Ok(meta) => println!("   ✅ {table}: {} ({:.1} MB)", path.display(), meta.len() as f64 / 1024.0 / 1024.0),
            Err(_) => {
                println!("   ❌ {table}: {} - NOT FOUND", path.display());
                problems.push(format!("missing {table} file {}", path.display()));
            }
        }
    }

    println!("\n4. Models");
    println!("   flash: {}", config.flash_model);
    println!("   pro:   {}", config.pro_model);

    println!("\n{RULE}");
    if problems.is_empty() {
        println!("✅ Ready to run evaluations");
        println!("{RULE}");
        return Ok(());
    }
    println!("❌ Setup incomplete:");
    for problem in &problems {
        println!("   • {problem}");
    }
    println!("{RULE}");
    bail!("setup incomplete: {} problem(s)", problems.len())
}

struct CredentialLine {
    text: String,
    usable: bool,
}

fn credential_line(variable: &str, value: Option<&str>, secret: bool) -> CredentialLine {
    match value.map(str::trim) {
        None | Some("") => CredentialLine { text: format!("⚠️  {variable} not set"), usable: false },
        Some(v) if PLACEHOLDERS.contains(&v) => CredentialLine {
            text: format!("⚠️  {variable} is set but looks like a placeholder"),
            usable: false,
        },
        Some(v) => {
            let shown = if secret { mask(v) } else { v.to_string() };
            CredentialLine { text: format!("✅ {variable} found: {shown}"), usable: true }
        }
    }
}

/// First ten characters, then an ellipsis.
fn mask(secret: &str) -> String {
    match secret.char_indices().nth(10) {
        Some((cut, _)) => format!("{}...", &secret[..cut]),
        None => "(short value)".to_string(),
    }
}

/// Lists Gemini models with `generateContent` and suggests tiers.
pub async fn list_models(config: &EvaluatorConfig) -> Result<()> {
    let api_key = config.gemini_api_key.as_deref().context("GEMINI_API_KEY not set")?;
    println!("🔍 Checking available Gemini models (key {})", mask(api_key));

    let client = GeminiClient::new(&config.flash_model, api_key, GenerationSettings::from(config));
    let models = client.list_models().await.context("listing Gemini models")?;

    println!("{RULE}");
    println!("AVAILABLE MODELS (with generateContent support)");
    println!("{RULE}");
    for model in &models {
        println!("✅ {}", model.name);
        println!("   Display name: {}", model.display_name);
        let description: String = model.description.chars().take(100).collect();
        if !description.is_empty() {
            println!("   Description: {description}...");
        }
    }
    println!("{RULE}");
    println!("Total: {} models available", models.len());

    println!("\n💡 RECOMMENDATIONS:");
    match recommend(&models, &PRO_CANDIDATES) {
        Some(id) => println!("   pro:   {id}"),
        None => println!("   pro:   none of {:?} available", PRO_CANDIDATES),
    }
    match recommend(&models, &FLASH_CANDIDATES) {
        Some(id) => println!("   flash: {id}"),
        None => println!("   flash: none of {:?} available", FLASH_CANDIDATES),
    }
    for (tier, configured) in [("flash", &config.flash_model), ("pro", &config.pro_model)] {
        if !models.iter().any(|m| m.id() == configured.as_str()) {
            println!("   ⚠️  configured {tier} model '{configured}' is not in the list");
        }
    }
    Ok(())
}

/// First candidate the API offers.
fn recommend<'a>(models: &[ModelInfo], candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|c| models.iter().any(|m| m.id() == *c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model(name: &str) -> ModelInfo {
        ModelInfo {
            name: format!("models/{name}"),
            display_name: name.to_string(),
            description: String::new(),
            supported_generation_methods: vec!["generateContent".into()],
        }
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask("AIzaSyA1234567890"), "AIzaSyA123...");
        assert_eq!(mask("short"), "(short value)");
    }

    #[test]
    fn flags_placeholders_and_missing_values() {
        assert!(!credential_line("GEMINI_API_KEY", None, true).usable);
        assert!(!credential_line("GEMINI_API_KEY", Some("your-gemini-api-key-here"), true).usable);
        let found = credential_line("VERTEX_PROJECT_ID", Some("bank-eval"), false);
        assert!(found.usable);
        assert!(found.text.contains("bank-eval"));
    }

    #[test]
    fn recommends_first_available_candidate() {
        let models = vec![model("gemini-pro"), model("gemini-1.5-pro-latest")];
        assert_eq!(recommend(&models, &PRO_CANDIDATES), Some("gemini-1.5-pro-latest"));
        assert_eq!(recommend(&models, &FLASH_CANDIDATES), None);
    }

    #[test]
    fn check_fails_without_data_files() {
        let config = EvaluatorConfig {
            gemini_api_key: Some("AIzaSyA1234567890".into()),
            data_dir: "/nonexistent/groundcheck".into(),
            ..Default::default()
        };
        let err = check(&config).unwrap_err();
        assert!(err.to_string().contains("setup incomplete: 4 problem(s)"));
    }
}
