//! `localseek doctor` — Diagnose configuration and endpoint health.

use localseek_config::AppConfig;
use localseek_providers::build_from_config;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 localseek Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file, using defaults — run `localseek init`");
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    let inference = &config.inference;
    let provider = match build_from_config(inference) {
        Ok(provider) => provider,
        Err(e) => {
            println!("  ❌ {e}");
            return Ok(());
        }
    };

    match provider.health_check().await {
        Ok(true) => println!("  ✅ {} reachable at {}", provider.name(), inference.endpoint),
        Ok(false) | Err(_) => {
            println!(
                "  ❌ {} not reachable at {} — is the server running?",
                provider.name(),
                inference.endpoint
            );
            issues += 1;
        }
    }

    if issues == 0 {
        match provider.list_models().await {
            Ok(models) if has_model(&models, &inference.model) => {
                println!("  ✅ Model '{}' installed", inference.model)
            }
            Ok(_) => {
                println!(
                    "  ⚠️  Model '{}' not installed — try `ollama pull {}`",
                    inference.model, inference.model
                );
                issues += 1;
            }
            Err(e) => {
                println!("  ⚠️  Could not list models: {e}");
                issues += 1;
            }
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Ollama reports `name:latest` for models pulled without a tag.
fn has_model(installed: &[String], wanted: &str) -> bool {
    installed
        .iter()
        .any(|m| m == wanted || m.strip_suffix(":latest") == Some(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_matching() {
        let installed = vec!["deepseek-r1:1.5b".to_string(), "llama3.2:latest".to_string()];
        assert!(has_model(&installed, "deepseek-r1:1.5b"));
        assert!(has_model(&installed, "llama3.2"));
        assert!(has_model(&installed, "llama3.2:latest"));
        assert!(!has_model(&installed, "deepseek-r1:7b"));
    }
}
