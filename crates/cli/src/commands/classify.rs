//! Classify command - one-shot classification

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use spam_shield_adapters::llm::{
    GeminiClassifier, LlmConfig as AdapterLlmConfig, OpenAiClassifier, StubClassifier,
};
use spam_shield_domain::Classifier;
use spam_shield_domain::usecases::Renderer;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::ClassifyArgs;
use crate::config::AppConfig;

pub async fn execute(args: ClassifyArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let text = get_input_text(&args)?;

    if text.trim().is_empty() {
        bail!("No text provided for classification");
    }

    tracing::info!(
        provider = %config.llm.provider,
        text_length = text.len(),
        "Classifying email"
    );

    let classifier = build_classifier(&config)?;
    let record = match classifier.classify(&text).await {
        Ok(record) => record,
        Err(e) => {
            eprintln!("{}", Renderer::default().render_error(&e));
            bail!("Classification failed ({})", e.kind());
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&record).context("Failed to serialize record")?;
        println!("{}", json);
    } else {
        println!("{}", Renderer::default().render_record(&record));
    }

    Ok(())
}

pub(crate) fn build_classifier(config: &AppConfig) -> Result<Arc<dyn Classifier>> {
    let llm_config = adapter_llm_config(&config.llm);

    match config.llm.provider.as_str() {
        "gemini" => {
            let api_key = load_api_key(&config.llm.gemini.api_key_env, "gemini");
            let classifier = GeminiClassifier::with_base_url(
                api_key,
                config.llm.gemini.base_url.clone(),
                llm_config,
            )
            .context("Failed to build HTTP client")?;
            Ok(Arc::new(classifier))
        }
        "openai" => {
            let api_key = load_api_key(&config.llm.openai.api_key_env, "openai");
            let classifier = OpenAiClassifier::with_base_url(
                api_key,
                config.llm.openai.base_url.clone(),
                llm_config,
            )
            .context("Failed to build HTTP client")?;
            Ok(Arc::new(classifier))
        }
        "stub" => Ok(Arc::new(StubClassifier::canned())),
        other => bail!("Unknown LLM provider: {}", other),
    }
}

fn adapter_llm_config(config: &crate::config::LlmConfig) -> AdapterLlmConfig {
    AdapterLlmConfig {
        model: config.model.clone(),
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
        timeout_secs: config.timeout_secs,
    }
}

/// Read the API key from the configured env var
///
/// A missing key is not fatal here: the adapter reports it as an
/// unreachable service on the first analysis.
pub(crate) fn load_api_key(env_var: &str, provider: &str) -> SecretString {
    let key = if env_var.trim().is_empty() {
        None
    } else {
        std::env::var(env_var).ok().filter(|k| !k.trim().is_empty())
    };

    match key {
        Some(key) => SecretString::new(key.into()),
        None => {
            tracing::warn!(
                env_var = %env_var,
                provider = %provider,
                "API key not set; analyses will fail until it is configured"
            );
            SecretString::new(String::new().into())
        }
    }
}

fn get_input_text(args: &ClassifyArgs) -> Result<String> {
    if let Some(ref text) = args.text {
        return Ok(text.clone());
    }

    if let Some(ref path) = args.file {
        if path.as_os_str() == "-" {
            return read_stdin();
        }

        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()));
    }

    // Default to stdin if no input specified
    read_stdin()
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read from stdin")?;
    Ok(text)
}
