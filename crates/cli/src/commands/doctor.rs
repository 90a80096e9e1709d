//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    llm: CheckResult,
    session: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        llm: CheckResult::error("Not checked"),
        session: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.llm = check_llm(config);
        report.session = check_session(config);
    }

    let checks = [&report.config, &report.llm, &report.session];
    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_llm(config: &AppConfig) -> CheckResult {
    let provider = &config.llm.provider;
    let model = &config.llm.model;

    // Check if API key env var is set (without revealing the value)
    let (api_key_env, base_url) = match provider.as_str() {
        "gemini" => (&config.llm.gemini.api_key_env, &config.llm.gemini.base_url),
        "openai" => (&config.llm.openai.api_key_env, &config.llm.openai.base_url),
        "stub" => return CheckResult::ok("Provider: stub (canned verdict, no network)"),
        other => return CheckResult::error(format!("Unknown provider: {}", other)),
    };

    if api_key_env.is_empty() {
        return CheckResult::error(format!("No API key env var configured for {}", provider));
    }

    if base_url.trim().is_empty() {
        return CheckResult::error(format!("No base_url configured for {}", provider));
    }

    let details = serde_json::json!({
        "provider": provider,
        "model": model,
        "base_url": base_url,
        "timeout_secs": config.llm.timeout_secs,
    });

    match std::env::var(api_key_env) {
        Ok(val) if !val.trim().is_empty() => CheckResult::ok(format!(
            "Provider: {}, Model: {}, API key: {} (set)",
            provider, model, api_key_env
        ))
        .with_details(details),
        _ => CheckResult::warn(format!(
            "Provider: {}, Model: {}, API key: {} (not set)",
            provider, model, api_key_env
        ))
        .with_details(details),
    }
}

fn check_session(config: &AppConfig) -> CheckResult {
    let timeout = match config.llm.timeout_secs {
        0 => "none".to_string(),
        secs => format!("{}s", secs),
    };

    CheckResult::ok(format!(
        "History capacity: {}, Request timeout: {}",
        config.general.history_capacity, timeout
    ))
}

fn print_report(report: &DoctorReport) {
    println!("spam-shield Doctor Report");
    println!("=========================");
    println!();

    print_check("Config", &report.config);
    print_check("LLM Provider", &report.llm);
    print_check("Session", &report.session);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to go! Try: spam-shield session");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
