// Copyright 2024-2026 infer-pool Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration directly from environment variables
//! and never create a predictor.

use crate::config::{self, EffectiveConfig, EnvConfig};
use crate::engine::{DEFAULT_MODEL_FILE, DEFAULT_PARAMS_FILE};

/// Print effective config to stdout, as `KEY=value` lines or JSON.
///
/// Returns the process exit code.
pub fn run_show(json: bool) -> i32 {
    let cfg = config::load().effective_config();
    match render_config(&cfg, json) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Failed to render configuration: {}", e);
            1
        }
    }
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    println!("INFER_POOL_MODEL_DIR=.");
    println!("INFER_POOL_MODEL_FILE={}", DEFAULT_MODEL_FILE);
    println!("INFER_POOL_PARAMS_FILE={}", DEFAULT_PARAMS_FILE);
    println!("INFER_POOL_MEMORY_OPTIM=true");
    println!("INFER_POOL_MAX_CONCURRENCY=0");
    println!("INFER_POOL_CHECKOUT_TIMEOUT_MS=0");
    println!("INFER_POOL_LOG_LEVEL=info");
    println!("INFER_POOL_LOG_FORMAT=json");
}

/// Validate configuration and the provisioned model files.
///
/// Returns 0 if valid, 1 if any problems are found.
pub fn run_validate() -> i32 {
    let problems = validate(&config::load());
    if problems.is_empty() {
        println!("Configuration is valid.");
        return 0;
    }
    for p in &problems {
        eprintln!("ERROR: {}", p);
    }
    1
}

fn validate(env: &EnvConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(e) = env.model.validate() {
        problems.push(format!("{} (check INFER_POOL_MODEL_DIR)", e));
    }
    if let Err(e) = tracing_subscriber::EnvFilter::try_new(&env.log.level) {
        problems.push(format!("INFER_POOL_LOG_LEVEL is not a valid filter: {}", e));
    }
    if env.engine.max_concurrency > 4 * num_cpus::get().max(1) {
        problems.push(format!(
            "INFER_POOL_MAX_CONCURRENCY ({}) is far above the CPU count ({})",
            env.engine.max_concurrency,
            num_cpus::get()
        ));
    }
    problems
}

fn render_config(cfg: &EffectiveConfig, json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(cfg);
    }
    let lines = [
        format!("INFER_POOL_MODEL_DIR={}", cfg.model_dir.display()),
        format!("model_path={}", cfg.model_path.display()),
        format!("params_path={}", cfg.params_path.display()),
        format!("INFER_POOL_MEMORY_OPTIM={}", cfg.memory_optim),
        format!("INFER_POOL_MAX_CONCURRENCY={}", cfg.max_concurrency),
        format!("INFER_POOL_CHECKOUT_TIMEOUT_MS={}", cfg.checkout_timeout_ms),
        format!("INFER_POOL_LOG_LEVEL={}", cfg.log_level),
        format!("INFER_POOL_LOG_FORMAT={}", cfg.log_format),
    ];
    Ok(lines.join("\n"))
}
