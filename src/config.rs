//! Configuration loading from environment variables.
//!
//! All values come from `INFER_POOL_*` environment variables with sensible
//! defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `INFER_POOL_MODEL_DIR` | `.` | Provisioned model directory |
//! | `INFER_POOL_MODEL_FILE` | `inference.pdmodel` | Model file inside the directory |
//! | `INFER_POOL_PARAMS_FILE` | `inference.pdiparams` | Params file inside the directory |
//! | `INFER_POOL_MEMORY_OPTIM` | true | Backend memory optimization |
//! | `INFER_POOL_MAX_CONCURRENCY` | 0 | Pool size (0 = number of CPUs) |
//! | `INFER_POOL_CHECKOUT_TIMEOUT_MS` | 0 | Checkout deadline (0 = wait forever) |
//! | `INFER_POOL_LOG_LEVEL` | info | `EnvFilter` directive |
//! | `INFER_POOL_LOG_FORMAT` | json | `json` or `pretty` |

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::engine::{EngineConfig, ModelConfig, DEFAULT_MODEL_FILE, DEFAULT_PARAMS_FILE};
use crate::telemetry::{LogConfig, LogFormat};

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub model_dir: PathBuf,
    pub model_path: PathBuf,
    pub params_path: PathBuf,
    pub memory_optim: bool,
    pub max_concurrency: usize,
    pub checkout_timeout_ms: u64,
    pub log_level: String,
    pub log_format: String,
}

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub model_dir: PathBuf,
    pub model: ModelConfig,
    pub engine: EngineConfig,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a boolean env var. Accepts true/false, 1/0, yes/no, on/off.
fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn parse_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Load model location from environment.
fn load_model_config() -> (PathBuf, ModelConfig) {
    let dir = PathBuf::from(parse_string("INFER_POOL_MODEL_DIR", "."));
    let model_file = parse_string("INFER_POOL_MODEL_FILE", DEFAULT_MODEL_FILE);
    let params_file = parse_string("INFER_POOL_PARAMS_FILE", DEFAULT_PARAMS_FILE);
    let memory_optim = parse_bool("INFER_POOL_MEMORY_OPTIM", true);

    let model = ModelConfig::new(dir.join(model_file), dir.join(params_file))
        .with_memory_optim(memory_optim);
    (dir, model)
}

/// Load pool sizing and checkout policy from environment.
fn load_engine_config() -> EngineConfig {
    let max_concurrency = match parse_usize("INFER_POOL_MAX_CONCURRENCY", 0) {
        0 => num_cpus::get().max(1),
        n => n,
    };
    let checkout_timeout = match parse_u64("INFER_POOL_CHECKOUT_TIMEOUT_MS", 0) {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };
    EngineConfig {
        max_concurrency,
        checkout_timeout,
    }
}

/// Load logging configuration from environment.
fn load_log_config() -> LogConfig {
    let format = std::env::var("INFER_POOL_LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or_default();
    LogConfig {
        format,
        level: parse_string("INFER_POOL_LOG_LEVEL", "info"),
        output_path: None,
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let (model_dir, model) = load_model_config();
    EnvConfig {
        model_dir,
        model,
        engine: load_engine_config(),
        log: load_log_config(),
    }
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            model_dir: self.model_dir.clone(),
            model_path: self.model.model_path().to_path_buf(),
            params_path: self.model.params_path().to_path_buf(),
            memory_optim: self.model.memory_optim(),
            max_concurrency: self.engine.max_concurrency,
            checkout_timeout_ms: self
                .engine
                .checkout_timeout
                .map_or(0, |d| d.as_millis() as u64),
            log_level: self.log.level.clone(),
            log_format: self.log.format.as_str().to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

    pub(crate) const ENV_KEYS: &[&str] = &[
        "INFER_POOL_MODEL_DIR",
        "INFER_POOL_MODEL_FILE",
        "INFER_POOL_PARAMS_FILE",
        "INFER_POOL_MEMORY_OPTIM",
        "INFER_POOL_MAX_CONCURRENCY",
        "INFER_POOL_CHECKOUT_TIMEOUT_MS",
        "INFER_POOL_LOG_LEVEL",
        "INFER_POOL_LOG_FORMAT",
    ];

    pub(crate) fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg.model_dir, PathBuf::from("."));
        assert_eq!(cfg.model, ModelConfig::in_dir("."));
        assert!(cfg.model.memory_optim());
        assert_eq!(cfg.engine.max_concurrency, num_cpus::get().max(1));
        assert!(cfg.engine.checkout_timeout.is_none());
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.format, LogFormat::Json);
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("INFER_POOL_MODEL_DIR", "/srv/models/ocr");
        std::env::set_var("INFER_POOL_MODEL_FILE", "det.pdmodel");
        std::env::set_var("INFER_POOL_MEMORY_OPTIM", "off");
        std::env::set_var("INFER_POOL_MAX_CONCURRENCY", "6");
        std::env::set_var("INFER_POOL_CHECKOUT_TIMEOUT_MS", "250");
        std::env::set_var("INFER_POOL_LOG_FORMAT", "Pretty");
        let cfg = load();
        assert_eq!(
            cfg.model.model_path(),
            PathBuf::from("/srv/models/ocr/det.pdmodel")
        );
        assert_eq!(
            cfg.model.params_path(),
            PathBuf::from("/srv/models/ocr").join(DEFAULT_PARAMS_FILE)
        );
        assert!(!cfg.model.memory_optim());
        assert_eq!(cfg.engine.max_concurrency, 6);
        assert_eq!(cfg.engine.checkout_timeout, Some(Duration::from_millis(250)));
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("INFER_POOL_MAX_CONCURRENCY", "many");
        std::env::set_var("INFER_POOL_CHECKOUT_TIMEOUT_MS", "-5");
        std::env::set_var("INFER_POOL_MEMORY_OPTIM", "maybe");
        std::env::set_var("INFER_POOL_LOG_FORMAT", "xml");
        std::env::set_var("INFER_POOL_MODEL_FILE", "   ");
        let cfg = load();
        assert_eq!(cfg.engine.max_concurrency, num_cpus::get().max(1));
        assert!(cfg.engine.checkout_timeout.is_none());
        assert!(cfg.model.memory_optim());
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.model, ModelConfig::in_dir("."));
        clear_env_vars();
    }

    #[test]
    fn test_effective_config_serializes() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("INFER_POOL_CHECKOUT_TIMEOUT_MS", "1500");
        let eff = load().effective_config();
        assert_eq!(eff.checkout_timeout_ms, 1500);
        assert!(eff.max_concurrency > 0);

        let json = serde_json::to_value(&eff).unwrap();
        assert_eq!(json["log_format"], "json");
        assert_eq!(json["memory_optim"], true);
        assert_eq!(json["checkout_timeout_ms"], 1500);
        clear_env_vars();
    }
}
