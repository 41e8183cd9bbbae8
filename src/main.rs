//! infer-pool command-line entry point.
//!
//! ## CLI Subcommands
//!
//! - `infer-pool config show [--json]` - Effective configuration
//! - `infer-pool config defaults` - Documented defaults
//! - `infer-pool config validate` - Check values and model files (exit 0/1)
//! - `infer-pool selftest [CALLS]` - Drive the pool with the in-memory backend

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use infer_pool::cli::config_cmd;
use infer_pool::config;
use infer_pool::engine::{InferenceEngine, MockBackend};
use infer_pool::telemetry::{init_logging, init_metrics};
use infer_pool::tensor::Tensor;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match command {
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => {
                    let json = args.get(3).map(|s| s.as_str()) == Some("--json");
                    ExitCode::from(config_cmd::run_show(json) as u8)
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => ExitCode::from(config_cmd::run_validate() as u8),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "selftest" => {
            let calls = match args.get(2).map(|s| s.parse::<usize>()) {
                None => 64,
                Some(Ok(n)) => n,
                Some(Err(_)) => {
                    eprintln!("CALLS must be a non-negative integer");
                    return ExitCode::from(2u8);
                }
            };
            ExitCode::from(run_selftest(calls) as u8)
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("infer-pool {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

/// Run `calls` echo inferences from 2N threads against an N-predictor pool.
fn run_selftest(calls: usize) -> i32 {
    let env = config::load();
    if let Err(e) = init_logging(&env.log) {
        eprintln!("Failed to initialize logging: {}", e);
        return 2;
    }
    init_metrics();

    let backend = MockBackend::new(&["input"]).with_echo_output("output", "input");
    let engine = match InferenceEngine::with_config(&backend, env.model.clone(), &env.engine) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("Failed to create engine: {}", e);
            return 1;
        }
    };

    let workers = 2 * env.engine.max_concurrency;
    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut failures = 0usize;
                for i in (w..calls).step_by(workers) {
                    let input = Tensor::from_1d(&[i as f32, 1.0, 2.0]);
                    match engine.infer(std::slice::from_ref(&input)) {
                        Ok(outputs) if outputs.first() == Some(&input) => {}
                        _ => failures += 1,
                    }
                }
                failures
            })
        })
        .collect();

    let mut failures = 0;
    for handle in handles {
        failures += handle.join().unwrap_or(1);
    }

    let stats = engine.pool().stats();
    let peak = backend.counters().peak_running();
    println!(
        "calls={} failures={} pool_capacity={} peak_running={} checkouts={}",
        calls, failures, stats.capacity, peak, stats.total_checkouts
    );
    if failures == 0 && peak <= stats.capacity && stats.in_use == 0 {
        0
    } else {
        1
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "infer-pool v{}

USAGE:
    infer-pool [COMMAND] [OPTIONS]

COMMANDS:
    config       Inspect configuration (show, defaults, validate)
    selftest     Exercise the predictor pool with the in-memory backend
    version      Show version information
    help         Show this help message

EXAMPLES:
    infer-pool config show --json
    infer-pool config validate
    INFER_POOL_MAX_CONCURRENCY=2 infer-pool selftest 200

ENVIRONMENT:
    INFER_POOL_MODEL_DIR, INFER_POOL_MODEL_FILE, INFER_POOL_PARAMS_FILE,
    INFER_POOL_MEMORY_OPTIM, INFER_POOL_MAX_CONCURRENCY,
    INFER_POOL_CHECKOUT_TIMEOUT_MS, INFER_POOL_LOG_LEVEL, INFER_POOL_LOG_FORMAT
    (run `infer-pool config defaults` for default values)

EXIT CODES:
    0  Success
    1  Failure / invalid configuration
    2  Usage error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "config" => eprintln!(
            "infer-pool config - Inspect configuration

USAGE:
    infer-pool config <SUBCOMMAND>

SUBCOMMANDS:
    show [--json]  Show effective configuration
    defaults       Show default configuration
    validate       Check values and that model/params files exist"
        ),
        "selftest" => eprintln!(
            "infer-pool selftest - Exercise the predictor pool

USAGE:
    infer-pool selftest [CALLS]

Runs CALLS (default 64) echo inferences from twice as many threads as
there are predictors, then checks that no call failed and that no more
than INFER_POOL_MAX_CONCURRENCY predictors ever ran at once."
        ),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
        }
    }
}
