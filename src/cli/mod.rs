// Copyright 2024-2026 infer-pool Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for infer-pool commands.
//!
//! ## Usage
//!
//! ```bash
//! infer-pool config show [--json]   # Effective configuration
//! infer-pool config defaults        # Documented defaults
//! infer-pool config validate        # Check values and model files
//! ```

pub mod config_cmd;

pub use config_cmd::{run_defaults, run_show, run_validate};
