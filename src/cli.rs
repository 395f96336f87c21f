//! Command-line interface for loadmix
//!
//! Provides argument parsing and subcommand handling for the loadmix binary.

use clap::{Parser, Subcommand, ValueEnum};

/// Weighted-endpoint HTTP load generator
#[derive(Parser)]
#[command(name = "loadmix")]
#[command(version)]
#[command(about = "Weighted-endpoint HTTP load generator")]
#[command(
    long_about = "loadmix drives virtual users against an HTTP service. Each iteration picks \
    one endpoint at random in proportion to its weight, sends a GET, and pauses. \
    Virtual users follow a ramp or constant profile."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "loadmix.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the configured load profile (default)
    Run {
        /// Seed for virtual-user random sources (overrides run.seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Write Prometheus text metrics to this file when the run ends
        #[arg(long)]
        metrics_file: Option<String>,
    },
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,

        /// Which traffic profile the template uses
        #[arg(short, long, value_enum, default_value_t = TemplateProfile::Ramp)]
        profile: TemplateProfile,
    },
    /// Print the VU target over time as JSON, without sending traffic
    Plan {
        /// Sampling step in seconds
        #[arg(long, default_value_t = 10)]
        step: u64,
    },
}

/// Template profiles offered by `loadmix config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateProfile {
    /// Spike ramp up to 5000 VUs and back down
    Ramp,
    /// 150 constant VUs for ten minutes with thresholds
    Soak,
}

/// Generate template configuration content
pub fn generate_config_template(profile: TemplateProfile) -> String {
    let profile_section = match profile {
        TemplateProfile::Ramp => RAMP_PROFILE,
        TemplateProfile::Soak => SOAK_PROFILE,
    };
    format!("{}{}{}", TEMPLATE_HEADER, profile_section, TEMPLATE_FOOTER)
}

const TEMPLATE_HEADER: &str = r#"# loadmix Configuration
# =====================
#
# This file configures the system under test, the weighted endpoint table,
# per-iteration pacing, the traffic profile and logging for loadmix.

# ─────────────────────────────────────────────────────────────────────────────
# TARGET
# ─────────────────────────────────────────────────────────────────────────────

[target]
# Base URL joined with endpoint paths that start with "/"
base_url = "http://localhost:3000"

# Per-request timeout in seconds (1-300)
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# ENDPOINTS
# ─────────────────────────────────────────────────────────────────────────────
#
# Each iteration sends one GET to an endpoint chosen at random with
# probability weight / sum(weights). Weights must be positive.
# A url is either a "/path" (joined with target.base_url) or an absolute
# http(s):// URL.

[[endpoints]]
url = "/categories"
weight = 5

[[endpoints]]
url = "/challenges"
weight = 3

# ─────────────────────────────────────────────────────────────────────────────
# PACING
# ─────────────────────────────────────────────────────────────────────────────
#
# After each request a virtual user pauses for base + U[0,1) * jitter.
# Durations accept ms, s, m and h, optionally combined ("1m30s").

[pacing]
base = "100ms"
jitter = "200ms"

"#;

const RAMP_PROFILE: &str = r#"# ─────────────────────────────────────────────────────────────────────────────
# PROFILE
# ─────────────────────────────────────────────────────────────────────────────
#
# kind = "ramp": each stage moves the VU count linearly from the previous
# target (or start_vus) to its own target over its duration.

[profile]
kind = "ramp"
start_vus = 0
stages = [
    { duration = "30s", target = 500 },
    { duration = "1m", target = 2000 },
    { duration = "1m", target = 5000 },
    { duration = "30s", target = 0 },
]

"#;

const SOAK_PROFILE: &str = r#"# ─────────────────────────────────────────────────────────────────────────────
# PROFILE
# ─────────────────────────────────────────────────────────────────────────────
#
# kind = "constant": a fixed number of VUs for a fixed duration.
# Thresholds are checked for syntax and exported with the run; they are
# evaluated by whatever consumes the metrics.

[profile]
kind = "constant"
vus = 150
duration = "600s"

[profile.thresholds]
http_req_failed = ["rate<0.01"]
http_req_duration = ["p(95)<500"]

"#;

const TEMPLATE_FOOTER: &str = r#"# ─────────────────────────────────────────────────────────────────────────────
# RUN
# ─────────────────────────────────────────────────────────────────────────────

[run]
# Uncomment for reproducible endpoint choices (VU i uses seed + i)
# seed = 42

# How long stopping VUs may take to finish an in-flight request
graceful_stop = "30s"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG overrides this when set
log_level = "info"
"#;
