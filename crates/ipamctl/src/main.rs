// # ipamctl - phpIPAM reconciliation driver
//
// This is a THIN integration layer: all reconcile logic lives in
// `ipam-core`, all HTTP in `ipam-client-phpipam`. The binary only reads
// configuration, wires the pieces together, and maps outcomes to exit
// codes.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Server connection
// - `PHPIPAM_SERVER_URL`: Base URL of the phpIPAM installation
// - `PHPIPAM_APP_ID`: API application id
// - `PHPIPAM_USERNAME`: API username
// - `PHPIPAM_PASSWORD`: API password
// - `PHPIPAM_VALIDATE_CERTS`: Validate TLS certificates (default: true)
//
// ### Run mode
// - `IPAMCTL_MODE`: `apply` (run a scenario file) or `check` (run the
//   built-in conformance suite). Default: `apply`
// - `IPAMCTL_SCENARIO`: Path to a JSON scenario file (apply mode)
// - `IPAMCTL_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export PHPIPAM_SERVER_URL=https://ipam.example.com
// export PHPIPAM_APP_ID=automation
// export PHPIPAM_USERNAME=api
// export PHPIPAM_PASSWORD=secret
// export IPAMCTL_SCENARIO=scenarios/lab.json
//
// ipamctl
// ```

use anyhow::Result;
use ipam_core::scenario::{self, conformance};
use ipam_core::{Reconciler, ScenarioFile, ServerConfig};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Clean run
/// - 1: Configuration error
/// - 2: Runtime error (connectivity, API failure, bad scenario)
/// - 3: Conformance expectation mismatch
#[derive(Debug, Clone, Copy)]
enum IpamctlExitCode {
    /// Clean run
    CleanRun = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
    /// A conformance step produced an unexpected result
    ConformanceMismatch = 3,
}

impl From<IpamctlExitCode> for ExitCode {
    fn from(code: IpamctlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Apply a scenario file
    Apply,
    /// Run the built-in conformance suite
    Check,
}

/// Application configuration
struct Config {
    server_url: String,
    app_id: String,
    username: String,
    password: String,
    validate_certs: bool,
    mode: Mode,
    scenario_path: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let required = |name: &str| {
            env::var(name).map_err(|_| {
                anyhow::anyhow!(
                    "{} is required. Set it via: export {}=...",
                    name,
                    name
                )
            })
        };

        let validate_certs = match env::var("PHPIPAM_VALIDATE_CERTS") {
            Err(_) => true,
            Ok(raw) => ipam_core::payload::truthy(&raw).ok_or_else(|| {
                anyhow::anyhow!(
                    "PHPIPAM_VALIDATE_CERTS '{}' is not a boolean. \
                    Use one of: 1, 0, true, false, yes, no, on, off",
                    raw
                )
            })?,
        };

        let mode = match env::var("IPAMCTL_MODE").as_deref() {
            Err(_) | Ok("apply") => Mode::Apply,
            Ok("check") => Mode::Check,
            Ok(other) => anyhow::bail!(
                "IPAMCTL_MODE '{}' is not supported. Supported modes: apply, check",
                other
            ),
        };

        Ok(Self {
            server_url: required("PHPIPAM_SERVER_URL")?,
            app_id: required("PHPIPAM_APP_ID")?,
            username: required("PHPIPAM_USERNAME")?,
            password: required("PHPIPAM_PASSWORD")?,
            validate_certs,
            mode,
            scenario_path: env::var("IPAMCTL_SCENARIO").ok(),
            log_level: env::var("IPAMCTL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration before any network call
    fn validate(&self) -> Result<()> {
        if !self.server_url.starts_with("https://") && !self.server_url.starts_with("http://") {
            anyhow::bail!(
                "PHPIPAM_SERVER_URL must use HTTP or HTTPS scheme. Got: {}",
                self.server_url
            );
        }

        if self.server_url.starts_with("http://") {
            eprintln!(
                "WARNING: PHPIPAM_SERVER_URL uses HTTP (not HTTPS). \
                Credentials will travel unencrypted."
            );
        }

        // Check for obvious placeholder passwords (common mistake)
        let password_lower = self.password.to_lowercase();
        if password_lower.contains("your_password")
            || password_lower.contains("replace_me")
            || password_lower == "password"
        {
            anyhow::bail!(
                "PHPIPAM_PASSWORD appears to be a placeholder. \
                Use the actual API user's password."
            );
        }

        if self.mode == Mode::Apply && self.scenario_path.is_none() {
            anyhow::bail!(
                "IPAMCTL_SCENARIO is required in apply mode. \
                Set it via: export IPAMCTL_SCENARIO=scenarios/lab.json"
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPAMCTL_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            url: self.server_url.clone(),
            app_id: self.app_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            validate_certs: self.validate_certs,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IpamctlExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IpamctlExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpamctlExitCode::ConfigError.into();
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpamctlExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(config).await {
            Ok(()) => IpamctlExitCode::CleanRun,
            Err(ipam_core::Error::Assertion { step, expected, actual }) => {
                error!(
                    "Conformance mismatch at {}: expected {}, got {}",
                    step, expected, actual
                );
                IpamctlExitCode::ConformanceMismatch
            }
            Err(e) => {
                error!("Run failed: {}", e);
                IpamctlExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Wire up the store and run the requested mode
async fn run(config: Config) -> ipam_core::Result<()> {
    let server = config.server_config();
    info!("Target server: {} (app id: {})", server.url, server.app_id);

    let client = ipam_client_phpipam::PhpipamClient::new(&server)?;
    let reconciler = Reconciler::new(Box::new(client));

    match config.mode {
        Mode::Apply => {
            // Presence is enforced by Config::validate
            let path = config
                .scenario_path
                .as_deref()
                .ok_or_else(|| ipam_core::Error::config("Scenario path missing"))?;

            let text = std::fs::read_to_string(path).map_err(|e| {
                ipam_core::Error::config(format!("Cannot read scenario file {}: {}", path, e))
            })?;
            let file = ScenarioFile::from_json(&text)?;

            info!("Applying scenario '{}' ({} steps)", file.name, file.steps.len());
            let report = scenario::run(&reconciler, &file.into()).await?;
            info!(
                "Scenario '{}' finished: {} step(s), changed: {}",
                report.name,
                report.outcomes.len(),
                report.changed
            );
        }
        Mode::Check => {
            let suite = conformance::suite();
            info!("Running conformance suite ({} scenarios)", suite.len());

            for scenario_def in &suite {
                let report = scenario::run(&reconciler, scenario_def).await?;
                info!("Scenario '{}' passed", report.name);
            }

            info!("Conformance suite passed");
        }
    }

    Ok(())
}
