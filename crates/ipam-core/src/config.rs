//! Configuration types
//!
//! [`ServerConfig`] carries the connection parameters for a phpIPAM
//! instance; [`ScenarioFile`] is the on-disk form of a scenario.

use crate::error::{Error, Result};
use crate::scenario::{Scenario, Step};
use serde::{Deserialize, Serialize};

/// Connection parameters for a phpIPAM server
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the phpIPAM installation (e.g. `https://ipam.example.com`)
    pub url: String,

    /// API application id
    pub app_id: String,

    /// API username
    pub username: String,

    /// API password
    /// ⚠️ NEVER log this value
    pub password: String,

    /// Whether to validate the server's TLS certificate
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
}

fn default_validate_certs() -> bool {
    true
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("url", &self.url)
            .field("app_id", &self.app_id)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("validate_certs", &self.validate_certs)
            .finish()
    }
}

impl ServerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config("Server URL cannot be empty"));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(Error::config(format!(
                "Server URL must use http or https scheme. Got: {}",
                self.url
            )));
        }
        if self.app_id.is_empty() {
            return Err(Error::config("App id cannot be empty"));
        }
        if self.username.is_empty() {
            return Err(Error::config("Username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::config("Password cannot be empty"));
        }
        Ok(())
    }
}

/// On-disk scenario format
///
/// ```json
/// {
///   "name": "lab-setup",
///   "steps": [
///     {"descriptor": {"kind": "section", "fields": {"name": "lab"}}},
///     {"descriptor": {"kind": "subnet",
///                     "fields": {"cidr": "10.0.0.0/24", "section": "lab"}},
///      "state": "present"}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Scenario name (defaults to "scenario")
    #[serde(default = "default_scenario_name")]
    pub name: String,

    /// The steps, in execution order
    pub steps: Vec<Step>,
}

fn default_scenario_name() -> String {
    "scenario".to_string()
}

impl ScenarioFile {
    /// Parse a scenario from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let file: ScenarioFile = serde_json::from_str(text)?;
        if file.steps.is_empty() {
            return Err(Error::config("Scenario has no steps"));
        }
        Ok(file)
    }
}

impl From<ScenarioFile> for Scenario {
    fn from(file: ScenarioFile) -> Self {
        Scenario {
            name: file.name,
            steps: file.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{DesiredState, ResourceKind};

    fn valid_config() -> ServerConfig {
        ServerConfig {
            url: "https://ipam.example.com".to_string(),
            app_id: "automation".to_string(),
            username: "admin".to_string(),
            password: "s3cret".to_string(),
            validate_certs: true,
        }
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_pieces() {
        let mut c = valid_config();
        c.url = "ipam.example.com".to_string();
        assert!(c.validate().is_err());

        let mut c = valid_config();
        c.password = String::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_certs_defaults_to_true() {
        let c: ServerConfig = serde_json::from_str(
            r#"{"url": "https://x", "app_id": "a", "username": "u", "password": "p"}"#,
        )
        .unwrap();
        assert!(c.validate_certs);
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", valid_config());
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<REDACTED>"));
    }

    #[test]
    fn scenario_file_parses_and_converts() {
        let text = r#"{
            "name": "lab",
            "steps": [
                {"descriptor": {"kind": "section", "fields": {"name": "lab"}}},
                {"descriptor": {"kind": "tag", "fields": {"name": "core"}}, "state": "absent"}
            ]
        }"#;
        let scenario: Scenario = ScenarioFile::from_json(text).unwrap().into();
        assert_eq!(scenario.name, "lab");
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.steps[0].descriptor.kind, ResourceKind::Section);
        assert_eq!(scenario.steps[1].state, DesiredState::Absent);
    }

    #[test]
    fn empty_scenario_is_rejected() {
        assert!(ScenarioFile::from_json(r#"{"steps": []}"#).is_err());
    }
}
