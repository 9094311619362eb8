//! openstack CLI wrapper
//!
//! Wraps python-openstackclient commands. Credentials are whatever the CLI
//! picks up from `OS_*` variables or `clouds.yaml`.

use crate::error::{OpenStackError, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::process::Stdio;
use tokio::process::Command;

const DEFAULT_PROGRAM: &str = "openstack";

/// openstack CLI wrapper
#[derive(Debug, Clone)]
pub struct OpenStackCli {
    program: String,
    cloud: Option<String>,
}

impl Default for OpenStackCli {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenStackCli {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            cloud: None,
        }
    }

    /// Use a different executable (absolute path or name on `PATH`)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Select a named cloud from `clouds.yaml`
    pub fn with_cloud(mut self, cloud: impl Into<String>) -> Self {
        self.cloud = Some(cloud.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that the CLI is installed and can obtain a token
    pub async fn check_auth(&self) -> Result<TokenInfo> {
        let which = Command::new("which").arg(&self.program).output().await?;
        if !which.status.success() {
            return Err(OpenStackError::CliNotFound);
        }

        let output = self
            .run_command(&["token", "issue", "-f", "json"])
            .await
            .map_err(|e| match e {
                OpenStackError::CommandFailed(msg) => OpenStackError::AuthenticationFailed(msg),
                other => other,
            })?;

        let token: TokenInfo = serde_json::from_str(&output)?;
        Ok(token)
    }

    /// Run an openstack command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        if let Some(cloud) = &self.cloud {
            cmd.arg("--os-cloud").arg(cloud);
        }
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program, args.join(" "));

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OpenStackError::CliNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Create a server
    pub async fn create_server(&self, config: &CreateServerConfig) -> Result<ServerRecord> {
        let owned = config.create_args();
        let args: Vec<&str> = owned.iter().map(String::as_str).collect();

        let output = self.run_command(&args).await?;
        let server: ServerRecord = serde_json::from_str(&output)?;
        if server.id.is_empty() {
            return Err(OpenStackError::InvalidOutput(
                "server create returned no id".to_string(),
            ));
        }
        Ok(server)
    }

    /// Show a server by ID
    pub async fn show_server(&self, id: &str) -> Result<ServerRecord> {
        let output = self
            .run_command(&["server", "show", id, "-f", "json"])
            .await?;
        let server: ServerRecord = serde_json::from_str(&output)?;
        Ok(server)
    }

    /// Delete a server (does not wait for completion)
    pub async fn delete_server(&self, id: &str) -> Result<()> {
        self.run_command(&["server", "delete", id]).await?;
        Ok(())
    }
}

/// Map CLI stderr to an error variant
pub fn classify_failure(stderr: &str) -> OpenStackError {
    let lower = stderr.to_lowercase();
    let not_found = [
        "no server with a name or id",
        "no server found",
        "could not be found",
    ];
    if not_found.iter().any(|needle| lower.contains(needle)) {
        return OpenStackError::ServerNotFound(stderr.to_string());
    }
    if lower.contains("authentication") || lower.contains("unauthorized") || lower.contains("(http 401)") {
        return OpenStackError::AuthenticationFailed(stderr.to_string());
    }
    OpenStackError::CommandFailed(stderr.to_string())
}

/// `openstack token issue` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub project_id: String,

    #[serde(default)]
    pub user_id: String,
}

/// Server fields used from `server create` / `server show`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub status: String,

    #[serde(rename = "adminPass", default)]
    pub admin_pass: Option<String>,

    #[serde(rename = "accessIPv4", default)]
    pub access_ipv4: Option<String>,

    /// `"net=10.0.0.3, 172.24.4.10"` on older clients, a map of network name
    /// to address list on newer ones
    #[serde(default)]
    pub addresses: serde_json::Value,
}

impl ServerRecord {
    /// Public address: `accessIPv4` if set, else the first IPv4 in `addresses`
    pub fn ip_address(&self) -> Option<String> {
        if let Some(ip) = self.access_ipv4.as_deref().filter(|ip| !ip.is_empty()) {
            return Some(ip.to_string());
        }
        first_ipv4(&self.addresses)
    }
}

fn first_ipv4(addresses: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match addresses {
        Value::String(s) => s
            .split([',', ';', '=', ' '])
            .map(str::trim)
            .find(|token| token.parse::<Ipv4Addr>().is_ok())
            .map(str::to_string),
        Value::Array(items) => items.iter().find_map(first_ipv4),
        Value::Object(map) => {
            if let Some(addr) = map.get("addr") {
                return first_ipv4(addr);
            }
            map.values().find_map(first_ipv4)
        }
        _ => None,
    }
}

/// Configuration for creating a server
#[derive(Debug, Clone)]
pub struct CreateServerConfig {
    pub name: String,
    pub image: String,
    pub flavor: String,
    /// Recorded as the `disk_config` server property. `server create` has no
    /// flag for nova's `OS-DCF:diskConfig`, so partitioning is left to the
    /// image default.
    pub disk_config: Option<String>,
}

impl CreateServerConfig {
    /// Arguments for `openstack server create`
    pub fn create_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["server", "create", "--image", self.image.as_str(), "--flavor", self.flavor.as_str()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(disk_config) = &self.disk_config {
            args.push("--property".to_string());
            args.push(format!("disk_config={}", disk_config));
        }
        args.extend(["-f".to_string(), "json".to_string(), self.name.clone()]);
        args
    }
}
