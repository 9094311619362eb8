//! Compute gateway trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Status reported by the compute service for a ready instance
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Placeholder status for an instance the compute service does not know
pub const STATUS_NOT_FOUND: &str = "NOT_FOUND";

/// Compute gateway abstraction
///
/// Implementations are stateless handles to a remote compute API. Every call
/// blocks its caller until the remote answers; nothing is retried here.
#[async_trait]
pub trait CloudGateway: Send + Sync {
    /// Returns the gateway name (e.g., "openstack")
    fn name(&self) -> &str;

    /// Check if the gateway is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Create an instance. Fails on transport or auth problems.
    async fn boot(&self, request: &BootRequest) -> Result<BootedInstance>;

    /// Live status of an instance.
    ///
    /// An unknown (or empty) `server_id` is not an error: it yields
    /// [`InstanceStatus::not_found`].
    async fn status(&self, server_id: &str) -> Result<InstanceStatus>;

    /// Request deletion of an instance without waiting for it to go away
    async fn delete(&self, server_id: &str) -> Result<()>;
}

/// Parameters of a create-instance call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootRequest {
    /// Display name of the instance
    pub name: String,

    pub image_id: String,

    pub flavor_id: String,

    /// Disk partitioning mode (`AUTO`/`MANUAL`), omitted when empty
    pub disk_config: Option<String>,
}

impl BootRequest {
    pub fn new(
        name: impl Into<String>,
        image_id: impl Into<String>,
        flavor_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            image_id: image_id.into(),
            flavor_id: flavor_id.into(),
            disk_config: None,
        }
    }

    pub fn with_disk_config(mut self, disk_config: impl Into<String>) -> Self {
        let disk_config = disk_config.into();
        self.disk_config = (!disk_config.is_empty()).then_some(disk_config);
        self
    }
}

/// Immediate response of a create-instance call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootedInstance {
    /// Remote identifier
    pub id: String,

    /// Root password generated by the compute service
    pub admin_pass: String,

    /// Status at creation time (usually `BUILD`)
    pub status: String,
}

/// Live status of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub status: String,

    pub ip_address: Option<String>,
}

impl InstanceStatus {
    pub fn new(status: impl Into<String>, ip_address: Option<String>) -> Self {
        Self {
            status: status.into(),
            ip_address,
        }
    }

    /// The placeholder returned when the instance no longer exists
    pub fn not_found() -> Self {
        Self {
            status: STATUS_NOT_FOUND.to_string(),
            ip_address: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == STATUS_NOT_FOUND
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/project information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
