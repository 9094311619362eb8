//! OpenStack gateway error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("openstack CLI not found. Please install: pip install python-openstackclient")]
    CliNotFound,

    #[error("openstack authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("openstack command failed: {0}")]
    CommandFailed(String),

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Unexpected openstack output: {0}")]
    InvalidOutput(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OpenStackError>;

impl From<OpenStackError> for ham_cloud::GatewayError {
    fn from(e: OpenStackError) -> Self {
        use ham_cloud::GatewayError;
        match e {
            OpenStackError::CliNotFound => GatewayError::ClientNotFound(e.to_string()),
            OpenStackError::AuthenticationFailed(msg) => GatewayError::AuthenticationFailed(msg),
            OpenStackError::CommandFailed(msg) => GatewayError::CommandFailed(msg),
            OpenStackError::ServerNotFound(_) => GatewayError::ApiError(e.to_string()),
            OpenStackError::InvalidOutput(msg) => GatewayError::InvalidResponse(msg),
            OpenStackError::JsonError(e) => GatewayError::Json(e),
            OpenStackError::IoError(e) => GatewayError::Io(e),
        }
    }
}
