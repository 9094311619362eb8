//! OpenStack gateway for ham
//!
//! Implements [`ham_cloud::CloudGateway`] on top of the `openstack` CLI
//! (python-openstackclient).
//!
//! # Requirements
//!
//! - `openstack` must be on `PATH`
//! - Credentials come from `OS_*` environment variables or `clouds.yaml`
//!
//! # Example
//!
//! ```ignore
//! use ham_cloud::{BootRequest, CloudGateway};
//! use ham_cloud_openstack::OpenStackGateway;
//!
//! let gateway = OpenStackGateway::new();
//! let booted = gateway.boot(&BootRequest::new("node1", image_id, "2")).await?;
//! let status = gateway.status(&booted.id).await?;
//! ```

pub mod cli;
pub mod error;
pub mod gateway;

pub use cli::{CreateServerConfig, OpenStackCli, ServerRecord, TokenInfo};
pub use error::{OpenStackError, Result};
pub use gateway::OpenStackGateway;
