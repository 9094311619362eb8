//! ham configuration store
//!
//! All durable state of a ham project is kept as small INI fragments under
//! `conf.d/` directories:
//!
//! ```text
//! servers/<name>/conf.d/
//!   20_boot.conf      [boot]      image_id, flavor_id, disk_config
//!   20_instance.conf  [instance]  server_id, admin_pass, ip_address
//!   20_cache.conf     [cache]     status
//! ```
//!
//! Reads never fail: a missing key, an unparsable value or a broken fragment
//! yields the zero value of the attribute's type.

pub mod error;
pub mod ini;
pub mod root;
pub mod store;

pub use error::*;
pub use ini::ConfigTable;
pub use root::{DEFAULT_PROJECT_DIR, PROJECT_ROOT_ENV, resolve_project_root};
pub use store::{
    Attribute, Record, Value, ValueKind, fragment_path, load_record, read, save_record, write,
};
