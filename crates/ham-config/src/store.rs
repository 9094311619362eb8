//! conf.d directory store
//!
//! Every persisted entity owns a `conf.d/` directory of fragments. Reads merge
//! all `*.conf` files below the directory in sorted path order; writes replace
//! one fragment per section.

use crate::error::Result;
use crate::ini::{self, ConfigTable};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fragment suffix picked up by [`read`]
pub const FRAGMENT_EXTENSION: &str = "conf";

/// Value type of a persisted attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Bool,
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    /// Zero value used for absent or unparsable keys
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::Int => Value::Int(0),
            ValueKind::Bool => Value::Bool(false),
        }
    }

    /// Parse `raw` as `kind`, falling back to the zero value.
    pub fn parse(kind: ValueKind, raw: &str) -> Self {
        match kind {
            ValueKind::Str => Value::Str(raw.to_string()),
            ValueKind::Int => Value::Int(raw.trim().parse().unwrap_or_default()),
            ValueKind::Bool => Value::Bool(ini::parse_bool(raw).unwrap_or_default()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::Str,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// On-disk spelling. Booleans use `True`/`False` like Python's `str(bool)`.
    pub fn to_config_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Static declaration of where an attribute lives and how it is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub section: &'static str,
    pub kind: ValueKind,
}

impl Attribute {
    pub const fn new(name: &'static str, section: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            section,
            kind,
        }
    }
}

impl ConfigTable {
    /// Typed lookup for a schema attribute; never fails.
    pub fn value(&self, attr: &Attribute) -> Value {
        match self.get(attr.section, attr.name) {
            Some(raw) => Value::parse(attr.kind, raw),
            None => Value::zero(attr.kind),
        }
    }
}

/// An entity whose attributes are described by a static schema.
///
/// [`load_record`] and [`save_record`] walk the same schema, so whatever is
/// saved is what a later load yields.
pub trait Record {
    fn schema() -> &'static [Attribute];

    /// Current value of a schema attribute, `None` for unknown names
    fn value(&self, name: &str) -> Option<Value>;

    /// Assign a schema attribute; returns false for unknown names
    fn set_value(&mut self, name: &str, value: Value) -> bool;
}

/// Merge every `*.conf` fragment below `dir`, sorted by path.
///
/// Missing directories, unreadable files and malformed fragments are skipped,
/// so the result is always usable.
pub fn read(dir: &Path) -> ConfigTable {
    let mut table = ConfigTable::new();
    for path in fragment_paths(dir) {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable config fragment");
                continue;
            }
        };
        match ini::parse(&text) {
            Ok(fragment) => {
                debug!(path = %path.display(), "Merged config fragment");
                table.merge(fragment);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed config fragment");
            }
        }
    }
    table
}

fn fragment_paths(dir: &Path) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        FRAGMENT_EXTENSION
    );
    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Invalid fragment pattern");
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Write one section to `path`, creating parent directories.
///
/// Fails with `Unrepresentable`, before touching the file, if any option
/// would not read back unchanged.
pub fn write<'a, I>(section: &str, options: I, path: &Path) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let options: Vec<(&str, &str)> = options.into_iter().collect();
    ini::check_representable(section, &options)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, ini::render(section, options))?;
    debug!(path = %path.display(), section, "Wrote config fragment");
    Ok(())
}

/// Fragment path for a section: `<conf_dir>/<prefix>_<section>.conf`
pub fn fragment_path(conf_dir: &Path, prefix: &str, section: &str) -> PathBuf {
    conf_dir.join(format!("{}_{}.{}", prefix, section, FRAGMENT_EXTENSION))
}

/// Populate every schema attribute of `record` from `conf_dir`.
pub fn load_record<R: Record>(record: &mut R, conf_dir: &Path) {
    let table = read(conf_dir);
    for attr in R::schema() {
        record.set_value(attr.name, table.value(attr));
    }
}

/// Persist `record` as one fragment per section.
///
/// Nothing is written when any value is unrepresentable.
pub fn save_record<R: Record>(record: &R, conf_dir: &Path, prefix: &str) -> Result<()> {
    let mut by_section: BTreeMap<&str, Vec<(&str, String)>> = BTreeMap::new();
    for attr in R::schema() {
        let value = record
            .value(attr.name)
            .unwrap_or_else(|| Value::zero(attr.kind));
        by_section
            .entry(attr.section)
            .or_default()
            .push((attr.name, value.to_config_string()));
    }

    // all or nothing: validate every section before writing any fragment
    for (section, options) in &by_section {
        let options: Vec<(&str, &str)> = options.iter().map(|(k, v)| (*k, v.as_str())).collect();
        ini::check_representable(section, &options)?;
    }

    for (section, options) in &by_section {
        write(
            section,
            options.iter().map(|(k, v)| (*k, v.as_str())),
            &fragment_path(conf_dir, prefix, section),
        )?;
    }
    Ok(())
}
