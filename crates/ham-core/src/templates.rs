//! Files generated into a project tree
//!
//! `project.py` is copied verbatim; `fabfile.py` is rendered per environment
//! with Tera.

use crate::error::Result;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use tracing::debug;

/// Task source written by `init`
pub const PROJECT_TEMPLATE: &str = include_str!("../templates/project.py");

const FABFILE_TEMPLATE: &str = include_str!("../templates/fabfile.py.tera");

/// Render the task-runner entry point for one environment.
pub fn render_fabfile(project_root: &Path, env_name: &str) -> Result<String> {
    let mut context = Context::new();
    context.insert("project_root", &project_root.to_string_lossy());
    context.insert("env_name", env_name);

    let rendered = Tera::default().render_str(FABFILE_TEMPLATE, &context)?;
    Ok(rendered)
}

pub fn write_project_file(path: &Path) -> Result<()> {
    fs::write(path, PROJECT_TEMPLATE)?;
    debug!(path = %path.display(), "Wrote project tasks");
    Ok(())
}

pub fn write_fabfile(path: &Path, project_root: &Path, env_name: &str) -> Result<()> {
    let rendered = render_fabfile(project_root, env_name)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, rendered)?;
    debug!(path = %path.display(), "Wrote fabfile");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fabfile_embeds_root_and_name() {
        let rendered = render_fabfile(Path::new("/srv/ham.d"), "staging").unwrap();

        assert!(rendered.contains(r#"PROJECT_ROOT = "/srv/ham.d""#));
        assert!(rendered.contains(r#"ENV_NAME = "staging""#));
        assert!(rendered.contains("`ham create staging`"));
    }

    #[test]
    fn test_fabfile_quotes_awkward_paths() {
        let rendered = render_fabfile(Path::new(r#"/tmp/it's "here""#), "e").unwrap();
        assert!(rendered.contains(r#"PROJECT_ROOT = "/tmp/it's \"here\"""#));
    }

    #[test]
    fn test_project_template_defines_tasks() {
        assert!(PROJECT_TEMPLATE.contains("def check():"));
        assert!(PROJECT_TEMPLATE.contains("def roles():"));
    }
}
