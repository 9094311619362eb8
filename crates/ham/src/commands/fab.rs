use ham_core::Project;
use std::process::ExitCode;
use tokio::process::Command;

/// Run `fab -f <fabfile> <args...>`.
///
/// A first argument that is not an environment is passed through to fab and
/// the selected environment is used instead.
pub async fn handle(
    project: &Project,
    name: Option<String>,
    mut args: Vec<String>,
) -> anyhow::Result<ExitCode> {
    let name = match name {
        Some(name) if !project.environments().contains_key(&name) => {
            args.insert(0, name);
            None
        }
        other => other,
    };
    let env = project.get_environment(name.as_deref())?;

    tracing::debug!("Running: fab -f {} {}", env.fabfile_path().display(), args.join(" "));
    let status = Command::new("fab")
        .arg("-f")
        .arg(env.fabfile_path())
        .args(&args)
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run fab: {}", e))?;

    Ok(match status.code() {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}
