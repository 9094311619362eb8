//! build / wait / teardown / delete

use anyhow::Context;
use colored::Colorize;
use ham_core::{Project, TokioSleeper};
use std::time::Duration;

pub async fn build(project: &mut Project, name: Option<&str>) -> anyhow::Result<()> {
    let policy = project.settings().build_policy();
    let env = project.get_environment_mut(name)?;
    println!("{} {}", "Building".yellow(), env.name().cyan());

    let result = env.build_with(policy).await;
    for server in env.servers().values() {
        println!("  {}", server);
    }
    result?;
    Ok(())
}

pub async fn wait(project: &mut Project, name: Option<&str>, timeout: Option<u64>) -> anyhow::Result<()> {
    let mut options = project.settings().wait_options();
    if let Some(secs) = timeout {
        options = options.with_deadline((secs > 0).then(|| Duration::from_secs(secs)));
    }
    let env = project.get_environment_mut(name)?;

    tokio::select! {
        result = env.wait_with(&options, &TokioSleeper) => {
            result?;
            eprintln!("{}", "FINISHED!".green().bold());
        }
        signal = tokio::signal::ctrl_c() => interrupted(signal)?,
    }
    Ok(())
}

/// Ctrl-C branch of `wait`. A handler that failed to install is an error,
/// not an interrupt.
fn interrupted(signal: std::io::Result<()>) -> anyhow::Result<()> {
    signal.context("failed to listen for Ctrl+C")?;
    eprintln!("... not done");
    Ok(())
}

pub async fn teardown(project: &Project, name: Option<&str>) -> anyhow::Result<()> {
    let env = project.get_environment(name)?;
    env.teardown().await?;
    println!(
        "{} {}",
        "Requested deletion of every server in".yellow(),
        env.name().cyan()
    );
    Ok(())
}

pub async fn delete(project: &mut Project, name: Option<&str>) -> anyhow::Result<()> {
    let deleted = project.delete_environment(name).await?;
    println!("{} {}", "Deleted environment".green(), deleted.cyan());
    Ok(())
}
