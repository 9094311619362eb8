use colored::Colorize;
use ham_cloud::CloudGateway;
use ham_core::Project;
use std::process::ExitCode;

pub async fn handle(project: &Project) -> anyhow::Result<ExitCode> {
    let gateway = project.gateway();
    let auth = gateway.check_auth().await?;

    if auth.authenticated {
        println!(
            "{} {} {}",
            "✓".green(),
            gateway.name(),
            auth.account_info.unwrap_or_default()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "{} {}: {}",
            "✗".red(),
            gateway.name(),
            auth.error.unwrap_or_default()
        );
        Ok(ExitCode::FAILURE)
    }
}
