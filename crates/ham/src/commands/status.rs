use super::project::list;
use ham_core::Project;

pub async fn handle(
    project: &mut Project,
    name: Option<&str>,
    server: Option<&str>,
) -> anyhow::Result<()> {
    let key = name.filter(|n| !n.is_empty()).unwrap_or(project.workon_environment());
    if key.is_empty() {
        eprintln!("WARNING: not working on any environment!");
        list(project);
        return Ok(());
    }
    let key = key.to_string();

    let env = project.get_environment_mut(Some(&key))?;
    match server {
        Some(server_name) => {
            let server = env.refresh_server(server_name).await?;
            println!("ssh root@{} # {}", server.ip_address(), server.admin_pass());
        }
        None => {
            env.refresh().await?;
            for server in env.servers().values() {
                println!("{}", server);
            }
        }
    }
    Ok(())
}
