use colored::Colorize;
use ham_core::Project;

pub fn init(project: &mut Project) -> anyhow::Result<()> {
    project.init()?;
    println!(
        "{} {}",
        "Initialized ham project in".green(),
        project.root().display().to_string().cyan()
    );
    Ok(())
}

pub fn list(project: &Project) {
    if project.environments().is_empty() {
        eprintln!("no environments created!");
        return;
    }
    for (name, env) in project.environments() {
        let marker = if name == project.workon_environment() {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, env);
    }
}

/// Registered blueprints; `*` marks the one `create` will use.
pub fn blueprints(project: &Project) {
    let selected = project.settings().blueprint_key();
    for (key, blueprint) in project.blueprints().iter() {
        let marker = if key == selected { "*" } else { " " };
        println!("{} {} {}", marker, format!("{:<10}", key).cyan(), blueprint.description());
    }
}

pub fn create(project: &mut Project, name: &str, args: &[String]) -> anyhow::Result<()> {
    let env = project.create(name, args)?;
    println!("{}", env);
    for server in env.servers().values() {
        println!("  {}", server);
    }
    Ok(())
}

pub fn workon(project: &mut Project, name: Option<&str>) -> anyhow::Result<()> {
    let name = name.unwrap_or_default();
    project.workon(name)?;
    if name.is_empty() {
        println!("{}", "Not working on any environment".yellow());
    } else {
        println!("Working on {}", name.cyan());
    }
    Ok(())
}
