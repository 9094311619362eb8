mod common;

use common::{Call, RecordingSleeper, TestProject};
use ham_cloud::GatewayError;
use ham_core::{
    Blueprint, BlueprintRegistry, BuildPolicy, CoreError, Environment, EnvironmentStatus,
    ServerState, TokioSleeper, WaitOptions,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn read_conf(project: &TestProject, env: &str, server: &str) -> Vec<(String, String)> {
    let conf = project
        .path()
        .join("envs")
        .join(env)
        .join("servers")
        .join(server)
        .join("conf.d");
    let mut files: Vec<_> = fs::read_dir(&conf)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
        .into_iter()
        .map(|p| {
            (
                p.file_name().unwrap().to_string_lossy().into_owned(),
                fs::read_to_string(&p).unwrap(),
            )
        })
        .collect()
}

/// `pair` environment `dev` with node1/node2 booted from `img-b` / flavor 3
fn pair_project() -> TestProject {
    let project = TestProject::new();
    project.use_blueprint("pair");
    project
        .open()
        .create("dev", &args(&["--image-id", "img-b", "--flavor-id", "3"]))
        .unwrap();
    project
}

#[test]
fn test_init_twice_fails() {
    let project = TestProject::new();
    assert!(project.path().join("envs/.workon").is_file());
    assert!(project.path().join("project.py").is_file());

    let err = project.open().init().unwrap_err();
    assert!(matches!(err, CoreError::ProjectExists(_)));
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn test_create_pair_environment() {
    let project = pair_project();
    let loaded = project.open();
    let env = loaded.get_environment(Some("dev")).unwrap();

    assert_eq!(env.servers().keys().collect::<Vec<_>>(), vec!["node1", "node2"]);
    for server in env.servers().values() {
        assert_eq!(server.image_id(), "img-b");
        assert_eq!(server.flavor_id(), "3");
        assert_eq!(server.server_id(), "");
        assert_eq!(server.state(), ServerState::Unbuilt);
    }
    assert!(project.path().join("envs/dev/fabfile.py").is_file());
}

#[test]
fn test_create_with_bad_blueprint_args() {
    let project = TestProject::new();
    let err = project
        .open()
        .create("dev", &args(&["--bogus"]))
        .unwrap_err();

    assert!(matches!(err, CoreError::BlueprintArgs(_)));
    assert!(project.open().environments().is_empty());
}

struct NothingBlueprint;

impl Blueprint for NothingBlueprint {
    fn description(&self) -> &str {
        "adds no servers"
    }

    fn populate(&self, _env: &mut Environment, _args: &[String]) -> ham_core::Result<()> {
        Ok(())
    }
}

struct TrioBlueprint;

impl Blueprint for TrioBlueprint {
    fn description(&self) -> &str {
        "three web servers"
    }

    fn populate(&self, env: &mut Environment, _args: &[String]) -> ham_core::Result<()> {
        for name in ["web1", "web2", "web3"] {
            env.create_server(name, [("image_id", "img-web"), ("flavor_id", "4")])?;
        }
        Ok(())
    }
}

#[test]
fn test_registered_blueprints() {
    let project = TestProject::new();
    let mut registry = BlueprintRegistry::builtin();
    registry.register("nothing", Arc::new(NothingBlueprint));
    registry.register("trio", Arc::new(TrioBlueprint));

    project.use_blueprint("nothing");
    let err = project.open_with(registry.clone()).create("empty", &[]).unwrap_err();
    assert!(matches!(err, CoreError::EmptyEnvironment(ref name) if name == "empty"));
    assert!(project.open_with(registry.clone()).environments().is_empty());

    project.use_blueprint("trio");
    project.open_with(registry.clone()).create("web", &[]).unwrap();
    let loaded = project.open_with(registry);
    let env = loaded.get_environment(Some("web")).unwrap();
    assert_eq!(env.servers().len(), 3);
    assert_eq!(env.server("web2").unwrap().flavor_id(), "4");
}

#[test]
fn test_get_environment_without_selection() {
    let project = pair_project();
    let loaded = project.open();

    assert_eq!(loaded.workon_environment(), "");
    assert!(matches!(loaded.get_environment(None), Err(CoreError::Lookup(_))));
}

#[tokio::test]
async fn test_build_records_boot_response() {
    let project = pair_project();
    project.gateway.boot_returns("node1", "abc", "x", "BUILD");
    project.gateway.fail_boot("node2", "quota exceeded");

    let mut loaded = project.open();
    let err = loaded
        .get_environment_mut(Some("dev"))
        .unwrap()
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Gateway(GatewayError::ApiError(ref m)) if m == "quota exceeded"));

    let reloaded = project.open();
    let env = reloaded.get_environment(Some("dev")).unwrap();
    let node1 = env.server("node1").unwrap();
    assert_eq!(node1.server_id(), "abc");
    assert_eq!(node1.admin_pass(), "x");
    assert_eq!(node1.status(), "BUILD");
    assert_eq!(node1.state(), ServerState::Building);
    assert_eq!(env.server("node2").unwrap().server_id(), "");
}

#[tokio::test]
async fn test_build_policies() {
    let project = pair_project();
    project.gateway.fail_boot("node1", "boom");

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    assert!(env.build_with(BuildPolicy::FailFast).await.is_err());
    assert_eq!(project.gateway.count(&Call::Boot("node2".into())), 0);

    assert!(env.build_with(BuildPolicy::ContinueOnError).await.is_err());
    assert_eq!(project.gateway.count(&Call::Boot("node1".into())), 2);
    assert_eq!(project.gateway.count(&Call::Boot("node2".into())), 1);
    assert_eq!(env.server("node2").unwrap().server_id(), "id-node2");
}

#[tokio::test]
async fn test_boot_refuses_active_server() {
    let project = pair_project();
    project.gateway.script_status("id-node1", &[("ACTIVE", Some("10.0.0.1"))]);
    project.gateway.script_status("id-node2", &[("ACTIVE", Some("10.0.0.2"))]);

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();
    env.refresh().await.unwrap();
    assert_eq!(env.status(), EnvironmentStatus::Active);

    // active servers are skipped by build
    env.build().await.unwrap();
    assert_eq!(project.gateway.count(&Call::Boot("node1".into())), 1);

    let gateway = Arc::clone(env.gateway());
    let mut node1 = env.server("node1").unwrap().clone();
    let err = node1.boot(gateway.as_ref()).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyActive(ref name) if name == "node1"));
}

#[tokio::test]
async fn test_boot_rejects_response_without_id() {
    let project = pair_project();
    project.gateway.boot_returns("node1", "", "x", "ACTIVE");

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    let err = env.build().await.unwrap_err();
    assert!(matches!(err, CoreError::Gateway(GatewayError::InvalidResponse(_))));

    let reloaded = project.open();
    let node1 = reloaded.get_environment(Some("dev")).unwrap().server("node1").unwrap();
    assert_eq!(node1.server_id(), "");
    assert_eq!(node1.status(), "");
    assert_eq!(node1.state(), ServerState::Unbuilt);
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let project = pair_project();
    project.gateway.script_status("id-node1", &[("ACTIVE", Some("203.0.113.5"))]);

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();

    env.refresh_server("node1").await.unwrap();
    let first = read_conf(&project, "dev", "node1");
    env.refresh_server("node1").await.unwrap();
    let second = read_conf(&project, "dev", "node1");

    assert_eq!(first, second);
    let server = env.server("node1").unwrap();
    assert_eq!(server.ip_address(), "203.0.113.5");
    assert!(server.is_active());
}

#[tokio::test]
async fn test_refresh_of_vanished_server() {
    let project = pair_project();
    project.gateway.script_status("id-node1", &[("NOT_FOUND", None)]);

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();

    let server = env.refresh_server("node1").await.unwrap();
    assert_eq!(server.status(), "NOT_FOUND");
    assert_eq!(server.ip_address(), "");
    assert_eq!(server.server_id(), "id-node1");
}

#[tokio::test]
async fn test_wait_polls_until_active() {
    let project = pair_project();
    for id in ["id-node1", "id-node2"] {
        project
            .gateway
            .script_status(id, &[("BUILD", None), ("ACTIVE", Some("10.0.0.7"))]);
    }

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();

    let sleeper = RecordingSleeper::default();
    env.wait(&sleeper).await.unwrap();

    assert_eq!(project.gateway.count(&Call::Status("id-node1".into())), 2);
    assert_eq!(project.gateway.count(&Call::Status("id-node2".into())), 2);
    assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(10)]);

    let reloaded = project.open();
    let env = reloaded.get_environment(Some("dev")).unwrap();
    assert!(env.servers().values().all(|s| s.status() == "ACTIVE"));
}

#[tokio::test]
async fn test_wait_only_repolls_pending_servers() {
    let project = pair_project();
    project.gateway.script_status("id-node1", &[("ACTIVE", None)]);
    project
        .gateway
        .script_status("id-node2", &[("BUILD", None), ("BUILD", None), ("ACTIVE", None)]);

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();

    let sleeper = RecordingSleeper::default();
    env.wait_with(&WaitOptions::default().with_interval(Duration::from_secs(2)), &sleeper)
        .await
        .unwrap();

    assert_eq!(project.gateway.count(&Call::Status("id-node1".into())), 1);
    assert_eq!(project.gateway.count(&Call::Status("id-node2".into())), 3);
    assert_eq!(sleeper.count(), 2);
}

#[tokio::test]
async fn test_wait_deadline() {
    let project = pair_project();

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();

    let sleeper = RecordingSleeper::default();
    let options = WaitOptions::default()
        .with_interval(Duration::from_secs(5))
        .with_deadline(Some(Duration::from_secs(12)));
    let err = env.wait_with(&options, &sleeper).await.unwrap_err();

    match err {
        CoreError::WaitTimeout { waited_secs, pending } => {
            assert_eq!(waited_secs, 15);
            assert_eq!(pending, "node1, node2");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sleeper.count(), 3);
    assert_eq!(project.gateway.count(&Call::Status("id-node1".into())), 4);
}

#[tokio::test]
async fn test_wait_rejects_zero_interval() {
    let project = pair_project();

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();

    let sleeper = RecordingSleeper::default();
    let options = WaitOptions::default()
        .with_interval(Duration::ZERO)
        .with_deadline(Some(Duration::from_secs(30)));
    let err = env.wait_with(&options, &sleeper).await.unwrap_err();

    assert!(matches!(err, CoreError::ZeroPollInterval));
    assert_eq!(sleeper.count(), 0);
    assert_eq!(project.gateway.count(&Call::Status("id-node1".into())), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_with_tokio_sleeper() {
    let project = pair_project();
    for id in ["id-node1", "id-node2"] {
        project
            .gateway
            .script_status(id, &[("BUILD", None), ("ACTIVE", None)]);
    }

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();

    let start = tokio::time::Instant::now();
    env.wait(&TokioSleeper).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(10));
}

#[tokio::test]
async fn test_teardown_deletes_every_server_once() {
    let project = pair_project();
    project.gateway.script_status("id-node1", &[("ACTIVE", None)]);

    let mut loaded = project.open();
    let env = loaded.get_environment_mut(Some("dev")).unwrap();
    env.build().await.unwrap();
    env.refresh_server("node1").await.unwrap();
    let before: Vec<_> = ["node1", "node2"]
        .iter()
        .map(|n| read_conf(&project, "dev", n))
        .collect();

    env.teardown().await.unwrap();

    assert_eq!(project.gateway.count(&Call::Delete("id-node1".into())), 1);
    assert_eq!(project.gateway.count(&Call::Delete("id-node2".into())), 1);
    let after: Vec<_> = ["node1", "node2"]
        .iter()
        .map(|n| read_conf(&project, "dev", n))
        .collect();
    assert_eq!(before, after);
    assert_eq!(env.server("node1").unwrap().status(), "ACTIVE");
}

#[tokio::test]
async fn test_delete_checks_fresh_status() {
    let project = pair_project();
    {
        let mut loaded = project.open();
        loaded
            .get_environment_mut(Some("dev"))
            .unwrap()
            .build()
            .await
            .unwrap();
    }

    // cached status says BUILD but the instance is live
    project.gateway.script_status("id-node2", &[("ACTIVE", None)]);
    let mut loaded = project.open();
    let err = loaded.delete_environment(Some("dev")).await.unwrap_err();
    assert!(matches!(err, CoreError::StillActive { ref servers, .. } if servers == "node2"));
    assert!(project.path().join("envs/dev/servers/node2/conf.d").is_dir());

    project.gateway.script_status("id-node2", &[("DELETED", None)]);
    let mut loaded = project.open();
    loaded.delete_environment(Some("dev")).await.unwrap();
    assert!(!project.path().join("envs/dev").exists());
    assert!(project.open().environments().is_empty());
}

#[tokio::test]
async fn test_workon_targets_commands() {
    let project = pair_project();
    project.open().workon("dev").unwrap();

    let mut loaded = project.open();
    loaded.get_environment_mut(None).unwrap().build().await.unwrap();

    assert_eq!(
        project.gateway.calls(),
        vec![Call::Boot("node1".into()), Call::Boot("node2".into())]
    );
}
