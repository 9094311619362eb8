use async_trait::async_trait;
use ham_cloud::{
    AuthStatus, BootRequest, BootedInstance, CloudGateway, GatewayError, InstanceStatus,
};
use ham_core::{BlueprintRegistry, Project, Sleeper};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Boot(String),
    Status(String),
    Delete(String),
}

/// In-memory gateway with scripted answers.
///
/// Boots succeed with `id-<name>` / `BUILD` unless a failure is queued.
/// Status answers are consumed in order per server id; the last one repeats.
#[derive(Default)]
pub struct ScriptedGateway {
    boot_failures: Mutex<HashMap<String, String>>,
    boot_overrides: Mutex<HashMap<String, BootedInstance>>,
    statuses: Mutex<HashMap<String, VecDeque<InstanceStatus>>>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_boot(&self, name: &str, message: &str) {
        self.boot_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), message.to_string());
    }

    pub fn boot_returns(&self, name: &str, id: &str, admin_pass: &str, status: &str) {
        self.boot_overrides.lock().unwrap().insert(
            name.to_string(),
            BootedInstance {
                id: id.to_string(),
                admin_pass: admin_pass.to_string(),
                status: status.to_string(),
            },
        );
    }

    pub fn script_status(&self, server_id: &str, answers: &[(&str, Option<&str>)]) {
        let queue = answers
            .iter()
            .map(|(status, ip)| InstanceStatus::new(*status, ip.map(str::to_string)))
            .collect();
        self.statuses
            .lock()
            .unwrap()
            .insert(server_id.to_string(), queue);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CloudGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn check_auth(&self) -> ham_cloud::Result<AuthStatus> {
        Ok(AuthStatus::ok("scripted"))
    }

    async fn boot(&self, request: &BootRequest) -> ham_cloud::Result<BootedInstance> {
        self.record(Call::Boot(request.name.clone()));
        if let Some(message) = self.boot_failures.lock().unwrap().get(&request.name) {
            return Err(GatewayError::ApiError(message.clone()));
        }
        if let Some(booted) = self.boot_overrides.lock().unwrap().get(&request.name) {
            return Ok(booted.clone());
        }
        Ok(BootedInstance {
            id: format!("id-{}", request.name),
            admin_pass: format!("pw-{}", request.name),
            status: "BUILD".to_string(),
        })
    }

    async fn status(&self, server_id: &str) -> ham_cloud::Result<InstanceStatus> {
        self.record(Call::Status(server_id.to_string()));
        if server_id.is_empty() {
            return Ok(InstanceStatus::not_found());
        }
        let mut statuses = self.statuses.lock().unwrap();
        let answer = match statuses.get_mut(server_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(answer.unwrap_or_else(|| InstanceStatus::new("BUILD", None)))
    }

    async fn delete(&self, server_id: &str) -> ham_cloud::Result<()> {
        self.record(Call::Delete(server_id.to_string()));
        Ok(())
    }
}

/// Sleeper that records requested delays and returns at once
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[allow(dead_code)]
impl RecordingSleeper {
    pub fn count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Initialized project in a scratch directory
pub struct TestProject {
    pub root: TempDir,
    pub gateway: Arc<ScriptedGateway>,
}

#[allow(dead_code)]
impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let gateway = ScriptedGateway::new();
        let test_project = Self { root, gateway };
        test_project.open().init().unwrap();
        test_project
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Fresh `Project` read from disk, as a new process would see it
    pub fn open(&self) -> Project {
        self.open_with(BlueprintRegistry::builtin())
    }

    pub fn open_with(&self, blueprints: BlueprintRegistry) -> Project {
        let gateway: Arc<dyn CloudGateway> = self.gateway.clone();
        Project::open(self.path(), gateway, blueprints).unwrap()
    }

    pub fn use_blueprint(&self, key: &str) {
        ham_config::write(
            "project",
            [("blueprint", key)],
            &self.path().join("conf.d/10_project.conf"),
        )
        .unwrap();
    }
}
