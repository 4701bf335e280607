//! Fake probe set for deterministic testing
//!
//! Answers come from a table keyed by probe method name, so evaluator and
//! scoring tests run without touching the host.
//!
//! ```rust,ignore
//! let probes = FakeProbes::builder()
//!     .answer("service_active", true)
//!     .fail("guest_login_disabled", "lightdm not installed")
//!     .build();
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{ProbeError, ProbeResult, Probes};

/// Canned response for one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
    Answer(bool),
    Error(String),
}

impl FakeResponse {
    fn to_result(&self) -> ProbeResult {
        match self {
            FakeResponse::Answer(value) => Ok(*value),
            FakeResponse::Error(msg) => Err(ProbeError::Unavailable(msg.clone())),
        }
    }
}

/// Probe set with pre-configured answers
pub struct FakeProbes {
    responses: HashMap<String, FakeResponse>,
    default_response: FakeResponse,
    /// (probe, arguments) in call order
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl FakeProbes {
    pub fn builder() -> FakeProbesBuilder {
        FakeProbesBuilder::new()
    }

    /// Every probe errors with `msg`
    pub fn all_failing(msg: &str) -> Self {
        FakeProbesBuilder::new()
            .default_response(FakeResponse::Error(msg.to_string()))
            .build()
    }

    /// Every probe answers `value`
    pub fn all_answering(value: bool) -> Self {
        FakeProbesBuilder::new()
            .default_response(FakeResponse::Answer(value))
            .build()
    }

    pub fn call_count(&self, probe: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == probe)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Arguments of the most recent call to `probe`
    pub fn last_args(&self, probe: &str) -> Option<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == probe)
            .map(|(_, args)| args.clone())
    }

    fn respond(&self, probe: &str, args: &[&str]) -> ProbeResult {
        self.calls.lock().unwrap().push((
            probe.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        self.responses
            .get(probe)
            .unwrap_or(&self.default_response)
            .to_result()
    }
}

impl Default for FakeProbes {
    fn default() -> Self {
        FakeProbesBuilder::new().build()
    }
}

#[async_trait]
impl Probes for FakeProbes {
    fn name(&self) -> &str {
        "fake"
    }

    async fn command(&self, cmd: &str) -> ProbeResult {
        self.respond("command", &[cmd])
    }

    async fn file_exists(&self, path: &str) -> ProbeResult {
        self.respond("file_exists", &[path])
    }

    async fn file_contains(&self, path: &str, text: &str) -> ProbeResult {
        self.respond("file_contains", &[path, text])
    }

    async fn file_contains_regex(&self, path: &str, pattern: &str) -> ProbeResult {
        self.respond("file_contains_regex", &[path, pattern])
    }

    async fn dir_contains_regex(&self, dir: &str, pattern: &str) -> ProbeResult {
        self.respond("dir_contains_regex", &[dir, pattern])
    }

    async fn package_installed(&self, package: &str) -> ProbeResult {
        self.respond("package_installed", &[package])
    }

    async fn service_active(&self, name: &str) -> ProbeResult {
        self.respond("service_active", &[name])
    }

    async fn user_exists(&self, name: &str) -> ProbeResult {
        self.respond("user_exists", &[name])
    }

    async fn user_in_group(&self, user: &str, group: &str) -> ProbeResult {
        self.respond("user_in_group", &[user, group])
    }

    async fn firewall_active(&self) -> ProbeResult {
        self.respond("firewall_active", &[])
    }

    async fn password_unchanged_from_hash(&self, user: &str, legacy_hash: &str) -> ProbeResult {
        self.respond("password_unchanged_from_hash", &[user, legacy_hash])
    }

    async fn guest_login_disabled(&self) -> ProbeResult {
        self.respond("guest_login_disabled", &[])
    }

    async fn package_version_equals(&self, package: &str, version: &str) -> ProbeResult {
        self.respond("package_version_equals", &[package, version])
    }

    async fn kernel_version_contains(&self, fragment: &str) -> ProbeResult {
        self.respond("kernel_version_contains", &[fragment])
    }

    async fn auto_updates_enabled(&self) -> ProbeResult {
        self.respond("auto_updates_enabled", &[])
    }

    async fn permission_matches(&self, path: &str, mode: &str, expected: &str) -> ProbeResult {
        self.respond("permission_matches", &[path, mode, expected])
    }
}

/// Builder for FakeProbes
pub struct FakeProbesBuilder {
    responses: HashMap<String, FakeResponse>,
    default_response: FakeResponse,
}

impl FakeProbesBuilder {
    /// Unconfigured probes answer `false`
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: FakeResponse::Answer(false),
        }
    }

    pub fn answer(mut self, probe: &str, value: bool) -> Self {
        self.responses
            .insert(probe.to_string(), FakeResponse::Answer(value));
        self
    }

    pub fn fail(mut self, probe: &str, msg: &str) -> Self {
        self.responses
            .insert(probe.to_string(), FakeResponse::Error(msg.to_string()));
        self
    }

    pub fn default_response(mut self, response: FakeResponse) -> Self {
        self.default_response = response;
        self
    }

    pub fn build(self) -> FakeProbes {
        FakeProbes {
            responses: self.responses,
            default_response: self.default_response,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for FakeProbesBuilder {
    fn default() -> Self {
        Self::new()
    }
}
