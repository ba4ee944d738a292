//! In-memory engine for service and pipeline tests

use anyhow::Result;
use slipway_core::domain::target::BuildArg;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::engine::ContainerEngine;

/// Content of a path inside a fake image
#[derive(Debug, Clone)]
pub enum FakePath {
    File(Vec<u8>),
    Dir(Vec<(String, Vec<u8>)>),
}

/// Records every call and fails the ones matching a configured pattern
#[derive(Debug, Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<String>>,
    failing: Vec<String>,
    local_images: Vec<String>,
    paths: HashMap<String, FakePath>,
}

impl FakeEngine {
    /// Calls whose description contains `pattern` fail
    pub fn failing(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    pub fn with_local_image(mut self, reference: &str) -> Self {
        self.local_images.push(reference.to_string());
        self
    }

    pub fn with_path(mut self, source: &str, content: FakePath) -> Self {
        self.paths.insert(source.to_string(), content);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing.iter().any(|p| call.contains(p.as_str())) {
            anyhow::bail!("fake engine failure: {}", call);
        }
        Ok(())
    }
}

impl ContainerEngine for FakeEngine {
    fn check_available(&self) -> Result<String> {
        self.record("version".to_string())?;
        Ok("fake 1.0".to_string())
    }

    fn login(&self, host: &str, username: &str, _token: &str) -> Result<()> {
        self.record(format!("login {} {}", host, username))
    }

    fn build(
        &self,
        _context: &Path,
        dockerfile: &Path,
        build_args: &[BuildArg],
        reference: &str,
    ) -> Result<()> {
        let mut parts = vec![
            "build".to_string(),
            reference.to_string(),
            dockerfile.display().to_string(),
        ];
        parts.extend(build_args.iter().map(|a| a.to_string()));
        self.record(parts.join(" "))
    }

    fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.record(format!("tag {} {}", source, target))
    }

    fn push(&self, reference: &str) -> Result<()> {
        self.record(format!("push {}", reference))
    }

    fn run(&self, reference: &str, command: &[String]) -> Result<()> {
        self.record(format!("run {} {}", reference, command.join(" ")))
    }

    fn image_exists(&self, reference: &str) -> Result<bool> {
        self.record(format!("inspect {}", reference))?;
        Ok(self.local_images.iter().any(|i| i == reference))
    }

    fn pull(&self, reference: &str) -> Result<()> {
        self.record(format!("pull {}", reference))
    }

    fn create(&self, reference: &str, _name: &str) -> Result<()> {
        self.record(format!("create {}", reference))
    }

    fn copy_from(&self, _container: &str, source: &str, destination: &Path) -> Result<()> {
        self.record(format!("cp {}", source))?;
        match self.paths.get(source) {
            Some(FakePath::File(bytes)) => fs::write(destination, bytes)?,
            Some(FakePath::Dir(entries)) => {
                fs::create_dir_all(destination)?;
                for (name, bytes) in entries {
                    let path = destination.join(name);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(path, bytes)?;
                }
            }
            None => anyhow::bail!("no such path in image: {}", source),
        }
        Ok(())
    }

    fn remove(&self, _container: &str) -> Result<()> {
        self.record("rm".to_string())
    }
}
