//! Container engine access
//!
//! Every image and container operation goes through the engine CLI
//! (`docker` or `podman`) as a blocking child process:
//! - Checking engine availability
//! - Registry login, build, tag, push
//! - Smoke tests in throwaway containers
//! - Pull, create, copy-out and removal for asset extraction

use anyhow::{Context, Result};
use slipway_core::domain::target::BuildArg;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// Operations the pipeline needs from a container engine
///
/// Implementations are blocking; callers run them on the blocking pool.
pub trait ContainerEngine: Send + Sync {
    /// Returns the engine's version string
    fn check_available(&self) -> Result<String>;

    /// Logs into a registry host, passing the token on stdin
    fn login(&self, host: &str, username: &str, token: &str) -> Result<()>;

    /// Builds `context` with `dockerfile` and tags the result as `reference`
    fn build(
        &self,
        context: &Path,
        dockerfile: &Path,
        build_args: &[BuildArg],
        reference: &str,
    ) -> Result<()>;

    fn tag(&self, source: &str, target: &str) -> Result<()>;

    fn push(&self, reference: &str) -> Result<()>;

    /// Runs `command` in a throwaway container of `reference`
    fn run(&self, reference: &str, command: &[String]) -> Result<()>;

    fn image_exists(&self, reference: &str) -> Result<bool>;

    fn pull(&self, reference: &str) -> Result<()>;

    /// Creates (without starting) a container named `name`
    fn create(&self, reference: &str, name: &str) -> Result<()>;

    /// Copies `source` out of a container to `destination` on the host
    fn copy_from(&self, container: &str, source: &str, destination: &Path) -> Result<()>;

    fn remove(&self, container: &str) -> Result<()>;
}

/// Engine driven through its command-line interface
#[derive(Debug, Clone)]
pub struct CliEngine {
    binary: String,
}

impl CliEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Runs the engine with `args` and returns its stdout
    ///
    /// Fails with exit code, stdout and stderr when the command fails.
    fn execute(&self, action: &str, args: &[String], stdin: Option<&str>) -> Result<String> {
        debug!("{} {}", self.binary, args.join(" "));

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to execute {} {}", self.binary, action))?;

        if let Some(input) = stdin {
            let mut pipe = child
                .stdin
                .take()
                .ok_or_else(|| anyhow::anyhow!("Failed to open stdin for {}", action))?;
            pipe.write_all(input.as_bytes())
                .with_context(|| format!("Failed to write stdin for {}", action))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {} {}", self.binary, action))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", action, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", action, stderr.trim());
        }

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let error_msg = format!(
                "{} {} failed: exit_code={}, stderr='{}'",
                self.binary,
                action,
                exit_code,
                stderr.trim()
            );
            error!("{}", error_msg);
            anyhow::bail!("{}", error_msg);
        }

        Ok(stdout.into_owned())
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Build command line, build args in definition order
pub(crate) fn build_command(
    context: &Path,
    dockerfile: &Path,
    build_args: &[BuildArg],
    reference: &str,
) -> Vec<String> {
    let mut args = owned(&["build", "--file"]);
    args.push(dockerfile.display().to_string());
    args.push("--tag".to_string());
    args.push(reference.to_string());
    for arg in build_args {
        args.push("--build-arg".to_string());
        args.push(arg.to_string());
    }
    args.push(context.display().to_string());
    args
}

impl ContainerEngine for CliEngine {
    fn check_available(&self) -> Result<String> {
        let version = self
            .execute("--version", &owned(&["--version"]), None)
            .with_context(|| format!("Is {} installed?", self.binary))?;
        let version = version.trim().to_string();
        info!("Container engine is available: {}", version);
        Ok(version)
    }

    fn login(&self, host: &str, username: &str, token: &str) -> Result<()> {
        let args = owned(&["login", host, "--username", username, "--password-stdin"]);
        self.execute("login", &args, Some(token))?;
        info!("Logged into {} as {}", host, username);
        Ok(())
    }

    fn build(
        &self,
        context: &Path,
        dockerfile: &Path,
        build_args: &[BuildArg],
        reference: &str,
    ) -> Result<()> {
        let args = build_command(context, dockerfile, build_args, reference);
        self.execute("build", &args, None)?;
        Ok(())
    }

    fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.execute("tag", &owned(&["tag", source, target]), None)?;
        Ok(())
    }

    fn push(&self, reference: &str) -> Result<()> {
        self.execute("push", &owned(&["push", reference]), None)?;
        Ok(())
    }

    fn run(&self, reference: &str, command: &[String]) -> Result<()> {
        let mut args = owned(&["run", "--rm", reference]);
        args.extend(command.iter().cloned());
        self.execute("run", &args, None)?;
        Ok(())
    }

    fn image_exists(&self, reference: &str) -> Result<bool> {
        let status = Command::new(&self.binary)
            .args(["image", "inspect", reference])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to execute {} image inspect", self.binary))?;
        Ok(status.success())
    }

    fn pull(&self, reference: &str) -> Result<()> {
        self.execute("pull", &owned(&["pull", reference]), None)?;
        Ok(())
    }

    fn create(&self, reference: &str, name: &str) -> Result<()> {
        // Images without a default command still need one to be created
        self.execute("create", &owned(&["create", "--name", name, reference, "true"]), None)?;
        Ok(())
    }

    fn copy_from(&self, container: &str, source: &str, destination: &Path) -> Result<()> {
        let args = vec![
            "cp".to_string(),
            format!("{}:{}", container, source),
            destination.display().to_string(),
        ];
        self.execute("cp", &args, None)?;
        Ok(())
    }

    fn remove(&self, container: &str) -> Result<()> {
        self.execute("rm", &owned(&["rm", "--force", container]), None)?;
        Ok(())
    }
}

/// Registry host of an image reference (`ghcr.io/org/img` -> `ghcr.io`)
///
/// References without an explicit host resolve to Docker Hub.
pub fn registry_host(registry: &str) -> &str {
    let first = registry.split('/').next().unwrap_or(registry);
    if first.contains('.') || first.contains(':') || first == "localhost" {
        first
    } else {
        "docker.io"
    }
}
