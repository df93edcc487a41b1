// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External rendering backends — availability probe, opt-in provisioning, and
// the shared command runner used by the pandoc and LibreOffice renderers.

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use docops_core::error::{DocOpsError, Result};
use docops_core::{BackendConfig, CancelToken, RenderEngine};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Result of probing one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub engine: RenderEngine,
    pub program: String,
    pub available: bool,
    /// First line of the probe's output, when available.
    pub version: Option<String>,
    /// Why the backend is unavailable.
    pub detail: Option<String>,
}

/// Run the backend's version command and report what happened.
#[instrument(skip(backend), fields(program = %backend.program))]
pub fn probe(engine: RenderEngine, backend: &BackendConfig) -> BackendStatus {
    let mut status = BackendStatus {
        engine,
        program: backend.program.clone(),
        available: false,
        version: None,
        detail: None,
    };

    match Command::new(&backend.program)
        .args(&backend.version_args)
        .output()
    {
        Ok(output) if output.status.success() => {
            status.available = true;
            status.version = first_line(&output.stdout).or_else(|| first_line(&output.stderr));
        }
        Ok(output) => {
            status.detail = Some(format!(
                "probe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Err(err) => status.detail = Some(err.to_string()),
    }

    debug!(available = status.available, version = ?status.version, "Backend probed");
    status
}

/// Fail fast unless the backend can be used.
///
/// With `auto_provision` set and a provisioning command configured, a failed
/// probe runs that command once and probes again. The provisioning command is
/// killed if `cancel` fires.
#[instrument(skip(backend, cancel), fields(program = %backend.program))]
pub fn ensure_available(
    engine: RenderEngine,
    backend: &BackendConfig,
    auto_provision: bool,
    cancel: &CancelToken,
) -> Result<BackendStatus> {
    let status = probe(engine, backend);
    if status.available {
        return Ok(status);
    }
    let reason = status.detail.unwrap_or_default();

    let provision = match (&backend.provision, auto_provision) {
        (Some(command), true) => command,
        (Some(_), false) => {
            return Err(DocOpsError::DependencyUnavailable(format!(
                "{engine} ({}) is not available: {reason}; auto_provision is disabled",
                backend.program
            )));
        }
        (None, _) => {
            return Err(DocOpsError::DependencyUnavailable(format!(
                "{engine} ({}) is not available: {reason}",
                backend.program
            )));
        }
    };

    let Some((program, args)) = provision.split_first() else {
        return Err(DocOpsError::Config(format!("{engine}.provision is empty")));
    };
    info!(%engine, provisioner = %program, "Provisioning backend");
    run_command(engine, program, args, cancel).map_err(|err| match err {
        DocOpsError::Cancelled => err,
        err => DocOpsError::DependencyUnavailable(format!("provisioning {engine} failed: {err}")),
    })?;

    let status = probe(engine, backend);
    if status.available {
        info!(%engine, version = ?status.version, "Backend provisioned");
        Ok(status)
    } else {
        warn!(%engine, "Backend still unavailable after provisioning");
        Err(DocOpsError::DependencyUnavailable(format!(
            "{engine} ({}) is still not available after provisioning: {}",
            backend.program,
            status.detail.unwrap_or_default()
        )))
    }
}

/// How often a running command is checked for exit and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run an external program to completion, or kill it once `cancel` fires.
///
/// A missing program is a dependency failure; a non-zero exit is a backend
/// failure carrying the program's stderr verbatim.
pub(crate) fn run_command<S: AsRef<OsStr>>(
    engine: RenderEngine,
    program: &str,
    args: &[S],
    cancel: &CancelToken,
) -> Result<Output> {
    debug!(%engine, program, "Running backend command");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                DocOpsError::DependencyUnavailable(format!("{program} not found: {err}"))
            } else {
                DocOpsError::Io(err)
            }
        })?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            warn!(%engine, program, pid = child.id(), "Killing backend command");
            // It may have exited since the last poll.
            let _ = child.kill();
            child.wait()?;
            return Err(DocOpsError::Cancelled);
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(DocOpsError::Backend {
            engine: engine.to_string(),
            detail,
        });
    }
    Ok(output)
}

/// Read a child's pipe to the end on its own thread so the child never
/// blocks on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            // A read error leaves whatever was captured so far.
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn ensure(engine: RenderEngine, backend: &BackendConfig, auto: bool) -> Result<BackendStatus> {
        ensure_available(engine, backend, auto, &CancelToken::new())
    }

    fn shell_backend(script: &str) -> BackendConfig {
        BackendConfig {
            program: "sh".into(),
            version_args: vec!["-c".into(), script.into()],
            provision: None,
        }
    }

    #[test]
    fn probe_reports_version_line() {
        let status = probe(RenderEngine::Pandoc, &shell_backend("echo; echo 'pandoc 3.1.9'"));
        assert!(status.available);
        assert_eq!(status.version.as_deref(), Some("pandoc 3.1.9"));
    }

    #[test]
    fn probe_missing_program() {
        let backend = BackendConfig::new("/nonexistent/docops-test-pandoc");
        let status = probe(RenderEngine::Pandoc, &backend);
        assert!(!status.available);
        assert!(status.detail.is_some());
    }

    #[test]
    fn probe_failing_program() {
        let status = probe(RenderEngine::LibreOffice, &shell_backend("echo broken >&2; exit 3"));
        assert!(!status.available);
        assert!(status.detail.unwrap().contains("broken"));
    }

    #[test]
    fn missing_backend_without_provisioning() {
        let backend = BackendConfig::new("/nonexistent/docops-test-soffice");
        let err = ensure(RenderEngine::LibreOffice, &backend, true).unwrap_err();
        assert!(matches!(err, DocOpsError::DependencyUnavailable(_)));
    }

    #[test]
    fn provisioning_disabled_is_reported() {
        let mut backend = BackendConfig::new("/nonexistent/docops-test-soffice");
        backend.provision = Some(vec!["true".into()]);
        let err = ensure(RenderEngine::LibreOffice, &backend, false).unwrap_err();
        assert!(err.to_string().contains("auto_provision"));
    }

    #[test]
    fn provisioning_installs_then_reprobes() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("pandoc");
        let install = format!(
            "printf '#!/bin/sh\\necho pandoc 9.9\\n' > '{0}' && chmod +x '{0}'",
            program.display()
        );
        let backend = BackendConfig {
            program: program.display().to_string(),
            version_args: vec!["--version".into()],
            provision: Some(vec!["sh".into(), "-c".into(), install]),
        };

        let status = ensure(RenderEngine::Pandoc, &backend, true).unwrap();
        assert!(status.available);
        assert_eq!(status.version.as_deref(), Some("pandoc 9.9"));
    }

    #[test]
    fn failed_provisioning_is_dependency_error() {
        let mut backend = BackendConfig::new("/nonexistent/docops-test-pandoc");
        backend.provision = Some(vec!["sh".into(), "-c".into(), "exit 1".into()]);
        let err = ensure(RenderEngine::Pandoc, &backend, true).unwrap_err();
        assert!(matches!(err, DocOpsError::DependencyUnavailable(_)));
    }

    #[test]
    fn nonzero_exit_keeps_stderr() {
        let err = run_command(
            RenderEngine::Pandoc,
            "sh",
            &["-c", "echo 'xelatex not found. Please select a different --pdf-engine' >&2; exit 43"],
            &CancelToken::new(),
        )
        .unwrap_err();
        match err {
            DocOpsError::Backend { engine, detail } => {
                assert_eq!(engine, "pandoc");
                assert_eq!(detail, "xelatex not found. Please select a different --pdf-engine");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn output_is_captured() {
        let output = run_command(
            RenderEngine::Pandoc,
            "sh",
            &["-c", "echo out; echo err >&2"],
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr, b"err\n");
    }

    #[test]
    fn cancelled_command_is_killed() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = run_command(RenderEngine::Pandoc, "sleep", &["30"], &cancel).unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, DocOpsError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_program_is_dependency_error() {
        let err = run_command(
            RenderEngine::Pandoc,
            "/nonexistent/docops-x",
            &["a"],
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DocOpsError::DependencyUnavailable(_)));
    }
}
