// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docops — command-line entry point.
//
// Exit status: 0 success, 1 usage or I/O problem, 2 invalid input,
// 3 conversion failure, 4 backend unavailable.

mod cli;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use docops_core::error::DocOpsError;
use docops_core::{
    Document, ErrorKind, FailureRecord, OperationResult, RenderEngine, ServiceConfig,
};
use docops_service::{BackendStatus, DocumentService};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, Job};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = ServiceConfig::discover(cli.config.as_deref())
        .context("failed to load configuration")?;
    debug!(?config, "Configuration loaded");

    match &cli.command {
        Command::Doctor { provision } => return doctor(config, *provision, cli.json),
        Command::Info { input } => return page_info(config, input, cli.json),
        _ => {}
    }

    let job = match cli.command.job() {
        Ok(Some(job)) => job,
        Ok(None) => return Ok(ExitCode::SUCCESS),
        Err(DocOpsError::Io(err)) => return Err(err).context("failed to read input"),
        Err(err) => return Ok(report_failure(&FailureRecord::from_error(&err), cli.json)),
    };

    let deadline = cli.timeout.map(Duration::from_secs).or(config.deadline());
    let service = DocumentService::new(config);
    let Job {
        request,
        output_dir,
    } = job;

    let result = match deadline {
        Some(deadline) => service.execute_with_deadline(request, deadline),
        None => service.execute(request),
    };
    finish(result, &output_dir, cli.json)
}

/// Write outputs and print the outcome.
fn finish(result: OperationResult, output_dir: &Path, json: bool) -> Result<ExitCode> {
    let report = result.report();
    let outcome = result.into_outcome();

    let output = match outcome {
        Ok(output) => output,
        Err(failure) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(exit_code(failure.kind));
            }
            return Ok(report_failure(&failure, false));
        }
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let mut written = Vec::new();
    for doc in output.documents() {
        let path = output_dir.join(doc.name());
        std::fs::write(&path, doc.bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = doc.len(), "Output written");
        written.push(path);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_written(&written);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_written(paths: &[PathBuf]) {
    for path in paths {
        println!("{}", path.display());
    }
}

fn report_failure(failure: &FailureRecord, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(failure) {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("error: {err}"),
        }
    } else {
        eprintln!("{failure}");
        eprintln!("hint: {}", failure.suggestion);
    }
    exit_code(failure.kind)
}

fn exit_code(kind: ErrorKind) -> ExitCode {
    ExitCode::from(exit_status(kind))
}

fn exit_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => 2,
        ErrorKind::Conversion => 3,
        ErrorKind::DependencyUnavailable => 4,
    }
}

/// Print the page count of one PDF.
fn page_info(config: ServiceConfig, input: &Path, json: bool) -> Result<ExitCode> {
    let document = match Document::from_path(input) {
        Ok(document) => document,
        Err(DocOpsError::Io(err)) => return Err(err).context("failed to read input"),
        Err(err) => return Ok(report_failure(&FailureRecord::from_error(&err), json)),
    };
    let pages = match DocumentService::new(config).page_count(&document) {
        Ok(pages) => pages,
        Err(err) => return Ok(report_failure(&FailureRecord::from_error(&err), json)),
    };

    if json {
        let summary = serde_json::json!({
            "name": document.name(),
            "pages": pages,
            "bytes": document.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}: {}", input.display(), page_summary(pages));
    }
    Ok(ExitCode::SUCCESS)
}

fn page_summary(pages: u32) -> String {
    match pages {
        1 => "1 page".to_string(),
        n => format!("{n} pages"),
    }
}

/// Report on the external backends, provisioning them on request.
/// Exits 4 while any backend remains unavailable.
fn doctor(mut config: ServiceConfig, provision: bool, json: bool) -> Result<ExitCode> {
    if provision {
        config.auto_provision = true;
    }
    let service = DocumentService::new(config);

    if provision {
        for engine in RenderEngine::EXTERNAL {
            if let Err(err) = service.ensure_backend(engine) {
                info!(%engine, error = %err, "Provisioning did not succeed");
            }
        }
    }
    let statuses = service.preflight();

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        println!("builtin      available (in-process)");
        for status in &statuses {
            println!("{}", describe(status));
        }
    }

    if statuses.iter().all(|status| status.available) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(exit_code(ErrorKind::DependencyUnavailable))
    }
}

fn describe(status: &BackendStatus) -> String {
    let engine = status.engine.as_str();
    if status.available {
        format!(
            "{engine:<12} available ({}{})",
            status.program,
            status
                .version
                .as_deref()
                .map(|version| format!(", {version}"))
                .unwrap_or_default()
        )
    } else {
        format!(
            "{engine:<12} missing ({}: {})",
            status.program,
            status.detail.as_deref().unwrap_or("not found")
        )
    }
}
