// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DocumentService — the single entry point for document operations.
//
// Every invocation gets its own id and tracing span. Errors (and panics from
// the underlying libraries) stop here and become a `FailureRecord`.
// A deadline cancels the running operation and waits for it to unwind, so
// no backend process or scratch directory outlives the call.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use docops_core::error::{DocOpsError, Result};
use docops_core::{
    CancelToken, Document, FailureRecord, InvocationId, OperationKind, OperationOutput,
    OperationRequest, OperationResult, RenderEngine, ServiceConfig,
};
use docops_document::BackendStatus;
use docops_document::backend;
use tracing::{error, info, info_span, warn};

use crate::operations;

/// Stateless document operation service. Cheap to clone; clones share the
/// same immutable configuration.
#[derive(Debug, Clone)]
pub struct DocumentService {
    config: Arc<ServiceConfig>,
}

impl DocumentService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run one request and report its outcome. Never panics.
    pub fn execute(&self, request: OperationRequest) -> OperationResult {
        self.execute_as(InvocationId::new(), request, &CancelToken::new())
    }

    /// Run one request on a worker thread, giving up after `deadline`.
    ///
    /// On expiry the worker is cancelled: a running backend process is
    /// killed, and the call returns only after the worker has released its
    /// scratch space.
    pub fn execute_with_deadline(
        &self,
        request: OperationRequest,
        deadline: Duration,
    ) -> OperationResult {
        let invocation = InvocationId::new();
        let kind = request.kind;
        let started_at = Utc::now();
        let clock = Instant::now();

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let service = self.clone();
        let worker_cancel = cancel.clone();
        let spawned = thread::Builder::new()
            .name(format!("docops-{kind}"))
            .spawn(move || {
                // The receiver is gone once the deadline has passed.
                let _ = tx.send(service.execute_as(invocation, request, &worker_cancel));
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(err) => return failed(invocation, kind, started_at, clock, DocOpsError::Io(err)),
        };

        let result = match rx.recv_timeout(deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(%invocation, %kind, ?deadline, "Operation deadline expired, cancelling");
                cancel.cancel();
                failed(invocation, kind, started_at, clock, DocOpsError::Timeout(deadline))
            }
            Err(RecvTimeoutError::Disconnected) => failed(
                invocation,
                kind,
                started_at,
                clock,
                DocOpsError::Internal("worker exited without a result".into()),
            ),
        };

        if worker.join().is_err() {
            error!(%invocation, "Operation worker panicked");
        }
        result
    }

    /// Number of pages in a PDF document.
    pub fn page_count(&self, document: &Document) -> Result<u32> {
        operations::page_count(document)
    }

    /// Probe every external rendering backend.
    pub fn preflight(&self) -> Vec<BackendStatus> {
        RenderEngine::EXTERNAL
            .into_iter()
            .filter_map(|engine| {
                self.config
                    .backend(engine)
                    .map(|backend_config| backend::probe(engine, backend_config))
            })
            .collect()
    }

    /// Make sure `engine` can be used, provisioning it when configured to.
    /// The builtin engine needs nothing and yields `None`.
    pub fn ensure_backend(&self, engine: RenderEngine) -> Result<Option<BackendStatus>> {
        match self.config.backend(engine) {
            Some(backend_config) => {
                backend::ensure_available(
                    engine,
                    backend_config,
                    self.config.auto_provision,
                    &CancelToken::new(),
                )
                .map(Some)
            }
            None => Ok(None),
        }
    }

    fn execute_as(
        &self,
        invocation: InvocationId,
        request: OperationRequest,
        cancel: &CancelToken,
    ) -> OperationResult {
        let kind = request.kind;
        let span = info_span!("operation", invocation = %invocation, kind = %kind);
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcome = span.in_scope(|| {
            info!(inputs = request.inputs.len(), "Operation started");
            run_guarded(&self.config, &request, cancel)
        });

        let elapsed = clock.elapsed();
        let outcome = span.in_scope(|| conclude(outcome, elapsed));
        OperationResult {
            invocation,
            kind,
            started_at,
            elapsed,
            outcome,
        }
    }
}

/// Dispatch with library panics turned into errors.
fn run_guarded(
    config: &ServiceConfig,
    request: &OperationRequest,
    cancel: &CancelToken,
) -> Result<OperationOutput> {
    panic::catch_unwind(AssertUnwindSafe(|| operations::dispatch(config, request, cancel)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(%message, "Operation panicked");
            Err(DocOpsError::Internal(message))
        })
}

/// Log the outcome and convert any error into its failure record.
fn conclude(
    outcome: Result<OperationOutput>,
    elapsed: Duration,
) -> std::result::Result<OperationOutput, FailureRecord> {
    let elapsed_ms = elapsed.as_millis() as u64;
    match outcome {
        Ok(output) => {
            info!(outputs = output.documents().len(), elapsed_ms, "Operation succeeded");
            Ok(output)
        }
        Err(err) => {
            let record = FailureRecord::from_error(&err);
            warn!(kind = %record.kind, error = %err, elapsed_ms, "Operation failed");
            Err(record)
        }
    }
}

fn failed(
    invocation: InvocationId,
    kind: OperationKind,
    started_at: DateTime<Utc>,
    clock: Instant,
    err: DocOpsError,
) -> OperationResult {
    OperationResult {
        invocation,
        kind,
        started_at,
        elapsed: clock.elapsed(),
        outcome: Err(FailureRecord::from_error(&err)),
    }
}
