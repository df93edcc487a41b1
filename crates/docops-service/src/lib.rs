// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docops-service — Request/response orchestration for document operations.
//
// `DocumentService::execute` takes a complete `OperationRequest`, validates
// it, dispatches to the matching operation, and always returns an
// `OperationResult`: outputs on success, a structured failure otherwise.

mod operations;
pub mod scratch;
pub mod service;

#[cfg(test)]
mod fixtures;

pub use docops_document::BackendStatus;
pub use scratch::ScratchSpace;
pub use service::DocumentService;
