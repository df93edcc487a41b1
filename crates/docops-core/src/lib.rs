// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docops — Core types, errors, and configuration shared across all crates.

pub mod cancel;
pub mod config;
pub mod error;
pub mod failure;
pub mod integrity;
pub mod selection;
pub mod types;

pub use cancel::CancelToken;
pub use config::{BackendConfig, ServiceConfig};
pub use error::{DocOpsError, ErrorKind};
pub use failure::FailureRecord;
pub use selection::{PageSelection, SelectionPolicy};
pub use types::*;
