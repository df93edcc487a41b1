// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration, loaded from a JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DocOpsError, Result};
use crate::selection::SelectionPolicy;
use crate::types::{PaperSize, RenderEngine};

const CONFIG_FILE: &str = "config.json";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DOCOPS_CONFIG";

/// How to reach (and optionally install) one external rendering backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Executable name or absolute path.
    pub program: String,
    /// Arguments for the availability probe.
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
    /// Command (program followed by arguments) that installs the backend.
    #[serde(default)]
    pub provision: Option<Vec<String>>,
}

impl BackendConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            version_args: default_version_args(),
            provision: None,
        }
    }
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

/// Settings shared by every invocation of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Engine used by WordToPdf when the request names none.
    pub default_render_engine: RenderEngine,
    /// LaTeX engine passed to pandoc when the request names none.
    pub default_pdf_engine: Option<String>,
    /// Page size used by the builtin renderer.
    pub paper_size: PaperSize,
    pub pandoc: BackendConfig,
    pub libreoffice: BackendConfig,
    /// Run a backend's provisioning command when the probe fails.
    pub auto_provision: bool,
    /// Treatment of malformed page tokens.
    pub selection_policy: SelectionPolicy,
    /// Parent directory for per-invocation scratch space (default: system temp).
    pub scratch_dir: Option<PathBuf>,
    /// Caller-side deadline applied by the CLI, in seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_render_engine: RenderEngine::Builtin,
            default_pdf_engine: None,
            paper_size: PaperSize::A4,
            pandoc: BackendConfig::new("pandoc"),
            libreoffice: BackendConfig::new("soffice"),
            auto_provision: false,
            selection_policy: SelectionPolicy::Strict,
            scratch_dir: None,
            deadline_secs: None,
        }
    }
}

impl ServiceConfig {
    /// Backend settings for an external engine; `None` for the builtin one.
    pub fn backend(&self, engine: RenderEngine) -> Option<&BackendConfig> {
        match engine {
            RenderEngine::Builtin => None,
            RenderEngine::Pandoc => Some(&self.pandoc),
            RenderEngine::LibreOffice => Some(&self.libreoffice),
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        for (name, backend) in [("pandoc", &self.pandoc), ("libreoffice", &self.libreoffice)] {
            if backend.program.trim().is_empty() {
                return Err(DocOpsError::Config(format!("{name}.program is empty")));
            }
            if let Some(cmd) = &backend.provision
                && cmd.is_empty()
            {
                return Err(DocOpsError::Config(format!("{name}.provision is empty")));
            }
        }
        if self.deadline_secs == Some(0) {
            return Err(DocOpsError::Config("deadline_secs must be positive".into()));
        }
        Ok(())
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data).map_err(|err| {
            DocOpsError::Config(format!("{}: {}", path.display(), err))
        })?;
        config.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration: explicit path, then `$DOCOPS_CONFIG`, then the
    /// per-user config file if it exists, then defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return Self::load(path);
        }
        if let Some(path) = default_config_path()
            && path.is_file()
        {
            return Self::load(path);
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }
}

/// `$XDG_CONFIG_HOME/docops/config.json`, else `~/.config/docops/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => PathBuf::from(std::env::var("HOME").ok()?).join(".config"),
    };
    Some(base.join("docops").join(CONFIG_FILE))
}
