// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection parsing for split requests.
//
// Input is a comma-separated list of 1-based page numbers or inclusive
// ascending ranges ("1, 3, 5-7"). Order and duplicates are preserved.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DocOpsError, Result};

/// How malformed tokens in a page list are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Any malformed token rejects the whole selection.
    #[default]
    Strict,
    /// Malformed tokens are dropped; well-formed ones are kept.
    Lenient,
}

/// Ordered sequence of 1-based page indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSelection {
    pages: Vec<u32>,
}

impl PageSelection {
    /// Build a selection from already-parsed indices.
    pub fn new(pages: Vec<u32>) -> Result<Self> {
        if pages.is_empty() {
            return Err(DocOpsError::Validation("no pages selected".into()));
        }
        Ok(Self { pages })
    }

    /// Parse user input under the given policy.
    pub fn parse(input: &str, policy: SelectionPolicy) -> Result<Self> {
        let mut pages = Vec::new();

        for raw in input.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }
            match parse_token(token) {
                Some(expanded) => pages.extend(expanded),
                None if policy == SelectionPolicy::Lenient => {
                    debug!(token, "dropping malformed page token");
                }
                None => return Err(DocOpsError::InvalidPageToken(token.to_string())),
            }
        }

        Self::new(pages)
    }

    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Every index must lie within `[1, page_count]`.
    pub fn validate(&self, page_count: u32) -> Result<()> {
        match self.pages.iter().find(|&&p| p == 0 || p > page_count) {
            Some(&page) => Err(DocOpsError::PageOutOfRange {
                page,
                count: page_count,
            }),
            None => Ok(()),
        }
    }
}

/// Widest range a single token may expand to.
const MAX_RANGE_SPAN: u32 = 100_000;

/// A single number, or `a-b` with `a <= b`.
fn parse_token(token: &str) -> Option<Vec<u32>> {
    if let Some((start, end)) = token.split_once('-') {
        let start = parse_number(start.trim())?;
        let end = parse_number(end.trim())?;
        if start > end || end - start >= MAX_RANGE_SPAN {
            return None;
        }
        return Some((start..=end).collect());
    }
    parse_number(token).map(|page| vec![page])
}

fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
