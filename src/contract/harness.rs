//! Runs the same requests through two performers and reports where they differ.
//!
//! Two responses are equivalent when their statuses match and their bodies
//! canonicalize to the same bytes. Bodies that are not JSON on both sides are
//! compared raw.

use super::{
    canonical::{canonical_string, canonicalize},
    fixtures::FixtureSet,
    performer::{HttpPerformer, HttpRequest, HttpResponse},
};
use std::{fmt, sync::Arc};
use tracing::{info, instrument, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MismatchKind {
    Status { legacy: u16, modern: u16 },
    Body {
        legacy: Option<String>,
        modern: Option<String>,
    },
    /// One side failed to produce a response at all.
    Failed { performer: String, error: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractMismatch {
    pub key: String,
    pub kind: MismatchKind,
}

impl fmt::Display for ContractMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MismatchKind::Status { legacy, modern } => {
                write!(f, "{}: status {legacy} != {modern}", self.key)
            }
            MismatchKind::Body { legacy, modern } => write!(
                f,
                "{}: body {} != {}",
                self.key,
                legacy.as_deref().unwrap_or("<none>"),
                modern.as_deref().unwrap_or("<none>")
            ),
            MismatchKind::Failed { performer, error } => {
                write!(f, "{}: {performer} failed: {error}", self.key)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractReport {
    pub checked: usize,
    pub mismatches: Vec<ContractMismatch>,
}

impl ContractReport {
    #[must_use]
    pub fn is_equivalent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

pub struct ContractHarness {
    legacy: Arc<dyn HttpPerformer>,
    modern: Arc<dyn HttpPerformer>,
}

impl ContractHarness {
    #[must_use]
    pub fn new(legacy: Arc<dyn HttpPerformer>, modern: Arc<dyn HttpPerformer>) -> Self {
        Self { legacy, modern }
    }

    /// Sends every request to both performers, in order.
    #[instrument(skip_all, fields(legacy = %self.legacy.name(), modern = %self.modern.name()))]
    pub async fn compare(&self, requests: &[HttpRequest]) -> ContractReport {
        let mut report = ContractReport::default();

        for request in requests {
            report.checked += 1;
            let key = request.key();

            let (legacy, modern) =
                tokio::join!(self.legacy.perform(request), self.modern.perform(request));

            let kind = match (legacy, modern) {
                (Ok(legacy), Ok(modern)) => compare_responses(&legacy, &modern),
                (Err(err), _) => Some(MismatchKind::Failed {
                    performer: self.legacy.name().to_string(),
                    error: err.to_string(),
                }),
                (_, Err(err)) => Some(MismatchKind::Failed {
                    performer: self.modern.name().to_string(),
                    error: err.to_string(),
                }),
            };

            if let Some(kind) = kind {
                let mismatch = ContractMismatch { key, kind };
                warn!("{mismatch}");
                report.mismatches.push(mismatch);
            }
        }

        info!(
            "{} requests checked, {} mismatches",
            report.checked,
            report.mismatches.len()
        );
        report
    }

    /// Replays the request of every fixture in `fixtures`.
    pub async fn compare_fixtures(&self, fixtures: &FixtureSet) -> ContractReport {
        let requests: Vec<HttpRequest> = fixtures.iter().map(|fixture| fixture.request.clone()).collect();
        self.compare(&requests).await
    }
}

/// `None` when the two responses are equivalent.
#[must_use]
pub fn compare_responses(legacy: &HttpResponse, modern: &HttpResponse) -> Option<MismatchKind> {
    if legacy.status != modern.status {
        return Some(MismatchKind::Status {
            legacy: legacy.status,
            modern: modern.status,
        });
    }

    let left = canonicalize(legacy.body.as_deref());
    let right = canonicalize(modern.body.as_deref());
    let same = match (&left, &right) {
        (None, None) => raw(legacy) == raw(modern),
        _ => left == right,
    };

    (!same).then(|| MismatchKind::Body {
        legacy: describe(legacy),
        modern: describe(modern),
    })
}

fn raw(response: &HttpResponse) -> &[u8] {
    response.body.as_deref().unwrap_or_default()
}

fn describe(response: &HttpResponse) -> Option<String> {
    let body = response.body.as_deref();
    canonical_string(body).or_else(|| body.map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
}
