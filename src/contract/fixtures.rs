//! Canned server responses loaded from JSON files.
//!
//! Each file describes one exchange:
//!
//! ```json
//! {
//!   "request": { "method": "POST", "path": "/auth/local/signin", "body": { ... } },
//!   "response": { "status": 200, "headers": { "content-type": "application/json" }, "body": { ... } }
//! }
//! ```
//!
//! Fixtures are keyed by `"<METHOD> <PATH>"`; the file name is only a label.
//! Bodies keep the exact text written in the file, key order and nulls
//! included, so a fixture is served byte for byte.

use super::performer::{HttpRequest, HttpResponse};
use reqwest::Method;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid fixture {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid method {method:?} in {path}")]
    Method { path: PathBuf, method: String },
    #[error("duplicate fixture for {key} in {path}")]
    Duplicate { path: PathBuf, key: String },
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    request: RequestFixture,
    response: ResponseFixture,
}

#[derive(Debug, Deserialize)]
struct RequestFixture {
    method: String,
    path: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
struct ResponseFixture {
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<Box<RawValue>>,
}

#[derive(Clone, Debug)]
pub struct Fixture {
    pub name: String,
    pub request: HttpRequest,
    pub response: HttpResponse,
}

/// Fixtures keyed by `"<METHOD> <PATH>"`.
#[derive(Clone, Debug, Default)]
pub struct FixtureSet {
    fixtures: BTreeMap<String, Fixture>,
}

impl FixtureSet {
    /// Loads every `*.json` file in `dir`, in file name order.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] if the directory or a file cannot be read, a
    /// file is not a valid fixture, or two files describe the same request.
    pub fn load_dir(dir: &Path) -> Result<Self, FixtureError> {
        let io = |source: std::io::Error| FixtureError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io)? {
            let path = entry.map_err(io)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut set = Self::default();
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|source| FixtureError::Io {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let fixture = Self::parse(&name, &text).map_err(|err| match err {
                ParseFailure::Json(source) => FixtureError::Parse {
                    path: path.clone(),
                    source,
                },
                ParseFailure::Method(method) => FixtureError::Method {
                    path: path.clone(),
                    method,
                },
            })?;

            let key = fixture.request.key();
            if set.fixtures.contains_key(&key) {
                return Err(FixtureError::Duplicate { path, key });
            }
            debug!("loaded fixture {key} from {}", path.display());
            set.fixtures.insert(key, fixture);
        }

        Ok(set)
    }

    /// Adds a fixture, replacing any with the same key.
    pub fn insert(&mut self, fixture: Fixture) {
        self.fixtures.insert(fixture.request.key(), fixture);
    }

    #[must_use]
    pub fn get(&self, method: &Method, path: &str) -> Option<&Fixture> {
        self.fixtures.get(&fixture_key(method, path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    fn parse(name: &str, text: &str) -> Result<Fixture, ParseFailure> {
        let file: FixtureFile = serde_json::from_str(text).map_err(ParseFailure::Json)?;

        let method = Method::from_bytes(file.request.method.trim().to_uppercase().as_bytes())
            .map_err(|_| ParseFailure::Method(file.request.method.clone()))?;

        Ok(Fixture {
            name: name.to_string(),
            request: HttpRequest {
                method,
                path: file.request.path,
                headers: file.request.headers,
                body: file.request.body.map(raw_bytes),
            },
            response: HttpResponse {
                status: file.response.status,
                headers: file.response.headers,
                body: file.response.body.map(raw_bytes),
            },
        })
    }
}

fn raw_bytes(body: Box<RawValue>) -> Vec<u8> {
    body.get().as_bytes().to_vec()
}

#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    Method(String),
}

/// `"<METHOD> <PATH>"`, ignoring any query string.
#[must_use]
pub fn fixture_key(method: &Method, path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    format!("{} {}", method.as_str(), path)
}
