//! Contract equivalence between two HTTP implementations of the MAGE API.

pub mod canonical;
pub mod fixtures;
pub mod harness;
pub mod performer;

pub use canonical::{canonical_string, canonicalize};
pub use fixtures::{Fixture, FixtureError, FixtureSet};
pub use harness::{ContractHarness, ContractMismatch, ContractReport, MismatchKind};
pub use performer::{FixturePerformer, HttpPerformer, HttpRequest, HttpResponse, PerformError, ReqwestPerformer};
