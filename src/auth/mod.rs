//! Authentication contract core.

pub mod account;
pub mod attempt;
pub mod client;
pub mod context;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod flow;
pub mod mapper;
pub mod messages;
pub mod module;
pub mod params;
pub mod policy;
pub mod server;
pub mod session;
pub mod strategy;

pub use client::{AuthClient, ClientConfig};
pub use context::AuthContext;
pub use error::{AuthError, TransportError, TransportKind};
pub use factory::{make_for_record, make_module};
pub use flow::LoginFlow;
pub use mapper::map_response;
pub use messages::{user_message, AuthFlow};
pub use module::{AuthModule, AuthenticationStatus, LoginOutcome, LoginState, LoginStep};
pub use params::{ExternalCompletion, LoginParameters, StrategyRecord};
pub use policy::{PasswordPolicy, PolicyValidation};
pub use server::{fetch_server_info, ServerInfo};
pub use strategy::{AuthStrategy, StrategyKind};
