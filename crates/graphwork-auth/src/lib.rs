//! OAuth 2.0 credential flows against Microsoft Entra ID.
//!
//! Produces audience-bound bearer tokens for the three trust models graphwork
//! supports. The flows are a closed set, selected by constructing the matching
//! [`Credential`] variant:
//!
//! - [`Credential::Application`]: client credentials, no user involved
//! - [`Credential::Delegated`]: interactive user sign-in (authorization code + PKCE)
//! - [`Credential::DelegatedExchange`]: on-behalf-of exchange of an upstream user token
//!
//! # Components
//!
//! - [`scope`]: scope parsing and the audience each scope resolves to
//! - [`token`]: [`BearerToken`], the audience-bound result of every flow
//! - [`endpoint`]: the identity provider's token endpoint
//! - [`credential`]: flow selection and acquisition
//! - [`pkce`]: PKCE challenge, state and authorization URL helpers
//! - [`prompt`]: the interactive sign-in seam used by the delegated flow

pub mod credential;
pub mod endpoint;
pub mod error;
pub mod pkce;
pub mod prompt;
pub mod scope;
pub mod token;

pub use credential::{ClientSecret, Credential, FlowKind};
pub use endpoint::{DEFAULT_AUTHORITY, TokenEndpoint};
pub use error::{AuthError, Result};
pub use pkce::PkceChallenge;
pub use prompt::{AuthorizationCode, AuthorizationRequest, InteractivePrompt, PromptError};
pub use scope::{Audience, Scope};
pub use token::BearerToken;
