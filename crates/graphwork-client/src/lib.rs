//! Microsoft Graph client for graphwork.
//!
//! Every call carries an explicit [`BearerToken`](graphwork_auth::BearerToken);
//! the client checks that the token's audience matches its own before sending.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use graphwork_client::GraphClient;
//!
//! # async fn example(token: graphwork_auth::BearerToken) -> Result<(), Box<dyn std::error::Error>> {
//! let client = GraphClient::builder().build()?;
//! let users = client.users();
//! let stream = users.list(&token, 100);
//! futures::pin_mut!(stream);
//! while let Some(user) = stream.next().await {
//!     println!("{:?}", user?.id());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod pagination;
pub mod transform;
pub mod types;
pub mod workflow;

pub use api::{DrivesApi, RangeTarget, UsersApi};
pub use client::{ClientBuilder, GRAPH_BASE_URL, GraphClient};
pub use error::{HttpError, PaginationError, Result, WorkflowError, WorkflowFailure};
pub use pagination::{collect_all, fetch_all};
pub use transform::{CellTransform, Replace, cell_text, transform_rows};
pub use types::{CollectionResult, ItemRef, NEXT_LINK_FIELD, Page, ResourceItem, UserProfile};
pub use workflow::{
    CopyTransformWorkflow, NameGenerator, VerifyPolicy, WorkflowConfig, WorkflowOutcome,
    WorkflowState, WorkflowStep,
};
