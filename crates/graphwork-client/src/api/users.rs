//! Users API.

use futures::Stream;
use graphwork_auth::BearerToken;

use crate::client::GraphClient;
use crate::error::{HttpError, PaginationError, Result};
use crate::pagination::fetch_all;
use crate::types::{ResourceItem, UserProfile};

/// Users API client.
pub struct UsersApi {
    client: GraphClient,
}

impl UsersApi {
    pub(crate) fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Profile of the signed-in user. Needs a delegated token.
    pub async fn me(&self, token: &BearerToken) -> Result<UserProfile> {
        let body = self.client.get("me", token).await?;
        serde_json::from_value(body).map_err(|e| HttpError::MalformedBody(e.to_string()))
    }

    /// Every user in the tenant, `page_size` per request.
    pub fn list<'a>(
        &'a self,
        token: &'a BearerToken,
        page_size: u32,
    ) -> impl Stream<Item = std::result::Result<ResourceItem, PaginationError>> + 'a {
        fetch_all(&self.client, token, format!("users?$top={}", page_size.max(1)))
    }
}
