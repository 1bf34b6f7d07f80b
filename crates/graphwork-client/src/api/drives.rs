//! Drives API: site drives, drive items by path, copies and workbook ranges.

use std::fmt;

use futures::Stream;
use graphwork_auth::BearerToken;
use serde_json::Value;

use crate::client::GraphClient;
use crate::error::{HttpError, PaginationError, Result};
use crate::pagination::fetch_all;
use crate::types::{CopyRequest, ItemRef, ParentReference, RangeBody, RangeUpdate, ResourceItem};

/// Query that makes a name collision fail the copy instead of renaming.
const COPY_CONFLICT_FAIL: &str = "@microsoft.graph.conflictBehavior=fail";

/// A rectangular block of cells in a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeTarget {
    /// The data body range of a named table.
    Table(String),
    /// An A1-style address on a worksheet.
    Worksheet { sheet: String, address: String },
}

impl RangeTarget {
    /// Path below the workbook item, e.g. `workbook/tables/Vars/range`.
    pub fn path(&self) -> String {
        match self {
            RangeTarget::Table(name) => format!("workbook/tables/{}/range", name),
            RangeTarget::Worksheet { sheet, address } => {
                format!("workbook/worksheets/{}/range(address='{}')", sheet, address)
            }
        }
    }
}

impl fmt::Display for RangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeTarget::Table(name) => write!(f, "table {}", name),
            RangeTarget::Worksheet { sheet, address } => write!(f, "{}!{}", sheet, address),
        }
    }
}

/// Path-addressed item segment: `root` or `root:/a/b:`.
pub fn item_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "root".to_string()
    } else {
        format!("root:/{}:", trimmed)
    }
}

/// Drives API client.
pub struct DrivesApi {
    client: GraphClient,
}

impl DrivesApi {
    pub(crate) fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Default document library of a SharePoint site.
    pub async fn site_drive(&self, token: &BearerToken, site_id: &str) -> Result<ItemRef> {
        let body = self
            .client
            .get(&format!("sites/{}/drive", site_id), token)
            .await?;
        decode(body)
    }

    /// Look up a drive item by its path from the drive root.
    pub async fn item_by_path(
        &self,
        token: &BearerToken,
        drive_id: &str,
        path: &str,
    ) -> Result<ItemRef> {
        let body = self
            .client
            .get(&format!("drives/{}/{}", drive_id, item_path(path)), token)
            .await?;
        decode(body)
    }

    /// Children of a folder, in server order.
    pub fn children<'a>(
        &'a self,
        token: &'a BearerToken,
        drive_id: &str,
        folder: &str,
    ) -> impl Stream<Item = std::result::Result<ResourceItem, PaginationError>> + 'a {
        let start = format!("drives/{}/{}/children", drive_id, item_path(folder));
        fetch_all(&self.client, token, start)
    }

    /// Children of a folder in a site's default drive.
    pub fn site_children<'a>(
        &'a self,
        token: &'a BearerToken,
        site_id: &str,
        folder: &str,
    ) -> impl Stream<Item = std::result::Result<ResourceItem, PaginationError>> + 'a {
        let start = format!("sites/{}/drive/{}/children", site_id, item_path(folder));
        fetch_all(&self.client, token, start)
    }

    /// Ask the service to copy `item_id` into `folder_id` as `name`.
    ///
    /// The copy runs asynchronously; success means "accepted", not "done".
    pub async fn copy_item(
        &self,
        token: &BearerToken,
        drive_id: &str,
        item_id: &str,
        folder_id: &str,
        name: &str,
    ) -> Result<()> {
        let request = CopyRequest {
            parent_reference: ParentReference {
                drive_id: drive_id.to_string(),
                id: folder_id.to_string(),
            },
            name: name.to_string(),
        };
        let body =
            serde_json::to_value(&request).map_err(|e| HttpError::MalformedBody(e.to_string()))?;
        self.client
            .post(
                &format!("drives/{}/items/{}/copy?{}", drive_id, item_id, COPY_CONFLICT_FAIL),
                token,
                &body,
            )
            .await?;
        Ok(())
    }

    /// Read the cell values of a workbook range.
    pub async fn read_range(
        &self,
        token: &BearerToken,
        drive_id: &str,
        item_id: &str,
        range: &RangeTarget,
    ) -> Result<RangeBody> {
        let body = self
            .client
            .get(
                &format!("{}?$select=values", range_url(drive_id, item_id, range)),
                token,
            )
            .await?;
        decode(body)
    }

    /// Overwrite the cell values of a workbook range.
    pub async fn write_range(
        &self,
        token: &BearerToken,
        drive_id: &str,
        item_id: &str,
        range: &RangeTarget,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        let body = serde_json::to_value(RangeUpdate { values })
            .map_err(|e| HttpError::MalformedBody(e.to_string()))?;
        self.client
            .patch(&range_url(drive_id, item_id, range), token, &body)
            .await?;
        Ok(())
    }
}

fn range_url(drive_id: &str, item_id: &str, range: &RangeTarget) -> String {
    format!("drives/{}/items/{}/{}", drive_id, item_id, range.path())
}

fn decode<T: serde::de::DeserializeOwned + Default>(body: Value) -> Result<T> {
    if body.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(body).map_err(|e| HttpError::MalformedBody(e.to_string()))
}
