//! Copy-a-template-then-transform-its-range workflow.
//!
//! One run is a strictly sequential chain of awaited calls. Each step is its own
//! failure domain; the first failure stops the run and reports the last step
//! that completed. Nothing is retried and nothing is rolled back: a copy that
//! succeeded stays in the destination folder even when a later step fails.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use graphwork_auth::BearerToken;
use serde::Serialize;
use serde_json::Value;

use crate::api::{DrivesApi, RangeTarget};
use crate::client::GraphClient;
use crate::error::{HttpError, WorkflowError, WorkflowFailure};
use crate::transform::{CellTransform, transform_rows};

/// Steps of a copy/transform run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    LocateDrive,
    ListSource,
    ResolveDestination,
    GenerateName,
    Copy,
    Verify,
    ReadRange,
    Transform,
    WriteRange,
}

impl WorkflowStep {
    /// 1-based position in the run.
    pub fn index(self) -> u8 {
        match self {
            WorkflowStep::LocateDrive => 1,
            WorkflowStep::ListSource => 2,
            WorkflowStep::ResolveDestination => 3,
            WorkflowStep::GenerateName => 4,
            WorkflowStep::Copy => 5,
            WorkflowStep::Verify => 6,
            WorkflowStep::ReadRange => 7,
            WorkflowStep::Transform => 8,
            WorkflowStep::WriteRange => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStep::LocateDrive => "locate drive",
            WorkflowStep::ListSource => "list source",
            WorkflowStep::ResolveDestination => "resolve destination",
            WorkflowStep::GenerateName => "generate name",
            WorkflowStep::Copy => "copy",
            WorkflowStep::Verify => "verify",
            WorkflowStep::ReadRange => "read range",
            WorkflowStep::Transform => "transform",
            WorkflowStep::WriteRange => "write range",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one run.
///
/// `destination_item_id` is only set once the copy has been read back.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    pub drive_id: Option<String>,
    pub source_item_id: Option<String>,
    pub source_name: Option<String>,
    pub destination_folder_id: Option<String>,
    pub destination_name: Option<String>,
    pub destination_item_id: Option<String>,
    pub values: Option<Vec<Vec<Value>>>,
}

/// How long to wait for an asynchronous copy to become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyPolicy {
    /// Lookups before giving up; at least one is always made.
    pub attempts: u32,
    /// Pause between lookups.
    pub interval: Duration,
}

impl VerifyPolicy {
    /// Look exactly once.
    pub fn single() -> Self {
        Self {
            attempts: 1,
            interval: Duration::ZERO,
        }
    }

    pub fn polling(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self::single()
    }
}

/// Destination names of the form `<utc-nanoseconds><extension>`.
///
/// Names are strictly increasing for the lifetime of the generator, even when
/// the clock stalls or several runs share it.
#[derive(Debug, Default)]
pub struct NameGenerator {
    last: AtomicI64,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name, keeping the extension of `original` (with its dot).
    pub fn next_name(&self, original: &str) -> String {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_micros().saturating_mul(1000));
        let stamp = match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            }) {
            Ok(previous) | Err(previous) => now.max(previous.saturating_add(1)),
        };
        format!("{}{}", stamp, extension_of(original))
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Where the workflow operates.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// SharePoint site whose default drive holds both folders.
    pub site_id: String,
    /// Range rewritten in the copy.
    pub range: RangeTarget,
    pub verify: VerifyPolicy,
}

impl WorkflowConfig {
    pub fn new(site_id: impl Into<String>, range: RangeTarget) -> Self {
        Self {
            site_id: site_id.into(),
            range,
            verify: VerifyPolicy::default(),
        }
    }

    pub fn with_verify(mut self, verify: VerifyPolicy) -> Self {
        self.verify = verify;
        self
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    /// Id of the new workbook.
    pub item_id: String,
    /// Generated name of the new workbook.
    pub name: String,
    pub source_item_id: String,
    /// Values written back.
    pub values: Vec<Vec<String>>,
}

/// Runs the copy/transform workflow against one site.
pub struct CopyTransformWorkflow {
    client: GraphClient,
    config: WorkflowConfig,
    names: NameGenerator,
}

/// Step bookkeeping for one run.
#[derive(Default)]
struct Run {
    state: WorkflowState,
    last_completed: Option<WorkflowStep>,
}

impl Run {
    fn complete(&mut self, step: WorkflowStep) {
        tracing::info!(step = step.index(), name = %step, "workflow step completed");
        self.last_completed = Some(step);
    }
}

impl CopyTransformWorkflow {
    pub fn new(client: GraphClient, config: WorkflowConfig) -> Self {
        Self {
            client,
            config,
            names: NameGenerator::new(),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Copy the first item of `source_folder` into `destination_folder` under a
    /// fresh name, then rewrite the configured range of the copy with `rule`.
    pub async fn run_copy_transform(
        &self,
        token: &BearerToken,
        source_folder: &str,
        destination_folder: &str,
        rule: &dyn CellTransform,
    ) -> Result<WorkflowOutcome, WorkflowFailure> {
        let mut run = Run::default();
        match self
            .execute(&mut run, token, source_folder, destination_folder, rule)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                tracing::warn!(
                    last_completed = ?run.last_completed,
                    error = %error,
                    "workflow failed"
                );
                Err(WorkflowFailure {
                    last_completed: run.last_completed,
                    state: run.state,
                    error,
                })
            }
        }
    }

    async fn execute(
        &self,
        run: &mut Run,
        token: &BearerToken,
        source_folder: &str,
        destination_folder: &str,
        rule: &dyn CellTransform,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let drives = self.client.drives();
        let site_id = &self.config.site_id;

        // 1. Locate drive
        let drive = drives
            .site_drive(token, site_id)
            .await
            .map_err(|e| not_found_or(e, WorkflowStep::LocateDrive, || {
                WorkflowError::DriveNotFound {
                    site_id: site_id.clone(),
                }
            }))?;
        let drive_id = drive.id.ok_or_else(|| WorkflowError::DriveNotFound {
            site_id: site_id.clone(),
        })?;
        run.state.drive_id = Some(drive_id.clone());
        run.complete(WorkflowStep::LocateDrive);

        // 2. List source
        let (source_id, source_name) =
            first_child(&drives, token, &drive_id, source_folder).await?;
        run.state.source_item_id = Some(source_id.clone());
        run.state.source_name = Some(source_name.clone());
        run.complete(WorkflowStep::ListSource);

        // 3. Resolve destination
        let folder = drives
            .item_by_path(token, &drive_id, destination_folder)
            .await
            .map_err(|e| not_found_or(e, WorkflowStep::ResolveDestination, || {
                WorkflowError::FolderNotFound {
                    path: destination_folder.to_string(),
                }
            }))?;
        let folder_id = folder.id.ok_or_else(|| WorkflowError::FolderNotFound {
            path: destination_folder.to_string(),
        })?;
        run.state.destination_folder_id = Some(folder_id.clone());
        run.complete(WorkflowStep::ResolveDestination);

        // 4. Generate name
        let name = self.names.next_name(&source_name);
        run.state.destination_name = Some(name.clone());
        run.complete(WorkflowStep::GenerateName);

        // 5. Copy
        drives
            .copy_item(token, &drive_id, &source_id, &folder_id, &name)
            .await
            .map_err(|e| match e {
                HttpError::Rejected { status, .. } => WorkflowError::CopyRejected { status },
                other => WorkflowError::Request {
                    step: WorkflowStep::Copy,
                    source: other,
                },
            })?;
        run.complete(WorkflowStep::Copy);

        // 6. Verify
        let copy_path = format!("{}/{}", destination_folder.trim_end_matches('/'), name);
        let item_id = self.verify_copy(&drives, token, &drive_id, &copy_path).await?;
        run.state.destination_item_id = Some(item_id.clone());
        run.complete(WorkflowStep::Verify);

        // 7. Read range
        let range = &self.config.range;
        let body = drives
            .read_range(token, &drive_id, &item_id, range)
            .await
            .map_err(|e| match e {
                HttpError::Rejected { status, .. } => WorkflowError::RangeUnreadable {
                    reason: format!("{} returned {}", range, status),
                },
                HttpError::MalformedBody(reason) => WorkflowError::RangeUnreadable { reason },
                other => WorkflowError::Request {
                    step: WorkflowStep::ReadRange,
                    source: other,
                },
            })?;
        let values = body.values.ok_or_else(|| WorkflowError::RangeUnreadable {
            reason: format!("{} has no values", range),
        })?;
        check_rectangular(&values)?;
        run.state.values = Some(values.clone());
        run.complete(WorkflowStep::ReadRange);

        // 8. Transform
        let transformed = transform_rows(&values, rule);
        run.complete(WorkflowStep::Transform);

        // 9. Write range
        drives
            .write_range(token, &drive_id, &item_id, range, transformed.clone())
            .await
            .map_err(|e| match e {
                HttpError::Rejected { status, .. } => WorkflowError::WriteRejected { status },
                other => WorkflowError::Request {
                    step: WorkflowStep::WriteRange,
                    source: other,
                },
            })?;
        run.complete(WorkflowStep::WriteRange);

        Ok(WorkflowOutcome {
            item_id,
            name,
            source_item_id: source_id,
            values: transformed,
        })
    }

    async fn verify_copy(
        &self,
        drives: &DrivesApi,
        token: &BearerToken,
        drive_id: &str,
        path: &str,
    ) -> Result<String, WorkflowError> {
        let policy = self.config.verify;
        let attempts = policy.attempts.max(1);

        for attempt in 1..=attempts {
            match drives.item_by_path(token, drive_id, path).await {
                Ok(item) => {
                    if let Some(id) = item.id {
                        return Ok(id);
                    }
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(WorkflowError::Request {
                        step: WorkflowStep::Verify,
                        source: e,
                    });
                }
            }

            if attempt < attempts {
                tracing::debug!(attempt, path, "copy not visible yet");
                self.client
                    .pause(policy.interval)
                    .await
                    .map_err(|source| WorkflowError::Request {
                        step: WorkflowStep::Verify,
                        source,
                    })?;
            }
        }

        Err(WorkflowError::CopyNotVisible {
            path: path.to_string(),
        })
    }
}

/// First child of `folder` in server order, as `(id, name)`.
async fn first_child(
    drives: &DrivesApi,
    token: &BearerToken,
    drive_id: &str,
    folder: &str,
) -> Result<(String, String), WorkflowError> {
    let no_template = || WorkflowError::NoTemplateFound {
        path: folder.to_string(),
    };

    let stream = drives.children(token, drive_id, folder);
    futures::pin_mut!(stream);

    let first = match stream.next().await {
        None => return Err(no_template()),
        Some(Err(e)) => {
            if e.http().is_some_and(HttpError::is_not_found) {
                return Err(no_template());
            }
            return Err(WorkflowError::Listing(e));
        }
        Some(Ok(item)) => item,
    };

    let id = first.id().ok_or_else(no_template)?.to_string();
    let name = first.name().unwrap_or_default().to_string();
    Ok((id, name))
}

fn not_found_or(
    error: HttpError,
    step: WorkflowStep,
    not_found: impl FnOnce() -> WorkflowError,
) -> WorkflowError {
    if error.is_not_found() {
        not_found()
    } else {
        WorkflowError::Request {
            step,
            source: error,
        }
    }
}

fn check_rectangular(values: &[Vec<Value>]) -> Result<(), WorkflowError> {
    let Some(width) = values.first().map(Vec::len) else {
        return Ok(());
    };
    match values.iter().position(|row| row.len() != width) {
        Some(row) => Err(WorkflowError::RangeUnreadable {
            reason: format!("row {} has {} cells, expected {}", row, values[row].len(), width),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_indices_follow_order() {
        let steps = [
            WorkflowStep::LocateDrive,
            WorkflowStep::ListSource,
            WorkflowStep::ResolveDestination,
            WorkflowStep::GenerateName,
            WorkflowStep::Copy,
            WorkflowStep::Verify,
            WorkflowStep::ReadRange,
            WorkflowStep::Transform,
            WorkflowStep::WriteRange,
        ];
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.index() as usize, i + 1);
        }
        assert_eq!(WorkflowStep::ReadRange.to_string(), "read range");
    }

    #[test]
    fn test_names_keep_extension() {
        let names = NameGenerator::new();
        assert!(names.next_name("Template.xlsx").ends_with(".xlsx"));
        assert!(!names.next_name("README").contains('.'));
    }

    #[test]
    fn test_names_strictly_increase() {
        let names = NameGenerator::new();
        let stamps: Vec<i64> = (0..100)
            .map(|_| {
                names
                    .next_name("a.xlsx")
                    .trim_end_matches(".xlsx")
                    .parse()
                    .unwrap()
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rectangular_check() {
        assert!(check_rectangular(&[]).is_ok());
        assert!(check_rectangular(&[vec![json!(1), json!(2)], vec![json!(3), json!(4)]]).is_ok());

        let err = check_rectangular(&[vec![json!(1), json!(2)], vec![json!(3)]]).unwrap_err();
        assert!(matches!(err, WorkflowError::RangeUnreadable { .. }));
    }

    #[test]
    fn test_verify_policy_floor() {
        assert_eq!(VerifyPolicy::polling(0, Duration::from_secs(1)).attempts, 1);
        assert_eq!(VerifyPolicy::default().attempts, 1);
    }
}
