//! High-level pipeline: download → reconcile → generate → upload → clean.
//!
//! One invocation handles one object-uploaded trigger. The stages run
//! strictly in sequence, each returning a typed result or typed error;
//! concurrency exists only inside the download and upload stages. Recoverable
//! per-file failures are absorbed at the stage boundary and never reach this
//! level; fatal stage errors abort the remaining stages and surface through
//! [`Pipeline::run`].
//!
//! The invocation-facing envelope from [`Pipeline::handle`] is a fixed
//! success response regardless of the pipeline outcome. Callers observe
//! success or failure only through object-store side effects and logs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::assemble::{self, AssembleError, FontGenerator};
use crate::clean::{self, CleanError};
use crate::codepoints::{self, CodepointError};
use crate::download::{self, DownloadError};
use crate::event::{self, Ineligible, TriggerEvent};
use crate::store::ObjectStore;
use crate::upload::{self, UploadError};

/// Static message of the invocation envelope.
pub const INVOCATION_MESSAGE: &str = "Webfont generation invoked";

/// Fixed envelope returned to the invocation runtime.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
}

/// What one invocation did.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The trigger was not an eligible icon upload; nothing happened.
    Skipped(Ineligible),
    /// A bundle was generated and published.
    Published(BundleReport),
}

/// Summary of a published bundle, for logs and tests.
#[derive(Debug)]
pub struct BundleReport {
    pub set_name: String,
    pub icons_downloaded: usize,
    pub uploaded_keys: Vec<String>,
    /// The refreshed icon-name → codepoint-string map that was published.
    pub codepoints: BTreeMap<String, String>,
    pub files_removed: usize,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Codepoints(#[from] CodepointError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Clean(#[from] CleanError),
}

/// The webfont pipeline with its explicitly injected collaborators.
///
/// The pipeline exclusively owns `work_dir` for the duration of one
/// invocation; concurrent invocations must not share a working area.
pub struct Pipeline<S, G> {
    store: S,
    generator: G,
    work_dir: PathBuf,
}

impl<S: ObjectStore, G: FontGenerator> Pipeline<S, G> {
    pub fn new(store: S, generator: G, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            generator,
            work_dir: work_dir.into(),
        }
    }

    /// Run one invocation end to end.
    ///
    /// Ineligible triggers resolve to `Ok(Skipped)` with no store access at
    /// all; fatal stage failures abort and propagate.
    pub async fn run(&self, trigger: &TriggerEvent) -> Result<PipelineOutcome, PipelineError> {
        let request = match event::validate(trigger) {
            Ok(request) => request,
            Err(reason) => {
                info!(%reason, "skipping ineligible trigger");
                return Ok(PipelineOutcome::Skipped(reason));
            }
        };
        info!(
            bucket = %request.bucket,
            set = %request.name,
            key = %request.key,
            "starting webfont pipeline"
        );

        let set = download::download_set(&self.store, &request, &self.work_dir).await?;
        let assigned = codepoints::load_and_reconcile(set.codepoint_map.as_deref(), &set.icons)?;
        let published_map =
            assemble::assemble(&self.generator, &request, &set, assigned, &self.work_dir).await?;
        let uploaded_keys = upload::upload_bundle(&self.store, &request, &self.work_dir).await?;
        let files_removed = clean::clear_working_area(&self.work_dir)?;

        info!(
            set = %request.name,
            uploaded = uploaded_keys.len(),
            "webfont pipeline finished"
        );
        Ok(PipelineOutcome::Published(BundleReport {
            set_name: request.name,
            icons_downloaded: set.icons.len(),
            uploaded_keys,
            codepoints: published_map,
            files_removed,
        }))
    }

    /// Run one invocation and produce the runtime-facing envelope.
    ///
    /// The envelope does not encode pipeline failure; failures are logged
    /// here and otherwise visible only through store side effects.
    pub async fn handle(&self, trigger: &TriggerEvent) -> InvocationResponse {
        if let Err(e) = self.run(trigger).await {
            error!(error = %e, "webfont pipeline failed");
        }
        InvocationResponse {
            status_code: 200,
            message: INVOCATION_MESSAGE.to_string(),
        }
    }
}
