//! Publish pipeline: locate feature results, stage sources into the
//! artifact store, render, and record the build.
//!
//! The pipeline always resolves to exactly one [`BuildOutcome`]. A
//! documentation directory that cannot be created degrades the build to
//! `Unstable` rather than failing it; everything after that point is
//! either `Success` or `Failure`.

use std::{path::PathBuf, sync::Arc};

use metrics::counter;
use time::OffsetDateTime;
use tracing::{error, info};
use vivadoc_features::find_and_parse;

use crate::application::{
    locator,
    render::{JobOutcome, RenderCoordinator, RenderJob, RenderRequest},
};
use crate::domain::build::{BuildOutcome, BuildRecord};
use crate::infra::{assets, store::BuildStore};

/// Identity of the build being published.
#[derive(Debug, Clone)]
pub struct PublishContext {
    pub workspace: PathBuf,
    pub features_dir: Option<String>,
    pub build_number: u32,
    pub build_time: OffsetDateTime,
    pub display_name: String,
}

pub struct PublishService {
    coordinator: RenderCoordinator,
    store: BuildStore,
}

impl PublishService {
    pub fn new(coordinator: RenderCoordinator, store: BuildStore) -> Self {
        Self { coordinator, store }
    }

    /// Run the full publish pipeline for one build.
    pub async fn publish(&self, context: &PublishContext, request: RenderRequest) -> BuildOutcome {
        let outcome = self.run(context, request).await;
        counter!("vivadoc_publish_total", "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    async fn run(&self, context: &PublishContext, request: RenderRequest) -> BuildOutcome {
        info!(
            target = "application::publish",
            build = %context.display_name,
            build_number = context.build_number,
            format = %request.format,
            title = %request.title,
            toc = ?request.toc,
            numbered = request.numbered,
            sect_anchors = request.sect_anchors,
            hide_features_section = request.layout.hide_features_section,
            hide_summary = request.layout.hide_summary,
            hide_scenario_keyword = request.layout.hide_scenario_keyword,
            hide_step_time = request.layout.hide_step_time,
            hide_tags = request.layout.hide_tags,
            "generating living documentation"
        );

        let docs_dir = match self.store.prepare_docs_dir(context.build_number).await {
            Ok(docs_dir) => docs_dir,
            Err(err) => {
                error!(
                    target = "application::publish",
                    build_number = context.build_number,
                    path = %self.store.docs_dir(context.build_number).display(),
                    error = %err,
                    "could not create documentation directory; marking the build unstable"
                );
                return BuildOutcome::Unstable;
            }
        };

        let features_path = locator::locate(&context.workspace, context.features_dir.as_deref());

        if let Err(err) = self
            .store
            .copy_feature_sources(&features_path, context.build_number)
            .await
        {
            error!(
                target = "application::publish",
                build_number = context.build_number,
                features_path = %features_path.display(),
                error = %err,
                "could not stage feature sources into the documentation directory"
            );
            return BuildOutcome::Failure;
        }
        if let Err(err) = self
            .store
            .seed_default_theme(context.build_number, assets::default_theme_css())
            .await
        {
            error!(
                target = "application::publish",
                build_number = context.build_number,
                error = %err,
                "could not seed the default theme"
            );
            return BuildOutcome::Failure;
        }

        let features = find_and_parse(&features_path);
        if features.is_empty() {
            info!(
                target = "application::publish",
                features_path = %features_path.display(),
                "no features found; nothing to publish"
            );
            return BuildOutcome::Success;
        }

        let job = RenderJob {
            features: Arc::new(features),
            request: request.clone(),
            output_dir: docs_dir,
        };
        match self.coordinator.execute(job).await {
            JobOutcome::Succeeded { backends } => {
                let record = BuildRecord {
                    format: request.format,
                    build_number: context.build_number,
                    build_time: context.build_time,
                };
                if let Err(err) = self.store.save_record(&record).await {
                    error!(
                        target = "application::publish",
                        build_number = context.build_number,
                        error = %err,
                        "documentation rendered but the build record could not be persisted"
                    );
                    return BuildOutcome::Failure;
                }
                info!(
                    target = "application::publish",
                    build = %context.display_name,
                    build_number = context.build_number,
                    backends = backends.len(),
                    "living documentation published"
                );
                BuildOutcome::Success
            }
            JobOutcome::TimedOut { waited } => {
                error!(
                    target = "application::publish",
                    build_number = context.build_number,
                    waited_secs = waited.as_secs(),
                    "living documentation generation is taking too long; halting it to not throttle the executor"
                );
                BuildOutcome::Failure
            }
            JobOutcome::Failed { message } => {
                error!(
                    target = "application::publish",
                    build_number = context.build_number,
                    error = %message,
                    "living documentation generation failed"
                );
                BuildOutcome::Failure
            }
        }
    }
}
