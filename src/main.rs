use std::{future::IntoFuture, process, sync::Arc};

use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vivadoc::{
    application::{
        error::AppError,
        publish::{PublishContext, PublishService},
        render::{
            AsciidoctorCli, LayoutToggles, PassOrder, RenderCoordinator, RenderRequest, WaitBudgets,
        },
    },
    config,
    domain::build::{BuildOutcome, DocsFormat, TocPlacement},
    infra::{error::InfraError, http, store::BuildStore, telemetry},
};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => process::exit(code),
        Err(error) => {
            report_application_error(&error);
            process::exit(1);
        }
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<i32, AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Publish(args) => run_publish(settings, *args).await,
        config::Command::Serve(_) => {
            run_serve(settings).await?;
            Ok(0)
        }
    }
}

async fn run_publish(
    settings: config::Settings,
    args: config::PublishArgs,
) -> Result<i32, AppError> {
    let store = BuildStore::new(settings.store.docs_root.clone())
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    let engine = Arc::new(AsciidoctorCli::new(settings.render.converter_cli_path.clone()));
    let coordinator = RenderCoordinator::new(
        engine,
        settings.render.workers.get() as usize,
        pass_order(settings.render.pass_order),
        WaitBudgets {
            html_only: settings.render.html_wait,
            with_pdf: settings.render.pdf_wait,
        },
    );
    let service = PublishService::new(coordinator, store);

    let context = PublishContext {
        workspace: args.workspace.clone(),
        features_dir: args.features_dir.clone(),
        build_number: args.build_number,
        build_time: OffsetDateTime::now_utc(),
        display_name: args
            .display_name
            .clone()
            .unwrap_or_else(|| format!("build #{}", args.build_number)),
    };
    let request = render_request(&args);

    let outcome = service.publish(&context, request).await;
    info!(
        target = "vivadoc::publish",
        build_number = args.build_number,
        outcome = outcome.as_str(),
        "publish finished"
    );
    Ok(outcome.exit_code())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = BuildStore::new(settings.store.docs_root.clone())
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    let router = http::build_router(http::DocsState {
        store: Arc::new(store),
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "vivadoc::serve",
        addr = %settings.server.addr,
        docs_root = %settings.store.docs_root.display(),
        "serving living documentation"
    );

    let graceful = settings.server.graceful_shutdown;
    let (drained_tx, drained_rx) = tokio::sync::oneshot::channel();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal(graceful).await;
            let _ = drained_tx.send(());
        })
        .into_future();

    // Graceful shutdown drains in-flight connections but only for the
    // configured grace period; stragglers are dropped when it elapses.
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = drain_deadline(drained_rx, graceful) => {
            error!(
                target = "vivadoc::serve",
                grace_secs = graceful.as_secs(),
                "graceful shutdown period elapsed; dropping remaining connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal(graceful: std::time::Duration) {
    if tokio::signal::ctrl_c().await.is_err() {
        error!(target = "vivadoc::serve", "failed to listen for shutdown signal");
        return;
    }
    info!(
        target = "vivadoc::serve",
        grace_secs = graceful.as_secs(),
        "shutdown signal received"
    );
}

/// Resolves one grace period after the shutdown signal has fired;
/// pends forever if the server finishes on its own first.
async fn drain_deadline(
    signalled: tokio::sync::oneshot::Receiver<()>,
    graceful: std::time::Duration,
) {
    if signalled.await.is_ok() {
        tokio::time::sleep(graceful).await;
    } else {
        std::future::pending::<()>().await;
    }
}

fn render_request(args: &config::PublishArgs) -> RenderRequest {
    let mut request = RenderRequest::new(docs_format(args.format));
    if let Some(title) = args.title.as_ref() {
        request.title = title.clone();
    }
    if let Some(toc) = args.toc {
        request.toc = toc_placement(toc);
    }
    if let Some(numbered) = args.numbered {
        request.numbered = numbered;
    }
    if let Some(sect_anchors) = args.sect_anchors {
        request.sect_anchors = sect_anchors;
    }
    request.layout = LayoutToggles {
        hide_features_section: args.hide_features_section,
        hide_summary: args.hide_summary,
        hide_scenario_keyword: args.hide_scenario_keyword,
        hide_step_time: args.hide_step_time,
        hide_tags: args.hide_tags,
    };
    request
}

fn docs_format(arg: config::FormatArg) -> DocsFormat {
    match arg {
        config::FormatArg::Html => DocsFormat::Html,
        config::FormatArg::Pdf => DocsFormat::Pdf,
        config::FormatArg::All => DocsFormat::All,
    }
}

fn toc_placement(arg: config::TocArg) -> TocPlacement {
    match arg {
        config::TocArg::Left => TocPlacement::Left,
        config::TocArg::Right => TocPlacement::Right,
        config::TocArg::Center => TocPlacement::Center,
    }
}

fn pass_order(setting: config::PassOrderSetting) -> PassOrder {
    match setting {
        config::PassOrderSetting::HtmlFirst => PassOrder::HtmlFirst,
        config::PassOrderSetting::PdfFirst => PassOrder::PdfFirst,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::drain_deadline;

    #[tokio::test(start_paused = true)]
    async fn drain_deadline_fires_one_grace_period_after_the_signal() {
        let (tx, rx) = oneshot::channel();
        let deadline = tokio::spawn(drain_deadline(rx, Duration::from_secs(30)));

        // Time passing before the signal does not count against the grace.
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(!deadline.is_finished());

        tx.send(()).expect("signal");
        deadline.await.expect("deadline task");
    }

    #[tokio::test(start_paused = true)]
    async fn drain_deadline_pends_when_the_server_exits_first() {
        let (tx, rx) = oneshot::channel::<()>();
        let deadline = tokio::spawn(drain_deadline(rx, Duration::from_secs(1)));

        drop(tx);
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio::task::yield_now().await;
        assert!(!deadline.is_finished());

        deadline.abort();
    }
}
