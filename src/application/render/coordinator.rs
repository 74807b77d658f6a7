//! Multi-format render coordination.
//!
//! One render job covers every backend pass for one output directory.
//! The passes share the intermediate document at a fixed path, so they
//! run strictly sequentially inside the job; unrelated jobs (other
//! builds, other directories) run in parallel on a bounded pool. The
//! invoking build thread blocks at the await barrier with a hard wait
//! ceiling so a runaway converter cannot starve the CI scheduler.

use std::{
    fs, io,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;
use vivadoc_features::Feature;

use crate::application::render::{
    convert::{ConversionEngine, ConvertError},
    emitter,
    types::{Backend, PassOrder, RenderRequest},
};
use crate::domain::layout;

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_HTML_WAIT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_PDF_WAIT: Duration = Duration::from_secs(15 * 60);

/// Wait ceilings applied at the await barrier. PDF conversion is
/// measured as slower and gets the larger budget.
#[derive(Debug, Clone, Copy)]
pub struct WaitBudgets {
    pub html_only: Duration,
    pub with_pdf: Duration,
}

impl Default for WaitBudgets {
    fn default() -> Self {
        Self {
            html_only: DEFAULT_HTML_WAIT,
            with_pdf: DEFAULT_PDF_WAIT,
        }
    }
}

/// One scheduled unit of work: every backend pass for one output
/// directory. Never retried automatically.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub features: Arc<Vec<Feature>>,
    pub request: RenderRequest,
    pub output_dir: PathBuf,
}

/// Terminal job states; no job transitions out of them.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded { backends: Vec<Backend> },
    Failed { message: String },
    TimedOut { waited: Duration },
}

#[derive(Debug, Error)]
enum PassError {
    #[error("failed to write intermediate document: {0}")]
    Io(#[from] io::Error),
    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),
}

/// Tracks output directories with an in-flight render job. The
/// intermediate document is exclusively owned by at most one job per
/// directory; a second submission for the same directory is rejected
/// rather than queued.
#[derive(Default, Clone)]
struct InFlightDirs {
    dirs: Arc<DashMap<PathBuf, ()>>,
}

impl InFlightDirs {
    fn acquire(&self, dir: PathBuf) -> Option<DirGuard> {
        use dashmap::mapref::entry::Entry;

        match self.dirs.entry(dir.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(DirGuard {
                    dir,
                    dirs: Arc::clone(&self.dirs),
                })
            }
            Entry::Occupied(_) => None,
        }
    }
}

struct DirGuard {
    dir: PathBuf,
    dirs: Arc<DashMap<PathBuf, ()>>,
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        self.dirs.remove(&self.dir);
    }
}

pub struct RenderCoordinator {
    engine: Arc<dyn ConversionEngine>,
    permits: Arc<Semaphore>,
    in_flight: InFlightDirs,
    pass_order: PassOrder,
    budgets: WaitBudgets,
}

impl RenderCoordinator {
    pub fn new(
        engine: Arc<dyn ConversionEngine>,
        workers: usize,
        pass_order: PassOrder,
        budgets: WaitBudgets,
    ) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(workers.clamp(1, 32))),
            in_flight: InFlightDirs::default(),
            pass_order,
            budgets,
        }
    }

    pub fn with_defaults(engine: Arc<dyn ConversionEngine>) -> Self {
        Self::new(
            engine,
            DEFAULT_WORKERS,
            PassOrder::default(),
            WaitBudgets::default(),
        )
    }

    /// Execute a render job to a terminal state, blocking the caller at
    /// the await barrier until completion or the wait budget elapses.
    ///
    /// A timeout abandons the wait, not the in-flight pass: the blocking
    /// task runs to completion in the background and releases the
    /// directory guard, the worker permit, and the converter process via
    /// Drop on every exit path.
    pub async fn execute(&self, job: RenderJob) -> JobOutcome {
        let job_id = Uuid::new_v4();
        let budget = if job.request.format.touches_pdf() {
            self.budgets.with_pdf
        } else {
            self.budgets.html_only
        };

        let Some(guard) = self.in_flight.acquire(job.output_dir.clone()) else {
            counter!("vivadoc_render_failures_total").increment(1);
            return JobOutcome::Failed {
                message: format!(
                    "a render job is already in flight for {}",
                    job.output_dir.display()
                ),
            };
        };

        info!(
            target = "application::render::coordinator",
            job_id = %job_id,
            format = %job.request.format,
            output_dir = %job.output_dir.display(),
            "render job scheduled"
        );
        counter!("vivadoc_render_jobs_total").increment(1);

        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                return JobOutcome::Failed {
                    message: "render worker pool is shut down".to_string(),
                };
            }
        };

        let engine = Arc::clone(&self.engine);
        let backends = job.request.backends(self.pass_order);
        let handle = tokio::task::spawn_blocking(move || {
            // Guard and permit live inside the task so they release when
            // the passes finish, even if the waiter gave up already.
            let _guard = guard;
            let _permit = permit;
            run_passes(&*engine, &job, job_id, backends)
        });

        let waited = Instant::now();
        match tokio::time::timeout(budget, handle).await {
            Ok(Ok(Ok(backends))) => {
                info!(
                    target = "application::render::coordinator",
                    job_id = %job_id,
                    backends = backends.len(),
                    "render job succeeded"
                );
                JobOutcome::Succeeded { backends }
            }
            Ok(Ok(Err(err))) => {
                counter!("vivadoc_render_failures_total").increment(1);
                let message = error_chain(&err);
                error!(
                    target = "application::render::coordinator",
                    job_id = %job_id,
                    error = %message,
                    "render job failed"
                );
                JobOutcome::Failed { message }
            }
            Ok(Err(join_err)) => {
                counter!("vivadoc_render_failures_total").increment(1);
                error!(
                    target = "application::render::coordinator",
                    job_id = %job_id,
                    error = %join_err,
                    "render task aborted"
                );
                JobOutcome::Failed {
                    message: join_err.to_string(),
                }
            }
            Err(_elapsed) => {
                counter!("vivadoc_render_failures_total").increment(1);
                error!(
                    target = "application::render::coordinator",
                    job_id = %job_id,
                    budget_secs = budget.as_secs(),
                    "render job exceeded its wait budget; abandoning the wait"
                );
                JobOutcome::TimedOut {
                    waited: waited.elapsed(),
                }
            }
        }
    }
}

/// Run every backend pass sequentially. Each pass regenerates the shared
/// intermediate document for its backend (extension sets differ per
/// backend) and then converts it, so the passes must never interleave.
fn run_passes(
    engine: &dyn ConversionEngine,
    job: &RenderJob,
    job_id: Uuid,
    backends: Vec<Backend>,
) -> Result<Vec<Backend>, PassError> {
    let intermediate = layout::intermediate_path(&job.output_dir);
    let mut produced = Vec::with_capacity(backends.len());

    for backend in backends {
        let pass_started = Instant::now();
        let attributes = job.request.attributes_for(backend);
        let document = emitter::emit(&job.features, &attributes);

        write_atomic(&job.output_dir, &intermediate, &document)?;
        engine.convert(&intermediate, backend, &attributes)?;

        histogram!("vivadoc_render_pass_ms", "backend" => backend.converter_name())
            .record(pass_started.elapsed().as_millis() as f64);
        info!(
            target = "application::render::coordinator",
            job_id = %job_id,
            backend = %backend,
            elapsed_ms = pass_started.elapsed().as_millis() as u64,
            "backend pass complete"
        );
        produced.push(backend);
    }

    Ok(produced)
}

fn write_atomic(dir: &PathBuf, path: &PathBuf, contents: &str) -> Result<(), io::Error> {
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    io::Write::write_all(&mut file, contents.as_bytes())?;
    file.persist(path).map_err(|err| err.error)?;
    // Loosen the tempfile's restrictive mode so the converter and the
    // serving side can read the intermediate document.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    }
    Ok(())
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(inner) = current {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        current = inner.source();
    }
    message
}
