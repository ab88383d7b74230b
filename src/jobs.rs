//! Background generation jobs.
//!
//! [`GenerationService`] runs each generation on its own worker thread and
//! keeps the job in a registry keyed by a UUID. Callers poll progress,
//! fetch the outcome, cancel, and apply slot edits to the stored timetable.
//!
//! # Lifecycle
//!
//! ```text
//! start ──► generating ──► completed (timetable produced)
//!                     ├──► failed    (validation / unsatisfiable / malformed)
//!                     └──► cancelled (cancel() while generating)
//! ```
//!
//! A worker that panics ends its job as `failed` with
//! [`EngineError::WorkerFailed`] as the result.

use log::{error, info, warn};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

use crate::editing::{SlotEditor, SlotUpdate};
use crate::error::EngineError;
use crate::generator::{CancelFlag, GenerationOutcome, Generator, Progress, ProgressSink};
use crate::models::{GenerationRequest, SlotRef, Timetable};
use crate::quality::QualityScorer;

/// Status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// The worker is running.
    Generating,
    /// A timetable was produced.
    Completed,
    /// No timetable was produced.
    Failed,
    /// The caller cancelled the run.
    Cancelled,
}

/// Progress snapshot returned by [`GenerationService::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Job status.
    pub status: JobStatus,
    /// Completion percentage.
    pub progress: u8,
    /// Description of the current step.
    pub current_step: String,
}

/// A generation job.
#[derive(Debug)]
pub struct GenerationJob {
    /// Job ID.
    pub id: String,
    /// Current status.
    pub status: JobStatus,
    /// Last reported progress.
    pub progress: Progress,
    /// The request being generated.
    pub request: GenerationRequest,
    result: Option<Result<GenerationOutcome, EngineError>>,
    cancel: CancelFlag,
    finished: Arc<Latch>,
}

impl GenerationJob {
    fn new(id: String, request: GenerationRequest) -> Self {
        Self {
            id,
            status: JobStatus::Generating,
            progress: Progress::new(0, "Queued"),
            request,
            result: None,
            cancel: CancelFlag::new(),
            finished: Arc::new(Latch::default()),
        }
    }

    fn snapshot(&self) -> JobProgress {
        JobProgress {
            status: self.status,
            progress: self.progress.percent,
            current_step: self.progress.step.clone(),
        }
    }
}

/// Released once by the worker; any number of callers may wait on it.
#[derive(Debug, Default)]
struct Latch {
    done: Mutex<bool>,
    signal: Condvar,
}

impl Latch {
    fn release(&self) {
        *self.done.lock() = true;
        self.signal.notify_all();
    }

    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.signal.wait(&mut done);
        }
    }
}

/// Writes worker progress into the job.
struct JobSink(Arc<RwLock<GenerationJob>>);

impl ProgressSink for JobSink {
    fn report(&self, progress: Progress) {
        self.0.write().progress = progress;
    }
}

/// Registry of generation jobs.
///
/// # Example
///
/// ```
/// use u_timetable::jobs::{GenerationService, JobStatus};
/// use u_timetable::models::{GenerationRequest, SchoolClass, Teacher};
///
/// let service = GenerationService::new();
/// let id = service.start(GenerationRequest::new(
///     vec![SchoolClass::new("10A").with_subject("Maths", 2)],
///     vec![Teacher::new("Mr. X").with_subject("Maths")],
///     ["Mon", "Tue"],
///     1,
/// ));
///
/// assert_eq!(service.wait(&id).unwrap(), JobStatus::Completed);
/// assert_eq!(service.status(&id).unwrap().progress, 100);
/// assert!(service.result(&id).unwrap().is_generated());
/// ```
#[derive(Debug, Default)]
pub struct GenerationService {
    generator: Generator,
    jobs: RwLock<HashMap<String, Arc<RwLock<GenerationJob>>>>,
}

impl GenerationService {
    /// Creates a service with a default generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service running the given generator.
    pub fn with_generator(generator: Generator) -> Self {
        Self {
            generator,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Starts generating in the background and returns the job ID.
    pub fn start(&self, request: GenerationRequest) -> String {
        let job = self.register(request);
        let id = job.read().id.clone();
        self.launch(job);
        id
    }

    /// Progress of a job.
    pub fn status(&self, id: &str) -> Result<JobProgress, EngineError> {
        Ok(self.job(id)?.read().snapshot())
    }

    /// Blocks until the job's worker has finished and returns the final status.
    ///
    /// Concurrent callers all block until the same worker finishes.
    pub fn wait(&self, id: &str) -> Result<JobStatus, EngineError> {
        let job = self.job(id)?;
        let finished = job.read().finished.clone();
        finished.wait();
        let status = job.read().status;
        Ok(status)
    }

    /// Outcome of a finished job.
    ///
    /// # Errors
    /// - `UnknownJob` for an unknown ID
    /// - `JobNotReady` while the job is generating
    /// - the worker's own error (`Cancelled`, `MalformedInput`, `WorkerFailed`)
    pub fn result(&self, id: &str) -> Result<GenerationOutcome, EngineError> {
        let job = self.job(id)?;
        let guard = job.read();
        match &guard.result {
            Some(result) => result.clone(),
            None => Err(EngineError::JobNotReady(id.to_string())),
        }
    }

    /// Requests cancellation. Finished jobs are unaffected.
    pub fn cancel(&self, id: &str) -> Result<(), EngineError> {
        let job = self.job(id)?;
        let guard = job.read();
        if guard.status == JobStatus::Generating {
            info!("Cancelling job {id}");
            guard.cancel.cancel();
        }
        Ok(())
    }

    /// Applies a slot update to a completed job's timetable.
    ///
    /// The stored timetable and its quality report change only if the edit
    /// is accepted.
    pub fn update_slot(&self, id: &str, update: &SlotUpdate) -> Result<Timetable, EngineError> {
        self.edit(id, |editor, timetable| editor.update_slot(timetable, update))
    }

    /// Swaps two slots of a completed job's timetable.
    pub fn swap_slots(&self, id: &str, a: &SlotRef, b: &SlotRef) -> Result<Timetable, EngineError> {
        self.edit(id, |editor, timetable| editor.swap_slots(timetable, a, b))
    }

    /// Removes a job, cancelling it if still running.
    pub fn remove(&self, id: &str) -> bool {
        match self.jobs.write().remove(id) {
            Some(job) => {
                job.read().cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// IDs of all registered jobs.
    pub fn list_jobs(&self) -> Vec<String> {
        self.jobs.read().keys().cloned().collect()
    }

    fn job(&self, id: &str) -> Result<Arc<RwLock<GenerationJob>>, EngineError> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownJob(id.to_string()))
    }

    fn register(&self, request: GenerationRequest) -> Arc<RwLock<GenerationJob>> {
        let id = Uuid::new_v4().to_string();
        let job = Arc::new(RwLock::new(GenerationJob::new(id.clone(), request)));
        self.jobs.write().insert(id, job.clone());
        job
    }

    fn launch(&self, job: Arc<RwLock<GenerationJob>>) {
        let generator = self.generator.clone();
        self.launch_with(job, move |request, sink, cancel| {
            generator.generate_with(request, sink, cancel)
        });
    }

    fn launch_with<F>(&self, job: Arc<RwLock<GenerationJob>>, run: F)
    where
        F: FnOnce(
                &GenerationRequest,
                &dyn ProgressSink,
                &CancelFlag,
            ) -> Result<GenerationOutcome, EngineError>
            + Send
            + 'static,
    {
        thread::spawn(move || {
            let (request, cancel, finished, id) = {
                let guard = job.read();
                (
                    guard.request.clone(),
                    guard.cancel.clone(),
                    guard.finished.clone(),
                    guard.id.clone(),
                )
            };
            info!("Job {id} started");

            let sink = JobSink(job.clone());
            let result = guarded(|| run(&request, &sink, &cancel));
            let status = match &result {
                Ok(GenerationOutcome::Generated(_)) => JobStatus::Completed,
                Ok(GenerationOutcome::Failed(_)) => JobStatus::Failed,
                Err(EngineError::Cancelled) => JobStatus::Cancelled,
                Err(_) => JobStatus::Failed,
            };
            if let Err(e) = &result {
                warn!("Job {id} ended with error: {e}");
            }
            info!("Job {id} finished: {status:?}");

            {
                let mut guard = job.write();
                guard.status = status;
                guard.result = Some(result);
            }
            finished.release();
        });
    }

    fn edit<F>(&self, id: &str, apply: F) -> Result<Timetable, EngineError>
    where
        F: FnOnce(&SlotEditor<'_>, &Timetable) -> Result<Timetable, EngineError>,
    {
        let job = self.job(id)?;
        let mut guard = job.write();
        let job = &mut *guard;

        let Some(Ok(GenerationOutcome::Generated(generated))) = job.result.as_mut() else {
            return Err(EngineError::JobNotReady(id.to_string()));
        };

        let editor = SlotEditor::new(&job.request.teachers);
        let next = apply(&editor, &generated.timetable)?;
        generated.quality = QualityScorer::new(self.generator.config().quality.clone()).score(
            &next,
            &job.request.classes,
            &job.request.teachers,
        );
        generated.timetable = next.clone();
        Ok(next)
    }
}

/// Runs a worker body, turning a panic into `WorkerFailed`.
fn guarded<F>(run: F) -> Result<GenerationOutcome, EngineError>
where
    F: FnOnce() -> Result<GenerationOutcome, EngineError>,
{
    panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "worker panicked".to_string());
        error!("Generation worker panicked: {message}");
        Err(EngineError::WorkerFailed(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SchoolClass, Teacher};

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            vec![
                SchoolClass::new("10A").with_subject("Maths", 2),
                SchoolClass::new("10B").with_subject("Maths", 2),
            ],
            vec![Teacher::new("X").with_subject("Maths")],
            ["Mon", "Tue"],
            2,
        )
    }

    fn completed(service: &GenerationService) -> String {
        let id = service.start(request());
        assert_eq!(service.wait(&id).unwrap(), JobStatus::Completed);
        id
    }

    #[test]
    fn test_job_completes() {
        let service = GenerationService::new();
        let id = completed(&service);

        let progress = service.status(&id).unwrap();
        assert_eq!(progress.status, JobStatus::Completed);
        assert_eq!(progress.progress, 100);
        assert_eq!(progress.current_step, "Quality scored");

        let outcome = service.result(&id).unwrap();
        let generated = outcome.generated().unwrap();
        assert!(generated.timetable.double_bookings().is_empty());
        assert_eq!(service.list_jobs(), vec![id]);
    }

    #[test]
    fn test_failed_job() {
        let service = GenerationService::new();
        let id = service.start(GenerationRequest::new(
            vec![SchoolClass::new("10A").with_subject("Art", 1)],
            vec![Teacher::new("X").with_subject("Maths")],
            ["Mon"],
            1,
        ));
        assert_eq!(service.wait(&id).unwrap(), JobStatus::Failed);
        assert!(service.result(&id).unwrap().failure().is_some());
    }

    #[test]
    fn test_malformed_job_fails_with_error() {
        let service = GenerationService::new();
        let id = service.start(GenerationRequest::new(vec![], vec![], ["Mon"], 0));
        assert_eq!(service.wait(&id).unwrap(), JobStatus::Failed);
        assert_eq!(service.result(&id).unwrap_err().code(), "MALFORMED_INPUT");
    }

    #[test]
    fn test_cancelled_job() {
        let service = GenerationService::new();
        let job = service.register(request());
        let id = job.read().id.clone();
        service.cancel(&id).unwrap();
        service.launch(job);

        assert_eq!(service.wait(&id).unwrap(), JobStatus::Cancelled);
        assert_eq!(service.result(&id).unwrap_err(), EngineError::Cancelled);
    }

    #[test]
    fn test_panicking_worker_fails_job() {
        let service = GenerationService::new();
        let job = service.register(request());
        let id = job.read().id.clone();
        service.launch_with(job, |_, _, _| panic!("search blew up"));

        assert_eq!(service.wait(&id).unwrap(), JobStatus::Failed);
        assert_eq!(
            service.result(&id).unwrap_err(),
            EngineError::WorkerFailed("search blew up".into())
        );
        // A second wait sees the same final state
        assert_eq!(service.wait(&id).unwrap(), JobStatus::Failed);
    }

    #[test]
    fn test_concurrent_waits_block_until_done() {
        let service = Arc::new(GenerationService::new());
        let job = service.register(request());
        let id = job.read().id.clone();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let service = service.clone();
                let id = id.clone();
                thread::spawn(move || service.wait(&id).unwrap())
            })
            .collect();

        service.launch_with(job, |request, sink, cancel| {
            thread::sleep(std::time::Duration::from_millis(50));
            Generator::new().generate_with(request, sink, cancel)
        });
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), JobStatus::Completed);
        }
        assert!(service.result(&id).unwrap().is_generated());
    }

    #[test]
    fn test_result_not_ready() {
        let service = GenerationService::new();
        let job = service.register(request());
        let id = job.read().id.clone();
        assert_eq!(
            service.result(&id).unwrap_err(),
            EngineError::JobNotReady(id.clone())
        );
        assert_eq!(service.status(&id).unwrap().status, JobStatus::Generating);
    }

    #[test]
    fn test_unknown_job() {
        let service = GenerationService::new();
        assert_eq!(
            service.status("nope").unwrap_err(),
            EngineError::UnknownJob("nope".into())
        );
        assert!(!service.remove("nope"));
    }

    #[test]
    fn test_edit_stored_timetable() {
        let service = GenerationService::new();
        let id = completed(&service);
        let before = service.result(&id).unwrap().generated().unwrap().timetable.clone();

        // X teaches every slot of one class or the other; clearing is always allowed.
        let target = SlotRef::new("10A", "Mon", 1);
        let was_empty = before.slot(&target).unwrap().is_empty();
        let next = service
            .update_slot(&id, &SlotUpdate::clear(target.clone()))
            .unwrap();
        assert!(next.slot(&target).unwrap().is_empty());

        let stored = service.result(&id).unwrap();
        let generated = stored.generated().unwrap();
        assert_eq!(generated.timetable, next);
        if !was_empty {
            assert!(generated.quality.constraint_satisfaction < 100.0);
        }
    }

    #[test]
    fn test_rejected_edit_keeps_stored_timetable() {
        let service = GenerationService::new();
        let id = completed(&service);
        let before = service.result(&id).unwrap();

        let err = service
            .update_slot(
                &id,
                &SlotUpdate::assign(SlotRef::new("10A", "Mon", 1), "Maths", "Nobody"),
            )
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownTeacher("Nobody".into()));
        assert_eq!(service.result(&id).unwrap(), before);
    }

    #[test]
    fn test_swap_stored_timetable() {
        let service = GenerationService::new();
        let id = completed(&service);
        let a = SlotRef::new("10A", "Mon", 1);
        let b = SlotRef::new("10A", "Mon", 2);
        let before = service.result(&id).unwrap().generated().unwrap().timetable.clone();

        let next = service.swap_slots(&id, &a, &b).unwrap();
        assert_eq!(next.slot(&a).unwrap().subject, before.slot(&b).unwrap().subject);
        assert_eq!(next.slot(&b).unwrap().subject, before.slot(&a).unwrap().subject);
    }

    #[test]
    fn test_edit_needs_completed_job() {
        let service = GenerationService::new();
        let job = service.register(request());
        let id = job.read().id.clone();
        let err = service
            .update_slot(&id, &SlotUpdate::clear(SlotRef::new("10A", "Mon", 1)))
            .unwrap_err();
        assert_eq!(err.code(), "JOB_NOT_READY");
    }

    #[test]
    fn test_remove_job() {
        let service = GenerationService::new();
        let id = completed(&service);
        assert!(service.remove(&id));
        assert!(service.list_jobs().is_empty());
    }

    #[test]
    fn test_progress_wire_format() {
        let progress = JobProgress {
            status: JobStatus::Generating,
            progress: 40,
            current_step: "Placed 4 of 10 lessons".into(),
        };
        assert_eq!(
            serde_json::to_string(&progress).unwrap(),
            r#"{"status":"generating","progress":40,"currentStep":"Placed 4 of 10 lessons"}"#
        );
    }
}
