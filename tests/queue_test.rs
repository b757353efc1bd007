//! Queue behavior tests: serial execution, ordering, recovery, and
//! transition legality, driven through a stub downloader.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};

use tunedl::queue::{CurrentLog, QueueService, Scheduler, ServiceError};
use tunedl::store::TaskStore;
use tunedl::task::url::parse_source_url;
use tunedl::task::{Task, TaskStatus};
use tunedl::worker::Downloader;

/// Controllable in-process stand-in for the external downloader.
struct StubDownloader {
    outcome: TaskStatus,
    /// When present, each run blocks until a permit is added.
    gate: Option<Arc<Semaphore>>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    finished: Mutex<Vec<String>>,
}

impl StubDownloader {
    fn completing() -> Self {
        Self::new(TaskStatus::Completed, None, Duration::from_millis(10))
    }

    fn failing() -> Self {
        Self::new(TaskStatus::Failed, None, Duration::from_millis(10))
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self::new(TaskStatus::Completed, Some(gate), Duration::ZERO)
    }

    fn new(outcome: TaskStatus, gate: Option<Arc<Semaphore>>, delay: Duration) -> Self {
        Self {
            outcome,
            gate,
            delay,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            finished: Mutex::new(Vec::new()),
        }
    }

    fn finished_ids(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for StubDownloader {
    async fn run(&self, task: &Task, log: &CurrentLog) -> TaskStatus {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        log.set(format!("downloading {}", task.display_name));
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        self.finished.lock().unwrap().push(task.id.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);
        log.clear();
        self.outcome
    }
}

struct Harness {
    store: Arc<TaskStore>,
    scheduler: Arc<Scheduler>,
    service: QueueService,
    downloader: Arc<StubDownloader>,
    _temp: TempDir,
}

fn harness(downloader: StubDownloader) -> Harness {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(TaskStore::open(temp.path().join("tasks")).unwrap());
    let downloader = Arc::new(downloader);
    let scheduler = Scheduler::new(store.clone(), downloader.clone());
    let service = QueueService::new(
        store.clone(),
        scheduler.clone(),
        vec!["zh-CN".to_string(), "en-US".to_string()],
    );
    Harness {
        _temp: temp,
        store,
        scheduler,
        service,
        downloader,
    }
}

fn album_url(id: u64) -> String {
    format!("https://music.apple.com/us/album/test-album/{id}")
}

/// Poll the store until the task reaches `status` or two seconds elapse.
async fn wait_for_status(store: &TaskStore, id: &str, status: TaskStatus) {
    timeout(Duration::from_secs(2), async {
        loop {
            if let Some(task) = store.get(id).unwrap() {
                if task.status == status {
                    return;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {id} never reached {status}"));
}

#[tokio::test]
async fn tasks_run_serially_in_submission_order() {
    let h = harness(StubDownloader::completing());

    let ids: Vec<String> = (100..104).map(|id| id.to_string()).collect();
    for id in &ids {
        h.service.submit(&album_url(id.parse().unwrap()), "en-US").unwrap();
    }

    for id in &ids {
        wait_for_status(&h.store, id, TaskStatus::Completed).await;
    }

    assert_eq!(h.downloader.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(h.downloader.finished_ids(), ids);
}

#[tokio::test]
async fn second_task_waits_for_first_terminal_state() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(StubDownloader::gated(gate.clone()));

    let first = h.service.submit(&album_url(100), "en-US").unwrap();
    wait_for_status(&h.store, &first.id, TaskStatus::Running).await;

    let second = h.service.submit(&album_url(200), "en-US").unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(
        h.store.get(&second.id).unwrap().unwrap().status,
        TaskStatus::Pending
    );

    // Current log belongs to the in-flight task only.
    assert_eq!(
        h.scheduler.current_log().as_deref(),
        Some("downloading test-album")
    );

    gate.add_permits(1);
    wait_for_status(&h.store, &first.id, TaskStatus::Completed).await;
    wait_for_status(&h.store, &second.id, TaskStatus::Running).await;

    gate.add_permits(1);
    wait_for_status(&h.store, &second.id, TaskStatus::Completed).await;
    assert_eq!(h.scheduler.current_log(), None);
}

#[tokio::test]
async fn resubmitting_same_url_updates_existing_row() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(StubDownloader::gated(gate.clone()));

    // Occupy the worker so the resubmitted task stays pending.
    let blocker = h.service.submit(&album_url(1), "en-US").unwrap();
    wait_for_status(&h.store, &blocker.id, TaskStatus::Running).await;

    let first = h.service.submit(&album_url(42), "en-US").unwrap();
    let second = h.service.submit(&album_url(42), "zh-CN").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.language, "zh-CN");
    assert_eq!(second.status, TaskStatus::Pending);
    assert_eq!(h.store.list().unwrap().len(), 2);
}

#[tokio::test]
async fn recovery_resets_orphaned_running_task() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(TaskStore::open(temp.path().join("tasks")).unwrap());

    let url = album_url(7);
    let mut task = Task::new(parse_source_url(&url).unwrap(), &url, "en-US");
    task.status = TaskStatus::Running;
    store.upsert(&task).unwrap();

    let scheduler = Scheduler::new(store.clone(), Arc::new(StubDownloader::completing()));
    let recovered = scheduler.recover_interrupted().unwrap();

    assert_eq!(recovered, 1);
    assert_eq!(store.get("7").unwrap().unwrap().status, TaskStatus::Pending);

    // A second sweep finds nothing left to fix.
    assert_eq!(scheduler.recover_interrupted().unwrap(), 0);
}

#[tokio::test]
async fn successful_run_resets_overwrite() {
    let h = harness(StubDownloader::completing());

    let task = h.service.submit(&album_url(10), "en-US").unwrap();
    wait_for_status(&h.store, &task.id, TaskStatus::Completed).await;

    let restarted = h.service.restart(&task.id, true).unwrap();
    assert!(restarted.overwrite);
    assert_eq!(restarted.status, TaskStatus::Pending);

    wait_for_status(&h.store, &task.id, TaskStatus::Completed).await;
    assert!(!h.store.get(&task.id).unwrap().unwrap().overwrite);
}

#[tokio::test]
async fn failed_run_keeps_overwrite() {
    let h = harness(StubDownloader::failing());

    let task = h.service.submit(&album_url(11), "en-US").unwrap();
    wait_for_status(&h.store, &task.id, TaskStatus::Failed).await;

    h.service.restart(&task.id, true).unwrap();
    wait_for_status(&h.store, &task.id, TaskStatus::Failed).await;

    // Overwrite survives a failed run so a retry still replaces output.
    assert!(h.store.get(&task.id).unwrap().unwrap().overwrite);
}

#[tokio::test]
async fn transition_preconditions_are_enforced() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(StubDownloader::gated(gate.clone()));

    let running = h.service.submit(&album_url(1), "en-US").unwrap();
    wait_for_status(&h.store, &running.id, TaskStatus::Running).await;
    let pending = h.service.submit(&album_url(2), "en-US").unwrap();

    // Running tasks cannot be cancelled, restarted, or deleted.
    assert!(matches!(
        h.service.cancel(&running.id),
        Err(ServiceError::InvalidState { .. })
    ));
    assert!(matches!(
        h.service.restart(&running.id, false),
        Err(ServiceError::InvalidState { .. })
    ));
    assert!(matches!(
        h.service.delete(&running.id),
        Err(ServiceError::InvalidState { .. })
    ));

    // Pending tasks cannot be restarted.
    assert!(matches!(
        h.service.restart(&pending.id, false),
        Err(ServiceError::InvalidState { .. })
    ));

    // Cancel is pending-only and not repeatable.
    let cancelled = h.service.cancel(&pending.id).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(matches!(
        h.service.cancel(&pending.id),
        Err(ServiceError::InvalidState { .. })
    ));

    // Terminal tasks can be deleted.
    h.service.delete(&pending.id).unwrap();
    assert!(h.store.get(&pending.id).unwrap().is_none());

    // Drain the stuck run so the spawned worker finishes cleanly.
    gate.add_permits(1);
    wait_for_status(&h.store, &running.id, TaskStatus::Completed).await;
}

#[tokio::test]
async fn validation_happens_before_any_mutation() {
    let h = harness(StubDownloader::completing());

    assert!(matches!(
        h.service.submit("https://example.com/nothing-here", "en-US"),
        Err(ServiceError::InvalidUrl(_))
    ));
    assert!(matches!(
        h.service.submit(&album_url(5), "fr-FR"),
        Err(ServiceError::UnsupportedLanguage(_))
    ));

    assert!(h.store.list().unwrap().is_empty());
}

#[tokio::test]
async fn reset_all_requeues_non_running_tasks() {
    let h = harness(StubDownloader::failing());

    let a = h.service.submit(&album_url(21), "en-US").unwrap();
    let b = h.service.submit(&album_url(22), "en-US").unwrap();
    wait_for_status(&h.store, &a.id, TaskStatus::Failed).await;
    wait_for_status(&h.store, &b.id, TaskStatus::Failed).await;

    let reset = h.service.reset_all_non_running().unwrap();
    assert_eq!(reset, 2);

    // The scheduler re-arms and runs them again (they fail again).
    wait_for_status(&h.store, &a.id, TaskStatus::Failed).await;
    wait_for_status(&h.store, &b.id, TaskStatus::Failed).await;
    assert_eq!(h.downloader.finished_ids().len(), 4);
}
