use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use taskheat_core::{
    AutosaveError, AutosaveWorker, IdWatermarks, PersistResult, PersistenceError, Task, TaskId,
    TaskPersistence, TaskSnapshot,
};

const NOW: i64 = 1_700_000_000_000;

#[derive(Clone, Default)]
struct RecordingPersistence {
    saved: Arc<Mutex<Vec<TaskSnapshot>>>,
    delay: Duration,
}

impl TaskPersistence for RecordingPersistence {
    fn load(&self) -> PersistResult<TaskSnapshot> {
        Ok(TaskSnapshot::default())
    }

    fn save(&self, snapshot: &TaskSnapshot) -> PersistResult<()> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

struct FailingPersistence;

impl TaskPersistence for FailingPersistence {
    fn load(&self) -> PersistResult<TaskSnapshot> {
        Ok(TaskSnapshot::default())
    }

    fn save(&self, _snapshot: &TaskSnapshot) -> PersistResult<()> {
        Err(PersistenceError::InvalidData("disk full".to_string()))
    }
}

fn snapshot_with(count: i64) -> TaskSnapshot {
    let tasks = (1..=count)
        .map(|id| Task::new(TaskId(id), format!("task {id}"), NOW, NOW).unwrap())
        .collect();
    TaskSnapshot {
        tasks,
        watermarks: IdWatermarks {
            last_task_id: count,
            last_subtask_id: 0,
        },
    }
}

fn saved_sizes(persistence: &RecordingPersistence) -> Vec<usize> {
    persistence
        .saved
        .lock()
        .unwrap()
        .iter()
        .map(|snapshot| snapshot.tasks.len())
        .collect()
}

#[test]
fn requests_are_applied_in_enqueue_order_without_coalescing() {
    let persistence = RecordingPersistence {
        delay: Duration::from_millis(2),
        ..RecordingPersistence::default()
    };
    let worker = AutosaveWorker::spawn(persistence.clone(), 4).unwrap();

    for count in 1..=10 {
        worker.enqueue(snapshot_with(count)).unwrap();
    }
    worker.flush().unwrap();

    assert_eq!(saved_sizes(&persistence), (1..=10).collect::<Vec<usize>>());
    assert_eq!(worker.status().completed, 10);
}

#[test]
fn enqueued_snapshot_is_independent_of_later_changes() {
    let persistence = RecordingPersistence::default();
    let worker = AutosaveWorker::spawn(persistence.clone(), 8).unwrap();

    let mut live = snapshot_with(1);
    worker.enqueue(live.clone()).unwrap();
    live.tasks[0].increase_heat();
    live.tasks.push(Task::new(TaskId(2), "later", NOW, NOW).unwrap());
    worker.flush().unwrap();

    let saved = persistence.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].tasks.len(), 1);
    assert_eq!(saved[0].tasks[0].heat_index(), 0);
}

#[test]
fn shutdown_drains_pending_requests() {
    let persistence = RecordingPersistence {
        delay: Duration::from_millis(5),
        ..RecordingPersistence::default()
    };
    let mut worker = AutosaveWorker::spawn(persistence.clone(), 16).unwrap();

    for count in 1..=5 {
        worker.enqueue(snapshot_with(count)).unwrap();
    }
    worker.shutdown();

    assert_eq!(saved_sizes(&persistence), vec![1, 2, 3, 4, 5]);
}

#[test]
fn drop_drains_pending_requests() {
    let persistence = RecordingPersistence {
        delay: Duration::from_millis(5),
        ..RecordingPersistence::default()
    };
    {
        let worker = AutosaveWorker::spawn(persistence.clone(), 16).unwrap();
        worker.enqueue(snapshot_with(1)).unwrap();
        worker.enqueue(snapshot_with(2)).unwrap();
    }

    assert_eq!(saved_sizes(&persistence), vec![1, 2]);
}

#[test]
fn requests_after_shutdown_report_stopped() {
    let mut worker = AutosaveWorker::spawn(RecordingPersistence::default(), 1).unwrap();
    worker.shutdown();
    worker.shutdown();

    assert!(matches!(
        worker.enqueue(snapshot_with(1)),
        Err(AutosaveError::Stopped)
    ));
    assert!(matches!(worker.flush(), Err(AutosaveError::Stopped)));
    assert!(matches!(
        worker.save_and_wait(snapshot_with(1)),
        Err(AutosaveError::Stopped)
    ));
}

#[test]
fn failed_autosaves_are_counted_not_returned() {
    let worker = AutosaveWorker::spawn(FailingPersistence, 4).unwrap();

    worker.enqueue(snapshot_with(1)).unwrap();
    worker.enqueue(snapshot_with(2)).unwrap();
    worker.flush().unwrap();

    let status = worker.status();
    assert_eq!(status.completed, 0);
    assert_eq!(status.failed, 2);
    assert!(status.last_error.unwrap().contains("disk full"));
}

#[test]
fn save_and_wait_returns_the_write_result() {
    let failing = AutosaveWorker::spawn(FailingPersistence, 4).unwrap();
    match failing.save_and_wait(snapshot_with(1)) {
        Err(AutosaveError::Persistence(PersistenceError::InvalidData(message))) => {
            assert_eq!(message, "disk full");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let persistence = RecordingPersistence::default();
    let worker = AutosaveWorker::spawn(persistence.clone(), 4).unwrap();
    worker.enqueue(snapshot_with(1)).unwrap();
    worker.save_and_wait(snapshot_with(3)).unwrap();

    // The synchronous save runs after the queued one, never before it.
    assert_eq!(saved_sizes(&persistence), vec![1, 3]);
    assert_eq!(worker.status().completed, 2);
}

#[test]
fn zero_capacity_still_queues() {
    let persistence = RecordingPersistence::default();
    let worker = AutosaveWorker::spawn(persistence.clone(), 0).unwrap();

    worker.enqueue(snapshot_with(1)).unwrap();
    worker.flush().unwrap();

    assert_eq!(saved_sizes(&persistence), vec![1]);
}
