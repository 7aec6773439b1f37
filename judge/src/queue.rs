//! The task queue: a FIFO of pending judging requests with live position notifications, a
//! priority head-insert used only for admin-triggered debug runs, and a single synchronous worker
//! loop.
//!
//! Exactly one worker is assumed to call `launch`/`pop`. Internal parallelism for a single task's
//! data points is the objective runner's business, not the queue's.
//!

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use super::{Objective, ObjectiveResult};

/// A monotonically increasing, process-wide unique task id.
pub type TaskId = u64;

/// Position reported to a `Watcher`. `0` means the task has become the running item; `-1` means
/// the task has finished and the result vector is readable. Any other value is a 1-based queue
/// position.
pub type Position = i64;

/// Notified whenever a `Task`'s position changes. Invoked with `0` when the task starts running
/// and `-1` exactly once, after which no further notifications follow.
pub type Watcher = Box<dyn Fn(Position) + Send + Sync>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A queued judging request: an objective snapshot, the already-joined source string, an optional
/// watcher, and (once finished) the result.
pub struct Task {
    pub id: TaskId,
    pub objective: Objective,
    pub source: String,
    watcher: Mutex<Option<Watcher>>,
    result: Mutex<Option<ObjectiveResult>>,
}

impl Task {
    /// Create a new task with the next globally unique id and no watcher.
    pub fn new(objective: Objective, source: String) -> Task {
        Task {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            objective,
            source,
            watcher: Mutex::new(None),
            result: Mutex::new(None),
        }
    }

    /// Install `watcher`, replacing any previous one.
    pub fn watch(&self, watcher: Watcher) {
        *self.watcher.lock().unwrap() = Some(watcher);
    }

    /// Remove the installed watcher, if any.
    pub fn remove_watcher(&self) {
        *self.watcher.lock().unwrap() = None;
    }

    fn notify(&self, pos: Position) {
        if let Some(watcher) = self.watcher.lock().unwrap().as_ref() {
            watcher(pos);
        }
    }

    /// The task's result, once `run` has completed. `None` while queued or running.
    pub fn result(&self) -> Option<ObjectiveResult> {
        self.result.lock().unwrap().clone()
    }

    /// Run this task's objective synchronously against `runner`, storing the result and notifying
    /// the watcher with `-1` afterwards.
    pub fn run(&self, runner: &super::runner::ObjectiveRunner, scratch_dir: &std::path::Path) {
        let mut objective = self.objective.clone();
        objective.source = self.source.clone();
        let result = runner.run(&objective, scratch_dir)
            .unwrap_or_else(|e| super::ObjectiveResult {
                code: super::ResultCode::IE,
                passed: 0,
                total: objective.points.len().max(objective.random_point_count),
                points: vec![super::PointResult::internal_error(format!("{}", e))],
            });
        *self.result.lock().unwrap() = Some(result);
        self.notify(-1);
    }
}

/// A FIFO queue of `Task`s, safe to share across threads via `Arc`.
///
/// Every mutating operation (`push`, `push_top`, `pop`) recomputes and broadcasts the position of
/// every task still queued, matching the reference implementation's "everyone's position changes
/// on every push/pop" behaviour rather than only notifying the task that moved.
pub struct Queue {
    inner: Mutex<QueueState>,
    waiter: Condvar,
}

struct QueueState {
    tasks: VecDeque<Arc<Task>>,
    running: bool,
    stopped: bool,
}

impl Queue {
    /// Create a new, running queue.
    pub fn new() -> Queue {
        Queue {
            inner: Mutex::new(QueueState { tasks: VecDeque::new(), running: true, stopped: false }),
            waiter: Condvar::new(),
        }
    }

    /// Append `task` to the tail. Returns its 1-based position. Wakes one blocked `pop`.
    pub fn push(&self, task: Arc<Task>) -> usize {
        let mut state = self.inner.lock().unwrap();
        state.tasks.push_back(task);
        let pos = state.tasks.len();
        notify_all_positions(&state.tasks);
        self.waiter.notify_one();
        pos
    }

    /// Insert `task` at the head, ahead of every currently queued task. Used only for privileged
    /// priority runs; ordinary tail pushes will starve behind repeated use. Wakes one blocked
    /// `pop`.
    pub fn push_top(&self, task: Arc<Task>) {
        let mut state = self.inner.lock().unwrap();
        state.tasks.push_front(task);
        notify_all_positions(&state.tasks);
        self.waiter.notify_one();
    }

    /// Block until a task is available or the queue is stopped. Returns the head task, notified
    /// with position `0`, or `None` if the queue was stopped while waiting.
    pub fn pop(&self) -> Option<Arc<Task>> {
        let mut state = self.inner.lock().unwrap();
        while state.tasks.is_empty() {
            if state.stopped {
                return None;
            }
            state = self.waiter.wait(state).unwrap();
        }
        if state.stopped && state.tasks.is_empty() {
            return None;
        }
        let task = state.tasks.pop_front().unwrap();
        task.notify(0);
        notify_all_positions(&state.tasks);
        Some(task)
    }

    /// Linear scan for a queued task by id. Never finds the currently running task, since that
    /// task has already been popped.
    pub fn find(&self, id: TaskId) -> Option<Arc<Task>> {
        let state = self.inner.lock().unwrap();
        state.tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Signal the worker loop to exit the next time `pop` would otherwise block.
    pub fn stop(&self) {
        let mut state = self.inner.lock().unwrap();
        state.stopped = true;
        state.running = false;
        self.waiter.notify_all();
    }

    /// Whether `stop` has been called.
    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().running
    }

    /// Synchronous worker loop: repeatedly `pop`, then run the task against `runner`, using
    /// `scratch_dir` for compiler intermediates. Returns once `pop` yields `None`.
    pub fn launch(&self, runner: &super::runner::ObjectiveRunner, scratch_dir: &std::path::Path) {
        while let Some(task) = self.pop() {
            task.run(runner, scratch_dir);
        }
    }
}

impl Default for Queue {
    fn default() -> Self {
        Queue::new()
    }
}

fn notify_all_positions(tasks: &VecDeque<Arc<Task>>) {
    for (i, task) in tasks.iter().enumerate() {
        task.notify((i + 1) as Position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn objective() -> Objective {
        Objective {
            source: String::new(),
            language: super::super::LANG_C,
            mode: super::super::JudgeMode::empty(),
            time_limit: Duration::from_secs(1),
            memory_limit: 1 << 20,
            points: Vec::new(),
            random_judge_script: None,
            special_judge_script: None,
            random_point_count: 0,
        }
    }

    fn task() -> Arc<Task> {
        Arc::new(Task::new(objective(), String::new()))
    }

    #[test]
    fn push_then_pop_is_fifo_and_push_top_cuts_the_line() {
        let q = Queue::new();

        let a = task();
        let b = task();
        let c = task();
        let x = task();

        assert_eq!(q.push(a.clone()), 1);
        assert_eq!(q.push(b.clone()), 2);
        assert_eq!(q.push(c.clone()), 3);
        q.push_top(x.clone());

        assert_eq!(q.pop().unwrap().id, x.id);
        assert_eq!(q.pop().unwrap().id, a.id);
        assert_eq!(q.pop().unwrap().id, b.id);
        assert_eq!(q.pop().unwrap().id, c.id);
    }

    #[test]
    fn watcher_sees_decreasing_positions_then_zero_then_minus_one() {
        let q = Queue::new();
        let observed = Arc::new(StdMutex::new(Vec::new()));

        let a = task();
        let b = task();

        let observed_a = observed.clone();
        a.watch(Box::new(move |pos| observed_a.lock().unwrap().push(pos)));

        q.push(a.clone());
        q.push(b.clone());

        let popped = q.pop().unwrap();
        assert_eq!(popped.id, a.id);

        let seq = observed.lock().unwrap().clone();
        assert_eq!(seq, vec![1, 0]);
    }

    #[test]
    fn find_does_not_see_the_popped_task() {
        let q = Queue::new();
        let a = task();
        let id = a.id;
        q.push(a);

        assert!(q.find(id).is_some());
        q.pop();
        assert!(q.find(id).is_none());
    }

    #[test]
    fn stop_unblocks_pop() {
        let q = Arc::new(Queue::new());
        let q2 = q.clone();
        let handle = std::thread::spawn(move || q2.pop());
        std::thread::sleep(Duration::from_millis(50));
        q.stop();
        assert!(handle.join().unwrap().is_none());
    }
}
