// src/services/task_registry.rs
//
// Task Registry - at most one in-flight generation per key
//
// CRITICAL RULES:
// - Check and register happen under one lock, together with the cache probe
// - A second request for a running key joins it, never starts another
// - Every task carries an epoch; clearing the registry makes all running
//   tasks stale, so their late writes can be told apart
// - A task leaves the registry as soon as it finishes, successfully or not

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::error::{AppResult, GenerationError, GenerationResult};

/// Shared outcome of one task
#[derive(Debug, Clone)]
pub enum TaskState<T> {
    Running,
    Done(T),
    Failed(GenerationError),
}

struct TaskEntry<T> {
    epoch: u64,
    state: watch::Receiver<TaskState<T>>,
}

struct RegistryInner<K, T> {
    tasks: HashMap<K, TaskEntry<T>>,
    next_epoch: u64,
}

/// What a caller got from `begin_with`
pub enum Registration<K, T>
where
    K: Eq + Hash,
{
    /// The probe found a usable value, nothing runs
    Cached(T),
    /// Another caller already started this key
    Joined(TaskWaiter<T>),
    /// The caller owns the new task and must finish it through the guard
    Started {
        guard: TaskGuard<K, T>,
        waiter: TaskWaiter<T>,
    },
}

pub struct TaskRegistry<K, T> {
    inner: Arc<Mutex<RegistryInner<K, T>>>,
}

impl<K, T> Clone for TaskRegistry<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T> Default for TaskRegistry<K, T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                tasks: HashMap::new(),
                next_epoch: 1,
            })),
        }
    }
}

impl<K, T> TaskRegistry<K, T>
where
    K: Clone + Eq + Hash + Debug,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a running task for `key`, or return what `probe` finds, or
    /// register a new task. All three decisions are made under one lock.
    pub fn begin_with<F>(&self, key: K, probe: F) -> AppResult<Registration<K, T>>
    where
        F: FnOnce() -> AppResult<Option<T>>,
    {
        let mut inner = self.lock();

        if let Some(entry) = inner.tasks.get(&key) {
            return Ok(Registration::Joined(TaskWaiter {
                state: entry.state.clone(),
            }));
        }

        if let Some(value) = probe()? {
            return Ok(Registration::Cached(value));
        }

        let epoch = inner.next_epoch;
        inner.next_epoch += 1;

        let (sender, receiver) = watch::channel(TaskState::Running);
        inner.tasks.insert(
            key.clone(),
            TaskEntry {
                epoch,
                state: receiver.clone(),
            },
        );

        Ok(Registration::Started {
            guard: TaskGuard {
                registry: self.clone(),
                key,
                epoch,
                sender,
                finished: false,
            },
            waiter: TaskWaiter { state: receiver },
        })
    }

    /// Waiter for a running task, if any
    pub fn join(&self, key: &K) -> Option<TaskWaiter<T>> {
        self.lock().tasks.get(key).map(|entry| TaskWaiter {
            state: entry.state.clone(),
        })
    }

    pub fn is_running(&self, key: &K) -> bool {
        self.lock().tasks.contains_key(key)
    }

    pub fn is_current(&self, key: &K, epoch: u64) -> bool {
        self.lock()
            .tasks
            .get(key)
            .map(|entry| entry.epoch == epoch)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every running task. They keep running, but their writes are
    /// stale from now on.
    pub fn clear(&self) {
        let dropped = {
            let mut inner = self.lock();
            let count = inner.tasks.len();
            inner.tasks.clear();
            count
        };
        if dropped > 0 {
            log::info!("Detached {} running generation task(s)", dropped);
        }
    }

    fn remove_if_current(&self, key: &K, epoch: u64) {
        let mut inner = self.lock();
        if inner.tasks.get(key).map(|e| e.epoch) == Some(epoch) {
            inner.tasks.remove(key);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner<K, T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned by the code running a task. Finishing it publishes the outcome and
/// unregisters the key; dropping it unfinished fails the task.
pub struct TaskGuard<K, T>
where
    K: Eq + Hash,
{
    registry: TaskRegistry<K, T>,
    key: K,
    epoch: u64,
    sender: watch::Sender<TaskState<T>>,
    finished: bool,
}

impl<K, T> TaskGuard<K, T>
where
    K: Clone + Eq + Hash + Debug,
    T: Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// False once the registry was cleared or the key re-registered
    pub fn is_current(&self) -> bool {
        self.registry.is_current(&self.key, self.epoch)
    }

    pub fn complete(mut self, value: T) {
        self.finish(TaskState::Done(value));
    }

    pub fn fail(mut self, error: GenerationError) {
        self.finish(TaskState::Failed(error));
    }

    fn finish(&mut self, state: TaskState<T>) {
        self.finished = true;
        self.sender.send_replace(state);
        self.registry.remove_if_current(&self.key, self.epoch);
    }
}

impl<K, T> Drop for TaskGuard<K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.sender
            .send_replace(TaskState::Failed(GenerationError::Interrupted));

        let mut inner = self.registry.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.tasks.get(&self.key).map(|e| e.epoch) == Some(self.epoch) {
            inner.tasks.remove(&self.key);
        }
    }
}

/// Waits for the outcome of a task
pub struct TaskWaiter<T> {
    state: watch::Receiver<TaskState<T>>,
}

impl<T: Clone> TaskWaiter<T> {
    pub async fn wait(mut self) -> GenerationResult<T> {
        loop {
            if let Some(outcome) = Self::outcome(&self.state.borrow_and_update()) {
                return outcome;
            }
            if self.state.changed().await.is_err() {
                return Self::outcome(&self.state.borrow())
                    .unwrap_or(Err(GenerationError::Interrupted));
            }
        }
    }

    fn outcome(state: &TaskState<T>) -> Option<GenerationResult<T>> {
        match state {
            TaskState::Running => None,
            TaskState::Done(value) => Some(Ok(value.clone())),
            TaskState::Failed(error) => Some(Err(error.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(registration: Registration<&'static str, u32>) -> (TaskGuard<&'static str, u32>, TaskWaiter<u32>) {
        match registration {
            Registration::Started { guard, waiter } => (guard, waiter),
            _ => panic!("expected a new task"),
        }
    }

    #[tokio::test]
    async fn test_second_request_joins() {
        let registry: TaskRegistry<&str, u32> = TaskRegistry::new();
        let (guard, first) = started(registry.begin_with("core", || Ok(None)).unwrap());

        let second = match registry.begin_with("core", || panic!("probe must not run")).unwrap() {
            Registration::Joined(waiter) => waiter,
            _ => panic!("expected to join"),
        };
        assert!(registry.is_running(&"core"));

        guard.complete(7);

        assert_eq!(first.wait().await, Ok(7));
        assert_eq!(second.wait().await, Ok(7));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_probe_hit_registers_nothing() {
        let registry: TaskRegistry<&str, u32> = TaskRegistry::new();
        match registry.begin_with("core", || Ok(Some(3))).unwrap() {
            Registration::Cached(value) => assert_eq!(value, 3),
            _ => panic!("expected cache hit"),
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_clears_key() {
        let registry: TaskRegistry<&str, u32> = TaskRegistry::new();
        let (guard, waiter) = started(registry.begin_with("core", || Ok(None)).unwrap());
        let joined = registry.join(&"core").unwrap();

        guard.fail(GenerationError::Transport("reset by peer".into()));

        assert_eq!(waiter.wait().await, Err(GenerationError::Transport("reset by peer".into())));
        assert_eq!(joined.wait().await, Err(GenerationError::Transport("reset by peer".into())));

        // retry is a fresh attempt
        assert!(matches!(
            registry.begin_with("core", || Ok(None)).unwrap(),
            Registration::Started { .. }
        ));
    }

    #[tokio::test]
    async fn test_dropped_guard_interrupts_waiters() {
        let registry: TaskRegistry<&str, u32> = TaskRegistry::new();
        let (guard, waiter) = started(registry.begin_with("core", || Ok(None)).unwrap());

        drop(guard);

        assert_eq!(waiter.wait().await, Err(GenerationError::Interrupted));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_clear_makes_tasks_stale() {
        let registry: TaskRegistry<&str, u32> = TaskRegistry::new();
        let (old_guard, old_waiter) = started(registry.begin_with("core", || Ok(None)).unwrap());
        assert!(old_guard.is_current());

        registry.clear();
        assert!(!old_guard.is_current());

        let (new_guard, _) = started(registry.begin_with("core", || Ok(None)).unwrap());
        assert!(new_guard.epoch() > old_guard.epoch());

        // finishing the stale task leaves the new registration alone
        old_guard.complete(1);
        assert_eq!(old_waiter.wait().await, Ok(1));
        assert!(new_guard.is_current());
    }
}
