//! Task lifecycle state machine.
//!
//! [`Tracker`] is the single logical actor owning the active task and the
//! paused collection. It keeps nothing in memory between calls: each command
//! loads [`TrackerState`] from the store, mutates it, and writes it back
//! before returning, so a process killed between commands loses nothing.
//!
//! ```text
//!            start                 pause
//!   (none) ---------> Active ----------------> Paused
//!                      |   ^                    |
//!                      |   +------ resume ------+
//!                  end |                        | delete
//!                      v                        v
//!                  Terminated (synced)     Terminated (dropped)
//! ```
//!
//! Starting or resuming while another task is active pauses that task first.
//! The pause and the new active task are written in the same store call, so a
//! failed write leaves the previous state untouched.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ports::{Clock, NoTab, SystemClock, TabSource};
use crate::session::{ActiveState, Flush, SessionPointer};
use crate::snapshot::Snapshot;
use crate::store::{Entries, FOREGROUND_TAB_KEY, StateStore, StoreError, TrackerState};
use crate::sync::{Delivery, DisabledSync, SyncPayload, SyncPolicy, SyncSink, TaskSummary, deliver};
use crate::observer::TabEvent;
use crate::task::Task;
use crate::types::{TaskName, ValidationError};

/// Command failures. None of these leave partially applied state behind.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no active task")]
    NoActiveTask,
    #[error("task not found: {name}")]
    TaskNotFound { name: String },
    #[error("task already exists: {name}")]
    DuplicateTask { name: String },
}

/// Result of ending a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndReport {
    pub summary: TaskSummary,
    pub payload: SyncPayload,
    pub delivery: Delivery,
}

/// The task tracking service.
pub struct Tracker<S> {
    store: S,
    clock: Box<dyn Clock>,
    tabs: Box<dyn TabSource>,
    sync: Box<dyn SyncSink>,
    sync_policy: SyncPolicy,
}

impl<S> std::fmt::Debug for Tracker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("sync_policy", &self.sync_policy)
            .finish_non_exhaustive()
    }
}

impl<S: StateStore> Tracker<S> {
    /// Creates a tracker over `store` using the wall clock, no foreground
    /// tab, and sync turned off.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Box::new(SystemClock),
            tabs: Box::new(NoTab),
            sync: Box::new(DisabledSync),
            sync_policy: SyncPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_tab_source(mut self, tabs: impl TabSource + 'static) -> Self {
        self.tabs = Box::new(tabs);
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: impl SyncSink + 'static) -> Self {
        self.sync = Box::new(sync);
        self
    }

    #[must_use]
    pub const fn with_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.sync_policy = policy;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn load(&self) -> Result<TrackerState, StoreError> {
        TrackerState::load(&self.store)
    }

    fn save(&mut self, state: &TrackerState) -> Result<(), StoreError> {
        state.save(&mut self.store)
    }

    fn foreground_url(&self) -> String {
        self.tabs.active_tab().map(|tab| tab.url).unwrap_or_default()
    }

    /// Handles a raw tab event from the host.
    ///
    /// Records the foreground URL, then, if a task is active, counts a tab
    /// switch and flushes time to the previous URL. Returns the committed
    /// flush, if any.
    pub fn observe(&mut self, event: &TabEvent) -> Result<Option<Flush>, TrackerError> {
        let Some(url) = event.active_url() else {
            debug!(?event, "ignoring tab event");
            return Ok(None);
        };
        self.on_active_url_changed(url)
    }

    /// Normalized "foreground URL changed" event.
    pub fn on_active_url_changed(&mut self, url: &str) -> Result<Option<Flush>, TrackerError> {
        let mut entries = Entries::new();
        entries.insert(FOREGROUND_TAB_KEY.to_string(), url.into());
        self.retarget(url, true, entries)
    }

    /// Commits time spent on the current URL and starts attributing to
    /// `new_url`. A no-op when no task is active.
    pub fn flush_and_retarget(&mut self, new_url: &str) -> Result<Option<Flush>, TrackerError> {
        self.retarget(new_url, false, Entries::new())
    }

    fn retarget(
        &mut self,
        new_url: &str,
        count_switch: bool,
        mut entries: Entries,
    ) -> Result<Option<Flush>, TrackerError> {
        let mut state = self.load()?;
        let now = self.clock.now_ms();
        let flush = match state.active.as_mut() {
            Some(active) => {
                let flush = flush_logged(active, now);
                if count_switch {
                    active.task.tab_switches += 1;
                }
                active.retarget(new_url, now);
                debug!(task = %active.task.task_name, url = new_url, "retargeted session");
                entries.extend(state.to_entries()?);
                flush
            }
            None => None,
        };
        if !entries.is_empty() {
            self.store.set(entries)?;
        }
        Ok(flush)
    }

    /// Starts a new task, pausing the current one if any.
    ///
    /// Names must be unique across the active and paused tasks.
    pub fn start_task(&mut self, name: &str) -> Result<(), TrackerError> {
        let name = TaskName::new(name)?;
        let mut state = self.load()?;
        if state.contains(name.as_str()) {
            return Err(TrackerError::DuplicateTask {
                name: name.to_string(),
            });
        }
        let now = self.clock.now_ms();
        pause_active(&mut state, now);

        let pointer = SessionPointer::new(self.foreground_url(), now);
        info!(task = %name, url = %pointer.current_url, "task started");
        state.active = Some(ActiveState::new(Task::new(name, now), pointer));
        self.save(&state)?;
        Ok(())
    }

    /// Pauses the active task and returns its name.
    pub fn pause_task(&mut self) -> Result<TaskName, TrackerError> {
        let mut state = self.load()?;
        let name =
            pause_active(&mut state, self.clock.now_ms()).ok_or(TrackerError::NoActiveTask)?;
        self.save(&state)?;
        Ok(name)
    }

    /// Resumes a paused task, pausing the current one if any.
    pub fn resume_task(&mut self, name: &str) -> Result<(), TrackerError> {
        let name = TaskName::new(name)?;
        let mut state = self.load()?;
        let index = state
            .paused_position(name.as_str())
            .ok_or_else(|| TrackerError::TaskNotFound {
                name: name.to_string(),
            })?;
        // Taken out before the auto-pause appends to the collection.
        let mut task = state.paused.remove(index);
        let now = self.clock.now_ms();
        pause_active(&mut state, now);

        task.close_pause(now);
        let pointer = SessionPointer::new(self.foreground_url(), now);
        info!(task = %task.task_name, url = %pointer.current_url, "task resumed");
        state.active = Some(ActiveState::new(task, pointer));
        self.save(&state)?;
        Ok(())
    }

    /// Ends the active task: flushes, scores, clears local state, then hands
    /// the summary to the sync sink.
    ///
    /// Local state is cleared before delivery, so a sync failure never keeps
    /// the task around and a store failure never sends a summary twice.
    pub fn end_task(&mut self) -> Result<EndReport, TrackerError> {
        let mut state = self.load()?;
        let mut active = state.active.take().ok_or(TrackerError::NoActiveTask)?;
        let now = self.clock.now_ms();
        flush_logged(&mut active, now);
        self.save(&state)?;

        let summary = TaskSummary::from_task(active.task);
        let payload = SyncPayload::from(&summary);
        info!(
            task = %payload.task_name,
            duration_ms = payload.duration_ms,
            focus_score = payload.focus_score,
            domain = %payload.domain,
            "task ended"
        );
        let delivery = deliver(self.sync.as_ref(), &payload, self.sync_policy);
        Ok(EndReport {
            summary,
            payload,
            delivery,
        })
    }

    /// Discards a paused task without scoring or syncing it.
    pub fn delete_task(&mut self, name: &str) -> Result<Task, TrackerError> {
        let name = TaskName::new(name)?;
        let mut state = self.load()?;
        let index = state
            .paused_position(name.as_str())
            .ok_or_else(|| TrackerError::TaskNotFound {
                name: name.to_string(),
            })?;
        let task = state.paused.remove(index);
        self.save(&state)?;
        info!(task = %task.task_name, "task deleted");
        Ok(task)
    }

    /// Current stats with live session time folded in. Never fails; a store
    /// error yields an empty snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.try_snapshot().unwrap_or_else(|err| {
            warn!(error = %err, "failed to read state for snapshot");
            Snapshot::empty()
        })
    }

    pub fn try_snapshot(&self) -> Result<Snapshot, StoreError> {
        let state = self.load()?;
        Ok(Snapshot::project(&state, self.clock.now_ms()))
    }

    /// Host startup hook. Reseeds an active task's empty session pointer from
    /// the foreground tab without committing any time. Returns true if the
    /// pointer was reseeded.
    pub fn on_startup(&mut self) -> Result<bool, TrackerError> {
        let mut state = self.load()?;
        let Some(active) = state.active.as_mut() else {
            return Ok(false);
        };
        if !active.session_pointer.is_empty() {
            debug!(task = %active.task.task_name, "resuming session after restart");
            return Ok(false);
        }
        let url = self.foreground_url();
        if url.is_empty() {
            return Ok(false);
        }
        active.retarget(url, self.clock.now_ms());
        info!(task = %active.task.task_name, "reseeded session pointer after restart");
        self.save(&state)?;
        Ok(true)
    }
}

/// Moves the active task, if any, to the end of the paused collection.
///
/// Only mutates `state`; callers persist it together with whatever else the
/// command changes.
fn pause_active(state: &mut TrackerState, now_ms: i64) -> Option<TaskName> {
    let mut active = state.active.take()?;
    flush_logged(&mut active, now_ms);
    active.task.open_pause(now_ms);
    let name = active.task.task_name.clone();
    info!(
        task = %name,
        total_ms = active.task.total_active_time,
        "task paused"
    );
    state.paused.push(active.task);
    Some(name)
}

/// Flushes `active`, logging and skipping URLs without a usable hostname.
fn flush_logged(active: &mut ActiveState, now_ms: i64) -> Option<Flush> {
    match active.flush(now_ms) {
        Ok(Some(flush)) => {
            debug!(
                task = %active.task.task_name,
                host = %flush.hostname,
                elapsed_ms = flush.elapsed_ms,
                "flushed session time"
            );
            Some(flush)
        }
        Ok(None) => None,
        Err(err) => {
            debug!(task = %active.task.task_name, error = %err, "skipping flush");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::Value;

    use super::*;
    use crate::observer::TabStatus;
    use crate::ports::{ManualClock, SharedTab};
    use crate::store::{ACTIVE_TASK_KEY, MemoryStore, load_foreground_tab};
    use crate::sync::SyncFailure;

    #[derive(Clone, Default)]
    struct RecordingSink {
        payloads: Rc<RefCell<Vec<SyncPayload>>>,
        fail: bool,
    }

    impl SyncSink for RecordingSink {
        fn deliver(&self, payload: &SyncPayload) -> Result<(), SyncFailure> {
            self.payloads.borrow_mut().push(payload.clone());
            if self.fail {
                Err(SyncFailure::new("503 Service Unavailable"))
            } else {
                Ok(())
            }
        }
    }

    /// Store whose writes can be made to fail. Counts successful writes.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
        writes: usize,
    }

    impl StateStore for FlakyStore {
        fn get(&self, keys: &[&str]) -> Result<Entries, StoreError> {
            self.inner.get(keys)
        }

        fn set(&mut self, entries: Entries) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::backend(std::io::Error::other("quota exceeded")));
            }
            self.writes += 1;
            self.inner.set(entries)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    struct Harness {
        tracker: Tracker<MemoryStore>,
        clock: ManualClock,
        tab: SharedTab,
        sink: RecordingSink,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(1_700_000_000_000);
        let tab = SharedTab::new(Some("https://github.com/org/repo".to_string()));
        let sink = RecordingSink::default();
        let tracker = Tracker::new(MemoryStore::new())
            .with_clock(clock.clone())
            .with_tab_source(tab.clone())
            .with_sync(sink.clone());
        Harness {
            tracker,
            clock,
            tab,
            sink,
        }
    }

    fn names(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.task_name.as_str()).collect()
    }

    fn assert_single_active(tracker: &Tracker<MemoryStore>) {
        let state = TrackerState::load(tracker.store()).unwrap();
        if let Some(active) = &state.active {
            assert!(
                state.paused_position(active.task.task_name.as_str()).is_none(),
                "active task {} also paused",
                active.task.task_name
            );
        }
    }

    #[test]
    fn start_task_seeds_pointer_from_foreground_tab() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();

        let state = TrackerState::load(h.tracker.store()).unwrap();
        let active = state.active.unwrap();
        assert_eq!(active.task.task_name, "A");
        assert_eq!(active.task.start_timestamp, 1_700_000_000_000);
        assert_eq!(active.session_pointer.current_url, "https://github.com/org/repo");
        assert_eq!(active.session_pointer.session_start_time, 1_700_000_000_000);
    }

    #[test]
    fn start_task_without_foreground_tab_leaves_url_empty() {
        let mut h = harness();
        h.tab.clear();
        h.tracker.start_task("A").unwrap();
        h.clock.advance(60_000);
        h.tracker.pause_task().unwrap();

        let state = TrackerState::load(h.tracker.store()).unwrap();
        assert_eq!(state.paused[0].total_active_time, 0);
    }

    #[test]
    fn start_task_rejects_empty_name() {
        let mut h = harness();
        assert!(matches!(
            h.tracker.start_task("  "),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn pause_resume_round_trip_keeps_active_time() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.clock.advance(60_000);
        h.tracker.pause_task().unwrap();
        h.clock.advance(600_000);
        h.tracker.resume_task("A").unwrap();
        h.clock.advance(30_000);
        let report = h.tracker.end_task().unwrap();

        let task = &report.summary.task;
        assert_eq!(task.total_active_time, 90_000);
        assert_eq!(task.pause_intervals.len(), 1);
        assert_eq!(
            task.pause_intervals[0].resumed_at,
            Some(1_700_000_000_000 + 660_000)
        );
        assert_eq!(task.site_time["github.com"], 90_000);
    }

    #[test]
    fn pause_without_active_task_fails() {
        let mut h = harness();
        assert!(matches!(
            h.tracker.pause_task(),
            Err(TrackerError::NoActiveTask)
        ));
    }

    #[test]
    fn pause_appends_to_paused_collection_in_order() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.tracker.pause_task().unwrap();
        h.tracker.start_task("B").unwrap();
        h.tracker.pause_task().unwrap();

        let state = TrackerState::load(h.tracker.store()).unwrap();
        assert!(state.active.is_none());
        assert_eq!(names(&state.paused), vec!["A", "B"]);
        assert!(state.paused.iter().all(Task::is_paused));
    }

    #[test]
    fn starting_a_task_auto_pauses_the_active_one() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.clock.advance(5_000);
        h.tracker.start_task("B").unwrap();

        let state = TrackerState::load(h.tracker.store()).unwrap();
        assert_eq!(state.active.unwrap().task.task_name, "B");
        assert_eq!(names(&state.paused), vec!["A"]);
        assert_eq!(state.paused[0].pause_intervals.len(), 1);
        assert_eq!(state.paused[0].total_active_time, 5_000);
    }

    #[test]
    fn start_rejects_name_of_paused_task() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.tracker.start_task("B").unwrap();

        let before = TrackerState::load(h.tracker.store()).unwrap();
        assert!(matches!(
            h.tracker.start_task("A"),
            Err(TrackerError::DuplicateTask { ref name }) if name == "A"
        ));
        assert_eq!(TrackerState::load(h.tracker.store()).unwrap(), before);
    }

    #[test]
    fn start_rejects_name_of_active_task() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        assert!(matches!(
            h.tracker.start_task("A"),
            Err(TrackerError::DuplicateTask { .. })
        ));
        let state = TrackerState::load(h.tracker.store()).unwrap();
        assert!(state.paused.is_empty());
    }

    #[test]
    fn resume_pauses_the_active_task_first() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.tracker.start_task("B").unwrap();
        h.clock.advance(1_000);
        h.tracker.resume_task("A").unwrap();

        let state = TrackerState::load(h.tracker.store()).unwrap();
        let active = state.active.unwrap();
        assert_eq!(active.task.task_name, "A");
        assert!(!active.task.is_paused());
        assert_eq!(names(&state.paused), vec!["B"]);
        assert_eq!(state.paused[0].total_active_time, 1_000);
    }

    #[test]
    fn resume_unknown_task_fails_without_mutation() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        let before = TrackerState::load(h.tracker.store()).unwrap();

        assert!(matches!(
            h.tracker.resume_task("missing"),
            Err(TrackerError::TaskNotFound { ref name }) if name == "missing"
        ));
        assert_eq!(TrackerState::load(h.tracker.store()).unwrap(), before);
    }

    #[test]
    fn resume_reseeds_pointer_from_current_tab() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.tracker.pause_task().unwrap();
        h.tab.set("https://docs.rs/tokio");
        h.clock.advance(10_000);
        h.tracker.resume_task("A").unwrap();
        h.clock.advance(20_000);
        let report = h.tracker.end_task().unwrap();

        assert_eq!(report.summary.task.site_time.get("docs.rs"), Some(&20_000));
        assert_eq!(report.summary.task.site_time.get("github.com"), Some(&0));
    }

    #[test]
    fn at_most_one_active_task_across_command_sequences() {
        let mut h = harness();
        let steps: [(&str, Option<&str>); 9] = [
            ("start", Some("A")),
            ("start", Some("B")),
            ("resume", Some("A")),
            ("start", Some("C")),
            ("pause", None),
            ("resume", Some("B")),
            ("resume", Some("C")),
            ("start", Some("B")),
            ("resume", Some("A")),
        ];
        for (command, name) in steps {
            h.clock.advance(1_000);
            let _ = match (command, name) {
                ("start", Some(name)) => h.tracker.start_task(name),
                ("resume", Some(name)) => h.tracker.resume_task(name),
                _ => h.tracker.pause_task().map(|_| ()),
            };
            assert_single_active(&h.tracker);
        }
        let state = TrackerState::load(h.tracker.store()).unwrap();
        assert_eq!(state.paused.len() + usize::from(state.active.is_some()), 3);
    }

    #[test]
    fn end_task_syncs_payload_and_clears_state() {
        let mut h = harness();
        h.tracker.start_task("Write report").unwrap();
        h.clock.advance(400_000);
        h.tracker
            .on_active_url_changed("https://stackoverflow.com/q/1")
            .unwrap();
        h.clock.advance(100_000);
        let report = h.tracker.end_task().unwrap();

        assert!(report.delivery.is_delivered());
        let payloads = h.sink.payloads.borrow();
        assert_eq!(payloads.len(), 1);
        let payload = &payloads[0];
        assert_eq!(payload.task_name, "Write report");
        assert_eq!(payload.title, "Write report");
        assert_eq!(payload.domain, "github.com");
        assert_eq!(payload.duration_ms, 500_000);
        assert_eq!(payload.tab_switches, 1);
        assert_eq!(payload.timestamp, 1_700_000_000_000);
        assert_eq!(payload.focus_score, report.summary.focus_score);
        assert_eq!(
            report.summary.site_summary,
            [("github.com".to_string(), 400_000), ("other".to_string(), 100_000)]
                .into_iter()
                .collect()
        );

        let state = TrackerState::load(h.tracker.store()).unwrap();
        assert!(state.active.is_none());
        assert_eq!(h.tracker.store().raw(ACTIVE_TASK_KEY), Some(&Value::Null));
    }

    #[test]
    fn end_task_without_active_task_fails() {
        let mut h = harness();
        assert!(matches!(h.tracker.end_task(), Err(TrackerError::NoActiveTask)));
        assert!(h.sink.payloads.borrow().is_empty());
    }

    #[test]
    fn sync_failure_still_clears_state() {
        let clock = ManualClock::new(0);
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut tracker = Tracker::new(MemoryStore::new())
            .with_clock(clock.clone())
            .with_sync(sink.clone())
            .with_sync_policy(SyncPolicy::with_attempts(2));
        tracker.start_task("A").unwrap();
        clock.advance(1_000);
        let report = tracker.end_task().unwrap();

        assert!(matches!(report.delivery, Delivery::Failed { attempts: 2, .. }));
        assert_eq!(sink.payloads.borrow().len(), 2);
        assert!(!tracker.snapshot().is_tracking);
    }

    #[test]
    fn delete_does_not_sync() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.tracker.pause_task().unwrap();
        let deleted = h.tracker.delete_task("A").unwrap();

        assert_eq!(deleted.task_name, "A");
        assert!(h.sink.payloads.borrow().is_empty());
        let state = TrackerState::load(h.tracker.store()).unwrap();
        assert!(state.paused.is_empty());
    }

    #[test]
    fn delete_ignores_active_task() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        assert!(matches!(
            h.tracker.delete_task("A"),
            Err(TrackerError::TaskNotFound { .. })
        ));
        assert!(h.tracker.snapshot().is_tracking);
    }

    #[test]
    fn tab_events_count_switches_and_attribute_time() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.clock.advance(10_000);
        let flush = h
            .tracker
            .observe(&TabEvent::Activated {
                url: "https://docs.rs".to_string(),
            })
            .unwrap()
            .unwrap();
        assert_eq!(flush.hostname, "github.com");
        assert_eq!(flush.elapsed_ms, 10_000);

        h.clock.advance(5_000);
        h.tracker
            .observe(&TabEvent::Updated {
                url: "https://docs.rs/serde".to_string(),
                status: TabStatus::Complete,
                active: true,
            })
            .unwrap();
        // Loading events neither count nor flush.
        h.clock.advance(5_000);
        assert_eq!(
            h.tracker
                .observe(&TabEvent::Updated {
                    url: "https://x.com".to_string(),
                    status: TabStatus::Loading,
                    active: true,
                })
                .unwrap(),
            None
        );

        let state = TrackerState::load(h.tracker.store()).unwrap();
        let task = state.active.unwrap().task;
        assert_eq!(task.tab_switches, 2);
        assert_eq!(task.site_time["github.com"], 10_000);
        assert_eq!(task.site_time["docs.rs"], 5_000);
        assert_eq!(task.total_active_time, 15_000);
    }

    #[test]
    fn tab_events_without_active_task_only_record_foreground() {
        let mut h = harness();
        let flush = h
            .tracker
            .on_active_url_changed("https://example.com")
            .unwrap();
        assert_eq!(flush, None);
        assert_eq!(
            load_foreground_tab(h.tracker.store()).unwrap().as_deref(),
            Some("https://example.com")
        );
        assert!(TrackerState::load(h.tracker.store()).unwrap().active.is_none());
    }

    #[test]
    fn redundant_same_url_notifications_are_harmless() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        for _ in 0..3 {
            h.tracker
                .flush_and_retarget("https://github.com/org/repo")
                .unwrap();
        }
        h.clock.advance(2_000);
        h.tracker
            .flush_and_retarget("https://github.com/org/repo")
            .unwrap();
        let snapshot = h.tracker.snapshot();
        let live = snapshot.active_task.unwrap();
        assert_eq!(live.task().total_active_time, 2_000);
        assert_eq!(live.task().tab_switches, 0);
    }

    #[test]
    fn internal_pages_are_skipped_but_retargeted() {
        let mut h = harness();
        h.tab.set("chrome://newtab");
        h.tracker.start_task("A").unwrap();
        h.clock.advance(30_000);
        assert_eq!(
            h.tracker.flush_and_retarget("https://github.com").unwrap(),
            None
        );
        h.clock.advance(10_000);
        let report = h.tracker.end_task().unwrap();
        assert_eq!(report.summary.task.total_active_time, 10_000);
    }

    #[test]
    fn no_double_counting_across_flushes() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        let urls = [
            "https://github.com/a",
            "https://docs.rs",
            "chrome://history",
            "https://github.com/b",
            "https://crates.io",
        ];
        for (i, url) in urls.iter().enumerate() {
            h.clock.advance(1_000 * (i64::try_from(i).unwrap() + 1));
            h.tracker.on_active_url_changed(url).unwrap();
            let task = TrackerState::load(h.tracker.store())
                .unwrap()
                .active
                .unwrap()
                .task;
            assert_eq!(task.site_time.values().sum::<i64>(), task.total_active_time);
        }
    }

    #[test]
    fn negative_elapsed_never_subtracts_time() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.clock.advance(5_000);
        h.tracker.flush_and_retarget("https://github.com").unwrap();
        h.clock.advance(-60_000);
        h.tracker.flush_and_retarget("https://github.com").unwrap();
        let task = TrackerState::load(h.tracker.store())
            .unwrap()
            .active
            .unwrap()
            .task;
        assert_eq!(task.total_active_time, 5_000);
    }

    #[test]
    fn snapshot_adds_live_time_without_persisting() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.clock.advance(42_000);

        let snapshot = h.tracker.snapshot();
        let live = snapshot.active_task.unwrap();
        assert_eq!(live.task().total_active_time, 42_000);
        assert_eq!(live.live_delta_ms(), 42_000);

        let stored = TrackerState::load(h.tracker.store()).unwrap().active.unwrap();
        assert_eq!(stored.task.total_active_time, 0);
    }

    #[test]
    fn snapshot_on_empty_store_is_empty() {
        let h = harness();
        assert_eq!(h.tracker.snapshot(), Snapshot::empty());
    }

    #[test]
    fn store_failure_propagates_and_leaves_state_unchanged() {
        let clock = ManualClock::new(0);
        let mut tracker = Tracker::new(FlakyStore::default()).with_clock(clock.clone());
        tracker.start_task("A").unwrap();
        clock.advance(1_000);
        tracker.store.fail_writes = true;

        assert!(matches!(tracker.pause_task(), Err(TrackerError::Store(_))));
        let state = TrackerState::load(tracker.store()).unwrap();
        assert_eq!(state.active.unwrap().task.task_name, "A");
        assert!(state.paused.is_empty());
    }

    fn flaky_tracker(clock: &ManualClock) -> Tracker<FlakyStore> {
        Tracker::new(FlakyStore::default())
            .with_clock(clock.clone())
            .with_tab_source(SharedTab::new(Some("https://github.com".to_string())))
    }

    #[test]
    fn start_with_auto_pause_is_a_single_write() {
        let clock = ManualClock::new(0);
        let mut tracker = flaky_tracker(&clock);
        tracker.start_task("A").unwrap();
        let writes = tracker.store().writes;

        clock.advance(1_000);
        tracker.start_task("B").unwrap();
        assert_eq!(tracker.store().writes, writes + 1);

        clock.advance(1_000);
        tracker.resume_task("A").unwrap();
        assert_eq!(tracker.store().writes, writes + 2);
    }

    #[test]
    fn failed_start_keeps_previous_task_active() {
        let clock = ManualClock::new(0);
        let mut tracker = flaky_tracker(&clock);
        tracker.start_task("A").unwrap();
        clock.advance(1_000);
        let before = TrackerState::load(tracker.store()).unwrap();
        tracker.store.fail_writes = true;

        assert!(matches!(tracker.start_task("B"), Err(TrackerError::Store(_))));
        let after = TrackerState::load(tracker.store()).unwrap();
        assert_eq!(after, before);
        assert_eq!(after.active.unwrap().task.task_name, "A");
        assert!(after.paused.is_empty());
    }

    #[test]
    fn failed_resume_keeps_previous_task_active() {
        let clock = ManualClock::new(0);
        let mut tracker = flaky_tracker(&clock);
        tracker.start_task("A").unwrap();
        tracker.start_task("B").unwrap();
        clock.advance(1_000);
        let before = TrackerState::load(tracker.store()).unwrap();
        tracker.store.fail_writes = true;

        assert!(matches!(tracker.resume_task("A"), Err(TrackerError::Store(_))));
        let after = TrackerState::load(tracker.store()).unwrap();
        assert_eq!(after, before);
        assert_eq!(after.active.unwrap().task.task_name, "B");
        assert_eq!(names(&after.paused), vec!["A"]);
    }

    #[test]
    fn untrimmed_names_resolve_to_the_same_task() {
        let mut h = harness();
        h.tracker.start_task(" Write ").unwrap();
        h.tracker.pause_task().unwrap();

        assert!(matches!(
            h.tracker.start_task(" Write "),
            Err(TrackerError::DuplicateTask { ref name }) if name == "Write"
        ));
        h.tracker.resume_task(" Write ").unwrap();
        assert_eq!(
            h.tracker.snapshot().active_task.unwrap().task().task_name,
            "Write"
        );

        h.tracker.pause_task().unwrap();
        let deleted = h.tracker.delete_task("Write  ").unwrap();
        assert_eq!(deleted.task_name, "Write");
        assert!(!h.tracker.snapshot().is_tracking);
        assert!(h.tracker.snapshot().paused_tasks.is_empty());
    }

    #[test]
    fn resume_and_delete_reject_blank_names() {
        let mut h = harness();
        assert!(matches!(
            h.tracker.resume_task("   "),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            h.tracker.delete_task(""),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn zero_time_visit_does_not_count_as_a_site() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.tracker.pause_task().unwrap();
        h.tab.set("https://docs.rs");
        h.tracker.resume_task("A").unwrap();
        h.clock.advance(600_000);
        let report = h.tracker.end_task().unwrap();

        let task = &report.summary.task;
        assert_eq!(task.site_time.get("github.com"), Some(&0));
        assert_eq!(task.site_count(), 1);
        // One pause costs 5 points; no scatter penalty.
        assert_eq!(report.summary.focus_score, 95);
    }

    #[test]
    fn restart_recovers_active_task_from_store() {
        let mut h = harness();
        h.tracker.start_task("A").unwrap();
        h.clock.advance(20_000);
        h.tracker.flush_and_retarget("https://docs.rs").unwrap();
        let store = h.tracker.into_store();

        h.clock.advance(5_000);
        let restarted = Tracker::new(store).with_clock(h.clock.clone());
        let live = restarted.snapshot().active_task.unwrap();
        assert_eq!(live.task().task_name, "A");
        assert!(live.task().total_active_time >= 20_000);
        assert_eq!(live.task().total_active_time, 25_000);
    }

    #[test]
    fn startup_reseeds_only_empty_pointer() {
        let clock = ManualClock::new(0);
        let tab = SharedTab::default();
        let mut tracker = Tracker::new(MemoryStore::new())
            .with_clock(clock.clone())
            .with_tab_source(tab.clone());
        tracker.start_task("A").unwrap();
        assert!(!tracker.on_startup().unwrap());

        tab.set("https://github.com");
        clock.advance(3_000);
        assert!(tracker.on_startup().unwrap());
        assert!(!tracker.on_startup().unwrap());

        clock.advance(2_000);
        let live = tracker.snapshot().active_task.unwrap();
        assert_eq!(live.task().total_active_time, 2_000);
    }
}
