#![forbid(unsafe_code)]

//! Drives an [`EditorController`] against real collaborators.
//!
//! The runner executes the controller's effects: renders go straight to the
//! preview, store and generator calls run on short-lived worker threads and
//! their results come back over a channel as [`EditorMsg`]s. The caller owns
//! the loop and calls [`EditorRunner::tick`] regularly so auto-save can fire.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Worker cannot be spawned | Thread limit, out of memory | Task's failure message dispatched at once |
//! | Worker panics | Bug in a store or generator | Failure message dispatched when reaped |
//!
//! Every task carries the message that reports its failure, so the
//! controller never waits on a result that cannot arrive.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::controller::{Effect, EditorController, EditorMsg};
use crate::generator::ContentGenerator;
use crate::preview::PreviewRenderer;
use crate::store::{StoreError, ThemeStore};

/// How long `wait_idle` blocks on the channel before re-checking workers.
const POLL: Duration = Duration::from_millis(10);

/// Builds the message reporting that a task produced no result.
type FailureMsg = Box<dyn FnOnce(StoreError) -> EditorMsg + Send>;

struct PendingTask {
    name: &'static str,
    handle: JoinHandle<()>,
    on_failure: FailureMsg,
}

pub struct EditorRunner {
    controller: EditorController,
    store: Arc<dyn ThemeStore>,
    generator: Option<Arc<dyn ContentGenerator>>,
    preview: Box<dyn PreviewRenderer>,
    task_sender: mpsc::Sender<EditorMsg>,
    task_receiver: mpsc::Receiver<EditorMsg>,
    tasks: Vec<PendingTask>,
}

impl EditorRunner {
    pub fn new(
        controller: EditorController,
        store: Arc<dyn ThemeStore>,
        preview: Box<dyn PreviewRenderer>,
    ) -> Self {
        let (task_sender, task_receiver) = mpsc::channel();
        Self {
            controller,
            store,
            generator: None,
            preview,
            task_sender,
            task_receiver,
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn controller(&self) -> &EditorController {
        &self.controller
    }

    /// Number of store or generator calls still running.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Feed one message to the controller and execute what it asks for.
    pub fn dispatch(&mut self, msg: EditorMsg) {
        let effects = self.controller.update(msg, Instant::now());
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Apply finished task results, then advance the controller's clock.
    pub fn tick(&mut self) {
        self.process_task_results();
        self.reap_finished_tasks();
        self.dispatch(EditorMsg::Tick);
    }

    /// Apply every task result that has arrived. Returns how many.
    pub fn process_task_results(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.task_receiver.try_recv() {
            self.dispatch(msg);
            handled += 1;
        }
        handled
    }

    /// Block until no task is running and every result has been applied.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_task_results();
            self.reap_finished_tasks();
            if self.tasks.is_empty() {
                // A task may have finished between the drain and the reap.
                if self.process_task_results() == 0 && self.tasks.is_empty() {
                    return true;
                }
                continue;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // Short slices: a panicked worker never sends, only the reap sees it.
            match self.task_receiver.recv_timeout((deadline - now).min(POLL)) {
                Ok(msg) => self.dispatch(msg),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return true,
            }
        }
    }

    /// Close the editor and wait for running tasks to finish.
    ///
    /// Results that arrive after this are dropped by the controller.
    pub fn shutdown(mut self) {
        self.dispatch(EditorMsg::Shutdown);
        for task in self.tasks.drain(..) {
            let _ = task.handle.join();
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Render(tree) => self.preview.render(&tree),
            Effect::Load { theme_id } => {
                let store = Arc::clone(&self.store);
                tracing::debug!(store = store.name(), theme_id = %theme_id, "spawning load");
                self.spawn_task(
                    "load",
                    move || EditorMsg::Loaded(store.load(&theme_id)),
                    Box::new(|error| EditorMsg::Loaded(Err(error))),
                );
            }
            Effect::Save {
                theme_id,
                params,
                revision,
            } => {
                let store = Arc::clone(&self.store);
                tracing::debug!(store = store.name(), theme_id = %theme_id, revision, "spawning save");
                self.spawn_task(
                    "save",
                    move || EditorMsg::Saved {
                        revision,
                        result: store.save(&theme_id, &params),
                    },
                    Box::new(move |error| EditorMsg::Saved {
                        revision,
                        result: Err(error),
                    }),
                );
            }
            Effect::Generate {
                product_id,
                product,
                params,
            } => match &self.generator {
                Some(generator) => {
                    let generator = Arc::clone(generator);
                    let failed_id = product_id.clone();
                    self.spawn_task(
                        "generate",
                        move || {
                            let result = generator.generate_product_page(&product, &params);
                            EditorMsg::Generated { product_id, result }
                        },
                        Box::new(move |error| EditorMsg::Generated {
                            product_id: failed_id,
                            result: Err(error),
                        }),
                    );
                }
                None => self.dispatch(EditorMsg::Generated {
                    product_id,
                    result: Err(StoreError::Unavailable(
                        "no content generator configured".into(),
                    )),
                }),
            },
        }
    }

    fn spawn_task<F>(&mut self, name: &'static str, task: F, on_failure: FailureMsg)
    where
        F: FnOnce() -> EditorMsg + Send + 'static,
    {
        let sender = self.task_sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("pagesmith-{name}"))
            .spawn(move || {
                let _ = sender.send(task());
            });
        self.track_task(name, spawned, on_failure);
    }

    fn track_task(
        &mut self,
        name: &'static str,
        spawned: io::Result<JoinHandle<()>>,
        on_failure: FailureMsg,
    ) {
        match spawned {
            Ok(handle) => self.tasks.push(PendingTask {
                name,
                handle,
                on_failure,
            }),
            Err(error) => {
                tracing::error!(task = name, error = %error, "failed to spawn task");
                let reason = format!("could not start {name} task: {error}");
                self.dispatch(on_failure(StoreError::Unavailable(reason)));
            }
        }
    }

    fn reap_finished_tasks(&mut self) {
        let mut i = 0;
        while i < self.tasks.len() {
            if !self.tasks[i].handle.is_finished() {
                i += 1;
                continue;
            }
            let task = self.tasks.swap_remove(i);
            if task.handle.join().is_err() {
                tracing::warn!(task = task.name, "editor task panicked");
                let reason = format!("{} task panicked", task.name);
                self.dispatch((task.on_failure)(StoreError::Unavailable(reason)));
            }
        }
    }
}
