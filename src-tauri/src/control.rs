//! Foreground side of a run: owns the run state, starts and stops the
//! background loop, and turns its progress into status lines.

use log::Level;
use std::any::Any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::automation::desktop::Desktop;
use crate::automation::events::{ProgressEvent, RunSummary, StopReason};
use crate::automation::orchestrator::{Orchestrator, RunPlan};
use crate::error::Result;
use crate::settings::Settings;
use crate::state::{ControlSignal, RunFlag, RunState, RunTrigger};
use crate::status::{StatusLine, StatusLog, StatusSink};
use crate::system::clipboard::ArboardClipboard;
use crate::system::input::EnigoDriver;

/// Starts the background loop for a plan. It must eventually send exactly one
/// `ProgressEvent::Finished`.
pub trait RunLauncher: Send + Sync {
    fn launch(
        &self,
        plan: RunPlan,
        flag: RunFlag,
        events: UnboundedSender<ProgressEvent>,
    ) -> Result<()>;
}

/// Something the sink has to be told once the controller lock is released.
enum Notice {
    Line(StatusLine),
    State(RunState),
    Finished(StopReason, RunSummary),
    Alert(String),
}

impl Notice {
    fn deliver(self, sink: &dyn StatusSink) {
        match self {
            Notice::Line(line) => sink.publish(&line),
            Notice::State(state) => sink.run_state_changed(state),
            Notice::Finished(reason, summary) => sink.run_finished(&reason, &summary),
            Notice::Alert(message) => sink.alert(&message),
        }
    }
}

pub struct Controller {
    state: RunState,
    flag: RunFlag,
    log: StatusLog,
    outbox: Vec<Notice>,
    launcher: Arc<dyn RunLauncher>,
    events: UnboundedSender<ProgressEvent>,
    snapshot_path: Option<PathBuf>,
}

impl Controller {
    pub fn new(
        launcher: Arc<dyn RunLauncher>,
        events: UnboundedSender<ProgressEvent>,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            state: RunState::Idle,
            flag: RunFlag::new(),
            log: StatusLog::default(),
            outbox: Vec::new(),
            launcher,
            events,
            snapshot_path,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn status_lines(&self) -> Vec<StatusLine> {
        self.log.lines()
    }

    /// Start a run from the current settings. `Ok(false)` when one is already
    /// active; `Err` when a precondition is not met.
    pub fn start(&mut self, settings: &Settings) -> Result<bool> {
        if !self.state.is_idle() {
            self.status(Level::Info, "Translation is already running");
            return Ok(false);
        }

        let plan = match RunPlan::from_settings(settings, self.snapshot_path.clone()) {
            Ok(plan) => plan,
            Err(e) => {
                let message = e.to_string();
                self.status(Level::Error, message.clone());
                self.outbox.push(Notice::Alert(message));
                return Err(e);
            }
        };

        self.flag.raise();
        self.apply(RunTrigger::Start);
        if let Err(e) = self
            .launcher
            .launch(plan, self.flag.clone(), self.events.clone())
        {
            self.flag.lower();
            self.status(Level::Error, format!("Failed to start translation: {}", e));
            self.apply(RunTrigger::Stop);
            self.apply(RunTrigger::LoopExited);
            return Err(e);
        }
        Ok(true)
    }

    /// Ask the running loop to stop at its next checkpoint. Returns false
    /// when nothing is running.
    pub fn stop(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        self.flag.lower();
        self.apply(RunTrigger::Stop);
        self.status(Level::Info, "Stop requested, finishing current step");
        true
    }

    pub fn on_progress(&mut self, event: ProgressEvent) {
        let (level, message) = event.describe();
        self.status(level, message);

        if let ProgressEvent::Finished { reason, summary } = event {
            self.flag.lower();
            // A natural end arrives while still Running.
            self.apply(RunTrigger::Stop);
            self.apply(RunTrigger::LoopExited);
            self.outbox.push(Notice::Finished(reason, summary));
        }
    }

    fn apply(&mut self, trigger: RunTrigger) {
        if let Some(next) = self.state.next(trigger) {
            log::debug!("run state {:?} -> {:?}", self.state, next);
            self.state = next;
            self.outbox.push(Notice::State(next));
        }
    }

    fn status(&mut self, level: Level, message: impl Into<String>) {
        let line = StatusLine::now(level, message);
        log::log!(level, "{}", line.message);
        self.outbox.push(Notice::Line(line.clone()));
        self.log.push(line);
    }
}

/// The controller shared between the control loop, the commands and
/// shutdown. The sink is only called after the lock is released: the tray
/// and dialogs hop to the main thread, which may itself be waiting on the lock.
pub struct ControlHandle {
    controller: Mutex<Controller>,
    sink: Arc<dyn StatusSink>,
}

impl ControlHandle {
    pub fn new(controller: Controller, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            controller: Mutex::new(controller),
            sink,
        }
    }

    /// Run `f` on the locked controller, then hand what it produced to the sink.
    pub fn with<R>(&self, f: impl FnOnce(&mut Controller) -> R) -> R {
        let (result, notices) = {
            let mut controller = lock(&self.controller);
            let result = f(&mut controller);
            (result, mem::take(&mut controller.outbox))
        };
        for notice in notices {
            notice.deliver(self.sink.as_ref());
        }
        result
    }

    pub fn start(&self, settings: &Settings) -> Result<bool> {
        self.with(|c| c.start(settings))
    }

    pub fn stop(&self) -> bool {
        self.with(Controller::stop)
    }

    pub fn on_progress(&self, event: ProgressEvent) {
        self.with(|c| c.on_progress(event))
    }

    pub fn state(&self) -> RunState {
        lock(&self.controller).state()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.controller).is_running()
    }

    pub fn status_lines(&self) -> Vec<StatusLine> {
        lock(&self.controller).status_lines()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Consumes control signals (hotkeys, tray) and background progress until
/// both channels close.
pub async fn run_control_loop(
    control: Arc<ControlHandle>,
    settings: Arc<Mutex<Settings>>,
    mut signals: UnboundedReceiver<ControlSignal>,
    mut progress: UnboundedReceiver<ProgressEvent>,
) {
    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(ControlSignal::Start) => {
                    let settings = lock(&settings).clone();
                    // Refusals are already reported through the status sink.
                    let _ = control.start(&settings);
                }
                Some(ControlSignal::Stop) => {
                    control.stop();
                }
                None => break,
            },
            event = progress.recv() => match event {
                Some(event) => control.on_progress(event),
                None => break,
            },
        }
    }
    log::debug!("control loop exited");
}

/// Runs the orchestrator on a dedicated thread against the real desktop.
pub struct DesktopLauncher;

impl RunLauncher for DesktopLauncher {
    fn launch(
        &self,
        plan: RunPlan,
        flag: RunFlag,
        events: UnboundedSender<ProgressEvent>,
    ) -> Result<()> {
        thread::Builder::new()
            .name("translation-loop".to_string())
            .spawn(move || {
                let panic_events = events.clone();
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| run_on_desktop(plan, flag, events)));
                if let Err(payload) = outcome {
                    let message = panic_message(payload.as_ref());
                    log::error!("Translation loop panicked: {}", message);
                    let _ = panic_events.send(ProgressEvent::Finished {
                        reason: StopReason::Faulted(message),
                        summary: RunSummary::default(),
                    });
                }
            })?;
        Ok(())
    }
}

fn run_on_desktop(plan: RunPlan, flag: RunFlag, events: UnboundedSender<ProgressEvent>) {
    let desktop = match open_desktop(&plan, flag) {
        Ok(desktop) => desktop,
        Err(e) => {
            let _ = events.send(ProgressEvent::Finished {
                reason: StopReason::Faulted(e.to_string()),
                summary: RunSummary::default(),
            });
            return;
        }
    };
    Orchestrator::new(plan, desktop, events).run();
}

fn open_desktop(plan: &RunPlan, flag: RunFlag) -> Result<Desktop> {
    Ok(Desktop::new(
        Box::new(EnigoDriver::new()?),
        Box::new(ArboardClipboard::new()?),
        flag,
        plan.action_delay,
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
