use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::automation::copy_method::ResultCopier;
use crate::automation::desktop::Desktop;
use crate::automation::events::{preview, ProgressEvent, RunSummary, StopReason};
use crate::automation::newline::NewlineCodec;
use crate::automation::validator::{ConsistencyValidator, ScrollGesture, ValidationPolicy};
use crate::coordinates::{CoordinatePoint, CoordinateRole};
use crate::error::Result;
use crate::settings::Settings;
use crate::system::clipboard::{ClipboardMonitor, SnapshotKind, SnapshotStore};
use crate::system::input::KeyChord;

/// Consecutive observations of one source text that end the run.
pub const SAME_SOURCE_LIMIT: u32 = 3;

/// Pause after moving to the next entry.
const NEXT_FIELD_DELAY: Duration = Duration::from_millis(50);

/// Everything a run needs, resolved from settings before it starts.
#[derive(Debug)]
pub struct RunPlan {
    pub source_field: CoordinatePoint,
    pub target_field: CoordinatePoint,
    pub service_input: CoordinatePoint,
    pub copier: Box<dyn ResultCopier>,
    pub policy: ValidationPolicy,
    pub skip_translated: bool,
    pub newline: NewlineCodec,
    pub action_delay: Duration,
    pub next_field_delay: Duration,
    pub max_consecutive_failures: u32,
    pub snapshots: Option<SnapshotStore>,
}

impl RunPlan {
    /// Fails with `MissingCoordinates` listing every unset point the settings need.
    pub fn from_settings(settings: &Settings, snapshot_path: Option<PathBuf>) -> Result<Self> {
        let coordinates = &settings.coordinates;
        coordinates.ensure(&settings.required_roles())?;

        let gesture = if settings.use_gesture {
            Some(ScrollGesture {
                anchor: coordinates.require(CoordinateRole::GestureAnchor)?,
                distance: settings.gesture_distance,
                settle: Duration::from_millis(settings.gesture_wait_ms),
            })
        } else {
            None
        };

        Ok(Self {
            source_field: coordinates.require(CoordinateRole::SourceField)?,
            target_field: coordinates.require(CoordinateRole::TargetField)?,
            service_input: coordinates.require(CoordinateRole::ServiceInput)?,
            copier: settings.copy_method.strategy(coordinates)?,
            policy: ValidationPolicy {
                settle: Duration::from_millis(settings.translation_wait_ms),
                max_attempts: settings.poll_attempts,
                interval: Duration::from_millis(settings.poll_interval_ms),
                consistency_check: settings.consistency_check,
                gesture,
            },
            skip_translated: settings.skip_translated,
            newline: NewlineCodec::new(settings.newline_conversion),
            action_delay: Duration::from_millis(settings.action_delay_ms),
            next_field_delay: NEXT_FIELD_DELAY,
            max_consecutive_failures: settings.max_consecutive_failures.max(1),
            snapshots: snapshot_path
                .filter(|_| settings.clipboard_snapshots)
                .map(SnapshotStore::new),
        })
    }
}

/// Per-iteration record, carried across fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSession {
    pub source_text: String,
    pub target_text_before: String,
    /// How many iterations in a row saw the same source as the one before.
    pub repeat_count: u32,
    pub last_translated: Option<String>,
}

impl FieldSession {
    /// Record a new source observation and return the repeat count.
    pub fn observe_source(&mut self, source: &str) -> u32 {
        if source == self.source_text {
            self.repeat_count += 1;
        } else {
            self.repeat_count = 0;
            self.source_text = source.to_string();
        }
        self.repeat_count
    }
}

enum FieldStep {
    Translated,
    Skipped,
    Repeated,
    Failed(String),
    Finished(StopReason),
}

/// The per-field state machine. Runs on its own thread until a stop condition.
pub struct Orchestrator {
    plan: RunPlan,
    desktop: Desktop,
    events: UnboundedSender<ProgressEvent>,
    session: FieldSession,
    monitor: ClipboardMonitor,
    summary: RunSummary,
}

impl Orchestrator {
    pub fn new(plan: RunPlan, desktop: Desktop, events: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            plan,
            desktop,
            events,
            session: FieldSession::default(),
            monitor: ClipboardMonitor::new(),
            summary: RunSummary::default(),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        // The foreground may already be gone during shutdown.
        let _ = self.events.send(event);
    }

    pub fn run(mut self) -> (StopReason, RunSummary) {
        self.emit(ProgressEvent::info("Automatic translation started"));
        let mut consecutive_failures = 0u32;

        let reason = loop {
            if self.desktop.checkpoint().is_err() {
                break StopReason::StopRequested;
            }
            self.summary.fields += 1;
            let field = self.summary.fields;

            let step = match self.process_field(field) {
                Ok(step) => step,
                Err(e) if e.is_interrupted() => break StopReason::StopRequested,
                Err(e) => FieldStep::Failed(e.to_string()),
            };

            match step {
                FieldStep::Finished(reason) => break reason,
                FieldStep::Failed(reason) => {
                    self.summary.failed += 1;
                    consecutive_failures += 1;
                    self.emit(ProgressEvent::FieldFailed { field, reason });
                    if consecutive_failures >= self.plan.max_consecutive_failures {
                        break StopReason::TooManyFailures(consecutive_failures);
                    }
                }
                FieldStep::Translated => {
                    self.summary.translated += 1;
                    consecutive_failures = 0;
                }
                FieldStep::Skipped => {
                    self.summary.skipped += 1;
                    consecutive_failures = 0;
                }
                FieldStep::Repeated => {}
            }

            match self.next_field() {
                Ok(()) => {}
                Err(e) if e.is_interrupted() => break StopReason::StopRequested,
                Err(e) => self.emit(ProgressEvent::warn(format!(
                    "Failed to move to the next entry: {}",
                    e
                ))),
            }
        };

        if let Some(store) = &self.plan.snapshots {
            if let Some(snapshot) = store.load() {
                log::debug!(
                    "last clipboard snapshot: {:?} at {}",
                    snapshot.kind,
                    snapshot.captured_at
                );
            }
        }

        self.emit(ProgressEvent::Finished {
            reason: reason.clone(),
            summary: self.summary.clone(),
        });
        (reason, self.summary)
    }

    fn process_field(&mut self, field: usize) -> Result<FieldStep> {
        let source = self.desktop.copy_field(self.plan.source_field)?;
        if source.is_empty() {
            return Ok(FieldStep::Finished(StopReason::NoMoreContent));
        }

        let repeats = self.session.observe_source(&source);
        if repeats > 0 {
            let seen = repeats + 1;
            self.emit(ProgressEvent::info(format!(
                "Same source text seen again ({}/{})",
                seen, SAME_SOURCE_LIMIT
            )));
            if seen >= SAME_SOURCE_LIMIT {
                return Ok(FieldStep::Finished(StopReason::NaturalCompletion));
            }
            return Ok(FieldStep::Repeated);
        }

        let target = self.desktop.copy_field(self.plan.target_field)?;
        self.session.target_text_before = target;
        if self.plan.skip_translated && !self.session.target_text_before.trim().is_empty() {
            self.emit(ProgressEvent::FieldSkipped { field });
            return Ok(FieldStep::Skipped);
        }

        self.snapshot(&source, SnapshotKind::Source);
        self.monitor.update_last_content(&source);
        self.emit(ProgressEvent::info(format!("#{} translating: {}", field, preview(&source))));

        let outgoing = self.plan.newline.encode(&source);
        self.desktop.replace_field(self.plan.service_input, &outgoing)?;
        self.summary.dispatched += 1;

        let stale = self
            .session
            .last_translated
            .as_deref()
            .map(|text| self.plan.newline.encode(text));
        let result = ConsistencyValidator::new(&self.plan.policy, self.plan.copier.as_ref())
            .wait(&mut self.desktop, &outgoing, stale.as_deref())?;

        if !result.is_usable() {
            return Ok(FieldStep::Failed(format!(
                "no translation after {} attempts",
                result.attempts
            )));
        }
        if result.exhausted {
            self.emit(ProgressEvent::warn(format!(
                "#{} result not confirmed after {} attempts ({:?}), using it anyway",
                field, result.attempts, result.kind
            )));
        }
        if !self.monitor.is_content_changed(&result.text) {
            log::debug!("#{} result equals the source text", field);
        }

        let translation = self.plan.newline.decode(&result.text);
        self.desktop.replace_field(self.plan.target_field, &translation)?;
        self.snapshot(&translation, SnapshotKind::Target);
        self.session.last_translated = Some(translation.clone());
        self.emit(ProgressEvent::FieldTranslated {
            field,
            source,
            translation,
            best_effort: result.exhausted,
        });
        Ok(FieldStep::Translated)
    }

    /// Focus Poedit, then jump to the next entry.
    fn next_field(&mut self) -> Result<()> {
        self.desktop.click(self.plan.source_field, 1)?;
        self.desktop.chord(KeyChord::NextField)?;
        self.desktop.wait(self.plan.next_field_delay)
    }

    fn snapshot(&self, content: &str, kind: SnapshotKind) {
        if let Some(store) = &self.plan.snapshots {
            if let Err(e) = store.save(content, kind) {
                log::warn!("Failed to save clipboard snapshot: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::copy_method::CopyMethod;
    use crate::automation::test_support::{FakeWorld, LagShows};
    use crate::error::Error;
    use tokio::sync::mpsc;

    fn run(world: &FakeWorld, settings: &Settings) -> (StopReason, RunSummary, Vec<ProgressEvent>) {
        let plan = RunPlan::from_settings(settings, None).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (reason, summary) = Orchestrator::new(plan, world.desktop(), tx).run();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (reason, summary, events)
    }

    #[test]
    fn repeated_source_ends_with_natural_completion() {
        let world = FakeWorld::with_sources(&["Hello", "Hello", "World", "World", "World"]);
        let mut settings = world.settings();
        settings.skip_translated = false;
        settings.poll_attempts = 5;
        settings.poll_interval_ms = 200;

        let (reason, summary, events) = run(&world, &settings);

        assert_eq!(reason, StopReason::NaturalCompletion);
        assert_eq!(summary.dispatched, 2);
        assert_eq!(world.dispatched(), vec!["Hello", "World"]);
        assert_eq!(world.target(0), "[fr] Hello");
        assert_eq!(world.target(1), "");
        assert_eq!(world.target(2), "[fr] World");
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Finished {
                reason: StopReason::NaturalCompletion,
                ..
            })
        ));
    }

    #[test]
    fn empty_source_means_no_more_content() {
        let world = FakeWorld::with_sources(&["One", "Two", ""]);
        let (reason, summary, _) = run(&world, &world.settings());
        assert_eq!(reason, StopReason::NoMoreContent);
        assert_eq!(summary.translated, 2);
        assert_eq!(world.target(1), "[fr] Two");
    }

    #[test]
    fn already_translated_fields_are_skipped_but_navigated() {
        let world = FakeWorld::with_sources(&["One", "Two", "Three", ""]);
        world.set_target(1, "Deux");
        let (reason, summary, events) = run(&world, &world.settings());

        assert_eq!(reason, StopReason::NoMoreContent);
        assert_eq!(world.dispatched(), vec!["One", "Three"]);
        assert_eq!(world.target(1), "Deux");
        assert_eq!(summary.skipped, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::FieldSkipped { field: 2 })));
    }

    #[test]
    fn skip_disabled_overwrites_existing_translation() {
        let world = FakeWorld::with_sources(&["One", ""]);
        world.set_target(0, "Uno");
        let mut settings = world.settings();
        settings.skip_translated = false;
        run(&world, &settings);
        assert_eq!(world.target(0), "[fr] One");
    }

    #[test]
    fn slow_service_output_is_awaited_and_stale_text_rejected() {
        let world = FakeWorld::with_sources(&["One", "Two", ""]);
        world.set_service_lag(2, LagShows::Previous);
        let (reason, summary, _) = run(&world, &world.settings());

        assert_eq!(reason, StopReason::NoMoreContent);
        assert_eq!(summary.translated, 2);
        // Field 2 saw the stale "[fr] One" twice before its own result.
        assert_eq!(world.target(1), "[fr] Two");
    }

    #[test]
    fn field_without_result_is_left_untouched() {
        let world = FakeWorld::with_sources(&["One", "Two", ""]);
        world.set_service_lag(100, LagShows::Blank);
        let mut settings = world.settings();
        settings.poll_attempts = 3;
        let (reason, summary, events) = run(&world, &settings);

        assert_eq!(reason, StopReason::NoMoreContent);
        assert_eq!(summary.failed, 2);
        assert_eq!(world.target(0), "");
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::FieldFailed { field: 1, .. })));
    }

    #[test]
    fn newline_conversion_round_trips_through_the_service() {
        let world = FakeWorld::with_sources(&["first line\nsecond line", ""]);
        let mut settings = world.settings();
        settings.newline_conversion = true;
        run(&world, &settings);

        assert_eq!(world.dispatched(), vec!["first line<br>second line"]);
        assert_eq!(world.target(0), "[fr] first line\nsecond line");
    }

    #[test]
    fn trailing_newline_survives_the_round_trip() {
        let world = FakeWorld::with_sources(&["Hello\n", ""]);
        let mut settings = world.settings();
        settings.newline_conversion = true;
        run(&world, &settings);

        assert_eq!(world.dispatched(), vec!["Hello<br>"]);
        assert_eq!(world.target(0), "[fr] Hello\n");
    }

    #[test]
    fn surrounding_whitespace_is_kept() {
        let world = FakeWorld::with_sources(&["  One ", " ", "Two", ""]);
        let (reason, summary, _) = run(&world, &world.settings());

        // A whitespace-only entry is still content, not the end of the catalog.
        assert_eq!(reason, StopReason::NoMoreContent);
        assert_eq!(summary.dispatched, 3);
        assert_eq!(world.dispatched(), vec!["  One ", " ", "Two"]);
        assert_eq!(world.target(0), "[fr]   One ");
        assert_eq!(world.target(2), "[fr] Two");
    }

    #[test]
    fn echoed_source_is_not_taken_as_the_result() {
        let world = FakeWorld::with_sources(&["One", "Two", ""]);
        world.set_service_lag(2, LagShows::Echo);
        let (reason, summary, _) = run(&world, &world.settings());

        assert_eq!(reason, StopReason::NoMoreContent);
        assert_eq!(summary.translated, 2);
        assert_eq!(world.target(0), "[fr] One");
        assert_eq!(world.target(1), "[fr] Two");
    }

    #[test]
    fn every_copy_method_reads_the_service_output() {
        for method in [
            CopyMethod::SelectAll,
            CopyMethod::DoubleClick,
            CopyMethod::TripleClick,
        ] {
            let world = FakeWorld::with_sources(&["One", "Two", ""]);
            world.set_service_lag(1, LagShows::Echo);
            let mut settings = world.settings();
            settings.copy_method = method;
            let (reason, summary, _) = run(&world, &settings);

            assert_eq!(reason, StopReason::NoMoreContent, "{}", method);
            assert_eq!(summary.translated, 2, "{}", method);
            assert_eq!(world.target(0), "[fr] One", "{}", method);
            assert_eq!(world.target(1), "[fr] Two", "{}", method);
        }
    }

    #[test]
    fn transient_failure_skips_field_and_continues() {
        let world = FakeWorld::with_sources(&["One", "Two", ""]);
        world.fail_next_copies(1);
        let (reason, summary, _) = run(&world, &world.settings());

        assert_eq!(reason, StopReason::NoMoreContent);
        assert_eq!(summary.failed, 1);
        assert_eq!(world.target(0), "");
        assert_eq!(world.target(1), "[fr] Two");
    }

    #[test]
    fn persistent_failures_end_the_run() {
        let world = FakeWorld::with_sources(&["One", "Two", "Three"]);
        world.fail_next_copies(u32::MAX);
        let mut settings = world.settings();
        settings.max_consecutive_failures = 3;
        let (reason, summary, _) = run(&world, &settings);

        assert_eq!(reason, StopReason::TooManyFailures(3));
        assert_eq!(summary.dispatched, 0);
    }

    #[test]
    fn lowering_the_flag_stops_mid_run_without_rollback() {
        let world = FakeWorld::with_sources(&["One", "Two", "Three", "Four", ""]);
        world.stop_after_dispatches(2);
        let (reason, summary, _) = run(&world, &world.settings());

        assert_eq!(reason, StopReason::StopRequested);
        assert_eq!(summary.dispatched, 2);
        assert_eq!(world.target(0), "[fr] One");
        // Second text reached the service, its result was never written.
        assert_eq!(world.target(1), "");
    }

    #[test]
    fn plan_requires_mode_specific_coordinates() {
        let world = FakeWorld::with_sources(&["One"]);
        let mut settings = world.settings();
        settings.use_gesture = true;
        settings.coordinates.gesture_anchor = None;
        match RunPlan::from_settings(&settings, None) {
            Err(Error::MissingCoordinates(missing)) => {
                assert_eq!(missing, vec![CoordinateRole::GestureAnchor])
            }
            other => panic!("unexpected plan result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn session_counts_consecutive_repeats() {
        let mut session = FieldSession::default();
        assert_eq!(session.observe_source("a"), 0);
        assert_eq!(session.observe_source("a"), 1);
        assert_eq!(session.observe_source("b"), 0);
        assert_eq!(session.observe_source("b"), 1);
        assert_eq!(session.observe_source("b"), 2);
    }
}
