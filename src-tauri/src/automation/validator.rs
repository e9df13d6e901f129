//! Decides when the translation service's clipboard output is a genuinely new
//! result.
//!
//! Right before polling, the text that was sent is written back to the
//! clipboard. From then on "clipboard still equals the source" unambiguously
//! means the service has not produced anything yet.

use std::time::Duration;

use crate::automation::copy_method::ResultCopier;
use crate::automation::desktop::Desktop;
use crate::coordinates::CoordinatePoint;
use crate::error::Result;
use crate::system::clipboard::ClipboardMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Empty or whitespace only.
    Blank,
    /// Still the source text.
    Echo,
    /// The previous field's translation.
    Stale,
    Fresh,
}

pub fn classify(sample: &str, original: &str, last_translated: Option<&str>) -> SampleKind {
    let sample = sample.trim();
    if sample.is_empty() {
        SampleKind::Blank
    } else if sample == original.trim() {
        SampleKind::Echo
    } else if last_translated.is_some_and(|last| sample == last.trim()) {
        SampleKind::Stale
    } else {
        SampleKind::Fresh
    }
}

/// Press-drag-release that scrolls the service output into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollGesture {
    pub anchor: CoordinatePoint,
    /// Upward drag distance in pixels.
    pub distance: i32,
    pub settle: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Time the service gets to produce output before the first sample.
    pub settle: Duration,
    pub max_attempts: u32,
    pub interval: Duration,
    /// When off, the first non-blank sample is accepted as is.
    pub consistency_check: bool,
    pub gesture: Option<ScrollGesture>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub text: String,
    pub kind: SampleKind,
    /// Copy attempts made.
    pub attempts: u32,
    /// True when the budget ran out and `text` is only the last sample.
    pub exhausted: bool,
}

impl Validated {
    /// Whether the caller should write this text back at all.
    pub fn is_usable(&self) -> bool {
        self.kind != SampleKind::Blank
    }
}

pub struct ConsistencyValidator<'a> {
    policy: &'a ValidationPolicy,
    copier: &'a dyn ResultCopier,
}

impl<'a> ConsistencyValidator<'a> {
    pub fn new(policy: &'a ValidationPolicy, copier: &'a dyn ResultCopier) -> Self {
        Self { policy, copier }
    }

    fn accepts(&self, kind: SampleKind) -> bool {
        match kind {
            SampleKind::Fresh => true,
            SampleKind::Echo | SampleKind::Stale => !self.policy.consistency_check,
            SampleKind::Blank => false,
        }
    }

    /// Poll the service until it yields an acceptable result or the attempt
    /// budget runs out. Returns the last sample in the latter case.
    pub fn wait(
        &self,
        desktop: &mut Desktop,
        original: &str,
        last_translated: Option<&str>,
    ) -> Result<Validated> {
        desktop.write_clipboard(original)?;
        desktop.wait(self.policy.settle)?;

        let max_attempts = self.policy.max_attempts.max(1);
        let mut monitor = ClipboardMonitor::new();
        let mut last_sample = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                desktop.wait(self.policy.interval)?;
            }
            let sample = self.copier.sample_result(desktop)?;
            let kind = classify(&sample, original, last_translated);
            if attempt > 1 && !monitor.is_content_changed(&sample) {
                log::debug!("attempt {}: clipboard unchanged ({:?})", attempt, kind);
            } else {
                log::debug!("attempt {}: sample is {:?}", attempt, kind);
            }
            monitor.update_last_content(&sample);

            if self.accepts(kind) {
                self.reveal(desktop)?;
                return Ok(Validated {
                    text: sample,
                    kind,
                    attempts: attempt,
                    exhausted: false,
                });
            }
            last_sample = sample;
        }

        let kind = classify(&last_sample, original, last_translated);
        Ok(Validated {
            text: last_sample,
            kind,
            attempts: max_attempts,
            exhausted: true,
        })
    }

    /// Runs the scroll gesture, once per accepted result.
    fn reveal(&self, desktop: &mut Desktop) -> Result<()> {
        if let Some(gesture) = &self.policy.gesture {
            let to = gesture.anchor.offset(0, -gesture.distance);
            desktop.drag(gesture.anchor, to)?;
            desktop.wait(gesture.settle)?;
        }
        Ok(())
    }
}
