//! Field-filling sequencer
//!
//! For each record: type every field value in form order, advancing after
//! each one, then submit and wait. Any failed action stops the run at the
//! current record; an operator abort stops it and reports the last record
//! that was fully submitted. Nothing is retried.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, info_span, warn};

use crate::abort::AbortWatch;
use crate::config::{FillerConfig, NavigationMethod, SubmissionMethod};
use crate::data::Record;
use crate::error::{AbortKind, ActionError};
use crate::input::{FormKey, InputChannel};

/// Settle time after select-all before typing
const CLEAR_SETTLE: Duration = Duration::from_millis(100);
/// Pause between Tab and Enter for `tab_enter` submission
const TAB_ENTER_PAUSE: Duration = Duration::from_millis(500);

/// Blocking wait between actions
pub trait Delay {
    fn sleep(&mut self, duration: Duration);
}

/// Real delays via `thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Console-facing progress notifications
pub trait ProgressReporter {
    fn on_run_start(&self, _range: &Range<usize>, _total: usize) {}
    fn on_record_start(&self, _index: usize, _total: usize) {}
    fn on_record_done(&self, _index: usize, _total: usize) {}
    fn on_run_end(&self, _report: &RunReport) {}
}

/// Reporter that prints nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Terminal state of a run. Indices are zero-based positions in the record list.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    /// An action failed while processing `index`
    StoppedOnFailure { index: usize, reason: String },
    /// Failsafe corner reached
    StoppedOnAbort { last_completed: Option<usize> },
    /// Ctrl+C
    StoppedByUser { last_completed: Option<usize> },
}

impl RunOutcome {
    /// Only a failed record counts as an error; operator stops are graceful
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::StoppedOnFailure { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Records the run was asked to process
    pub range: Range<usize>,
    /// Records fully filled and submitted
    pub processed: usize,
    pub elapsed: Duration,
}

impl RunReport {
    /// Start index for a follow-up run, if this one stopped early
    pub fn resume_from(&self) -> Option<usize> {
        match &self.outcome {
            RunOutcome::Completed => None,
            RunOutcome::StoppedOnFailure { index, .. } => Some(*index),
            RunOutcome::StoppedOnAbort { last_completed }
            | RunOutcome::StoppedByUser { last_completed } => {
                Some(last_completed.map_or(self.range.start, |i| i + 1))
            }
        }
    }
}

/// Compute the records a run covers: from `start`, at most `max_records`,
/// clamped to `total`
pub fn record_range(start: usize, max_records: Option<NonZeroUsize>, total: usize) -> Range<usize> {
    let end = match max_records {
        Some(max) => start.saturating_add(max.get()).min(total),
        None => total,
    };
    start.min(end)..end
}

/// Progress within one run, dropped when the run returns
struct Session {
    cursor: usize,
    last_completed: Option<usize>,
    processed: usize,
}

pub struct Sequencer<I, D = ThreadDelay> {
    config: FillerConfig,
    input: I,
    delay: D,
    abort: AbortWatch,
    reporter: Box<dyn ProgressReporter>,
}

impl<I: InputChannel> Sequencer<I, ThreadDelay> {
    /// `config` must already be validated
    pub fn new(config: FillerConfig, input: I) -> Self {
        Sequencer::with_delay(config, input, ThreadDelay)
    }
}

impl<I: InputChannel, D: Delay> Sequencer<I, D> {
    pub fn with_delay(config: FillerConfig, input: I, delay: D) -> Self {
        let abort = AbortWatch::new(config.use_failsafe);
        Self {
            config,
            input,
            delay,
            abort,
            reporter: Box::new(SilentReporter),
        }
    }

    pub fn with_abort(mut self, abort: AbortWatch) -> Self {
        self.abort = abort;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Clear the focused field (optionally) and type `value` into it
    pub fn fill_field(&mut self, value: &str, clear_first: bool) -> Result<(), ActionError> {
        self.abort.check(&self.input)?;

        if clear_first {
            self.input.press_key_combo(&FormKey::select_all())?;
            self.delay.sleep(CLEAR_SETTLE);
            self.abort.check(&self.input)?;
        }

        let value = match self.config.max_field_length {
            Some(max) if value.chars().count() > max => {
                warn!("Truncating value to {} characters", max);
                match value.char_indices().nth(max) {
                    Some((cut, _)) => &value[..cut],
                    None => value,
                }
            }
            _ => value,
        };

        self.input
            .type_text(value, self.config.typing_interval(), &self.abort)
    }

    /// Move focus to the next field and wait for the form to react
    pub fn advance_field(&mut self, method: NavigationMethod) -> Result<(), ActionError> {
        self.abort.check(&self.input)?;

        match method {
            NavigationMethod::Tab => self.input.press_key(FormKey::Tab)?,
            NavigationMethod::Enter => self.input.press_key(FormKey::Enter)?,
            NavigationMethod::Click => {
                return Err(ActionError::Unsupported {
                    action: "navigation",
                    method: method.as_str(),
                });
            }
        }

        self.delay.sleep(self.config.field_transition_delay());
        Ok(())
    }

    /// Submit the current form and wait for it to go through
    pub fn submit(&mut self, method: SubmissionMethod) -> Result<(), ActionError> {
        self.abort.check(&self.input)?;

        match method {
            SubmissionMethod::Enter => self.input.press_key(FormKey::Enter)?,
            SubmissionMethod::TabEnter => {
                self.input.press_key(FormKey::Tab)?;
                self.delay.sleep(TAB_ENTER_PAUSE);
                self.abort.check(&self.input)?;
                self.input.press_key(FormKey::Enter)?;
            }
            SubmissionMethod::Click => {
                return Err(ActionError::Unsupported {
                    action: "submission",
                    method: method.as_str(),
                });
            }
        }

        self.delay.sleep(self.config.form_submission_delay());
        Ok(())
    }

    /// Fill every field of `field_order` from `record`.
    ///
    /// Navigation happens once per field whether or not anything was typed,
    /// so the form cursor stays in step with the expected layout.
    pub fn fill_record(&mut self, record: &Record, field_order: &[String]) -> Result<(), ActionError> {
        let navigation = self.config.navigation_method;
        let clear = self.config.clear_fields;

        for name in field_order {
            match record.get(name) {
                Some(value) if value.is_empty() && self.config.skip_empty_fields => {
                    debug!("Skipping empty field '{}'", name);
                }
                Some(value) => {
                    debug!("Filling field '{}'", name);
                    self.fill_field(value.as_text(), clear).inspect_err(|e| {
                        log_action_error(e, &format!("typing field '{}'", name));
                    })?;
                }
                None => {
                    warn!("Field '{}' not found in record", name);
                }
            }

            self.advance_field(navigation).inspect_err(|e| {
                log_action_error(e, &format!("moving past field '{}'", name));
            })?;
        }

        Ok(())
    }

    /// Fill and submit records starting at `start`, at most `max_records` of them.
    ///
    /// Stops at the first failure or abort; see [`RunOutcome`].
    pub fn run(
        &mut self,
        records: &[Record],
        field_order: &[String],
        start: usize,
        max_records: Option<NonZeroUsize>,
    ) -> RunReport {
        let total = records.len();
        let range = record_range(start, max_records, total);
        let span = info_span!("fill_run", start = range.start, end = range.end, total);
        let _guard = span.enter();
        let started = Instant::now();

        if range.is_empty() {
            warn!("No records to process (start {}, {} records)", start, total);
        } else {
            info!("Processing records {} to {}", range.start, range.end - 1);
        }
        self.reporter.on_run_start(&range, total);

        let mut session = Session {
            cursor: range.start,
            last_completed: None,
            processed: 0,
        };
        let outcome = self.run_session(records, field_order, range.clone(), &mut session);

        match &outcome {
            RunOutcome::Completed => info!("Form filling completed!"),
            RunOutcome::StoppedOnFailure { index, reason } => {
                error!("Stopped on record {}: {}", index + 1, reason)
            }
            RunOutcome::StoppedOnAbort { .. } => info!("FailSafe activated - automation stopped"),
            RunOutcome::StoppedByUser { .. } => {
                info!("Process interrupted by user at record {}", session.cursor + 1)
            }
        }

        let report = RunReport {
            outcome,
            range,
            processed: session.processed,
            elapsed: started.elapsed(),
        };
        self.reporter.on_run_end(&report);
        report
    }

    fn run_session(
        &mut self,
        records: &[Record],
        field_order: &[String],
        range: Range<usize>,
        session: &mut Session,
    ) -> RunOutcome {
        let total = records.len();

        for index in range {
            session.cursor = index;

            if let Err(e) = self.abort.check(&self.input) {
                return stop_outcome(e, index, session.last_completed);
            }

            info!("Processing record {}/{}", index + 1, total);
            self.reporter.on_record_start(index, total);

            if let Err(e) = self.fill_record(&records[index], field_order) {
                if e.abort_kind().is_none() {
                    error!("Failed to fill record {}", index + 1);
                }
                return stop_outcome(e, index, session.last_completed);
            }

            if let Err(e) = self.submit(self.config.submission_method) {
                log_action_error(&e, "submitting form");
                if e.abort_kind().is_none() {
                    error!("Failed to submit record {}", index + 1);
                }
                return stop_outcome(e, index, session.last_completed);
            }

            session.last_completed = Some(index);
            session.processed += 1;

            self.delay.sleep(self.config.record_delay());
            if self.config.wait_for_page_load {
                self.delay.sleep(self.config.page_load_delay());
            }

            info!("Successfully processed record {}", index + 1);
            self.reporter.on_record_done(index, total);
        }

        RunOutcome::Completed
    }
}

fn log_action_error(err: &ActionError, context: &str) {
    match err {
        ActionError::Abort(kind) => warn!("{} while {}, stopping automation", kind, context),
        other => error!("Error {}: {}", context, other),
    }
}

fn stop_outcome(err: ActionError, index: usize, last_completed: Option<usize>) -> RunOutcome {
    match err {
        ActionError::Abort(AbortKind::Failsafe) => RunOutcome::StoppedOnAbort { last_completed },
        ActionError::Abort(AbortKind::Interrupt) => RunOutcome::StoppedByUser { last_completed },
        other => RunOutcome::StoppedOnFailure {
            index,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RunOutcome, range: Range<usize>) -> RunReport {
        RunReport {
            outcome,
            range,
            processed: 0,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_record_range() {
        assert_eq!(record_range(0, None, 5), 0..5);
        assert_eq!(record_range(1, NonZeroUsize::new(2), 5), 1..3);
        assert_eq!(record_range(4, NonZeroUsize::new(10), 5), 4..5);
        assert_eq!(record_range(7, None, 5), 5..5);
        assert_eq!(record_range(usize::MAX, NonZeroUsize::new(3), 5), 5..5);
    }

    #[test]
    fn test_resume_from() {
        assert_eq!(report(RunOutcome::Completed, 0..5).resume_from(), None);
        assert_eq!(
            report(
                RunOutcome::StoppedOnFailure {
                    index: 3,
                    reason: "x".into()
                },
                0..5
            )
            .resume_from(),
            Some(3)
        );
        assert_eq!(
            report(RunOutcome::StoppedOnAbort { last_completed: Some(2) }, 0..5).resume_from(),
            Some(3)
        );
        assert_eq!(
            report(RunOutcome::StoppedByUser { last_completed: None }, 2..5).resume_from(),
            Some(2)
        );
    }

    #[test]
    fn test_only_failure_is_failure() {
        assert!(!RunOutcome::Completed.is_failure());
        assert!(!RunOutcome::StoppedByUser { last_completed: None }.is_failure());
        assert!(
            RunOutcome::StoppedOnFailure {
                index: 0,
                reason: String::new()
            }
            .is_failure()
        );
    }

    #[test]
    fn test_stop_outcome_classifies_errors() {
        assert_eq!(
            stop_outcome(ActionError::Abort(AbortKind::Failsafe), 3, Some(2)),
            RunOutcome::StoppedOnAbort { last_completed: Some(2) }
        );
        assert_eq!(
            stop_outcome(ActionError::Abort(AbortKind::Interrupt), 0, None),
            RunOutcome::StoppedByUser { last_completed: None }
        );
        let outcome = stop_outcome(
            ActionError::Unsupported {
                action: "submission",
                method: "click",
            },
            1,
            Some(0),
        );
        assert!(matches!(outcome, RunOutcome::StoppedOnFailure { index: 1, .. }));
    }
}
