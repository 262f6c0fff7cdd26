//! Operator console: countdown, confirmation and progress lines

use std::io::{self, BufRead, Write};
use std::ops::Range;
use std::thread;
use std::time::Duration;

use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

use crate::abort::AbortWatch;
use crate::input::ScreenInfo;
use crate::sequencer::{ProgressReporter, RunOutcome, RunReport};

fn colored(color: Color, text: &str) {
    let mut out = io::stdout();
    execute!(
        out,
        SetForegroundColor(color),
        Print(text),
        ResetColor,
        Print("\n")
    )
    .ok();
}

const COUNTDOWN_TICK: Duration = Duration::from_millis(100);

/// Give the operator time to focus the first form field.
///
/// Returns false as soon as Ctrl+C is seen.
pub fn countdown(seconds: u64, abort: &AbortWatch) -> bool {
    println!("\nPrepare your form and click on the first field.");
    println!("Form filling will start in:");

    for i in (1..=seconds).rev() {
        if abort.is_interrupted() {
            return false;
        }
        println!("{}...", i);
        if !wait(Duration::from_secs(1), abort) {
            return false;
        }
    }
    if abort.is_interrupted() {
        return false;
    }

    colored(
        Color::Green,
        "Starting form filling! Move mouse to top-left corner or press Ctrl+C to abort.",
    );
    wait(Duration::from_secs(1), abort)
}

/// Sleep in short ticks, giving up early on interrupt
fn wait(total: Duration, abort: &AbortWatch) -> bool {
    let mut left = total;
    while !left.is_zero() {
        if abort.is_interrupted() {
            return false;
        }
        let step = left.min(COUNTDOWN_TICK);
        thread::sleep(step);
        left -= step;
    }
    !abort.is_interrupted()
}

/// Ask a yes/no question on stdin, defaulting to no
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn print_screen_info(info: &ScreenInfo) {
    println!("Screen size: {}x{}", info.screen_width, info.screen_height);
    println!("Current mouse position: ({}, {})", info.mouse_x, info.mouse_y);
}

pub fn warn(text: &str) {
    colored(Color::Yellow, text);
}

/// One-line description of how a run ended
pub fn summary_line(report: &RunReport) -> String {
    let elapsed = report.elapsed.as_secs_f64();
    let mut line = match &report.outcome {
        RunOutcome::Completed => format!(
            "Completed: {} record(s) processed in {:.1}s",
            report.processed, elapsed
        ),
        RunOutcome::StoppedOnFailure { index, reason } => format!(
            "Failed on record {} after {} record(s): {}",
            index + 1,
            report.processed,
            reason
        ),
        RunOutcome::StoppedOnAbort { last_completed } => format!(
            "FailSafe activated after {} record(s){}",
            report.processed,
            last_completed_suffix(*last_completed)
        ),
        RunOutcome::StoppedByUser { last_completed } => format!(
            "Interrupted after {} record(s){}",
            report.processed,
            last_completed_suffix(*last_completed)
        ),
    };
    if let Some(next) = report.resume_from() {
        line.push_str(&format!(". Resume with --start {}", next));
    }
    line
}

fn last_completed_suffix(last_completed: Option<usize>) -> String {
    match last_completed {
        Some(i) => format!(", last completed record {}", i + 1),
        None => String::new(),
    }
}

/// Prints progress lines to stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_run_start(&self, range: &Range<usize>, total: usize) {
        if range.is_empty() {
            println!("Nothing to do: no records in range ({} total)", total);
        } else {
            println!(
                "Filling records {} to {} of {}",
                range.start + 1,
                range.end,
                total
            );
        }
    }

    fn on_record_start(&self, index: usize, total: usize) {
        print!("\r\x1b[K\x1b[33mRecord {}/{}...\x1b[0m", index + 1, total);
        io::stdout().flush().ok();
    }

    fn on_record_done(&self, index: usize, total: usize) {
        print!("\r\x1b[K\x1b[32m✓ Record {}/{}\x1b[0m\n", index + 1, total);
        io::stdout().flush().ok();
    }

    fn on_run_end(&self, report: &RunReport) {
        print!("\r\x1b[K");
        let line = summary_line(report);
        let color = match report.outcome {
            RunOutcome::Completed => Color::Green,
            RunOutcome::StoppedOnFailure { .. } => Color::Red,
            _ => Color::Yellow,
        };
        colored(color, &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RunOutcome, processed: usize) -> RunReport {
        RunReport {
            outcome,
            range: 0..5,
            processed,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_countdown_stops_on_interrupt() {
        let abort = AbortWatch::new(false);
        abort.interrupt();
        let started = std::time::Instant::now();
        assert!(!countdown(3, &abort));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_runs_out_without_interrupt() {
        let abort = AbortWatch::new(false);
        assert!(wait(Duration::from_millis(250), &abort));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn test_summary_completed() {
        let line = summary_line(&report(RunOutcome::Completed, 5));
        assert_eq!(line, "Completed: 5 record(s) processed in 1.5s");
    }

    #[test]
    fn test_summary_abort_has_resume_hint() {
        let line = summary_line(&report(
            RunOutcome::StoppedOnAbort {
                last_completed: Some(2),
            },
            3,
        ));
        assert_eq!(
            line,
            "FailSafe activated after 3 record(s), last completed record 3. Resume with --start 3"
        );
    }

    #[test]
    fn test_summary_failure() {
        let line = summary_line(&report(
            RunOutcome::StoppedOnFailure {
                index: 1,
                reason: "boom".into(),
            },
            1,
        ));
        assert!(line.starts_with("Failed on record 2 after 1 record(s): boom"));
        assert!(line.ends_with("--start 1"));
    }
}
