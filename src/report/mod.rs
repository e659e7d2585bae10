//! Multi-line progress reporting.
//!
//! One terminal line is reserved per package up front. Install tasks never
//! touch the terminal themselves: they send `(line, text)` events to a single
//! reporter thread that owns the writer, so lines cannot interleave. Without
//! cursor control every event is printed as its own line instead.

mod colors;

use crossterm::{
    cursor::{MoveToNextLine, MoveToPreviousLine},
    queue,
    terminal::{Clear, ClearType},
};
use std::io::Write;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub use colors::{ansi_enabled, init_colors};

const SPINNER_INTERVAL: Duration = Duration::from_millis(50);
const SPINNER_MAX_DOTS: usize = 30;

#[derive(Debug)]
enum ReportEvent {
    Line { index: usize, text: String },
    Shutdown,
}

/// Owner of the output stream. Dropping it flushes pending events.
pub struct Reporter {
    sender: mpsc::Sender<ReportEvent>,
    handle: Option<thread::JoinHandle<()>>,
    cursor: bool,
}

impl Reporter {
    /// Reporter writing to stdout with `lines` reserved lines.
    pub fn stdout(lines: usize, cursor: bool) -> Self {
        Self::spawn(Box::new(std::io::stdout()), lines, cursor)
    }

    pub fn spawn(writer: Box<dyn Write + Send>, lines: usize, cursor: bool) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || run_report_loop(writer, receiver, lines, cursor));
        Self {
            sender,
            handle: Some(handle),
            cursor,
        }
    }

    /// Handle bound to line `index`.
    pub fn line(&self, index: usize) -> LineHandle {
        LineHandle {
            sender: self.sender.clone(),
            index,
            prefix: String::new(),
            cursor: self.cursor,
        }
    }

    /// Drain every queued event and stop the reporter thread.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.sender.send(ReportEvent::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_report_loop(
    mut out: Box<dyn Write + Send>,
    receiver: mpsc::Receiver<ReportEvent>,
    lines: usize,
    cursor: bool,
) {
    if cursor {
        let _ = out.write_all("\n".repeat(lines).as_bytes());
        let _ = out.flush();
    }

    while let Ok(event) = receiver.recv() {
        let written = match event {
            ReportEvent::Line { index, text } if cursor && index < lines => {
                redraw_line(&mut out, lines - index, &text)
            }
            ReportEvent::Line { text, .. } => writeln!(out, "{}", text),
            ReportEvent::Shutdown => break,
        };
        if written.and_then(|()| out.flush()).is_err() {
            break;
        }
    }
}

/// Move up `distance` lines, clear, write, and move back down.
fn redraw_line(out: &mut Box<dyn Write + Send>, distance: usize, text: &str) -> std::io::Result<()> {
    let distance = u16::try_from(distance).unwrap_or(u16::MAX);
    queue!(out, MoveToPreviousLine(distance), Clear(ClearType::CurrentLine))?;
    write!(out, "\r{}", text)?;
    queue!(out, MoveToNextLine(distance))
}

/// A task's view of its reserved line.
#[derive(Clone)]
pub struct LineHandle {
    sender: mpsc::Sender<ReportEvent>,
    index: usize,
    prefix: String,
    cursor: bool,
}

impl LineHandle {
    /// Text prepended to every message, typically the package name.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// Replace the line's contents.
    pub fn print(&self, message: impl std::fmt::Display) {
        let _ = self.sender.send(ReportEvent::Line {
            index: self.index,
            text: format!("{}{}", self.prefix, message),
        });
    }

    /// Animate `message` with a growing dot trailer until the returned
    /// [`Spinner`] is dropped. Without cursor control the message is
    /// printed once.
    pub fn spinner(&self, message: impl Into<String>) -> Spinner {
        let message = message.into();
        if !self.cursor {
            self.print(&message);
            return Spinner { task: None };
        }

        let line = self.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SPINNER_INTERVAL);
            let mut dots = 0;
            loop {
                interval.tick().await;
                line.print(format!("{} {}", message, ".".repeat(dots)));
                dots = (dots + 1) % (SPINNER_MAX_DOTS + 1);
            }
        });
        Spinner { task: Some(task) }
    }
}

/// Running spinner; stops when dropped.
pub struct Spinner {
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    pub fn stop(self) {}
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
