//! Log capture for the chat screen
//!
//! While the alternate screen is up, the tracing fmt layer writes into a
//! `LogBuffer` instead of stderr. The screen shows the newest warning in its
//! status bar; whatever warnings and errors piled up are printed to stderr
//! once the terminal is restored.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

const CAPACITY: usize = 200;

#[derive(Default)]
struct Captured {
    lines: VecDeque<String>,
    /// Newest WARN/ERROR line the screen has not shown yet.
    unseen_problem: Option<String>,
}

/// Shared sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Captured>>,
}

fn is_problem(line: &str) -> bool {
    line.contains(" WARN ") || line.contains(" ERROR ")
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        if line.trim().is_empty() {
            return;
        }
        // A poisoned lock only means a writer panicked mid-push; the queue is fine.
        let mut captured = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if is_problem(&line) {
            captured.unseen_problem = Some(line.clone());
        }
        if captured.lines.len() >= CAPACITY {
            captured.lines.pop_front();
        }
        captured.lines.push_back(line);
    }

    /// Newest warning or error since the last call, if any.
    pub fn take_problem(&self) -> Option<String> {
        let mut captured = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        captured.unseen_problem.take()
    }

    /// Remove and return the captured warnings and errors, oldest first.
    pub fn drain_problems(&self) -> Vec<String> {
        let mut captured = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        captured.unseen_problem = None;
        captured.lines.drain(..).filter(|l| is_problem(l)).collect()
    }
}

/// Per-event writer; splits what it is given into lines.
pub struct LineWriter {
    sink: LogBuffer,
    pending: Vec<u8>,
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.sink
                .push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.sink.push(String::from_utf8_lossy(&rest).into_owned());
        }
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            sink: self.clone(),
            pending: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_lines_surface_once() {
        let logs = LogBuffer::new();
        let mut writer = logs.make_writer();
        write!(
            writer,
            "2026-10-19T08:00:00Z  INFO bus_admin::chat: connected\n\
             2026-10-19T08:00:01Z  WARN bus_admin::chat: Chat connection lost: reset\n"
        )
        .unwrap();

        let problem = logs.take_problem().unwrap();
        assert!(problem.ends_with("Chat connection lost: reset"));
        assert_eq!(logs.take_problem(), None);

        let drained = logs.drain_problems();
        assert_eq!(drained.len(), 1);
        assert!(logs.drain_problems().is_empty());
    }

    #[test]
    fn test_partial_line_flushed_on_drop() {
        let logs = LogBuffer::new();
        {
            let mut writer = logs.make_writer();
            write!(writer, "2026-10-19T08:00:00Z ERROR bus_admin: no newline").unwrap();
            assert_eq!(logs.take_problem(), None);
        }
        assert!(logs.take_problem().is_some());
    }

    #[test]
    fn test_capacity_bounds_history() {
        let logs = LogBuffer::new();
        for i in 0..(CAPACITY + 50) {
            logs.push(format!("t  WARN x: line {}", i));
        }
        let drained = logs.drain_problems();
        assert_eq!(drained.len(), CAPACITY);
        assert!(drained[0].ends_with("line 50"));
    }
}
