use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::SecondsFormat;
use log::debug;

use super::{parse, Command, ParseError, HELP};
use crate::control::ControlHandle;
use crate::stats::StatsTracker;
use crate::types::format_tags;
use crate::writer::WriterStatus;

const PROMPT: &str = "> ";

/// Line-oriented operator console
///
/// Runs on the command thread. Every state change goes through the
/// [`ControlHandle`]; statistics and status are only read.
pub struct CommandInterpreter<R, W> {
    reader: R,
    writer: W,
    control: ControlHandle,
    stats: Arc<StatsTracker>,
    status: Arc<WriterStatus>,
}

impl<R: BufRead, W: Write> CommandInterpreter<R, W> {
    pub fn new(
        reader: R,
        writer: W,
        control: ControlHandle,
        stats: Arc<StatsTracker>,
        status: Arc<WriterStatus>,
    ) -> Self {
        Self {
            reader,
            writer,
            control,
            stats,
            status,
        }
    }

    /// Read and execute commands until `exit` or end of input
    ///
    /// Either way a stop is requested before returning.
    pub fn run(&mut self) -> io::Result<()> {
        let mut line = String::new();
        loop {
            self.prompt()?;
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                debug!("end of operator input");
                writeln!(self.writer, "Exiting...")?;
                break;
            }

            match parse(&line) {
                Ok(Some(Command::Exit)) => {
                    writeln!(self.writer, "Exiting...")?;
                    break;
                }
                Ok(Some(command)) => self.execute(command)?,
                Ok(None) => {}
                Err(ParseError::Usage(usage)) => writeln!(self.writer, "Usage: {}", usage)?,
                Err(e) => writeln!(self.writer, "Error: {}", e)?,
            }
        }

        self.control.request_stop();
        self.writer.flush()
    }

    /// Give back the control handle, e.g. to inspect it after `run`
    pub fn into_control(self) -> ControlHandle {
        self.control
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.writer, "{}", PROMPT)?;
        self.writer.flush()
    }

    fn execute(&mut self, command: Command) -> io::Result<()> {
        match command {
            Command::Add(tags) => {
                for tag in &tags {
                    writeln!(self.writer, "Adding tag {}", tag)?;
                }
                self.control.add_tags(tags);
            }
            Command::Remove(tags) => {
                for result in self.control.remove_tags(tags) {
                    match result {
                        Ok(tag) => writeln!(self.writer, "Removing tag {}", tag)?,
                        Err(e) => writeln!(self.writer, "Error: {}", e)?,
                    }
                }
            }
            Command::List => self.list()?,
            Command::Info => self.info()?,
            Command::Move(path) => match self.control.request_rotation(&path) {
                Ok(target) => writeln!(self.writer, "Moving output to {}", target.display())?,
                Err(e) => writeln!(self.writer, "Error: {}", e)?,
            },
            Command::Help => writeln!(self.writer, "{}", HELP)?,
            Command::Exit => {}
        }
        Ok(())
    }

    fn list(&mut self) -> io::Result<()> {
        let desired = self.control.snapshot_tags();
        writeln!(self.writer, "Tags: [{}]", format_tags(&desired))?;

        if let Some(active) = self.status.active_tags() {
            if active != desired {
                writeln!(
                    self.writer,
                    "Active filter: [{}] (applied on next reconnect)",
                    format_tags(&active)
                )?;
            }
        }
        Ok(())
    }

    fn info(&mut self) -> io::Result<()> {
        let summary = self.stats.summary();
        writeln!(self.writer, "Summary: {}", summary)?;
        writeln!(
            self.writer,
            "Started: {}, elapsed {}s",
            summary.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            summary.elapsed.as_secs()
        )?;
        writeln!(self.writer, "State: {}", self.status.phase())?;

        let output = self.status.output();
        if output.as_path() == self.control.output() {
            writeln!(self.writer, "Output: {}", output.display())?;
        } else {
            writeln!(
                self.writer,
                "Output: {} (moving to {})",
                output.display(),
                self.control.output().display()
            )?;
        }

        writeln!(
            self.writer,
            "Connections: {}, rotations: {}",
            summary.connection_attempts, summary.rotations
        )?;
        if let Some(error) = self.status.last_error() {
            writeln!(self.writer, "Last error: {}", error)?;
        }
        Ok(())
    }
}
