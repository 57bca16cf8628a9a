//! Interactive session: one probed controller plus the command dispatcher.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use fpc_core::attrs::AttributeExecutor;
use fpc_core::attrs::catalog::ATTRIBUTES;
use fpc_core::gate::DisplayState;
use fpc_core::{BoardConfig, FpcController, probe};
use log::{info, warn};

use crate::board::{self, Faults, Shared, SimBoard, SimProvider};

/// Bring-up attempts before a deferred probe is given up.
const MAX_PROBE_ATTEMPTS: u32 = 5;

type Controller = FpcController<CriticalSectionRawMutex, SimBoard>;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("cat <attribute>", "read a readable attribute"),
    ("display <off|normal|on>", "report a display transition"),
    ("fb <code>", "deliver a raw framebuffer blank code"),
    ("fire", "raise the sensor interrupt line and deliver an interrupt"),
    ("quiet", "drop the sensor interrupt line"),
    ("status", "show controller state"),
    ("log", "dump the telemetry ring"),
    ("help", "show this help"),
    ("exit", "leave the emulator"),
];

/// One line of session output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Line {
    /// Narrated hardware call.
    Hw(String),
    Info(String),
    Error(String),
}

pub struct Session {
    controller: Controller,
    board: Shared,
    transcript: Option<TranscriptLogger>,
    started_at: Instant,
}

impl Session {
    /// Probes the simulated board, retrying while pin control is deferred.
    pub fn start(
        config: BoardConfig,
        faults: Faults,
        transcript: Option<&Path>,
    ) -> anyhow::Result<(Self, Vec<Line>)> {
        let started_at = Instant::now();
        let board = board::shared(faults);
        let transcript = transcript.map(TranscriptLogger::open).transpose()?;

        let mut attempt = 1;
        let controller = loop {
            let provider = SimProvider::new(&board, started_at);
            match block_on(probe::<CriticalSectionRawMutex, _>(provider, config)) {
                Ok(controller) => break controller,
                Err(err) if err.is_transient() && attempt < MAX_PROBE_ATTEMPTS => {
                    warn!("probe attempt {attempt} deferred: {err}");
                    attempt += 1;
                }
                Err(err) => bail!("probe failed after {attempt} attempt(s): {err}"),
            }
        };
        info!("probe completed on attempt {attempt}");

        let mut session = Self {
            controller,
            board,
            transcript,
            started_at,
        };
        let mut lines = session.drain_hardware();
        if session.board.borrow().wakeup_capable() {
            lines.push(Line::Info("device is wakeup capable".to_owned()));
        }
        lines.push(Line::Info("probe ok".to_owned()));
        session.record_output(&lines)?;
        Ok((session, lines))
    }

    pub fn handle_command(&mut self, input: &str) -> anyhow::Result<Vec<Line>> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.record_input(trimmed)?;

        let (word, argument) = trimmed
            .split_once(char::is_whitespace)
            .map_or((trimmed, ""), |(word, rest)| (word, rest.trim_start()));

        let mut lines = match word {
            "help" => help_lines(),
            "status" => block_on(self.controller.status())
                .to_string()
                .lines()
                .map(|line| Line::Info(line.to_owned()))
                .collect(),
            "log" => self.telemetry_lines(),
            "cat" => self.show(argument),
            "display" => self.display(argument),
            "fb" => match argument.parse::<i32>() {
                Ok(code) => {
                    block_on(self.controller.on_fb_blank(code));
                    Vec::new()
                }
                Err(_) => vec![Line::Error(format!("fb expects an integer, got `{argument}`"))],
            },
            "fire" => self.fire(),
            "quiet" => {
                self.board.borrow_mut().set_irq_level(false);
                vec![Line::Hw("sensor: irq line low".to_owned())]
            }
            attribute => self.store(attribute, argument),
        };

        let mut output = self.drain_hardware();
        output.append(&mut lines);
        self.record_output(&output)?;
        Ok(output)
    }

    fn store(&self, attribute: &str, value: &str) -> Vec<Line> {
        let executor = AttributeExecutor::new(&self.controller);
        match block_on(executor.store(attribute, value)) {
            Ok(_) => vec![Line::Info(format!("{attribute}: ok"))],
            Err(err) => vec![Line::Error(format!("{attribute}: {err}"))],
        }
    }

    fn show(&self, attribute: &str) -> Vec<Line> {
        let executor = AttributeExecutor::new(&self.controller);
        match block_on(executor.show(attribute)) {
            Ok(value) => vec![Line::Info(value.trim_end().to_owned())],
            Err(err) => vec![Line::Error(format!("{attribute}: {err}"))],
        }
    }

    fn display(&self, argument: &str) -> Vec<Line> {
        let display = match argument {
            "off" => DisplayState::PoweredDown,
            "normal" => DisplayState::Normal,
            "on" => DisplayState::Unblank,
            other => {
                return vec![Line::Error(format!(
                    "display expects off, normal or on, got `{other}`"
                ))];
            }
        };
        block_on(self.controller.on_display_state_changed(display));
        Vec::new()
    }

    fn fire(&self) -> Vec<Line> {
        let masked = {
            let mut board = self.board.borrow_mut();
            board.set_irq_level(true);
            board.irq_masked()
        };
        let mut lines = vec![Line::Hw("sensor: irq line high".to_owned())];
        if masked {
            lines.push(Line::Info("interrupt masked, not delivered".to_owned()));
            return lines;
        }

        let event = self.controller.on_interrupt();
        lines.extend(self.drain_hardware());
        let delivered = self.controller.notifier().try_take();
        lines.push(Line::Info(format!(
            "interrupt #{} at {}us{}",
            event.sequence,
            event.at,
            if event.wake_held { ", wake held" } else { "" }
        )));
        if delivered.is_some() && self.controller.finger_down_wait() {
            lines.push(Line::Info("finger-down waiter notified".to_owned()));
        }
        lines
    }

    fn telemetry_lines(&self) -> Vec<Line> {
        let lines: Vec<Line> = block_on(self.controller.with_telemetry(|telemetry| {
            telemetry
                .oldest_first()
                .map(|record| Line::Info(record.to_string()))
                .collect()
        }));
        if lines.is_empty() {
            vec![Line::Info("telemetry empty".to_owned())]
        } else {
            lines
        }
    }

    fn drain_hardware(&self) -> Vec<Line> {
        self.board
            .borrow_mut()
            .drain()
            .into_iter()
            .map(Line::Hw)
            .collect()
    }

    fn record_input(&mut self, input: &str) -> anyhow::Result<()> {
        let elapsed = self.started_at.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append(elapsed, '>', input)?;
        }
        Ok(())
    }

    fn record_output(&mut self, lines: &[Line]) -> anyhow::Result<()> {
        let elapsed = self.started_at.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                let (marker, text) = match line {
                    Line::Hw(text) => ('~', text),
                    Line::Info(text) => ('<', text),
                    Line::Error(text) => ('!', text),
                };
                transcript.append(elapsed, marker, text)?;
            }
            transcript.flush()?;
        }
        Ok(())
    }
}

fn help_lines() -> Vec<Line> {
    let mut lines = vec![Line::Info("attributes (write: <name> <value>):".to_owned())];
    for spec in &ATTRIBUTES {
        let access = if spec.access.readable() { "rw" } else { "w " };
        lines.push(Line::Info(format!(
            "  {:<17} {access}  {:<34} {}",
            spec.name,
            spec.value.expected(),
            spec.help
        )));
    }
    lines.push(Line::Info("commands:".to_owned()));
    for (usage, summary) in HELP_TOPICS {
        lines.push(Line::Info(format!("  {usage:<24} {summary}")));
    }
    lines
}

/// Timestamped session log written next to the interactive output.
struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open transcript {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "# fpc-emulator transcript")?;
        Ok(Self { writer })
    }

    fn append(&mut self, elapsed: Duration, marker: char, text: &str) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "[{:>4}.{:06}] {marker} {text}",
            elapsed.as_secs(),
            elapsed.subsec_micros()
        )?;
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
