mod board;
mod session;

use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use crossterm::style::Stylize;
use fpc_core::BoardConfig;
use fpc_core::pins::PinProfile;
use fpc_core::rails::Rail;
use tracing_subscriber::EnvFilter;

use board::Faults;
use session::{Line, Session};

/// Interactive FPC1020 control plane running against a simulated board.
#[derive(Parser, Debug)]
#[command(name = "fpc-emulator", version)]
#[command(after_help = "Set RUST_LOG=debug to see controller logging on stderr.")]
struct Cli {
    /// Power the sensor during bring-up (`fpc,enable-on-boot`)
    #[arg(long)]
    enable_on_boot: bool,

    /// Mark the device as able to wake the system (`fpc,enable-wakeup`)
    #[arg(long)]
    wakeup: bool,

    /// Make enabling this rail fail
    #[arg(long, value_name = "RAIL", value_parser = parse_rail)]
    fail_rail: Option<Rail>,

    /// Make selecting this pin profile fail
    #[arg(long, value_name = "PROFILE", value_parser = parse_profile)]
    fail_profile: Option<PinProfile>,

    /// Report pin control as not ready for the first N probe attempts
    #[arg(long, value_name = "N", default_value_t = 0)]
    defer_probe: u32,

    /// Append a timestamped transcript of the session to this file
    #[arg(long, value_name = "PATH")]
    transcript: Option<PathBuf>,
}

impl Cli {
    fn board_config(&self) -> BoardConfig {
        let mut properties = HashSet::new();
        if self.enable_on_boot {
            properties.insert(BoardConfig::ENABLE_ON_BOOT_PROPERTY);
        }
        if self.wakeup {
            properties.insert(BoardConfig::WAKEUP_PROPERTY);
        }
        BoardConfig::from_properties(|name| properties.contains(name))
    }

    fn faults(&self) -> Faults {
        Faults {
            failing_rail: self.fail_rail,
            failing_profile: self.fail_profile,
            pinctrl_deferrals: self.defer_probe,
        }
    }
}

fn parse_rail(name: &str) -> Result<Rail, String> {
    Rail::from_name(name).ok_or_else(|| format!("unknown rail `{name}`"))
}

fn parse_profile(name: &str) -> Result<PinProfile, String> {
    PinProfile::from_name(name).ok_or_else(|| format!("unknown pin profile `{name}`"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let (mut session, boot) = Session::start(
        cli.board_config(),
        cli.faults(),
        cli.transcript.as_deref(),
    )?;
    print_lines(&mut writer, &boot)?;
    writeln!(
        writer,
        "{}",
        "FPC1020 emulator ready. Type `help` for commands or `exit` to quit.".bold()
    )?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();
    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        print_lines(&mut writer, &responses)?;
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn print_lines(writer: &mut impl Write, lines: &[Line]) -> io::Result<()> {
    for line in lines {
        match line {
            Line::Hw(text) => writeln!(writer, "  {}", text.as_str().dark_grey())?,
            Line::Info(text) => writeln!(writer, "{text}")?,
            Line::Error(text) => writeln!(writer, "{}", text.as_str().red())?,
        }
    }
    Ok(())
}
