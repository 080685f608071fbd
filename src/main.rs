use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};
use log::{info, LevelFilter};
use pcpu::memory::image::Image;
use pcpu::memory::{Endianness, Memory};
use pcpu::processor::{Config, Processor, UnsupportedPolicy};
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(name = "pcpu", version, about = "Runs an image on the 8-bit virtual processor")]
struct Cli {
    /// Image to load
    image: PathBuf,

    /// The image is a raw 256 byte memory dump instead of address/value pairs
    #[arg(long)]
    raw: bool,

    /// Fetch instruction words low byte first
    #[arg(long)]
    little_endian: bool,

    /// Stop on words with an undefined opcode instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Milliseconds to wait between cycles
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Give up after this many cycles
    #[arg(long)]
    max_cycles: Option<usize>,

    /// Wait for Enter before starting
    #[arg(long)]
    pause: bool,

    /// Print memory before and after the run
    #[arg(long)]
    dump: bool,

    /// Write the final memory as a raw image
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
#[clap(rename_all = "lower")]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Cli {
    fn config(&self) -> Config {
        let endianness = if self.little_endian {
            Endianness::Little
        } else {
            Endianness::Big
        };
        let policy = if self.strict {
            UnsupportedPolicy::Fail
        } else {
            UnsupportedPolicy::Ignore
        };

        Config::default()
            .with_endianness(endianness)
            .with_unsupported_policy(policy)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(cli.log_level.into())
        .init()
        .map_err(|err| eyre!("failed to install logger: {}", err))?;

    let file = File::open(&cli.image)
        .wrap_err_with(|| format!("Could not open image {}", cli.image.display()))?;
    let image = Image::from_reader(BufReader::new(file), cli.raw)
        .wrap_err_with(|| format!("Could not load image {}", cli.image.display()))?;

    let mut memory = Memory::default();
    let mut cpu = Processor::with_config(Some(&mut memory), cli.config())?;
    cpu.load_image(&image)?;

    if cli.dump {
        println!("{}", image.memory().hexdump(None));
    }

    if cli.pause {
        print!("Press Enter to start.");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
    }

    cpu.start()?;
    let delay = Duration::from_millis(cli.delay_ms);
    let mut cycles = 0;
    while !cpu.is_halted() {
        if cli.max_cycles.map_or(false, |max| cycles >= max) {
            info!("Stopped after {} cycles without halting", cycles);
            break;
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        cpu.cycle()?;
        cycles += 1;
    }

    let state = cpu.state();
    info!(
        "Program terminated after {} cycles. pc: 0x{:02X} ir: 0x{:04X}",
        cycles, state.pc, state.ir
    );
    info!("Registers: {:02X?}", state.registers.slots);
    drop(cpu);

    if cli.dump {
        println!("Final data:");
        println!("{}", memory.hexdump(Some(image.memory())));
    }

    if let Some(path) = &cli.output {
        let file = File::create(path)
            .wrap_err_with(|| format!("Could not create {}", path.display()))?;
        Image::from(memory).write_to(file)?;
    }

    Ok(())
}
