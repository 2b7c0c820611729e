use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use spi_periph::{Command, Config, CounterPolicy, Register, Simulator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spi-periph-sim")]
#[command(about = "Cycle model of the SPI register interface")]
#[command(version)]
struct Args {
    /// YAML run configuration
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    /// VCD output file
    #[arg(long)]
    vcd: Option<Utf8PathBuf>,

    /// Bit counter policy (overrides the configuration file)
    #[arg(long, value_parser = parse_policy)]
    policy: Option<CounterPolicy>,

    /// SCLK half period in system clock ticks
    #[arg(long)]
    half_period: Option<u32>,

    /// Idle ticks after each transaction
    #[arg(long)]
    settle_cycles: Option<u32>,

    /// Write command as ADDR:DATA (e.g. 0x04:0x7f), sent in order
    #[arg(short, long, value_name = "ADDR:DATA", value_parser = parse_write)]
    write: Vec<Command>,

    /// Read command for ADDR (consumed without effect), sent in order with --write
    #[arg(short, long, value_name = "ADDR", value_parser = parse_read)]
    read: Vec<Command>,

    /// Print the register map and exit
    #[arg(long)]
    list_registers: bool,
}

fn parse_hex(s: &str) -> Result<u8, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

fn parse_write(s: &str) -> Result<Command, String> {
    let (addr, data) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ADDR:DATA, got '{s}'"))?;
    let addr = parse_hex(addr).map_err(|e| format!("address: {e}"))?;
    let data = parse_hex(data).map_err(|e| format!("data: {e}"))?;
    Command::write(addr, data).map_err(|e| e.to_string())
}

fn parse_read(s: &str) -> Result<Command, String> {
    let addr = parse_hex(s).map_err(|e| format!("address: {e}"))?;
    Command::read(addr, 0).map_err(|e| e.to_string())
}

fn parse_policy(s: &str) -> Result<CounterPolicy, String> {
    match s {
        "hold-until-reset" => Ok(CounterPolicy::HoldUntilReset),
        "rearm-on-select" => Ok(CounterPolicy::RearmOnSelect),
        other => Err(format!(
            "unknown policy '{other}' (expected hold-until-reset or rearm-on-select)"
        )),
    }
}

/// `--write` and `--read` commands merged back into command-line order.
fn commands_in_order(matches: &ArgMatches) -> Vec<Command> {
    let mut commands: Vec<(usize, Command)> = Vec::new();
    for id in ["write", "read"] {
        if let (Some(values), Some(indices)) =
            (matches.get_many::<Command>(id), matches.indices_of(id))
        {
            commands.extend(indices.zip(values.copied()));
        }
    }
    commands.sort_by_key(|&(index, _)| index);
    commands.into_iter().map(|(_, command)| command).collect()
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path.as_std_path())
            .with_context(|| format!("Failed to load configuration {path}"))?,
        None => Config::default(),
    };
    if let Some(policy) = args.policy {
        config.peripheral.counter_policy = policy;
    }
    if let Some(half_period) = args.half_period {
        config.bus.half_period = half_period;
    }
    if let Some(settle_cycles) = args.settle_cycles {
        config.bus.settle_cycles = settle_cycles;
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if args.list_registers {
        println!("Register map:");
        for reg in Register::ALL {
            println!("  0x{:02x}  {}", reg.address(), reg);
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    let mut sim = Simulator::new(config).context("Invalid configuration")?;
    if let Some(path) = &args.vcd {
        sim.open_vcd(path.as_std_path())
            .with_context(|| format!("Failed to open VCD trace {path}"))?;
    }

    let commands = commands_in_order(&matches);
    tracing::debug!(
        writes = args.write.len(),
        reads = args.read.len(),
        "command list parsed"
    );

    sim.reset().context("Reset sequence failed")?;
    for command in commands {
        sim.send(command)
            .with_context(|| format!("Failed to send {command}"))?;
    }
    sim.close_vcd().context("Failed to finish VCD trace")?;

    let stats = sim.stats();
    println!(
        "{} ticks, {} frames, {} decodes",
        stats.ticks, stats.frames, stats.decodes
    );
    for (reg, value) in sim.registers().iter() {
        println!("{:<20} 0x{:02x}", reg.name(), value);
    }

    Ok(())
}
