use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use spi_periph::{Command, Config, Register, RegisterFile, RunStats, Simulator};

/// One bus-level action in a scenario.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Write { address: u8, data: u8 },
    Read {
        address: u8,
        #[serde(default)]
        data: u8,
    },
    /// Low `bits` bits of `word` in a select window of their own. With
    /// `hold_select` the window is left open for the next step.
    Partial {
        word: u16,
        bits: u8,
        #[serde(default)]
        hold_select: bool,
    },
    Reset,
    Idle { cycles: u32 },
}

/// Expected state after the last step.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Expectation {
    /// Registers left out are expected to read zero.
    pub registers: BTreeMap<Register, u8>,
    pub decodes: Option<u64>,
    pub frames: Option<u64>,
    pub dropped: Option<u64>,
    pub message: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub config: Config,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub expect: Expectation,
}

/// State captured at the end of a scenario run
#[derive(Debug, Clone)]
pub struct TestResult {
    pub registers: RegisterFile,
    pub message: u16,
    pub stats: RunStats,
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Reset the peripheral, play every step and capture the final state.
pub fn run_scenario(scenario: &Scenario, vcd_path: Option<&Path>) -> Result<TestResult> {
    let mut sim = Simulator::new(scenario.config.clone())
        .with_context(|| format!("Invalid configuration in scenario {}", scenario.name))?;
    if let Some(path) = vcd_path {
        sim.open_vcd(path).context("Failed to open VCD trace")?;
    }

    sim.reset().context("Initial reset failed")?;
    for (idx, step) in scenario.steps.iter().enumerate() {
        run_step(&mut sim, step).with_context(|| format!("Step {idx} ({step:?}) failed"))?;
    }
    sim.close_vcd().context("Failed to finish VCD trace")?;

    Ok(TestResult {
        registers: sim.registers(),
        message: sim.peripheral().message(),
        stats: *sim.stats(),
    })
}

fn run_step(sim: &mut Simulator, step: &Step) -> Result<()> {
    match *step {
        Step::Write { address, data } => sim.send(Command::write(address, data)?)?,
        Step::Read { address, data } => sim.send(Command::read(address, data)?)?,
        Step::Partial {
            word,
            bits,
            hold_select: false,
        } => sim.send_bits(word, bits)?,
        Step::Partial {
            word,
            bits,
            hold_select: true,
        } => sim.send_bits_held(word, bits)?,
        Step::Reset => sim.reset()?,
        Step::Idle { cycles } => sim.idle(cycles)?,
    }
    Ok(())
}

/// Compare a run against its expectation, listing every mismatch.
pub fn compare_results(result: &TestResult, expect: &Expectation) -> Result<()> {
    let mut mismatches = Vec::new();

    for reg in Register::ALL {
        let want = expect.registers.get(&reg).copied().unwrap_or(0);
        let got = result.registers.get(reg);
        if want != got {
            mismatches.push(format!("{reg}: got=0x{got:02x}, expected=0x{want:02x}"));
        }
    }

    let counters = [
        ("decodes", result.stats.decodes, expect.decodes),
        ("frames", result.stats.frames, expect.frames),
        ("dropped", result.stats.dropped, expect.dropped),
    ];
    for (name, got, want) in counters {
        if let Some(want) = want
            && want != got
        {
            mismatches.push(format!("{name}: got={got}, expected={want}"));
        }
    }

    if let Some(want) = expect.message
        && want != result.message
    {
        mismatches.push(format!(
            "message: got=0x{:04x}, expected=0x{want:04x}",
            result.message
        ));
    }

    if !mismatches.is_empty() {
        anyhow::bail!(
            "Mismatches after {} ticks:\n{}",
            result.stats.ticks,
            mismatches.join("\n")
        );
    }

    Ok(())
}
