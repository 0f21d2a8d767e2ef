//! Headless battle runner.
//!
//! Wraps one [`Battle`] and speaks the JSON-lines [`protocol`](crate::protocol)
//! over any reader/writer pair, so the same code drives stdin/stdout and
//! in-memory buffers in tests.

use std::io::{self, BufRead, Write};

use battle_core::error::GameError;
use battle_core::setup::BattleSetup;
use battle_core::simulation::Battle;
use battle_core::snapshot::BattleResult;
use rayon::prelude::*;

use crate::protocol::{Command, Response};

/// Runner configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessConfig {
    /// Emit a snapshot after every tick (vs only at the end or on query).
    pub emit_snapshots: bool,
}

/// Drives a single battle for a controller.
pub struct HeadlessRunner {
    battle: Battle,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Validate `setup` and place its units.
    pub fn new(setup: BattleSetup) -> Result<Self, GameError> {
        Ok(Self {
            battle: Battle::new(setup)?,
            config: HeadlessConfig::default(),
        })
    }

    /// Builder method to set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: HeadlessConfig) -> Self {
        self.config = config;
        self
    }

    /// The wrapped battle.
    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    fn ready(&self) -> Response {
        Response::ready(self.battle.current_tick(), self.battle.units().len())
    }

    fn snapshot(&self) -> Response {
        Response::snapshot(&self.battle.snapshot(), self.battle.status())
    }

    fn finished(&self, result: BattleResult) -> Response {
        Response::Result {
            result,
            hash: self.battle.state_hash(),
        }
    }

    /// Advance up to `count` ticks. Stops early when the battle ends.
    fn advance(&mut self, count: u32, out: &mut Vec<Response>) -> Result<(), GameError> {
        for _ in 0..count {
            if self.battle.status().is_finished() {
                break;
            }
            self.battle.tick()?;
            if self.config.emit_snapshots {
                out.push(self.snapshot());
            }
        }
        Ok(())
    }

    /// Handle one command. Returns the responses to write and whether the
    /// session should end.
    pub fn handle(&mut self, command: &Command) -> (Vec<Response>, bool) {
        let mut out = Vec::new();
        match *command {
            Command::Tick { count } => {
                if let Some(result) = self.battle.result() {
                    out.push(self.finished(result));
                    return (out, false);
                }
                if let Err(e) = self.advance(count, &mut out) {
                    tracing::error!(error = %e, "Tick failed");
                    out.push(Response::error(e.to_string(), Some(command.name())));
                    return (out, true);
                }
                if !self.config.emit_snapshots {
                    out.push(self.snapshot());
                }
                if let Some(result) = self.battle.result() {
                    out.push(self.finished(result));
                }
            }
            Command::Query => out.push(self.snapshot()),
            Command::Hash => out.push(Response::StateHash {
                tick: self.battle.current_tick(),
                hash: self.battle.state_hash(),
            }),
            Command::Abort => {
                out.push(Response::Bye);
                return (out, true);
            }
        }
        (out, false)
    }

    /// Serve JSON-lines commands from `input` until `abort` or end of input.
    pub fn run_interactive<R: BufRead, W: Write>(mut self, input: R, mut output: W) -> io::Result<()> {
        write_response(&mut output, &self.ready())?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let command = match Command::from_json(line) {
                Ok(command) => command,
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable command");
                    write_response(&mut output, &Response::error(format!("Parse error: {e}"), None))?;
                    continue;
                }
            };
            tracing::debug!(cmd = command.name(), tick = self.battle.current_tick(), "Command received");

            let (responses, done) = self.handle(&command);
            for response in &responses {
                write_response(&mut output, response)?;
            }
            if done {
                return Ok(());
            }
        }

        write_response(&mut output, &Response::Bye)
    }

    /// Play the battle to the end, writing snapshots if configured and the
    /// final result.
    pub fn run_to_end<W: Write>(mut self, mut output: W) -> io::Result<BattleResult> {
        write_response(&mut output, &self.ready())?;
        loop {
            if let Some(result) = self.battle.result() {
                write_response(&mut output, &self.finished(result.clone()))?;
                return Ok(result);
            }
            let mut out = Vec::new();
            self.advance(1, &mut out).map_err(io::Error::other)?;
            for response in &out {
                write_response(&mut output, response)?;
            }
        }
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

/// Results of running one setup several times.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// Final state hash of each run, in run order.
    pub hashes: Vec<u64>,
    /// Terminal result of each run, in run order.
    pub results: Vec<BattleResult>,
}

impl VerifyReport {
    /// Whether every run ended in the same state with the same result.
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1]) && self.results.windows(2).all(|w| w[0] == w[1])
    }

    /// Distinct hashes in first-seen order.
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = Vec::new();
        for hash in &self.hashes {
            if !unique.contains(hash) {
                unique.push(*hash);
            }
        }
        unique
    }

    /// Protocol response for this report.
    pub fn to_response(&self) -> Option<Response> {
        let result = self.results.first()?.clone();
        Some(Response::Verified {
            runs: self.hashes.len(),
            deterministic: self.is_deterministic(),
            hashes: self.unique_hashes(),
            result,
        })
    }
}

/// Run the same setup `runs` times in parallel.
pub fn verify_setup(setup: &BattleSetup, runs: usize) -> Result<VerifyReport, GameError> {
    let outcomes: Vec<(u64, BattleResult)> = (0..runs)
        .into_par_iter()
        .map(|_| {
            let mut battle = Battle::new(setup.clone())?;
            let result = battle.run()?;
            Ok((battle.state_hash(), result))
        })
        .collect::<Result<_, GameError>>()?;

    let (hashes, results) = outcomes.into_iter().unzip();
    let report = VerifyReport { hashes, results };
    if !report.is_deterministic() {
        tracing::warn!(hashes = ?report.unique_hashes(), "Runs diverged");
    }
    Ok(report)
}
