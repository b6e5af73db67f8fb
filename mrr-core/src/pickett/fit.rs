//! External fitting-engine boundary (SPFIT / Piform)
//!
//! The workbench does not fit rotational constants itself; it writes the
//! `.par`/`.var` constants file and the `.lin` assignments, invokes the
//! external fitting executable, and parses the fixed-format Piform report
//! (`.pi`): constant values with parenthetical uncertainties such as
//! `0.0275(12)`, worst-fit-line diagnostics and the poorly-determined
//! constant list. A bounded retry loop drops rejected quartic distortion
//! constants between runs instead of spinning forever.

use log::{debug, info, warn};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use super::lin::LinFile;

/// Quartic centrifugal distortion constants eligible for rejection when the
/// fit cannot determine them.
pub const QUARTIC_CONSTANTS: [&str; 5] = ["DJ", "DJK", "DK", "dJ", "dK"];

#[derive(Error, Debug)]
pub enum FitError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Lin(#[from] super::lin::LinError),

    #[error("fitting engine failed: {0}")]
    Engine(String),

    #[error("{path}:{line}: malformed fit report entry")]
    Malformed { path: String, line: usize },

    #[error("fit report not produced: {0}")]
    MissingReport(String),

    #[error("constant rejection did not stabilize within {iterations} iterations")]
    NoConvergence { iterations: usize },
}

/// One Hamiltonian constant handed to the fitting engine
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    /// Pickett parameter identifier (e.g. 10000 for A)
    pub id: i64,
    /// Human-readable name (A, B, C, DJ, ...)
    pub name: String,
    /// Value in MHz
    pub value: f64,
    /// Step/uncertainty; engine default when absent
    pub uncertainty: Option<f64>,
}

impl Constant {
    pub fn new(id: i64, name: &str, value: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            value,
            uncertainty: None,
        }
    }
}

/// Write a `.par`/`.var` constants file
///
/// Layout: a title line, a control line with the constant and line counts,
/// then one line per constant: identifier, value, step, `/name` comment.
pub fn write_par<P: AsRef<Path>>(
    path: P,
    title: &str,
    constants: &[Constant],
    line_count: usize,
) -> Result<(), FitError> {
    let mut file = File::create(path)?;
    writeln!(file, "{title}")?;
    writeln!(file, "{:>4} {:>6}", constants.len(), line_count)?;
    for constant in constants {
        let step = constant
            .uncertainty
            .unwrap_or_else(|| constant.value.abs().max(1e-6));
        writeln!(
            file,
            "{:>13} {:>23.15E} {:>14.8E} /{}",
            constant.id, constant.value, step, constant.name
        )?;
    }
    Ok(())
}

/// A constant as reported back by the fit
#[derive(Debug, Clone, PartialEq)]
pub struct FittedConstant {
    pub name: String,
    pub value: f64,
    pub uncertainty: Option<f64>,
}

impl FittedConstant {
    /// A constant whose uncertainty exceeds its magnitude is undetermined
    pub fn is_poorly_determined(&self) -> bool {
        match self.uncertainty {
            Some(unc) => unc > self.value.abs(),
            None => false,
        }
    }
}

/// One worst-fitted-line diagnostic row
#[derive(Debug, Clone, PartialEq)]
pub struct WorstLine {
    pub index: usize,
    pub observed: f64,
    pub calculated: f64,
    pub difference: f64,
}

/// Parsed Piform report
#[derive(Debug, Clone, Default)]
pub struct PiReport {
    pub constants: Vec<FittedConstant>,
    pub worst_lines: Vec<WorstLine>,
    /// Constants the report flags explicitly
    pub bad_constants: Vec<String>,
    /// Microwave RMS of the fit, MHz
    pub rms: Option<f64>,
}

/// Parse `value(uncertainty)` parenthetical notation
///
/// The parenthetical digits scale to the last decimal places of the value:
/// `0.0275(12)` → value 0.0275, uncertainty 0.0012. A bare number parses
/// with no uncertainty.
pub fn parse_parenthetical(text: &str) -> Option<(f64, Option<f64>)> {
    let text = text.trim();
    let Some(open) = text.find('(') else {
        return text.parse().ok().map(|v| (v, None));
    };
    let close = text.find(')')?;
    let value_part = &text[..open];
    let digits_part = &text[open + 1..close];

    let value: f64 = value_part.parse().ok()?;
    let digits: u64 = digits_part.parse().ok()?;

    let decimals = value_part
        .find('.')
        .map(|dot| value_part.len() - dot - 1)
        .unwrap_or(0);
    let uncertainty = digits as f64 * 10f64.powi(-(decimals as i32));
    Some((value, Some(uncertainty)))
}

impl PiReport {
    /// Parse a Piform report from text
    ///
    /// Recognized content:
    /// - constant lines: `NAME  value(unc)`
    /// - `MICROWAVE RMS = <value>`
    /// - a `WORST FITTED LINES` section of `index obs calc diff` rows
    /// - a `POORLY DETERMINED: A, B, ...` marker line
    pub fn parse(text: &str, path: &str) -> Result<Self, FitError> {
        let mut report = PiReport::default();
        let mut in_worst_section = false;

        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                in_worst_section = false;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("MICROWAVE RMS =") {
                let value = rest
                    .split_whitespace()
                    .next()
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(|| FitError::Malformed {
                        path: path.to_string(),
                        line: index + 1,
                    })?;
                report.rms = Some(value);
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("POORLY DETERMINED:") {
                report
                    .bad_constants
                    .extend(rest.split(',').map(|n| n.trim().to_string()));
                continue;
            }

            if trimmed.starts_with("WORST FITTED LINES") {
                in_worst_section = true;
                continue;
            }

            if in_worst_section {
                let fields: Vec<&str> = trimmed.split_whitespace().collect();
                if fields.len() >= 4 {
                    let parsed = (
                        fields[0].parse::<usize>(),
                        fields[1].parse::<f64>(),
                        fields[2].parse::<f64>(),
                        fields[3].parse::<f64>(),
                    );
                    if let (Ok(i), Ok(obs), Ok(calc), Ok(diff)) = parsed {
                        report.worst_lines.push(WorstLine {
                            index: i,
                            observed: obs,
                            calculated: calc,
                            difference: diff,
                        });
                        continue;
                    }
                }
                in_worst_section = false;
            }

            // Constant line: name token followed by a parenthetical value
            let mut fields = trimmed.split_whitespace();
            if let (Some(name), Some(value_text)) = (fields.next(), fields.next()) {
                if value_text.contains('(') {
                    if let Some((value, uncertainty)) = parse_parenthetical(value_text) {
                        report.constants.push(FittedConstant {
                            name: name.to_string(),
                            value,
                            uncertainty,
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    /// Quartic constants the report rejects, explicitly or by uncertainty
    pub fn rejected_quartics(&self) -> Vec<String> {
        let mut rejected: Vec<String> = self
            .bad_constants
            .iter()
            .filter(|name| QUARTIC_CONSTANTS.contains(&name.as_str()))
            .cloned()
            .collect();
        for constant in &self.constants {
            if QUARTIC_CONSTANTS.contains(&constant.name.as_str())
                && constant.is_poorly_determined()
                && !rejected.contains(&constant.name)
            {
                rejected.push(constant.name.clone());
            }
        }
        rejected
    }
}

/// Driver for the external fitting executable
///
/// Each attempt writes the constants and assignments, runs the engine and
/// parses the report; quartic constants the report rejects are removed
/// before the next attempt. The loop is explicitly bounded.
pub struct FitRunner {
    executable: PathBuf,
    work_dir: PathBuf,
    max_iterations: usize,
}

impl FitRunner {
    pub fn new<P: Into<PathBuf>>(executable: P, work_dir: P) -> Self {
        Self {
            executable: executable.into(),
            work_dir: work_dir.into(),
            max_iterations: 50,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run the fit, rejecting undetermined quartic constants between passes
    pub fn fit(
        &self,
        base_name: &str,
        mut constants: Vec<Constant>,
        assignments: &LinFile,
    ) -> Result<PiReport, FitError> {
        let par_path = self.work_dir.join(format!("{base_name}.par"));
        let lin_path = self.work_dir.join(format!("{base_name}.lin"));
        let report_path = self.work_dir.join(format!("{base_name}.pi"));

        assignments.write(&lin_path)?;

        for iteration in 0..self.max_iterations {
            write_par(
                &par_path,
                base_name,
                &constants,
                assignments.assignments.len(),
            )?;

            debug!(
                "fit attempt {} with {} constants",
                iteration + 1,
                constants.len()
            );
            let output = Command::new(&self.executable)
                .arg(base_name)
                .current_dir(&self.work_dir)
                .output()
                .map_err(|e| FitError::Engine(e.to_string()))?;
            if !output.status.success() {
                return Err(FitError::Engine(format!(
                    "exit status {}",
                    output.status
                )));
            }

            let text = std::fs::read_to_string(&report_path)
                .map_err(|_| FitError::MissingReport(report_path.display().to_string()))?;
            let report = PiReport::parse(&text, &report_path.display().to_string())?;

            let rejected = report.rejected_quartics();
            let rejected: Vec<String> = rejected
                .into_iter()
                .filter(|name| constants.iter().any(|c| &c.name == name))
                .collect();

            if rejected.is_empty() {
                info!(
                    "fit converged after {} attempt(s), rms {:?}",
                    iteration + 1,
                    report.rms
                );
                return Ok(report);
            }

            warn!("rejecting undetermined constants: {}", rejected.join(", "));
            constants.retain(|c| !rejected.contains(&c.name));
        }

        Err(FitError::NoConvergence {
            iterations: self.max_iterations,
        })
    }
}
