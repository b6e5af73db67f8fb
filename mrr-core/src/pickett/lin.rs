//! SPFIT `.lin` assignment files
//!
//! Fixed-width experimental assignment list consumed by the external fitting
//! engine: 12 quantum-number fields of width 3 (upper state then lower
//! state), frequency at 4 decimals, expected error at 6 decimals, blend
//! weight in scientific notation.

use super::cat::QuantumNumbers;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}:{line}: malformed assignment entry")]
    Malformed { path: String, line: usize },
}

/// One experimental transition assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub upper: QuantumNumbers,
    pub lower: QuantumNumbers,
    /// Measured frequency, MHz
    pub frequency: f64,
    /// Expected measurement error, MHz
    pub uncertainty: f64,
    /// Blend weight
    pub weight: f64,
}

fn push_qn(out: &mut String, value: Option<i32>) {
    match value {
        Some(v) => {
            let _ = write!(out, "{v:>3}");
        }
        None => out.push_str("   "),
    }
}

fn qn_fields(qn: &QuantumNumbers) -> [Option<i32>; 6] {
    [qn.n, qn.ka, qn.kc, qn.j, qn.f1, qn.f]
}

impl Assignment {
    /// Render one fixed-width `.lin` line (without trailing newline)
    pub fn format_line(&self) -> String {
        let mut out = String::with_capacity(72);
        for value in qn_fields(&self.upper) {
            push_qn(&mut out, value);
        }
        for value in qn_fields(&self.lower) {
            push_qn(&mut out, value);
        }
        let _ = write!(
            out,
            "{:13.4}{:10.6} {:9.2E}",
            self.frequency, self.uncertainty, self.weight
        );
        out
    }

    fn parse_line(line: &str) -> Option<Self> {
        let qn_at = |index: usize| -> Option<i32> {
            let start = index * 3;
            line.get(start..(start + 3).min(line.len()))
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .and_then(|f| f.parse().ok())
        };

        let mut fields = [None; 12];
        for (i, slot) in fields.iter_mut().enumerate() {
            *slot = qn_at(i);
        }

        let frequency: f64 = line.get(36..49.min(line.len()))?.trim().parse().ok()?;
        let uncertainty: f64 = line.get(49..59.min(line.len()))?.trim().parse().ok()?;
        let weight: f64 = line.get(59..)?.trim().parse().ok()?;

        Some(Self {
            upper: quantum_from(&fields[..6]),
            lower: quantum_from(&fields[6..]),
            frequency,
            uncertainty,
            weight,
        })
    }
}

fn quantum_from(fields: &[Option<i32>]) -> QuantumNumbers {
    let get = |i: usize| fields.get(i).copied().flatten();
    QuantumNumbers {
        n: get(0),
        ka: get(1),
        kc: get(2),
        j: get(3),
        f1: get(4),
        f: get(5),
    }
}

/// A parsed or assembled assignment list
#[derive(Debug, Clone, Default)]
pub struct LinFile {
    pub assignments: Vec<Assignment>,
}

impl LinFile {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LinError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut assignments = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let assignment = Assignment::parse_line(&line).ok_or_else(|| LinError::Malformed {
                path: path.display().to_string(),
                line: index + 1,
            })?;
            assignments.push(assignment);
        }

        Ok(Self { assignments })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), LinError> {
        let mut file = File::create(path)?;
        for assignment in &self.assignments {
            writeln!(file, "{}", assignment.format_line())?;
        }
        Ok(())
    }

    /// Assigned frequencies, in file order
    pub fn frequencies(&self) -> Vec<f64> {
        self.assignments.iter().map(|a| a.frequency).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> Assignment {
        Assignment {
            upper: QuantumNumbers {
                n: Some(2),
                ka: Some(0),
                kc: Some(2),
                ..Default::default()
            },
            lower: QuantumNumbers {
                n: Some(1),
                ka: Some(0),
                kc: Some(1),
                ..Default::default()
            },
            frequency: 3000.1234,
            uncertainty: 0.001,
            weight: 1.0,
        }
    }

    #[test]
    fn test_format_layout() {
        let line = assignment().format_line();

        // 12 quantum-number fields of width 3
        assert_eq!(&line[..36], "  2  0  2           1  0  1         ");
        // Frequency at 4 decimals, width 13
        assert_eq!(&line[36..49], "    3000.1234");
        // Error at 6 decimals, width 10
        assert_eq!(&line[49..59], "  0.001000");
    }

    #[test]
    fn test_line_round_trip() {
        let original = assignment();
        let parsed = Assignment::parse_line(&original.format_line()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assign.lin");

        let lin = LinFile::new(vec![assignment()]);
        lin.write(&path).unwrap();

        let read_back = LinFile::from_file(&path).unwrap();
        assert_eq!(read_back.assignments, lin.assignments);
        assert_eq!(read_back.frequencies(), vec![3000.1234]);
    }

    #[test]
    fn test_malformed_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.lin");
        std::fs::write(&path, "not an assignment\n").unwrap();

        match LinFile::from_file(&path) {
            Err(LinError::Malformed { line, .. }) => assert_eq!(line, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
