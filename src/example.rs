//! Labeled examples and the streaming example source.
//!
//! An example is one observed time window: a set of ground narrative facts
//! (`happensAt`, `holdsAt`, ...) plus the annotation — the ground query
//! atoms the learned theory must entail on that window. Examples arrive as
//! JSON lines; the source yields them strictly in file order, which is the
//! ordering guarantee the online loop builds on.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExampleError, ExampleResult};
use crate::literal::Literal;
use crate::parser;

/// One labeled example from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Sequence number (typically the window's start time point).
    pub id: u64,
    /// Ground facts describing the world state.
    pub facts: Vec<Literal>,
    /// Ground query atoms the theory must entail.
    pub annotation: Vec<Literal>,
}

impl Example {
    /// Create an example from already-parsed literals.
    pub fn new(id: u64, facts: Vec<Literal>, annotation: Vec<Literal>) -> Self {
        Self {
            id,
            facts,
            annotation,
        }
    }

    /// Rendered annotation atoms, for set membership tests.
    pub fn annotation_strings(&self) -> HashSet<String> {
        self.annotation.iter().map(|l| l.to_string()).collect()
    }
}

/// On-disk representation: one JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
struct RawExample {
    id: u64,
    #[serde(default)]
    facts: Vec<String>,
    #[serde(default)]
    annotation: Vec<String>,
}

fn convert(raw: RawExample, line: usize) -> ExampleResult<Example> {
    let parse_atoms = |atoms: &[String]| -> ExampleResult<Vec<Literal>> {
        atoms
            .iter()
            .map(|atom| {
                parser::parse_literal(atom).map_err(|source| ExampleError::BadAtom {
                    line,
                    atom: atom.clone(),
                    source,
                })
            })
            .collect()
    };
    Ok(Example {
        id: raw.id,
        facts: parse_atoms(&raw.facts)?,
        annotation: parse_atoms(&raw.annotation)?,
    })
}

// ---------------------------------------------------------------------------
// File source
// ---------------------------------------------------------------------------

/// A streaming JSON-lines example source.
///
/// Yields examples in file order; malformed lines surface as errors without
/// consuming the rest of the stream.
pub struct FileSource {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl FileSource {
    /// Open an example file for streaming.
    pub fn open(path: impl AsRef<Path>) -> ExampleResult<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for FileSource {
    type Item = ExampleResult<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(ExampleError::Io(e))),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let raw: RawExample = match serde_json::from_str(trimmed) {
                Ok(raw) => raw,
                Err(e) => {
                    return Some(Err(ExampleError::Malformed {
                        line: self.line_no,
                        message: e.to_string(),
                    }))
                }
            };
            return Some(convert(raw, self.line_no));
        }
    }
}

/// Read a whole example file eagerly, in file order.
pub fn read_examples(path: impl AsRef<Path>) -> ExampleResult<Vec<Example>> {
    FileSource::open(path)?.collect()
}
