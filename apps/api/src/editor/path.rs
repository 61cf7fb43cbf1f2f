//! Path grammar for addressing locations inside the resume document.
//!
//! ```text
//! path    = segment ("." segment)*
//! segment = name ("[" digits "]")?
//! ```
//!
//! Every template encodes its paths as literals in this grammar, so it must
//! stay stable. `experience[2].bulletPoints[0]` parses to
//! `[Field(experience), Index(2), Field(bulletPoints), Index(0)]`.

use std::fmt;
use std::str::FromStr;

use crate::editor::error::EditError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Field(String),
    Index(usize),
}

/// A parsed path: an ordered list of typed access steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocPath {
    steps: Vec<PathStep>,
}

impl DocPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Builder-style `Field` step.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::Field(name.into()));
        self
    }

    /// Builder-style `Index` step.
    pub fn index(mut self, position: usize) -> Self {
        self.steps.push(PathStep::Index(position));
        self
    }
}

impl FromStr for DocPath {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            match step {
                PathStep::Field(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathStep::Index(i) => write!(f, "[{i}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

/// Parses a path string into its steps.
pub fn parse_path(path: &str) -> Result<DocPath, EditError> {
    let malformed = |reason: &str| EditError::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(malformed("path is empty"));
    }

    let mut steps = Vec::new();
    for segment in path.split('.') {
        let (name, index) = match segment.find('[') {
            Some(open) => (&segment[..open], Some(&segment[open + 1..])),
            None => (segment, None),
        };

        if name.is_empty() {
            return Err(malformed("empty field segment"));
        }
        if name.contains(']') {
            return Err(malformed("unexpected ']' in field name"));
        }
        steps.push(PathStep::Field(name.to_string()));

        if let Some(rest) = index {
            let digits = rest
                .strip_suffix(']')
                .ok_or_else(|| malformed("index must be closed by ']' at the end of a segment"))?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed("index must be a non-negative integer"));
            }
            let position = digits
                .parse::<usize>()
                .map_err(|_| malformed("index is too large"))?;
            steps.push(PathStep::Index(position));
        }
    }

    Ok(DocPath { steps })
}
