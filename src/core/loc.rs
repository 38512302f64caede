use std::fmt;

/// Where a token, node or error came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Loc {
    /// Produced by the host (native functions, packages, synthesized tokens).
    #[default]
    Native,
    Line { line: usize },
}

impl Loc {
    pub fn new(line: usize) -> Self {
        Loc::Line { line }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Loc::Native => None,
            Loc::Line { line } => Some(*line),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Loc::Native)
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Loc::Native => write!(f, "native code"),
            Loc::Line { line } => write!(f, "line {}", line),
        }
    }
}
