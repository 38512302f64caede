use thiserror::Error;

use crate::Loc;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MinikError {
    #[error("[{loc}] {description}")]
    Language {
        loc: Loc,
        description: String,
        advice: String,
    },

    #[error("[{loc}] {description}")]
    Resolve {
        loc: Loc,
        description: String,
        advice: String,
    },

    #[error("[{loc}] {description}")]
    Runtime {
        loc: Loc,
        description: String,
        advice: String,
    },

    /// Raised by `assert`; the call site turns it into a [`MinikError::Runtime`].
    #[error("Assertion failed.")]
    Assertion { message: Option<String> },

    #[error("{description}")]
    System { description: String, advice: String },
}

/// Receives every failure of a run as a `(line, message)` pair.
pub trait ErrorSink {
    fn report(&mut self, line: usize, message: &str);
}

impl ErrorSink for Vec<(usize, String)> {
    fn report(&mut self, line: usize, message: &str) {
        self.push((line, message.to_string()));
    }
}

impl MinikError {
    pub fn description(&self) -> &str {
        match self {
            MinikError::Language { description, .. }
            | MinikError::Resolve { description, .. }
            | MinikError::Runtime { description, .. }
            | MinikError::System { description, .. } => description,
            MinikError::Assertion { message } => message.as_deref().unwrap_or("Assertion failed."),
        }
    }

    pub fn advice(&self) -> &str {
        match self {
            MinikError::Language { advice, .. }
            | MinikError::Resolve { advice, .. }
            | MinikError::Runtime { advice, .. }
            | MinikError::System { advice, .. } => advice,
            MinikError::Assertion { .. } => "Check the condition passed to `assert`.",
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            MinikError::Language { loc, .. } | MinikError::Resolve { loc, .. } | MinikError::Runtime { loc, .. } => *loc,
            _ => Loc::Native,
        }
    }

    /// The source line of the failure, `0` when it has none.
    pub fn line(&self) -> usize {
        self.loc().line().unwrap_or_default()
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, MinikError::Runtime { .. } | MinikError::Assertion { .. })
    }

    pub fn is_resolve(&self) -> bool {
        matches!(self, MinikError::Resolve { .. })
    }

    /// Anchors errors raised by native code to the line of the call which triggered them.
    pub fn at(self, at: Loc) -> Self {
        match self {
            MinikError::Assertion { message } => runtime(
                at,
                match message {
                    Some(message) => format!("Assertion failed: {}", message),
                    None => "Assertion failed.".to_string(),
                },
                "Check the condition passed to `assert`.",
            ),
            MinikError::Runtime { loc, description, advice } if loc.is_native() => MinikError::Runtime { loc: at, description, advice },
            other => other,
        }
    }

    pub fn report_to(&self, sink: &mut dyn ErrorSink) {
        sink.report(self.line(), self.description());
    }
}

pub fn language<D: Into<String>, A: Into<String>>(loc: Loc, description: D, advice: A) -> MinikError {
    MinikError::Language { loc, description: description.into(), advice: advice.into() }
}

pub fn resolve<D: Into<String>, A: Into<String>>(loc: Loc, description: D, advice: A) -> MinikError {
    MinikError::Resolve { loc, description: description.into(), advice: advice.into() }
}

pub fn runtime<D: Into<String>, A: Into<String>>(loc: Loc, description: D, advice: A) -> MinikError {
    MinikError::Runtime { loc, description: description.into(), advice: advice.into() }
}

pub fn assertion(message: Option<String>) -> MinikError {
    MinikError::Assertion { message }
}

pub fn system<D: Into<String>, A: Into<String>>(description: D, advice: A) -> MinikError {
    MinikError::System { description: description.into(), advice: advice.into() }
}

impl From<std::io::Error> for MinikError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => system(
                format!("We could not find the file you provided ({}).", e),
                "Make sure that the file exists and that you have permissions to access it.",
            ),
            std::io::ErrorKind::PermissionDenied => system(
                "You do not have permissions to access the file you provided.",
                "Make sure that you have permissions to access the file.",
            ),
            kind => system(
                format!("We were unable to open the file you provided due to a {} error.", kind),
                "Check the internal error message and try searching for a solution online.",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_is_relocated_to_call_site() {
        let err = assertion(Some("values differ".to_string())).at(Loc::new(7));
        assert!(err.is_runtime());
        assert_eq!(err.line(), 7);
        assert_eq!(err.description(), "Assertion failed: values differ");
    }

    #[test]
    fn located_errors_keep_their_line() {
        let err = runtime(Loc::new(3), "Undefined variable 'x'.", "Define it first.").at(Loc::new(9));
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn sink_receives_line_and_message() {
        let mut sink: Vec<(usize, String)> = Vec::new();
        resolve(Loc::new(2), "Cannot return from outside of a function.", "Remove it.").report_to(&mut sink);
        assert_eq!(sink, vec![(2, "Cannot return from outside of a function.".to_string())]);
    }
}
