use std::fmt;

use dt_xsd::ComponentId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A diagnostic about the schema or the customizations. Problems never abort compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub severity: Severity,
    /// The component the problem was found on, if it can be pinned to one
    pub component: Option<ComponentId>,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// The problem reporter shared by all passes.
#[derive(Clone, Debug, Default)]
pub struct Problems {
    problems: Vec<Problem>,
}

impl Problems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        severity: Severity,
        component: Option<ComponentId>,
        message: impl Into<String>,
    ) {
        let problem = Problem {
            severity,
            component,
            message: message.into(),
        };
        match severity {
            Severity::Warning => tracing::warn!(?component, "{}", problem.message),
            Severity::Error => tracing::error!(?component, "{}", problem.message),
        }
        self.problems.push(problem);
    }

    pub fn warning(&mut self, component: Option<ComponentId>, message: impl Into<String>) {
        self.report(Severity::Warning, component, message)
    }

    pub fn error(&mut self, component: Option<ComponentId>, message: impl Into<String>) {
        self.report(Severity::Error, component, message)
    }

    pub fn has_errors(&self) -> bool {
        self.problems
            .iter()
            .any(|problem| problem.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}
