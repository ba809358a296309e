use std::fmt;

/// One parsed pipeline segment: a function name plus its raw arguments.
/// Arguments stay unparsed; functions that take sub-selectors parse them on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    function: String,
    args: Vec<String>,
}

impl Selector {
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    /// Placeholder for the synthetic first step that holds the root value.
    pub(crate) fn root() -> Self {
        Self::new("root", Vec::new())
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.function, self.args.join(","))
    }
}
