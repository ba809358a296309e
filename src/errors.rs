use thiserror::Error;

/// Everything that can go wrong while parsing or executing a selector.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("unexpected arguments for {function}({}): {message}", .args.join(","))]
    UnexpectedFunctionArgs {
        function: String,
        args: Vec<String>,
        message: String,
    },

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("index not found: {0}")]
    IndexNotFound(usize),

    #[error("selector `{selector}` is not supported on {kind} values")]
    UnsupportedTypeForSelector { selector: String, kind: String },

    #[error("previous value is nil: {0}")]
    UnexpectedPreviousNilValue(String),

    #[error("bracket mismatch in selector: {0}")]
    BracketMismatch(String),

    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("unknown comparison operator: {0}")]
    UnknownComparisonOperator(String),

    #[error("incompatible types: {0}")]
    IncompatibleTypes(String),

    #[error("unhandled check type: {0}")]
    UnhandledCheckType(String),

    #[error("{function} expects selector `{selector}` to return {expected} value(s), got {got}")]
    UnexpectedResultCount {
        function: String,
        selector: String,
        expected: &'static str,
        got: usize,
    },

    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("segment {index} `{segment}`: {source}")]
    AtSegment {
        index: usize,
        segment: String,
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    pub(crate) fn unexpected_args(function: &str, args: &[String], message: impl Into<String>) -> Self {
        EvalError::UnexpectedFunctionArgs {
            function: function.to_string(),
            args: args.to_vec(),
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(selector: impl Into<String>, kind: impl ToString) -> Self {
        EvalError::UnsupportedTypeForSelector {
            selector: selector.into(),
            kind: kind.to_string(),
        }
    }

    /// Strips every `AtSegment` layer, including those added by nested sub-queries.
    pub fn root_cause(&self) -> &EvalError {
        match self {
            EvalError::AtSegment { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True for the two navigation misses that `orDefault` and conditions may swallow.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            EvalError::PropertyNotFound(_) | EvalError::IndexNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn root_cause_unwraps_nested_segments() {
        let err = EvalError::AtSegment {
            index: 2,
            segment: "filter(x)".into(),
            source: Box::new(EvalError::AtSegment {
                index: 1,
                segment: "x".into(),
                source: Box::new(EvalError::PropertyNotFound("x".into())),
            }),
        };
        assert!(err.is_not_found());
        assert_eq!(err.root_cause().to_string(), "property not found: x");
    }

    #[test]
    fn unexpected_args_message_lists_args() {
        let err = EvalError::unexpected_args("equal", &["a".into()], "expected pairs");
        assert_eq!(err.to_string(), "unexpected arguments for equal(a): expected pairs");
    }
}
