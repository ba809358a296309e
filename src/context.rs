use tracing::debug;

use crate::errors::{EvalError, Result};
use crate::functions::Registry;
use crate::node::Node;
use crate::parser::parse_segment;
use crate::selector::Selector;
use crate::value::{Value, Values};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initial,
    Running,
    Done,
    Error,
}

/// One executed segment and the values it produced.
#[derive(Debug, Clone)]
pub struct Step {
    selector: Selector,
    index: usize,
    output: Values,
}

impl Step {
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn output(&self) -> &[Value] {
        &self.output
    }
}

/// One run of a selector against a root value.
///
/// Step 0 is synthetic and outputs the root; every parsed segment reads the
/// previous step's output. Contexts are cheap: sub-queries build a fresh one
/// sharing the registry.
pub struct Context {
    registry: Registry,
    selector: String,
    cursor: usize,
    steps: Vec<Step>,
    create_when_missing: bool,
    state: State,
}

impl Context {
    pub fn new(root: Value, selector: &str) -> Self {
        Self::with_registry(root, selector, Registry::with_builtins())
    }

    /// A top-level context. A document root it starts from reports `root` as
    /// its key.
    pub fn with_registry(root: Value, selector: &str, registry: Registry) -> Self {
        if root.is_root() && root.document().metadata("key").is_none() {
            root.document().set_metadata("key", Node::from("root"));
        }
        Self::untagged(root, selector, registry)
    }

    fn untagged(root: Value, selector: &str, registry: Registry) -> Self {
        Self {
            registry,
            selector: selector.to_string(),
            cursor: 0,
            steps: vec![Step {
                selector: Selector::root(),
                index: 0,
                output: vec![root],
            }],
            create_when_missing: false,
            state: State::Initial,
        }
    }

    /// Makes navigation materialise missing containers instead of failing.
    pub fn with_create_when_missing(mut self, create: bool) -> Self {
        self.create_when_missing = create;
        self
    }

    pub fn create_when_missing(&self) -> bool {
        self.create_when_missing
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn root(&self) -> &Value {
        &self.steps[0].output[0]
    }

    /// Output of the step before `step`.
    pub fn inputs(&self, step: &Step) -> &[Value] {
        step.index
            .checked_sub(1)
            .and_then(|i| self.steps.get(i))
            .map(|s| s.output.as_slice())
            .unwrap_or_default()
    }

    /// Parses and executes the next segment. Returns `None` once the selector
    /// is exhausted.
    pub fn next(&mut self) -> Result<Option<&Step>> {
        if matches!(self.state, State::Done | State::Error) {
            return Ok(None);
        }
        self.state = State::Running;

        let (selector, consumed) = match parse_segment(&self.selector[self.cursor..]) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => {
                self.state = State::Done;
                return Ok(None);
            }
            Err(e) => {
                self.state = State::Error;
                return Err(e);
            }
        };
        self.cursor += consumed;

        let mut step = Step {
            selector,
            index: self.steps.len(),
            output: Vec::new(),
        };
        match self.execute(&step) {
            Ok(output) => {
                debug!(
                    index = step.index,
                    function = step.selector.function(),
                    inputs = self.inputs(&step).len(),
                    outputs = output.len(),
                    "executed step"
                );
                step.output = output;
                self.steps.push(step);
                Ok(self.steps.last())
            }
            Err(source) => {
                self.state = State::Error;
                Err(EvalError::AtSegment {
                    index: step.index,
                    segment: step.selector.to_string(),
                    source: Box::new(source),
                })
            }
        }
    }

    fn execute(&self, step: &Step) -> Result<Values> {
        let function = self.registry.lookup(step.selector.function())?;
        function.arity().check(step.selector.function(), step.selector.args())?;
        function.call(self, step, step.selector.args())
    }

    /// Runs every remaining segment and returns the final output.
    pub fn run(&mut self) -> Result<Values> {
        while self.next()?.is_some() {}
        Ok(self
            .steps
            .last()
            .map(|s| s.output.clone())
            .unwrap_or_default())
    }

    /// Runs `selector` in a child context rooted at `value`. The child shares
    /// the registry only; create mode is not inherited and literals stay
    /// without metadata.
    pub fn sub_select(&self, value: &Value, selector: &str) -> Result<Values> {
        Context::untagged(value.clone(), selector, self.registry.clone()).run()
    }
}
