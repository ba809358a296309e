use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{Context, Step};
use crate::errors::{EvalError, Result};
use crate::value::{Value, Values};

mod aggregate;
mod filtering;
mod logic;
mod metadata;
mod navigation;

pub use aggregate::{Count, Join, Keys, Len, MapOf, Merge, Null, OrDefault, StringLit, TypeOf};
pub use filtering::{Dynamic, Filter, FilterOr, Search};
pub use logic::{And, Equal, LessThan, MoreThan, Not, Or};
pub use metadata::{Key, Metadata, Parent};
pub use navigation::{All, Append, First, Index, Last, Property, This};

/// A named selector function. Implementations read their inputs from the
/// previous step via `ctx.inputs(step)` and receive their arguments unparsed.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> Arity;
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values>;
}

/// Accepted argument counts for a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    min: usize,
    max: Option<usize>,
    multiple_of: usize,
}

impl Arity {
    pub const fn none() -> Self {
        Self::exactly(0)
    }

    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n), multiple_of: 1 }
    }

    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None, multiple_of: 1 }
    }

    pub const fn at_most(n: usize) -> Self {
        Self { min: 0, max: Some(n), multiple_of: 1 }
    }

    /// Additionally requires the count to be a multiple of `n`, for paired
    /// argument lists.
    pub const fn multiple_of(self, n: usize) -> Self {
        Self { multiple_of: n, ..self }
    }

    pub fn check(&self, function: &str, args: &[String]) -> Result<()> {
        let n = args.len();
        if self.max == Some(self.min) && n != self.min {
            return Err(EvalError::unexpected_args(
                function,
                args,
                format!("expected exactly {} argument(s), got {n}", self.min),
            ));
        }
        if n < self.min {
            return Err(EvalError::unexpected_args(
                function,
                args,
                format!("expected at least {} argument(s), got {n}", self.min),
            ));
        }
        if let Some(max) = self.max.filter(|max| n > *max) {
            return Err(EvalError::unexpected_args(
                function,
                args,
                format!("expected at most {max} argument(s), got {n}"),
            ));
        }
        if self.multiple_of > 1 && n % self.multiple_of != 0 {
            return Err(EvalError::unexpected_args(
                function,
                args,
                format!("expected a multiple of {} arguments, got {n}", self.multiple_of),
            ));
        }
        Ok(())
    }
}

/// Thread-safe function registry. Read-only once built, so clones are cheap
/// and can be handed to any number of contexts.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let builtins: Vec<Arc<dyn Function>> = vec![
            Arc::new(Property),
            Arc::new(Index),
            Arc::new(All),
            Arc::new(First),
            Arc::new(Last),
            Arc::new(Append),
            Arc::new(This),
            Arc::new(Filter),
            Arc::new(FilterOr),
            Arc::new(Dynamic),
            Arc::new(Search),
            Arc::new(Equal),
            Arc::new(LessThan),
            Arc::new(MoreThan),
            Arc::new(And),
            Arc::new(Or),
            Arc::new(Not),
            Arc::new(Count),
            Arc::new(Len),
            Arc::new(Keys),
            Arc::new(MapOf),
            Arc::new(Join),
            Arc::new(Merge),
            Arc::new(TypeOf),
            Arc::new(StringLit),
            Arc::new(Null),
            Arc::new(OrDefault),
            Arc::new(Key),
            Arc::new(Parent),
            Arc::new(Metadata),
        ];
        let map = builtins.into_iter().map(|f| (f.name(), f)).collect();
        Self { inner: Arc::new(map) }
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Function>> {
        self.get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner.keys().copied()
    }
}

/// Runs `selector` against `value` for a function that accepts at most one
/// result.
pub(crate) fn select_at_most_one(
    ctx: &Context,
    function: &str,
    value: &Value,
    selector: &str,
) -> Result<Option<Value>> {
    let mut found = ctx.sub_select(value, selector)?;
    match found.len() {
        0 | 1 => Ok(found.pop()),
        got => Err(EvalError::UnexpectedResultCount {
            function: function.to_string(),
            selector: selector.to_string(),
            expected: "at most one",
            got,
        }),
    }
}

/// Like `select_at_most_one`, but the selector must produce a value.
pub(crate) fn select_exactly_one(
    ctx: &Context,
    function: &str,
    value: &Value,
    selector: &str,
) -> Result<Value> {
    let mut found = ctx.sub_select(value, selector)?;
    match (found.pop(), found.len()) {
        (Some(v), 0) => Ok(v),
        (last, rest) => Err(EvalError::UnexpectedResultCount {
            function: function.to_string(),
            selector: selector.to_string(),
            expected: "exactly one",
            got: rest + usize::from(last.is_some()),
        }),
    }
}
