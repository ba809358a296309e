pub mod comparison;
pub mod condition;
pub mod context;
pub mod engine;
pub mod errors;
pub mod format;
pub mod functions;
pub mod node;
pub mod parser;
pub mod selector;
pub mod value;

use tracing::{debug, warn};

use context::Context;
use errors::Result;
use functions::Registry;
use node::Node;
use value::{Document, Value, Values};

/// Runs selectors against documents with a fixed function registry.
#[derive(Clone)]
pub struct Evaluator {
    registry: Registry,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

impl Evaluator {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every value `selector` matches, plus how many there were.
    pub fn select(&self, root: &Value, selector: &str) -> Result<(Values, usize)> {
        let values = Context::with_registry(root.clone(), selector, self.registry.clone()).run()?;
        let count = values.len();
        Ok((values, count))
    }

    /// Overwrites every match with `new`, creating missing containers along
    /// the way. Returns how many locations were written. On error the document
    /// is left as it was before the call.
    pub fn modify(&self, root: &Value, selector: &str, new: impl Into<Node>) -> Result<usize> {
        let new = new.into();
        let snapshot = root.document().root();
        let written = self.write_all(root, selector, &new);
        if let Err(e) = &written {
            debug!(error = %e, "modify failed, restoring document");
            root.document().restore(snapshot);
        }
        written
    }

    fn write_all(&self, root: &Value, selector: &str, new: &Node) -> Result<usize> {
        let matched = Context::with_registry(root.clone(), selector, self.registry.clone())
            .with_create_when_missing(true)
            .run()?;
        // Writing an ancestor already replaces everything below it.
        let targets: Values = matched
            .iter()
            .filter(|t| !matched.iter().any(|other| other.is_ancestor_of(t)))
            .cloned()
            .collect();
        for target in &targets {
            target.set(new.clone())?;
        }
        Ok(targets.len())
    }

    /// Removes every match. All targets are marked before any array is
    /// compacted, so earlier removals never shift later targets.
    pub fn delete(&self, root: &Value, selector: &str) -> Result<()> {
        let targets = Context::with_registry(root.clone(), selector, self.registry.clone()).run()?;
        let mut touched: Vec<Document> = Vec::new();
        for target in &targets {
            if !target.mark_deleted()? {
                warn!(path = ?target.path(), "delete target already gone");
            }
            if !touched.iter().any(|d| d.same_as(target.document())) {
                touched.push(target.document().clone());
            }
        }
        for doc in &touched {
            doc.compact();
        }
        Ok(())
    }
}

pub use engine::{delete, from_json, modify, select};
pub use errors::EvalError;
pub use format::{FormatOptions, JsonFormat, Reader, Writer};
