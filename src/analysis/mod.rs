use tracing::debug;

use crate::{ast::Stmt, MinikError};

mod resolver;

pub use resolver::{Bindings, Resolution, Resolver};

/// Resolves every variable-use site in `stmts` and validates the placement of
/// `return`, `break`, `continue`, `defer`, labels and file imports.
pub fn analyze(stmts: &[Stmt]) -> (Resolution, Vec<MinikError>) {
    let (resolution, errs) = Resolver::default().resolve(stmts);
    debug!(bindings = resolution.bindings.len(), transient = resolution.transient.len(), errors = errs.len(), "resolved program");
    (resolution, errs)
}
