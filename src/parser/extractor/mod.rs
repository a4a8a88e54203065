//
//  mod.rs
//  apisig
//

mod helpers;
mod imports;
mod parameters;
mod python;

use tree_sitter::Parser;
use tracing::{debug, warn};

use crate::config::ExtractConfig;
use crate::error::{SourceError, SourceErrorKind};
use crate::model::Object;
use crate::source::SourceUnit;

pub use parameters::extract_parameters;

/// Outcome of extracting one unit: its module tree, or the defects that
/// kept it out of the package.
pub type Extraction = std::result::Result<Object, Vec<SourceError>>;

/// Extract the unresolved module tree of one source unit.
///
/// The parser is passed in so callers can keep one per worker thread.
pub fn extract_module(parser: &mut Parser, unit: &SourceUnit, config: &ExtractConfig) -> Extraction {
    let source = unit.source_text.as_bytes();
    let Some(tree) = parser.parse(source, None) else {
        return Err(vec![SourceError::new(
            SourceErrorKind::Syntax,
            &unit.qualified_name,
            &unit.origin_path,
            0,
            0,
            "parser produced no tree",
        )]);
    };
    let root = tree.root_node();

    if let Some(bad) = helpers::first_error_node(&root) {
        let pos = bad.start_position();
        let message = if bad.is_missing() {
            format!("missing `{}`", bad.kind())
        } else {
            "invalid syntax".to_string()
        };
        warn!(
            module = %unit.qualified_name,
            line = pos.row + 1,
            column = pos.column + 1,
            "syntax error, unit skipped"
        );
        return Err(vec![SourceError::new(
            SourceErrorKind::Syntax,
            &unit.qualified_name,
            &unit.origin_path,
            pos.row + 1,
            pos.column + 1,
            message,
        )]);
    }

    let mut visitor = python::ModuleVisitor::new(
        source,
        &unit.qualified_name,
        &unit.origin_path,
        unit.is_package_init(),
        config,
    );
    let module = visitor.visit_module(&root);
    if !visitor.errors.is_empty() {
        for err in &visitor.errors {
            warn!(module = %unit.qualified_name, "{}", err);
        }
        return Err(visitor.errors);
    }

    debug!(
        module = %unit.qualified_name,
        members = module.members.len(),
        "extracted unit"
    );
    Ok(module)
}
