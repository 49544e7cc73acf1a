//! AST to AST passes run between parsing and evaluation.
//!
//! Validation runs on the file as parsed; the passes then run in a fixed
//! order because each assumes the previous ones are done: includes are
//! expanded, compounds are flattened, no-ops are dropped. Literal version
//! statements are checked last.

mod compound;
mod include;
mod noop;
mod validate;

pub use compound::*;
pub use include::*;
pub use noop::*;
pub use validate::*;

use crate::ast::visit::Transformer;
use crate::ast::AssemblyFile;
use crate::error::Result;
use crate::{config, debug, trace};

pub trait LoweringPass {
    fn name(&self) -> &str;

    fn lower(&mut self, file: AssemblyFile) -> Result<AssemblyFile>;
}

impl<T: Transformer> LoweringPass for (&'static str, T) {
    fn name(&self) -> &str {
        self.0
    }

    fn lower(&mut self, file: AssemblyFile) -> Result<AssemblyFile> {
        self.1.transform_file(file)
    }
}

/// Validates and lowers a parsed file.
pub fn lower_file(file: AssemblyFile, includes: &mut dyn IncludeResolver) -> Result<AssemblyFile> {
    validate_file(&file)?;
    let path = file.path.clone();

    let mut passes: Vec<Box<dyn LoweringPass + '_>> = vec![
        Box::new(IncludeLowering::new(includes)),
        Box::new(("compound", CompoundLowering)),
        Box::new(("noop", NoopRemoval)),
    ];
    let mut file = file;
    for pass in passes.iter_mut() {
        trace!("running lowering pass '{}' on {}", pass.name(), path);
        file = pass.lower(file)?;
    }

    validate_versions(&file)?;
    if config::dump_lowered() {
        debug!("lowered {}:\n{}", path, file.to_json()?);
    }
    Ok(file)
}
