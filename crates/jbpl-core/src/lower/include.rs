use std::collections::HashSet;

use super::{validate_file, LoweringPass};
use crate::ast::visit::{walk_element, Transformer};
use crate::ast::*;
use crate::error::{Error, Result};
use crate::span::TokenRange;
use crate::debug;

/// Supplies the parsed tree of an included path.
pub trait IncludeResolver {
    fn resolve(&mut self, path: &str) -> Result<AssemblyFile>;
}

impl<F> IncludeResolver for F
where
    F: FnMut(&str) -> Result<AssemblyFile>,
{
    fn resolve(&mut self, path: &str) -> Result<AssemblyFile> {
        self(path)
    }
}

/// Rejects every include.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&mut self, path: &str) -> Result<AssemblyFile> {
        Err(Error::lowering(
            format!("No include resolver available for '{}'", path),
            TokenRange::Undefined,
        ))
    }
}

/// Replaces each include statement with the lowered elements of the named file.
/// A path is expanded once per file; later includes of it vanish.
pub struct IncludeLowering<'r> {
    resolver: &'r mut dyn IncludeResolver,
    included: HashSet<String>,
}

impl<'r> IncludeLowering<'r> {
    pub fn new(resolver: &'r mut dyn IncludeResolver) -> Self {
        Self {
            resolver,
            included: HashSet::new(),
        }
    }

    fn expand(&mut self, path: &str, range: TokenRange) -> Result<Vec<Element>> {
        if !self.included.insert(path.to_string()) {
            debug!("skipping repeated include of {}", path);
            return Ok(Vec::new());
        }
        let file = self.resolver.resolve(path).map_err(|error| {
            Error::lowering(format!("Could not include '{}': {}", path, error.root()), range)
        })?;
        validate_file(&file)?;
        let elements = self.transform_elements(file.elements)?;
        debug!("included {} elements from {}", elements.len(), path);
        Ok(elements.into_iter().filter(is_exported).collect())
    }
}

/// Private defines, type aliases and macros stay in the file that declares them.
fn is_exported(element: &Element) -> bool {
    match element {
        Element::Statement(stmt) => match &stmt.kind {
            StatementKind::Define(define) => !define.is_private,
            StatementKind::TypeAlias(alias) => !alias.is_private,
            _ => true,
        },
        Element::Declaration(decl) => match &decl.kind {
            DeclarationKind::Macro(decl) => !decl.is_private,
            _ => true,
        },
        Element::Expr(_) => true,
    }
}

impl Transformer for IncludeLowering<'_> {
    fn transform_element(&mut self, element: Element) -> Result<Vec<Element>> {
        match element {
            Element::Statement(Statement {
                kind: StatementKind::Include(include),
                range,
            }) => self.expand(&include.path, range),
            other => walk_element(self, other),
        }
    }
}

impl LoweringPass for IncludeLowering<'_> {
    fn name(&self) -> &str {
        "include"
    }

    fn lower(&mut self, file: AssemblyFile) -> Result<AssemblyFile> {
        self.included.insert(file.path.clone());
        self.transform_file(file)
    }
}
