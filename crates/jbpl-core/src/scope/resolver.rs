use std::collections::HashMap;

use super::{Scope, ScopeIndex};
use crate::ast::*;
use crate::error::{Error, Result, SymbolKind};

/// Elements that are looked up by name.
pub trait Named {
    const KIND: SymbolKind;

    fn name(&self) -> &str;

    /// Picks this kind of element out of a container's element list.
    fn select(element: &Element) -> Option<&Self>;
}

impl Named for MacroDecl {
    const KIND: SymbolKind = SymbolKind::Macro;

    fn name(&self) -> &str {
        &self.name
    }

    fn select(element: &Element) -> Option<&Self> {
        match &element.as_declaration()?.kind {
            DeclarationKind::Macro(decl) => Some(decl),
            _ => None,
        }
    }
}

impl Named for PreproClassDecl {
    const KIND: SymbolKind = SymbolKind::Type;

    fn name(&self) -> &str {
        &self.name
    }

    fn select(element: &Element) -> Option<&Self> {
        match &element.as_declaration()?.kind {
            DeclarationKind::PreproClass(decl) => Some(decl),
            _ => None,
        }
    }
}

impl Named for SelectorDecl {
    const KIND: SymbolKind = SymbolKind::Selector;

    fn name(&self) -> &str {
        &self.name
    }

    fn select(element: &Element) -> Option<&Self> {
        match &element.as_declaration()?.kind {
            DeclarationKind::Selector(decl) => Some(decl),
            _ => None,
        }
    }
}

impl Named for DefineStatement {
    const KIND: SymbolKind = SymbolKind::Define;

    fn name(&self) -> &str {
        &self.name
    }

    fn select(element: &Element) -> Option<&Self> {
        match &element.as_statement()?.kind {
            StatementKind::Define(define) => Some(define),
            _ => None,
        }
    }
}

impl Named for TypeAliasStatement {
    const KIND: SymbolKind = SymbolKind::Type;

    fn name(&self) -> &str {
        &self.name
    }

    fn select(element: &Element) -> Option<&Self> {
        match &element.as_statement()?.kind {
            StatementKind::TypeAlias(alias) => Some(alias),
            _ => None,
        }
    }
}

/// Per-scope name tables for one element kind, collected once before evaluation.
#[derive(Debug)]
pub struct NamedResolver<'a, T> {
    tables: HashMap<NodeKey, HashMap<&'a str, Vec<&'a T>>>,
}

impl<'a, T: Named> NamedResolver<'a, T> {
    /// Collects every `T` declared directly in each scope's owner.
    ///
    /// A name may be declared more than once in the same scope only when
    /// `overloadable` is set.
    pub fn analyze(index: &ScopeIndex<'a>, overloadable: bool) -> Result<Self> {
        let mut tables: HashMap<NodeKey, HashMap<&'a str, Vec<&'a T>>> = HashMap::new();
        for scope in index.scopes() {
            for element in scope.owner.elements() {
                let Some(named) = T::select(element) else {
                    continue;
                };
                let entries = tables
                    .entry(scope.key())
                    .or_default()
                    .entry(named.name())
                    .or_default();
                if !overloadable && !entries.is_empty() {
                    return Err(Error::evaluation(
                        format!("{} '{}' is already declared in this scope", T::KIND, named.name()),
                        element.range(),
                    ));
                }
                entries.push(named);
            }
        }
        Ok(Self { tables })
    }

    pub fn resolve_locally(&self, scope: &Scope<'a>, name: &str) -> Option<&'a T> {
        self.overloads_locally(scope, name).first().copied()
    }

    /// Nearest declaration of `name`, walking outwards from `scope`.
    pub fn resolve(&self, scope: &Scope<'a>, name: &str) -> Option<&'a T> {
        scope.find(|scope| self.resolve_locally(scope, name))
    }

    fn overloads_locally(&self, scope: &Scope<'a>, name: &str) -> &[&'a T] {
        self.tables
            .get(&scope.key())
            .and_then(|table| table.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All declarations of `name` in the nearest scope that declares it.
    pub fn resolve_overloads(&self, scope: &Scope<'a>, name: &str) -> Vec<&'a T> {
        scope
            .find(|scope| {
                let overloads = self.overloads_locally(scope, name);
                (!overloads.is_empty()).then(|| overloads.to_vec())
            })
            .unwrap_or_default()
    }

    /// Every declaration of `name` visible from `scope`, innermost first.
    pub fn resolve_all(&self, scope: &Scope<'a>, name: &str) -> Vec<&'a T> {
        scope
            .find_all(|scope| {
                let overloads = self.overloads_locally(scope, name);
                (!overloads.is_empty()).then(|| overloads.to_vec())
            })
            .into_iter()
            .flatten()
            .collect()
    }

    /// Registers a declaration that has no place in the tree.
    pub fn inject(&mut self, scope: &Scope<'a>, value: &'a T) {
        self.tables
            .entry(scope.key())
            .or_default()
            .entry(value.name())
            .or_default()
            .push(value);
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every named table the evaluator consults.
#[derive(Debug)]
pub struct Resolvers<'a> {
    pub macros: NamedResolver<'a, MacroDecl>,
    pub classes: NamedResolver<'a, PreproClassDecl>,
    pub selectors: NamedResolver<'a, SelectorDecl>,
    pub defines: NamedResolver<'a, DefineStatement>,
    pub aliases: NamedResolver<'a, TypeAliasStatement>,
}

impl<'a> Resolvers<'a> {
    pub fn analyze(index: &ScopeIndex<'a>) -> Result<Self> {
        Ok(Self {
            macros: NamedResolver::analyze(index, true)?,
            classes: NamedResolver::analyze(index, false)?,
            selectors: NamedResolver::analyze(index, false)?,
            defines: NamedResolver::analyze(index, false)?,
            aliases: NamedResolver::analyze(index, false)?,
        })
    }
}
