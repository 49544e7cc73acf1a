//! Frame-based evaluation of a lowered [`AssemblyFile`].
//!
//! The context walks the tree with an explicit stack of [`StackFrame`]s, one
//! per scope-owning element that is running. Statements and expressions are
//! evaluated in `stmt.rs` and `expr.rs`, declarations and output edits in
//! `decl.rs`, macro calls in `macros.rs` and injectors in `inject.rs`.

mod decl;
mod defines;
mod expr;
mod flow;
mod frame;
mod inject;
mod macros;
mod ops;
mod output;
mod stmt;
mod typing;

pub use flow::*;
pub use frame::*;
pub use output::*;
pub use typing::ScopedTypes;

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::sync::Arc;

use jbpl_bytecode::{ClassVersion, InsnNode, LabelId};
use jbpl_core::ast::*;
use jbpl_core::config;
use jbpl_core::diagnostics::{Diagnostic, DiagnosticManager};
use jbpl_core::error::{Error, Result, StackTrace, StackTraceFrame, SymbolKind};
use jbpl_core::lower::{lower_file, IncludeResolver};
use jbpl_core::scope::{MergePolicy, Resolvers, Scope, ScopeIndex, ScopeOwner};
use jbpl_core::span::TokenRange;
use jbpl_core::types::Type;
use jbpl_core::value::Value;
use jbpl_core::{debug, trace};

use crate::codec::{DecoderRegistry, EncodingContext};
use crate::error::{interpretation_error, interpretation_error_at};
use crate::intrinsics::{IntrinsicDefine, IntrinsicMacro, IntrinsicMacros, MessageSink};
use crate::interp_ensure;

const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Clone)]
pub struct EvaluationOptions {
    /// Class file version of classes declared before any `version` statement.
    pub version: ClassVersion,
    pub class_provider: Arc<dyn ClassProvider>,
    pub info_sink: MessageSink,
    pub error_sink: MessageSink,
    pub diagnostics: DiagnosticManager,
    /// Extra intrinsic macros; they replace built-ins of the same name.
    pub intrinsics: Vec<IntrinsicMacro>,
    pub max_depth: usize,
}

impl EvaluationOptions {
    pub fn with_version(mut self, version: ClassVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_class_provider(mut self, provider: Arc<dyn ClassProvider>) -> Self {
        self.class_provider = provider;
        self
    }

    pub fn with_info_sink(mut self, sink: impl Fn(&str) + 'static) -> Self {
        self.info_sink = Rc::new(sink);
        self
    }

    pub fn with_error_sink(mut self, sink: impl Fn(&str) + 'static) -> Self {
        self.error_sink = Rc::new(sink);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticManager) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_intrinsic(mut self, intrinsic: IntrinsicMacro) -> Self {
        self.intrinsics.push(intrinsic);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            version: ClassVersion::default(),
            class_provider: Arc::new(ClassPool::new()),
            info_sink: Rc::new(|message: &str| jbpl_core::info!("{}", message)),
            error_sink: Rc::new(|message: &str| jbpl_core::error!("{}", message)),
            diagnostics: DiagnosticManager::new(),
            intrinsics: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Debug for EvaluationOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationOptions")
            .field("version", &self.version)
            .field("intrinsics", &self.intrinsics)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub classes: OutputMap,
    pub diagnostics: Vec<Diagnostic>,
    /// Version in effect when evaluation finished.
    pub version: ClassVersion,
}

/// Evaluates an already lowered file.
pub fn evaluate_file(file: &AssemblyFile, options: EvaluationOptions) -> Result<EvaluationOutcome> {
    let mut context = EvaluationContext::new(file, options)?;
    context.evaluate()?;
    Ok(context.into_outcome())
}

/// Lowers a parsed file, resolving includes through `includes`, then evaluates it.
pub fn lower_and_evaluate(
    file: AssemblyFile,
    includes: &mut dyn IncludeResolver,
    options: EvaluationOptions,
) -> Result<EvaluationOutcome> {
    let lowered = lower_file(file, includes)?;
    evaluate_file(&lowered, options)
}

/// Mutable state of one file's evaluation.
pub struct EvaluationContext<'a> {
    file: &'a AssemblyFile,
    index: ScopeIndex<'a>,
    resolvers: Resolvers<'a>,
    frames: Vec<StackFrame<'a>>,
    flow: ControlFlowState,
    output: OutputMap,
    version: ClassVersion,
    /// Values of defines evaluated so far, dropped when the declaring scope's frame pops.
    define_values: HashMap<NodeKey, Value>,
    /// Defines whose value is being computed.
    pending_defines: HashSet<NodeKey>,
    intrinsic_macros: Rc<IntrinsicMacros>,
    decoders: DecoderRegistry,
    options: EvaluationOptions,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(file: &'a AssemblyFile, options: EvaluationOptions) -> Result<Self> {
        let index = ScopeIndex::build(file);
        let resolvers = Resolvers::analyze(&index)?;
        let mut intrinsic_macros = IntrinsicMacros::standard(
            Rc::clone(&options.info_sink),
            Rc::clone(&options.error_sink),
            options.diagnostics.clone(),
        );
        for intrinsic in &options.intrinsics {
            intrinsic_macros.register(intrinsic.clone());
        }
        debug!(
            "prepared {} with {} scopes",
            file.path,
            index.len()
        );
        Ok(Self {
            file,
            index,
            resolvers,
            frames: Vec::new(),
            flow: ControlFlowState::default(),
            output: OutputMap::new(),
            version: options.version,
            define_values: HashMap::new(),
            pending_defines: HashSet::new(),
            intrinsic_macros: Rc::new(intrinsic_macros),
            decoders: DecoderRegistry::standard(),
            options,
        })
    }

    /// Evaluates every directly evaluated element of the file.
    ///
    /// A failure carries a stack trace of the frames that were live.
    pub fn evaluate(&mut self) -> Result<()> {
        let result = self.evaluate_root();
        result.map_err(|error| {
            let trace = self.stack_trace();
            self.frames.clear();
            self.flow.reset();
            error.with_trace(trace)
        })
    }

    fn evaluate_root(&mut self) -> Result<()> {
        let file = self.file;
        let frame = self.frame(Rc::clone(self.index.root())).build();
        self.push_frame(frame)?;
        for element in file.elements.iter().filter(|it| it.is_evaluated_directly()) {
            self.evaluate_element(element)?;
            if let Some(flow) = self.pending_flow() {
                return Err(interpretation_error_at(
                    format!("Cannot use {} outside of a function or macro", flow),
                    element.range(),
                ));
            }
        }
        self.pop_frame()?;
        Ok(())
    }

    /// Evaluates a single expression, in the file scope when nothing is running.
    pub fn evaluate_expr(&mut self, expr: &'a Expr) -> Result<Value> {
        if !self.frames.is_empty() {
            return self.eval_expr(expr);
        }
        let frame = self.frame(Rc::clone(self.index.root())).build();
        self.push_frame(frame)?;
        let result = self.eval_expr(expr);
        self.frames.clear();
        self.flow.reset();
        result
    }

    pub fn frames(&self) -> &[StackFrame<'a>] {
        &self.frames
    }

    pub fn flow(&self) -> ControlFlowState {
        self.flow
    }

    pub fn output(&self) -> &OutputMap {
        &self.output
    }

    pub fn version(&self) -> ClassVersion {
        self.version
    }

    pub fn into_outcome(self) -> EvaluationOutcome {
        EvaluationOutcome {
            classes: self.output,
            diagnostics: self.options.diagnostics.get_diagnostics(),
            version: self.version,
        }
    }

    fn stack_trace(&self) -> StackTrace {
        StackTrace {
            frames: self
                .frames
                .iter()
                .rev()
                .map(|frame| StackTraceFrame {
                    owner: frame.describe(),
                    range: frame.owner().range(),
                })
                .collect(),
        }
    }

    // ===== FRAMES =====

    /// A builder for a frame in `scope` that sees what the current frame sees.
    pub(crate) fn frame(&self, scope: Rc<Scope<'a>>) -> FrameBuilder<'a> {
        match self.frames.last() {
            Some(parent) => FrameBuilder::new(scope).inherit(parent),
            None => FrameBuilder::new(scope).intrinsic_macros(Rc::clone(&self.intrinsic_macros)),
        }
    }

    pub(crate) fn scope_of(&self, owner: ScopeOwner<'a>) -> Rc<Scope<'a>> {
        self.index.scope_of(&owner)
    }

    pub(crate) fn push_frame(&mut self, frame: StackFrame<'a>) -> Result<()> {
        interp_ensure!(
            self.frames.len() < self.options.max_depth,
            "Maximum macro call depth exceeded",
            frame.owner().range()
        );
        if config::trace_frames() {
            debug!("push {} at depth {}", frame.describe(), self.frames.len() + 1);
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the top frame and merges it into its parent as its owner dictates.
    pub(crate) fn pop_frame(&mut self) -> Result<StackFrame<'a>> {
        let mut frame = self
            .frames
            .pop()
            .ok_or_else(|| interpretation_error("Cannot pop from an empty frame stack"))?;
        if config::trace_frames() {
            debug!("pop {} at depth {}", frame.describe(), self.frames.len() + 1);
        }
        if frame.detached {
            return Ok(frame);
        }
        self.forget_defines(frame.owner());
        let policy = frame.merge_policy();
        if let Some(parent) = self.frames.last_mut() {
            if policy.merges_values() {
                let base = frame.base.min(frame.values.len());
                parent.values.extend(frame.values.drain(base..));
            }
            if policy.merges_instructions() {
                parent.instructions.append(&mut frame.instructions);
            }
            if !frame.owner().is_callable() {
                for (name, value) in &frame.named {
                    if !frame.introduced.contains(name) && parent.named.contains_key(name) {
                        parent.named.insert(name.clone(), value.clone());
                    }
                }
            }
        }
        Ok(frame)
    }

    /// Pushes a frame for `owner`, evaluates its elements and pops it again.
    pub(crate) fn evaluate_scoped(&mut self, owner: ScopeOwner<'a>) -> Result<()> {
        let frame = self.frame(self.scope_of(owner)).build();
        self.push_frame(frame)?;
        self.evaluate_elements(owner.elements())?;
        self.pop_frame()?;
        Ok(())
    }

    pub(crate) fn top(&self) -> Result<&StackFrame<'a>> {
        self.frames
            .last()
            .ok_or_else(|| interpretation_error("No frame is being evaluated"))
    }

    pub(crate) fn top_mut(&mut self) -> Result<&mut StackFrame<'a>> {
        self.frames
            .last_mut()
            .ok_or_else(|| interpretation_error("No frame is being evaluated"))
    }

    /// Index of the nearest frame that keeps its own code, locals and labels.
    pub(crate) fn root_index(&self) -> Result<usize> {
        self.frames
            .iter()
            .rposition(StackFrame::is_instruction_root)
            .ok_or_else(|| interpretation_error("No instruction root frame is being evaluated"))
    }

    pub(crate) fn push_value(&mut self, value: Value) -> Result<()> {
        self.top_mut()?.values.push(value);
        Ok(())
    }

    /// Drops every value above `mark` from the current frame and returns the last one.
    pub(crate) fn take_result(&mut self, mark: usize) -> Result<Value> {
        let frame = self.top_mut()?;
        let mark = mark.min(frame.values.len());
        Ok(frame.values.split_off(mark).pop().unwrap_or(Value::Unit))
    }

    /// BREAK or CONTINUE that escaped every loop.
    pub(crate) fn pending_flow(&self) -> Option<ControlFlow> {
        self.flow.loop_transfer().or_else(|| {
            self.flow
                .is_set(ControlFlow::Return)
                .then_some(ControlFlow::Return)
        })
    }

    /// Consumes the RETURN of a function, macro or injector body.
    ///
    /// Returns whether the body returned.
    pub(crate) fn finish_callable(&mut self, range: TokenRange) -> Result<bool> {
        if let Some(flow) = self.flow.loop_transfer() {
            return Err(interpretation_error_at(
                format!("Cannot use {} outside of a loop", flow),
                range,
            ));
        }
        let returned = self.flow.is_set(ControlFlow::Return);
        self.flow.clear(ControlFlow::Return);
        Ok(returned)
    }

    // ===== DEFINES =====

    fn forget_defines(&mut self, owner: ScopeOwner<'a>) {
        for element in owner.elements() {
            if let Some(StatementKind::Define(define)) = element.as_statement().map(|it| &it.kind) {
                self.define_values.remove(&NodeKey::of(define));
            }
        }
    }

    /// The define visible as `name` from the current frame, with its declaring scope.
    pub(crate) fn find_define(&self, name: &str) -> Option<(&'a DefineStatement, Rc<Scope<'a>>)> {
        let scope = self.frames.last()?.scope();
        scope.find(|scope| {
            let define = self.resolvers.defines.resolve_locally(scope, name)?;
            Some((define, self.index.scope_of(&scope.owner)))
        })
    }

    /// Value of a define, evaluated in its declaring scope on first use.
    pub(crate) fn define_value(
        &mut self,
        define: &'a DefineStatement,
        scope: Rc<Scope<'a>>,
        range: TokenRange,
    ) -> Result<Value> {
        let key = NodeKey::of(define);
        if let Some(value) = self.define_values.get(&key) {
            return Ok(value.clone());
        }
        interp_ensure!(
            self.pending_defines.insert(key),
            format!("Define '{}' refers to itself", define.name),
            range
        );
        let frame = self.frame(Rc::clone(&scope)).detached().build();
        self.push_frame(frame)?;
        let value = self.eval_expr(&define.value)?;
        self.pop_frame()?;
        self.pending_defines.remove(&key);

        let value = if define.ty.is_unit() {
            value
        } else {
            let ty = self.literal_type_in(&define.ty, &scope)?;
            self.coerce(value, &ty, range, || format!("define '{}'", define.name))?
        };
        trace!("define {} = {}", define.name, value);
        self.define_values.insert(key, value.clone());
        Ok(value)
    }

    /// Converts `value` for a slot of type `ty`, failing unless the slot accepts it.
    pub(crate) fn coerce(
        &self,
        value: Value,
        ty: &Type,
        range: TokenRange,
        target: impl FnOnce() -> String,
    ) -> Result<Value> {
        let actual = value.ty();
        if !ty.is_assignable_from(&actual) {
            return Err(Error::type_mismatch(
                format!(
                    "Cannot assign value of type {} to {} of type {}",
                    actual,
                    target(),
                    ty
                ),
                range,
            ));
        }
        value.cast(ty).map_err(|error| error.at(range))
    }

    // ===== REFERENCES =====

    /// The intrinsic define `name` of the frames down to the nearest root.
    pub(crate) fn intrinsic_define(&self, name: &str) -> Option<IntrinsicDefine> {
        for frame in self.frames.iter().rev() {
            if let Some(define) = frame.intrinsic_define(name) {
                return Some(define.clone());
            }
            if frame.is_instruction_root() {
                break;
            }
        }
        None
    }

    /// Looks `name` up as intrinsic define, frame value, define, type alias and
    /// compile-time class, in that order. `None` when nothing is visible.
    pub(crate) fn reference_value(&mut self, name: &str, range: TokenRange) -> Result<Option<Value>> {
        if let Some(define) = self.intrinsic_define(name) {
            return self.read_intrinsic(&define, range).map(Some);
        }
        let frame = self.top()?;
        if let Some(value) = frame.named(name) {
            return Ok(Some(value.clone()));
        }
        if let Some((define, scope)) = self.find_define(name) {
            return self.define_value(define, scope, range).map(Some);
        }
        let scope = Rc::clone(self.top()?.scope());
        if self.resolvers.aliases.resolve(&scope, name).is_some()
            || self.resolvers.classes.resolve(&scope, name).is_some()
        {
            let ty = Type::Unresolved(name.to_string())
                .resolve(&self.types_in(&scope))
                .map_err(|error| error.at(range))?;
            return Ok(Some(Value::Type(ty)));
        }
        Ok(None)
    }

    pub(crate) fn lookup(&mut self, name: &str, range: TokenRange) -> Result<Value> {
        self.reference_value(name, range)?
            .ok_or_else(|| Error::unresolved(SymbolKind::Define, name, range))
    }
}

impl Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("file", &self.file.path)
            .field("frames", &self.frames)
            .field("flow", &self.flow)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
