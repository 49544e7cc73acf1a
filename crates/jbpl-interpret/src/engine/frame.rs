use super::*;

/// Locals and labels of one instruction root.
#[derive(Debug, Clone, Default)]
pub struct Slots {
    locals: HashMap<String, u16>,
    next_local: u16,
    labels: HashMap<String, LabelId>,
    placed: HashSet<LabelId>,
    next_label: u32,
}

impl Slots {
    pub fn starting_at(next_local: u16, next_label: u32) -> Self {
        Self {
            next_local,
            next_label,
            ..Self::default()
        }
    }

    /// Declares a named local, at `index` or at the next free slot.
    pub fn declare_local(&mut self, name: &str, index: Option<u16>) -> u16 {
        let slot = index.unwrap_or(self.next_local);
        self.locals.insert(name.to_string(), slot);
        self.next_local = self.next_local.max(slot.saturating_add(1));
        slot
    }

    pub fn local(&self, name: &str) -> Option<u16> {
        self.locals.get(name).copied()
    }

    pub fn label(&mut self, name: &str) -> LabelId {
        if let Some(label) = self.labels.get(name) {
            return *label;
        }
        let label = LabelId(self.next_label);
        self.next_label += 1;
        self.labels.insert(name.to_string(), label);
        label
    }

    /// Marks a label as placed; each label may be placed once.
    pub fn place(&mut self, name: &str, range: TokenRange) -> Result<LabelId> {
        let label = self.label(name);
        interp_ensure!(
            self.placed.insert(label),
            format!("Label '{}' is already placed", name),
            range
        );
        Ok(label)
    }

    pub fn label_names(&self) -> HashMap<LabelId, String> {
        self.labels
            .iter()
            .map(|(name, label)| (*label, name.clone()))
            .collect()
    }
}

/// Encodes bound instructions against the slots of an instruction root.
pub struct FrameEncoder<'s> {
    pub slots: &'s mut Slots,
}

impl EncodingContext for FrameEncoder<'_> {
    fn operand(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Instruction(instruction) => Ok(Value::Instruction(instruction.clone())),
            _ => Err(interpretation_error_at(
                "Instruction operand was not bound before encoding",
                expr.range,
            )),
        }
    }

    fn label(&mut self, name: &str) -> LabelId {
        self.slots.label(name)
    }

    fn local(&mut self, name: &str) -> Option<u16> {
        self.slots.local(name)
    }
}

/// Activation record of one scope-owning element.
pub struct StackFrame<'a> {
    pub(crate) scope: Rc<Scope<'a>>,
    pub(crate) values: Vec<Value>,
    /// Values below this index are the positional arguments of a macro call.
    pub(crate) base: usize,
    pub(crate) instructions: Vec<InsnNode>,
    pub(crate) slots: Slots,
    pub(crate) named: HashMap<String, Value>,
    /// Names this frame introduced; they never flow back to the parent.
    pub(crate) introduced: HashSet<String>,
    pub(crate) intrinsic_macros: Rc<IntrinsicMacros>,
    pub(crate) intrinsic_defines: HashMap<String, IntrinsicDefine>,
    /// Evaluates in a borrowed scope and never merges into its parent.
    pub(crate) detached: bool,
}

impl<'a> StackFrame<'a> {
    pub fn scope(&self) -> &Rc<Scope<'a>> {
        &self.scope
    }

    pub fn owner(&self) -> ScopeOwner<'a> {
        self.scope.owner
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Positional arguments a macro frame was entered with.
    pub fn arguments(&self) -> &[Value] {
        &self.values[..self.base.min(self.values.len())]
    }

    pub fn instructions(&self) -> &[InsnNode] {
        &self.instructions
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    pub fn intrinsic_define(&self, name: &str) -> Option<&IntrinsicDefine> {
        self.intrinsic_defines.get(name)
    }

    /// Whether the frame keeps its own code, locals and labels.
    pub fn is_instruction_root(&self) -> bool {
        !self.detached && self.scope.owner.is_instruction_root()
    }

    pub fn merge_policy(&self) -> MergePolicy {
        if self.detached {
            MergePolicy::Nothing
        } else {
            self.scope.owner.merge_policy()
        }
    }

    pub fn describe(&self) -> String {
        self.scope.owner.describe()
    }
}

impl Debug for StackFrame<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackFrame")
            .field("owner", &self.describe())
            .field("values", &self.values)
            .field("base", &self.base)
            .field("instructions", &self.instructions.len())
            .field("named", &self.named)
            .finish_non_exhaustive()
    }
}

/// Builds a [`StackFrame`]; every intrinsic a frame carries is given here.
pub struct FrameBuilder<'a> {
    scope: Rc<Scope<'a>>,
    arguments: Vec<Value>,
    named: HashMap<String, Value>,
    introduced: HashSet<String>,
    intrinsic_macros: Option<Rc<IntrinsicMacros>>,
    intrinsic_defines: HashMap<String, IntrinsicDefine>,
    slots: Slots,
    detached: bool,
}

impl<'a> FrameBuilder<'a> {
    pub fn new(scope: Rc<Scope<'a>>) -> Self {
        Self {
            scope,
            arguments: Vec::new(),
            named: HashMap::new(),
            introduced: HashSet::new(),
            intrinsic_macros: None,
            intrinsic_defines: HashMap::new(),
            slots: Slots::default(),
            detached: false,
        }
    }

    /// Copies the named values and intrinsic macros visible in `parent`.
    pub fn inherit(mut self, parent: &StackFrame<'a>) -> Self {
        self.named = parent.named.clone();
        self.intrinsic_macros = Some(Rc::clone(&parent.intrinsic_macros));
        self
    }

    pub fn intrinsic_macros(mut self, macros: Rc<IntrinsicMacros>) -> Self {
        self.intrinsic_macros = Some(macros);
        self
    }

    pub fn arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.introduced.insert(name.clone());
        self.named.insert(name, value);
        self
    }

    pub fn define(mut self, name: impl Into<String>, define: IntrinsicDefine) -> Self {
        self.intrinsic_defines.insert(name.into(), define);
        self
    }

    pub fn slots(mut self, slots: Slots) -> Self {
        self.slots = slots;
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub fn build(self) -> StackFrame<'a> {
        let base = self.arguments.len();
        StackFrame {
            scope: self.scope,
            values: self.arguments,
            base,
            instructions: Vec::new(),
            slots: self.slots,
            named: self.named,
            introduced: self.introduced,
            intrinsic_macros: self.intrinsic_macros.unwrap_or_default(),
            intrinsic_defines: self.intrinsic_defines,
            detached: self.detached,
        }
    }
}
