//! Interned expression trees with deferred, parameter-dependent evaluation.
//!
//! An [`Expr`] is a handle to an immutable node in the process-wide
//! expression pool. Building the same tree twice yields the same handle, so
//! equality and hashing are pointer comparisons. Expressions stay symbolic
//! until [`Expr::resolve`] substitutes [`Bindings`] and folds constant
//! subtrees; resolution never touches the declaration-level tree it starts
//! from.

use crate::error::IrError;
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::ops;
use strata_common::{Ident, Intern, InternPool, Interned};

/// Binding power of prefix operators: tighter than `*`, looser than `**`.
pub(crate) const PREFIX_BP: u8 = 21;

/// Prefix operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UnaryOp {
    /// Arithmetic negation `-`.
    Neg,
    /// Bitwise complement `~`.
    BitNot,
    /// Logical not `!`.
    Not,
    /// Absolute value `abs(..)`.
    Abs,
}

impl UnaryOp {
    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
            UnaryOp::Abs => "abs",
        }
    }
}

/// Infix operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`, truncating.
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`, arithmetic.
    Shr,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    /// Left and right binding power; used by the parser and by `Display`
    /// to place parentheses.
    pub fn binding_power(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (1, 2),
            BinaryOp::And => (3, 4),
            BinaryOp::BitOr => (5, 6),
            BinaryOp::BitXor => (7, 8),
            BinaryOp::BitAnd => (9, 10),
            BinaryOp::Eq | BinaryOp::Ne => (11, 12),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (13, 14),
            BinaryOp::Shl | BinaryOp::Shr => (15, 16),
            BinaryOp::Add | BinaryOp::Sub => (17, 18),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (19, 20),
            BinaryOp::Pow => (22, 21), // right-associative
        }
    }

    /// Returns `true` for operators producing a boolean.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
        )
    }

    fn is_right_assoc(self) -> bool {
        self == BinaryOp::Pow
    }
}

/// Built-in functions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Builtin {
    /// Ceiling of the base-2 logarithm; defined for arguments >= 1.
    Log2Ceil,
    /// Largest argument.
    Max,
    /// Smallest argument.
    Min,
}

impl Builtin {
    /// Name used in expression text.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Log2Ceil => "log2ceil",
            Builtin::Max => "max",
            Builtin::Min => "min",
        }
    }

    /// Looks a builtin up by its expression-text name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "log2ceil" => Some(Builtin::Log2Ceil),
            "max" => Some(Builtin::Max),
            "min" => Some(Builtin::Min),
            _ => None,
        }
    }

    fn repr_name(self) -> &'static str {
        match self {
            Builtin::Log2Ceil => "Log2Expr",
            Builtin::Max => "MaximumExpr",
            Builtin::Min => "MinimumExpr",
        }
    }

    fn accepts(self, arity: usize) -> bool {
        match self {
            Builtin::Log2Ceil => arity == 1,
            Builtin::Max | Builtin::Min => arity >= 1,
        }
    }
}

/// One node of an expression tree.
///
/// Children are [`Expr`] handles, so structurally equal subtrees are shared.
#[derive(PartialEq, Eq, Hash, Debug)]
pub enum ExprNode {
    /// A literal.
    Const(Value),
    /// A reference to a parameter, resolved through [`Bindings`].
    Param(Ident),
    /// A prefix operation.
    Unary(UnaryOp, Expr),
    /// An infix operation.
    Binary(BinaryOp, Expr, Expr),
    /// A builtin call.
    Call(Builtin, Vec<Expr>),
}

static EXPRS: InternPool<ExprNode> = InternPool::new();

impl Intern for ExprNode {
    fn pool() -> &'static InternPool<Self> {
        &EXPRS
    }
}

/// Handle to an interned expression tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expr(Interned<ExprNode>);

impl Expr {
    fn from_node(node: ExprNode) -> Self {
        Expr(node.intern())
    }

    /// The node this handle points at.
    pub fn node(self) -> &'static ExprNode {
        self.0.get()
    }

    /// An integer literal.
    pub fn int(value: i64) -> Self {
        Self::from_node(ExprNode::Const(Value::Int(value)))
    }

    /// A boolean literal.
    pub fn bool(value: bool) -> Self {
        Self::from_node(ExprNode::Const(Value::Bool(value)))
    }

    /// A literal of either kind.
    pub fn constant(value: Value) -> Self {
        Self::from_node(ExprNode::Const(value))
    }

    /// A parameter reference.
    pub fn param(name: impl Into<Ident>) -> Self {
        Self::from_node(ExprNode::Param(name.into()))
    }

    /// A prefix operation.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::from_node(ExprNode::Unary(op, operand))
    }

    /// An infix operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::from_node(ExprNode::Binary(op, lhs, rhs))
    }

    /// A builtin call; fails if the number of arguments does not fit the builtin.
    pub fn call(builtin: Builtin, args: Vec<Expr>) -> Result<Self, IrError> {
        if !builtin.accepts(args.len()) {
            return Err(IrError::ExpressionEvaluation {
                expr: builtin.name().to_string(),
                reason: format!("{} argument(s) not accepted", args.len()),
            });
        }
        Ok(Self::from_node(ExprNode::Call(builtin, args)))
    }

    /// `log2ceil(arg)`.
    pub fn log2ceil(arg: Expr) -> Self {
        Self::from_node(ExprNode::Call(Builtin::Log2Ceil, vec![arg]))
    }

    /// `max(a, b)`.
    pub fn max(a: Expr, b: Expr) -> Self {
        Self::from_node(ExprNode::Call(Builtin::Max, vec![a, b]))
    }

    /// `min(a, b)`.
    pub fn min(a: Expr, b: Expr) -> Self {
        Self::from_node(ExprNode::Call(Builtin::Min, vec![a, b]))
    }

    /// Returns the literal value if this is a constant node.
    pub fn as_const(self) -> Option<Value> {
        match self.node() {
            ExprNode::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer value if this is an integer constant node.
    pub fn as_int(self) -> Option<i64> {
        self.as_const().and_then(Value::as_int)
    }

    /// Returns `true` if the tree contains no parameter reference.
    pub fn is_resolved(self) -> bool {
        match self.node() {
            ExprNode::Const(_) => true,
            ExprNode::Param(_) => false,
            ExprNode::Unary(_, e) => e.is_resolved(),
            ExprNode::Binary(_, l, r) => l.is_resolved() && r.is_resolved(),
            ExprNode::Call(_, args) => args.iter().all(|a| a.is_resolved()),
        }
    }

    /// Parameters referenced by the tree, in first-occurrence order.
    pub fn free_params(self) -> IndexSet<Ident> {
        let mut out = IndexSet::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params(self, out: &mut IndexSet<Ident>) {
        match self.node() {
            ExprNode::Const(_) => {}
            ExprNode::Param(name) => {
                out.insert(*name);
            }
            ExprNode::Unary(_, e) => e.collect_params(out),
            ExprNode::Binary(_, l, r) => {
                l.collect_params(out);
                r.collect_params(out);
            }
            ExprNode::Call(_, args) => {
                for arg in args {
                    arg.collect_params(out);
                }
            }
        }
    }

    /// Substitutes every bound parameter and folds constant subtrees.
    ///
    /// Bound values are resolved against the same bindings before they are
    /// substituted, so the result only references parameters absent from
    /// `bindings` and resolving it again returns it unchanged.
    pub fn resolve(self, bindings: &Bindings) -> Result<Expr, IrError> {
        let mut active = Vec::new();
        self.resolve_in(bindings, &mut active)
    }

    fn resolve_in(self, bindings: &Bindings, active: &mut Vec<Ident>) -> Result<Expr, IrError> {
        match self.node() {
            ExprNode::Const(_) => Ok(self),
            ExprNode::Param(name) => {
                let Some(bound) = bindings.get(*name) else {
                    return Ok(self);
                };
                if active.contains(name) {
                    return Err(IrError::CyclicBinding { name: *name });
                }
                active.push(*name);
                let resolved = bound.resolve_in(bindings, active);
                active.pop();
                resolved
            }
            ExprNode::Unary(op, e) => {
                let e = e.resolve_in(bindings, active)?;
                fold_unary(*op, e)
            }
            ExprNode::Binary(op, l, r) => {
                let l = l.resolve_in(bindings, active)?;
                let r = r.resolve_in(bindings, active)?;
                fold_binary(*op, l, r)
            }
            ExprNode::Call(builtin, args) => {
                let args = args
                    .iter()
                    .map(|a| a.resolve_in(bindings, active))
                    .collect::<Result<Vec<_>, _>>()?;
                fold_call(*builtin, args)
            }
        }
    }

    /// Evaluates an expression without free parameters.
    pub fn evaluate(self) -> Result<Value, IrError> {
        self.evaluate_with(&Bindings::new())
    }

    /// Resolves under `bindings` and demands a constant result.
    pub fn evaluate_with(self, bindings: &Bindings) -> Result<Value, IrError> {
        let resolved = self.resolve(bindings)?;
        resolved
            .as_const()
            .ok_or_else(|| IrError::UnresolvedParameter {
                context: self.to_string(),
                params: resolved.free_params().into_iter().collect(),
            })
    }

    /// Structural rendering used in reports, e.g.
    /// `Log2Expr(Op(Param(param_p,10), '+', Const(1)))`.
    ///
    /// Parameter references show their value from `defaults` when present.
    pub fn repr(self, defaults: &Bindings) -> Repr<'_> {
        Repr {
            expr: self,
            defaults,
        }
    }

    fn precedence(self) -> u8 {
        match self.node() {
            ExprNode::Binary(op, _, _) => op.binding_power().0,
            ExprNode::Unary(UnaryOp::Abs, _) => u8::MAX,
            ExprNode::Unary(..) => PREFIX_BP,
            ExprNode::Const(Value::Int(v)) if *v < 0 => PREFIX_BP,
            _ => u8::MAX,
        }
    }
}

fn eval_error(expr: Expr, reason: impl Into<String>) -> IrError {
    IrError::ExpressionEvaluation {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}

fn fold_unary(op: UnaryOp, operand: Expr) -> Result<Expr, IrError> {
    let Some(value) = operand.as_const() else {
        return Ok(Expr::unary(op, operand));
    };
    apply_unary(op, value)
        .map(Expr::constant)
        .map_err(|reason| eval_error(Expr::unary(op, operand), reason))
}

fn fold_binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<Expr, IrError> {
    let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) else {
        return Ok(Expr::binary(op, lhs, rhs));
    };
    apply_binary(op, a, b)
        .map(Expr::constant)
        .map_err(|reason| eval_error(Expr::binary(op, lhs, rhs), reason))
}

fn fold_call(builtin: Builtin, args: Vec<Expr>) -> Result<Expr, IrError> {
    let values: Option<Vec<Value>> = args.iter().map(|a| a.as_const()).collect();
    let Some(values) = values else {
        return Ok(Expr::from_node(ExprNode::Call(builtin, args)));
    };
    apply_builtin(builtin, &values)
        .map(Expr::constant)
        .map_err(|reason| eval_error(Expr::from_node(ExprNode::Call(builtin, args)), reason))
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, String> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(a)) => a
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| "integer overflow".to_string()),
        (UnaryOp::BitNot, Value::Int(a)) => Ok(Value::Int(!a)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Abs, Value::Int(a)) => a
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| "integer overflow".to_string()),
        (op, value) => Err(format!("'{}' is not defined for {value}", op.symbol())),
    }
}

fn shift_amount(amount: i64) -> Result<u32, String> {
    u32::try_from(amount)
        .ok()
        .filter(|n| *n < 64)
        .ok_or_else(|| format!("shift amount {amount} out of range"))
}

fn apply_binary(op: BinaryOp, a: Value, b: Value) -> Result<Value, String> {
    use Value::{Bool, Int};

    let overflow = || "integer overflow".to_string();
    match (op, a, b) {
        (BinaryOp::Add, Int(x), Int(y)) => x.checked_add(y).map(Int).ok_or_else(overflow),
        (BinaryOp::Sub, Int(x), Int(y)) => x.checked_sub(y).map(Int).ok_or_else(overflow),
        (BinaryOp::Mul, Int(x), Int(y)) => x.checked_mul(y).map(Int).ok_or_else(overflow),
        (BinaryOp::Div | BinaryOp::Mod, Int(_), Int(0)) => Err("division by zero".to_string()),
        (BinaryOp::Div, Int(x), Int(y)) => x.checked_div(y).map(Int).ok_or_else(overflow),
        (BinaryOp::Mod, Int(x), Int(y)) => x.checked_rem(y).map(Int).ok_or_else(overflow),
        (BinaryOp::Pow, Int(x), Int(y)) => {
            let exp = u32::try_from(y).map_err(|_| format!("negative exponent {y}"))?;
            x.checked_pow(exp).map(Int).ok_or_else(overflow)
        }
        (BinaryOp::BitAnd, Int(x), Int(y)) => Ok(Int(x & y)),
        (BinaryOp::BitOr, Int(x), Int(y)) => Ok(Int(x | y)),
        (BinaryOp::BitXor, Int(x), Int(y)) => Ok(Int(x ^ y)),
        (BinaryOp::BitAnd | BinaryOp::And, Bool(x), Bool(y)) => Ok(Bool(x && y)),
        (BinaryOp::BitOr | BinaryOp::Or, Bool(x), Bool(y)) => Ok(Bool(x || y)),
        (BinaryOp::BitXor, Bool(x), Bool(y)) => Ok(Bool(x ^ y)),
        (BinaryOp::Shl, Int(x), Int(y)) => {
            let n = shift_amount(y)?;
            let shifted = x << n;
            if shifted >> n == x {
                Ok(Int(shifted))
            } else {
                Err(overflow())
            }
        }
        (BinaryOp::Shr, Int(x), Int(y)) => Ok(Int(x >> shift_amount(y)?)),
        (BinaryOp::Eq, Int(x), Int(y)) => Ok(Bool(x == y)),
        (BinaryOp::Eq, Bool(x), Bool(y)) => Ok(Bool(x == y)),
        (BinaryOp::Ne, Int(x), Int(y)) => Ok(Bool(x != y)),
        (BinaryOp::Ne, Bool(x), Bool(y)) => Ok(Bool(x != y)),
        (BinaryOp::Lt, Int(x), Int(y)) => Ok(Bool(x < y)),
        (BinaryOp::Le, Int(x), Int(y)) => Ok(Bool(x <= y)),
        (BinaryOp::Gt, Int(x), Int(y)) => Ok(Bool(x > y)),
        (BinaryOp::Ge, Int(x), Int(y)) => Ok(Bool(x >= y)),
        (op, a, b) => Err(format!("'{}' is not defined for {a} and {b}", op.symbol())),
    }
}

fn apply_builtin(builtin: Builtin, args: &[Value]) -> Result<Value, String> {
    let ints = args
        .iter()
        .map(|v| {
            v.as_int()
                .ok_or_else(|| format!("{} expects integer arguments", builtin.name()))
        })
        .collect::<Result<Vec<i64>, String>>()?;
    match builtin {
        Builtin::Log2Ceil => {
            let n = *ints
                .first()
                .ok_or_else(|| "log2ceil expects one argument".to_string())?;
            if n <= 0 {
                return Err(format!("log2ceil of non-positive value {n}"));
            }
            Ok(Value::Int(i64::from(64 - (n - 1).leading_zeros())))
        }
        Builtin::Max => ints
            .iter()
            .copied()
            .max()
            .map(Value::Int)
            .ok_or_else(|| "max expects arguments".to_string()),
        Builtin::Min => ints
            .iter()
            .copied()
            .min()
            .map(Value::Int)
            .ok_or_else(|| "min expects arguments".to_string()),
    }
}

#[derive(PartialEq)]
enum Side {
    Left,
    Right,
}

fn write_operand(f: &mut fmt::Formatter<'_>, child: Expr, parent: BinaryOp, side: Side) -> fmt::Result {
    let child_prec = child.precedence();
    let parent_prec = parent.binding_power().0;
    let parens = child_prec < parent_prec
        || (child_prec == parent_prec && ((side == Side::Left) == parent.is_right_assoc()));
    if parens {
        write!(f, "({child})")
    } else {
        write!(f, "{child}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            ExprNode::Const(v) => write!(f, "{v}"),
            ExprNode::Param(name) => write!(f, "{name}"),
            ExprNode::Unary(UnaryOp::Abs, e) => write!(f, "abs({e})"),
            ExprNode::Unary(op, e) => {
                if e.precedence() <= PREFIX_BP {
                    write!(f, "{}({e})", op.symbol())
                } else {
                    write!(f, "{}{e}", op.symbol())
                }
            }
            ExprNode::Binary(op, l, r) => {
                write_operand(f, *l, *op, Side::Left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, *r, *op, Side::Right)
            }
            ExprNode::Call(builtin, args) => {
                write!(f, "{}(", builtin.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

/// Structural rendering returned by [`Expr::repr`].
pub struct Repr<'a> {
    expr: Expr,
    defaults: &'a Bindings,
}

impl Repr<'_> {
    fn child(&self, expr: Expr) -> Self {
        Repr {
            expr,
            defaults: self.defaults,
        }
    }
}

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr.node() {
            ExprNode::Const(v) => write!(f, "Const({v})"),
            ExprNode::Param(name) => match self.defaults.get(*name) {
                Some(default) => write!(f, "Param({name},{default})"),
                None => write!(f, "Param({name})"),
            },
            ExprNode::Unary(op, e) => write!(f, "SOp('{}', {})", op.symbol(), self.child(*e)),
            ExprNode::Binary(op, l, r) => {
                let class = if op.is_boolean() { "BoolOp" } else { "Op" };
                write!(
                    f,
                    "{class}({}, '{}', {})",
                    self.child(*l),
                    op.symbol(),
                    self.child(*r)
                )
            }
            ExprNode::Call(builtin, args) => {
                write!(f, "{}(", builtin.repr_name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.child(*arg))?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::constant(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::int(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::int(i64::from(value))
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::bool(value)
    }
}

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }

        impl ops::$trait<i64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: i64) -> Expr {
                Expr::binary($op, self, Expr::int(rhs))
            }
        }

        impl ops::$trait<i32> for Expr {
            type Output = Expr;

            fn $method(self, rhs: i32) -> Expr {
                Expr::binary($op, self, Expr::int(i64::from(rhs)))
            }
        }
    };
}

impl_binary_operator!(Add, add, BinaryOp::Add);
impl_binary_operator!(Sub, sub, BinaryOp::Sub);
impl_binary_operator!(Mul, mul, BinaryOp::Mul);
impl_binary_operator!(Div, div, BinaryOp::Div);
impl_binary_operator!(Rem, rem, BinaryOp::Mod);
impl_binary_operator!(BitAnd, bitand, BinaryOp::BitAnd);
impl_binary_operator!(BitOr, bitor, BinaryOp::BitOr);
impl_binary_operator!(BitXor, bitxor, BinaryOp::BitXor);
impl_binary_operator!(Shl, shl, BinaryOp::Shl);
impl_binary_operator!(Shr, shr, BinaryOp::Shr);

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::unary(UnaryOp::BitNot, self)
    }
}

/// Ordered parameter name to expression bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    map: IndexMap<Ident, Expr>,
}

impl Bindings {
    /// Creates an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, returning the previous binding.
    pub fn insert(&mut self, name: impl Into<Ident>, value: impl Into<Expr>) -> Option<Expr> {
        self.map.insert(name.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<Ident>, value: impl Into<Expr>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the expression bound to `name`.
    pub fn get(&self, name: Ident) -> Option<Expr> {
        self.map.get(&name).copied()
    }

    /// Returns `true` if `name` is bound.
    pub fn contains(&self, name: Ident) -> bool {
        self.map.contains_key(&name)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Ident, Expr)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(Ident, Expr)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (Ident, Expr)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Ident, Expr)> for Bindings {
    fn extend<I: IntoIterator<Item = (Ident, Expr)>>(&mut self, iter: I) {
        self.map.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> Expr {
        Expr::param(name)
    }

    #[test]
    fn construction_is_interned() {
        let a = Expr::log2ceil(p("param_p") + 1);
        let b = Expr::log2ceil(p("param_p") + 1);
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.node(), b.node()));
        assert_ne!(a, Expr::log2ceil(p("param_p") + 2));
    }

    #[test]
    fn resolve_substitutes_and_folds() {
        let e = p("a_p") * 2i64 + p("b_p");
        let b = Bindings::new().with("a_p", 3).with("b_p", 4);
        assert_eq!(e.resolve(&b).unwrap(), Expr::int(10));
    }

    #[test]
    fn partial_resolution_stays_symbolic() {
        let e = (p("a_p") + 1i64) * p("b_p");
        let r = e.resolve(&Bindings::new().with("a_p", 1)).unwrap();
        assert_eq!(r, Expr::int(2) * p("b_p"));
        assert!(!r.is_resolved());
        assert_eq!(r.free_params().into_iter().collect::<Vec<_>>(), vec![Ident::new("b_p")]);
    }

    #[test]
    fn resolve_is_idempotent() {
        let b = Bindings::new()
            .with("a_p", p("c_p") + 1)
            .with("c_p", 2)
            .with("x_p", p("y_p"));
        let exprs = [
            p("a_p") * p("z_p"),
            Expr::log2ceil(p("a_p") + p("x_p")),
            Expr::max(p("a_p"), Expr::int(7)),
            -(p("x_p") << 2i64),
        ];
        for e in exprs {
            let once = e.resolve(&b).unwrap();
            assert_eq!(once.resolve(&b).unwrap(), once, "{e}");
        }
    }

    #[test]
    fn bound_values_resolve_transitively() {
        let b = Bindings::new().with("a_p", p("b_p") * 2).with("b_p", 5);
        assert_eq!(p("a_p").evaluate_with(&b).unwrap(), Value::Int(10));
    }

    #[test]
    fn cyclic_binding_rejected() {
        let b = Bindings::new().with("a_p", p("b_p") + 1).with("b_p", p("a_p"));
        let err = p("a_p").resolve(&b).unwrap_err();
        assert!(matches!(err, IrError::CyclicBinding { .. }));
    }

    #[test]
    fn free_params_in_first_occurrence_order() {
        let e = p("z_p") + p("a_p") * p("z_p") + Expr::min(p("m_p"), p("a_p"));
        let names: Vec<&str> = e.free_params().iter().map(|i| i.as_str()).collect();
        assert_eq!(names, vec!["z_p", "a_p", "m_p"]);
    }

    #[test]
    fn log2ceil_values() {
        for (n, expected) in [(1, 0), (2, 1), (3, 2), (11, 4), (16, 4), (17, 5)] {
            assert_eq!(Expr::log2ceil(Expr::int(n)).evaluate().unwrap(), Value::Int(expected));
        }
    }

    #[test]
    fn log2ceil_of_zero_fails() {
        let err = Expr::log2ceil(p("n_p")).evaluate_with(&Bindings::new().with("n_p", 0));
        assert!(matches!(err, Err(IrError::ExpressionEvaluation { .. })));
    }

    #[test]
    fn log2ceil_of_bool_fails() {
        let err = Expr::log2ceil(Expr::bool(true)).evaluate().unwrap_err();
        assert!(matches!(err, IrError::ExpressionEvaluation { .. }));
    }

    #[test]
    fn builtin_arity_checked() {
        assert!(Expr::call(Builtin::Log2Ceil, vec![]).is_err());
        assert!(Expr::call(Builtin::Max, vec![Expr::int(1), Expr::int(3), Expr::int(2)]).is_ok());
    }

    #[test]
    fn arithmetic_errors() {
        let div = (Expr::int(1) / 0i64).evaluate().unwrap_err();
        assert!(div.to_string().contains("division by zero"));
        assert!((Expr::int(2) << 64i64).evaluate().is_err());
        assert!((Expr::int(i64::MAX) + 1i64).evaluate().is_err());
        let pow = Expr::binary(BinaryOp::Pow, Expr::int(2), Expr::int(-1));
        assert!(pow.evaluate().is_err());
    }

    #[test]
    fn boolean_semantics() {
        let e = Expr::binary(
            BinaryOp::And,
            Expr::binary(BinaryOp::Gt, Expr::int(10), Expr::int(5)),
            Expr::unary(UnaryOp::Not, Expr::bool(false)),
        );
        assert_eq!(e.evaluate().unwrap(), Value::Bool(true));
        let mixed = Expr::binary(BinaryOp::And, Expr::int(1), Expr::bool(true));
        assert!(mixed.evaluate().is_err());
    }

    #[test]
    fn operator_overloads_match_source_semantics() {
        let ten = Expr::int(10);
        let five = Expr::int(5);
        assert_eq!((ten + five).evaluate().unwrap(), Value::Int(15));
        assert_eq!((ten % five).evaluate().unwrap(), Value::Int(0));
        assert_eq!((ten << five).evaluate().unwrap(), Value::Int(320));
        assert_eq!((ten >> five).evaluate().unwrap(), Value::Int(0));
        assert_eq!((ten ^ five).evaluate().unwrap(), Value::Int(15));
        assert_eq!((!ten).evaluate().unwrap(), Value::Int(-11));
        assert_eq!(Expr::unary(UnaryOp::Abs, -ten).evaluate().unwrap(), Value::Int(10));
    }

    #[test]
    fn evaluate_unresolved_reports_params() {
        let err = (p("w_p") + 1i64).evaluate().unwrap_err();
        match err {
            IrError::UnresolvedParameter { params, .. } => {
                assert_eq!(params, vec![Ident::new("w_p")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn display_places_parentheses() {
        assert_eq!((p("a") + p("b") * 2i64).to_string(), "a + b * 2");
        assert_eq!(((p("a") + p("b")) * 2i64).to_string(), "(a + b) * 2");
        assert_eq!((p("a") - (p("b") - p("c"))).to_string(), "a - (b - c)");
        assert_eq!((p("a") - p("b") - p("c")).to_string(), "a - b - c");
        assert_eq!(Expr::log2ceil(p("param_p") + 1).to_string(), "log2ceil(param_p + 1)");
        assert_eq!((-(p("a") + 1i64)).to_string(), "-(a + 1)");
        let pow = Expr::binary(BinaryOp::Pow, -p("a"), Expr::int(2));
        assert_eq!(pow.to_string(), "(-a) ** 2");
    }

    #[test]
    fn repr_shows_parameter_defaults() {
        let e = Expr::log2ceil(p("param_p") + 1);
        let defaults = Bindings::new().with("param_p", 10);
        assert_eq!(
            e.repr(&defaults).to_string(),
            "Log2Expr(Op(Param(param_p,10), '+', Const(1)))"
        );
        assert_eq!(
            e.repr(&Bindings::new()).to_string(),
            "Log2Expr(Op(Param(param_p), '+', Const(1)))"
        );
        let cmp = Expr::binary(BinaryOp::Gt, p("a"), Expr::int(2));
        assert_eq!(cmp.repr(&Bindings::new()).to_string(), "BoolOp(Param(a), '>', Const(2))");
    }
}
