use crate::pos::Pos;

#[derive(Debug, Clone)]
pub struct Program {
    pub filename: String,
    pub globalvars: Vec<GlobalVar>,
    pub functions: Vec<Function>,
}

/// Top-level `var`. The parser restricts the initializer to a string
/// literal, `true`, `false` or an optionally negated numeral.
#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub pos: Pos,
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub pos: Pos,
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Break(StmtBreak),
    Continue(StmtContinue),
    Expr(StmtExpr),
    For(StmtFor),
    If(StmtIf),
    Let(StmtLet),
    Return(StmtReturn),
    Var(StmtVar),
    While(StmtWhile),
}

#[derive(Debug, Clone)]
pub struct StmtBreak {
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct StmtContinue {
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct StmtExpr {
    pub pos: Pos,
    pub expr: Expr,
}

/// `for (var i = initial; condition; let i = update) { body }`. Both
/// spellings of the loop variable must match; the parser enforces it.
#[derive(Debug, Clone)]
pub struct StmtFor {
    pub pos: Pos,
    pub name: String,
    pub initial: Expr,
    pub condition: Expr,
    pub update: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct StmtIf {
    pub pos: Pos,
    pub condition: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

/// Assignment to an already declared variable.
#[derive(Debug, Clone)]
pub struct StmtLet {
    pub pos: Pos,
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct StmtReturn {
    pub pos: Pos,
    pub expr: Expr,
}

/// Declaration plus initialization; a missing initializer defaults to 0.
#[derive(Debug, Clone)]
pub struct StmtVar {
    pub pos: Pos,
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct StmtWhile {
    pub pos: Pos,
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    AddressOf(ExprAddressOf),
    BinOp(ExprBinOp),
    Call(ExprCall),
    Numeral(ExprNumeral),
    Str(ExprStr),
    UnOp(ExprUnOp),
    Variable(ExprVariable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LogAnd,
    LogOr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Neg,
    LogNot,
    BitNot,
}

#[derive(Debug, Clone)]
pub struct ExprAddressOf {
    pub pos: Pos,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ExprBinOp {
    pub pos: Pos,
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct ExprCall {
    pub pos: Pos,
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct ExprNumeral {
    pub pos: Pos,
    pub value: i32,
}

/// Raw bytes; the trailing 0 byte is appended during code generation.
#[derive(Debug, Clone)]
pub struct ExprStr {
    pub pos: Pos,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExprUnOp {
    pub pos: Pos,
    pub op: UnOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct ExprVariable {
    pub pos: Pos,
    pub name: String,
}
