use crate::pos::Pos;
use derive_more::Display;

#[derive(Debug, Clone)]
pub struct Token {
    pub payload: TokenPayload,
    pub pos: Pos,
}

/// Display gives the name used in diagnostics, not the source spelling.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum TokenPayload {
    #[display(fmt = "break")]
    Break,
    #[display(fmt = "continue")]
    Continue,
    #[display(fmt = "else")]
    Else,
    #[display(fmt = "false")]
    False,
    #[display(fmt = "for")]
    For,
    #[display(fmt = "function")]
    Function,
    #[display(fmt = "if")]
    If,
    #[display(fmt = "let")]
    Let,
    #[display(fmt = "return")]
    Return,
    #[display(fmt = "true")]
    True,
    #[display(fmt = "var")]
    Var,
    #[display(fmt = "while")]
    While,

    #[display(fmt = "(")]
    ParenLeft,
    #[display(fmt = ")")]
    ParenRight,
    #[display(fmt = "{{")]
    BraceLeft,
    #[display(fmt = "}}")]
    BraceRight,

    #[display(fmt = "+")]
    Plus,
    #[display(fmt = "-")]
    Minus,
    #[display(fmt = "*")]
    Mul,
    #[display(fmt = "/")]
    Div,
    #[display(fmt = "%")]
    Mod,

    #[display(fmt = "!")]
    LogNot,
    #[display(fmt = "&&")]
    LogAnd,
    #[display(fmt = "||")]
    LogOr,
    #[display(fmt = "~")]
    BitNot,
    #[display(fmt = "&")]
    BitAnd,
    #[display(fmt = "|")]
    BitOr,
    #[display(fmt = "^")]
    BitXor,

    #[display(fmt = "==")]
    Eq,
    #[display(fmt = "!=")]
    Ne,
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = "<=")]
    Le,
    #[display(fmt = ">")]
    Gt,
    #[display(fmt = ">=")]
    Ge,

    #[display(fmt = ",")]
    Comma,
    #[display(fmt = ";")]
    Semicolon,
    #[display(fmt = "=")]
    Assign,

    #[display(fmt = "IDENTIFIER")]
    Ident(String),
    #[display(fmt = "NUMERAL")]
    Numeral(String),
    #[display(fmt = "STRING")]
    Str(Vec<u8>),

    #[display(fmt = "END OF FILE")]
    Eof,
}
