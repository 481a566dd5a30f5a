use crate::ast::{
    BinOp, Expr, ExprAddressOf, ExprBinOp, ExprCall, ExprNumeral, ExprStr, ExprUnOp, ExprVariable,
    Function, GlobalVar, Program, Stmt, StmtBreak, StmtContinue, StmtExpr, StmtFor, StmtIf,
    StmtLet, StmtReturn, StmtVar, StmtWhile, UnOp,
};
use crate::pos::Pos;
use crate::token::{Token, TokenPayload};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("{pos} - invalid token: {found}, expected: {expected}")]
    InvalidToken {
        pos: Pos,
        found: TokenPayload,
        expected: String,
    },
    #[error("{pos} - loop variable name does not match: {found}, expected: {expected}")]
    ForVariableMismatch {
        pos: Pos,
        found: String,
        expected: String,
    },
}

fn binop_of(token: &TokenPayload) -> Option<BinOp> {
    match token {
        TokenPayload::Plus => Some(BinOp::Add),
        TokenPayload::Minus => Some(BinOp::Sub),
        TokenPayload::Mul => Some(BinOp::Mul),
        TokenPayload::Div => Some(BinOp::Div),
        TokenPayload::Mod => Some(BinOp::Mod),
        TokenPayload::LogAnd => Some(BinOp::LogAnd),
        TokenPayload::LogOr => Some(BinOp::LogOr),
        TokenPayload::BitAnd => Some(BinOp::BitAnd),
        TokenPayload::BitOr => Some(BinOp::BitOr),
        TokenPayload::BitXor => Some(BinOp::BitXor),
        TokenPayload::Eq => Some(BinOp::Eq),
        TokenPayload::Ne => Some(BinOp::Ne),
        TokenPayload::Lt => Some(BinOp::Lt),
        TokenPayload::Le => Some(BinOp::Le),
        TokenPayload::Gt => Some(BinOp::Gt),
        TokenPayload::Ge => Some(BinOp::Ge),
        _ => None,
    }
}

fn unop_of(token: &TokenPayload) -> Option<UnOp> {
    match token {
        TokenPayload::Plus => Some(UnOp::Plus),
        TokenPayload::Minus => Some(UnOp::Neg),
        TokenPayload::LogNot => Some(UnOp::LogNot),
        TokenPayload::BitNot => Some(UnOp::BitNot),
        _ => None,
    }
}

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, idx: 0 }
    }

    fn inc_idx(&mut self) {
        self.idx += 1;
    }

    fn peek(&self) -> &Token {
        // the token stream always ends with EOF
        self.tokens.get(self.idx).unwrap()
    }

    /// Consume the current token iff it matches.
    fn accept(&mut self, token: &TokenPayload) -> bool {
        if self.peek().payload != *token {
            return false;
        }

        self.inc_idx();
        true
    }

    /// Consume the current token or fail naming both tokens.
    fn expect(&mut self, token: TokenPayload) -> Result<(), ParseError> {
        if self.accept(&token) {
            return Ok(());
        }

        Err(ParseError::InvalidToken {
            pos: self.peek().pos.clone(),
            found: self.peek().payload.clone(),
            expected: token.to_string(),
        })
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.peek().clone();
        let TokenPayload::Ident(name) = &token.payload else {
            return Err(ParseError::InvalidToken {
                pos: token.pos,
                found: token.payload,
                expected: "IDENTIFIER".to_string(),
            });
        };
        let name = name.clone();
        self.inc_idx();
        Ok(name)
    }

    fn parse_numeral(&mut self) -> Result<i32, ParseError> {
        let token = self.peek().clone();
        let TokenPayload::Numeral(data) = &token.payload else {
            return Err(ParseError::InvalidToken {
                pos: token.pos,
                found: token.payload,
                expected: "NUMERAL".to_string(),
            });
        };
        // large literals wrap per fixed-width conversion
        let value = data
            .bytes()
            .fold(0i32, |n, c| n.wrapping_mul(10).wrapping_add((c - b'0') as i32));
        self.inc_idx();
        Ok(value)
    }

    fn parse_literal(&mut self) -> Result<Vec<u8>, ParseError> {
        let token = self.peek().clone();
        let TokenPayload::Str(value) = &token.payload else {
            return Err(ParseError::InvalidToken {
                pos: token.pos,
                found: token.payload,
                expected: "STRING".to_string(),
            });
        };
        let value = value.clone();
        self.inc_idx();
        Ok(value)
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let filename = self.peek().pos.filename.clone();
        let mut globalvars = Vec::new();
        let mut functions = Vec::new();

        loop {
            if matches!(self.peek().payload, TokenPayload::Function) {
                functions.push(self.parse_function()?);
            } else if matches!(self.peek().payload, TokenPayload::Var) {
                globalvars.push(self.parse_globalvar()?);
            } else {
                break;
            }
        }

        self.expect(TokenPayload::Eof)?;

        Ok(Program {
            filename,
            globalvars,
            functions,
        })
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::Function)?;
        let name = self.parse_identifier()?;

        self.expect(TokenPayload::ParenLeft)?;
        let mut params = Vec::new();
        if matches!(self.peek().payload, TokenPayload::Ident(_)) {
            params.push(self.parse_identifier()?);
            while self.accept(&TokenPayload::Comma) {
                params.push(self.parse_identifier()?);
            }
        }
        self.expect(TokenPayload::ParenRight)?;

        let body = self.parse_block()?;

        Ok(Function {
            pos,
            name,
            params,
            body,
        })
    }

    fn parse_globalvar(&mut self) -> Result<GlobalVar, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::Var)?;
        let name = self.parse_identifier()?;
        self.expect(TokenPayload::Assign)?;

        let value_pos = self.peek().pos.clone();
        let value = match self.peek().payload.clone() {
            TokenPayload::Str(_) => Expr::Str(ExprStr {
                pos: value_pos,
                value: self.parse_literal()?,
            }),
            TokenPayload::True => {
                self.expect(TokenPayload::True)?;
                Expr::Numeral(ExprNumeral {
                    pos: value_pos,
                    value: 1,
                })
            }
            TokenPayload::False => {
                self.expect(TokenPayload::False)?;
                Expr::Numeral(ExprNumeral {
                    pos: value_pos,
                    value: 0,
                })
            }
            TokenPayload::Minus => {
                self.expect(TokenPayload::Minus)?;
                Expr::Numeral(ExprNumeral {
                    pos: value_pos,
                    value: self.parse_numeral()?.wrapping_neg(),
                })
            }
            _ => Expr::Numeral(ExprNumeral {
                pos: value_pos,
                value: self.parse_numeral()?,
            }),
        };

        self.expect(TokenPayload::Semicolon)?;

        Ok(GlobalVar { pos, name, value })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenPayload::BraceLeft)?;
        let mut statements = Vec::new();
        while !matches!(self.peek().payload, TokenPayload::BraceRight) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenPayload::BraceRight)?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().payload.clone() {
            TokenPayload::If => Ok(Stmt::If(self.parse_statement_if()?)),
            TokenPayload::While => Ok(Stmt::While(self.parse_statement_while()?)),
            TokenPayload::For => Ok(Stmt::For(self.parse_statement_for()?)),
            TokenPayload::Var => Ok(Stmt::Var(self.parse_statement_var()?)),
            TokenPayload::Let => Ok(Stmt::Let(self.parse_statement_let()?)),
            TokenPayload::Return => Ok(Stmt::Return(self.parse_statement_return()?)),
            TokenPayload::Continue => Ok(Stmt::Continue(self.parse_statement_continue()?)),
            TokenPayload::Break => Ok(Stmt::Break(self.parse_statement_break()?)),
            _ => Ok(Stmt::Expr(self.parse_statement_expression()?)),
        }
    }

    fn parse_statement_if(&mut self) -> Result<StmtIf, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::If)?;
        self.expect(TokenPayload::ParenLeft)?;
        let condition = self.parse_expression()?;
        self.expect(TokenPayload::ParenRight)?;

        let then_body = self.parse_block()?;

        let else_body = if self.accept(&TokenPayload::Else) {
            self.parse_block()?
        } else {
            Vec::new()
        };

        Ok(StmtIf {
            pos,
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_statement_while(&mut self) -> Result<StmtWhile, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::While)?;
        self.expect(TokenPayload::ParenLeft)?;
        let condition = self.parse_expression()?;
        self.expect(TokenPayload::ParenRight)?;

        let body = self.parse_block()?;

        Ok(StmtWhile {
            pos,
            condition,
            body,
        })
    }

    fn parse_statement_for(&mut self) -> Result<StmtFor, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::For)?;
        self.expect(TokenPayload::ParenLeft)?;

        self.expect(TokenPayload::Var)?;
        let name = self.parse_identifier()?;
        self.expect(TokenPayload::Assign)?;
        let initial = self.parse_expression()?;
        self.expect(TokenPayload::Semicolon)?;

        let condition = self.parse_expression()?;
        self.expect(TokenPayload::Semicolon)?;

        self.expect(TokenPayload::Let)?;
        let update_pos = self.peek().pos.clone();
        let update_name = self.parse_identifier()?;
        if update_name != name {
            return Err(ParseError::ForVariableMismatch {
                pos: update_pos,
                found: update_name,
                expected: name,
            });
        }
        self.expect(TokenPayload::Assign)?;
        let update = self.parse_expression()?;
        self.expect(TokenPayload::ParenRight)?;

        let body = self.parse_block()?;

        Ok(StmtFor {
            pos,
            name,
            initial,
            condition,
            update,
            body,
        })
    }

    fn parse_statement_var(&mut self) -> Result<StmtVar, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::Var)?;
        let name = self.parse_identifier()?;

        let expr = if self.accept(&TokenPayload::Assign) {
            self.parse_expression()?
        } else {
            // missing initializer defaults to 0
            Expr::Numeral(ExprNumeral {
                pos: self.peek().pos.clone(),
                value: 0,
            })
        };

        self.expect(TokenPayload::Semicolon)?;

        Ok(StmtVar { pos, name, expr })
    }

    fn parse_statement_let(&mut self) -> Result<StmtLet, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::Let)?;
        let name = self.parse_identifier()?;
        self.expect(TokenPayload::Assign)?;
        let expr = self.parse_expression()?;
        self.expect(TokenPayload::Semicolon)?;

        Ok(StmtLet { pos, name, expr })
    }

    fn parse_statement_return(&mut self) -> Result<StmtReturn, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::Return)?;

        let expr = if matches!(self.peek().payload, TokenPayload::Semicolon) {
            // bare return yields 0
            Expr::Numeral(ExprNumeral {
                pos: self.peek().pos.clone(),
                value: 0,
            })
        } else {
            self.parse_expression()?
        };

        self.expect(TokenPayload::Semicolon)?;

        Ok(StmtReturn { pos, expr })
    }

    fn parse_statement_continue(&mut self) -> Result<StmtContinue, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::Continue)?;
        self.expect(TokenPayload::Semicolon)?;

        Ok(StmtContinue { pos })
    }

    fn parse_statement_break(&mut self) -> Result<StmtBreak, ParseError> {
        let pos = self.peek().pos.clone();

        self.expect(TokenPayload::Break)?;
        self.expect(TokenPayload::Semicolon)?;

        Ok(StmtBreak { pos })
    }

    fn parse_statement_expression(&mut self) -> Result<StmtExpr, ParseError> {
        let pos = self.peek().pos.clone();

        let expr = self.parse_expression()?;
        self.expect(TokenPayload::Semicolon)?;

        Ok(StmtExpr { pos, expr })
    }

    /// At most one binary operator per expression; combining more than two
    /// operands requires parentheses.
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let pos = self.peek().pos.clone();

        let lhs = self.parse_term()?;
        if let Some(op) = binop_of(&self.peek().payload) {
            self.inc_idx();
            let rhs = self.parse_term()?;
            return Ok(Expr::BinOp(ExprBinOp {
                pos,
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }));
        }

        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let pos = self.peek().pos.clone();

        if let Some(op) = unop_of(&self.peek().payload) {
            self.inc_idx();
            let expr = self.parse_factor()?;
            return Ok(Expr::UnOp(ExprUnOp {
                pos,
                op,
                expr: Box::new(expr),
            }));
        }

        self.parse_factor()
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let pos = self.peek().pos.clone();

        match self.peek().payload.clone() {
            TokenPayload::Ident(_) => {
                let name = self.parse_identifier()?;

                if !matches!(self.peek().payload, TokenPayload::ParenLeft) {
                    return Ok(Expr::Variable(ExprVariable { pos, name }));
                }

                self.expect(TokenPayload::ParenLeft)?;
                let mut args = Vec::new();
                if !matches!(self.peek().payload, TokenPayload::ParenRight) {
                    args.push(self.parse_expression()?);
                    while self.accept(&TokenPayload::Comma) {
                        args.push(self.parse_expression()?);
                    }
                }
                self.expect(TokenPayload::ParenRight)?;

                Ok(Expr::Call(ExprCall { pos, name, args }))
            }
            TokenPayload::BitAnd => {
                self.expect(TokenPayload::BitAnd)?;
                Ok(Expr::AddressOf(ExprAddressOf {
                    pos,
                    name: self.parse_identifier()?,
                }))
            }
            TokenPayload::True => {
                self.expect(TokenPayload::True)?;
                Ok(Expr::Numeral(ExprNumeral { pos, value: 1 }))
            }
            TokenPayload::False => {
                self.expect(TokenPayload::False)?;
                Ok(Expr::Numeral(ExprNumeral { pos, value: 0 }))
            }
            TokenPayload::Str(_) => Ok(Expr::Str(ExprStr {
                pos,
                value: self.parse_literal()?,
            })),
            TokenPayload::ParenLeft => {
                self.expect(TokenPayload::ParenLeft)?;
                let expr = self.parse_expression()?;
                self.expect(TokenPayload::ParenRight)?;
                Ok(expr)
            }
            _ => Ok(Expr::Numeral(ExprNumeral {
                pos,
                value: self.parse_numeral()?,
            })),
        }
    }
}
