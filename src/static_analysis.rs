use std::collections::HashSet;

use crate::ast::{
    Expr, Function, Program, Stmt, StmtBreak, StmtContinue, StmtExpr, StmtFor, StmtIf, StmtLet,
    StmtReturn, StmtVar, StmtWhile,
};
use crate::pos::Pos;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StaticAnalysisError {
    #[error("{pos}: duplicate symbol: {name}")]
    DuplicateSymbol { pos: Pos, name: String },
    #[error("{pos}: unknown symbol: {name}")]
    UnknownSymbol { pos: Pos, name: String },
    #[error("{pos}: break outside of for or while loop")]
    BreakOutsideLoop { pos: Pos },
    #[error("{pos}: continue outside of for or while loop")]
    ContinueOutsideLoop { pos: Pos },
    #[error("{filename}: missing main function")]
    MissingMain { filename: String },
}

/// Local symbols visible in one block, plus the inherited loop flag. Nested
/// blocks get a copy, never a shared reference, so declarations cannot leak
/// out of a block and sibling blocks cannot see each other.
#[derive(Debug, Clone)]
struct LocalScope {
    symbols: HashSet<String>,
    inside_loop: bool,
}

impl LocalScope {
    fn new() -> LocalScope {
        LocalScope {
            symbols: HashSet::new(),
            inside_loop: false,
        }
    }

    fn with_block_scope(&self, inside_loop: bool) -> LocalScope {
        LocalScope {
            symbols: self.symbols.clone(),
            inside_loop,
        }
    }
}

#[derive(Debug)]
struct ProgramAnalysis {
    globals: HashSet<String>,
}

impl ProgramAnalysis {
    fn new() -> Self {
        ProgramAnalysis {
            globals: HashSet::new(),
        }
    }

    fn program(&mut self, program: &Program) -> Result<(), StaticAnalysisError> {
        for globalvar in &program.globalvars {
            self.unique_global(&globalvar.pos, &globalvar.name)?;
        }

        for function in &program.functions {
            self.function(function)?;
        }

        // reported only once everything else checked out
        if !program.functions.iter().any(|f| f.name == "main") {
            return Err(StaticAnalysisError::MissingMain {
                filename: program.filename.clone(),
            });
        }

        Ok(())
    }

    fn function(&mut self, function: &Function) -> Result<(), StaticAnalysisError> {
        self.unique_global(&function.pos, &function.name)?;

        let mut scope = LocalScope::new();
        for param in &function.params {
            self.unique_local(&function.pos, param, &mut scope)?;
        }

        for stmt in &function.body {
            self.stmt(stmt, &mut scope)?;
        }

        Ok(())
    }

    fn stmt(&self, stmt: &Stmt, scope: &mut LocalScope) -> Result<(), StaticAnalysisError> {
        use Stmt::*;
        match stmt {
            Break(x) => self.stmt_break(x, scope),
            Continue(x) => self.stmt_continue(x, scope),
            Expr(x) => self.stmt_expr(x, scope),
            For(x) => self.stmt_for(x, scope),
            If(x) => self.stmt_if(x, scope),
            Let(x) => self.stmt_let(x, scope),
            Return(x) => self.stmt_return(x, scope),
            Var(x) => self.stmt_var(x, scope),
            While(x) => self.stmt_while(x, scope),
        }
    }

    fn stmt_break(&self, x: &StmtBreak, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        if scope.inside_loop {
            return Ok(());
        }

        Err(StaticAnalysisError::BreakOutsideLoop {
            pos: x.pos.clone(),
        })
    }

    fn stmt_continue(
        &self,
        x: &StmtContinue,
        scope: &LocalScope,
    ) -> Result<(), StaticAnalysisError> {
        if scope.inside_loop {
            return Ok(());
        }

        Err(StaticAnalysisError::ContinueOutsideLoop {
            pos: x.pos.clone(),
        })
    }

    fn stmt_expr(&self, x: &StmtExpr, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        self.expr(&x.expr, scope)
    }

    fn stmt_for(&self, x: &StmtFor, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        // the initial expression cannot see the loop variable
        self.expr(&x.initial, scope)?;

        let mut inner = scope.with_block_scope(true);
        self.unique_local(&x.pos, &x.name, &mut inner)?;

        self.expr(&x.condition, &inner)?;
        self.expr(&x.update, &inner)?;

        for stmt in &x.body {
            self.stmt(stmt, &mut inner)?;
        }

        Ok(())
    }

    fn stmt_if(&self, x: &StmtIf, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        self.expr(&x.condition, scope)?;

        let mut inner_then = scope.with_block_scope(scope.inside_loop);
        for stmt in &x.then_body {
            self.stmt(stmt, &mut inner_then)?;
        }

        let mut inner_else = scope.with_block_scope(scope.inside_loop);
        for stmt in &x.else_body {
            self.stmt(stmt, &mut inner_else)?;
        }

        Ok(())
    }

    fn stmt_let(&self, x: &StmtLet, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        self.check_symbol(&x.pos, &x.name, scope)?;
        self.expr(&x.expr, scope)
    }

    fn stmt_return(&self, x: &StmtReturn, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        self.expr(&x.expr, scope)
    }

    fn stmt_var(&self, x: &StmtVar, scope: &mut LocalScope) -> Result<(), StaticAnalysisError> {
        // the initializer is checked before the name becomes visible
        self.expr(&x.expr, scope)?;
        self.unique_local(&x.pos, &x.name, scope)
    }

    fn stmt_while(&self, x: &StmtWhile, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        self.expr(&x.condition, scope)?;

        let mut inner = scope.with_block_scope(true);
        for stmt in &x.body {
            self.stmt(stmt, &mut inner)?;
        }

        Ok(())
    }

    fn expr(&self, expr: &Expr, scope: &LocalScope) -> Result<(), StaticAnalysisError> {
        use Expr::*;
        match expr {
            AddressOf(x) => self.check_symbol(&x.pos, &x.name, scope),
            BinOp(x) => {
                self.expr(&x.lhs, scope)?;
                self.expr(&x.rhs, scope)
            }
            Call(x) => {
                self.check_symbol(&x.pos, &x.name, scope)?;
                for arg in &x.args {
                    self.expr(arg, scope)?;
                }
                Ok(())
            }
            Numeral(_) => Ok(()),
            Str(_) => Ok(()),
            UnOp(x) => self.expr(&x.expr, scope),
            Variable(x) => self.check_symbol(&x.pos, &x.name, scope),
        }
    }

    fn unique_global(&mut self, pos: &Pos, name: &str) -> Result<(), StaticAnalysisError> {
        if self.globals.insert(name.to_string()) {
            return Ok(());
        }

        Err(StaticAnalysisError::DuplicateSymbol {
            pos: pos.clone(),
            name: name.to_string(),
        })
    }

    fn unique_local(
        &self,
        pos: &Pos,
        name: &str,
        scope: &mut LocalScope,
    ) -> Result<(), StaticAnalysisError> {
        if self.globals.contains(name) || scope.symbols.contains(name) {
            return Err(StaticAnalysisError::DuplicateSymbol {
                pos: pos.clone(),
                name: name.to_string(),
            });
        }

        scope.symbols.insert(name.to_string());
        Ok(())
    }

    fn check_symbol(
        &self,
        pos: &Pos,
        name: &str,
        scope: &LocalScope,
    ) -> Result<(), StaticAnalysisError> {
        if self.globals.contains(name) || scope.symbols.contains(name) {
            return Ok(());
        }

        Err(StaticAnalysisError::UnknownSymbol {
            pos: pos.clone(),
            name: name.to_string(),
        })
    }
}

/// Validate symbol usage, scoping, loop context and the presence of `main`.
/// The tree itself is never modified; the code generator relies on this pass
/// having succeeded.
pub fn static_analysis(program: &Program) -> Result<(), StaticAnalysisError> {
    let mut analysis = ProgramAnalysis::new();
    analysis.program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Reader;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn check(input: &str) -> Result<(), StaticAnalysisError> {
        let reader = Reader::new("test".to_string(), input.as_bytes().to_vec());
        let tokens = Lexer::new(reader).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        static_analysis(&program)
    }

    #[test]
    fn accepts_a_valid_program() {
        check(
            "var greeting = \"hello\";\n\
             function add(a, b) { return a + b; }\n\
             function main() {\n\
               var x = add(1, 2);\n\
               while (x > 0) { let x = x - 1; }\n\
               return x;\n\
             }\n",
        )
        .unwrap();
    }

    #[test]
    fn duplicate_functions_are_rejected() {
        assert!(matches!(
            check("function f() { } function f() { } function main() { }"),
            Err(StaticAnalysisError::DuplicateSymbol { name, .. }) if name == "f"
        ));
    }

    #[test]
    fn duplicate_global_and_function_name() {
        assert!(matches!(
            check("var f = 1; function f() { } function main() { }"),
            Err(StaticAnalysisError::DuplicateSymbol { name, .. }) if name == "f"
        ));
    }

    #[test]
    fn local_may_not_shadow_global() {
        assert!(matches!(
            check("var x = 1; function main() { var x = 2; }"),
            Err(StaticAnalysisError::DuplicateSymbol { name, .. }) if name == "x"
        ));
    }

    #[test]
    fn block_declarations_are_invisible_outside() {
        assert!(matches!(
            check("function main() { if (1) { var x = 1; } return x; }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "x"
        ));
    }

    #[test]
    fn sibling_blocks_do_not_share_scope() {
        assert!(matches!(
            check("function main() { if (1) { var x = 1; } else { return x; } }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "x"
        ));

        // redeclaring the same name in the sibling block is fine
        check("function main() { if (1) { var x = 1; } else { var x = 2; } }").unwrap();
    }

    #[test]
    fn var_initializer_cannot_reference_itself() {
        assert!(matches!(
            check("function main() { var x = x; }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "x"
        ));
    }

    #[test]
    fn loop_variable_scoping() {
        // the loop variable is not visible in its own initial expression
        assert!(matches!(
            check("function main() { for (var i = i; i < 3; let i = i + 1) { } }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "i"
        ));

        // and it is gone after the loop
        assert!(matches!(
            check("function main() { for (var i = 0; i < 3; let i = i + 1) { } return i; }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "i"
        ));

        // redeclaring an enclosing local as loop variable is a duplicate
        assert!(matches!(
            check("function main() { var i = 0; for (var i = 0; i < 3; let i = i + 1) { } }"),
            Err(StaticAnalysisError::DuplicateSymbol { name, .. }) if name == "i"
        ));
    }

    #[test]
    fn break_and_continue_need_a_loop() {
        assert!(matches!(
            check("function main() { break; }"),
            Err(StaticAnalysisError::BreakOutsideLoop { .. })
        ));
        assert!(matches!(
            check("function main() { continue; }"),
            Err(StaticAnalysisError::ContinueOutsideLoop { .. })
        ));

        // the flag is inherited through nested blocks
        check("function main() { while (1) { if (1) { break; } } }").unwrap();
        check("function main() { for (var i = 0; i < 3; let i = i + 1) { continue; } }").unwrap();
    }

    #[test]
    fn unknown_symbols_are_rejected() {
        assert!(matches!(
            check("function main() { return y; }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "y"
        ));
        assert!(matches!(
            check("function main() { return f(); }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "f"
        ));
        assert!(matches!(
            check("function main() { return &y; }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "y"
        ));
    }

    #[test]
    fn function_must_be_declared_before_use() {
        // single-pass resolution: later functions are not yet visible
        assert!(matches!(
            check("function main() { return f(); } function f() { return 1; }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "f"
        ));

        check("function f() { return 1; } function main() { return f(); }").unwrap();
    }

    #[test]
    fn functions_may_call_themselves() {
        check("function main() { return main(); }").unwrap();
    }

    #[test]
    fn missing_main_is_reported_last() {
        assert!(matches!(
            check("function f() { return 0; }"),
            Err(StaticAnalysisError::MissingMain { filename }) if filename == "test"
        ));

        // other errors still win over the missing entry point
        assert!(matches!(
            check("function f() { return y; }"),
            Err(StaticAnalysisError::UnknownSymbol { name, .. }) if name == "y"
        ));
    }
}
