use std::collections::HashMap;

use crate::ast::{
    BinOp, Expr, ExprBinOp, ExprCall, ExprStr, ExprUnOp, Function, GlobalVar, Program, Stmt,
    StmtBreak, StmtContinue, StmtExpr, StmtFor, StmtIf, StmtLet, StmtReturn, StmtVar, StmtWhile,
    UnOp,
};

/// ELF header, program header and the mnemonic table consumed by the
/// downstream macro expander. The `size` placeholder is substituted with the
/// final image size once all labels are resolved.
const HEADER: &str = r#"                            # Elf32_Ehdr: 0x08048000
7F 45 4C 46 01 01 01 00     #     e_ident[0:7]
00 00 00 00 00 00 00 00     #     e_ident[8:15]
02 00                       #     e_type
03 00                       #     e_machine
01 00 00 00                 #     e_version
54 80 04 08                 #     e_entry
34 00 00 00                 #     e_phoff
00 00 00 00                 #     e_shoff
00 00 00 00                 #     e_flags
34 00                       #     e_ehsize
20 00                       #     e_phentsize
01 00                       #     e_phnum
28 00                       #     e_shentsize
00 00                       #     e_shnum
00 00                       #     e_shstrndx

                            #   Elf32_Phdr: 0x08048034
01 00 00 00                 #       p_type
00 00 00 00                 #       p_offset
00 80 04 08                 #       p_vaddr
00 80 04 08                 #       p_paddr
size                        #       p_filesz
size                        #       p_memsz
07 00 00 00                 #       p_flags
00 00 00 00                 #       p_align
                            #   _start: 0x08048054


%add_eax_ebx:       "01 D8"     # add eax, ebx
%add_eax_imm:       "05"        # add eax, <imm32>
%add_esp_imm:       "81 C4"     # add esp, <imm32>
%and_eax_ebx:       "21 D8"     # and eax, ebx
%call_ref_eax:      "FF 10"     # call [eax]
%cdq:               "99"        # cdq
%cmp_eax_ebx:       "39 D8"     # cmp eax, ebx
%cmp_eax_imm:       "3D"        # cmp eax, <imm32>
%cmp_ebx_imm:       "81 FB"     # cmp ebx, <imm32>
%idiv_ebx:          "F7 FB"     # idiv ebx
%imul_eax_ebx:      "0F AF C3"  # imul eax, ebx
%int_80:            "CD 80"     # int 0x80
%jmp_eax:           "FF E0"     # jmp eax
%mov_eax_ebp:       "89 E8"     # mov eax, ebp
%mov_eax_edx:       "89 D0"     # mov eax, edx
%mov_eax_imm:       "B8"        # mov eax, <imm32>
%mov_eax_ref_eax:   "8B 00"     # mov eax, [eax]
%mov_ebp_esp:       "89 E5"     # mov ebp, esp
%mov_ebx_eax:       "89 C3"     # mov ebx, eax
%mov_esp_ebp:       "89 EC"     # mov esp, ebp
%mov_ref_eax_ebx:   "89 18"     # mov [eax], ebx
%movzx_eax_al:      "0F B6 C0"  # movzx eax, al
%movzx_ebx_bl:      "0F B6 DB"  # movzx ebx, bl
%neg_eax:           "F7 D8"     # neg eax
%not_eax:           "F7 D0"     # not eax
%or_eax_ebx:        "09 D8"     # or eax, ebx
%pop_eax:           "58"        # pop eax
%pop_ebp:           "5D"        # pop ebp
%pop_ebx:           "5B"        # pop ebx
%pop_edx:           "5A"        # pop edx
%push_eax:          "50"        # push eax
%push_ebp:          "55"        # push ebp
%push_ebx:          "53"        # push ebx
%push_edx:          "52"        # push edx
%push_imm:          "68"        # push <imm32>
%ret:               "C3"        # ret
%sete_al:           "0F 94 C0"  # sete al
%setg_al:           "0F 9F C0"  # setg al
%setge_al:          "0F 9D C0"  # setge al
%setl_al:           "0F 9C C0"  # setl al
%setle_al:          "0F 9E C0"  # setle al
%setne_al:          "0F 95 C0"  # setne al
%setne_bl:          "0F 95 C3"  # setne bl
%sub_eax_ebx:       "29 D8"     # sub eax, ebx
%xor_eax_ebx:       "31 D8"     # xor eax, ebx
# x86 has no "je LABEL". Instead do "jne l1; jmp LABEL; l1:"
%hop_ne:            "75 07"     # jne . + 0x07 => hop over mov + jmp


"#;

/// Render a 32-bit immediate as 8 uppercase hex digits in little-endian
/// byte order, the form the label resolver also emits.
fn as_imm(imm: u32) -> String {
    format!(
        "{:02X}{:02X}{:02X}{:02X}",
        imm & 0xff,
        (imm >> 8) & 0xff,
        (imm >> 16) & 0xff,
        (imm >> 24) & 0xff
    )
}

/// Name resolution context for one point of the tree walk. Child blocks and
/// loop bodies work on a clone, so labels and locals never leak outward.
#[derive(Debug, Clone, Default)]
struct Scope {
    /// global variable or function name -> label of its 4-byte cell
    globals: HashMap<String, String>,
    /// local variable name -> offset relative to the frame pointer
    locals: HashMap<String, i32>,
    return_label: String,
    break_label: String,
    continue_label: String,
}

#[derive(Debug)]
struct Generator {
    output: String,
    next_unique_id: u32,
}

impl Generator {
    fn new() -> Generator {
        Generator {
            output: String::new(),
            next_unique_id: 0,
        }
    }

    fn emit(&mut self, text: impl AsRef<str>) {
        self.output.push_str(text.as_ref());
    }

    /// Base-36 counter, padded to 3 digits and prefixed so that the result
    /// is a valid identifier: `l001`, `l002`, ... Unique for the whole
    /// compilation unit.
    fn next_unique_label(&mut self) -> String {
        const DIGITS: [u8; 36] = *b"0123456789abcdefghijklmnopqrstuvwxyz";

        self.next_unique_id += 1;
        let mut id = self.next_unique_id;

        let mut digits = Vec::new();
        while id > 0 {
            digits.push(DIGITS[(id % 36) as usize]);
            id /= 36;
        }
        while digits.len() < 3 {
            digits.push(b'0');
        }
        digits.push(b'l');

        digits.iter().rev().map(|&c| c as char).collect()
    }

    /// Next free slot below every local visible in this scope. Slots are
    /// not recycled when a block ends.
    fn next_local_offset(scope: &Scope) -> i32 {
        let mut offset = 0;
        for &o in scope.locals.values() {
            offset = offset.min(o);
        }
        offset - 4
    }

    /// Leave the address of a variable in eax.
    fn address_of(&mut self, name: &str, scope: &Scope) {
        if let Some(label) = scope.globals.get(name) {
            self.emit(format!("mov_eax_imm {}\n", label));
            return;
        }

        self.emit("mov_eax_ebp\n");
        self.emit(format!("add_eax_imm {}\n", as_imm(scope.locals[name] as u32)));
    }

    fn program(&mut self, program: &Program) {
        self.emit(HEADER);

        let mut scope = Scope::default();

        for globalvar in &program.globalvars {
            self.globalvar(globalvar, &mut scope);
        }

        for function in &program.functions {
            self.function(function, &mut scope);
        }

        self.emit("\n# Call main\n");
        self.emit(format!("mov_eax_imm {}\n", scope.globals["main"]));
        self.emit("call_ref_eax\n");

        self.emit("\n# Terminate\n");
        self.emit("mov_ebx_eax\n");
        self.emit("mov_eax_imm 01 00 00 00\n");
        self.emit("int_80\n");
    }

    fn globalvar(&mut self, globalvar: &GlobalVar, scope: &mut Scope) {
        let var_begin = self.next_unique_label();
        let var_end = self.next_unique_label();
        scope.globals.insert(globalvar.name.clone(), var_begin.clone());

        self.emit(format!("\n##\n## GlobalVar \"{}\"\n##\n\n", globalvar.name));

        // jump over the 4-byte cell backing the variable
        self.emit(format!(
            "mov_eax_imm {}\njmp_eax\n.{}:\n00 00 00 00\n.{}:\n",
            var_end, var_begin, var_end
        ));

        self.expr(&globalvar.value, scope);

        self.emit(format!(
            "pop_ebx\nmov_eax_imm {}\nmov_ref_eax_ebx\n",
            var_begin
        ));
    }

    fn function(&mut self, function: &Function, scope: &mut Scope) {
        let fun_begin = self.next_unique_label();
        let fun_end = self.next_unique_label();
        let fun_entry = self.next_unique_label();
        let fun_return = self.next_unique_label();

        // the cell label doubles as the function's address, so indirect
        // calls work like variable reads
        scope.globals.insert(function.name.clone(), fun_begin.clone());

        let mut inner = Scope {
            globals: scope.globals.clone(),
            locals: HashMap::new(),
            return_label: fun_return.clone(),
            break_label: String::new(),
            continue_label: String::new(),
        };

        // arguments sit above the saved frame pointer and return address
        for (i, param) in function.params.iter().enumerate() {
            inner.locals.insert(param.clone(), 8 + 4 * i as i32);
        }

        self.emit(format!("\n##\n## Function \"{}\"\n##\n\n", function.name));

        self.emit(format!(
            "mov_eax_imm {}\njmp_eax\n.{}:\n00 00 00 00\n.{}:\npush_ebp\nmov_ebp_esp\n",
            fun_end, fun_begin, fun_entry
        ));

        for stmt in &function.body {
            self.stmt(stmt, &mut inner);
        }

        // fall-through return value; return statements jump here with their
        // value on the stack
        self.emit(format!(
            "push_imm 00 00 00 00\n.{}:\npop_eax\nmov_esp_ebp\npop_ebp\nret\n",
            fun_return
        ));

        // initialize the function pointer cell
        self.emit(format!(
            ".{}:\nmov_eax_imm {}\nmov_ebx_eax\nmov_eax_imm {}\nmov_ref_eax_ebx\n",
            fun_end, fun_entry, fun_begin
        ));
    }

    fn stmt(&mut self, stmt: &Stmt, scope: &mut Scope) {
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

    fn stmt_break(&mut self, _x: &StmtBreak, scope: &Scope) {
        self.emit(format!("mov_eax_imm {}\njmp_eax\n", scope.break_label));
    }

    fn stmt_continue(&mut self, _x: &StmtContinue, scope: &Scope) {
        self.emit(format!("mov_eax_imm {}\njmp_eax\n", scope.continue_label));
    }

    fn stmt_expr(&mut self, x: &StmtExpr, scope: &Scope) {
        self.expr(&x.expr, scope);

        // discard the result
        self.emit("pop_eax\n");
    }

    fn stmt_for(&mut self, x: &StmtFor, scope: &Scope) {
        let for_begin = self.next_unique_label();
        let for_continue = self.next_unique_label();
        let for_end = self.next_unique_label();

        let mut inner = scope.clone();
        inner.break_label = for_end.clone();
        inner.continue_label = for_continue.clone();
        inner.locals.insert(x.name.clone(), Self::next_local_offset(scope));

        // reserve the loop variable slot, then initialize it; the initial
        // expression still sees the outer scope
        self.emit("push_imm 00000000\npush_ebx\n");
        self.expr(&x.initial, scope);
        self.emit("pop_ebx\n");
        self.address_of(&x.name, &inner);
        self.emit("mov_ref_eax_ebx\npop_ebx\n");

        // condition
        self.emit(format!(".{}:\n", for_begin));
        self.expr(&x.condition, &inner);
        self.emit(format!(
            "pop_eax\ncmp_eax_imm 00 00 00 00\nhop_ne\nmov_eax_imm {}\njmp_eax\n",
            for_end
        ));

        for stmt in &x.body {
            self.stmt(stmt, &mut inner);
        }

        // update
        self.emit(format!(".{}:\npush_ebx\n", for_continue));
        self.expr(&x.update, &inner);
        self.emit("pop_ebx\n");
        self.address_of(&x.name, &inner);
        self.emit("mov_ref_eax_ebx\npop_ebx\n");

        // loop back, then drop the loop variable slot
        self.emit(format!(
            "mov_eax_imm {}\njmp_eax\n.{}:\npop_eax\n",
            for_begin, for_end
        ));
    }

    fn stmt_if(&mut self, x: &StmtIf, scope: &Scope) {
        let else_begin = self.next_unique_label();
        let if_end = self.next_unique_label();

        self.expr(&x.condition, scope);

        self.emit(format!(
            "pop_eax\ncmp_eax_imm 00 00 00 00\nhop_ne\nmov_eax_imm {}\njmp_eax\n",
            else_begin
        ));

        let mut inner_then = scope.clone();
        for stmt in &x.then_body {
            self.stmt(stmt, &mut inner_then);
        }

        self.emit(format!("mov_eax_imm {}\njmp_eax\n.{}:\n", if_end, else_begin));

        let mut inner_else = scope.clone();
        for stmt in &x.else_body {
            self.stmt(stmt, &mut inner_else);
        }

        self.emit(format!(".{}:\n", if_end));
    }

    fn stmt_let(&mut self, x: &StmtLet, scope: &Scope) {
        // keep ebx alive across the evaluation
        self.emit("push_ebx\n");
        self.expr(&x.expr, scope);
        self.emit("pop_ebx\n");

        self.address_of(&x.name, scope);
        self.emit("mov_ref_eax_ebx\npop_ebx\n");
    }

    fn stmt_return(&mut self, x: &StmtReturn, scope: &Scope) {
        self.expr(&x.expr, scope);

        self.emit(format!("mov_eax_imm {}\njmp_eax\n", scope.return_label));
    }

    fn stmt_var(&mut self, x: &StmtVar, scope: &mut Scope) {
        let offset = Self::next_local_offset(scope);
        scope.locals.insert(x.name.clone(), offset);

        // reserve the slot
        self.emit("push_imm 00 00 00 00\n");

        self.emit("push_ebx\n");
        self.expr(&x.expr, scope);
        self.emit("pop_ebx\n");

        self.address_of(&x.name, scope);
        self.emit("mov_ref_eax_ebx\npop_ebx\n");
    }

    fn stmt_while(&mut self, x: &StmtWhile, scope: &Scope) {
        let while_begin = self.next_unique_label();
        let while_end = self.next_unique_label();

        self.emit(format!(".{}:\n", while_begin));

        self.expr(&x.condition, scope);

        self.emit(format!(
            "pop_eax\ncmp_eax_imm 00 00 00 00\nhop_ne\nmov_eax_imm {}\njmp_eax\n",
            while_end
        ));

        let mut inner = scope.clone();
        inner.break_label = while_end.clone();
        inner.continue_label = while_begin.clone();
        for stmt in &x.body {
            self.stmt(stmt, &mut inner);
        }

        self.emit(format!(
            "mov_eax_imm {}\njmp_eax\n.{}:\n",
            while_begin, while_end
        ));
    }

    /// Every expression leaves exactly one value on the operand stack.
    fn expr(&mut self, expr: &Expr, scope: &Scope) {
        use Expr::*;
        match expr {
            AddressOf(x) => {
                self.address_of(&x.name, scope);
                self.emit("push_eax\n");
            }
            BinOp(x) => self.expr_bin_op(x, scope),
            Call(x) => self.expr_call(x, scope),
            Numeral(x) => {
                self.emit(format!("push_imm {}\n", as_imm(x.value as u32)));
            }
            Str(x) => self.expr_str(x),
            UnOp(x) => self.expr_un_op(x, scope),
            Variable(x) => {
                self.address_of(&x.name, scope);
                self.emit("mov_eax_ref_eax\npush_eax\n");
            }
        }
    }

    fn expr_bin_op(&mut self, x: &ExprBinOp, scope: &Scope) {
        // save ebx, evaluate lhs into eax and rhs into ebx
        self.emit("push_ebx\n");
        self.expr(&x.lhs, scope);
        self.expr(&x.rhs, scope);
        self.emit("pop_ebx\npop_eax\n");

        match x.op {
            BinOp::Add => self.emit("add_eax_ebx\n"),
            BinOp::Sub => self.emit("sub_eax_ebx\n"),
            BinOp::Mul => self.emit("imul_eax_ebx\n"),
            BinOp::Div => self.emit("push_edx\ncdq\nidiv_ebx\npop_edx\n"),
            BinOp::Mod => self.emit("push_edx\ncdq\nidiv_ebx\nmov_eax_edx\npop_edx\n"),
            // both operands normalized to 0/1 first, so 2 && 3 is true
            BinOp::LogAnd => self.emit(
                "cmp_eax_imm 00 00 00 00\nsetne_al\nmovzx_eax_al\ncmp_ebx_imm 00000000\nsetne_bl\nmovzx_ebx_bl\nand_eax_ebx\n",
            ),
            BinOp::LogOr => self.emit(
                "cmp_eax_imm 00000000\nsetne_al\nmovzx_eax_al\ncmp_ebx_imm 00000000\nsetne_bl\nmovzx_ebx_bl\nor_eax_ebx\n",
            ),
            BinOp::BitAnd => self.emit("and_eax_ebx\n"),
            BinOp::BitOr => self.emit("or_eax_ebx\n"),
            BinOp::BitXor => self.emit("xor_eax_ebx\n"),
            BinOp::Eq => self.emit("cmp_eax_ebx\nsete_al\nmovzx_eax_al\n"),
            BinOp::Ne => self.emit("cmp_eax_ebx\nsetne_al\nmovzx_eax_al\n"),
            BinOp::Lt => self.emit("cmp_eax_ebx\nsetl_al\nmovzx_eax_al\n"),
            BinOp::Le => self.emit("cmp_eax_ebx\nsetle_al\nmovzx_eax_al\n"),
            BinOp::Gt => self.emit("cmp_eax_ebx\nsetg_al\nmovzx_eax_al\n"),
            BinOp::Ge => self.emit("cmp_eax_ebx\nsetge_al\nmovzx_eax_al\n"),
        }

        // restore ebx, push the result
        self.emit("pop_ebx\npush_eax\n");
    }

    fn expr_call(&mut self, x: &ExprCall, scope: &Scope) {
        // arguments go on the stack right to left
        for arg in x.args.iter().rev() {
            self.expr(arg, scope);
        }

        self.address_of(&x.name, scope);
        self.emit("call_ref_eax\n");

        // caller cleans up
        self.emit(format!(
            "add_esp_imm {}\n",
            as_imm(4 * x.args.len() as u32)
        ));

        self.emit("push_eax\n");
    }

    fn expr_str(&mut self, x: &ExprStr) {
        let data_begin = self.next_unique_label();
        let data_end = self.next_unique_label();

        // jump over the bytes, they are data
        self.emit(format!(
            "mov_eax_imm {}\njmp_eax\n.{}:\n",
            data_end, data_begin
        ));

        for &c in &x.value {
            self.emit(format!("{:02X} ", c));
        }
        self.emit("00\n");

        self.emit(format!(
            ".{}:\npush_imm {}\n",
            data_end, data_begin
        ));
    }

    fn expr_un_op(&mut self, x: &ExprUnOp, scope: &Scope) {
        self.expr(&x.expr, scope);
        self.emit("pop_eax\n");

        match x.op {
            UnOp::Plus => {}
            UnOp::Neg => self.emit("neg_eax\n"),
            UnOp::BitNot => self.emit("not_eax\n"),
            UnOp::LogNot => self.emit("cmp_eax_imm 00 00 00 00\nsete_al\nmovzx_eax_al\n"),
        }

        self.emit("push_eax\n");
    }
}

/// Lower a program to pseudo-assembly text. The tree must have passed
/// [`crate::static_analysis::static_analysis`]; symbols are not re-checked
/// here.
pub fn generate(program: &Program) -> String {
    let mut gen = Generator::new();
    gen.program(program);
    gen.output
}
