// File: src/compiler.rs
//
// A single-pass Pratt-parser compiler from Lumen source text to a top-level
// `ObjFunction`. Turns tokens straight into bytecode in one walk, no
// intermediate AST, so the scanner and interpreter can be exercised end to
// end. It carries none of the interpreter's invariants itself; it only has
// to produce bytecode the interpreter honors those invariants for.

use crate::chunk::{Chunk, OpCode};
use crate::errors::LumenError;
use crate::object::{Obj, ObjFunction, ObjHandle};
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::Value;
use crate::vm::Vm;

#[derive(Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Assignment, // =
    Ternary,    // ?:
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Ternary,
            Precedence::Ternary => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::LeftParen | TokenKind::Dot => Precedence::Call,
        TokenKind::Star | TokenKind::Slash => Precedence::Factor,
        TokenKind::Plus | TokenKind::Minus => Precedence::Term,
        TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual => {
            Precedence::Comparison
        }
        TokenKind::BangEqual | TokenKind::EqualEqual => Precedence::Equality,
        TokenKind::And => Precedence::And,
        TokenKind::Or => Precedence::Or,
        TokenKind::Question => Precedence::Ternary,
        _ => Precedence::None,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    Script,
    Function,
    Method,
    Initializer,
}

struct Local<'src> {
    name: &'src str,
    depth: i32,
    is_captured: bool,
}

#[derive(Clone, Copy)]
struct UpvalueRef {
    index: u8,
    is_local: bool,
}

struct FuncState<'src> {
    ftype: FunctionType,
    name: Option<String>,
    /// Counted as `u16` while parsing the parameter list so a declaration
    /// with more than 255 parameters reports an error instead of wrapping
    /// `u8::MAX` back to 0; narrowed only once `end_compiler` builds the
    /// `ObjFunction`.
    arity: u16,
    chunk: Chunk,
    locals: Vec<Local<'src>>,
    scope_depth: i32,
    upvalues: Vec<UpvalueRef>,
}

impl<'src> FuncState<'src> {
    fn new(ftype: FunctionType, name: Option<String>) -> Self {
        let slot0_name = match ftype {
            FunctionType::Method | FunctionType::Initializer => "this",
            _ => "",
        };
        FuncState {
            ftype,
            name,
            arity: 0,
            chunk: Chunk::new(),
            locals: vec![Local { name: slot0_name, depth: 0, is_captured: false }],
            scope_depth: 0,
            upvalues: Vec::new(),
        }
    }
}

struct ClassState {
    has_superclass: bool,
}

struct Compiler<'src> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<LumenError>,
    funcs: Vec<FuncState<'src>>,
    classes: Vec<ClassState>,
}

/// Compiles `source` into a top-level script function, or collects every
/// compile error encountered along the way instead of stopping at the
/// first one.
pub fn compile(vm: &mut Vm, source: &str) -> Result<ObjHandle, Vec<LumenError>> {
    let dummy = Token { kind: TokenKind::Eof, lexeme: "", line: 0 };
    let mut c = Compiler {
        scanner: Scanner::new(source),
        previous: dummy,
        current: dummy,
        had_error: false,
        panic_mode: false,
        errors: Vec::new(),
        funcs: vec![FuncState::new(FunctionType::Script, None)],
        classes: Vec::new(),
    };

    c.advance();
    while !c.check(TokenKind::Eof) {
        c.declaration(vm);
    }
    c.consume(TokenKind::Eof, "Expect end of expression.");
    let (handle, _upvalues) = c.end_compiler(vm);
    vm.clear_compiler_roots();

    if c.had_error {
        Err(c.errors)
    } else {
        Ok(handle)
    }
}

impl<'src> Compiler<'src> {
    // ---- token stream plumbing ----

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        if token.kind == TokenKind::Error {
            // The scanner itself rejected this token (e.g. an unterminated
            // string) — a lexical error, not a syntax error the parser
            // found, so it's reported as its own taxonomy entry.
            self.errors.push(LumenError::lexical(message.to_string(), token.line));
            return;
        }
        let rendered = match token.kind {
            TokenKind::Eof => format!("Error at end: {}", message),
            _ => format!("Error at '{}': {}", token.lexeme, message),
        };
        self.errors.push(LumenError::compile(rendered, token.line));
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ---- bytecode emission ----

    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.funcs.last_mut().unwrap().chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk().write_u8(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_bytes(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().code.len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.current_chunk().code.len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        self.current_chunk().patch_u16(offset, jump as u16);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let offset = self.current_chunk().code.len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        let line = self.previous.line;
        self.current_chunk().write_u16(offset as u16, line);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.current_chunk().add_constant(value);
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let constant = self.make_constant(value);
        self.emit_bytes(OpCode::Constant, constant);
    }

    fn emit_return(&mut self) {
        if self.funcs.last().unwrap().ftype == FunctionType::Initializer {
            self.emit_bytes(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);
    }

    fn end_compiler(&mut self, vm: &mut Vm) -> (ObjHandle, Vec<UpvalueRef>) {
        self.emit_return();
        let state = self.funcs.pop().unwrap();
        let name = state.name.map(|n| vm.intern_string(&n));
        let function = ObjFunction {
            arity: state.arity.min(255) as u8,
            upvalue_count: state.upvalues.len(),
            name,
            chunk: state.chunk,
        };
        let handle = vm.allocate_object(Obj::Function(function));
        vm.push_compiler_root(handle);
        (handle, state.upvalues)
    }

    // ---- scopes & variables ----

    fn begin_scope(&mut self) {
        self.funcs.last_mut().unwrap().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let func = self.funcs.last_mut().unwrap();
        func.scope_depth -= 1;
        let depth = func.scope_depth;
        while let Some(local) = func.locals.last() {
            if local.depth <= depth {
                break;
            }
            if local.is_captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
            self.funcs.last_mut().unwrap().locals.pop();
        }
    }

    fn identifier_constant(&mut self, vm: &mut Vm, name: &str) -> u8 {
        let handle = vm.intern_string(name);
        self.make_constant(Value::Obj(handle))
    }

    fn add_local(&mut self, name: &'src str) {
        let func = self.funcs.last_mut().unwrap();
        if func.locals.len() >= 256 {
            self.error("Too many local variables in function.");
            return;
        }
        func.locals.push(Local { name, depth: -1, is_captured: false });
    }

    fn declare_variable(&mut self) {
        let func = self.funcs.last().unwrap();
        if func.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let depth = func.scope_depth;
        for local in func.locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name == name {
                self.error("Already a variable with this name in this scope.");
                return;
            }
        }
        self.add_local(name);
    }

    fn parse_variable(&mut self, vm: &mut Vm, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.funcs.last().unwrap().scope_depth > 0 {
            return 0;
        }
        let name = self.previous.lexeme;
        self.identifier_constant(vm, name)
    }

    fn mark_initialized(&mut self) {
        let func = self.funcs.last_mut().unwrap();
        if func.scope_depth == 0 {
            return;
        }
        let depth = func.scope_depth;
        func.locals.last_mut().unwrap().depth = depth;
    }

    fn define_variable(&mut self, global: u8) {
        if self.funcs.last().unwrap().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_bytes(OpCode::DefineGlobal, global);
    }

    fn resolve_local(&mut self, func_index: usize, name: &str) -> Option<u8> {
        let func = &self.funcs[func_index];
        for (i, local) in func.locals.iter().enumerate().rev() {
            if local.name == name {
                if local.depth == -1 {
                    self.error("Can't read local variable in its own initializer.");
                }
                return Some(i as u8);
            }
        }
        None
    }

    fn add_upvalue(&mut self, func_index: usize, index: u8, is_local: bool) -> u8 {
        let func = &mut self.funcs[func_index];
        for (i, up) in func.upvalues.iter().enumerate() {
            if up.index == index && up.is_local == is_local {
                return i as u8;
            }
        }
        if func.upvalues.len() >= 256 {
            self.error("Too many closure variables in function.");
            return 0;
        }
        func.upvalues.push(UpvalueRef { index, is_local });
        (func.upvalues.len() - 1) as u8
    }

    fn resolve_upvalue(&mut self, func_index: usize, name: &str) -> Option<u8> {
        if func_index == 0 {
            return None;
        }
        let parent = func_index - 1;
        if let Some(local_index) = self.resolve_local(parent, name) {
            self.funcs[parent].locals[local_index as usize].is_captured = true;
            return Some(self.add_upvalue(func_index, local_index, true));
        }
        if let Some(up_index) = self.resolve_upvalue(parent, name) {
            return Some(self.add_upvalue(func_index, up_index, false));
        }
        None
    }

    fn named_variable(&mut self, vm: &mut Vm, name: &str, can_assign: bool) {
        let func_index = self.funcs.len() - 1;
        let (get_op, set_op, arg) = if let Some(slot) = self.resolve_local(func_index, name) {
            (OpCode::GetLocal, OpCode::SetLocal, slot)
        } else if let Some(slot) = self.resolve_upvalue(func_index, name) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, slot)
        } else {
            let constant = self.identifier_constant(vm, name);
            (OpCode::GetGlobal, OpCode::SetGlobal, constant)
        };

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression(vm);
            self.emit_bytes(set_op, arg);
        } else {
            self.emit_bytes(get_op, arg);
        }
    }

    // ---- statements ----

    fn declaration(&mut self, vm: &mut Vm) {
        if self.match_token(TokenKind::Class) {
            self.class_declaration(vm);
        } else if self.match_token(TokenKind::Fun) {
            self.fun_declaration(vm);
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration(vm);
        } else {
            self.statement(vm);
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn class_declaration(&mut self, vm: &mut Vm) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let class_name = self.previous.lexeme;
        let name_constant = self.identifier_constant(vm, class_name);
        self.declare_variable();

        self.emit_bytes(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassState { has_superclass: false });

        if self.match_token(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Expect superclass name.");
            let superclass_name = self.previous.lexeme;
            self.named_variable(vm, superclass_name, false);
            if superclass_name == class_name {
                self.error("A class can't inherit from itself.");
            }
            self.begin_scope();
            self.add_local("super");
            self.define_variable(0);

            self.named_variable(vm, class_name, false);
            self.emit_op(OpCode::Inherit);
            self.classes.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(vm, class_name, false);
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.method(vm);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop);

        if self.classes.last().unwrap().has_superclass {
            self.end_scope();
        }
        self.classes.pop();
    }

    fn method(&mut self, vm: &mut Vm) {
        self.consume(TokenKind::Identifier, "Expect method name.");
        let name = self.previous.lexeme.to_string();
        let name_constant = self.identifier_constant(vm, &name);
        let ftype = if name == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(vm, ftype);
        self.emit_bytes(OpCode::Method, name_constant);
    }

    fn fun_declaration(&mut self, vm: &mut Vm) {
        let global = self.parse_variable(vm, "Expect function name.");
        self.mark_initialized();
        self.function(vm, FunctionType::Function);
        self.define_variable(global);
    }

    fn function(&mut self, vm: &mut Vm, ftype: FunctionType) {
        let name = self.previous.lexeme.to_string();
        self.funcs.push(FuncState::new(ftype, Some(name)));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                let func = self.funcs.last_mut().unwrap();
                if func.arity == 255 {
                    self.error("Can't have more than 255 parameters.");
                }
                func.arity += 1;
                let constant = self.parse_variable(vm, "Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block(vm);

        let (handle, upvalues) = self.end_compiler(vm);
        let constant = self.make_constant(Value::Obj(handle));
        self.emit_bytes(OpCode::Closure, constant);
        for up in upvalues {
            self.emit_byte(up.is_local as u8);
            self.emit_byte(up.index);
        }
    }

    fn var_declaration(&mut self, vm: &mut Vm) {
        let global = self.parse_variable(vm, "Expect variable name.");
        if self.match_token(TokenKind::Equal) {
            self.expression(vm);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn statement(&mut self, vm: &mut Vm) {
        if self.match_token(TokenKind::Print) {
            self.print_statement(vm);
        } else if self.match_token(TokenKind::For) {
            self.for_statement(vm);
        } else if self.match_token(TokenKind::If) {
            self.if_statement(vm);
        } else if self.match_token(TokenKind::Return) {
            self.return_statement(vm);
        } else if self.match_token(TokenKind::While) {
            self.while_statement(vm);
        } else if self.match_token(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block(vm);
            self.end_scope();
        } else {
            self.expression_statement(vm);
        }
    }

    fn block(&mut self, vm: &mut Vm) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration(vm);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self, vm: &mut Vm) {
        self.expression(vm);
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self, vm: &mut Vm) {
        self.expression(vm);
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self, vm: &mut Vm) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression(vm);
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement(vm);

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.match_token(TokenKind::Else) {
            self.statement(vm);
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self, vm: &mut Vm) {
        let loop_start = self.current_chunk().code.len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression(vm);
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement(vm);
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self, vm: &mut Vm) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(TokenKind::Semicolon) {
            // no initializer
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration(vm);
        } else {
            self.expression_statement(vm);
        }

        let mut loop_start = self.current_chunk().code.len();
        let mut exit_jump: Option<usize> = None;
        if !self.match_token(TokenKind::Semicolon) {
            self.expression(vm);
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.match_token(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().code.len();
            self.expression(vm);
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement(vm);
        self.emit_loop(loop_start);

        if let Some(exit) = exit_jump {
            self.patch_jump(exit);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    fn return_statement(&mut self, vm: &mut Vm) {
        if self.funcs.last().unwrap().ftype == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }
        if self.match_token(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            if self.funcs.last().unwrap().ftype == FunctionType::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression(vm);
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    // ---- expressions ----

    fn expression(&mut self, vm: &mut Vm) {
        self.parse_precedence(vm, Precedence::Assignment);
    }

    fn parse_precedence(&mut self, vm: &mut Vm, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;
        if !self.prefix(vm, self.previous.kind, can_assign) {
            self.error("Expect expression.");
            return;
        }

        while precedence <= precedence_of(self.current.kind) {
            self.advance();
            self.infix(vm, self.previous.kind, can_assign);
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn prefix(&mut self, vm: &mut Vm, kind: TokenKind, can_assign: bool) -> bool {
        match kind {
            TokenKind::LeftParen => self.grouping(vm),
            TokenKind::Minus | TokenKind::Bang => self.unary(vm),
            TokenKind::Number => self.number(),
            TokenKind::String => self.string(vm),
            TokenKind::False | TokenKind::True | TokenKind::Nil => self.literal(),
            TokenKind::Identifier => self.named_variable(vm, self.previous.lexeme, can_assign),
            TokenKind::This => self.this_expr(vm),
            TokenKind::Super => self.super_expr(vm),
            _ => return false,
        }
        true
    }

    fn infix(&mut self, vm: &mut Vm, kind: TokenKind, can_assign: bool) {
        match kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::BangEqual
            | TokenKind::EqualEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => self.binary(vm, kind),
            TokenKind::And => self.and(vm),
            TokenKind::Or => self.or(vm),
            TokenKind::Question => self.ternary(vm),
            TokenKind::LeftParen => self.call(vm),
            TokenKind::Dot => self.dot(vm, can_assign),
            _ => unreachable!("no infix rule for {:?}", kind),
        }
    }

    fn grouping(&mut self, vm: &mut Vm) {
        self.expression(vm);
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, vm: &mut Vm) {
        let op_kind = self.previous.kind;
        self.parse_precedence(vm, Precedence::Unary);
        match op_kind {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self, vm: &mut Vm, op_kind: TokenKind) {
        let rule_prec = precedence_of(op_kind);
        self.parse_precedence(vm, rule_prec.next());
        match op_kind {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            _ => unreachable!(),
        }
    }

    fn and(&mut self, vm: &mut Vm) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(vm, Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self, vm: &mut Vm) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(vm, Precedence::Or);
        self.patch_jump(end_jump);
    }

    /// `cond ? then : else`. Needs no opcode of its own — it desugars to
    /// the same Jump/JumpIfFalse pair `if`/`else` use.
    fn ternary(&mut self, vm: &mut Vm) {
        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.expression(vm);

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);
        self.consume(TokenKind::Colon, "Expect ':' after then-branch of ternary expression.");
        self.parse_precedence(vm, Precedence::Ternary);
        self.patch_jump(else_jump);
    }

    fn call(&mut self, vm: &mut Vm) {
        let arg_count = self.argument_list(vm);
        self.emit_bytes(OpCode::Call, arg_count);
    }

    fn argument_list(&mut self, vm: &mut Vm) -> u8 {
        let mut count: u32 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression(vm);
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count as u8
    }

    fn dot(&mut self, vm: &mut Vm, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.previous.lexeme;
        let name_constant = self.identifier_constant(vm, name);

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression(vm);
            self.emit_bytes(OpCode::SetProperty, name_constant);
        } else if self.match_token(TokenKind::LeftParen) {
            let arg_count = self.argument_list(vm);
            self.emit_bytes(OpCode::Invoke, name_constant);
            self.emit_byte(arg_count);
        } else {
            self.emit_bytes(OpCode::GetProperty, name_constant);
        }
    }

    fn this_expr(&mut self, vm: &mut Vm) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.named_variable(vm, "this", false);
    }

    fn super_expr(&mut self, vm: &mut Vm) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }

        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let name = self.previous.lexeme;
        let name_constant = self.identifier_constant(vm, name);

        self.named_variable(vm, "this", false);
        if self.match_token(TokenKind::LeftParen) {
            let arg_count = self.argument_list(vm);
            self.named_variable(vm, "super", false);
            self.emit_bytes(OpCode::SuperInvoke, name_constant);
            self.emit_byte(arg_count);
        } else {
            self.named_variable(vm, "super", false);
            self.emit_bytes(OpCode::GetSuper, name_constant);
        }
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => unreachable!(),
        }
    }

    fn number(&mut self) {
        let text = self.previous.lexeme;
        let value = if text.len() > 1 && (text.starts_with("0x") || text.starts_with("0X")) {
            let digits = &text[2..];
            i64::from_str_radix(digits, 16).unwrap_or(0) as f64
        } else {
            text.parse::<f64>().unwrap_or(0.0)
        };
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self, vm: &mut Vm) {
        let lexeme = self.previous.lexeme;
        let text = &lexeme[1..lexeme.len() - 1];
        let handle = vm.intern_string(text);
        self.emit_constant(Value::Obj(handle));
    }
}
