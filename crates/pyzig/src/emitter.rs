//! Code emitter: analyzed AST → Zig source text (spec.md §4.4).
//!
//! `Emitter` is a stateful string builder, the same shape as the teacher's
//! `CodeBuilder` (current indentation depth, a growing output buffer) plus
//! the extra state spec.md §4.4 calls for: the symbol/function-metadata
//! tables from the analyzer, a preamble buffer for module-level cached
//! constants, a fresh-temporary counter, and the JSON-literal
//! deduplication map.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::analyzer::{Analysis, ClassMeta, FunctionMeta};
use crate::ast::{
    AssignTarget, ClassDef, Constant, Expr, For, ForTarget, FunctionDef, If, Module, Operator, Stmt, UnaryOperator,
    While,
};
use crate::error::EmitError;
use crate::symbols::Type;

pub fn emit(module: &Module, analysis: &Analysis) -> Result<String, EmitError> {
    let mut emitter = Emitter::new(analysis);
    emitter.emit_module(module)?;
    Ok(emitter.finish())
}

struct Emitter<'a> {
    analysis: &'a Analysis,
    out: String,
    indent: usize,
    preamble: String,
    temp_counter: u32,
    json_cache: IndexMap<Box<str>, Box<str>>,
    /// Names already declared (`const`/`var`) in the current function-level
    /// scope, so a second assignment to the same name emits a plain
    /// reassignment instead of a duplicate declaration (spec.md §4.4.1).
    /// Cleared at the start of every function/method body.
    declared: std::collections::HashSet<Box<str>>,
}

impl<'a> Emitter<'a> {
    fn new(analysis: &'a Analysis) -> Self {
        Self {
            analysis,
            out: String::new(),
            indent: 0,
            preamble: String::new(),
            temp_counter: 0,
            json_cache: IndexMap::new(),
            declared: std::collections::HashSet::new(),
        }
    }

    fn finish(self) -> String {
        let mut combined = String::new();
        combined.push_str("const runtime = @import(\"runtime.zig\");\n");
        combined.push_str("const std = @import(\"std\");\n\n");
        if !self.preamble.is_empty() {
            combined.push_str("// module-level cached constants\n");
            combined.push_str(&self.preamble);
            combined.push('\n');
        }
        combined.push_str(&self.out);
        combined
    }

    fn fresh_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("__tmp{}", self.temp_counter)
    }

    fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    // ---- module / functions / classes --------------------------------

    fn emit_module(&mut self, module: &Module) -> Result<(), EmitError> {
        for stmt in &module.body {
            match stmt {
                Stmt::FunctionDef(func) => {
                    let meta = self.analysis.functions[&func.name].clone();
                    self.emit_function(func, &meta)?;
                }
                Stmt::ClassDef(class) => {
                    let meta = self.analysis.classes[&class.name].clone();
                    self.emit_class(class, &meta)?;
                }
                Stmt::Import(import) => self.check_import(&import.module, import.span)?,
                Stmt::ImportFrom(import_from) => self.check_import(&import_from.module, import_from.span)?,
                _ => {}
            }
        }
        self.emit_main(module)?;
        Ok(())
    }

    /// Top-level statements outside `def`/`class` are collected into the
    /// emitted program's entry point (spec.md §6, "emitted program entry
    /// point").
    fn emit_main(&mut self, module: &Module) -> Result<(), EmitError> {
        self.write_line("pub fn main() u8 {");
        self.indent += 1;
        self.write_line("var gpa = std.heap.GeneralPurposeAllocator(.{}){};");
        self.write_line("const allocator = gpa.allocator();");
        self.write_line("defer _ = gpa.deinit();");
        self.declared.clear();
        let module_symbols = self.analysis.module_symbols.clone();
        for stmt in &module.body {
            if matches!(stmt, Stmt::FunctionDef(_) | Stmt::ClassDef(_) | Stmt::Import(_) | Stmt::ImportFrom(_)) {
                continue;
            }
            self.emit_stmt(stmt, &module_symbols)?;
        }
        self.write_line("return 0;");
        self.indent -= 1;
        self.write_line("}");
        Ok(())
    }

    fn check_import(&self, module: &str, span: crate::ast::Span) -> Result<(), EmitError> {
        if module == "json" || module == "http" {
            Ok(())
        } else {
            Err(EmitError::UnsupportedImport { module: module.into(), span })
        }
    }

    /// Synchronous and asynchronous function emission, spec.md §4.4.4.
    fn emit_function(&mut self, func: &FunctionDef, meta: &FunctionMeta) -> Result<(), EmitError> {
        if func.is_async {
            return self.emit_async_function(func, meta);
        }

        let ret_ty = zig_type(&meta.return_type);
        let fallible = meta.needs_allocator || meta.return_type == Type::PyObject;
        let mut params = Vec::new();
        for (param, ty) in func.params.iter().zip(&meta.param_types) {
            params.push(format!("{}: {}", param.name, zig_type(ty)));
        }
        if meta.needs_allocator {
            params.push("allocator: std.mem.Allocator".to_owned());
        }
        let signature = format!(
            "pub fn {}({}) {}{} {{",
            func.name,
            params.join(", "),
            if fallible { "!" } else { "" },
            ret_ty,
        );
        self.write_line(&signature);
        self.indent += 1;
        self.declared.clear();
        let symbols = meta.symbols.clone();
        for stmt in &func.body {
            self.emit_stmt(stmt, &symbols)?;
        }
        self.indent -= 1;
        self.write_line("}");
        self.out.push('\n');
        Ok(())
    }

    /// Cooperative, scheduler-free lowering (spec.md §4.4.4, §9): a
    /// `{start, running, done}` frame whose `resume` runs the whole body
    /// inline on first call.
    fn emit_async_function(&mut self, func: &FunctionDef, meta: &FunctionMeta) -> Result<(), EmitError> {
        let ret_ty = zig_type(&meta.return_type);
        let frame_name = format!("{}Frame", capitalize(&func.name));

        self.write_line(&format!("const {frame_name} = struct {{"));
        self.indent += 1;
        self.write_line("state: enum { start, running, done } = .start,");
        for param in &func.params {
            let ty = meta.symbols.type_of(param.name.as_ref());
            self.write_line(&format!("{}: {},", param.name, zig_type(&ty)));
        }
        self.write_line(&format!("result: {ret_ty} = undefined,"));
        self.out.push('\n');

        let mut init_params = Vec::new();
        for (param, ty) in func.params.iter().zip(&meta.param_types) {
            init_params.push(format!("{}: {}", param.name, zig_type(ty)));
        }
        self.write_line(&format!("pub fn init({}) {frame_name} {{", init_params.join(", ")));
        self.indent += 1;
        let field_inits: Vec<String> = func.params.iter().map(|p| format!("{} = {}", p.name, p.name)).collect();
        self.write_line(&format!(".{{ .state = .start, {} }}", field_inits.join(", ")));
        self.indent -= 1;
        self.write_line("}");
        self.out.push('\n');

        let fallible = meta.needs_allocator || meta.return_type == Type::PyObject;
        self.write_line(&format!(
            "pub fn resume_(self: *{frame_name}{}) {}{} {{",
            if meta.needs_allocator { ", allocator: std.mem.Allocator" } else { "" },
            if fallible { "!" } else { "" },
            ret_ty,
        ));
        self.indent += 1;
        self.write_line("switch (self.state) {");
        self.indent += 1;
        self.write_line(".start => {");
        self.indent += 1;
        self.write_line("self.state = .running;");
        self.declared.clear();
        let symbols = meta.symbols.clone();
        for stmt in &func.body {
            self.emit_stmt(stmt, &symbols)?;
        }
        self.write_line("self.state = .done;");
        self.write_line("return self.result;");
        self.indent -= 1;
        self.write_line("},");
        self.write_line(".running, .done => return self.result,");
        self.indent -= 1;
        self.write_line("}");
        self.indent -= 1;
        self.write_line("}");
        self.indent -= 1;
        self.write_line("};");
        self.out.push('\n');

        // Wrapper preserving the original call surface (spec.md §4.4.4).
        let mut params = Vec::new();
        for (param, ty) in func.params.iter().zip(&meta.param_types) {
            params.push(format!("{}: {}", param.name, zig_type(ty)));
        }
        if meta.needs_allocator {
            params.push("allocator: std.mem.Allocator".to_owned());
        }
        self.write_line(&format!(
            "pub fn {}({}) {}{} {{",
            func.name,
            params.join(", "),
            if fallible { "!" } else { "" },
            ret_ty,
        ));
        self.indent += 1;
        let call_args: Vec<String> = func.params.iter().map(|p| p.name.to_string()).collect();
        self.write_line(&format!("var frame = {frame_name}.init({});", call_args.join(", ")));
        let resume_call =
            if meta.needs_allocator { "frame.resume_(allocator)".to_owned() } else { "frame.resume_()".to_owned() };
        self.write_line(&format!("return {}{resume_call};", if fallible { "try " } else { "" }));
        self.indent -= 1;
        self.write_line("}");
        self.out.push('\n');
        Ok(())
    }

    /// Class emission, spec.md §4.4.5: instance fields are all 64-bit
    /// signed integers (the only instance-field type in the supported
    /// subset); `__init__` becomes `init`, every other method takes `*Self`.
    fn emit_class(&mut self, class: &ClassDef, meta: &ClassMeta) -> Result<(), EmitError> {
        self.write_line(&format!("pub const {} = struct {{", class.name));
        self.indent += 1;
        self.write_line("const Self = @This();");
        self.out.push('\n');
        for field in &meta.fields {
            self.write_line(&format!("{field}: i64,"));
        }
        self.out.push('\n');

        if let Some(init) = class.methods.iter().find(|m| m.name.as_ref() == "__init__") {
            let init_meta = meta.methods.iter().find(|m| m.name.as_ref() == "__init__").expect("init analyzed");
            self.emit_init_method(class, init, init_meta)?;
        }

        for method in class.methods.iter().filter(|m| m.name.as_ref() != "__init__") {
            let method_meta = meta.methods.iter().find(|m| m.name == method.name).expect("method analyzed");
            self.emit_instance_method(method, method_meta)?;
        }

        self.indent -= 1;
        self.write_line("};");
        self.out.push('\n');
        Ok(())
    }

    fn emit_init_method(&mut self, class: &ClassDef, init: &FunctionDef, meta: &FunctionMeta) -> Result<(), EmitError> {
        let params: Vec<String> = init
            .params
            .iter()
            .skip(1) // drop `self`
            .zip(meta.param_types.iter().skip(1))
            .map(|(p, ty)| format!("{}: {}", p.name, zig_type(ty)))
            .collect();
        self.write_line(&format!("pub fn init({}) {} {{", params.join(", "), class.name));
        self.indent += 1;
        let field_inits: Vec<String> = collect_field_assignments(&init.body)
            .into_iter()
            .map(|(field, value)| format!(".{field} = {value}"))
            .collect();
        self.write_line(&format!("return .{{ {} }};", field_inits.join(", ")));
        self.indent -= 1;
        self.write_line("}");
        self.out.push('\n');
        Ok(())
    }

    /// Methods are never fallible in the supported subset (spec.md
    /// §4.4.6), so no fallibility marker is ever emitted here.
    fn emit_instance_method(&mut self, method: &FunctionDef, meta: &FunctionMeta) -> Result<(), EmitError> {
        let ret_ty = zig_type(&meta.return_type);
        let params: Vec<String> = method
            .params
            .iter()
            .skip(1)
            .zip(meta.param_types.iter().skip(1))
            .map(|(p, ty)| format!("{}: {}", p.name, zig_type(ty)))
            .collect();
        let joined = if params.is_empty() { "self: *Self".to_owned() } else { format!("self: *Self, {}", params.join(", ")) };
        self.write_line(&format!("pub fn {}({joined}) {ret_ty} {{", method.name));
        self.indent += 1;
        self.declared.clear();
        let symbols = meta.symbols.clone();
        for stmt in &method.body {
            self.emit_stmt(stmt, &symbols)?;
        }
        self.indent -= 1;
        self.write_line("}");
        self.out.push('\n');
        Ok(())
    }

    // ---- statements ----------------------------------------------------

    fn emit_stmt(&mut self, stmt: &Stmt, symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        match stmt {
            Stmt::Assign(assign) => self.emit_assign(assign, symbols),
            Stmt::ExprStmt(expr_stmt) => {
                if matches!(expr_stmt.value, Expr::Constant(Constant::Str(_), _)) {
                    // Bare docstring: no runtime effect (spec.md §3).
                    return Ok(());
                }
                let rendered = self.emit_expr(&expr_stmt.value, symbols)?;
                self.write_line(&format!("{rendered};"));
                Ok(())
            }
            Stmt::If(if_stmt) => self.emit_if(if_stmt, symbols),
            Stmt::While(while_stmt) => self.emit_while(while_stmt, symbols),
            Stmt::For(for_stmt) => self.emit_for(for_stmt, symbols),
            Stmt::Return(ret) => self.emit_return(ret, symbols),
            Stmt::Pass(_) => Ok(()),
            Stmt::FunctionDef(_) | Stmt::ClassDef(_) | Stmt::Import(_) | Stmt::ImportFrom(_) => Ok(()),
        }
    }

    /// §4.4.1: the first assignment to a name emits a fresh binding
    /// (`const` unless it is reassigned elsewhere in the scope, in which
    /// case `var`); every later assignment to the same name is a plain
    /// reassignment, not a redeclaration. A heap-typed binding gets a
    /// `defer decref(...)` the instant it is first bound, and every
    /// reassignment decrefs the old value before the new one is stored
    /// (spec.md §4.4.1, §9).
    fn emit_assign(&mut self, assign: &crate::ast::Assign, symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        let value = self.emit_expr(&assign.value, symbols)?;
        for target in &assign.targets {
            match target {
                AssignTarget::Name(name, _) => {
                    let binding = symbols.get(name.as_ref());
                    let ty = binding.map_or(Type::PyObject, |b| b.ty.clone());
                    let reassigned = binding.is_some_and(|b| b.reassigned);
                    if self.declared.insert(name.clone()) {
                        let keyword = if reassigned { "var" } else { "const" };
                        self.write_line(&format!("{keyword} {name} = {value};"));
                        if ty.is_heap() {
                            self.write_line(&format!("defer runtime.decref({name}, allocator);"));
                        }
                    } else {
                        if ty.is_heap() {
                            self.write_line(&format!("runtime.decref({name}, allocator);"));
                        }
                        self.write_line(&format!("{name} = {value};"));
                    }
                }
                AssignTarget::Attribute { value: recv, attr, .. } => {
                    let recv_rendered = self.emit_expr(recv, symbols)?;
                    self.write_line(&format!("{recv_rendered}.{attr} = {value};"));
                }
                AssignTarget::Tuple(targets, _) => {
                    let temp = self.fresh_temp();
                    self.write_line(&format!("const {temp} = {value};"));
                    for (i, inner) in targets.iter().enumerate() {
                        if let AssignTarget::Name(name, _) = inner {
                            let binding = symbols.get(name.as_ref());
                            let ty = binding.map_or(Type::PyObject, |b| b.ty.clone());
                            let reassigned = binding.is_some_and(|b| b.reassigned);
                            if self.declared.insert(name.clone()) {
                                let keyword = if reassigned { "var" } else { "const" };
                                self.write_line(&format!("{keyword} {name} = {temp}[{i}];"));
                                if ty.is_heap() {
                                    self.write_line(&format!("defer runtime.decref({name}, allocator);"));
                                }
                            } else {
                                if ty.is_heap() {
                                    self.write_line(&format!("runtime.decref({name}, allocator);"));
                                }
                                self.write_line(&format!("{name} = {temp}[{i}];"));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_if(&mut self, if_stmt: &If, symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        let test = self.emit_expr(&if_stmt.test, symbols)?;
        self.write_line(&format!("if ({test}) {{"));
        self.indent += 1;
        for stmt in &if_stmt.body {
            self.emit_stmt(stmt, symbols)?;
        }
        self.indent -= 1;
        if if_stmt.orelse.is_empty() {
            self.write_line("}");
        } else {
            self.write_line("} else {");
            self.indent += 1;
            for stmt in &if_stmt.orelse {
                self.emit_stmt(stmt, symbols)?;
            }
            self.indent -= 1;
            self.write_line("}");
        }
        Ok(())
    }

    fn emit_while(&mut self, while_stmt: &While, symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        let test = self.emit_expr(&while_stmt.test, symbols)?;
        self.write_line(&format!("while ({test}) {{"));
        self.indent += 1;
        for stmt in &while_stmt.body {
            self.emit_stmt(stmt, symbols)?;
        }
        self.indent -= 1;
        self.write_line("}");
        Ok(())
    }

    /// `for` lowering by iterable shape, spec.md §4.4.2. Anything other
    /// than `range`/`enumerate`/`zip` is rejected.
    fn emit_for(&mut self, for_stmt: &For, symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        let Expr::Call { func, args } = &for_stmt.iter else {
            return Err(EmitError::UnsupportedForLoop { span: for_stmt.span });
        };
        let Expr::Name(callee, _) = func.as_ref() else {
            return Err(EmitError::UnsupportedForLoop { span: for_stmt.span });
        };

        match callee.as_ref() {
            "range" => self.emit_for_range(for_stmt, args, symbols),
            "enumerate" => self.emit_for_enumerate(for_stmt, args, symbols),
            "zip" => self.emit_for_zip(for_stmt, args, symbols),
            _ => Err(EmitError::UnsupportedForLoop { span: for_stmt.span }),
        }
    }

    fn emit_for_range(&mut self, for_stmt: &For, args: &[Expr], symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        if args.is_empty() || args.len() > 3 {
            return Err(EmitError::InvalidRangeArgs { span: for_stmt.span });
        }
        let (start, end, step) = match args {
            [end] => ("0".to_owned(), self.emit_expr(end, symbols)?, "1".to_owned()),
            [start, end] => (self.emit_expr(start, symbols)?, self.emit_expr(end, symbols)?, "1".to_owned()),
            [start, end, step] => {
                (self.emit_expr(start, symbols)?, self.emit_expr(end, symbols)?, self.emit_expr(step, symbols)?)
            }
            _ => return Err(EmitError::InvalidRangeArgs { span: for_stmt.span }),
        };
        let ForTarget::Name(var) = &for_stmt.target else {
            return Err(EmitError::UnsupportedForLoop { span: for_stmt.span });
        };
        self.write_line(&format!("var {var}: i64 = {start};"));
        self.write_line(&format!("while ({var} < {end}) : ({var} += {step}) {{"));
        self.indent += 1;
        for stmt in &for_stmt.body {
            self.emit_stmt(stmt, symbols)?;
        }
        self.indent -= 1;
        self.write_line("}");
        Ok(())
    }

    fn emit_for_enumerate(&mut self, for_stmt: &For, args: &[Expr], symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        let [list_expr] = args else { return Err(EmitError::UnsupportedForLoop { span: for_stmt.span }) };
        let ForTarget::Tuple(names) = &for_stmt.target else {
            return Err(EmitError::InvalidEnumerateTarget { span: for_stmt.span });
        };
        if names.len() != 2 {
            return Err(EmitError::InvalidEnumerateTarget { span: for_stmt.span });
        }
        let list = self.emit_expr(list_expr, symbols)?;
        let (idx_name, value_name) = (&names[0], &names[1]);
        self.write_line(&format!("for ({list}.items, 0..) |{value_name}, {idx_name}| {{"));
        self.indent += 1;
        for stmt in &for_stmt.body {
            self.emit_stmt(stmt, symbols)?;
        }
        self.indent -= 1;
        self.write_line("}");
        Ok(())
    }

    fn emit_for_zip(&mut self, for_stmt: &For, args: &[Expr], symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        let ForTarget::Tuple(names) = &for_stmt.target else {
            return Err(EmitError::InvalidZipTarget { span: for_stmt.span });
        };
        if names.len() != args.len() {
            return Err(EmitError::InvalidZipTarget { span: for_stmt.span });
        }
        let lists: Vec<String> = args.iter().map(|a| self.emit_expr(a, symbols)).collect::<Result<_, _>>()?;

        // Zig's `for` only accepts slices/arrays/ranges directly, not an
        // arbitrary iterator type, and panics on mismatched lengths when
        // given multiple sequences at once. So the minimum-length
        // semantics (spec.md §4.4.2, §8 "zip stops at the shortest") are
        // lowered to an explicit bounded index loop instead.
        let idx = self.fresh_temp();
        let lens: Vec<String> = lists.iter().map(|l| format!("{l}.items.len")).collect();
        let bound = if lens.len() == 1 { lens[0].clone() } else { format!("@min({})", lens.join(", ")) };
        self.write_line(&format!("var {idx}: usize = 0;"));
        self.write_line(&format!("while ({idx} < {bound}) : ({idx} += 1) {{"));
        self.indent += 1;
        for (list, name) in lists.iter().zip(names) {
            self.write_line(&format!("const {name} = {list}.items[{idx}];"));
        }
        for stmt in &for_stmt.body {
            self.emit_stmt(stmt, symbols)?;
        }
        self.indent -= 1;
        self.write_line("}");
        Ok(())
    }

    fn emit_return(&mut self, ret: &crate::ast::Return, symbols: &crate::symbols::SymbolTable) -> Result<(), EmitError> {
        match &ret.value {
            Some(value) => {
                let rendered = self.emit_expr(value, symbols)?;
                self.write_line(&format!("return {rendered};"));
            }
            None => self.write_line("return;"),
        }
        Ok(())
    }

    // ---- expressions -----------------------------------------------------

    /// Lowers one expression to a Zig source snippet (spec.md §4.4.3).
    /// Arithmetic/comparison on plain integers use native operators;
    /// anything touching a heap value goes through a runtime call.
    fn emit_expr(&mut self, expr: &Expr, symbols: &crate::symbols::SymbolTable) -> Result<String, EmitError> {
        Ok(match expr {
            Expr::Constant(Constant::Int(value), _) => value.to_string(),
            Expr::Constant(Constant::Float(value), _) => value.to_string(),
            Expr::Constant(Constant::Bool(value), _) => value.to_string(),
            Expr::Constant(Constant::None, _) => "runtime.PyNone".to_owned(),
            Expr::Constant(Constant::Str(value), _) => format!("runtime.pyStringLiteral({value:?})"),
            Expr::Name(name, _) => name.to_string(),
            Expr::BinOp { op, left, right, .. } => self.emit_binop(*op, left, right, symbols)?,
            Expr::UnaryOp { op, operand, .. } => {
                let rendered = self.emit_expr(operand, symbols)?;
                match op {
                    UnaryOperator::Plus => rendered,
                    UnaryOperator::Minus => format!("-{rendered}"),
                    UnaryOperator::Not => format!("!{rendered}"),
                    UnaryOperator::Invert => format!("~{rendered}"),
                }
            }
            Expr::BoolOp { op, values, .. } => {
                let parts: Vec<String> = values.iter().map(|v| self.emit_expr(v, symbols)).collect::<Result<_, _>>()?;
                let joiner = match op {
                    crate::ast::BoolOperator::And => " and ",
                    crate::ast::BoolOperator::Or => " or ",
                };
                parts.join(joiner)
            }
            Expr::Compare { left, op, right, .. } => {
                let left_rendered = self.emit_expr(left, symbols)?;
                let right_rendered = self.emit_expr(right, symbols)?;
                let op_text = match op {
                    crate::ast::CmpOperator::Lt => "<",
                    crate::ast::CmpOperator::LtEq => "<=",
                    crate::ast::CmpOperator::Gt => ">",
                    crate::ast::CmpOperator::GtEq => ">=",
                    crate::ast::CmpOperator::Eq => "==",
                    crate::ast::CmpOperator::NotEq => "!=",
                    crate::ast::CmpOperator::In => return Ok(format!("runtime.contains({right_rendered}, {left_rendered})")),
                    crate::ast::CmpOperator::Is => "==",
                };
                format!("({left_rendered} {op_text} {right_rendered})")
            }
            Expr::Call { func, args } => self.emit_call(func, args, symbols)?,
            Expr::Attribute { value, attr, .. } => {
                let rendered = self.emit_expr(value, symbols)?;
                format!("{rendered}.{attr}")
            }
            Expr::Subscript { value, index, .. } => {
                let rendered = self.emit_expr(value, symbols)?;
                let idx_rendered = self.emit_expr(index, symbols)?;
                format!("try runtime.getItem({rendered}, {idx_rendered})")
            }
            Expr::List(items, _) => {
                let rendered: Vec<String> = items.iter().map(|i| self.emit_expr(i, symbols)).collect::<Result<_, _>>()?;
                format!("try runtime.pyListFromSlice(allocator, &.{{ {} }})", rendered.join(", "))
            }
            Expr::Tuple(items, _) => {
                let rendered: Vec<String> = items.iter().map(|i| self.emit_expr(i, symbols)).collect::<Result<_, _>>()?;
                format!(".{{ {} }}", rendered.join(", "))
            }
            Expr::Dict(items, _) => {
                let mut rendered = Vec::new();
                for (k, v) in items {
                    let key = self.emit_expr(k, symbols)?;
                    let value = self.emit_expr(v, symbols)?;
                    rendered.push(format!(".{{ .key = {key}, .value = {value} }}"));
                }
                format!("try runtime.pyDictFromPairs(allocator, &.{{ {} }})", rendered.join(", "))
            }
            Expr::IfExp { test, body, orelse, .. } => {
                let test_rendered = self.emit_expr(test, symbols)?;
                let body_rendered = self.emit_expr(body, symbols)?;
                let orelse_rendered = self.emit_expr(orelse, symbols)?;
                format!("if ({test_rendered}) {body_rendered} else {orelse_rendered}")
            }
        })
    }

    fn emit_binop(&mut self, op: Operator, left: &Expr, right: &Expr, symbols: &crate::symbols::SymbolTable) -> Result<String, EmitError> {
        let left_rendered = self.emit_expr(left, symbols)?;
        let right_rendered = self.emit_expr(right, symbols)?;
        if op == Operator::Add && (left.is_add() || right.is_add() || is_string_expr(left, symbols) || is_string_expr(right, symbols)) {
            return Ok(format!("try runtime.stringConcat(allocator, {left_rendered}, {right_rendered})"));
        }
        let op_text = match op {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::FloorDiv => "@divFloor",
            Operator::Mod => "%",
            Operator::Pow => return Ok(format!("std.math.pow(i64, {left_rendered}, {right_rendered})")),
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
        };
        if op == Operator::FloorDiv {
            return Ok(format!("@divFloor({left_rendered}, {right_rendered})"));
        }
        Ok(format!("({left_rendered} {op_text} {right_rendered})"))
    }

    /// Built-ins and module emulation, spec.md §4.4.7.
    fn emit_call(&mut self, func: &Expr, args: &[Expr], symbols: &crate::symbols::SymbolTable) -> Result<String, EmitError> {
        if let Expr::Name(name, _) = func {
            match name.as_ref() {
                "print" => {
                    let rendered: Vec<String> = args.iter().map(|a| self.emit_expr(a, symbols)).collect::<Result<_, _>>()?;
                    return Ok(format!("runtime.print(.{{ {} }})", rendered.join(", ")));
                }
                "len" => {
                    let rendered = self.emit_expr(&args[0], symbols)?;
                    return Ok(format!("runtime.len({rendered})"));
                }
                _ => {}
            }
        }
        if let Expr::Attribute { value, attr, .. } = func {
            if let Expr::Name(module_name, _) = value.as_ref() {
                if module_name.as_ref() == "json" && attr.as_ref() == "loads" {
                    return self.emit_json_loads(&args[0], symbols);
                }
                if module_name.as_ref() == "json" && attr.as_ref() == "dumps" {
                    let rendered = self.emit_expr(&args[0], symbols)?;
                    return Ok(format!("try runtime.jsonDumps({rendered}, allocator)"));
                }
                if module_name.as_ref() == "http" && attr.as_ref() == "get" {
                    let rendered = self.emit_expr(&args[0], symbols)?;
                    return Ok(format!("try runtime.httpGet(allocator, {rendered})"));
                }
            }
            let recv = self.emit_expr(value, symbols)?;
            let rendered_args: Vec<String> = args.iter().map(|a| self.emit_expr(a, symbols)).collect::<Result<_, _>>()?;
            let mut call_args = vec![recv.clone()];
            call_args.extend(rendered_args);
            let fallible = if method_is_fallible(attr) { "try " } else { "" };
            return Ok(format!("{fallible}runtime.{}({})", method_runtime_name(attr), call_args.join(", ")));
        }

        let rendered_func = self.emit_expr(func, symbols)?;
        let rendered_args: Vec<String> = args.iter().map(|a| self.emit_expr(a, symbols)).collect::<Result<_, _>>()?;
        let needs_try = matches!(func, Expr::Name(name, _) if self.analysis.functions.get(name.as_ref()).is_some_and(|f| f.needs_allocator || f.return_type == Type::PyObject));
        let mut all_args = rendered_args;
        if matches!(func, Expr::Name(name, _) if self.analysis.functions.get(name.as_ref()).is_some_and(|f| f.needs_allocator)) {
            all_args.push("allocator".to_owned());
        }
        Ok(format!("{}{rendered_func}({})", if needs_try { "try " } else { "" }, all_args.join(", ")))
    }

    /// `json.loads` on a literal string is memoised per spec.md §4.4.7: the
    /// first occurrence of a given literal registers a nullable preamble
    /// slot, later occurrences of the *same* literal text reuse it under a
    /// check-else-parse-else-store protocol.
    fn emit_json_loads(&mut self, arg: &Expr, symbols: &crate::symbols::SymbolTable) -> Result<String, EmitError> {
        let Expr::Constant(Constant::Str(literal), _) = arg else {
            let rendered = self.emit_expr(arg, symbols)?;
            return Ok(format!("try runtime.jsonLoads({rendered}, allocator)"));
        };
        let slot = if let Some(existing) = self.json_cache.get(literal) {
            existing.clone()
        } else {
            let slot: Box<str> = format!("__json_cache_{}", self.json_cache.len()).into();
            let _ = writeln!(self.preamble, "var {slot}: ?runtime.PyObject = null;");
            self.json_cache.insert(literal.clone(), slot.clone());
            slot
        };
        Ok(format!(
            "(if ({slot}) |cached| blk: {{ runtime.incref(cached); break :blk cached; }} else blk: {{ \
             const parsed = try runtime.jsonLoads({literal:?}, allocator); {slot} = parsed; break :blk parsed; }})"
        ))
    }
}

fn is_string_expr(expr: &Expr, symbols: &crate::symbols::SymbolTable) -> bool {
    match expr {
        Expr::Constant(Constant::Str(_), _) => true,
        Expr::Name(name, _) => symbols.type_of(name) == Type::Str,
        _ => false,
    }
}

/// Maps a coarse `Type` tag to its Zig representation (spec.md §4.5's
/// runtime variants).
fn zig_type(ty: &Type) -> String {
    match ty {
        Type::Int => "i64".to_owned(),
        Type::Float => "f64".to_owned(),
        Type::Bool => "bool".to_owned(),
        Type::Str => "runtime.PyString".to_owned(),
        Type::List => "runtime.PyList".to_owned(),
        Type::Dict => "runtime.PyDict".to_owned(),
        Type::Tuple => "runtime.PyTuple".to_owned(),
        Type::PyObject => "runtime.PyObject".to_owned(),
        Type::Class(name) => name.to_string(),
        Type::Void => "void".to_owned(),
    }
}

/// Fixed dispatch table for method calls on built-in types (spec.md
/// §4.4.3, §4.5): every runtime helper is named `<method>` verbatim except
/// where Zig reserves the identifier.
fn method_runtime_name(attr: &str) -> &str {
    match attr {
        "str" => "toStr",
        other => other,
    }
}

/// Methods whose runtime wrapper returns a plain value rather than an
/// error union, so no `try` is emitted at the call site (spec.md
/// §4.4.3's "fallible return channel" only applies where the runtime
/// actually allocates or can fail).
fn method_is_fallible(attr: &str) -> bool {
    !matches!(
        attr,
        "startswith" | "endswith" | "isdigit" | "isalpha" | "find" | "count" | "pop" | "reverse" | "clear" | "get"
    )
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Collects `self.<field> = <value>` assignments from `__init__`'s body in
/// first-seen order, rendering each value expression as plain text (used
/// only for simple constructors; the supported subset's `__init__` bodies
/// are flat assignment sequences per spec.md §4.4.5).
fn collect_field_assignments(body: &[Stmt]) -> Vec<(Box<str>, String)> {
    let mut out = Vec::new();
    for stmt in body {
        if let Stmt::Assign(crate::ast::Assign { targets, value, .. }) = stmt {
            for target in targets {
                if let AssignTarget::Attribute { value: recv, attr, .. } = target {
                    if matches!(recv.as_ref(), Expr::Name(n, _) if n.as_ref() == "self") {
                        out.push((attr.clone(), render_plain(value)));
                    }
                }
            }
        }
    }
    out
}

/// A small, allocator-free expression renderer used only for field
/// initializers (which in the supported subset are always a parameter
/// name or an integer literal — spec.md §4.4.5's fields are all `i64`).
fn render_plain(expr: &Expr) -> String {
    match expr {
        Expr::Constant(Constant::Int(value), _) => value.to_string(),
        Expr::Name(name, _) => name.to_string(),
        Expr::UnaryOp { op: UnaryOperator::Minus, operand, .. } => format!("-{}", render_plain(operand)),
        _ => "0".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn emit_src(src: &str) -> String {
        let module = parse(tokenize(src).unwrap()).unwrap();
        let analysis = analyze(&module);
        emit(&module, &analysis).unwrap()
    }

    #[test]
    fn simple_function_emits_signature() {
        let out = emit_src("def f(n):\n    return n\n");
        assert!(out.contains("pub fn f(n: i64) i64 {"));
    }

    #[test]
    fn range_loop_lowers_to_while() {
        let out = emit_src("for i in range(3):\n    print(i)\n");
        assert!(out.contains("var i: i64 = 0;"));
        assert!(out.contains("while (i < 3) : (i += 1) {"));
    }

    #[test]
    fn unsupported_for_loop_rejected() {
        let module = parse(tokenize("for x in things:\n    pass\n").unwrap()).unwrap();
        let analysis = analyze(&module);
        assert!(matches!(emit(&module, &analysis), Err(EmitError::UnsupportedForLoop { .. })));
    }

    #[test]
    fn unsupported_import_rejected() {
        let module = parse(tokenize("import os\n").unwrap()).unwrap();
        let analysis = analyze(&module);
        assert!(matches!(emit(&module, &analysis), Err(EmitError::UnsupportedImport { .. })));
    }

    #[test]
    fn class_emits_struct_with_init() {
        let out = emit_src("class C:\n    def __init__(self, x):\n        self.x = x\n");
        assert!(out.contains("pub const C = struct {"));
        assert!(out.contains("x: i64,"));
        assert!(out.contains("pub fn init(x: i64) C {"));
    }
}
