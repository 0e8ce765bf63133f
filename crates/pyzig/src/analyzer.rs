//! Type/shape analyzer (spec.md §4.3).
//!
//! Two sweeps per function (and one module-level pass for top-level code):
//! Sweep 1 walks every `Assign` to build the reassignment-aware symbol
//! table, Sweep 2 re-walks to pin each name's coarse tag. Parameter and
//! return inference, plus the allocator-need fixed point, run afterwards
//! since they need the whole call graph.

use indexmap::IndexMap;

use crate::ast::{
    Assign, AssignTarget, ClassDef, Constant, Expr, For, FunctionDef, If, Module, Operator, Stmt, While,
};
use crate::symbols::{SymbolTable, Type};

/// String-returning method names from spec.md §4.3 rule 5.
const STRING_METHODS: &[&str] =
    &["upper", "lower", "strip", "lstrip", "rstrip", "replace", "capitalize", "title", "swapcase", "center", "join"];
const LIST_METHODS: &[&str] = &["copy", "reversed", "split"];
const INT_METHODS: &[&str] = &["count", "index", "find"];

#[derive(Debug, Clone)]
pub struct FunctionMeta {
    pub name: Box<str>,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub needs_allocator: bool,
    pub symbols: SymbolTable,
    pub is_async: bool,
    pub is_method: bool,
}

#[derive(Debug, Clone)]
pub struct ClassMeta {
    pub name: Box<str>,
    /// Instance fields inferred from `self.<name> = ...` in `__init__`,
    /// in first-seen order (spec.md §4.4.5).
    pub fields: Vec<Box<str>>,
    pub methods: Vec<FunctionMeta>,
}

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub module_symbols: SymbolTable,
    pub functions: IndexMap<Box<str>, FunctionMeta>,
    pub classes: IndexMap<Box<str>, ClassMeta>,
}

pub fn analyze(module: &Module) -> Analysis {
    let mut analysis = Analysis::default();

    // Module-level classes and functions are registered first so that
    // forward references (a function calling one defined later) resolve
    // during the call-graph fixed point below.
    let mut known_classes: IndexMap<Box<str>, ()> = IndexMap::new();
    for stmt in &module.body {
        if let Stmt::ClassDef(class) = stmt {
            known_classes.insert(class.name.clone(), ());
        }
    }

    for stmt in &module.body {
        match stmt {
            Stmt::FunctionDef(func) => {
                let meta = analyze_function(func, &known_classes, false);
                analysis.functions.insert(func.name.clone(), meta);
            }
            Stmt::ClassDef(class) => {
                let meta = analyze_class(class, &known_classes);
                analysis.classes.insert(class.name.clone(), meta);
            }
            _ => {}
        }
    }

    analyze_module_body(&module.body, &known_classes, &mut analysis.module_symbols);

    resolve_allocator_need(module, &mut analysis);
    analysis
}

/// Sweep 1 + Sweep 2 combined over module-level statements outside any
/// function or class (assignments, bare expressions, control flow).
fn analyze_module_body(body: &[Stmt], known_classes: &IndexMap<Box<str>, ()>, symbols: &mut SymbolTable) {
    for stmt in body {
        walk_stmt_for_types(stmt, known_classes, symbols);
    }
}

fn walk_stmt_for_types(stmt: &Stmt, known_classes: &IndexMap<Box<str>, ()>, symbols: &mut SymbolTable) {
    match stmt {
        Stmt::Assign(assign) => bind_assign(assign, known_classes, symbols),
        Stmt::If(if_stmt) => {
            for s in &if_stmt.body {
                walk_stmt_for_types(s, known_classes, symbols);
            }
            for s in &if_stmt.orelse {
                walk_stmt_for_types(s, known_classes, symbols);
            }
        }
        Stmt::While(while_stmt) => {
            for s in &while_stmt.body {
                walk_stmt_for_types(s, known_classes, symbols);
            }
        }
        Stmt::For(for_stmt) => {
            symbols.bind(for_loop_name(&for_stmt.target), Type::PyObject);
            for s in &for_stmt.body {
                walk_stmt_for_types(s, known_classes, symbols);
            }
        }
        Stmt::FunctionDef(_) | Stmt::ClassDef(_) | Stmt::Return(_) | Stmt::ExprStmt(_) | Stmt::Import(_)
        | Stmt::ImportFrom(_) | Stmt::Pass(_) => {}
    }
}

fn for_loop_name(target: &crate::ast::ForTarget) -> Box<str> {
    match target {
        crate::ast::ForTarget::Name(name) => name.clone(),
        crate::ast::ForTarget::Tuple(names) => names.first().cloned().unwrap_or_default(),
    }
}

fn bind_assign(assign: &Assign, known_classes: &IndexMap<Box<str>, ()>, symbols: &mut SymbolTable) {
    let ty = infer_expr_type(&assign.value, known_classes, symbols);
    for target in &assign.targets {
        bind_target(target, ty.clone(), symbols);
    }
}

fn bind_target(target: &AssignTarget, ty: Type, symbols: &mut SymbolTable) {
    match target {
        AssignTarget::Name(name, _) => symbols.bind(name.clone(), ty),
        AssignTarget::Attribute { .. } => {}
        AssignTarget::Tuple(targets, _) => {
            for t in targets {
                bind_target(t, Type::PyObject, symbols);
            }
        }
    }
}

/// Sweep 2, spec.md §4.3 rules 1-7, applied in order; the first matching
/// rule wins.
fn infer_expr_type(expr: &Expr, known_classes: &IndexMap<Box<str>, ()>, symbols: &SymbolTable) -> Type {
    match expr {
        Expr::Constant(Constant::Int(_), _) => Type::Int,
        Expr::Constant(Constant::Str(_), _) => Type::Str,
        Expr::Constant(Constant::Bool(_), _) => Type::Bool,
        Expr::Constant(Constant::Float(_), _) => Type::Float,
        Expr::Constant(Constant::None, _) => Type::PyObject,
        Expr::List(_, _) => Type::List,
        Expr::Dict(_, _) => Type::Dict,
        Expr::Tuple(_, _) => Type::Tuple,
        Expr::Name(name, _) => {
            if known_classes.contains_key(name.as_ref()) {
                return Type::Class(name.clone());
            }
            symbols.type_of(name)
        }
        Expr::BinOp { op, left, right, .. } if *op == Operator::Add => {
            if is_stringy(left, known_classes, symbols) || is_stringy(right, known_classes, symbols) {
                Type::Str
            } else {
                Type::Int
            }
        }
        Expr::BinOp { .. } => Type::Int,
        Expr::Call { func, .. } => infer_call_type(func, known_classes, symbols),
        Expr::Subscript { .. } => Type::PyObject,
        _ => Type::PyObject,
    }
}

/// Rule 4's over-approximation (spec.md §9 Open Question): an operand
/// counts as "stringy" if it is itself tagged `string`, or is a nested
/// `Add` at all (regardless of what that nested `Add` actually produces).
fn is_stringy(expr: &Expr, known_classes: &IndexMap<Box<str>, ()>, symbols: &SymbolTable) -> bool {
    expr.is_add() || infer_expr_type(expr, known_classes, symbols) == Type::Str
}

fn infer_call_type(func: &Expr, known_classes: &IndexMap<Box<str>, ()>, symbols: &SymbolTable) -> Type {
    match func {
        Expr::Name(name, _) if known_classes.contains_key(name.as_ref()) => Type::Class(name.clone()),
        Expr::Attribute { attr, .. } => {
            let attr = attr.as_ref();
            if STRING_METHODS.contains(&attr) {
                Type::Str
            } else if LIST_METHODS.contains(&attr) {
                Type::List
            } else if INT_METHODS.contains(&attr) {
                Type::Int
            } else {
                Type::PyObject
            }
        }
        _ => Type::PyObject,
    }
}

fn analyze_function(func: &FunctionDef, known_classes: &IndexMap<Box<str>, ()>, is_method: bool) -> FunctionMeta {
    let mut symbols = SymbolTable::new();
    for param in &func.params {
        symbols.bind(param.name.clone(), infer_param_type(func, param.name.as_ref()));
    }
    for stmt in &func.body {
        walk_stmt_for_types(stmt, known_classes, &mut symbols);
    }

    let param_types = func.params.iter().map(|p| symbols.type_of(p.name.as_ref())).collect();
    let return_type = infer_return_type(&func.body, known_classes, &symbols);

    FunctionMeta {
        name: func.name.clone(),
        param_types,
        return_type,
        // Filled in by `resolve_allocator_need` once the whole call graph
        // is known; starts conservatively false.
        needs_allocator: false,
        symbols,
        is_async: func.is_async,
        is_method,
    }
}

/// Function-level parameter inference, spec.md §4.3: a parameter is
/// `pyobject` if it is ever the left operand of a string-containing `Add`,
/// the receiver of an attribute access, the subscripted value, or an
/// argument to `len`; otherwise `int`.
fn infer_param_type(func: &FunctionDef, param: &str) -> Type {
    if scan_stmts_for_pyobject_use(&func.body, param) { Type::PyObject } else { Type::Int }
}

fn scan_stmts_for_pyobject_use(body: &[Stmt], name: &str) -> bool {
    body.iter().any(|stmt| scan_stmt_for_pyobject_use(stmt, name))
}

fn scan_stmt_for_pyobject_use(stmt: &Stmt, name: &str) -> bool {
    match stmt {
        Stmt::Assign(assign) => scan_expr_for_pyobject_use(&assign.value, name),
        Stmt::ExprStmt(expr_stmt) => scan_expr_for_pyobject_use(&expr_stmt.value, name),
        Stmt::Return(ret) => ret.value.as_ref().is_some_and(|v| scan_expr_for_pyobject_use(v, name)),
        Stmt::If(if_stmt) => {
            scan_expr_for_pyobject_use(&if_stmt.test, name)
                || scan_stmts_for_pyobject_use(&if_stmt.body, name)
                || scan_stmts_for_pyobject_use(&if_stmt.orelse, name)
        }
        Stmt::While(while_stmt) => {
            scan_expr_for_pyobject_use(&while_stmt.test, name) || scan_stmts_for_pyobject_use(&while_stmt.body, name)
        }
        Stmt::For(for_stmt) => {
            scan_expr_for_pyobject_use(&for_stmt.iter, name) || scan_stmts_for_pyobject_use(&for_stmt.body, name)
        }
        Stmt::FunctionDef(_) | Stmt::ClassDef(_) | Stmt::Import(_) | Stmt::ImportFrom(_) | Stmt::Pass(_) => false,
    }
}

fn scan_expr_for_pyobject_use(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::BinOp { op: Operator::Add, left, right, .. } => {
            let left_is_name = matches!(left.as_ref(), Expr::Name(n, _) if n.as_ref() == name);
            (left_is_name && contains_string_literal(right)) || scan_expr_for_pyobject_use(left, name) || scan_expr_for_pyobject_use(right, name)
        }
        Expr::BinOp { left, right, .. } => scan_expr_for_pyobject_use(left, name) || scan_expr_for_pyobject_use(right, name),
        Expr::Attribute { value, .. } => {
            matches!(value.as_ref(), Expr::Name(n, _) if n.as_ref() == name) || scan_expr_for_pyobject_use(value, name)
        }
        Expr::Subscript { value, index, .. } => {
            matches!(value.as_ref(), Expr::Name(n, _) if n.as_ref() == name)
                || scan_expr_for_pyobject_use(value, name)
                || scan_expr_for_pyobject_use(index, name)
        }
        Expr::Call { func, args } => {
            let is_len_call = matches!(func.as_ref(), Expr::Name(n, _) if n.as_ref() == "len")
                && args.iter().any(|a| matches!(a, Expr::Name(n, _) if n.as_ref() == name));
            is_len_call
                || scan_expr_for_pyobject_use(func, name)
                || args.iter().any(|a| scan_expr_for_pyobject_use(a, name))
        }
        Expr::UnaryOp { operand, .. } => scan_expr_for_pyobject_use(operand, name),
        Expr::BoolOp { values, .. } => values.iter().any(|v| scan_expr_for_pyobject_use(v, name)),
        Expr::Compare { left, right, .. } => {
            scan_expr_for_pyobject_use(left, name) || scan_expr_for_pyobject_use(right, name)
        }
        Expr::List(items, _) | Expr::Tuple(items, _) => items.iter().any(|i| scan_expr_for_pyobject_use(i, name)),
        Expr::Dict(items, _) => items.iter().any(|(k, v)| scan_expr_for_pyobject_use(k, name) || scan_expr_for_pyobject_use(v, name)),
        Expr::IfExp { test, body, orelse, .. } => {
            scan_expr_for_pyobject_use(test, name) || scan_expr_for_pyobject_use(body, name) || scan_expr_for_pyobject_use(orelse, name)
        }
        Expr::Constant(_, _) | Expr::Name(_, _) => false,
    }
}

fn contains_string_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(Constant::Str(_), _) => true,
        Expr::BinOp { left, right, .. } => contains_string_literal(left) || contains_string_literal(right),
        _ => false,
    }
}

/// Function-level return inference, spec.md §4.3: each `Return` is tagged
/// individually, then the most general tag wins (`pyobject` > `int` >
/// `void`); no reachable `Return` means `void`.
fn infer_return_type(body: &[Stmt], known_classes: &IndexMap<Box<str>, ()>, symbols: &SymbolTable) -> Type {
    let mut seen = Vec::new();
    collect_return_types(body, known_classes, symbols, &mut seen);
    if seen.is_empty() {
        return Type::Void;
    }
    if seen.iter().any(|t| *t != Type::Int) {
        return Type::PyObject;
    }
    Type::Int
}

fn collect_return_types(body: &[Stmt], known_classes: &IndexMap<Box<str>, ()>, symbols: &SymbolTable, out: &mut Vec<Type>) {
    for stmt in body {
        match stmt {
            Stmt::Return(ret) => {
                let ty = ret.value.as_ref().map_or(Type::Void, |v| infer_expr_type(v, known_classes, symbols));
                out.push(ty);
            }
            Stmt::If(If { body, orelse, .. }) => {
                collect_return_types(body, known_classes, symbols, out);
                collect_return_types(orelse, known_classes, symbols, out);
            }
            Stmt::While(While { body, .. }) | Stmt::For(For { body, .. }) => {
                collect_return_types(body, known_classes, symbols, out);
            }
            Stmt::FunctionDef(_) | Stmt::ClassDef(_) | Stmt::Assign(_) | Stmt::ExprStmt(_) | Stmt::Import(_)
            | Stmt::ImportFrom(_) | Stmt::Pass(_) => {}
        }
    }
}

fn analyze_class(class: &ClassDef, known_classes: &IndexMap<Box<str>, ()>) -> ClassMeta {
    let mut fields = Vec::new();
    if let Some(init) = class.methods.iter().find(|m| m.name.as_ref() == "__init__") {
        collect_self_fields(&init.body, &mut fields);
    }

    let methods = class
        .methods
        .iter()
        .map(|method| analyze_function(method, known_classes, true))
        .collect();

    ClassMeta { name: class.name.clone(), fields, methods }
}

/// Walks `__init__`'s body (no nested control flow needed: the supported
/// subset only looks for top-level `self.<name> = <value>` assignments,
/// spec.md §4.4.5) collecting field names in first-seen order.
fn collect_self_fields(body: &[Stmt], fields: &mut Vec<Box<str>>) {
    for stmt in body {
        if let Stmt::Assign(Assign { targets, .. }) = stmt {
            for target in targets {
                if let AssignTarget::Attribute { value, attr, .. } = target {
                    if matches!(value.as_ref(), Expr::Name(n, _) if n.as_ref() == "self") && !fields.contains(attr) {
                        fields.push(attr.clone());
                    }
                }
            }
        }
    }
}

/// Allocator-need fixed-point iteration over the call graph (spec.md
/// §4.3): a function needs an allocator if its body contains a string or
/// collection literal, a `Subscript`, a call to `len`, a string-producing
/// `Add`, or a call to another function that needs an allocator.
/// Unresolved callees (built-ins, methods, anything not in
/// `analysis.functions`) are treated as not-needing, matching the spec's
/// explicit fallback. Iterates to a fixed point since a callee's flag may
/// only be known after its own callees are resolved.
fn resolve_allocator_need(module: &Module, analysis: &mut Analysis) {
    let bodies: IndexMap<Box<str>, &[Stmt]> = module
        .body
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::FunctionDef(func) => Some((func.name.clone(), func.body.as_slice())),
            _ => None,
        })
        .collect();

    loop {
        let mut changed = false;
        let names: Vec<Box<str>> = analysis.functions.keys().cloned().collect();
        for name in &names {
            let Some(body) = bodies.get(name) else { continue };
            let needs = body.iter().any(|s| stmt_needs_allocator(s, analysis));
            let meta = analysis.functions.get_mut(name).expect("name came from keys()");
            if needs != meta.needs_allocator {
                meta.needs_allocator = needs;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for class in analysis.classes.values_mut() {
        for method in &mut class.methods {
            // Class methods are never fallible (spec.md §4.4.6): the
            // allocator-need flag is left false regardless of body
            // content.
            method.needs_allocator = false;
        }
    }
}

fn stmt_needs_allocator(stmt: &Stmt, analysis: &Analysis) -> bool {
    match stmt {
        Stmt::Assign(assign) => expr_needs_allocator(&assign.value, analysis),
        Stmt::ExprStmt(expr_stmt) => expr_needs_allocator(&expr_stmt.value, analysis),
        Stmt::Return(ret) => ret.value.as_ref().is_some_and(|v| expr_needs_allocator(v, analysis)),
        Stmt::If(if_stmt) => {
            expr_needs_allocator(&if_stmt.test, analysis)
                || if_stmt.body.iter().any(|s| stmt_needs_allocator(s, analysis))
                || if_stmt.orelse.iter().any(|s| stmt_needs_allocator(s, analysis))
        }
        Stmt::While(while_stmt) => {
            expr_needs_allocator(&while_stmt.test, analysis)
                || while_stmt.body.iter().any(|s| stmt_needs_allocator(s, analysis))
        }
        Stmt::For(for_stmt) => {
            expr_needs_allocator(&for_stmt.iter, analysis)
                || for_stmt.body.iter().any(|s| stmt_needs_allocator(s, analysis))
        }
        Stmt::FunctionDef(_) | Stmt::ClassDef(_) | Stmt::Import(_) | Stmt::ImportFrom(_) | Stmt::Pass(_) => false,
    }
}

fn expr_needs_allocator(expr: &Expr, analysis: &Analysis) -> bool {
    match expr {
        Expr::Constant(Constant::Str(_), _) | Expr::List(_, _) | Expr::Dict(_, _) | Expr::Tuple(_, _) => true,
        Expr::Subscript { .. } => true,
        Expr::BinOp { op: Operator::Add, left, right, .. } => {
            left.is_add()
                || right.is_add()
                || expr_needs_allocator(left, analysis)
                || expr_needs_allocator(right, analysis)
        }
        Expr::BinOp { left, right, .. } => expr_needs_allocator(left, analysis) || expr_needs_allocator(right, analysis),
        Expr::UnaryOp { operand, .. } => expr_needs_allocator(operand, analysis),
        Expr::BoolOp { values, .. } => values.iter().any(|v| expr_needs_allocator(v, analysis)),
        Expr::Compare { left, right, .. } => expr_needs_allocator(left, analysis) || expr_needs_allocator(right, analysis),
        Expr::Attribute { value, .. } => expr_needs_allocator(value, analysis),
        Expr::IfExp { test, body, orelse, .. } => {
            expr_needs_allocator(test, analysis) || expr_needs_allocator(body, analysis) || expr_needs_allocator(orelse, analysis)
        }
        Expr::Call { func, args } => {
            let is_len = matches!(func.as_ref(), Expr::Name(n, _) if n.as_ref() == "len");
            let callee_needs = match func.as_ref() {
                Expr::Name(n, _) => analysis.functions.get(n.as_ref()).is_some_and(|f| f.needs_allocator),
                _ => false,
            };
            is_len || callee_needs || expr_needs_allocator(func, analysis) || args.iter().any(|a| expr_needs_allocator(a, analysis))
        }
        Expr::Constant(_, _) | Expr::Name(_, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn analyze_src(src: &str) -> Analysis {
        analyze(&parse(tokenize(src).unwrap()).unwrap())
    }

    #[test]
    fn int_literal_assignment() {
        let analysis = analyze_src("x = 1\n");
        assert_eq!(analysis.module_symbols.type_of("x"), Type::Int);
    }

    #[test]
    fn string_concat_is_tagged_string() {
        let analysis = analyze_src("a = \"x\"\nb = a + \"y\"\n");
        assert_eq!(analysis.module_symbols.type_of("b"), Type::Str);
    }

    #[test]
    fn nested_add_over_approximates_to_string() {
        let analysis = analyze_src("a = 1 + 2\nb = a + \"x\"\n");
        assert_eq!(analysis.module_symbols.type_of("b"), Type::Str);
    }

    #[test]
    fn simple_int_param_and_return() {
        let analysis = analyze_src("def f(n):\n    return n\n");
        let meta = &analysis.functions["f"];
        assert_eq!(meta.param_types, vec![Type::Int]);
        assert_eq!(meta.return_type, Type::Int);
    }

    #[test]
    fn string_using_param_is_pyobject() {
        let analysis = analyze_src("def f(s):\n    return s.upper()\n");
        let meta = &analysis.functions["f"];
        assert_eq!(meta.param_types, vec![Type::PyObject]);
    }

    #[test]
    fn class_init_fields_collected_in_order() {
        let analysis = analyze_src("class C:\n    def __init__(self, x):\n        self.x = x\n        self.y = 1\n");
        assert_eq!(analysis.classes["C"].fields, vec![Box::from("x"), Box::from("y")]);
    }
}
