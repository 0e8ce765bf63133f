//! The coarse type model and per-scope symbol tables used by the analyzer
//! (spec.md §4.3).
//!
//! `Type` is deliberately small: it names the handful of runtime shapes the
//! emitter needs to choose a Zig representation for, not a full type
//! lattice. There is no `Option`, no union, no generics — spec.md's
//! inference rules only ever produce one of these ten tags.

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Bool,
    Str,
    List,
    Dict,
    Tuple,
    /// Fallback tag: a value whose shape could not be pinned down by any
    /// inference rule, represented at runtime by the tagged `PyObject`
    /// union rather than an unwrapped native value.
    PyObject,
    Class(Box<str>),
    /// The absence of a return value (bare `return` or fallthrough).
    Void,
}

impl Type {
    /// Whether values of this type are heap-allocated and therefore
    /// refcounted at runtime (spec.md §4.3's allocator-need analysis keys
    /// off this).
    #[must_use]
    pub fn is_heap(&self) -> bool {
        matches!(self, Self::Str | Self::List | Self::Dict | Self::Tuple | Self::PyObject | Self::Class(_))
    }
}

/// A single variable binding within one scope.
#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: Type,
    /// Set once Sweep 1 observes *any* second assignment to this name,
    /// same type or not. A name assigned more than once must be declared
    /// `var` rather than `const` (spec.md §4.4.1); a name additionally
    /// reassigned with a *different* inferred type also widens to
    /// `Type::PyObject` for the whole scope (spec.md §4.3, Sweep 1).
    pub reassigned: bool,
}

/// Bindings visible within one function or module scope. Scopes do not
/// nest for lookup purposes: the supported subset has no closures, so each
/// function analyzes its own flat symbol table (spec.md §4.3 Non-goals).
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    bindings: IndexMap<Box<str>, Binding>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    #[must_use]
    pub fn type_of(&self, name: &str) -> Type {
        self.bindings.get(name).map_or(Type::PyObject, |b| b.ty.clone())
    }

    /// Records an observed assignment. Any second-or-later assignment to
    /// `name` flags it `reassigned` (the emitter declares it `var`); if the
    /// new type also differs from the existing one, both widen to
    /// `Type::PyObject` (spec.md §4.3 Sweep 1's reassignment-conflict
    /// rule).
    pub fn bind(&mut self, name: Box<str>, ty: Type) {
        match self.bindings.get_mut(&name) {
            Some(existing) if existing.ty != ty => {
                existing.ty = Type::PyObject;
                existing.reassigned = true;
            }
            Some(existing) => {
                existing.reassigned = true;
            }
            None => {
                self.bindings.insert(name, Binding { ty, reassigned: false });
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(std::convert::AsRef::as_ref)
    }
}
