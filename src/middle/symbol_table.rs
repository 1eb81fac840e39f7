use std::collections::BTreeSet;

use hashbrown::HashMap;
use strum::Display;

use super::ty::{ResolvedType, TypeName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub ty: ResolvedType,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: ResolvedType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Modifier {
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSymbols {
    pub return_type: ResolvedType,
    pub parameters: Vec<Symbol>,
    pub locals: Vec<Symbol>,
    pub modifiers: BTreeSet<Modifier>,
}

impl MethodSymbols {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &ResolvedType> {
        self.parameters.iter().map(|parameter| &parameter.ty)
    }
}

/// How a name used inside of a method body resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Local,
    /// Zero based position in the parameter list
    Parameter(usize),
    Field,
    /// Simple name of an imported class
    Import,
}

/// Everything declared by a compilation unit. Populated once by the
/// [`SymbolTableBuilder`](super::resolve::SymbolTableBuilder) and read only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Qualified import paths, in declaration order
    imports: Vec<Vec<String>>,
    class_name: String,
    superclass: Option<String>,
    fields: Vec<Symbol>,
    methods: HashMap<String, MethodSymbols>,
    /// Method names in declaration order
    method_order: Vec<String>,
}

impl SymbolTable {
    /// Records an import. Fails if the qualified path or its simple name
    /// has already been imported.
    pub fn add_import(&mut self, path: Vec<String>) -> bool {
        let Some(simple_name) = path.last() else {
            return false;
        };

        if self.imports.contains(&path) || self.is_imported(simple_name) {
            return false;
        }

        self.imports.push(path);
        true
    }

    /// Imports as dotted paths
    pub fn imports(&self) -> Vec<String> {
        self.imports.iter().map(|path| path.join(".")).collect()
    }

    pub fn is_imported(&self, simple_name: &str) -> bool {
        self.imported_path(simple_name).is_some()
    }

    /// Full path segments of the import whose simple name is `simple_name`
    pub fn imported_path(&self, simple_name: &str) -> Option<&[String]> {
        self.imports
            .iter()
            .find(|path| path.last().is_some_and(|last| last == simple_name))
            .map(Vec::as_slice)
    }

    pub fn set_class(&mut self, name: impl Into<String>, superclass: Option<String>) {
        self.class_name = name.into();
        self.superclass = superclass;
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    pub fn add_field(&mut self, symbol: Symbol) -> bool {
        if self.field(&symbol.name).is_some() {
            return false;
        }

        self.fields.push(symbol);
        true
    }

    pub fn fields(&self) -> &[Symbol] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Symbol> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn add_method(&mut self, name: &str, return_type: ResolvedType, is_static: bool) -> bool {
        if self.methods.contains_key(name) {
            return false;
        }

        let modifiers = if is_static {
            BTreeSet::from([Modifier::Static])
        } else {
            BTreeSet::new()
        };

        self.methods.insert(
            name.to_string(),
            MethodSymbols {
                return_type,
                parameters: Vec::new(),
                locals: Vec::new(),
                modifiers,
            },
        );
        self.method_order.push(name.to_string());
        true
    }

    pub fn method(&self, name: &str) -> Option<&MethodSymbols> {
        self.methods.get(name)
    }

    /// Method names in declaration order
    pub fn method_names(&self) -> &[String] {
        &self.method_order
    }

    /// Parameters may not repeat a parameter name of the same method
    pub fn add_parameter(&mut self, method: &str, symbol: Symbol) -> bool {
        let Some(symbols) = self.methods.get_mut(method) else {
            return false;
        };

        if symbols.parameters.iter().any(|p| p.name == symbol.name) {
            return false;
        }

        symbols.parameters.push(symbol);
        true
    }

    /// Locals may neither repeat a local nor shadow a parameter of the same
    /// method
    pub fn add_local(&mut self, method: &str, symbol: Symbol) -> bool {
        let Some(symbols) = self.methods.get_mut(method) else {
            return false;
        };

        if symbols
            .locals
            .iter()
            .chain(&symbols.parameters)
            .any(|existing| existing.name == symbol.name)
        {
            return false;
        }

        symbols.locals.push(symbol);
        true
    }

    /// Resolves a name used inside of `method`, searching locals, then
    /// parameters, then fields (only for instance methods), then imports.
    pub fn find_variable(&self, method: &str, name: &str) -> Option<Binding> {
        let symbols = self.methods.get(method)?;

        if symbols.locals.iter().any(|local| local.name == name) {
            return Some(Binding::Local);
        }

        if let Some(position) = symbols.parameters.iter().position(|p| p.name == name) {
            return Some(Binding::Parameter(position));
        }

        if !symbols.is_static() && self.field(name).is_some() {
            return Some(Binding::Field);
        }

        self.is_imported(name).then_some(Binding::Import)
    }

    /// Whether `name` refers to a local or parameter of `method`
    pub fn is_method_variable(&self, method: &str, name: &str) -> bool {
        matches!(
            self.find_variable(method, name),
            Some(Binding::Local | Binding::Parameter(_))
        )
    }

    /// Declared symbol of a local, parameter or field visible from `method`
    pub fn variable(&self, method: &str, name: &str) -> Option<&Symbol> {
        let symbols = self.methods.get(method)?;

        symbols
            .locals
            .iter()
            .chain(&symbols.parameters)
            .find(|symbol| symbol.name == name)
            .or_else(|| {
                if symbols.is_static() {
                    None
                } else {
                    self.field(name)
                }
            })
    }

    /// Whether `ty` may be used to declare a variable: a primitive, `String`,
    /// the class itself, its superclass or an imported class
    pub fn is_valid_type(&self, ty: &ResolvedType) -> bool {
        match &ty.name {
            TypeName::Int | TypeName::Boolean | TypeName::String => true,
            TypeName::Class(name) => self.is_known_class(name),
            TypeName::Void | TypeName::Any => false,
        }
    }

    pub fn is_known_class(&self, name: &str) -> bool {
        name == self.class_name || self.superclass() == Some(name) || self.is_imported(name)
    }
}
