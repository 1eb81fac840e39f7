//! Symbol table construction
//!
//! A single top down walk over the tree which records every declaration of
//! the compilation unit and checks that every name used in a method body
//! resolves. Errors are collected and never stop the walk. While descending
//! into a method, its name and static-ness are stamped on every node so that
//! later passes know where they are without looking at ancestors.

use super::{
    symbol_table::{Binding, Symbol, SymbolTable},
    ty::{ResolvedType, TypeName},
};
use crate::{
    diagnostics::{Diagnostic, SemanticError},
    frontend::ast::{
        Ast, MethodOwner, NodeId, NodeKind,
        visit::{Visitor, walk_children},
    },
};

pub struct SymbolTableBuilder<'a> {
    table: SymbolTable,
    diagnostics: &'a mut Vec<Diagnostic>,
    owner: Option<MethodOwner>,
}

impl<'a> SymbolTableBuilder<'a> {
    pub fn build(ast: &mut Ast, diagnostics: &'a mut Vec<Diagnostic>) -> SymbolTable {
        let mut builder = Self {
            table: SymbolTable::default(),
            diagnostics,
            owner: None,
        };

        let root = ast.root();
        builder.visit_node(ast, root);

        tracing::debug!(
            class = builder.table.class_name(),
            imports = builder.table.imports().len(),
            fields = builder.table.fields().len(),
            methods = builder.table.method_names().len(),
            "built symbol table"
        );

        builder.table
    }

    fn report(&mut self, ast: &Ast, id: NodeId, error: SemanticError) {
        self.diagnostics.push(Diagnostic::new(ast.span(id), error));
    }

    fn check_type(&mut self, ast: &Ast, id: NodeId, ty: &ResolvedType) {
        if !self.table.is_valid_type(ty) {
            self.report(ast, id, SemanticError::InvalidType(ty.name.to_string()));
        }
    }

    fn method_name(&self) -> Option<String> {
        self.owner.as_ref().map(|owner| owner.method.clone())
    }

    fn visit_class(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::ClassDeclaration {
            name,
            superclass,
            fields,
            methods,
        } = ast.kind(id).clone()
        else {
            return;
        };

        if self.table.is_imported(&name) {
            self.report(ast, id, SemanticError::ClassNameConflict(name.clone()));
        }

        if let Some(superclass) = &superclass {
            if !self.table.is_imported(superclass) {
                self.report(ast, id, SemanticError::UnknownSuperclass(superclass.clone()));
            }
        }

        self.table.set_class(name, superclass);

        for field in fields {
            let NodeKind::VarDeclaration { name, ty } = ast.kind(field).clone() else {
                continue;
            };

            self.check_type(ast, field, &ty);

            if !self.table.add_field(Symbol::new(name.clone(), ty)) {
                self.report(ast, field, SemanticError::VariableRedeclared(name));
            }
        }

        for method in methods {
            self.visit_method(ast, method);
        }
    }

    fn visit_method(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::MethodDeclaration {
            name,
            return_type,
            is_static,
            parameters,
            locals,
            body,
        } = ast.kind(id).clone()
        else {
            return;
        };

        if return_type.name != TypeName::Void || return_type.is_array() {
            self.check_type(ast, id, &return_type);
        }

        // The body of a redeclared method would be checked against the
        // symbols of the first declaration, so it is skipped entirely
        if !self.table.add_method(&name, return_type, is_static) {
            self.report(ast, id, SemanticError::MethodRedeclared(name));
            return;
        }

        self.owner = Some(MethodOwner {
            method: name.clone(),
            is_static,
        });
        ast.node_mut(id).owner = self.owner.clone();

        for parameter in parameters {
            ast.node_mut(parameter).owner = self.owner.clone();

            let NodeKind::Parameter { name: parameter_name, ty } = ast.kind(parameter).clone()
            else {
                continue;
            };

            self.check_type(ast, parameter, &ty);

            if name == "main" && is_static && ty != ResolvedType::new(TypeName::String, true) {
                self.report(ast, parameter, SemanticError::InvalidMainParameter(ty.clone()));
            }

            if !self
                .table
                .add_parameter(&name, Symbol::new(parameter_name.clone(), ty))
            {
                self.report(ast, parameter, SemanticError::VariableRedeclared(parameter_name));
            }
        }

        for local in locals {
            ast.node_mut(local).owner = self.owner.clone();

            let NodeKind::VarDeclaration { name: local_name, ty } = ast.kind(local).clone() else {
                continue;
            };

            self.check_type(ast, local, &ty);

            if !self.table.add_local(&name, Symbol::new(local_name.clone(), ty)) {
                self.report(ast, local, SemanticError::VariableRedeclared(local_name));
            }
        }

        for statement in body {
            self.visit_node(ast, statement);
        }

        self.owner = None;
    }

    /// Targets of assignments must be variables, never class names
    fn check_assignment_target(&mut self, ast: &Ast, id: NodeId, target: &str) {
        let Some(method) = self.method_name() else {
            return;
        };

        match self.table.find_variable(&method, target) {
            Some(Binding::Local | Binding::Parameter(_) | Binding::Field) => {}
            Some(Binding::Import) | None => {
                self.report(ast, id, SemanticError::UndeclaredVariable(target.to_string()))
            }
        }
    }
}

impl Visitor for SymbolTableBuilder<'_> {
    fn visit_node(&mut self, ast: &mut Ast, id: NodeId) {
        ast.node_mut(id).owner = self.owner.clone();

        match ast.kind(id).clone() {
            NodeKind::Program { imports, class } => {
                for import in imports {
                    let NodeKind::ImportDeclaration { path } = ast.kind(import).clone() else {
                        continue;
                    };

                    if !self.table.add_import(path.clone()) {
                        self.report(ast, import, SemanticError::DuplicateImport(path.join(".")));
                    }
                }

                self.visit_class(ast, class);
            }
            NodeKind::ClassDeclaration { .. } => self.visit_class(ast, id),
            NodeKind::MethodDeclaration { .. } => self.visit_method(ast, id),
            NodeKind::Identifier(name) => {
                if let Some(method) = self.method_name() {
                    if self.table.find_variable(&method, &name).is_none() {
                        self.report(ast, id, SemanticError::UndeclaredVariable(name));
                    }
                }
            }
            NodeKind::This => {
                if self.owner.as_ref().is_some_and(|owner| owner.is_static) {
                    self.report(ast, id, SemanticError::IllegalThisInStaticContext);
                }
            }
            NodeKind::NewObject { class } => {
                if !self.table.is_known_class(&class) {
                    self.report(ast, id, SemanticError::InvalidType(class));
                }
            }
            NodeKind::Assign { target, .. } | NodeKind::ArrayAssign { target, .. } => {
                self.check_assignment_target(ast, id, &target);
                walk_children(self, ast, id);
            }
            _ => walk_children(self, ast, id),
        }
    }
}
