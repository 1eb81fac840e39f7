//! Java-- Type Checker
//!
//! A post-order walk over every method body. Each expression node gets its
//! [`ResolvedType`] computed strictly from the already annotated children,
//! the symbol table and the declared return type of the enclosing method.
//!
//! Values flowing out of opaque imported classes are typed as
//! [`ResolvedType::any`] which is compatible with everything. The same type
//! is given to expressions that failed to check, so that a single mistake
//! does not cascade into a pile of follow-up errors.

use super::{
    symbol_table::SymbolTable,
    ty::{Arrayness, ResolvedType, TypeName},
};
use crate::{
    diagnostics::{Diagnostic, SemanticError},
    frontend::ast::{
        Ast, BinaryOperatorClass, BinaryOperatorKind, NodeId, NodeKind, UnaryOperatorKind,
        visit::{Visitor, walk_children},
    },
};

pub struct TypeChecker<'a> {
    table: &'a SymbolTable,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> TypeChecker<'a> {
    pub fn check(ast: &mut Ast, table: &'a SymbolTable, diagnostics: &'a mut Vec<Diagnostic>) {
        let before = diagnostics.len();
        let mut checker = Self { table, diagnostics };

        let root = ast.root();
        checker.visit_node(ast, root);

        tracing::debug!(
            errors = checker.diagnostics.len() - before,
            "type checked compilation unit"
        );
    }

    fn report(&mut self, ast: &Ast, id: NodeId, error: SemanticError) {
        self.diagnostics.push(Diagnostic::new(ast.span(id), error));
    }

    /// Type of an already checked node
    fn type_of(&self, ast: &Ast, id: NodeId) -> ResolvedType {
        ast.ty(id).cloned().unwrap_or_else(ResolvedType::any)
    }

    fn method_of(&self, ast: &Ast, id: NodeId) -> Option<String> {
        ast.owner(id).map(|owner| owner.method.clone())
    }

    fn class_type(&self) -> ResolvedType {
        ResolvedType::class(self.table.class_name())
    }

    fn variable_type(&self, ast: &Ast, id: NodeId, name: &str) -> Option<ResolvedType> {
        let method = self.method_of(ast, id)?;

        self.table
            .variable(&method, name)
            .map(|symbol| symbol.ty.clone())
    }

    /// Opaque values may be assigned to one another, the class may be
    /// assigned to and from its superclass, and otherwise the types must be
    /// the same
    fn is_assignable(&self, target: &ResolvedType, value: &ResolvedType) -> bool {
        let is_opaque = |ty: &ResolvedType| {
            ty.arrayness == Arrayness::Scalar
                && ty
                    .name
                    .class_name()
                    .is_some_and(|name| self.table.is_imported(name))
        };

        if is_opaque(target) && is_opaque(value) {
            return true;
        }

        let class = self.class_type();
        let superclass = self.table.superclass().map(ResolvedType::class);
        let is_class_or_superclass = |ty: &ResolvedType| {
            ty.same_type(&class) || superclass.as_ref().is_some_and(|s| ty.same_type(s))
        };

        if (value.same_type(&class) && is_class_or_superclass(target))
            || (target.same_type(&class) && is_class_or_superclass(value))
        {
            return true;
        }

        target.same_type(value)
    }

    fn check_binary(
        &mut self,
        ast: &Ast,
        id: NodeId,
        operator: BinaryOperatorKind,
        lhs: NodeId,
        rhs: NodeId,
    ) -> ResolvedType {
        let lhs_type = self.type_of(ast, lhs);
        let rhs_type = self.type_of(ast, rhs);

        let operand_type = match operator.class() {
            BinaryOperatorClass::Arithmetic | BinaryOperatorClass::Relational => {
                ResolvedType::int()
            }
            BinaryOperatorClass::Logical => ResolvedType::boolean(),
            BinaryOperatorClass::Equality => {
                let comparable = lhs_type.same_type(&rhs_type)
                    && (lhs_type.is_int() || lhs_type.is_boolean())
                    && (rhs_type.is_int() || rhs_type.is_boolean());

                if !comparable {
                    self.report(
                        ast,
                        id,
                        SemanticError::IncomparableOperands {
                            operator: operator.to_string(),
                            lhs: lhs_type,
                            rhs: rhs_type,
                        },
                    );
                }

                return operator.result_type();
            }
        };

        for (operand, found) in [(lhs, lhs_type), (rhs, rhs_type)] {
            if !found.same_type(&operand_type) {
                self.report(
                    ast,
                    operand,
                    SemanticError::OperandTypeMismatch {
                        operator: operator.to_string(),
                        expected: operand_type.clone(),
                        found,
                    },
                );
            }
        }

        operator.result_type()
    }

    fn check_method_call(
        &mut self,
        ast: &Ast,
        id: NodeId,
        receiver: NodeId,
        method: &str,
        arguments: &[NodeId],
    ) -> ResolvedType {
        let receiver_type = self.type_of(ast, receiver);

        if receiver_type.is_any() || !receiver_type.same_type(&self.class_type()) {
            return ResolvedType::any();
        }

        let table = self.table;
        let Some(symbols) = table.method(method) else {
            if self.table.superclass().is_none() {
                self.report(ast, id, SemanticError::UndeclaredMethod(method.to_string()));
            }

            return ResolvedType::any();
        };

        if symbols.parameters.len() != arguments.len() {
            self.report(
                ast,
                id,
                SemanticError::ArgumentCountMismatch {
                    method: method.to_string(),
                    expected: symbols.parameters.len(),
                    found: arguments.len(),
                },
            );
        } else {
            for (position, (argument, expected)) in
                arguments.iter().zip(symbols.parameter_types()).enumerate()
            {
                let found = self.type_of(ast, *argument);

                if !found.same_type(expected) {
                    self.report(
                        ast,
                        *argument,
                        SemanticError::ArgumentTypeMismatch {
                            method: method.to_string(),
                            position: position + 1,
                            expected: expected.clone(),
                            found,
                        },
                    );
                }
            }
        }

        symbols.return_type.clone()
    }

    fn check_array_index(&mut self, ast: &Ast, array_type: &ResolvedType, array: NodeId, index: NodeId) {
        if !array_type.may_be_array() {
            self.report(ast, array, SemanticError::NotAnArray(array_type.clone()));
        }

        let index_type = self.type_of(ast, index);
        if !index_type.is_int() {
            self.report(ast, index, SemanticError::IndexNotInt(index_type));
        }
    }

    fn check_condition(&mut self, ast: &Ast, condition: NodeId) {
        let found = self.type_of(ast, condition);

        if !found.is_boolean() {
            self.report(ast, condition, SemanticError::ConditionNotBoolean(found));
        }
    }

    fn check_method_declaration(&mut self, ast: &Ast, id: NodeId) {
        let NodeKind::MethodDeclaration {
            name,
            return_type,
            body,
            ..
        } = ast.kind(id)
        else {
            return;
        };

        let trailing_value = body.last().and_then(|last| match ast.kind(*last) {
            NodeKind::Return { value } => Some(*value),
            _ => None,
        });

        if return_type.name == TypeName::Void && !return_type.is_array() {
            for statement in body {
                if let NodeKind::Return { value: Some(_) } = ast.kind(*statement) {
                    self.report(ast, *statement, SemanticError::ReturnFromVoid(name.clone()));
                }
            }

            return;
        }

        match trailing_value {
            Some(Some(value)) => {
                let found = self.type_of(ast, value);

                if !found.same_type(return_type) {
                    self.report(
                        ast,
                        value,
                        SemanticError::ReturnTypeMismatch {
                            method: name.clone(),
                            expected: return_type.clone(),
                            found,
                        },
                    );
                }
            }
            _ => self.report(
                ast,
                id,
                SemanticError::MissingReturn {
                    method: name.clone(),
                    expected: return_type.clone(),
                },
            ),
        }
    }

    /// Computes the type of a node whose children have all been checked.
    /// Statements have no type.
    fn check_node(&mut self, ast: &Ast, id: NodeId) -> Option<ResolvedType> {
        let ty = match ast.kind(id) {
            NodeKind::IntegerLiteral(_) => ResolvedType::int(),
            NodeKind::BooleanLiteral(_) => ResolvedType::boolean(),
            NodeKind::This => self.class_type(),
            NodeKind::Identifier(name) => {
                if let Some(ty) = self.variable_type(ast, id, name) {
                    ty
                } else if self.table.is_imported(name) {
                    ResolvedType::class(name.clone())
                } else {
                    ResolvedType::any()
                }
            }
            NodeKind::Parenthesis { inner } => self.type_of(ast, *inner),
            NodeKind::Binary { operator, lhs, rhs } => {
                self.check_binary(ast, id, *operator, *lhs, *rhs)
            }
            NodeKind::Unary {
                operator: UnaryOperatorKind::LogicalNot,
                operand,
            } => {
                let found = self.type_of(ast, *operand);

                if !found.is_boolean() {
                    self.report(
                        ast,
                        *operand,
                        SemanticError::OperandTypeMismatch {
                            operator: UnaryOperatorKind::LogicalNot.to_string(),
                            expected: ResolvedType::boolean(),
                            found,
                        },
                    );
                }

                ResolvedType::boolean()
            }
            NodeKind::ArrayAccess { array, index } => {
                let array_type = self.type_of(ast, *array);
                self.check_array_index(ast, &array_type, *array, *index);
                array_type.element()
            }
            NodeKind::Length { array } => {
                let array_type = self.type_of(ast, *array);

                if !array_type.may_be_array() {
                    self.report(ast, *array, SemanticError::NotAnArray(array_type));
                }

                ResolvedType::int()
            }
            NodeKind::NewArray { length } => {
                let found = self.type_of(ast, *length);

                if !found.is_int() {
                    self.report(ast, *length, SemanticError::ArraySizeNotInt(found));
                }

                ResolvedType::int_array()
            }
            NodeKind::NewObject { class } => ResolvedType::class(class.clone()),
            NodeKind::MethodCall {
                receiver,
                method,
                arguments,
            } => self.check_method_call(ast, id, *receiver, method, arguments),
            NodeKind::Assign { target, value } => {
                let expected = self.variable_type(ast, id, target)?;
                let found = self.type_of(ast, *value);

                if !self.is_assignable(&expected, &found) {
                    self.report(
                        ast,
                        *value,
                        SemanticError::IncompatibleAssignment {
                            target: target.clone(),
                            expected,
                            found,
                        },
                    );
                }

                return None;
            }
            NodeKind::ArrayAssign {
                target,
                index,
                value,
            } => {
                let array_type = self.variable_type(ast, id, target)?;
                self.check_array_index(ast, &array_type, id, *index);

                let expected = array_type.element();
                let found = self.type_of(ast, *value);

                if !self.is_assignable(&expected, &found) {
                    self.report(
                        ast,
                        *value,
                        SemanticError::IncompatibleAssignment {
                            target: format!("{target}[]"),
                            expected,
                            found,
                        },
                    );
                }

                return None;
            }
            NodeKind::If { condition, .. } | NodeKind::While { condition, .. } => {
                self.check_condition(ast, *condition);
                return None;
            }
            NodeKind::Return { value } => match value {
                Some(value) => self.type_of(ast, *value),
                None => ResolvedType::void(),
            },
            NodeKind::MethodDeclaration { .. } => {
                self.check_method_declaration(ast, id);
                return None;
            }
            NodeKind::Program { .. }
            | NodeKind::ImportDeclaration { .. }
            | NodeKind::ClassDeclaration { .. }
            | NodeKind::VarDeclaration { .. }
            | NodeKind::Parameter { .. }
            | NodeKind::Block { .. }
            | NodeKind::ExpressionStatement { .. } => return None,
        };

        Some(ty)
    }
}

impl Visitor for TypeChecker<'_> {
    fn visit_node(&mut self, ast: &mut Ast, id: NodeId) {
        walk_children(self, ast, id);

        if let Some(ty) = self.check_node(ast, id) {
            ast.set_ty(id, ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{diagnostics::CompileError, frontend::interchange::RawNode, test_helpers::*};

    fn errors(program: RawNode) -> Vec<SemanticError> {
        analysis_errors(program)
            .into_iter()
            .map(|diagnostic| match diagnostic.error {
                CompileError::Semantic(error) => error,
                other => panic!("unexpected diagnostic {other}"),
            })
            .collect()
    }

    fn in_main(locals: Vec<RawNode>, body: Vec<RawNode>) -> RawNode {
        program(&["io"], class("Foo", None, vec![], vec![main_method(locals, body)]))
    }

    #[test]
    fn annotates_expressions() {
        let (ast, _) = analyzed(in_main(
            vec![var("a", "int[]"), var("b", "boolean")],
            vec![
                assign("a", new_array(int(4))),
                assign("b", binary("<", index(ident("a"), int(0)), length(ident("a")))),
                expr(call(ident("io"), "println", vec![ident("b")])),
            ],
        ));

        let types_of = |predicate: fn(&NodeKind) -> bool| {
            find_nodes(&ast, predicate)
                .into_iter()
                .map(|id| ast.ty(id).cloned())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            types_of(|kind| matches!(kind, NodeKind::NewArray { .. })),
            vec![Some(ResolvedType::int_array())]
        );
        assert_eq!(
            types_of(|kind| matches!(kind, NodeKind::ArrayAccess { .. })),
            vec![Some(ResolvedType::int())]
        );
        assert_eq!(
            types_of(|kind| matches!(kind, NodeKind::Binary { .. })),
            vec![Some(ResolvedType::boolean())]
        );
        assert_eq!(
            types_of(|kind| matches!(kind, NodeKind::MethodCall { .. })),
            vec![Some(ResolvedType::any())]
        );
    }

    #[test]
    fn operand_mismatches() {
        let found = errors(in_main(
            vec![var("x", "int"), var("b", "boolean")],
            vec![
                assign("x", binary("+", ident("b"), int(1))),
                assign("b", binary("&&", ident("x"), boolean(true))),
                assign("b", not(int(3))),
                assign("b", binary("==", ident("x"), ident("b"))),
            ],
        ));

        assert_eq!(
            found,
            vec![
                SemanticError::OperandTypeMismatch {
                    operator: "+".into(),
                    expected: ResolvedType::int(),
                    found: ResolvedType::boolean()
                },
                SemanticError::OperandTypeMismatch {
                    operator: "&&".into(),
                    expected: ResolvedType::boolean(),
                    found: ResolvedType::int()
                },
                SemanticError::OperandTypeMismatch {
                    operator: "!".into(),
                    expected: ResolvedType::boolean(),
                    found: ResolvedType::int()
                },
                SemanticError::IncomparableOperands {
                    operator: "==".into(),
                    lhs: ResolvedType::int(),
                    rhs: ResolvedType::boolean()
                },
            ]
        );
    }

    #[test]
    fn array_rules() {
        let found = errors(in_main(
            vec![var("x", "int"), var("a", "int[]")],
            vec![
                assign("x", index(ident("x"), int(0))),
                assign("x", index(ident("a"), boolean(true))),
                assign("x", length(ident("x"))),
                assign("a", new_array(boolean(false))),
                assign("a", ident("x")),
            ],
        ));

        assert_eq!(
            found,
            vec![
                SemanticError::NotAnArray(ResolvedType::int()),
                SemanticError::IndexNotInt(ResolvedType::boolean()),
                SemanticError::NotAnArray(ResolvedType::int()),
                SemanticError::ArraySizeNotInt(ResolvedType::boolean()),
                SemanticError::IncompatibleAssignment {
                    target: "a".into(),
                    expected: ResolvedType::int_array(),
                    found: ResolvedType::int()
                },
            ]
        );
    }

    #[test]
    fn array_element_assignment_compares_element_types() {
        let found = errors(in_main(
            vec![var("a", "int[]")],
            vec![
                array_assign("a", int(0), int(1)),
                array_assign("a", int(1), boolean(true)),
            ],
        ));

        assert_eq!(
            found,
            vec![SemanticError::IncompatibleAssignment {
                target: "a[]".into(),
                expected: ResolvedType::int(),
                found: ResolvedType::boolean()
            }]
        );
    }

    #[test]
    fn class_hierarchy_and_opaque_assignments() {
        let (_, table) = analyzed(program(
            &["io", "Base", "Other"],
            class(
                "Foo",
                Some("Base"),
                vec![],
                vec![main_method(
                    vec![var("f", "Foo"), var("b", "Base"), var("o", "Other"), var("i", "io")],
                    vec![
                        assign("b", new_object("Foo")),
                        assign("f", ident("b")),
                        assign("o", ident("i")),
                        assign("o", call(ident("io"), "make", vec![])),
                    ],
                )],
            ),
        ));

        assert_eq!(table.class_name(), "Foo");
    }

    #[test]
    fn unrelated_classes_are_not_assignable() {
        let found = errors(program(
            &["Other"],
            class(
                "Foo",
                None,
                vec![],
                vec![main_method(
                    vec![var("x", "int")],
                    vec![assign("x", new_object("Foo"))],
                )],
            ),
        ));

        assert_eq!(
            found,
            vec![SemanticError::IncompatibleAssignment {
                target: "x".into(),
                expected: ResolvedType::int(),
                found: ResolvedType::class("Foo")
            }]
        );
    }

    #[test]
    fn calls_on_the_current_class_are_checked() {
        let found = errors(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![method(
                    "run",
                    ty("int"),
                    vec![param("a", "int"), param("b", "boolean")],
                    vec![],
                    vec![
                        expr(call(this(), "run", vec![int(1)])),
                        expr(call(this(), "run", vec![boolean(true), boolean(true)])),
                        expr(call(this(), "fly", vec![])),
                        ret(call(this(), "run", vec![int(1), boolean(false)])),
                    ],
                )],
            ),
        ));

        assert_eq!(
            found,
            vec![
                SemanticError::ArgumentCountMismatch {
                    method: "run".into(),
                    expected: 2,
                    found: 1
                },
                SemanticError::ArgumentTypeMismatch {
                    method: "run".into(),
                    position: 1,
                    expected: ResolvedType::int(),
                    found: ResolvedType::boolean()
                },
                SemanticError::UndeclaredMethod("fly".into()),
            ]
        );
    }

    #[test]
    fn unknown_methods_are_inherited_when_there_is_a_superclass() {
        let (ast, _) = analyzed(program(
            &["Base"],
            class(
                "Foo",
                Some("Base"),
                vec![],
                vec![method(
                    "run",
                    ty("int"),
                    vec![],
                    vec![],
                    vec![ret(call(this(), "inherited", vec![]))],
                )],
            ),
        ));

        let call = find_nodes(&ast, |kind| matches!(kind, NodeKind::MethodCall { .. }))[0];
        assert_eq!(ast.ty(call), Some(&ResolvedType::any()));
    }

    #[test]
    fn return_rules() {
        let found = errors(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![
                    method("a", ty("int"), vec![], vec![], vec![ret(boolean(true))]),
                    method("b", ty("int"), vec![], vec![], vec![]),
                    method("c", ty("void"), vec![], vec![], vec![ret(int(1))]),
                ],
            ),
        ));

        assert_eq!(
            found,
            vec![
                SemanticError::ReturnTypeMismatch {
                    method: "a".into(),
                    expected: ResolvedType::int(),
                    found: ResolvedType::boolean()
                },
                SemanticError::MissingReturn {
                    method: "b".into(),
                    expected: ResolvedType::int()
                },
                SemanticError::ReturnFromVoid("c".into()),
            ]
        );
    }

    #[test]
    fn conditions_must_be_boolean() {
        let found = errors(in_main(
            vec![var("x", "int")],
            vec![
                if_else(ident("x"), block(vec![]), block(vec![])),
                while_loop(int(1), block(vec![])),
                while_loop(binary("<", ident("x"), int(3)), block(vec![])),
            ],
        ));

        assert_eq!(
            found,
            vec![
                SemanticError::ConditionNotBoolean(ResolvedType::int()),
                SemanticError::ConditionNotBoolean(ResolvedType::int()),
            ]
        );
    }

    #[test]
    fn symbol_errors_stop_before_type_checking() {
        let found = errors(in_main(
            vec![],
            vec![assign("x", binary("+", boolean(true), int(1)))],
        ));

        assert_eq!(found, vec![SemanticError::UndeclaredVariable("x".into())]);
    }
}
