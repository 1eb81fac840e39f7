use std::collections::BTreeMap;

use crate::{
    frontend::ast::{Ast, BinaryOperatorClass, NodeId, NodeKind},
    middle::{
        ir::{
            self, Call, Descriptor, Instruction, Label, LabelKind, Literal, Operand, Type,
            VarScope, Variable,
        },
        symbol_table::{Binding, SymbolTable},
        ty::ResolvedType,
    },
};

/// Label numbers are unique across the whole class
#[derive(Debug, Default)]
struct LoweringCounters {
    next_if: u32,
    next_while: u32,
}

/// What the consumer of an expression expects back
#[derive(Debug, Clone)]
struct LoweringMode {
    /// Type the consumer will treat the value as, when it knows better than
    /// the tree
    expected: Option<Type>,
    /// The consumer needs an operand, so anything that is not one is stored
    /// into a fresh temporary first
    needs_temporary: bool,
}

impl LoweringMode {
    fn operand(expected: Option<Type>) -> Self {
        Self {
            expected,
            needs_temporary: true,
        }
    }

    fn inline(expected: Option<Type>) -> Self {
        Self {
            expected,
            needs_temporary: false,
        }
    }
}

enum Value {
    Operand(Operand),
    Expression(Instruction),
}

struct BodyLoweringContext<'a> {
    ast: &'a Ast,
    table: &'a SymbolTable,
    method: &'a str,
    is_static: bool,
    counters: &'a mut LoweringCounters,

    instructions: Vec<Instruction>,
    labels: BTreeMap<Label, usize>,
    variables: BTreeMap<String, Descriptor>,
    next_register: usize,
    next_temporary: usize,
}

impl<'a> BodyLoweringContext<'a> {
    fn new(
        ast: &'a Ast,
        table: &'a SymbolTable,
        method: &'a str,
        counters: &'a mut LoweringCounters,
    ) -> Self {
        let is_static = table.method(method).is_some_and(|symbols| symbols.is_static());

        let mut context = Self {
            ast,
            table,
            method,
            is_static,
            counters,
            instructions: Vec::new(),
            labels: BTreeMap::new(),
            variables: BTreeMap::new(),
            next_register: 0,
            next_temporary: 0,
        };

        if !is_static {
            context.declare("this", Type::Object(table.class_name().to_string()), VarScope::This);
        }

        if let Some(symbols) = table.method(method) {
            for parameter in &symbols.parameters {
                context.declare(&parameter.name, lower_type(&parameter.ty), VarScope::Parameter);
            }

            for local in &symbols.locals {
                context.declare(&local.name, lower_type(&local.ty), VarScope::Local);
            }
        }

        context
    }

    fn declare(&mut self, name: &str, ty: Type, scope: VarScope) {
        let register = self.next_register;
        self.next_register += 1;

        self.variables.insert(
            name.to_string(),
            Descriptor {
                register,
                ty,
                scope,
            },
        );
    }

    fn variable(&self, name: &str) -> Option<Variable> {
        let descriptor = self.variables.get(name)?;

        Some(Variable {
            name: name.to_string(),
            ty: descriptor.ty.clone(),
            parameter: (descriptor.scope == VarScope::Parameter).then_some(descriptor.register),
        })
    }

    fn create_temporary(&mut self, ty: Type) -> Variable {
        let name = loop {
            let candidate = format!("t{}", self.next_temporary);
            self.next_temporary += 1;

            if !self.variables.contains_key(&candidate) && self.table.field(&candidate).is_none() {
                break candidate;
            }
        };

        self.declare(&name, ty.clone(), VarScope::Local);

        Variable {
            name,
            ty,
            parameter: None,
        }
    }

    fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn place_label(&mut self, label: Label) {
        self.labels.insert(label, self.instructions.len());
    }

    fn resolve(&self, name: &str) -> Option<Binding> {
        self.table.find_variable(self.method, name)
    }

    fn is_field(&self, name: &str) -> bool {
        !self.is_static && self.resolve(name) == Some(Binding::Field)
    }

    fn field_type(&self, name: &str) -> Type {
        self.table
            .field(name)
            .map(|symbol| lower_type(&symbol.ty))
            .unwrap_or(Type::Void)
    }

    fn tree_type(&self, id: NodeId) -> Option<Type> {
        self.ast.ty(id).and_then(Type::from_resolved)
    }

    fn materialize(&mut self, instruction: Instruction) -> Variable {
        let temporary = self.create_temporary(instruction.ty());

        self.push(Instruction::Assign {
            destination: Operand::Variable(temporary.clone()),
            value: Box::new(instruction),
        });

        temporary
    }

    fn finish(&mut self, value: Value, mode: &LoweringMode) -> Value {
        match value {
            Value::Expression(instruction) if mode.needs_temporary => {
                Value::Operand(Operand::Variable(self.materialize(instruction)))
            }
            value => value,
        }
    }

    fn lower_operand(&mut self, id: NodeId, expected: Option<Type>) -> Operand {
        match self.lower_expression(id, LoweringMode::operand(expected)) {
            Value::Operand(operand) => operand,
            Value::Expression(instruction) => Operand::Variable(self.materialize(instruction)),
        }
    }

    /// Operand that may be used as an array index: a variable or a literal
    fn lower_index(&mut self, id: NodeId) -> Operand {
        match self.lower_operand(id, Some(Type::Int32)) {
            operand @ (Operand::Variable(_) | Operand::Literal(_)) => operand,
            other => Operand::Variable(self.materialize(Instruction::NoOp(other))),
        }
    }

    /// Variable holding an array, copying it out of a field or element first
    fn lower_array(&mut self, id: NodeId) -> Variable {
        match self.lower_operand(id, None) {
            Operand::Variable(variable) => variable,
            other => self.materialize(Instruction::NoOp(other)),
        }
    }

    fn lower_expression(&mut self, id: NodeId, mode: LoweringMode) -> Value {
        let ast = self.ast;

        let value = match ast.kind(id) {
            NodeKind::IntegerLiteral(value) => Value::Operand(Operand::Literal(Literal::Int(*value))),
            NodeKind::BooleanLiteral(value) => {
                Value::Operand(Operand::Literal(Literal::Bool(*value)))
            }
            NodeKind::This => Value::Operand(Operand::This(self.table.class_name().to_string())),
            NodeKind::Identifier(name) => {
                if self.is_field(name) {
                    Value::Expression(Instruction::GetField {
                        field: name.clone(),
                        ty: self.field_type(name),
                    })
                } else if let Some(variable) = self.variable(name) {
                    Value::Operand(Operand::Variable(variable))
                } else {
                    Value::Operand(Operand::Variable(Variable {
                        name: name.clone(),
                        ty: Type::Object(name.clone()),
                        parameter: None,
                    }))
                }
            }
            NodeKind::Parenthesis { inner } => return self.lower_expression(*inner, mode),
            NodeKind::Binary { operator, lhs, rhs } => {
                let operand_type = match operator.class() {
                    BinaryOperatorClass::Logical => Type::Boolean,
                    BinaryOperatorClass::Equality => {
                        self.tree_type(*lhs).unwrap_or(Type::Int32)
                    }
                    _ => Type::Int32,
                };

                let lhs = self.lower_operand(*lhs, Some(operand_type.clone()));
                let rhs = self.lower_operand(*rhs, Some(operand_type));

                Value::Expression(Instruction::BinaryOp {
                    operator: *operator,
                    lhs,
                    rhs,
                })
            }
            NodeKind::Unary { operator, operand } => {
                let operand = self.lower_operand(*operand, Some(Type::Boolean));

                Value::Expression(Instruction::UnaryOp {
                    operator: *operator,
                    operand,
                })
            }
            NodeKind::ArrayAccess { array, index } => {
                let array = self.lower_array(*array);
                let index = self.lower_index(*index);

                Value::Operand(Operand::ArrayElement {
                    array,
                    index: Box::new(index),
                })
            }
            NodeKind::Length { array } => {
                let array = self.lower_array(*array);

                Value::Expression(Instruction::Call(Call::ArrayLength {
                    array: Operand::Variable(array),
                }))
            }
            NodeKind::MethodCall {
                receiver,
                method,
                arguments,
            } => Value::Expression(Instruction::Call(self.lower_call(
                *receiver,
                method,
                arguments,
                mode.expected.clone(),
            ))),
            NodeKind::NewObject { class } => {
                let object = Operand::Variable(self.materialize(Instruction::Call(
                    Call::NewObject {
                        class: class.clone(),
                    },
                )));

                self.push(Instruction::Call(Call::Special {
                    receiver: object.clone(),
                    class: class.clone(),
                }));

                Value::Operand(object)
            }
            NodeKind::NewArray { length } => {
                let length = self.lower_operand(*length, Some(Type::Int32));

                Value::Operand(Operand::Variable(self.materialize(Instruction::Call(
                    Call::NewArray {
                        element: Type::Int32,
                        length,
                    },
                ))))
            }
            other => unreachable!("{other:?} is not an expression"),
        };

        self.finish(value, &mode)
    }

    fn lower_call(
        &mut self,
        receiver: NodeId,
        method: &str,
        arguments: &[NodeId],
        expected: Option<Type>,
    ) -> Call {
        let (ast, table) = (self.ast, self.table);
        let receiver = ast.strip_parentheses(receiver);

        let current_class = ResolvedType::class(table.class_name());
        let callee = ast
            .ty(receiver)
            .filter(|ty| !ty.is_any() && ty.same_type(&current_class))
            .and_then(|_| table.method(method));

        let return_type = callee
            .map(|symbols| lower_type(&symbols.return_type))
            .or(expected)
            .unwrap_or(Type::Void);

        let static_class = match ast.kind(receiver) {
            NodeKind::Identifier(name)
                if self.resolve(name) == Some(Binding::Import) =>
            {
                Some(name.clone())
            }
            _ => None,
        };

        let receiver = match &static_class {
            Some(_) => None,
            None => Some(self.lower_operand(receiver, None)),
        };

        let arguments = arguments
            .iter()
            .enumerate()
            .map(|(position, argument)| {
                let expected = callee
                    .and_then(|symbols| symbols.parameters.get(position))
                    .map(|parameter| lower_type(&parameter.ty))
                    .or_else(|| self.tree_type(*argument));

                self.lower_operand(*argument, expected)
            })
            .collect::<Vec<_>>();

        match (static_class, receiver) {
            (Some(class), _) => Call::Static {
                class,
                method: method.to_string(),
                arguments,
                return_type,
            },
            (None, Some(receiver)) => Call::Virtual {
                receiver,
                method: method.to_string(),
                arguments,
                return_type,
            },
            (None, None) => unreachable!("instance calls always lower their receiver"),
        }
    }

    /// Conditions are kept inline when they are an operator, otherwise they
    /// are tested as a plain operand
    fn lower_condition(&mut self, id: NodeId) -> Instruction {
        match self.lower_expression(id, LoweringMode::inline(Some(Type::Boolean))) {
            Value::Expression(instruction @ (Instruction::BinaryOp { .. } | Instruction::UnaryOp { .. })) => {
                instruction
            }
            Value::Expression(instruction) => {
                Instruction::NoOp(Operand::Variable(self.materialize(instruction)))
            }
            Value::Operand(operand) => Instruction::NoOp(operand),
        }
    }

    fn lower_statement(&mut self, id: NodeId) {
        let ast = self.ast;

        match ast.kind(id) {
            NodeKind::Block { statements } => {
                for statement in statements {
                    self.lower_statement(*statement);
                }
            }
            NodeKind::ExpressionStatement { expression } => {
                match self.lower_expression(*expression, LoweringMode::inline(None)) {
                    Value::Expression(instruction) => self.push(instruction),
                    Value::Operand(_) => {}
                }
            }
            NodeKind::Assign { target, value } => self.lower_assignment(target, *value),
            NodeKind::ArrayAssign {
                target,
                index,
                value,
            } => {
                let array = match self.variable(target) {
                    Some(variable) if !self.is_field(target) => variable,
                    _ => {
                        let ty = self.field_type(target);
                        self.materialize(Instruction::GetField {
                            field: target.clone(),
                            ty,
                        })
                    }
                };

                let index = self.lower_index(*index);
                let element = array.ty.element();

                let value = match self.lower_expression(*value, LoweringMode::inline(Some(element))) {
                    Value::Operand(operand) => assigned_operand(operand),
                    Value::Expression(instruction) => instruction,
                };

                self.push(Instruction::Assign {
                    destination: Operand::ArrayElement {
                        array,
                        index: Box::new(index),
                    },
                    value: Box::new(value),
                });
            }
            NodeKind::Return { value } => {
                let value = value.map(|value| {
                    let expected = self
                        .table
                        .method(self.method)
                        .map(|symbols| lower_type(&symbols.return_type));

                    self.lower_operand(value, expected)
                });

                self.push(Instruction::Return(value));
            }
            NodeKind::If {
                condition,
                positive,
                negative,
            } => {
                let id = self.counters.next_if;
                self.counters.next_if += 1;

                let if_true = Label {
                    kind: LabelKind::IfTrue,
                    id,
                };
                let if_end = Label {
                    kind: LabelKind::IfEnd,
                    id,
                };

                let condition = self.lower_condition(*condition);
                self.push(Instruction::Branch {
                    condition: Box::new(condition),
                    target: if_true,
                });

                self.lower_statement(*negative);
                self.push(Instruction::Goto(if_end));

                self.place_label(if_true);
                self.lower_statement(*positive);

                self.place_label(if_end);
            }
            NodeKind::While { condition, body } => {
                let id = self.counters.next_while;
                self.counters.next_while += 1;

                let label = |kind| Label { kind, id };

                self.place_label(label(LabelKind::WhileCondition));
                let condition = self.lower_condition(*condition);
                self.push(Instruction::Branch {
                    condition: Box::new(condition),
                    target: label(LabelKind::WhileBody),
                });
                self.push(Instruction::Goto(label(LabelKind::WhileEnd)));

                self.place_label(label(LabelKind::WhileBody));
                self.lower_statement(*body);
                self.push(Instruction::Goto(label(LabelKind::WhileCondition)));

                self.place_label(label(LabelKind::WhileEnd));
            }
            other => unreachable!("{other:?} is not a statement"),
        }
    }

    fn lower_assignment(&mut self, target: &str, value: NodeId) {
        if self.is_field(target) {
            let ty = self.field_type(target);
            let value = self.lower_operand(value, Some(ty.clone()));

            self.push(Instruction::PutField {
                field: target.to_string(),
                ty,
                value,
            });
            return;
        }

        let Some(destination) = self.variable(target) else {
            unreachable!("assignment targets are resolved before lowering")
        };

        let value = match self.lower_expression(value, LoweringMode::inline(Some(destination.ty.clone()))) {
            Value::Operand(operand) => assigned_operand(operand),
            Value::Expression(instruction) => instruction,
        };

        self.push(Instruction::Assign {
            destination: Operand::Variable(destination),
            value: Box::new(value),
        });
    }

    fn into_method(self, name: String, return_type: Type) -> ir::Method {
        let parameters = self
            .variables
            .iter()
            .filter(|(_, descriptor)| descriptor.scope == VarScope::Parameter)
            .map(|(name, descriptor)| {
                (
                    descriptor.register,
                    Variable {
                        name: name.clone(),
                        ty: descriptor.ty.clone(),
                        parameter: Some(descriptor.register),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();

        ir::Method {
            name,
            is_static: self.is_static,
            is_constructor: false,
            parameters,
            return_type,
            instructions: self.instructions,
            labels: self.labels,
            variables: self.variables,
        }
    }
}

/// Literals assigned directly are loaded as constants
fn assigned_operand(operand: Operand) -> Instruction {
    match operand {
        Operand::Literal(literal) => Instruction::Call(Call::LoadConstant(literal)),
        operand => Instruction::NoOp(operand),
    }
}

fn lower_type(ty: &ResolvedType) -> Type {
    Type::from_resolved(ty).unwrap_or(Type::Void)
}

fn lower_constructor(class: &str, superclass: &str) -> ir::Method {
    ir::Method {
        name: class.to_string(),
        is_static: false,
        is_constructor: true,
        parameters: Vec::new(),
        return_type: Type::Void,
        instructions: vec![Instruction::Call(Call::Special {
            receiver: Operand::This(class.to_string()),
            class: superclass.to_string(),
        })],
        labels: BTreeMap::new(),
        variables: BTreeMap::from([(
            "this".to_string(),
            Descriptor {
                register: 0,
                ty: Type::Object(class.to_string()),
                scope: VarScope::This,
            },
        )]),
    }
}

/// Lowers a checked and optimized tree to IR
pub fn lower_to_ir(ast: &Ast, table: &SymbolTable) -> ir::Class {
    let mut counters = LoweringCounters::default();

    let superclass = table.superclass().map(str::to_string);
    let mut class = ir::Class {
        name: table.class_name().to_string(),
        superclass: superclass.clone(),
        imports: table.imports(),
        fields: table
            .fields()
            .iter()
            .map(|field| ir::Field {
                name: field.name.clone(),
                ty: lower_type(&field.ty),
            })
            .collect(),
        methods: Vec::new(),
    };

    let constructor_target = class.qualified_superclass();
    class
        .methods
        .push(lower_constructor(table.class_name(), &constructor_target));

    let NodeKind::Program {
        class: declaration, ..
    } = ast.kind(ast.root())
    else {
        unreachable!("the tree root is always a program")
    };

    let NodeKind::ClassDeclaration { methods, .. } = ast.kind(*declaration) else {
        unreachable!("a program always declares a class")
    };

    for method in methods {
        let NodeKind::MethodDeclaration { name, body, .. } = ast.kind(*method) else {
            continue;
        };

        let Some(symbols) = table.method(name) else {
            continue;
        };
        let return_type = lower_type(&symbols.return_type);

        let mut context = BodyLoweringContext::new(ast, table, name, &mut counters);
        for statement in body {
            context.lower_statement(*statement);
        }

        let method = context.into_method(name.clone(), return_type);
        tracing::debug!(
            method = %method.name,
            instructions = method.instructions.len(),
            variables = method.variables.len(),
            "lowered method to IR"
        );

        class.methods.push(method);
    }

    class
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_helpers::*;

    fn lower(program: crate::frontend::interchange::RawNode) -> ir::Class {
        let (ast, table) = analyzed(program);
        lower_to_ir(&ast, &table)
    }

    fn lowered<'a>(class: &'a ir::Class, name: &str) -> &'a ir::Method {
        class
            .methods
            .iter()
            .find(|method| method.name == name)
            .expect("method should be lowered")
    }

    #[test]
    fn slots_start_after_this_and_parameters() {
        let class = lower(program(
            &[],
            class(
                "Sum",
                None,
                vec![],
                vec![method(
                    "add",
                    ty("int"),
                    vec![param("a", "int"), param("b", "int")],
                    vec![var("c", "int")],
                    vec![
                        assign("c", binary("+", ident("a"), ident("b"))),
                        ret(ident("c")),
                    ],
                )],
            ),
        ));

        let add = lowered(&class, "add");
        let registers = add
            .variables
            .iter()
            .map(|(name, descriptor)| (name.as_str(), descriptor.register))
            .collect::<Vec<_>>();

        assert_eq!(registers, vec![("a", 1), ("b", 2), ("c", 3), ("this", 0)]);
        assert_eq!(
            add.parameters
                .iter()
                .map(|parameter| parameter.parameter)
                .collect::<Vec<_>>(),
            vec![Some(1), Some(2)]
        );
        assert!(class.methods[0].is_constructor);
    }

    #[test]
    fn if_and_while_layout() {
        let class = lower(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![main_method(
                    vec![var("i", "int")],
                    vec![
                        assign("i", int(0)),
                        while_loop(
                            binary("<", ident("i"), int(3)),
                            block(vec![if_else(
                                binary("<", ident("i"), int(1)),
                                block(vec![assign("i", binary("+", ident("i"), int(2)))]),
                                block(vec![assign("i", binary("+", ident("i"), int(1)))]),
                            )]),
                        ),
                    ],
                )],
            ),
        ));

        assert_eq!(
            lowered(&class, "main").to_string(),
            indoc! {"
                .method public static main(args.array.String).V {
                    i.i32 :=.i32 0.i32;
                whileCond0:
                    if (i.i32 <.bool 3.i32) goto whileBody0;
                    goto endWhile0;
                whileBody0:
                    if (i.i32 <.bool 1.i32) goto ifTrue0;
                    i.i32 :=.i32 i.i32 +.i32 1.i32;
                    goto endIf0;
                ifTrue0:
                    i.i32 :=.i32 i.i32 +.i32 2.i32;
                endIf0:
                    goto whileCond0;
                endWhile0:
                }
            "}
        );
    }

    #[test]
    fn calls_select_their_invocation_kind() {
        let class = lower(program(
            &["io"],
            class(
                "Sum",
                None,
                vec![var("total", "int")],
                vec![
                    method(
                        "add",
                        ty("int"),
                        vec![param("a", "int"), param("b", "int")],
                        vec![],
                        vec![ret(binary("+", ident("a"), ident("b")))],
                    ),
                    method(
                        "run",
                        ty("void"),
                        vec![],
                        vec![],
                        vec![
                            assign(
                                "total",
                                call(new_object("Sum"), "add", vec![int(2), int(3)]),
                            ),
                            expr(call(ident("io"), "println", vec![ident("total")])),
                        ],
                    ),
                ],
            ),
        ));

        assert_eq!(
            lowered(&class, "run").to_string(),
            indoc! {r#"
                .method public run().V {
                    t0.Sum :=.Sum new(Sum).Sum;
                    invokespecial(t0.Sum, "<init>").V;
                    t1.i32 :=.i32 invokevirtual(t0.Sum, "add", 2.i32, 3.i32).i32;
                    putfield(this, total.i32, t1.i32).V;
                    t2.i32 :=.i32 getfield(this, total.i32).i32;
                    invokestatic(io, "println", t2.i32).V;
                }
            "#}
        );
    }

    #[test]
    fn array_indices_are_atomic() {
        let class = lower(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![method(
                    "bar",
                    ty("int"),
                    vec![param("a", "int[]")],
                    vec![],
                    vec![
                        array_assign("a", binary("+", int(1), int(1)), length(ident("a"))),
                        ret(index(ident("a"), index(ident("a"), int(0)))),
                    ],
                )],
            ),
        ));

        assert_eq!(
            lowered(&class, "bar").to_string(),
            indoc! {"
                .method public bar($1.a.array.i32).i32 {
                    t0.i32 :=.i32 1.i32 +.i32 1.i32;
                    $1.a[t0.i32].i32 :=.i32 arraylength($1.a.array.i32).i32;
                    t1.i32 :=.i32 $1.a[0.i32].i32;
                    ret.i32 $1.a[t1.i32].i32;
                }
            "}
        );
    }
}
