use itertools::Itertools;

use crate::{
    backend::{
        assemblers::jasmin::{Assembler, Comparison, InvocationKind, JvmInstruction},
        targets::CodeGenerator,
    },
    diagnostics::GenerationError,
    frontend::ast::{BinaryOperatorClass, BinaryOperatorKind},
    middle::ir,
};

pub struct CodeGeneratorJasmin;

impl CodeGenerator for CodeGeneratorJasmin {
    fn translate_to_asm(&self, class: &ir::Class) -> Result<String, GenerationError> {
        let mut output = format!(
            ".class public {}\n.super {}\n",
            class.name,
            class.qualified_superclass()
        );

        if !class.fields.is_empty() {
            output.push('\n');
        }

        for field in &class.fields {
            output.push_str(&format!(
                ".field public {} {}\n",
                field.name,
                descriptor(class, &field.ty)
            ));
        }

        // synthesized comparison labels are numbered across the whole class
        let mut comparisons = 0;

        for method in &class.methods {
            output.push('\n');
            output.push_str(&codegen_method(class, method, &mut comparisons)?);
        }

        Ok(output)
    }
}

fn descriptor(class: &ir::Class, ty: &ir::Type) -> String {
    match ty {
        ir::Type::Int32 => "I".to_string(),
        ir::Type::Boolean => "Z".to_string(),
        ir::Type::String => "Ljava/lang/String;".to_string(),
        ir::Type::Void => "V".to_string(),
        ir::Type::Array(element) => format!("[{}", descriptor(class, element)),
        ir::Type::Object(name) => format!("L{};", class.qualified_name(name)),
    }
}

fn codegen_method(
    class: &ir::Class,
    method: &ir::Method,
    comparisons: &mut u32,
) -> Result<String, GenerationError> {
    let mut generator = MethodGenerator {
        class,
        method,
        assembler: Assembler::new(),
        comparisons,
    };
    generator.body()?;

    let max_stack = generator.assembler.max_stack();
    let body = generator.assembler.into_output();
    let max_locals = method.max_register().map_or(0, |register| register + 1);

    tracing::debug!(method = %method.name, max_stack, max_locals, "emitted method");

    let name = if method.is_constructor {
        "<init>"
    } else {
        method.name.as_str()
    };
    let modifier = if method.is_static { "static " } else { "" };
    let parameters = method
        .parameters
        .iter()
        .map(|parameter| descriptor(class, &parameter.ty))
        .join("");

    Ok(format!(
        ".method public {modifier}{name}({parameters}){}\n    .limit stack {max_stack}\n    .limit locals {max_locals}\n{body}.end method\n",
        descriptor(class, &method.return_type)
    ))
}

struct MethodGenerator<'a> {
    class: &'a ir::Class,
    method: &'a ir::Method,
    assembler: Assembler,
    comparisons: &'a mut u32,
}

impl MethodGenerator<'_> {
    fn body(&mut self) -> Result<(), GenerationError> {
        let method = self.method;

        let mut index = 0;
        while index < method.instructions.len() {
            for label in method.labels_at(index) {
                self.assembler.label(label.to_string());
            }

            if self.construct_in_place(index)? {
                index += 2;
                continue;
            }

            self.statement(&method.instructions[index])?;
            index += 1;
        }

        let trailing_labels = method
            .labels_at(method.instructions.len())
            .collect::<Vec<_>>();
        for label in &trailing_labels {
            self.assembler.label(label.to_string());
        }

        let ends_in_return = matches!(method.instructions.last(), Some(ir::Instruction::Return(_)));
        if method.return_type == ir::Type::Void && (!ends_in_return || !trailing_labels.is_empty()) {
            self.assembler.emit(JvmInstruction::Return);
        }

        Ok(())
    }

    /// `t := new(C); invokespecial(t, "<init>")` is emitted as
    /// `new C; dup; invokespecial C/<init>()V; astore t`, so that the
    /// uninitialized object never lives in a local.
    fn construct_in_place(&mut self, index: usize) -> Result<bool, GenerationError> {
        let method = self.method;

        let (
            Some(ir::Instruction::Assign {
                destination: ir::Operand::Variable(object),
                value,
            }),
            Some(ir::Instruction::Call(ir::Call::Special {
                receiver: ir::Operand::Variable(receiver),
                ..
            })),
        ) = (method.instructions.get(index), method.instructions.get(index + 1))
        else {
            return Ok(false);
        };

        let ir::Instruction::Call(ir::Call::NewObject { class }) = value.as_ref() else {
            return Ok(false);
        };

        if object.name != receiver.name || method.labels_at(index + 1).next().is_some() {
            return Ok(false);
        }

        let class = self.class.qualified_name(class);
        self.assembler.emit(JvmInstruction::New(class.clone()));
        self.assembler.emit(JvmInstruction::Dup);
        self.assembler.emit(JvmInstruction::Invoke {
            kind: InvocationKind::Special,
            target: format!("{class}/<init>"),
            descriptor: "()V".to_string(),
            arguments: 0,
            returns_value: false,
        });
        self.store(object)?;

        Ok(true)
    }

    fn statement(&mut self, instruction: &ir::Instruction) -> Result<(), GenerationError> {
        match instruction {
            ir::Instruction::Assign { destination, value } => self.assign(destination, value)?,
            ir::Instruction::Call(call) => {
                if self.call(call)? {
                    self.assembler.emit(JvmInstruction::Pop);
                }
            }
            ir::Instruction::Goto(label) => {
                self.assembler.emit(JvmInstruction::Goto(label.to_string()));
            }
            ir::Instruction::Branch { condition, target } => {
                self.branch(condition, &target.to_string())?;
            }
            ir::Instruction::Return(None) => self.assembler.emit(JvmInstruction::Return),
            ir::Instruction::Return(Some(value)) => {
                self.load_operand(value)?;

                let ty = value.ty();
                self.assembler.emit(match ty {
                    ir::Type::Void => {
                        return Err(GenerationError::UnsupportedType {
                            action: "return",
                            ty: ty.to_string(),
                        });
                    }
                    ty if ty.is_reference() => JvmInstruction::Areturn,
                    _ => JvmInstruction::Ireturn,
                });
            }
            ir::Instruction::PutField { field, ty, value } => {
                self.assembler.emit(JvmInstruction::Aload(0));
                self.load_operand(value)?;
                self.assembler.emit(JvmInstruction::PutField {
                    target: format!("{}/{field}", self.class.name),
                    descriptor: descriptor(self.class, ty),
                });
            }
            // a value nobody reads
            other => {
                self.value(other)?;
                self.assembler.emit(JvmInstruction::Pop);
            }
        }

        Ok(())
    }

    fn assign(
        &mut self,
        destination: &ir::Operand,
        value: &ir::Instruction,
    ) -> Result<(), GenerationError> {
        match destination {
            ir::Operand::Variable(variable) => {
                if let Some(delta) = increment(variable, value)? {
                    let register = self.register(variable)?;
                    self.assembler
                        .emit(JvmInstruction::Iinc { register, delta });
                    return Ok(());
                }

                self.value(value)?;
                self.store(variable)
            }
            ir::Operand::ArrayElement { array, index } => {
                check_element(array)?;
                self.load_variable(array)?;
                self.load_operand(index)?;
                self.value(value)?;
                self.assembler.emit(JvmInstruction::Iastore);
                Ok(())
            }
            other => Err(GenerationError::UnsupportedInstruction(format!(
                "{other} := {value}"
            ))),
        }
    }

    /// Pushes exactly one value
    fn value(&mut self, instruction: &ir::Instruction) -> Result<(), GenerationError> {
        match instruction {
            ir::Instruction::NoOp(operand) => self.load_operand(operand)?,
            ir::Instruction::Call(call) => {
                let ty = call.return_type();
                if ty == ir::Type::Void {
                    return Err(GenerationError::UnsupportedType {
                        action: "materialize",
                        ty: ty.to_string(),
                    });
                }

                self.call(call)?;
            }
            ir::Instruction::GetField { field, ty } => {
                self.assembler.emit(JvmInstruction::Aload(0));
                self.assembler.emit(JvmInstruction::GetField {
                    target: format!("{}/{field}", self.class.name),
                    descriptor: descriptor(self.class, ty),
                });
            }
            ir::Instruction::BinaryOp { operator, lhs, rhs } => match operator.class() {
                BinaryOperatorClass::Arithmetic | BinaryOperatorClass::Logical => {
                    self.load_operand(lhs)?;
                    self.load_operand(rhs)?;
                    self.assembler.emit(match operator {
                        BinaryOperatorKind::Add => JvmInstruction::Iadd,
                        BinaryOperatorKind::Subtract => JvmInstruction::Isub,
                        BinaryOperatorKind::Multiply => JvmInstruction::Imul,
                        BinaryOperatorKind::Divide => JvmInstruction::Idiv,
                        BinaryOperatorKind::LogicalAnd => JvmInstruction::Iand,
                        BinaryOperatorKind::LogicalOr => JvmInstruction::Ior,
                        other => unreachable!("{other} is not arithmetic or logical"),
                    });
                }
                BinaryOperatorClass::Relational | BinaryOperatorClass::Equality => {
                    let comparison = Comparison::from_operator(*operator).ok_or_else(|| {
                        GenerationError::UnsupportedInstruction(instruction.to_string())
                    })?;

                    self.synthesize_boolean(|this, if_false| {
                        this.compare_and_jump(comparison.negate(), lhs, rhs, if_false)
                    })?;
                }
            },
            ir::Instruction::UnaryOp { operand, .. } => {
                self.synthesize_boolean(|this, if_false| {
                    this.load_operand(operand)?;
                    this.assembler.emit(JvmInstruction::If {
                        comparison: Comparison::Ne,
                        label: if_false.to_string(),
                    });
                    Ok(())
                })?;
            }
            other => return Err(GenerationError::UnsupportedInstruction(other.to_string())),
        }

        Ok(())
    }

    /// `if<negated> Lfalse; iconst_1; goto Lend; Lfalse: iconst_0; Lend:`
    fn synthesize_boolean(
        &mut self,
        jump_if_false: impl FnOnce(&mut Self, &str) -> Result<(), GenerationError>,
    ) -> Result<(), GenerationError> {
        let id = *self.comparisons;
        *self.comparisons += 1;

        let if_false = format!("cmpFalse{id}");
        let end = format!("cmpEnd{id}");

        jump_if_false(self, &if_false)?;

        let depth = self.assembler.stack_depth();
        self.assembler.emit(JvmInstruction::Iconst(1));
        self.assembler.emit(JvmInstruction::Goto(end.clone()));

        self.assembler.label(&if_false);
        self.assembler.set_stack_depth(depth);
        self.assembler.emit(JvmInstruction::Iconst(0));

        self.assembler.label(end);

        Ok(())
    }

    /// Jumps to `label` when `lhs <comparison> rhs` holds. A literal zero on
    /// either side uses the single operand form.
    fn compare_and_jump(
        &mut self,
        comparison: Comparison,
        lhs: &ir::Operand,
        rhs: &ir::Operand,
        label: &str,
    ) -> Result<(), GenerationError> {
        let label = label.to_string();

        let instruction = if rhs.is_literal(0) {
            self.load_operand(lhs)?;
            JvmInstruction::If { comparison, label }
        } else if lhs.is_literal(0) {
            self.load_operand(rhs)?;
            JvmInstruction::If {
                comparison: comparison.swap(),
                label,
            }
        } else {
            self.load_operand(lhs)?;
            self.load_operand(rhs)?;
            JvmInstruction::IfIcmp { comparison, label }
        };

        self.assembler.emit(instruction);

        Ok(())
    }

    fn branch(&mut self, condition: &ir::Instruction, label: &str) -> Result<(), GenerationError> {
        match condition {
            ir::Instruction::BinaryOp { operator, lhs, rhs } => {
                if let Some(comparison) = Comparison::from_operator(*operator) {
                    return self.compare_and_jump(comparison, lhs, rhs, label);
                }
            }
            ir::Instruction::UnaryOp { operand, .. } => {
                self.load_operand(operand)?;
                self.assembler.emit(JvmInstruction::If {
                    comparison: Comparison::Eq,
                    label: label.to_string(),
                });
                return Ok(());
            }
            _ => {}
        }

        self.value(condition)?;
        self.assembler.emit(JvmInstruction::If {
            comparison: Comparison::Ne,
            label: label.to_string(),
        });

        Ok(())
    }

    /// Emits the call and reports whether it left a value on the stack
    fn call(&mut self, call: &ir::Call) -> Result<bool, GenerationError> {
        match call {
            ir::Call::Virtual {
                receiver,
                method,
                arguments,
                return_type,
            } => {
                let owner = match receiver.ty() {
                    ir::Type::Object(class) => self.class.qualified_name(&class),
                    other => {
                        return Err(GenerationError::UnsupportedType {
                            action: "invoke a method on",
                            ty: other.to_string(),
                        });
                    }
                };

                self.load_operand(receiver)?;
                self.invoke(InvocationKind::Virtual, &owner, method, arguments, return_type)?;
            }
            ir::Call::Static {
                class,
                method,
                arguments,
                return_type,
            } => {
                let owner = self.class.qualified_name(class);
                self.invoke(InvocationKind::Static, &owner, method, arguments, return_type)?;
            }
            ir::Call::Special { receiver, class } => {
                self.load_operand(receiver)?;
                self.assembler.emit(JvmInstruction::Invoke {
                    kind: InvocationKind::Special,
                    target: format!("{}/<init>", self.class.qualified_name(class)),
                    descriptor: "()V".to_string(),
                    arguments: 0,
                    returns_value: false,
                });
            }
            ir::Call::NewObject { class } => {
                self.assembler
                    .emit(JvmInstruction::New(self.class.qualified_name(class)));
            }
            ir::Call::NewArray { element, length } => {
                if *element != ir::Type::Int32 {
                    return Err(GenerationError::UnsupportedArrayElement(element.to_string()));
                }

                self.load_operand(length)?;
                self.assembler.emit(JvmInstruction::NewIntArray);
            }
            ir::Call::ArrayLength { array } => {
                self.load_operand(array)?;
                self.assembler.emit(JvmInstruction::ArrayLength);
            }
            ir::Call::LoadConstant(literal) => self.assembler.load_integer(literal.as_int()),
        }

        Ok(call.return_type() != ir::Type::Void)
    }

    fn invoke(
        &mut self,
        kind: InvocationKind,
        owner: &str,
        method: &str,
        arguments: &[ir::Operand],
        return_type: &ir::Type,
    ) -> Result<(), GenerationError> {
        for argument in arguments {
            self.load_operand(argument)?;
        }

        // methods of the class itself use their declared signature
        let declared = (owner == self.class.name)
            .then(|| {
                self.class
                    .methods
                    .iter()
                    .find(|candidate| !candidate.is_constructor && candidate.name == method)
            })
            .flatten();

        let parameters = match declared {
            Some(declared) => declared
                .parameters
                .iter()
                .map(|parameter| descriptor(self.class, &parameter.ty))
                .join(""),
            None => arguments
                .iter()
                .map(|argument| descriptor(self.class, &argument.ty()))
                .join(""),
        };

        self.assembler.emit(JvmInstruction::Invoke {
            kind,
            target: format!("{owner}/{method}"),
            descriptor: format!("({parameters}){}", descriptor(self.class, return_type)),
            arguments: arguments.len(),
            returns_value: *return_type != ir::Type::Void,
        });

        Ok(())
    }

    fn load_operand(&mut self, operand: &ir::Operand) -> Result<(), GenerationError> {
        match operand {
            ir::Operand::Variable(variable) => self.load_variable(variable)?,
            ir::Operand::ArrayElement { array, index } => {
                check_element(array)?;
                self.load_variable(array)?;
                self.load_operand(index)?;
                self.assembler.emit(JvmInstruction::Iaload);
            }
            ir::Operand::Literal(literal) => self.assembler.load_integer(literal.as_int()),
            ir::Operand::This(_) => self.assembler.emit(JvmInstruction::Aload(0)),
        }

        Ok(())
    }

    fn register(&self, variable: &ir::Variable) -> Result<u16, GenerationError> {
        let descriptor = self
            .method
            .variables
            .get(&variable.name)
            .ok_or_else(|| GenerationError::UnknownVariable(variable.name.clone()))?;

        u16::try_from(descriptor.register).map_err(|_| GenerationError::EncodingRange {
            what: "local variable slot",
            value: descriptor.register as i64,
        })
    }

    fn load_variable(&mut self, variable: &ir::Variable) -> Result<(), GenerationError> {
        let register = self.register(variable)?;

        self.assembler.emit(match &variable.ty {
            ir::Type::Void => {
                return Err(GenerationError::UnsupportedType {
                    action: "load",
                    ty: variable.ty.to_string(),
                });
            }
            ty if ty.is_reference() => JvmInstruction::Aload(register),
            _ => JvmInstruction::Iload(register),
        });

        Ok(())
    }

    fn store(&mut self, variable: &ir::Variable) -> Result<(), GenerationError> {
        let register = self.register(variable)?;

        self.assembler.emit(match &variable.ty {
            ir::Type::Void => {
                return Err(GenerationError::UnsupportedType {
                    action: "store",
                    ty: variable.ty.to_string(),
                });
            }
            ty if ty.is_reference() => JvmInstruction::Astore(register),
            _ => JvmInstruction::Istore(register),
        });

        Ok(())
    }
}

/// `x := x + k`, `x := k + x` and `x := x - k`. The resulting delta must fit
/// the signed byte operand of `iinc`.
fn increment(
    variable: &ir::Variable,
    value: &ir::Instruction,
) -> Result<Option<i8>, GenerationError> {
    let ir::Instruction::BinaryOp { operator, lhs, rhs } = value else {
        return Ok(None);
    };

    if variable.ty != ir::Type::Int32 {
        return Ok(None);
    }

    let is_target =
        |operand: &ir::Operand| matches!(operand, ir::Operand::Variable(other) if other.name == variable.name);

    let delta = match (operator, lhs, rhs) {
        (BinaryOperatorKind::Add, lhs, ir::Operand::Literal(ir::Literal::Int(k))) if is_target(lhs) => {
            i64::from(*k)
        }
        (BinaryOperatorKind::Add, ir::Operand::Literal(ir::Literal::Int(k)), rhs) if is_target(rhs) => {
            i64::from(*k)
        }
        (BinaryOperatorKind::Subtract, lhs, ir::Operand::Literal(ir::Literal::Int(k))) if is_target(lhs) => {
            -i64::from(*k)
        }
        _ => return Ok(None),
    };

    i8::try_from(delta)
        .map(Some)
        .map_err(|_| GenerationError::EncodingRange {
            what: "increment",
            value: delta,
        })
}

fn check_element(array: &ir::Variable) -> Result<(), GenerationError> {
    match array.ty.element() {
        ir::Type::Int32 => Ok(()),
        other => Err(GenerationError::UnsupportedArrayElement(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        frontend::interchange::RawNode,
        middle::ir::{Descriptor, VarScope, ast_lowering::lower_to_ir},
        test_helpers::*,
    };

    fn emit(program: RawNode) -> String {
        let (ast, table) = analyzed(program);
        CodeGeneratorJasmin
            .translate_to_asm(&lower_to_ir(&ast, &table))
            .unwrap()
    }

    /// The section of `listing` that belongs to `name`
    fn section(listing: &str, name: &str) -> String {
        listing
            .split("\n\n")
            .find(|section| {
                section
                    .lines()
                    .next()
                    .is_some_and(|header| header.contains(&format!(" {name}(")))
            })
            .map(|section| format!("{}\n", section.trim_end()))
            .unwrap_or_default()
    }

    #[test]
    fn class_with_constructor_fields_and_calls() {
        let listing = emit(program(
            &[],
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
                        vec![assign(
                            "total",
                            call(new_object("Sum"), "add", vec![int(2), int(3)]),
                        )],
                    ),
                ],
            ),
        ));

        assert_eq!(
            listing,
            indoc! {"
                .class public Sum
                .super java/lang/Object

                .field public total I

                .method public <init>()V
                    .limit stack 1
                    .limit locals 1
                    aload_0
                    invokespecial java/lang/Object/<init>()V
                    return
                .end method

                .method public add(II)I
                    .limit stack 2
                    .limit locals 4
                    iload_1
                    iload_2
                    iadd
                    istore_3
                    iload_3
                    ireturn
                .end method

                .method public run()V
                    .limit stack 3
                    .limit locals 3
                    new Sum
                    dup
                    invokespecial Sum/<init>()V
                    astore_1
                    aload_1
                    iconst_2
                    iconst_3
                    invokevirtual Sum/add(II)I
                    istore_2
                    aload_0
                    iload_2
                    putfield Sum/total I
                    return
                .end method
            "}
        );
    }

    #[test]
    fn loops_branch_on_comparisons_and_increment_in_place() {
        let listing = emit(program(
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
                                block(vec![assign("i", binary("*", ident("i"), int(200)))]),
                            )]),
                        ),
                    ],
                )],
            ),
        ));

        assert_eq!(
            section(&listing, "main"),
            indoc! {"
                .method public static main([Ljava/lang/String;)V
                    .limit stack 2
                    .limit locals 2
                    iconst_0
                    istore_1
                whileCond0:
                    iload_1
                    iconst_3
                    if_icmplt whileBody0
                    goto endWhile0
                whileBody0:
                    iload_1
                    iconst_1
                    if_icmplt ifTrue0
                    iload_1
                    sipush 200
                    imul
                    istore_1
                    goto endIf0
                ifTrue0:
                    iinc 1 2
                endIf0:
                    goto whileCond0
                endWhile0:
                    return
                .end method
            "}
        );
    }

    #[test]
    fn boolean_values_are_synthesized_with_jumps() {
        let listing = emit(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![method(
                    "check",
                    ty("boolean"),
                    vec![param("n", "int")],
                    vec![var("b", "boolean")],
                    vec![
                        assign("b", binary("<", int(0), ident("n"))),
                        ret(not(ident("b"))),
                    ],
                )],
            ),
        ));

        assert_eq!(
            section(&listing, "check"),
            indoc! {"
                .method public check(I)Z
                    .limit stack 1
                    .limit locals 4
                    iload_1
                    ifle cmpFalse0
                    iconst_1
                    goto cmpEnd0
                cmpFalse0:
                    iconst_0
                cmpEnd0:
                    istore_2
                    iload_2
                    ifne cmpFalse1
                    iconst_1
                    goto cmpEnd1
                cmpFalse1:
                    iconst_0
                cmpEnd1:
                    istore_3
                    iload_3
                    ireturn
                .end method
            "}
        );
    }

    #[test]
    fn discarded_results_are_popped() {
        let listing = emit(program(
            &["io"],
            class(
                "Foo",
                None,
                vec![],
                vec![
                    method("one", ty("int"), vec![], vec![], vec![ret(int(1))]),
                    method(
                        "run",
                        ty("void"),
                        vec![],
                        vec![],
                        vec![
                            expr(call(this(), "one", vec![])),
                            expr(call(ident("io"), "println", vec![int(7)])),
                        ],
                    ),
                ],
            ),
        ));

        assert_eq!(
            section(&listing, "run"),
            indoc! {"
                .method public run()V
                    .limit stack 1
                    .limit locals 1
                    aload_0
                    invokevirtual Foo/one()I
                    pop
                    bipush 7
                    invokestatic io/println(I)V
                    return
                .end method
            "}
        );
    }

    fn bare_method(instructions: Vec<ir::Instruction>, variables: &[(&str, usize, ir::Type)]) -> ir::Class {
        ir::Class {
            name: "Foo".into(),
            superclass: None,
            imports: vec![],
            fields: vec![],
            methods: vec![ir::Method {
                name: "bar".into(),
                is_static: true,
                is_constructor: false,
                parameters: vec![],
                return_type: ir::Type::Void,
                instructions,
                labels: BTreeMap::new(),
                variables: variables
                    .iter()
                    .map(|(name, register, ty)| {
                        (
                            name.to_string(),
                            Descriptor {
                                register: *register,
                                ty: ty.clone(),
                                scope: VarScope::Local,
                            },
                        )
                    })
                    .collect(),
            }],
        }
    }

    fn local(name: &str, ty: ir::Type) -> ir::Variable {
        ir::Variable {
            name: name.into(),
            ty,
            parameter: None,
        }
    }

    #[test]
    fn unsupported_shapes_fail_generation() {
        let flags = local("flags", ir::Type::Array(Box::new(ir::Type::Boolean)));
        let class = bare_method(
            vec![ir::Instruction::Assign {
                destination: ir::Operand::Variable(flags.clone()),
                value: Box::new(ir::Instruction::Call(ir::Call::NewArray {
                    element: ir::Type::Boolean,
                    length: ir::Operand::Literal(ir::Literal::Int(2)),
                })),
            }],
            &[("flags", 0, flags.ty.clone())],
        );

        assert_eq!(
            CodeGeneratorJasmin.translate_to_asm(&class),
            Err(GenerationError::UnsupportedArrayElement("bool".into()))
        );

        let class = bare_method(
            vec![ir::Instruction::Return(Some(ir::Operand::Variable(local(
                "ghost",
                ir::Type::Int32,
            ))))],
            &[],
        );

        assert_eq!(
            CodeGeneratorJasmin.translate_to_asm(&class),
            Err(GenerationError::UnknownVariable("ghost".into()))
        );
    }

    fn step(variable: &ir::Variable, operator: BinaryOperatorKind, delta: i32) -> ir::Instruction {
        ir::Instruction::Assign {
            destination: ir::Operand::Variable(variable.clone()),
            value: Box::new(ir::Instruction::BinaryOp {
                operator,
                lhs: ir::Operand::Variable(variable.clone()),
                rhs: ir::Operand::Literal(ir::Literal::Int(delta)),
            }),
        }
    }

    #[test]
    fn increments_use_the_signed_byte_range() {
        let x = local("x", ir::Type::Int32);
        let class = bare_method(
            vec![
                step(&x, BinaryOperatorKind::Add, 127),
                step(&x, BinaryOperatorKind::Subtract, 128),
            ],
            &[("x", 1, ir::Type::Int32)],
        );

        let listing = CodeGeneratorJasmin.translate_to_asm(&class).unwrap();
        assert!(listing.contains("    iinc 1 127\n    iinc 1 -128\n"), "{listing}");

        for (operator, delta, value) in [
            (BinaryOperatorKind::Add, 200, 200),
            (BinaryOperatorKind::Add, 128, 128),
            (BinaryOperatorKind::Subtract, 129, -129),
        ] {
            let class = bare_method(vec![step(&x, operator, delta)], &[("x", 1, ir::Type::Int32)]);

            assert_eq!(
                CodeGeneratorJasmin.translate_to_asm(&class),
                Err(GenerationError::EncodingRange {
                    what: "increment",
                    value,
                })
            );
        }
    }

    #[test]
    fn slots_beyond_the_wide_encoding_fail_generation() {
        let x = local("x", ir::Type::Int32);
        let class = bare_method(
            vec![ir::Instruction::Assign {
                destination: ir::Operand::Variable(x.clone()),
                value: Box::new(ir::Instruction::Call(ir::Call::LoadConstant(ir::Literal::Int(1)))),
            }],
            &[("x", 70_000, ir::Type::Int32)],
        );

        assert_eq!(
            CodeGeneratorJasmin.translate_to_asm(&class),
            Err(GenerationError::EncodingRange {
                what: "local variable slot",
                value: 70_000,
            })
        );
    }
}
