//! OLLIR flavoured listing of the IR. Every operand carries its type as a
//! dotted suffix and parameters are prefixed with their frame slot.

use core::fmt;

use itertools::Itertools;

use crate::middle::ir::{
    Call, Class, Instruction, Label, Literal, Method, Operand, Type, Variable,
};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int32 => write!(f, "i32"),
            Type::Boolean => write!(f, "bool"),
            Type::String => write!(f, "String"),
            Type::Void => write!(f, "V"),
            Type::Array(element) => write!(f, "array.{element}"),
            Type::Object(class) => write!(f, "{class}"),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.id)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.as_int(), self.ty())
    }
}

fn write_prefix(f: &mut fmt::Formatter<'_>, variable: &Variable) -> fmt::Result {
    if let Some(slot) = variable.parameter {
        write!(f, "${slot}.")?;
    }

    write!(f, "{}", variable.name)
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_prefix(f, self)?;
        write!(f, ".{}", self.ty)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Variable(variable) => write!(f, "{variable}"),
            Operand::ArrayElement { array, index } => {
                write_prefix(f, array)?;
                write!(f, "[{index}].{}", array.ty.element())
            }
            Operand::Literal(literal) => write!(f, "{literal}"),
            Operand::This(_) => write!(f, "this"),
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments = |arguments: &[Operand]| {
            arguments
                .iter()
                .map(|argument| format!(", {argument}"))
                .join("")
        };

        match self {
            Call::Virtual {
                receiver,
                method,
                arguments: operands,
                return_type,
            } => write!(
                f,
                "invokevirtual({receiver}, \"{method}\"{}).{return_type}",
                arguments(operands)
            ),
            Call::Static {
                class,
                method,
                arguments: operands,
                return_type,
            } => write!(
                f,
                "invokestatic({class}, \"{method}\"{}).{return_type}",
                arguments(operands)
            ),
            Call::Special { receiver, .. } => write!(f, "invokespecial({receiver}, \"<init>\").V"),
            Call::NewObject { class } => write!(f, "new({class}).{class}"),
            Call::NewArray { element, length } => {
                write!(f, "new(array, {length}).array.{element}")
            }
            Call::ArrayLength { array } => write!(f, "arraylength({array}).i32"),
            Call::LoadConstant(literal) => write!(f, "{literal}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign { destination, value } => {
                write!(f, "{destination} :=.{} {value}", destination.ty())
            }
            Instruction::Call(call) => write!(f, "{call}"),
            Instruction::Goto(label) => write!(f, "goto {label}"),
            Instruction::Branch { condition, target } => {
                write!(f, "if ({condition}) goto {target}")
            }
            Instruction::Return(None) => write!(f, "ret.V"),
            Instruction::Return(Some(value)) => write!(f, "ret.{} {value}", value.ty()),
            Instruction::GetField { field, ty } => write!(f, "getfield(this, {field}.{ty}).{ty}"),
            Instruction::PutField { field, ty, value } => {
                write!(f, "putfield(this, {field}.{ty}, {value}).V")
            }
            Instruction::UnaryOp { operator, operand } => write!(f, "{operator}.bool {operand}"),
            Instruction::BinaryOp { operator, lhs, rhs } => {
                write!(f, "{lhs} {operator}.{} {rhs}", self.ty())
            }
            Instruction::NoOp(operand) => write!(f, "{operand}"),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| format!("{}.{}", parameter.name, parameter.ty))
            .join(", ");

        if self.is_constructor {
            writeln!(f, ".construct {}({parameters}).V {{", self.name)?;
        } else {
            let modifier = if self.is_static { "static " } else { "" };
            writeln!(
                f,
                ".method public {modifier}{}({parameters}).{} {{",
                self.name, self.return_type
            )?;
        }

        for (index, instruction) in self.instructions.iter().enumerate() {
            for label in self.labels_at(index) {
                writeln!(f, "{label}:")?;
            }

            writeln!(f, "    {instruction};")?;
        }

        for label in self.labels_at(self.instructions.len()) {
            writeln!(f, "{label}:")?;
        }

        writeln!(f, "}}")
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            writeln!(f, "import {import};")?;
        }

        if !self.imports.is_empty() {
            writeln!(f)?;
        }

        match &self.superclass {
            Some(superclass) => writeln!(f, "{} extends {superclass} {{", self.name)?,
            None => writeln!(f, "{} {{", self.name)?,
        }

        for field in &self.fields {
            writeln!(f, "    .field public {}.{};", field.name, field.ty)?;
        }

        for method in &self.methods {
            writeln!(f)?;

            for line in method.to_string().lines() {
                writeln!(f, "    {line}")?;
            }
        }

        writeln!(f, "}}")
    }
}
