//! Three-address IR. Control flow is reduced to labels, jumps and
//! conditional branches, and every operand of an instruction is atomic: a
//! variable, an array element, a literal or `this`.

use std::collections::BTreeMap;

use strum::Display;

use crate::{
    frontend::ast::{BinaryOperatorClass, BinaryOperatorKind, UnaryOperatorKind},
    middle::ty::{Arrayness, ResolvedType, TypeName},
};

pub mod ast_lowering;
pub mod pretty_print;

/// Fallback superclass of every class without an `extends` clause
pub const OBJECT_CLASS: &str = "java/lang/Object";

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: String,
    pub superclass: Option<String>,
    /// Dotted import paths
    pub imports: Vec<String>,
    pub fields: Vec<Field>,
    /// The implicit constructor comes first
    pub methods: Vec<Method>,
}

impl Class {
    /// Name of a class as the virtual machine sees it. Imported classes are
    /// qualified with their import path.
    pub fn qualified_name(&self, simple_name: &str) -> String {
        self.imports
            .iter()
            .find(|path| path.rsplit('.').next() == Some(simple_name))
            .map(|path| path.replace('.', "/"))
            .unwrap_or_else(|| simple_name.to_string())
    }

    pub fn qualified_superclass(&self) -> String {
        match &self.superclass {
            Some(superclass) => self.qualified_name(superclass),
            None => OBJECT_CLASS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub is_static: bool,
    pub is_constructor: bool,
    pub parameters: Vec<Variable>,
    pub return_type: Type,
    pub instructions: Vec<Instruction>,
    /// Index of the instruction each label precedes. A label may point one
    /// past the last instruction.
    pub labels: BTreeMap<Label, usize>,
    pub variables: BTreeMap<String, Descriptor>,
}

impl Method {
    /// Indices of the instructions that may run right after `index`
    pub fn successors(&self, index: usize) -> Vec<usize> {
        let successors = match &self.instructions[index] {
            Instruction::Return(_) => Vec::new(),
            Instruction::Goto(label) => vec![self.labels[label]],
            Instruction::Branch { target, .. } => vec![index + 1, self.labels[target]],
            _ => vec![index + 1],
        };

        successors
            .into_iter()
            .filter(|successor| *successor < self.instructions.len())
            .collect()
    }

    /// Labels that precede the instruction at `index`
    pub fn labels_at(&self, index: usize) -> impl Iterator<Item = Label> + '_ {
        self.labels
            .iter()
            .filter(move |(_, position)| **position == index)
            .map(|(label, _)| *label)
    }

    /// Highest register in use, if any
    pub fn max_register(&self) -> Option<usize> {
        self.variables
            .values()
            .map(|descriptor| descriptor.register)
            .max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Local,
    Parameter,
    This,
}

/// Where a variable lives in the frame of a method
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub register: usize,
    pub ty: Type,
    pub scope: VarScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int32,
    Boolean,
    String,
    Void,
    Array(Box<Type>),
    Object(String),
}

impl Type {
    /// Types of values coming out of opaque classes have no IR counterpart
    pub fn from_resolved(ty: &ResolvedType) -> Option<Self> {
        let element = match &ty.name {
            TypeName::Int => Self::Int32,
            TypeName::Boolean => Self::Boolean,
            TypeName::String => Self::String,
            TypeName::Void => Self::Void,
            TypeName::Class(name) => Self::Object(name.clone()),
            TypeName::Any => return None,
        };

        match ty.arrayness {
            Arrayness::Scalar => Some(element),
            Arrayness::Array => Some(Self::Array(Box::new(element))),
            Arrayness::Maybe => None,
        }
    }

    pub fn element(&self) -> Self {
        match self {
            Self::Array(element) => (**element).clone(),
            other => other.clone(),
        }
    }

    /// Whether values of this type are references on the virtual machine
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::String | Self::Array(_) | Self::Object(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    /// Frame slot of a parameter, used as its positional prefix
    pub parameter: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i32),
    Bool(bool),
}

impl Literal {
    pub fn ty(self) -> Type {
        match self {
            Self::Int(_) => Type::Int32,
            Self::Bool(_) => Type::Boolean,
        }
    }

    /// Value as pushed on the operand stack
    pub fn as_int(self) -> i32 {
        match self {
            Self::Int(value) => value,
            Self::Bool(value) => value as i32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Variable(Variable),
    ArrayElement {
        array: Variable,
        index: Box<Operand>,
    },
    Literal(Literal),
    /// Carries the name of the class being compiled
    This(String),
}

impl Operand {
    pub fn ty(&self) -> Type {
        match self {
            Self::Variable(variable) => variable.ty.clone(),
            Self::ArrayElement { array, .. } => array.ty.element(),
            Self::Literal(literal) => literal.ty(),
            Self::This(class) => Type::Object(class.clone()),
        }
    }

    pub fn is_literal(&self, value: i32) -> bool {
        matches!(self, Self::Literal(literal) if literal.as_int() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum LabelKind {
    #[strum(serialize = "ifTrue")]
    IfTrue,
    #[strum(serialize = "endIf")]
    IfEnd,
    #[strum(serialize = "whileCond")]
    WhileCondition,
    #[strum(serialize = "whileBody")]
    WhileBody,
    #[strum(serialize = "endWhile")]
    WhileEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    pub kind: LabelKind,
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Virtual {
        receiver: Operand,
        method: String,
        arguments: Vec<Operand>,
        return_type: Type,
    },
    Static {
        class: String,
        method: String,
        arguments: Vec<Operand>,
        return_type: Type,
    },
    /// Constructor invocation on an already allocated object
    Special {
        receiver: Operand,
        class: String,
    },
    NewObject {
        class: String,
    },
    NewArray {
        element: Type,
        length: Operand,
    },
    ArrayLength {
        array: Operand,
    },
    LoadConstant(Literal),
}

impl Call {
    pub fn return_type(&self) -> Type {
        match self {
            Self::Virtual { return_type, .. } | Self::Static { return_type, .. } => {
                return_type.clone()
            }
            Self::Special { .. } => Type::Void,
            Self::NewObject { class } => Type::Object(class.clone()),
            Self::NewArray { element, .. } => Type::Array(Box::new(element.clone())),
            Self::ArrayLength { .. } => Type::Int32,
            Self::LoadConstant(literal) => literal.ty(),
        }
    }

    /// Operands read by the call, the receiver included
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Self::Virtual {
                receiver,
                arguments,
                ..
            } => [receiver].into_iter().chain(arguments).collect(),
            Self::Static { arguments, .. } => arguments.iter().collect(),
            Self::Special { receiver, .. } => vec![receiver],
            Self::NewArray { length, .. } => vec![length],
            Self::ArrayLength { array } => vec![array],
            Self::NewObject { .. } | Self::LoadConstant(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Assign {
        destination: Operand,
        value: Box<Instruction>,
    },
    Call(Call),
    Goto(Label),
    Branch {
        condition: Box<Instruction>,
        target: Label,
    },
    Return(Option<Operand>),
    /// Read of a field of `this`
    GetField {
        field: String,
        ty: Type,
    },
    /// Write to a field of `this`
    PutField {
        field: String,
        ty: Type,
        value: Operand,
    },
    UnaryOp {
        operator: UnaryOperatorKind,
        operand: Operand,
    },
    BinaryOp {
        operator: BinaryOperatorKind,
        lhs: Operand,
        rhs: Operand,
    },
    NoOp(Operand),
}

impl Instruction {
    /// Type of the value the instruction produces
    pub fn ty(&self) -> Type {
        match self {
            Self::Call(call) => call.return_type(),
            Self::GetField { ty, .. } => ty.clone(),
            Self::UnaryOp { .. } => Type::Boolean,
            Self::BinaryOp { operator, .. } => match operator.class() {
                BinaryOperatorClass::Arithmetic => Type::Int32,
                _ => Type::Boolean,
            },
            Self::NoOp(operand) => operand.ty(),
            Self::Assign { .. }
            | Self::Goto(_)
            | Self::Branch { .. }
            | Self::Return(_)
            | Self::PutField { .. } => Type::Void,
        }
    }
}
