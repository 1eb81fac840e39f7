use core::fmt;

use strum::Display;

use crate::frontend::ast::BinaryOperatorKind;

/// Condition tested by the `if<cond>` and `if_icmp<cond>` families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn from_operator(operator: BinaryOperatorKind) -> Option<Self> {
        match operator {
            BinaryOperatorKind::Equals => Some(Self::Eq),
            BinaryOperatorKind::NotEquals => Some(Self::Ne),
            BinaryOperatorKind::LessThan => Some(Self::Lt),
            BinaryOperatorKind::LessThanOrEqualTo => Some(Self::Le),
            BinaryOperatorKind::GreaterThan => Some(Self::Gt),
            BinaryOperatorKind::GreaterThanOrEqualTo => Some(Self::Ge),
            _ => None,
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
        }
    }

    /// Same test with the operands exchanged: `a < b` is `b > a`
    pub fn swap(self) -> Self {
        match self {
            Self::Eq | Self::Ne => self,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InvocationKind {
    #[strum(serialize = "invokevirtual")]
    Virtual,
    #[strum(serialize = "invokestatic")]
    Static,
    #[strum(serialize = "invokespecial")]
    Special,
}

/// The subset of the virtual machine instruction set the compiler selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JvmInstruction {
    /// `-1..=5`
    Iconst(i32),
    Bipush(i8),
    Sipush(i16),
    Ldc(i32),
    Iload(u16),
    Aload(u16),
    Istore(u16),
    Astore(u16),
    Iaload,
    Iastore,
    Iinc {
        register: u16,
        delta: i8,
    },
    Iadd,
    Isub,
    Imul,
    Idiv,
    Iand,
    Ior,
    If {
        comparison: Comparison,
        label: String,
    },
    IfIcmp {
        comparison: Comparison,
        label: String,
    },
    Goto(String),
    Invoke {
        kind: InvocationKind,
        /// `owner/name`
        target: String,
        descriptor: String,
        arguments: usize,
        returns_value: bool,
    },
    New(String),
    Dup,
    NewIntArray,
    ArrayLength,
    GetField {
        target: String,
        descriptor: String,
    },
    PutField {
        target: String,
        descriptor: String,
    },
    Pop,
    Ireturn,
    Areturn,
    Return,
}

impl JvmInstruction {
    /// Net change of the operand stack depth
    pub fn stack_effect(&self) -> isize {
        match self {
            Self::Iconst(_)
            | Self::Bipush(_)
            | Self::Sipush(_)
            | Self::Ldc(_)
            | Self::Iload(_)
            | Self::Aload(_)
            | Self::New(_)
            | Self::Dup => 1,
            Self::Iinc { .. }
            | Self::Goto(_)
            | Self::NewIntArray
            | Self::ArrayLength
            | Self::GetField { .. }
            | Self::Return => 0,
            Self::Istore(_)
            | Self::Astore(_)
            | Self::Iaload
            | Self::Iadd
            | Self::Isub
            | Self::Imul
            | Self::Idiv
            | Self::Iand
            | Self::Ior
            | Self::If { .. }
            | Self::Pop
            | Self::Ireturn
            | Self::Areturn => -1,
            Self::IfIcmp { .. } | Self::PutField { .. } => -2,
            Self::Iastore => -3,
            Self::Invoke {
                kind,
                arguments,
                returns_value,
                ..
            } => {
                let receiver = usize::from(*kind != InvocationKind::Static);
                *returns_value as isize - (arguments + receiver) as isize
            }
        }
    }
}

fn write_local(f: &mut fmt::Formatter<'_>, mnemonic: &str, register: u16) -> fmt::Result {
    if register <= 3 {
        write!(f, "{mnemonic}_{register}")
    } else {
        write!(f, "{mnemonic} {register}")
    }
}

impl fmt::Display for JvmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iconst(-1) => write!(f, "iconst_m1"),
            Self::Iconst(value) => write!(f, "iconst_{value}"),
            Self::Bipush(value) => write!(f, "bipush {value}"),
            Self::Sipush(value) => write!(f, "sipush {value}"),
            Self::Ldc(value) => write!(f, "ldc {value}"),
            Self::Iload(register) => write_local(f, "iload", *register),
            Self::Aload(register) => write_local(f, "aload", *register),
            Self::Istore(register) => write_local(f, "istore", *register),
            Self::Astore(register) => write_local(f, "astore", *register),
            Self::Iaload => write!(f, "iaload"),
            Self::Iastore => write!(f, "iastore"),
            Self::Iinc { register, delta } => write!(f, "iinc {register} {delta}"),
            Self::Iadd => write!(f, "iadd"),
            Self::Isub => write!(f, "isub"),
            Self::Imul => write!(f, "imul"),
            Self::Idiv => write!(f, "idiv"),
            Self::Iand => write!(f, "iand"),
            Self::Ior => write!(f, "ior"),
            Self::If { comparison, label } => write!(f, "if{comparison} {label}"),
            Self::IfIcmp { comparison, label } => write!(f, "if_icmp{comparison} {label}"),
            Self::Goto(label) => write!(f, "goto {label}"),
            Self::Invoke {
                kind,
                target,
                descriptor,
                ..
            } => write!(f, "{kind} {target}{descriptor}"),
            Self::New(class) => write!(f, "new {class}"),
            Self::Dup => write!(f, "dup"),
            Self::NewIntArray => write!(f, "newarray int"),
            Self::ArrayLength => write!(f, "arraylength"),
            Self::GetField { target, descriptor } => write!(f, "getfield {target} {descriptor}"),
            Self::PutField { target, descriptor } => write!(f, "putfield {target} {descriptor}"),
            Self::Pop => write!(f, "pop"),
            Self::Ireturn => write!(f, "ireturn"),
            Self::Areturn => write!(f, "areturn"),
            Self::Return => write!(f, "return"),
        }
    }
}

/// Text buffer for one method body. Keeps a running operand stack depth so
/// that `.limit stack` can be written once the body is done.
#[derive(Debug, Default)]
pub struct Assembler {
    output: String,
    depth: usize,
    max_depth: usize,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn max_stack(&self) -> usize {
        self.max_depth
    }

    pub fn stack_depth(&self) -> usize {
        self.depth
    }

    /// Used at join points, where the depth is the one of the jump source
    pub fn set_stack_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    fn push_line(&mut self, string: impl AsRef<str>) {
        self.output.push_str(string.as_ref());
        self.output.push('\n');
    }

    /// # Panics
    ///
    /// If `instruction` pops more values than the tracked depth holds, which
    /// means the generator lost count of the operand stack.
    pub fn emit(&mut self, instruction: JvmInstruction) {
        let Some(depth) = self.depth.checked_add_signed(instruction.stack_effect()) else {
            panic!("operand stack underflow at `{instruction}`");
        };

        self.depth = depth;
        self.max_depth = self.max_depth.max(self.depth);

        self.push_line(format!("    {instruction}"));
    }

    pub fn label(&mut self, name: impl AsRef<str>) {
        self.push_line(format!("{}:", name.as_ref()));
    }

    /// Smallest encoding able to push `value`
    pub fn load_integer(&mut self, value: i32) {
        let instruction = if (-1..=5).contains(&value) {
            JvmInstruction::Iconst(value)
        } else if let Ok(value) = i8::try_from(value) {
            JvmInstruction::Bipush(value)
        } else if let Ok(value) = i16::try_from(value) {
            JvmInstruction::Sipush(value)
        } else {
            JvmInstruction::Ldc(value)
        };

        self.emit(instruction);
    }
}
