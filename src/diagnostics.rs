//! Errors reported to the caller of the pipeline.
//!
//! Every stage has its own error enum. A [`Diagnostic`] ties one of them to a
//! position in the source so the driver can print it. Stages never abort the
//! process, they hand their diagnostics back and the pipeline decides whether
//! to continue.

use colored::Colorize;
use strum::Display;
use thiserror::Error;

use crate::{frontend::ast::Span, middle::ty::ResolvedType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Syntactic,
    Semantic,
    Optimization,
    Generation,
}

/// Problems with the tree handed over by the parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("malformed tree document: {0}")]
    MalformedDocument(String),
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
    #[error("`{kind}` node is missing the `{attribute}` attribute")]
    MissingAttribute { kind: String, attribute: String },
    #[error("`{kind}` node has an invalid `{attribute}` attribute: {reason}")]
    InvalidAttribute {
        kind: String,
        attribute: String,
        reason: String,
    },
    #[error("`{kind}` node expects {expected} children but has {found}")]
    UnexpectedArity {
        kind: String,
        expected: String,
        found: usize,
    },
    #[error("expected {expected} but found a `{found}` node")]
    UnexpectedNode { expected: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("import `{0}` is already declared")]
    DuplicateImport(String),
    #[error("class `{0}` has the same name as an import")]
    ClassNameConflict(String),
    #[error("superclass `{0}` is not imported")]
    UnknownSuperclass(String),
    #[error("variable `{0}` is already declared in this scope")]
    VariableRedeclared(String),
    #[error("method `{0}` is already declared")]
    MethodRedeclared(String),
    #[error("type `{0}` does not exist")]
    InvalidType(String),
    #[error("`main` must take a single `String[]` parameter, found `{0}`")]
    InvalidMainParameter(ResolvedType),
    #[error("cannot find variable `{0}` in this scope")]
    UndeclaredVariable(String),
    #[error("`this` cannot be used inside of a static method")]
    IllegalThisInStaticContext,
    #[error("method `{0}` is not declared by this class")]
    UndeclaredMethod(String),
    #[error("method `{method}` takes {expected} arguments but {found} were supplied")]
    ArgumentCountMismatch {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("argument {position} of `{method}` should be `{expected}` but found `{found}`")]
    ArgumentTypeMismatch {
        method: String,
        position: usize,
        expected: ResolvedType,
        found: ResolvedType,
    },
    #[error("operator `{operator}` expects operands of type `{expected}` but found `{found}`")]
    OperandTypeMismatch {
        operator: String,
        expected: ResolvedType,
        found: ResolvedType,
    },
    #[error("operator `{operator}` cannot compare `{lhs}` with `{rhs}`")]
    IncomparableOperands {
        operator: String,
        lhs: ResolvedType,
        rhs: ResolvedType,
    },
    #[error("cannot assign a value of type `{found}` to `{target}` of type `{expected}`")]
    IncompatibleAssignment {
        target: String,
        expected: ResolvedType,
        found: ResolvedType,
    },
    #[error("condition must be of type `boolean` but found `{0}`")]
    ConditionNotBoolean(ResolvedType),
    #[error("cannot index into a value of type `{0}`")]
    NotAnArray(ResolvedType),
    #[error("array index must be of type `int` but found `{0}`")]
    IndexNotInt(ResolvedType),
    #[error("array size must be of type `int` but found `{0}`")]
    ArraySizeNotInt(ResolvedType),
    #[error("method `{method}` must end by returning a value of type `{expected}`")]
    MissingReturn {
        method: String,
        expected: ResolvedType,
    },
    #[error("method `{method}` should return `{expected}` but returns `{found}`")]
    ReturnTypeMismatch {
        method: String,
        expected: ResolvedType,
        found: ResolvedType,
    },
    #[error("method `{0}` returns `void` and cannot return a value")]
    ReturnFromVoid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizationError {
    #[error(
        "method `{method}` needs {required} registers but at most {maximum} may be used"
    )]
    RegisterBudgetExceeded {
        method: String,
        required: usize,
        maximum: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("cannot generate code for `{0}`")]
    UnsupportedInstruction(String),
    #[error("only `int` arrays can be created, found an array of `{0}`")]
    UnsupportedArrayElement(String),
    #[error("cannot {action} a value of type `{ty}`")]
    UnsupportedType { action: &'static str, ty: String },
    #[error("variable `{0}` has no register assigned")]
    UnknownVariable(String),
    #[error("{what} {value} does not fit in its instruction encoding")]
    EncodingRange { what: &'static str, value: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Optimization(#[from] OptimizationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} error at {span}: {error}")]
pub struct Diagnostic {
    pub span: Span,
    pub error: CompileError,
    stage: Stage,
}

impl Diagnostic {
    pub fn new(span: Span, error: impl Into<CompileError>) -> Self {
        let error = error.into();

        let stage = match error {
            CompileError::Syntax(_) => Stage::Syntactic,
            CompileError::Semantic(_) => Stage::Semantic,
            CompileError::Optimization(_) => Stage::Optimization,
            CompileError::Generation(_) => Stage::Generation,
        };

        Self { span, error, stage }
    }

    /// For problems that concern the whole compilation unit
    pub fn unpositioned(error: impl Into<CompileError>) -> Self {
        Self::new(Span::UNKNOWN, error)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Formats the diagnostic for a terminal
    pub fn render(&self, file_name: &str) -> String {
        let location = if self.span.is_unknown() {
            file_name.to_string()
        } else {
            format!("{file_name}:{}", self.span)
        };

        format!(
            "{}: {}\n  {} {}",
            format!("{} error", self.stage).red().bold(),
            self.message().bold(),
            "-->".blue().bold(),
            location.dimmed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn stage_follows_error_family() {
        let diagnostic = Diagnostic::new(
            Span::new(3, 4),
            SemanticError::UndeclaredVariable("x".into()),
        );

        assert_eq!(diagnostic.stage(), Stage::Semantic);
        assert_eq!(diagnostic.message(), "cannot find variable `x` in this scope");
        assert_eq!(
            diagnostic.to_string(),
            "semantic error at 3:4: cannot find variable `x` in this scope"
        );
    }

    #[test]
    fn unpositioned_diagnostics_use_the_unknown_span() {
        let diagnostic = Diagnostic::unpositioned(OptimizationError::RegisterBudgetExceeded {
            method: "foo".into(),
            required: 3,
            maximum: 1,
        });

        assert_eq!(diagnostic.stage(), Stage::Optimization);
        assert!(diagnostic.span.is_unknown());
        assert!(diagnostic.to_string().contains("<unknown>"));
    }

    #[test]
    fn render_mentions_location_and_message() {
        colored::control::set_override(false);

        let diagnostic = Diagnostic::new(
            Span::new(7, 1),
            GenerationError::UnknownVariable("t0".into()),
        );

        assert_eq!(
            diagnostic.render("Sum.json"),
            "generation error: variable `t0` has no register assigned\n  --> Sum.json:7:1"
        );
    }
}
