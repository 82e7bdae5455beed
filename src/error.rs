//! 加载管线的错误类型

use std::fmt;
use thiserror::Error;

/// 文档中的位置（行列均从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// 加载错误
#[derive(Debug, Error)]
pub enum XamlError {
    /// 没有任何资源能解析到该类型，容错模式下也是致命错误
    #[error("No embedded resources found for {0}")]
    DocumentNotFound(String),

    #[error("Parse error: {message} ({position})")]
    Parse { message: String, position: Position },

    #[error("Type {name} not found in xmlns {namespace} ({position})")]
    UnresolvedType {
        namespace: String,
        name: String,
        position: Position,
    },

    #[error("An element with the name \"{name}\" already exists in this NameScope ({position})")]
    DuplicateName { name: String, position: Position },

    #[error("Cannot assign property \"{property}\": {message} ({position})")]
    Coercion {
        property: String,
        message: String,
        position: Position,
    },

    #[error("Cannot evaluate \"{expression}\": {message} ({position})")]
    Expression {
        expression: String,
        message: String,
        position: Position,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl XamlError {
    pub fn parse(message: impl Into<String>, position: Position) -> Self {
        XamlError::Parse {
            message: message.into(),
            position,
        }
    }

    pub fn coercion(property: impl Into<String>, message: impl Into<String>, position: Position) -> Self {
        XamlError::Coercion {
            property: property.into(),
            message: message.into(),
            position,
        }
    }

    pub fn expression(expression: impl Into<String>, message: impl Into<String>, position: Position) -> Self {
        XamlError::Expression {
            expression: expression.into(),
            message: message.into(),
            position,
        }
    }

    /// 容错模式下永远不会降级的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            XamlError::DocumentNotFound(_) | XamlError::Parse { .. } | XamlError::Internal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, XamlError>;
