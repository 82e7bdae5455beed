//! 标记文档与标记扩展解析器

pub mod extension;
pub mod markup;
pub mod tree;

pub use extension::{parse_markup_text, Expression, ExpressionParser, ExtensionArg, MarkupText};
pub use markup::MarkupParser;
pub use tree::{AttrValue, Attribute, MarkupTypeName, Node, NodeId, NodeKind, NodeTree, XmlName};
