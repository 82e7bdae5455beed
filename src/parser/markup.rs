//! 标记文档解析器 - 把文本解析成带命名空间的节点树

use crate::error::{Position, Result, XamlError};
use crate::parser::tree::{
    is_xaml_namespace, AttrValue, Attribute, MarkupTypeName, Node, NodeId, NodeKind, NodeTree,
    XmlName, MARKUP_COMPATIBILITY,
};
use crate::runtime::ObjectRef;
use tracing::{debug, warn};

/// 读到的原始属性
struct RawAttribute {
    name: String,
    value: String,
    position: Position,
}

/// 标记解析器
pub struct MarkupParser {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    /// 每层元素声明的前缀
    scopes: Vec<Vec<(String, String)>>,
}

impl MarkupParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            scopes: Vec::new(),
        }
    }

    /// 解析文档；只处理第一个顶层元素
    pub fn parse(&mut self) -> Result<NodeTree> {
        self.parse_with_root(None)
    }

    /// 解析文档，根节点持有给定实例（LoadInto 路径）
    pub fn parse_with_root(&mut self, instance: Option<ObjectRef>) -> Result<NodeTree> {
        // 跳过声明、注释、空白，直到第一个元素
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                return Err(XamlError::parse("No root element found", self.position()));
            }

            if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.starts_with("<!") {
                debug!("Skipping top-level declaration at {}", self.position());
                self.skip_until(">")?;
            } else if self.current_char() == '<' {
                break;
            } else {
                warn!("Unhandled top-level text at {}", self.position());
                while self.pos < self.input.len() && self.current_char() != '<' {
                    self.advance();
                }
            }
        }

        let mut tree: Option<NodeTree> = None;
        self.parse_element(&mut tree, None, instance)?;
        // 之后的兄弟节点全部忽略
        tree.ok_or_else(|| XamlError::parse("No root element found", self.position()))
    }

    fn parse_element(
        &mut self,
        tree: &mut Option<NodeTree>,
        parent: Option<NodeId>,
        instance: Option<ObjectRef>,
    ) -> Result<NodeId> {
        let position = self.position();
        self.expect('<')?;

        let qualified = self.parse_name();
        if qualified.is_empty() {
            return Err(XamlError::parse("Empty tag name", position));
        }

        // 解析属性
        let mut raw_attributes: Vec<RawAttribute> = Vec::new();
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                return Err(XamlError::parse(
                    format!("Unterminated start tag <{}>", qualified),
                    position,
                ));
            }
            if self.current_char() == '>' || self.starts_with("/>") {
                break;
            }

            let attribute = self.parse_attribute()?;
            if raw_attributes.iter().any(|a| a.name == attribute.name) {
                return Err(XamlError::parse(
                    format!("Duplicate attribute '{}'", attribute.name),
                    attribute.position,
                ));
            }
            raw_attributes.push(attribute);
        }

        // 本层 xmlns 声明
        let mut declared = Vec::new();
        for attribute in &raw_attributes {
            if attribute.name == "xmlns" {
                declared.push((String::new(), attribute.value.clone()));
            } else if let Some(prefix) = attribute.name.strip_prefix("xmlns:") {
                declared.push((prefix.to_string(), attribute.value.clone()));
            }
        }
        self.scopes.push(declared.clone());

        let (prefix, local_name) = split_qualified(&qualified);
        let namespace_uri = self.resolve_prefix(prefix, position)?;
        let type_name = MarkupTypeName::new(&namespace_uri, local_name);

        let kind = if parent.is_none() {
            NodeKind::Root { instance }
        } else if local_name.contains('.') || (is_xaml_namespace(&namespace_uri) && local_name == "Arguments") {
            NodeKind::Property {
                name: XmlName::new(&namespace_uri, local_name),
            }
        } else {
            NodeKind::Element
        };

        let mut node = Node::new(kind, type_name, position);
        node.namespaces = declared;

        let mut ignorable = Vec::new();
        for attribute in raw_attributes {
            if attribute.name == "xmlns" || attribute.name.starts_with("xmlns:") {
                continue;
            }
            let (attr_prefix, attr_local) = split_qualified(&attribute.name);
            let attr_namespace = match attr_prefix {
                // 无前缀的属性不属于任何命名空间
                None => String::new(),
                Some(_) => self.resolve_prefix(attr_prefix, attribute.position)?,
            };

            if attr_namespace == MARKUP_COMPATIBILITY {
                if attr_local == "Ignorable" && parent.is_none() {
                    for ignored in attribute.value.split_whitespace() {
                        ignorable.push(self.resolve_prefix(Some(ignored), attribute.position)?);
                    }
                }
                continue;
            }

            if is_xaml_namespace(&attr_namespace) && attr_local == "TypeArguments" {
                let mut arguments = Vec::new();
                for argument in attribute.value.split(',') {
                    let (p, l) = split_qualified(argument.trim());
                    let uri = self.resolve_prefix(p, attribute.position)?;
                    arguments.push(MarkupTypeName::new(&uri, l));
                }
                node.type_name.type_arguments = Some(arguments);
            }

            node.attributes.push(Attribute {
                name: XmlName::new(&attr_namespace, attr_local),
                value: AttrValue::Raw(attribute.value),
                position: attribute.position,
            });
        }

        let id = match parent {
            Some(p) => {
                let t = tree
                    .as_mut()
                    .ok_or_else(|| XamlError::Internal("child element without a tree".into()))?;
                let id = t.add(node);
                t.append_child(p, id);
                id
            }
            None => {
                let mut t = NodeTree::new(node);
                t.set_ignorable_namespaces(ignorable);
                let root = t.root();
                *tree = Some(t);
                root
            }
        };

        // 自闭合标签
        if self.starts_with("/>") {
            self.advance();
            self.advance();
            self.scopes.pop();
            return Ok(id);
        }
        self.expect('>')?;

        self.parse_content(tree, id, &qualified, position)?;
        self.scopes.pop();
        Ok(id)
    }

    /// 解析子节点直到匹配的结束标签
    fn parse_content(
        &mut self,
        tree: &mut Option<NodeTree>,
        id: NodeId,
        qualified: &str,
        position: Position,
    ) -> Result<()> {
        loop {
            if self.pos >= self.input.len() {
                return Err(XamlError::parse(
                    format!("Unterminated element <{}>", qualified),
                    position,
                ));
            }

            if self.starts_with("</") {
                let end_position = self.position();
                self.advance();
                self.advance();
                let end_tag = self.parse_name();
                if end_tag != qualified {
                    return Err(XamlError::parse(
                        format!("Mismatched tags: {} vs {}", qualified, end_tag),
                        end_position,
                    ));
                }
                self.skip_whitespace();
                self.expect('>')?;
                return Ok(());
            }

            if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.starts_with("<![CDATA[") {
                let text_position = self.position();
                for _ in 0..9 {
                    self.advance();
                }
                let mut text = String::new();
                while self.pos < self.input.len() && !self.starts_with("]]>") {
                    text.push(self.current_char());
                    self.advance();
                }
                self.skip_until("]]>")?;
                push_text(tree, id, &text, text_position);
            } else if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.current_char() == '<' {
                self.parse_element(tree, Some(id), None)?;
            } else {
                let text_position = self.position();
                let mut text = String::new();
                while self.pos < self.input.len() && self.current_char() != '<' {
                    text.push(self.current_char());
                    self.advance();
                }
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    let decoded = decode_entities(trimmed, text_position)?;
                    push_text(tree, id, &decoded, text_position);
                }
            }
        }
    }

    fn parse_name(&mut self) -> String {
        let mut name = String::new();
        while self.pos < self.input.len() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '.' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn parse_attribute(&mut self) -> Result<RawAttribute> {
        let position = self.position();
        let name = self.parse_name();
        if name.is_empty() {
            return Err(XamlError::parse(
                format!("Unexpected character '{}' in tag", self.current_char()),
                position,
            ));
        }

        self.skip_whitespace();
        self.expect('=')?;
        self.skip_whitespace();

        let quote = self.current_char();
        if quote != '"' && quote != '\'' {
            return Err(XamlError::parse(
                format!("Attribute '{}' value must be quoted", name),
                self.position(),
            ));
        }
        self.advance(); // skip opening quote

        let mut value = String::new();
        while self.pos < self.input.len() && self.current_char() != quote {
            value.push(self.current_char());
            self.advance();
        }
        if self.pos >= self.input.len() {
            return Err(XamlError::parse(
                format!("Unterminated value for attribute '{}'", name),
                position,
            ));
        }
        self.advance(); // skip closing quote

        Ok(RawAttribute {
            name,
            value: decode_entities(&value, position)?,
            position,
        })
    }

    fn resolve_prefix(&self, prefix: Option<&str>, position: Position) -> Result<String> {
        let key = prefix.unwrap_or("");
        for scope in self.scopes.iter().rev() {
            if let Some((_, uri)) = scope.iter().find(|(p, _)| p == key) {
                return Ok(uri.clone());
            }
        }
        match prefix {
            // 没有默认命名空间时使用空 URI
            None => Ok(String::new()),
            Some(p) => Err(XamlError::parse(format!("Undeclared xmlns prefix '{}'", p), position)),
        }
    }

    fn skip_until(&mut self, terminator: &str) -> Result<()> {
        let start = self.position();
        while self.pos < self.input.len() {
            if self.starts_with(terminator) {
                for _ in 0..terminator.chars().count() {
                    self.advance();
                }
                return Ok(());
            }
            self.advance();
        }
        Err(XamlError::parse(format!("Expected '{}'", terminator), start))
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn current_char(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.current_char() == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        for (i, c) in s.chars().enumerate() {
            if self.pos + i >= self.input.len() || self.input[self.pos + i] != c {
                return false;
            }
        }
        true
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.current_char() == c {
            self.advance();
            Ok(())
        } else {
            Err(XamlError::parse(
                format!("Expected '{}', got '{}'", c, self.current_char()),
                self.position(),
            ))
        }
    }
}

fn push_text(tree: &mut Option<NodeTree>, parent: NodeId, text: &str, position: Position) {
    if let Some(t) = tree.as_mut() {
        let id = t.add(Node::text(text, position));
        t.append_child(parent, id);
    }
}

fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// 解码预定义实体和字符引用
fn decode_entities(text: &str, position: Position) -> Result<String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| XamlError::parse("Unterminated entity reference", position))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    XamlError::parse(format!("Unknown entity '&{};'", entity), position)
                })?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tree::{FORMS_2014, XAML_2009};

    const PAGE: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<!-- page -->
<ContentPage xmlns="http://xamarin.com/schemas/2014/forms"
             xmlns:x="http://schemas.microsoft.com/winfx/2009/xaml"
             x:Class="Demo.MainPage" Title="Home &amp; Away">
    <StackLayout>
        <Label x:Name="title" Text="Hello" />
        <Label>World</Label>
    </StackLayout>
</ContentPage>
<Ignored />"#;

    #[test]
    fn test_parse_simple() {
        let tree = MarkupParser::new(PAGE).parse().unwrap();
        let root = tree.node(tree.root());

        assert!(matches!(root.kind, NodeKind::Root { instance: None }));
        assert_eq!(root.type_name, MarkupTypeName::new(FORMS_2014, "ContentPage"));
        assert_eq!(root.directive_text("Class"), Some("Demo.MainPage"));
        assert_eq!(
            root.attribute("", "Title").and_then(|a| a.value.as_text()),
            Some("Home & Away")
        );

        let stack = tree.node(root.children[0]);
        assert_eq!(stack.type_name.local_name, "StackLayout");
        assert_eq!(stack.children.len(), 2);

        let label = tree.node(stack.children[0]);
        let name = label.directive("Name").unwrap();
        assert_eq!(name.name, XmlName::new(XAML_2009, "Name"));

        let content = tree.node(tree.node(stack.children[1]).children[0]);
        assert!(matches!(&content.kind, NodeKind::Text(t) if t == "World"));
        // 第二个顶层元素被忽略
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_property_elements_and_ignorable() {
        let xaml = r#"<ContentPage xmlns="http://xamarin.com/schemas/2014/forms"
            xmlns:x="http://schemas.microsoft.com/winfx/2009/xaml"
            xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"
            xmlns:d="http://xamarin.com/schemas/2014/forms/design"
            mc:Ignorable="d" d:DesignWidth="300">
            <ContentPage.Resources><ResourceDictionary /></ContentPage.Resources>
            <Label><x:Arguments><x:String>a</x:String></x:Arguments></Label>
        </ContentPage>"#;
        let tree = MarkupParser::new(xaml).parse().unwrap();
        let root = tree.node(tree.root());

        assert_eq!(tree.ignorable_namespaces(), &["http://xamarin.com/schemas/2014/forms/design".to_string()]);
        assert!(root.attribute(MARKUP_COMPATIBILITY, "Ignorable").is_none());

        let resources = tree.node(root.children[0]);
        assert!(matches!(&resources.kind, NodeKind::Property { name } if name.local_name == "ContentPage.Resources"));

        let label = tree.node(root.children[1]);
        let arguments = tree.node(label.children[0]);
        assert!(matches!(&arguments.kind, NodeKind::Property { name } if name.is_directive("Arguments")));
    }

    #[test]
    fn test_parse_errors() {
        let err = MarkupParser::new("<A><B></A>").parse().unwrap_err();
        assert!(matches!(err, XamlError::Parse { .. }));

        let err = MarkupParser::new("<A>\n  <p:B /></A>").parse().unwrap_err();
        match err {
            XamlError::Parse { position, .. } => assert_eq!(position.line, 2),
            other => panic!("unexpected {:?}", other),
        }

        assert!(MarkupParser::new("   ").parse().is_err());
        assert!(MarkupParser::new("<A b=c />").parse().is_err());
        assert!(MarkupParser::new("<A>").parse().is_err());
    }
}
