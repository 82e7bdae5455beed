//! 标记扩展表达式解析 - 处理 `{Name arg, Key=Value}` 语法
//!
//! 只负责把文本拆成表达式树，求值交给 `loader::extensions`。

/// 表达式参数
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionArg {
    Text(String),
    Nested(Expression),
}

/// 一个标记扩展调用
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub prefix: Option<String>,
    pub name: String,
    /// 由 Markup-Expansion 遍根据前缀解析后写入
    pub namespace_uri: String,
    pub positional: Vec<ExtensionArg>,
    pub named: Vec<(String, ExtensionArg)>,
    /// 原始文本，用于报错
    pub source: String,
}

impl Expression {
    /// 递归解析前缀到命名空间 URI（外层先于内层）
    pub fn resolve_namespaces<F>(&mut self, resolve: &F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = self.prefix.as_deref().unwrap_or("");
        self.namespace_uri = resolve(prefix)
            .ok_or_else(|| format!("Undeclared xmlns prefix '{}'", prefix))?;

        let nested = self
            .positional
            .iter_mut()
            .chain(self.named.iter_mut().map(|(_, v)| v));
        for arg in nested {
            if let ExtensionArg::Nested(inner) = arg {
                inner.resolve_namespaces(resolve)?;
            }
        }
        Ok(())
    }
}

/// 属性文本的分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupText {
    Plain(String),
    /// `{}` 转义后的字面量
    Escaped(String),
    Extension(Expression),
}

/// 判断并解析属性文本
pub fn parse_markup_text(text: &str) -> Result<MarkupText, String> {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("{}") {
        return Ok(MarkupText::Escaped(rest.to_string()));
    }
    if !trimmed.starts_with('{') {
        return Ok(MarkupText::Plain(text.to_string()));
    }
    ExpressionParser::new(trimmed).parse().map(MarkupText::Extension)
}

/// 表达式解析器
pub struct ExpressionParser {
    input: Vec<char>,
    pos: usize,
}

impl ExpressionParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// 解析完整表达式，结尾只允许空白
    pub fn parse(&mut self) -> Result<Expression, String> {
        let expr = self.parse_expression()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(format!("Unexpected text after markup extension at {}", self.pos));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expression, String> {
        let start = self.pos;
        self.expect('{')?;
        self.skip_whitespace();

        let qualified = self.parse_identifier();
        if qualified.is_empty() {
            return Err("Missing markup extension name".to_string());
        }
        let (prefix, name) = match qualified.split_once(':') {
            Some((p, n)) => (Some(p.to_string()), n.to_string()),
            None => (None, qualified),
        };

        let mut positional = Vec::new();
        let mut named = Vec::new();

        self.skip_whitespace();
        while self.current_char() != '}' {
            if self.pos >= self.input.len() {
                return Err("Unterminated markup extension".to_string());
            }

            let (key, value) = self.parse_argument()?;
            match key {
                Some(k) => named.push((k, value)),
                None if named.is_empty() => positional.push(value),
                None => return Err("Positional argument after named argument".to_string()),
            }

            self.skip_whitespace();
            if self.current_char() == ',' {
                self.advance();
                self.skip_whitespace();
                if self.current_char() == '}' {
                    return Err("Trailing ',' in markup extension".to_string());
                }
            } else if self.current_char() != '}' {
                return Err(format!("Expected ',' or '}}', got '{}'", self.current_char()));
            }
        }
        self.advance(); // skip '}'

        Ok(Expression {
            prefix,
            name,
            namespace_uri: String::new(),
            positional,
            named,
            source: self.input[start..self.pos].iter().collect(),
        })
    }

    fn parse_argument(&mut self) -> Result<(Option<String>, ExtensionArg), String> {
        if self.current_char() == '{' {
            return Ok((None, ExtensionArg::Nested(self.parse_expression()?)));
        }
        if self.current_char() == '\'' {
            return Ok((None, ExtensionArg::Text(self.parse_quoted()?)));
        }

        let token = self.parse_bare();
        self.skip_whitespace();
        if self.current_char() != '=' {
            return Ok((None, ExtensionArg::Text(token)));
        }

        // Key=Value
        self.advance();
        self.skip_whitespace();
        if token.is_empty() {
            return Err("Missing argument name before '='".to_string());
        }
        let value = match self.current_char() {
            '{' => ExtensionArg::Nested(self.parse_expression()?),
            '\'' => ExtensionArg::Text(self.parse_quoted()?),
            _ => ExtensionArg::Text(self.parse_bare()),
        };
        Ok((Some(token), value))
    }

    fn parse_identifier(&mut self) -> String {
        let mut name = String::new();
        while self.pos < self.input.len() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '_' || c == ':' || c == '.' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    /// 裸值读到 ',' '=' '}' 为止
    fn parse_bare(&mut self) -> String {
        let mut value = String::new();
        while self.pos < self.input.len() {
            let c = self.current_char();
            if c == ',' || c == '}' || c == '=' {
                break;
            }
            value.push(c);
            self.advance();
        }
        value.trim().to_string()
    }

    fn parse_quoted(&mut self) -> Result<String, String> {
        self.expect('\'')?;
        let mut value = String::new();
        while self.pos < self.input.len() {
            let c = self.current_char();
            self.advance();
            match c {
                '\\' if self.pos < self.input.len() => {
                    value.push(self.current_char());
                    self.advance();
                }
                '\'' => return Ok(value),
                _ => value.push(c),
            }
        }
        Err("Unterminated quoted value".to_string())
    }

    fn current_char(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.current_char() == c {
            self.advance();
            Ok(())
        } else {
            Err(format!("Expected '{}', got '{}'", c, self.current_char()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expression {
        match parse_markup_text(text).unwrap() {
            MarkupText::Extension(e) => e,
            other => panic!("expected extension, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_positional() {
        let expr = parse("{StaticResource PrimaryColor}");
        assert_eq!(expr.prefix, None);
        assert_eq!(expr.name, "StaticResource");
        assert_eq!(expr.positional, vec![ExtensionArg::Text("PrimaryColor".into())]);
        assert!(expr.named.is_empty());
    }

    #[test]
    fn test_parse_prefixed_named_and_nested() {
        let expr = parse("{x:Reference Name=header}");
        assert_eq!(expr.prefix.as_deref(), Some("x"));
        assert_eq!(expr.named, vec![("Name".into(), ExtensionArg::Text("header".into()))]);

        let outer = parse("{local:Pair First={StaticResource A}, Second='b, c'}");
        assert_eq!(outer.named.len(), 2);
        match &outer.named[0].1 {
            ExtensionArg::Nested(inner) => assert_eq!(inner.name, "StaticResource"),
            other => panic!("expected nested, got {:?}", other),
        }
        assert_eq!(outer.named[1].1, ExtensionArg::Text("b, c".into()));
    }

    #[test]
    fn test_escape_and_plain() {
        assert_eq!(
            parse_markup_text("{}{literal}").unwrap(),
            MarkupText::Escaped("{literal}".into())
        );
        assert_eq!(
            parse_markup_text("Hello").unwrap(),
            MarkupText::Plain("Hello".into())
        );
    }

    #[test]
    fn test_malformed() {
        assert!(parse_markup_text("{StaticResource A").is_err());
        assert!(parse_markup_text("{}").is_ok());
        assert!(parse_markup_text("{ }").is_err());
        assert!(parse_markup_text("{A b} trailing").is_err());
        assert!(parse_markup_text("{A b,}").is_err());
    }

    #[test]
    fn test_resolve_namespaces() {
        let mut expr = parse("{x:Reference {StaticResource Key}}");
        expr.resolve_namespaces(&|p: &str| match p {
            "x" => Some("urn:x".to_string()),
            "" => Some("urn:default".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(expr.namespace_uri, "urn:x");
        match &expr.positional[0] {
            ExtensionArg::Nested(inner) => assert_eq!(inner.namespace_uri, "urn:default"),
            other => panic!("expected nested, got {:?}", other),
        }

        let mut bad = parse("{y:Thing}");
        assert!(bad.resolve_namespaces(&|_: &str| None).is_err());
    }
}
