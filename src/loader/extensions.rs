//! 标记扩展求值

use crate::loader::context::HydrationContext;
use crate::parser::extension::{Expression, ExtensionArg};
use crate::parser::tree::{is_xaml_namespace, MarkupTypeName, NodeId, NodeTree, FORMS_2014, XAML_2009};
use crate::runtime::{TypeRegistry, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 已求值的参数
#[derive(Debug, Clone, Default)]
pub struct ExtensionArgs {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl ExtensionArgs {
    /// 先按名字找，再按位置找
    pub fn get(&self, name: &str, index: usize) -> Option<&Value> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.positional.get(index))
    }

    fn text(&self, name: &str, index: usize) -> Result<String, String> {
        match self.get(name, index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(format!("{} must be text, got {}", name, other.kind_name())),
            None => Err(format!("missing {}", name)),
        }
    }
}

/// 求值时可用的服务：当前节点、祖先链和加载上下文
pub struct ExtensionContext<'a> {
    tree: &'a NodeTree,
    context: &'a HydrationContext,
    registry: &'a TypeRegistry,
    node: NodeId,
}

impl<'a> ExtensionContext<'a> {
    pub fn new(
        tree: &'a NodeTree,
        context: &'a HydrationContext,
        registry: &'a TypeRegistry,
        node: NodeId,
    ) -> Self {
        Self {
            tree,
            context,
            registry,
            node,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// 从当前节点向上找最近的包含该键的资源字典，最后查模板捕获的外层实例
    pub fn find_resource(&self, key: &str) -> Option<Value> {
        std::iter::once(self.node)
            .chain(self.tree.ancestors(self.node))
            .filter_map(|id| self.context.object(id))
            .chain(self.context.outer_scope().iter().cloned())
            .find_map(|object| object.find_resource(key))
    }

    /// 在当前节点所在的名称作用域链中查找
    pub fn find_name(&self, name: &str) -> Option<Value> {
        let scope = std::iter::once(self.node)
            .chain(self.tree.ancestors(self.node))
            .find_map(|id| self.context.node_scope(id))?;
        self.context.find_name(scope, name)
    }

    /// 解析 `prefix:Name` 形式的类型名
    pub fn resolve_type_name(&self, qualified: &str) -> Option<MarkupTypeName> {
        let (prefix, local) = match qualified.split_once(':') {
            Some((p, l)) => (p, l),
            None => ("", qualified),
        };
        let uri = self.tree.lookup_namespace(self.node, prefix)?;
        Some(MarkupTypeName::new(uri, local))
    }
}

/// 标记扩展能力
pub trait MarkupExtension: Send + Sync {
    fn provide_value(&self, args: &ExtensionArgs, ctx: &ExtensionContext<'_>) -> Result<Value, String>;
}

/// `{StaticResource Key}`
pub struct StaticResourceExtension;

impl MarkupExtension for StaticResourceExtension {
    fn provide_value(&self, args: &ExtensionArgs, ctx: &ExtensionContext<'_>) -> Result<Value, String> {
        let key = args.text("Key", 0)?;
        ctx.find_resource(&key)
            .ok_or_else(|| format!("StaticResource not found for key {}", key))
    }
}

/// `{x:Reference Name}`
pub struct ReferenceExtension;

impl MarkupExtension for ReferenceExtension {
    fn provide_value(&self, args: &ExtensionArgs, ctx: &ExtensionContext<'_>) -> Result<Value, String> {
        let name = args.text("Name", 0)?;
        ctx.find_name(&name)
            .ok_or_else(|| format!("Can not find the object referenced by `{}`", name))
    }
}

/// `{x:Null}`
pub struct NullExtension;

impl MarkupExtension for NullExtension {
    fn provide_value(&self, _args: &ExtensionArgs, _ctx: &ExtensionContext<'_>) -> Result<Value, String> {
        Ok(Value::Null)
    }
}

/// `{x:Type local:Name}`
pub struct TypeExtension;

impl MarkupExtension for TypeExtension {
    fn provide_value(&self, args: &ExtensionArgs, ctx: &ExtensionContext<'_>) -> Result<Value, String> {
        let qualified = args.text("TypeName", 0)?;
        let name = ctx
            .resolve_type_name(&qualified)
            .ok_or_else(|| format!("Undeclared xmlns prefix in {}", qualified))?;
        if ctx.registry().resolve(&name).is_none() {
            return Err(format!("Can not find the type {}", qualified));
        }
        Ok(Value::Type(name))
    }
}

/// 扩展注册表
#[derive(Clone)]
pub struct ExtensionRegistry {
    extensions: HashMap<(String, String), Arc<dyn MarkupExtension>>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(FORMS_2014, "StaticResource", Arc::new(StaticResourceExtension));
        registry.register(XAML_2009, "Reference", Arc::new(ReferenceExtension));
        registry.register(XAML_2009, "Null", Arc::new(NullExtension));
        registry.register(XAML_2009, "Type", Arc::new(TypeExtension));
        registry
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.extensions.keys().map(|(_, n)| n).collect();
        names.sort();
        f.debug_struct("ExtensionRegistry").field("extensions", &names).finish()
    }
}

impl ExtensionRegistry {
    /// 带内置扩展
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            extensions: HashMap::new(),
        }
    }

    pub fn register(&mut self, namespace_uri: &str, name: &str, extension: Arc<dyn MarkupExtension>) {
        self.extensions.insert(Self::key(namespace_uri, name), extension);
    }

    /// 也接受 `NameExtension` 写法
    pub fn get(&self, namespace_uri: &str, name: &str) -> Option<Arc<dyn MarkupExtension>> {
        self.extensions
            .get(&Self::key(namespace_uri, name))
            .or_else(|| {
                name.strip_suffix("Extension")
                    .and_then(|short| self.extensions.get(&Self::key(namespace_uri, short)))
            })
            .cloned()
    }

    /// 检查表达式（含嵌套）引用的扩展都已注册
    pub fn validate(&self, expression: &Expression) -> Result<(), String> {
        if self.get(&expression.namespace_uri, &expression.name).is_none() {
            return Err(format!(
                "Markup extension {} not found in xmlns {}",
                expression.name, expression.namespace_uri
            ));
        }
        for arg in expression.positional.iter().chain(expression.named.iter().map(|(_, a)| a)) {
            if let ExtensionArg::Nested(inner) = arg {
                self.validate(inner)?;
            }
        }
        Ok(())
    }

    /// 求值；嵌套参数先于外层求值
    pub fn evaluate(&self, expression: &Expression, ctx: &ExtensionContext<'_>) -> Result<Value, String> {
        let extension = self
            .get(&expression.namespace_uri, &expression.name)
            .ok_or_else(|| format!("Markup extension {} not found", expression.name))?;

        let mut args = ExtensionArgs::default();
        for arg in &expression.positional {
            args.positional.push(self.evaluate_arg(arg, ctx)?);
        }
        for (name, arg) in &expression.named {
            args.named.push((name.clone(), self.evaluate_arg(arg, ctx)?));
        }

        extension.provide_value(&args, ctx)
    }

    fn evaluate_arg(&self, arg: &ExtensionArg, ctx: &ExtensionContext<'_>) -> Result<Value, String> {
        match arg {
            ExtensionArg::Text(text) => Ok(Value::String(text.clone())),
            ExtensionArg::Nested(inner) => self.evaluate(inner, ctx),
        }
    }

    fn key(namespace_uri: &str, name: &str) -> (String, String) {
        let ns = if is_xaml_namespace(namespace_uri) {
            XAML_2009
        } else {
            namespace_uri
        };
        (ns.to_string(), name.to_string())
    }
}
