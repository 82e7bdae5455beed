//! 类型注册表 - 按命名空间 + 名称查找可构造的运行时类型

use crate::error::{Position, Result, XamlError};
use crate::parser::tree::{is_xaml_namespace, MarkupTypeName, XAML_2009};
use crate::runtime::convert::coerce;
use crate::runtime::object::{Object, ObjectRef, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Plain,
    /// 子元素追加到 items
    Collection,
    ResourceDictionary,
    /// 内容延迟实例化，并开启新的名称作用域
    Template,
}

/// 属性类型
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    String,
    Bool,
    Int,
    Float,
    Enum(Vec<String>),
    /// 对象，可限定必须可赋值给某个类型名
    Object(Option<String>),
    Collection,
    Dictionary,
    Any,
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: PropertyType,
}

/// 工厂方法：由构造参数创建对象
pub type Factory =
    Arc<dyn Fn(&Arc<TypeDescriptor>, &[Value]) -> std::result::Result<Object, String> + Send + Sync>;

/// 类型描述
pub struct TypeDescriptor {
    pub name: MarkupTypeName,
    pub kind: TypeKind,
    properties: Vec<PropertyDescriptor>,
    attached: Vec<PropertyDescriptor>,
    content_property: Option<String>,
    constructor_parameters: Vec<String>,
    factories: HashMap<String, Factory>,
    ancestry: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(namespace_uri: &str, name: &str) -> Self {
        Self {
            name: MarkupTypeName::new(namespace_uri, name),
            kind: TypeKind::Plain,
            properties: Vec::new(),
            attached: Vec::new(),
            content_property: None,
            constructor_parameters: Vec::new(),
            factories: HashMap::new(),
            ancestry: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn property(mut self, name: &str, ty: PropertyType) -> Self {
        self.properties.retain(|p| p.name != name);
        self.properties.push(PropertyDescriptor { name: name.to_string(), ty });
        self
    }

    pub fn attached_property(mut self, name: &str, ty: PropertyType) -> Self {
        self.attached.retain(|p| p.name != name);
        self.attached.push(PropertyDescriptor { name: name.to_string(), ty });
        self
    }

    pub fn content_property(mut self, name: &str) -> Self {
        self.content_property = Some(name.to_string());
        self
    }

    /// 默认构造函数的参数，按顺序对应到同名属性
    pub fn constructor(mut self, parameters: &[&str]) -> Self {
        self.constructor_parameters = parameters.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn factory<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Arc<TypeDescriptor>, &[Value]) -> std::result::Result<Object, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
        self
    }

    /// 继承基类的属性、内容属性和种类
    pub fn extends(mut self, base: &TypeDescriptor) -> Self {
        for p in &base.properties {
            if self.property_descriptor(&p.name).is_none() {
                self.properties.push(p.clone());
            }
        }
        if self.content_property.is_none() {
            self.content_property = base.content_property.clone();
        }
        if self.kind == TypeKind::Plain {
            self.kind = base.kind;
        }
        self.ancestry.push(base.name.local_name.clone());
        self.ancestry.extend(base.ancestry.iter().cloned());
        self
    }

    pub fn property_descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn attached_descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.attached.iter().find(|p| p.name == name)
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn content_property_name(&self) -> Option<&str> {
        self.content_property.as_deref()
    }

    pub fn is_assignable_to(&self, local_name: &str) -> bool {
        self.name.local_name == local_name || self.ancestry.iter().any(|a| a == local_name)
    }

    /// 创建实例。`factory` 对应 x:FactoryMethod
    pub fn instantiate(
        self: &Arc<Self>,
        arguments: &[Value],
        factory: Option<&str>,
    ) -> std::result::Result<Object, String> {
        if let Some(name) = factory {
            let f = self
                .factories
                .get(name)
                .ok_or_else(|| format!("No factory method {} on {}", name, self.name.local_name))?;
            return f(self, arguments);
        }

        let mut object = Object::new(self.clone());
        if arguments.is_empty() {
            return Ok(object);
        }
        if arguments.len() != self.constructor_parameters.len() {
            return Err(format!(
                "No constructor for {} takes {} arguments",
                self.name.local_name,
                arguments.len()
            ));
        }
        for (parameter, argument) in self.constructor_parameters.iter().zip(arguments) {
            let value = match self.property_descriptor(parameter) {
                Some(p) => coerce(argument.clone(), &p.ty)
                    .map_err(|e| format!("argument {}: {}", parameter, e))?,
                None => argument.clone(),
            };
            object.properties.insert(parameter.clone(), value);
        }
        Ok(object)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// 类型注册表
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<(String, String), Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先注册标准控件
    pub fn with_controls() -> Self {
        let mut registry = Self::new();
        crate::runtime::controls::register_controls(&mut registry);
        registry
    }

    /// 注册类型，同名覆盖
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        let key = Self::key(&descriptor.name.namespace_uri, &descriptor.name.local_name);
        self.types.insert(key, descriptor.clone());
        descriptor
    }

    pub fn get(&self, namespace_uri: &str, local_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(&Self::key(namespace_uri, local_name)).cloned()
    }

    pub fn resolve(&self, name: &MarkupTypeName) -> Option<Arc<TypeDescriptor>> {
        self.get(&name.namespace_uri, &name.local_name)
    }

    /// 用默认构造函数创建实例（LoadInto 的目标通常这样得到）
    pub fn create(&self, namespace_uri: &str, local_name: &str) -> Result<ObjectRef> {
        let descriptor = self.get(namespace_uri, local_name).ok_or_else(|| XamlError::UnresolvedType {
            namespace: namespace_uri.to_string(),
            name: local_name.to_string(),
            position: Position::default(),
        })?;
        Ok(ObjectRef::new(Object::new(descriptor)))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn key(namespace_uri: &str, local_name: &str) -> (String, String) {
        // 2006 和 2009 的 x: 命名空间视为同一个
        let ns = if is_xaml_namespace(namespace_uri) {
            XAML_2009
        } else {
            namespace_uri
        };
        (ns.to_string(), local_name.to_string())
    }
}
