//! 加载器配置 - 从 JSON 注册自定义类型
//!
//! ```json
//! { "doNotThrowOnExceptions": true,
//!   "types": [ { "namespace": "clr-namespace:Demo", "name": "Card", "base": "ContentView",
//!                "properties": { "Title": "string", "Mode": "enum:Compact|Full" } } ] }
//! ```

use crate::error::{Result, XamlError};
use crate::loader::LoadOptions;
use crate::parser::tree::FORMS_2014;
use crate::runtime::{PropertyType, TypeDescriptor, TypeKind, TypeRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    #[serde(default)]
    pub do_not_throw_on_exceptions: bool,
    #[serde(default)]
    pub types: Vec<TypeConfig>,
}

/// 一个自定义类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeConfig {
    pub namespace: String,
    pub name: String,
    /// 基类名，先在本命名空间查找，再查默认 Forms 命名空间
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub attached_properties: IndexMap<String, String>,
    #[serde(default)]
    pub content_property: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "plain".to_string()
}

impl LoaderConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| XamlError::Config(format!("invalid loader config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| XamlError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn options(&self) -> LoadOptions {
        LoadOptions {
            do_not_throw_on_exceptions: self.do_not_throw_on_exceptions,
        }
    }

    /// 按顺序注册，后面的类型可以继承前面的
    pub fn apply(&self, registry: &mut TypeRegistry) -> Result<()> {
        for ty in &self.types {
            let descriptor = ty.to_descriptor(registry)?;
            debug!("Registering {} from config", descriptor.name);
            registry.register(descriptor);
        }
        Ok(())
    }
}

impl TypeConfig {
    fn to_descriptor(&self, registry: &TypeRegistry) -> Result<TypeDescriptor> {
        let mut descriptor = TypeDescriptor::new(&self.namespace, &self.name).kind(parse_kind(&self.kind)?);
        for (name, ty) in &self.properties {
            descriptor = descriptor.property(name, parse_property_type(ty)?);
        }
        for (name, ty) in &self.attached_properties {
            descriptor = descriptor.attached_property(name, parse_property_type(ty)?);
        }
        if let Some(content) = &self.content_property {
            descriptor = descriptor.content_property(content);
        }
        if let Some(base) = &self.base {
            let base_type = registry
                .get(&self.namespace, base)
                .or_else(|| registry.get(FORMS_2014, base))
                .ok_or_else(|| XamlError::Config(format!("base type {} of {} is not registered", base, self.name)))?;
            descriptor = descriptor.extends(&base_type);
        }
        if let Some(content) = descriptor.content_property_name() {
            if descriptor.property_descriptor(content).is_none() {
                return Err(XamlError::Config(format!(
                    "content property {} of {} is not declared",
                    content, self.name
                )));
            }
        }
        Ok(descriptor)
    }
}

fn parse_kind(kind: &str) -> Result<TypeKind> {
    match kind {
        "plain" => Ok(TypeKind::Plain),
        "collection" => Ok(TypeKind::Collection),
        "dictionary" => Ok(TypeKind::ResourceDictionary),
        "template" => Ok(TypeKind::Template),
        other => Err(XamlError::Config(format!("unknown type kind '{}'", other))),
    }
}

/// `string` `bool` `int` `float` `object` `object:<T>` `collection` `dictionary` `enum:A|B` `any`
pub fn parse_property_type(ty: &str) -> Result<PropertyType> {
    if let Some(constraint) = ty.strip_prefix("object:") {
        return Ok(PropertyType::Object(Some(constraint.trim().to_string())));
    }
    if let Some(members) = ty.strip_prefix("enum:") {
        let members: Vec<String> = members
            .split('|')
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if members.is_empty() {
            return Err(XamlError::Config(format!("enum type '{}' has no members", ty)));
        }
        return Ok(PropertyType::Enum(members));
    }
    match ty {
        "string" => Ok(PropertyType::String),
        "bool" => Ok(PropertyType::Bool),
        "int" => Ok(PropertyType::Int),
        "float" => Ok(PropertyType::Float),
        "object" => Ok(PropertyType::Object(None)),
        "collection" => Ok(PropertyType::Collection),
        "dictionary" => Ok(PropertyType::Dictionary),
        "any" => Ok(PropertyType::Any),
        other => Err(XamlError::Config(format!("unknown property type '{}'", other))),
    }
}
