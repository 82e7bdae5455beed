//! 运行时对象模型

use crate::parser::tree::{MarkupTypeName, NodeTree};
use crate::runtime::registry::{TypeDescriptor, TypeKind};
use indexmap::IndexMap;
use serde_json::{json, Map, Value as JsonValue};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// 属性值
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Type(MarkupTypeName),
    /// 集合类型属性的内容
    List(Vec<Value>),
    Object(ObjectRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 用于报错的类型描述
    pub fn kind_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::String(_) => "string".into(),
            Value::Type(_) => "type".into(),
            Value::List(_) => "list".into(),
            Value::Object(o) => o.type_name().local_name,
        }
    }

    /// 转成 JSON，祖先环用 `{"$ref": 类型名}` 截断
    pub fn to_json(&self) -> JsonValue {
        let mut path = Vec::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut Vec<*const RefCell<Object>>) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Float(f) => json!(f),
            Value::String(s) => json!(s),
            Value::Type(t) => json!({ "$typeof": t.local_name }),
            Value::List(items) => JsonValue::Array(items.iter().map(|v| v.to_json_inner(path)).collect()),
            Value::Object(o) => {
                let ptr = Rc::as_ptr(&o.0);
                if path.contains(&ptr) {
                    return json!({ "$ref": o.type_name().local_name });
                }
                path.push(ptr);

                let object = o.borrow();
                let mut map = Map::new();
                map.insert("$type".into(), json!(object.descriptor.name.local_name));
                for (name, value) in &object.properties {
                    map.insert(name.clone(), value.to_json_inner(path));
                }
                if !object.items.is_empty() {
                    let items: Vec<JsonValue> =
                        object.items.iter().map(|v| v.to_json_inner(path)).collect();
                    map.insert("$items".into(), JsonValue::Array(items));
                }
                if object.descriptor.kind == TypeKind::ResourceDictionary {
                    let mut entries = Map::new();
                    for (key, value) in &object.resources {
                        entries.insert(key.clone(), value.to_json_inner(path));
                    }
                    map.insert("$resources".into(), JsonValue::Object(entries));
                }
                drop(object);

                path.pop();
                JsonValue::Object(map)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

/// 模板的延迟内容
#[derive(Debug, Clone)]
pub struct TemplateContent {
    pub tree: NodeTree,
    /// 模板所在位置的祖先实例（由近及远），用于 StaticResource 查找。
    /// 祖先持有模板，这里只保留弱引用。
    pub outer_scope: Vec<WeakObjectRef>,
}

impl TemplateContent {
    /// 仍然存活的外层实例
    pub fn live_outer_scope(&self) -> Vec<ObjectRef> {
        self.outer_scope.iter().filter_map(WeakObjectRef::upgrade).collect()
    }
}

/// 运行时对象
pub struct Object {
    descriptor: Arc<TypeDescriptor>,
    pub properties: IndexMap<String, Value>,
    /// 集合内容
    pub items: Vec<Value>,
    /// 资源字典条目
    pub resources: IndexMap<String, Value>,
    pub template: Option<TemplateContent>,
}

impl Object {
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            descriptor,
            properties: IndexMap::new(),
            items: Vec::new(),
            resources: IndexMap::new(),
            template: None,
        }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }
}

/// 共享的对象引用；一次加载是单线程的
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    pub fn descriptor(&self) -> Arc<TypeDescriptor> {
        self.0.borrow().descriptor.clone()
    }

    pub fn type_name(&self) -> MarkupTypeName {
        self.0.borrow().descriptor.name.clone()
    }

    pub fn kind(&self) -> TypeKind {
        self.0.borrow().descriptor.kind
    }

    pub fn get(&self, property: &str) -> Option<Value> {
        self.0.borrow().properties.get(property).cloned()
    }

    pub fn set(&self, property: &str, value: Value) {
        self.0.borrow_mut().properties.insert(property.to_string(), value);
    }

    pub fn items(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    pub fn add_item(&self, value: Value) {
        self.0.borrow_mut().items.push(value);
    }

    /// 向集合属性追加；属性为空时建立列表，属性持有集合对象时追加到其 items
    pub fn append_to(&self, property: &str, value: Value) -> Result<(), String> {
        let existing = self.get(property);
        match existing {
            Some(Value::Object(collection)) if collection.kind() == TypeKind::Collection => {
                collection.add_item(value);
                Ok(())
            }
            Some(Value::List(_)) | None | Some(Value::Null) => {
                let mut object = self.0.borrow_mut();
                let slot = object
                    .properties
                    .entry(property.to_string())
                    .or_insert_with(|| Value::List(Vec::new()));
                if let Value::Null = slot {
                    *slot = Value::List(Vec::new());
                }
                if let Value::List(items) = slot {
                    items.push(value);
                }
                Ok(())
            }
            Some(other) => Err(format!("property holds {}, not a collection", other.kind_name())),
        }
    }

    pub fn resource(&self, key: &str) -> Option<Value> {
        self.0.borrow().resources.get(key).cloned()
    }

    /// 写入资源字典，同键覆盖
    pub fn insert_resource(&self, key: &str, value: Value) {
        self.0.borrow_mut().resources.insert(key.to_string(), value);
    }

    /// 对象自身（字典）或其 Resources 属性里的资源
    pub fn find_resource(&self, key: &str) -> Option<Value> {
        if self.kind() == TypeKind::ResourceDictionary {
            if let Some(v) = self.resource(key) {
                return Some(v);
            }
        }
        match self.get("Resources") {
            Some(Value::Object(dictionary)) if !dictionary.ptr_eq(self) => dictionary.resource(key),
            _ => None,
        }
    }
}

/// 不持有对象的引用
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RefCell<Object>>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(object) => write!(f, "Weak({:?})", object),
            None => write!(f, "Weak(<dropped>)"),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "ObjectRef({})", object.descriptor.name.local_name),
            Err(_) => write!(f, "ObjectRef(<borrowed>)"),
        }
    }
}
