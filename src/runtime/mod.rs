//! 运行时类型系统 - 类型注册表、对象模型与属性转换

pub mod controls;
pub mod convert;
pub mod object;
pub mod registry;

pub use object::{Object, ObjectRef, TemplateContent, Value, WeakObjectRef};
pub use registry::{Factory, PropertyDescriptor, PropertyType, TypeDescriptor, TypeKind, TypeRegistry};
