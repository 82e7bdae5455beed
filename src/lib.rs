//! Mini XAML - 标记文档加载器
//! 根据类型定位标记文档，经过八遍访问者管线生成配置好的对象图

// 错误类型
pub mod error;

// 标记文档 / 标记扩展解析器
pub mod parser;

// 类型注册表与对象模型
pub mod runtime;

// 文档定位与加载管线
pub mod loader;

// JSON 配置
pub mod config;

pub use config::LoaderConfig;
pub use error::{Position, Result, XamlError};
pub use loader::{
    ComponentType, DirectoryBundle, EmbeddedBundle, ExtensionRegistry, LoadOptions, LoadReport,
    ResourceResolver, XamlLoader,
};
pub use runtime::{ObjectRef, TypeRegistry, Value};

// 单元测试
#[cfg(test)]
mod tests;
