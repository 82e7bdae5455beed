//! 单元测试模块
//! 覆盖文档定位、访问者管线、加载入口、模板、配置等功能

pub mod loader_tests;
pub mod resolver_tests;
pub mod template_tests;

use crate::loader::XamlLoader;
use crate::runtime::TypeRegistry;
use std::sync::Arc;

/// 默认命名空间和 x: 命名空间声明
pub const NS: &str = r#"xmlns="http://xamarin.com/schemas/2014/forms" xmlns:x="http://schemas.microsoft.com/winfx/2009/xaml""#;

/// 把文档中的 `$NS` 替换成命名空间声明
pub fn doc(markup: &str) -> String {
    markup.replace("$NS", NS)
}

/// 注册了标准控件的加载器
pub fn loader() -> XamlLoader {
    XamlLoader::new(Arc::new(TypeRegistry::with_controls()))
}
