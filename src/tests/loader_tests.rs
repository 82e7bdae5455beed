//! 加载入口测试
//! 测试 LoadInto / CreateNew、文档定位失败、解析错误和自定义扩展

use super::{doc, loader};
use crate::error::XamlError;
use crate::config::LoaderConfig;
use crate::loader::{
    ComponentType, DirectoryBundle, EmbeddedBundle, ExtensionArgs, ExtensionContext, ExtensionRegistry, LoadOptions,
    MarkupExtension, ResourceCache, ResourceResolver,
};
use crate::parser::tree::FORMS_2014;
use crate::runtime::{TypeRegistry, Value};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

const MAIN_PAGE: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<ContentPage xmlns="http://xamarin.com/schemas/2014/forms"
             xmlns:x="http://schemas.microsoft.com/winfx/2009/xaml"
             x:Class="Demo.MainPage" Title="Main">
    <StackLayout x:Name="layout">
        <Label x:Name="greeting" Text="Hello" />
    </StackLayout>
</ContentPage>"#;

fn isolated_resolver() -> ResourceResolver {
    ResourceResolver::with_cache(Arc::new(ResourceCache::new()))
}

#[test]
fn test_load_type_into_target() {
    let registry = Arc::new(TypeRegistry::with_controls());
    let loader = crate::loader::XamlLoader::new(registry.clone()).with_resolver(isolated_resolver());
    let bundle = EmbeddedBundle::new("app").with_resource("app.Views.MainPage.xaml", MAIN_PAGE);
    let ty = ComponentType::new("Demo.MainPage", Arc::new(bundle));

    let target = registry.create(FORMS_2014, "ContentPage").unwrap();
    let report = loader.load_type(&target, &ty).unwrap();

    assert!(report.root.ptr_eq(&target));
    assert_eq!(target.get("Title"), Some(Value::from("Main")));
    let layout = report.find_object("layout").unwrap();
    assert!(matches!(target.get("Content"), Some(Value::Object(ref o)) if o.ptr_eq(&layout)));
    assert_eq!(report.find_object("greeting").unwrap().get("Text"), Some(Value::from("Hello")));
}

/// 找不到文档时容错模式也失败
#[test]
fn test_document_not_found_is_fatal() {
    let registry = Arc::new(TypeRegistry::with_controls());
    let loader = crate::loader::XamlLoader::new(registry.clone())
        .with_resolver(isolated_resolver())
        .with_options(LoadOptions {
            do_not_throw_on_exceptions: true,
        });
    let ty = ComponentType::new("Demo.Missing", Arc::new(EmbeddedBundle::new("empty")));
    let target = registry.create(FORMS_2014, "ContentPage").unwrap();

    let err = loader.load_type(&target, &ty).unwrap_err();
    assert!(matches!(err, XamlError::DocumentNotFound(ref name) if name == "Demo.Missing"));
    assert!(err.is_fatal());
}

#[test]
fn test_parse_error_not_downgraded() {
    let err = loader()
        .create(&doc(r#"<ContentPage $NS><Label></ContentPage>"#), true)
        .unwrap_err();
    assert!(matches!(err, XamlError::Parse { .. }));
}

#[test]
fn test_create_new() {
    let report = loader().create(MAIN_PAGE, false).unwrap();
    assert_eq!(report.root.type_name().local_name, "ContentPage");
    assert_eq!(report.root.get("Title"), Some(Value::from("Main")));
    assert_eq!(report.names.keys().collect::<Vec<_>>(), vec!["layout", "greeting"]);
}

/// 只处理第一个顶层元素
#[test]
fn test_only_first_element() {
    let markup = doc(
        r#"<?xml version="1.0"?>
        <!-- first -->
        <Label $NS Text="one" />
        <Label $NS Text="two" />"#,
    );
    let report = loader().create(&markup, false).unwrap();
    assert_eq!(report.root.get("Text"), Some(Value::from("one")));
}

/// 根节点的类型无法解析时没有结果可返回
#[test]
fn test_root_failure_always_fatal() {
    let err = loader().create(&doc(r#"<Bogus $NS />"#), true).unwrap_err();
    assert!(matches!(err, XamlError::UnresolvedType { .. }));
}

#[test]
fn test_json_dump() {
    let report = loader()
        .create(
            &doc(r#"<StackLayout $NS Spacing="4"><Label Text="a" Grid.Row="1" /></StackLayout>"#),
            false,
        )
        .unwrap();
    assert_eq!(
        Value::from(report.root.clone()).to_json(),
        json!({
            "$type": "StackLayout",
            "Spacing": 4.0,
            "Children": [ { "$type": "Label", "Text": "a", "Grid.Row": 1 } ]
        })
    );
}

/// 循环引用在 JSON 中被截断
#[test]
fn test_json_dump_cycle() {
    let report = loader()
        .create(&doc(r#"<ContentView $NS x:Name="self" StyleId="{x:Reference self}" />"#), true)
        .unwrap();
    // StyleId 是字符串属性，引用无法赋值
    assert_eq!(report.diagnostics.len(), 1);

    let report = loader()
        .create(
            &doc(r#"<StackLayout $NS x:Name="root"><Button CommandParameter="{x:Reference root}" /></StackLayout>"#),
            false,
        )
        .unwrap();
    let dumped = Value::from(report.root.clone()).to_json();
    assert_eq!(dumped["Children"][0]["CommandParameter"], json!({ "$ref": "StackLayout" }));
}

struct UpperExtension;

impl MarkupExtension for UpperExtension {
    fn provide_value(&self, args: &ExtensionArgs, _ctx: &ExtensionContext<'_>) -> Result<Value, String> {
        match args.get("Text", 0) {
            Some(Value::String(s)) => Ok(Value::String(s.to_uppercase())),
            _ => Err("Upper needs text".into()),
        }
    }
}

#[test]
fn test_custom_extension() {
    let mut extensions = ExtensionRegistry::new();
    extensions.register("clr-namespace:Demo", "Upper", Arc::new(UpperExtension));
    let loader = loader().with_extensions(extensions);

    let report = loader
        .create(
            &doc(r#"<Label $NS xmlns:local="clr-namespace:Demo" Text="{local:UpperExtension Text=hello}" />"#),
            false,
        )
        .unwrap();
    assert_eq!(report.root.get("Text"), Some(Value::from("HELLO")));

    // 嵌套参数先求值
    let report = loader
        .create(
            &doc(
                r#"<Label $NS xmlns:local="clr-namespace:Demo" Text="{local:Upper {StaticResource Word}}">
                    <Label.Resources><x:String x:Key="Word">nested</x:String></Label.Resources>
                </Label>"#,
            ),
            false,
        )
        .unwrap();
    assert_eq!(report.root.get("Text"), Some(Value::from("NESTED")));
}

/// 命令行演示用的资源目录
#[test]
fn test_demo_bundle() {
    let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    let config = LoaderConfig::load(&demos.join("loader.json")).unwrap();
    let mut registry = TypeRegistry::with_controls();
    config.apply(&mut registry).unwrap();
    let loader = crate::loader::XamlLoader::new(Arc::new(registry)).with_resolver(isolated_resolver());

    let bundle = Arc::new(DirectoryBundle::open("bundle", &demos.join("bundle")).unwrap());
    let main = ComponentType::new("Demo.Views.MainPage", bundle.clone());
    let target = loader.create_component(&main).unwrap();
    assert_eq!(target.type_name().local_name, "ContentPage");
    let report = loader.load_type(&target, &main).unwrap();
    assert!(report.root.ptr_eq(&target));
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.root.get("Title"), Some(Value::from("Dashboard")));
    assert_eq!(
        report.find_object("title").unwrap().get("Text"),
        Some(Value::from("Welcome back"))
    );
    match report.find_object("layout").unwrap().get("Children") {
        // 设计器专用的 d:Label 已被裁剪
        Some(Value::List(children)) => assert_eq!(children.len(), 4),
        other => panic!("expected children, got {:?}", other),
    }

    let settings = ComponentType::new("Demo.Views.Settings", bundle);
    let report = loader.create(&loader.resolve_markup(&settings).unwrap(), false).unwrap();
    assert!(report.find_by_name("options").is_some());
    assert!(report.find_by_name("option").is_none());
}
