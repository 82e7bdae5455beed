//! 文档定位测试
//! 测试查找顺序、缓存、提供者和两种资源包

use crate::loader::{ComponentType, DirectoryBundle, EmbeddedBundle, MarkupProvider, ResourceBundle, ResourceCache, ResourceResolver};
use std::fs;
use std::sync::Arc;

/// 声明了 x:Class 的页面
fn page(class: &str, title: &str) -> String {
    format!(
        r#"<ContentPage xmlns="http://xamarin.com/schemas/2014/forms" xmlns:x="http://schemas.microsoft.com/winfx/2009/xaml" x:Class="{}" Title="{}" />"#,
        class, title
    )
}

/// 使用独立缓存的定位器
fn resolver() -> ResourceResolver {
    ResourceResolver::with_cache(Arc::new(ResourceCache::new()))
}

fn main_page(bundle: EmbeddedBundle) -> ComponentType {
    ComponentType::new("Demo.MainPage", Arc::new(bundle))
}

#[test]
fn test_type_name() {
    let ty = main_page(EmbeddedBundle::new("app"));
    assert_eq!(ty.full_name(), "Demo.MainPage");
    assert_eq!(ty.name(), "MainPage");
}

/// 文件名匹配优先于后缀扫描
#[test]
fn test_filename_match_wins() {
    let bundle = EmbeddedBundle::new("app")
        .with_resource("app.Other.xaml", page("Demo.MainPage", "wrong"))
        .with_resource("app.Views.MainPage.xaml", page("Demo.MainPage", "right"));
    let markup = resolver().resolve(&main_page(bundle)).unwrap();
    assert!(markup.contains("Title=\"right\""));
}

#[test]
fn test_filename_metadata() {
    let bundle = EmbeddedBundle::new("app")
        .with_resource("app.Any.xaml", page("Demo.MainPage", "by suffix"))
        .with_file("res0", "MainPage.xaml", page("Demo.MainPage", "by metadata"));
    let markup = resolver().resolve(&main_page(bundle)).unwrap();
    assert!(markup.contains("by metadata"));
}

/// 文件名匹配但 x:Class 不符时继续往后找
#[test]
fn test_suffix_scan_requires_declared_class() {
    let bundle = EmbeddedBundle::new("app")
        .with_resource("app.MainPage.xaml", page("Demo.Other", "stale"))
        .with_resource("app.A.xaml", page("Demo.Other", "a"))
        .with_resource("app.B.xaml", page("Demo.MainPage", "b"));
    let markup = resolver().resolve(&main_page(bundle)).unwrap();
    assert!(markup.contains("Title=\"b\""));
}

#[test]
fn test_sniff_fallback() {
    let notes = "# notes\nx:Class=\"Demo.MainPage\"";
    let bundle = EmbeddedBundle::new("app")
        .with_resource("app.notes.txt", notes)
        .with_resource("app.MainPage.layout", format!("\n   {}", page("Demo.MainPage", "sniffed")));
    let markup = resolver().resolve(&main_page(bundle)).unwrap();
    assert!(markup.contains("sniffed"));
}

#[test]
fn test_class_attribute_whitespace() {
    let markup = r#"<ContentPage xmlns:x="http://schemas.microsoft.com/winfx/2009/xaml" x:Class = "Demo.MainPage" />"#;
    let bundle = EmbeddedBundle::new("app").with_resource("app.Page.xaml", markup);
    assert_eq!(resolver().resolve(&main_page(bundle)).as_deref(), Some(markup));
}

/// 不支持文件名元数据时退回 id 匹配
#[test]
fn test_restricted_metadata() {
    let bundle = EmbeddedBundle::new("app")
        .with_resource("app.MainPage.xaml", page("Demo.MainPage", "restricted"))
        .with_restricted_metadata();
    assert!(bundle.resource_filename("app.MainPage.xaml").is_err());

    let markup = resolver().resolve(&main_page(bundle)).unwrap();
    assert!(markup.contains("restricted"));
}

#[test]
fn test_bom_is_stripped() {
    let mut data = "\u{feff}".as_bytes().to_vec();
    data.extend_from_slice(page("Demo.MainPage", "bom").as_bytes());
    let bundle = EmbeddedBundle::new("app").with_resource("app.MainPage.xaml", data);
    let markup = resolver().resolve(&main_page(bundle)).unwrap();
    assert!(markup.starts_with("<ContentPage"));
}

/// 冷缓存和热缓存得到相同的文本
#[test]
fn test_cache_cold_and_warm() {
    let cache = Arc::new(ResourceCache::new());
    let resolver = ResourceResolver::with_cache(cache.clone());
    let ty = main_page(
        EmbeddedBundle::new("app")
            .with_resource("app.Other.xaml", page("Demo.Other", "other"))
            .with_resource("app.MainPage.xaml", page("Demo.MainPage", "main")),
    );

    assert!(cache.is_empty());
    let cold = resolver.resolve(&ty).unwrap();
    assert_eq!(cache.get(&ty).as_deref(), Some("app.MainPage.xaml"));
    let warm = resolver.resolve(&ty).unwrap();
    assert_eq!(cold, warm);
    assert_eq!(cache.len(), 1);
}

/// 缓存的资源不再声明该类型时重新搜索并覆盖缓存
#[test]
fn test_stale_cache_entry_is_replaced() {
    let cache = Arc::new(ResourceCache::new());
    let resolver = ResourceResolver::with_cache(cache.clone());

    let first = main_page(EmbeddedBundle::new("app").with_resource("app.MainPage.xaml", page("Demo.MainPage", "v1")));
    resolver.resolve(&first).unwrap();
    assert_eq!(cache.get(&first).as_deref(), Some("app.MainPage.xaml"));

    let second = main_page(
        EmbeddedBundle::new("app")
            .with_resource("app.MainPage.xaml", page("Demo.Renamed", "v1"))
            .with_resource("app.Moved.xaml", page("Demo.MainPage", "v2")),
    );
    let markup = resolver.resolve(&second).unwrap();
    assert!(markup.contains("v2"));
    assert_eq!(cache.get(&second).as_deref(), Some("app.Moved.xaml"));
}

#[test]
fn test_provider_overrides() {
    let provider: MarkupProvider = Arc::new(|ty: &ComponentType| {
        if ty.full_name() == "Demo.MainPage" {
            Some(page("Demo.MainPage", "preview"))
        } else {
            None
        }
    });
    let resolver = resolver().with_provider(provider);
    let bundle = Arc::new(
        EmbeddedBundle::new("app")
            .with_resource("app.MainPage.xaml", page("Demo.MainPage", "bundled"))
            .with_resource("app.Settings.xaml", page("Demo.Settings", "settings")),
    );

    let main = ComponentType::new("Demo.MainPage", bundle.clone());
    assert!(resolver.resolve(&main).unwrap().contains("preview"));
    // 提供者返回 None 时照常搜索
    let settings = ComponentType::new("Demo.Settings", bundle);
    assert!(resolver.resolve(&settings).unwrap().contains("settings"));
    assert_eq!(resolver.cache().len(), 1);
}

#[test]
fn test_not_found() {
    let resolver = resolver();
    let bundle = EmbeddedBundle::new("app")
        .with_resource("app.Other.xaml", page("Demo.Other", "other"))
        .with_resource("app.readme", "hello");
    assert_eq!(resolver.resolve(&main_page(bundle)), None);
    assert!(resolver.cache().is_empty());
}

#[test]
fn test_directory_bundle() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("Views")).unwrap();
    fs::write(dir.path().join("Views").join("MainPage.xaml"), page("Demo.MainPage", "disk")).unwrap();
    fs::write(dir.path().join("readme.txt"), "not markup").unwrap();

    let bundle = DirectoryBundle::open("app", dir.path()).unwrap();
    assert_eq!(
        bundle.resource_ids(),
        vec!["app.Views.MainPage.xaml".to_string(), "app.readme.txt".to_string()]
    );
    assert_eq!(
        bundle.resource_filename("app.Views.MainPage.xaml").unwrap().as_deref(),
        Some("MainPage.xaml")
    );

    let ty = ComponentType::new("Demo.MainPage", Arc::new(bundle));
    assert!(resolver().resolve(&ty).unwrap().contains("disk"));
}
