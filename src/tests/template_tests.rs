//! 模板测试
//! 测试模板内容的延迟实例化、独立名称作用域和外层资源查找

use super::{doc, loader};
use crate::error::XamlError;
use crate::runtime::{ObjectRef, Value};

const LIST_PAGE: &str = r#"<ContentPage $NS x:Name="page">
    <ContentPage.Resources>
        <x:String x:Key="Greeting">Hi</x:String>
    </ContentPage.Resources>
    <ListView x:Name="list">
        <ListView.ItemTemplate>
            <DataTemplate>
                <ViewCell x:Name="cell">
                    <Label x:Name="list" Text="{StaticResource Greeting}" />
                </ViewCell>
            </DataTemplate>
        </ListView.ItemTemplate>
    </ListView>
</ContentPage>"#;

fn item_template(list: &ObjectRef) -> ObjectRef {
    match list.get("ItemTemplate") {
        Some(Value::Object(o)) => o,
        other => panic!("expected template, got {:?}", other),
    }
}

/// 模板内容在加载时不实例化，名称也不进入外层作用域
#[test]
fn test_template_content_is_deferred() {
    let report = loader().create(&doc(LIST_PAGE), false).unwrap();
    assert!(report.diagnostics.is_empty());
    assert!(report.find_by_name("cell").is_none());

    let list = report.find_object("list").unwrap();
    assert_eq!(list.type_name().local_name, "ListView");

    let template = item_template(&list);
    let object = template.borrow();
    let content = object.template.as_ref().unwrap();
    assert_eq!(content.tree.node(content.tree.root()).type_name.local_name, "ViewCell");
    // 由近及远：ListView、ContentPage
    assert_eq!(content.outer_scope.len(), 2);
    assert!(content.outer_scope[1].upgrade().unwrap().ptr_eq(&report.root));
}

/// 每次实例化得到一组新的对象
#[test]
fn test_instantiate_template_twice() {
    let loader = loader();
    let report = loader.create(&doc(LIST_PAGE), false).unwrap();
    let template = item_template(&report.find_object("list").unwrap());

    let first = loader.instantiate_template(&template).unwrap();
    let second = loader.instantiate_template(&template).unwrap();

    assert_eq!(first.root.type_name().local_name, "ViewCell");
    assert!(!first.root.ptr_eq(&second.root));

    for item in [&first, &second] {
        let label = item.find_object("list").unwrap();
        assert_eq!(label.type_name().local_name, "Label");
        // StaticResource 通过外层实例找到页面的资源
        assert_eq!(label.get("Text"), Some(Value::from("Hi")));
        assert!(matches!(item.root.get("View"), Some(Value::Object(ref o)) if o.ptr_eq(&label)));
    }
}

/// 模板只弱引用外层实例，报告释放后整个页面随之释放
#[test]
fn test_template_page_is_released() {
    let loader = loader();
    let (root, list, template) = {
        let report = loader.create(&doc(LIST_PAGE), false).unwrap();
        let list = report.find_object("list").unwrap();
        (report.root.downgrade(), list.downgrade(), item_template(&list))
    };
    assert!(root.upgrade().is_none());
    assert!(list.upgrade().is_none());

    // 外层资源已不存在
    assert!(template.borrow().template.as_ref().unwrap().live_outer_scope().is_empty());
    assert!(loader.instantiate_template(&template).is_err());
}

#[test]
fn test_template_single_root() {
    let err = loader()
        .create(
            &doc(
                r#"<ListView $NS><ListView.ItemTemplate>
                    <DataTemplate><ViewCell /><ViewCell /></DataTemplate>
                </ListView.ItemTemplate></ListView>"#,
            ),
            false,
        )
        .unwrap_err();
    assert!(matches!(err, XamlError::Coercion { .. }));
}

#[test]
fn test_nested_template_keeps_outer_scope() {
    let loader = loader();
    let report = loader
        .create(
            &doc(
                r#"<ContentPage $NS>
                    <ContentPage.Resources><x:String x:Key="Word">deep</x:String></ContentPage.Resources>
                    <ListView x:Name="outer">
                        <ListView.ItemTemplate>
                            <DataTemplate>
                                <ViewCell>
                                    <ListView x:Name="inner">
                                        <ListView.ItemTemplate>
                                            <DataTemplate><ViewCell><Label x:Name="label" Text="{StaticResource Word}" /></ViewCell></DataTemplate>
                                        </ListView.ItemTemplate>
                                    </ListView>
                                </ViewCell>
                            </DataTemplate>
                        </ListView.ItemTemplate>
                    </ListView>
                </ContentPage>"#,
            ),
            false,
        )
        .unwrap();

    let outer_cell = loader
        .instantiate_template(&item_template(&report.find_object("outer").unwrap()))
        .unwrap();
    let inner_template = item_template(&outer_cell.find_object("inner").unwrap());
    let inner_cell = loader.instantiate_template(&inner_template).unwrap();
    assert_eq!(
        inner_cell.find_object("label").unwrap().get("Text"),
        Some(Value::from("deep"))
    );
}

#[test]
fn test_instantiate_non_template() {
    let report = loader().create(&doc(r#"<Label $NS />"#), false).unwrap();
    assert!(loader().instantiate_template(&report.root).is_err());
}
