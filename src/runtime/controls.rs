//! 标准控件集
//! 注册在默认 Forms 命名空间下，供加载器和命令行使用

use crate::parser::tree::FORMS_2014;
use crate::runtime::object::{Object, Value};
use crate::runtime::registry::{PropertyType, TypeDescriptor, TypeKind, TypeRegistry};
use std::sync::Arc;

fn options() -> PropertyType {
    PropertyType::Enum(
        ["Start", "Center", "End", "Fill", "StartAndExpand", "CenterAndExpand", "EndAndExpand", "FillAndExpand"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
}

fn object(name: &str) -> PropertyType {
    PropertyType::Object(Some(name.to_string()))
}

/// 注册全部标准控件
pub fn register_controls(registry: &mut TypeRegistry) {
    let ns = FORMS_2014;

    // 基础类型
    let element = TypeDescriptor::new(ns, "Element").property("StyleId", PropertyType::String);
    let visual = TypeDescriptor::new(ns, "VisualElement")
        .property("IsVisible", PropertyType::Bool)
        .property("IsEnabled", PropertyType::Bool)
        .property("Opacity", PropertyType::Float)
        .property("BackgroundColor", object("Color"))
        .property("Resources", PropertyType::Dictionary)
        .property("Style", object("Style"))
        .extends(&element);
    let view = TypeDescriptor::new(ns, "View")
        .property("Margin", PropertyType::String)
        .property("HorizontalOptions", options())
        .property("VerticalOptions", options())
        .extends(&visual);

    let page = TypeDescriptor::new(ns, "Page")
        .property("Title", PropertyType::String)
        .property("Padding", PropertyType::String)
        .extends(&visual);
    let content_page = TypeDescriptor::new(ns, "ContentPage")
        .property("Content", object("View"))
        .content_property("Content")
        .extends(&page);
    let content_view = TypeDescriptor::new(ns, "ContentView")
        .property("Content", object("View"))
        .content_property("Content")
        .extends(&view);

    let stack = TypeDescriptor::new(ns, "StackLayout")
        .property("Children", PropertyType::Collection)
        .property(
            "Orientation",
            PropertyType::Enum(vec!["Vertical".into(), "Horizontal".into()]),
        )
        .property("Spacing", PropertyType::Float)
        .content_property("Children")
        .extends(&view);
    let grid = TypeDescriptor::new(ns, "Grid")
        .property("Children", PropertyType::Collection)
        .property("RowSpacing", PropertyType::Float)
        .property("ColumnSpacing", PropertyType::Float)
        .attached_property("Row", PropertyType::Int)
        .attached_property("Column", PropertyType::Int)
        .attached_property("RowSpan", PropertyType::Int)
        .attached_property("ColumnSpan", PropertyType::Int)
        .content_property("Children")
        .extends(&view);

    let label = TypeDescriptor::new(ns, "Label")
        .property("Text", PropertyType::String)
        .property("FontSize", PropertyType::Float)
        .property("TextColor", object("Color"))
        .property(
            "FontAttributes",
            PropertyType::Enum(vec!["None".into(), "Bold".into(), "Italic".into()]),
        )
        .content_property("Text")
        .extends(&view);
    let button = TypeDescriptor::new(ns, "Button")
        .property("Text", PropertyType::String)
        .property("Command", PropertyType::Any)
        .property("CommandParameter", PropertyType::Any)
        .extends(&view);
    let entry = TypeDescriptor::new(ns, "Entry")
        .property("Text", PropertyType::String)
        .property("Placeholder", PropertyType::String)
        .property("IsPassword", PropertyType::Bool)
        .extends(&view);
    let image = TypeDescriptor::new(ns, "Image")
        .property("Source", PropertyType::String)
        .extends(&view);
    let list_view = TypeDescriptor::new(ns, "ListView")
        .property("ItemsSource", PropertyType::Any)
        .property("ItemTemplate", object("DataTemplate"))
        .property("Header", PropertyType::Any)
        .property("RowHeight", PropertyType::Int)
        .extends(&view);
    let view_cell = TypeDescriptor::new(ns, "ViewCell")
        .property("View", object("View"))
        .content_property("View");

    let dictionary = TypeDescriptor::new(ns, "ResourceDictionary").kind(TypeKind::ResourceDictionary);
    let data_template = TypeDescriptor::new(ns, "DataTemplate").kind(TypeKind::Template);
    let control_template = TypeDescriptor::new(ns, "ControlTemplate").kind(TypeKind::Template);

    let setter = TypeDescriptor::new(ns, "Setter")
        .property("Property", PropertyType::String)
        .property("Value", PropertyType::Any);
    let style = TypeDescriptor::new(ns, "Style")
        .property("TargetType", PropertyType::Any)
        .property("BasedOn", object("Style"))
        .property("Setters", PropertyType::Collection)
        .content_property("Setters")
        .constructor(&["TargetType"]);

    let color = TypeDescriptor::new(ns, "Color")
        .property("R", PropertyType::Float)
        .property("G", PropertyType::Float)
        .property("B", PropertyType::Float)
        .property("A", PropertyType::Float)
        .constructor(&["R", "G", "B"])
        .factory("FromHex", color_from_hex)
        .factory("FromRgba", color_from_rgba);

    for descriptor in [
        element,
        visual,
        view,
        page,
        content_page,
        content_view,
        stack,
        grid,
        label,
        button,
        entry,
        image,
        list_view,
        view_cell,
        dictionary,
        data_template,
        control_template,
        setter,
        style,
        color,
    ] {
        registry.register(descriptor);
    }
}

fn color_from_hex(descriptor: &Arc<TypeDescriptor>, arguments: &[Value]) -> Result<Object, String> {
    let hex = match arguments {
        [Value::String(s)] => s.trim().trim_start_matches('#'),
        _ => return Err("FromHex expects a single string argument".into()),
    };
    let channel = |i: usize| -> Result<f64, String> {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .map(|v| v as f64 / 255.0)
            .ok_or_else(|| format!("'{}' is not a hex color", hex))
    };
    let (a, r, g, b) = match hex.len() {
        6 => (1.0, channel(0)?, channel(2)?, channel(4)?),
        8 => (channel(0)?, channel(2)?, channel(4)?, channel(6)?),
        _ => return Err(format!("'{}' is not a hex color", hex)),
    };
    Ok(rgba(descriptor, r, g, b, a))
}

fn color_from_rgba(descriptor: &Arc<TypeDescriptor>, arguments: &[Value]) -> Result<Object, String> {
    let mut channels = Vec::with_capacity(4);
    for argument in arguments {
        let value = match argument {
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| format!("'{}' is not a number", s))?,
            other => other
                .as_float()
                .ok_or_else(|| format!("cannot use {} as a color channel", other.kind_name()))?,
        };
        channels.push(value);
    }
    match channels.as_slice() {
        [r, g, b, a] => Ok(rgba(descriptor, *r, *g, *b, *a)),
        _ => Err("FromRgba expects four arguments".into()),
    }
}

fn rgba(descriptor: &Arc<TypeDescriptor>, r: f64, g: f64, b: f64, a: f64) -> Object {
    let mut color = Object::new(descriptor.clone());
    for (name, v) in [("R", r), ("G", g), ("B", b), ("A", a)] {
        color.properties.insert(name.to_string(), Value::Float(v));
    }
    color
}
