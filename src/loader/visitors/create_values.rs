use super::LoadEnvironment;
use crate::error::{Result, XamlError};
use crate::loader::context::HydrationContext;
use crate::parser::tree::{is_xaml_namespace, NodeId, NodeKind, NodeTree};
use crate::runtime::{ObjectRef, TemplateContent, TypeKind, Value};
use tracing::trace;

/// CreateNew 路径：先只创建根实例，写回根节点并作为 RootElement。
/// 根上带有 `x:Arguments` 时构造参数还不存在，留给 Value-Creation 遍处理。
pub fn create_root(tree: &mut NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) -> Result<()> {
    if let Some(instance) = tree.root_instance() {
        ctx.root_element = Some(instance.clone());
        return Ok(());
    }

    let root = tree.root();
    if arguments_node(tree, root).is_some() {
        return Ok(());
    }
    match create_value(tree, root, ctx, env)? {
        Value::Object(instance) => {
            tree.set_root_instance(instance.clone());
            ctx.root_element = Some(instance);
            Ok(())
        }
        other => Err(XamlError::Internal(format!(
            "root element must be an object, got {}",
            other.kind_name()
        ))),
    }
}

/// 子节点先于父节点创建实例，模板的内容不在此时实例化
pub fn create_values(tree: &mut NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) -> Result<()> {
    let root = tree.root();
    for id in tree.postorder(|_, node| env.is_template(node)) {
        if !tree.node(id).is_object_node() {
            continue;
        }

        if let Some(instance) = tree.root_instance().filter(|_| id == root).cloned() {
            // LoadInto：复用已有实例
            ctx.set_value(id, Value::Object(instance.clone()))?;
            if ctx.root_element.is_none() {
                ctx.root_element = Some(instance);
            }
            continue;
        }

        match create_value(tree, id, ctx, env) {
            Ok(value) => {
                trace!("{} created {}", id, value.kind_name());
                if id == root {
                    if let Value::Object(instance) = &value {
                        tree.set_root_instance(instance.clone());
                        ctx.root_element = Some(instance.clone());
                    }
                }
                ctx.set_value(id, value)?;
            }
            // 根节点失败时没有可返回的结果
            Err(e) if id == root => return Err(e),
            Err(e) => {
                ctx.recover(e)?;
                tree.detach(id);
            }
        }
    }
    Ok(())
}

fn arguments_node(tree: &NodeTree, id: NodeId) -> Option<NodeId> {
    tree.node(id).children.iter().copied().find(|c| {
        matches!(&tree.node(*c).kind, NodeKind::Property { name } if name.is_directive("Arguments"))
    })
}

fn text_content(tree: &NodeTree, id: NodeId) -> String {
    tree.node(id)
        .children
        .iter()
        .filter_map(|c| match &tree.node(*c).kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// `x:String` 等语言基元
fn create_primitive(local_name: &str, text: &str) -> Option<std::result::Result<Value, String>> {
    let trimmed = text.trim();
    let value = match local_name {
        "String" => Ok(Value::String(text.to_string())),
        "Int32" | "Int64" => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{}' is not an integer", trimmed)),
        "Double" | "Single" => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("'{}' is not a number", trimmed)),
        "Boolean" => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a bool", trimmed)),
        },
        "Null" => Ok(Value::Null),
        _ => return None,
    };
    Some(value)
}

fn create_value(tree: &NodeTree, id: NodeId, ctx: &HydrationContext, env: &LoadEnvironment<'_>) -> Result<Value> {
    let node = tree.node(id);
    let type_name = &node.type_name;

    if is_xaml_namespace(&type_name.namespace_uri) {
        if let Some(result) = create_primitive(&type_name.local_name, &text_content(tree, id)) {
            return result.map_err(|message| XamlError::coercion(type_name.local_name.as_str(), message, node.position));
        }
    }

    let descriptor = env.registry.resolve(type_name).ok_or_else(|| XamlError::UnresolvedType {
        namespace: type_name.namespace_uri.clone(),
        name: type_name.local_name.clone(),
        position: node.position,
    })?;

    // x:Arguments 的子节点已经先创建
    let arguments: Vec<Value> = match arguments_node(tree, id) {
        Some(args) => tree
            .node(args)
            .children
            .iter()
            .filter_map(|c| ctx.value(*c).cloned())
            .collect(),
        None => Vec::new(),
    };
    let factory = node.directive_text("FactoryMethod");

    let mut object = descriptor
        .instantiate(&arguments, factory)
        .map_err(|message| XamlError::coercion("x:Arguments", message, node.position))?;

    if descriptor.kind == TypeKind::Template {
        let content: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|c| matches!(tree.node(*c).kind, NodeKind::Element))
            .collect();
        match content.as_slice() {
            [] => {}
            [single] => {
                object.template = Some(TemplateContent {
                    tree: tree.extract(*single),
                    outer_scope: Vec::new(),
                });
            }
            _ => {
                return Err(XamlError::coercion(
                    type_name.local_name.as_str(),
                    "a template can only have one root element",
                    node.position,
                ))
            }
        }
    }

    Ok(Value::Object(ObjectRef::new(object)))
}
