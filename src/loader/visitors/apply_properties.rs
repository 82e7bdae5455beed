use super::LoadEnvironment;
use crate::error::{Result, XamlError};
use crate::loader::context::HydrationContext;
use crate::loader::extensions::ExtensionContext;
use crate::parser::tree::{is_xaml_namespace, AttrValue, NodeId, NodeKind, NodeTree};
use crate::runtime::convert::coerce;
use crate::runtime::{ObjectRef, PropertyType, TypeKind, Value, WeakObjectRef};
use tracing::trace;

/// 赋值目标：属性键（附加属性为 `Owner.Prop`）和声明的类型
struct Target {
    key: String,
    ty: PropertyType,
}

/// 把属性和子内容按文档顺序赋给节点的实例。
/// 容错模式下每次失败只跳过一个属性或一个子节点。
pub fn apply_properties(tree: &NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) -> Result<()> {
    for id in tree.postorder(|_, node| env.is_template(node)) {
        let object = match ctx.object(id) {
            Some(object) => object,
            None => continue,
        };
        trace!("Applying properties of {} ({})", id, object.type_name().local_name);

        if object.kind() == TypeKind::Template {
            capture_outer_scope(tree, ctx, id, &object);
        }
        apply_attributes(tree, ctx, env, id, &object)?;
        apply_children(tree, ctx, env, id, &object)?;
    }
    Ok(())
}

/// 模板记录祖先实例的弱引用，实例化时用于资源查找
fn capture_outer_scope(tree: &NodeTree, ctx: &HydrationContext, id: NodeId, template: &ObjectRef) {
    let scope: Vec<WeakObjectRef> = tree
        .ancestors(id)
        .filter_map(|a| ctx.object(a))
        .chain(ctx.outer_scope().iter().cloned())
        .map(|object| object.downgrade())
        .collect();
    if let Some(content) = template.borrow_mut().template.as_mut() {
        content.outer_scope = scope;
    }
}

fn apply_attributes(
    tree: &NodeTree,
    ctx: &mut HydrationContext,
    env: &LoadEnvironment<'_>,
    id: NodeId,
    object: &ObjectRef,
) -> Result<()> {
    for attribute in &tree.node(id).attributes {
        if is_xaml_namespace(&attribute.name.namespace_uri) {
            continue;
        }

        let value = match &attribute.value {
            AttrValue::Raw(text) | AttrValue::Literal(text) => Ok(Value::String(text.clone())),
            AttrValue::Extension(expression) => {
                let services = ExtensionContext::new(tree, ctx, env.registry, id);
                env.extensions
                    .evaluate(expression, &services)
                    .map_err(|message| XamlError::expression(expression.source.as_str(), message, attribute.position))
            }
        };

        let result = value.and_then(|value| {
            resolve_target(tree, env, id, object, &attribute.name.namespace_uri, &attribute.name.local_name)
                .and_then(|target| assign(object, &target, value))
                .map_err(|message| XamlError::coercion(attribute.name.local_name.as_str(), message, attribute.position))
        });
        if let Err(e) = result {
            ctx.recover(e)?;
        }
    }
    Ok(())
}

fn apply_children(
    tree: &NodeTree,
    ctx: &mut HydrationContext,
    env: &LoadEnvironment<'_>,
    id: NodeId,
    object: &ObjectRef,
) -> Result<()> {
    let kind = object.kind();
    // 字典条目由 Resource-Dictionary-Fill 处理，模板内容延迟实例化
    if matches!(kind, TypeKind::ResourceDictionary | TypeKind::Template) {
        return Ok(());
    }

    for &child in &tree.node(id).children {
        let node = tree.node(child);
        let result = match &node.kind {
            NodeKind::Text(text) => content_target(object)
                .and_then(|target| assign(object, &target, Value::String(text.clone())))
                .map_err(|message| XamlError::coercion(object.type_name().local_name, message, node.position)),

            NodeKind::Property { name } if name.is_directive("Arguments") => Ok(()),

            NodeKind::Property { name } => {
                resolve_target(tree, env, id, object, &name.namespace_uri, &name.local_name)
                    .and_then(|target| apply_property_element(tree, ctx, child, object, &target))
                    .map_err(|message| XamlError::coercion(name.local_name.as_str(), message, node.position))
            }

            NodeKind::Element | NodeKind::Root { .. } => match ctx.value(child).cloned() {
                Some(value) if kind == TypeKind::Collection => {
                    object.add_item(value);
                    Ok(())
                }
                Some(value) => content_target(object)
                    .and_then(|target| assign(object, &target, value))
                    .map_err(|message| XamlError::coercion(object.type_name().local_name, message, node.position)),
                None => Ok(()),
            },
        };
        if let Err(e) = result {
            ctx.recover(e)?;
        }
    }
    Ok(())
}

/// `<Owner.Prop>` 的内容；字典类型的属性在上一遍已经处理
fn apply_property_element(
    tree: &NodeTree,
    ctx: &HydrationContext,
    id: NodeId,
    object: &ObjectRef,
    target: &Target,
) -> std::result::Result<(), String> {
    if target.ty == PropertyType::Dictionary {
        return Ok(());
    }

    let values: Vec<Value> = tree
        .node(id)
        .children
        .iter()
        .filter_map(|c| match &tree.node(*c).kind {
            NodeKind::Text(text) => Some(Value::String(text.clone())),
            _ => ctx.value(*c).cloned(),
        })
        .collect();

    if target.ty == PropertyType::Collection {
        for value in values {
            assign(object, target, value)?;
        }
        return Ok(());
    }
    match values.len() {
        0 => Ok(()),
        1 => values
            .into_iter()
            .next()
            .map_or(Ok(()), |value| assign(object, target, value)),
        n => Err(format!("property {} takes a single value, got {}", target.key, n)),
    }
}

fn content_target(object: &ObjectRef) -> std::result::Result<Target, String> {
    let descriptor = object.descriptor();
    let name = descriptor
        .content_property_name()
        .ok_or_else(|| format!("{} has no content property", descriptor.name.local_name))?;
    let property = descriptor
        .property_descriptor(name)
        .ok_or_else(|| format!("content property {} is not declared", name))?;
    Ok(Target {
        key: property.name.clone(),
        ty: property.ty.clone(),
    })
}

/// 普通属性或附加属性（`Grid.Row`）
fn resolve_target(
    tree: &NodeTree,
    env: &LoadEnvironment<'_>,
    id: NodeId,
    object: &ObjectRef,
    namespace_uri: &str,
    name: &str,
) -> std::result::Result<Target, String> {
    let descriptor = object.descriptor();

    let (owner, property) = match name.rsplit_once('.') {
        Some(parts) => parts,
        None => {
            return descriptor
                .property_descriptor(name)
                .map(|p| Target {
                    key: p.name.clone(),
                    ty: p.ty.clone(),
                })
                .ok_or_else(|| format!("{} has no property {}", descriptor.name.local_name, name));
        }
    };

    if descriptor.is_assignable_to(owner) {
        if let Some(p) = descriptor.property_descriptor(property) {
            return Ok(Target {
                key: p.name.clone(),
                ty: p.ty.clone(),
            });
        }
    }

    // 无前缀时所有者类型在默认命名空间中
    let owner_namespace = if namespace_uri.is_empty() {
        tree.lookup_namespace(id, "")
            .unwrap_or(tree.node(id).type_name.namespace_uri.as_str())
    } else {
        namespace_uri
    };
    let owner_type = env
        .registry
        .get(owner_namespace, owner)
        .ok_or_else(|| format!("type {} not found in xmlns {}", owner, owner_namespace))?;
    let attached = owner_type
        .attached_descriptor(property)
        .ok_or_else(|| format!("{} has no attached property {}", owner, property))?;
    Ok(Target {
        key: format!("{}.{}", owner, property),
        ty: attached.ty.clone(),
    })
}

/// 集合属性追加，其余属性转换后赋值
fn assign(object: &ObjectRef, target: &Target, value: Value) -> std::result::Result<(), String> {
    match (&target.ty, value) {
        (PropertyType::Collection, value @ Value::List(_)) => {
            object.set(&target.key, value);
            Ok(())
        }
        (PropertyType::Collection, Value::Object(o)) if o.kind() == TypeKind::Collection => {
            object.set(&target.key, Value::Object(o));
            Ok(())
        }
        (PropertyType::Collection, value) => object.append_to(&target.key, value),
        (ty, value) => {
            let coerced = coerce(value, ty)?;
            object.set(&target.key, coerced);
            Ok(())
        }
    }
}
