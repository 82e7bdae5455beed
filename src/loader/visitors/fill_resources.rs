use super::LoadEnvironment;
use crate::error::{Result, XamlError};
use crate::loader::context::HydrationContext;
use crate::parser::tree::{NodeId, NodeKind, NodeTree, XmlName, FORMS_2014};
use crate::runtime::{Object, ObjectRef, PropertyType, TypeKind, Value};
use tracing::trace;

/// 按文档顺序填充资源字典，同键后者覆盖前者
pub fn fill_resources(tree: &NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) -> Result<()> {
    for id in tree.preorder(|_, node| env.is_template(node)) {
        let node = tree.node(id);
        match &node.kind {
            NodeKind::Root { .. } | NodeKind::Element => {
                let dictionary = ctx
                    .object(id)
                    .filter(|o| o.kind() == TypeKind::ResourceDictionary);
                if let Some(dictionary) = dictionary {
                    fill_dictionary(tree, ctx, &dictionary, &node.children)?;
                }
            }
            NodeKind::Property { name } => fill_property_element(tree, ctx, env, id, name)?,
            NodeKind::Text(_) => {}
        }
    }
    Ok(())
}

fn fill_dictionary(
    tree: &NodeTree,
    ctx: &mut HydrationContext,
    dictionary: &ObjectRef,
    entries: &[NodeId],
) -> Result<()> {
    for &entry in entries {
        let node = tree.node(entry);
        if !matches!(node.kind, NodeKind::Element) {
            continue;
        }
        let value = match ctx.value(entry) {
            Some(value) => value.clone(),
            None => continue,
        };
        match node.directive_text("Key") {
            Some(key) => {
                trace!("Resource {} = {}", key, value.kind_name());
                dictionary.insert_resource(key, value);
            }
            None => ctx.recover(XamlError::coercion(
                "x:Key",
                format!("{} in a resource dictionary has no key", node.type_name.local_name),
                node.position,
            ))?,
        }
    }
    Ok(())
}

/// `<Owner.Resources>`：子元素是字典本身时直接赋值，否则隐式创建字典并填充
fn fill_property_element(
    tree: &NodeTree,
    ctx: &mut HydrationContext,
    env: &LoadEnvironment<'_>,
    id: NodeId,
    name: &XmlName,
) -> Result<()> {
    let owner = match tree.parent(id).and_then(|p| ctx.object(p)) {
        Some(owner) => owner,
        None => return Ok(()),
    };
    let property = name.local_name.rsplit('.').next().unwrap_or(&name.local_name);
    let is_dictionary = owner
        .descriptor()
        .property_descriptor(property)
        .map_or(false, |p| p.ty == PropertyType::Dictionary);
    if !is_dictionary {
        return Ok(());
    }

    let node = tree.node(id);
    let elements: Vec<NodeId> = node
        .children
        .iter()
        .copied()
        .filter(|c| matches!(tree.node(*c).kind, NodeKind::Element))
        .collect();

    if let [single] = elements.as_slice() {
        let explicit = ctx
            .object(*single)
            .filter(|o| o.kind() == TypeKind::ResourceDictionary);
        if let Some(dictionary) = explicit {
            owner.set(property, Value::Object(dictionary));
            return Ok(());
        }
    }

    let dictionary = match owner.get(property) {
        Some(Value::Object(existing)) if existing.kind() == TypeKind::ResourceDictionary => existing,
        _ => match env.registry.get(FORMS_2014, "ResourceDictionary") {
            Some(descriptor) => {
                let created = ObjectRef::new(Object::new(descriptor));
                owner.set(property, Value::Object(created.clone()));
                created
            }
            None => {
                return ctx.recover(XamlError::coercion(
                    property,
                    "no ResourceDictionary type is registered",
                    node.position,
                ))
            }
        },
    };
    fill_dictionary(tree, ctx, &dictionary, &elements)
}
