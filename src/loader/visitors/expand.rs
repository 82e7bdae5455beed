use super::LoadEnvironment;
use crate::error::{Result, XamlError};
use crate::loader::context::HydrationContext;
use crate::parser::extension::{parse_markup_text, MarkupText};
use crate::parser::tree::{is_xaml_namespace, AttrValue, NodeId, NodeTree};
use tracing::trace;

/// 把原始属性文本展开成字面量或标记扩展。
/// 只做语法展开和扩展名检查，求值留到属性应用时进行。
/// 可忽略命名空间下的元素和属性原样保留，交给裁剪遍删除。
pub fn expand_markup(tree: &mut NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) -> Result<()> {
    for id in tree.preorder(|_, node| tree.is_ignorable(&node.type_name.namespace_uri)) {
        if tree.is_ignorable(&tree.node(id).type_name.namespace_uri) {
            continue;
        }
        let expanded = expand_node(tree, id, env);
        if expanded.is_empty() {
            continue;
        }

        let mut failed = Vec::new();
        for (index, result) in expanded {
            match result {
                Ok(value) => tree.node_mut(id).attributes[index].value = value,
                Err(e) => {
                    ctx.recover(e)?;
                    failed.push(index);
                }
            }
        }
        // 容错模式下丢弃无法展开的属性
        for index in failed.into_iter().rev() {
            tree.node_mut(id).attributes.remove(index);
        }
    }
    Ok(())
}

fn expand_node(tree: &NodeTree, id: NodeId, env: &LoadEnvironment<'_>) -> Vec<(usize, Result<AttrValue>)> {
    let node = tree.node(id);
    let mut out = Vec::new();

    for (index, attribute) in node.attributes.iter().enumerate() {
        let raw = match &attribute.value {
            AttrValue::Raw(raw) => raw,
            _ => continue,
        };
        if tree.is_ignorable(&attribute.name.namespace_uri) {
            continue;
        }

        // x: 指令的值从不当作表达式
        if is_xaml_namespace(&attribute.name.namespace_uri) {
            out.push((index, Ok(AttrValue::Literal(raw.clone()))));
            continue;
        }

        let result = match parse_markup_text(raw) {
            Ok(MarkupText::Plain(text)) | Ok(MarkupText::Escaped(text)) => Ok(AttrValue::Literal(text)),
            Ok(MarkupText::Extension(mut expression)) => {
                trace!("{} {}: {}", id, attribute.name.local_name, expression.source);
                expression
                    .resolve_namespaces(&|prefix: &str| tree.lookup_namespace(id, prefix).map(str::to_string))
                    .and_then(|_| env.extensions.validate(&expression))
                    .map(|_| AttrValue::Extension(expression))
                    .map_err(|message| XamlError::expression(raw.as_str(), message, attribute.position))
            }
            Err(message) => Err(XamlError::expression(raw.as_str(), message, attribute.position)),
        };
        out.push((index, result));
    }
    out
}
