use super::LoadEnvironment;
use crate::error::{Result, XamlError};
use crate::loader::context::HydrationContext;
use crate::parser::tree::NodeTree;
use tracing::trace;

/// 把 `x:Name` 注册到节点所在的作用域；同一作用域内重名时先注册者保留
pub fn register_names(tree: &NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) -> Result<()> {
    for id in tree.preorder(|_, node| env.is_template(node)) {
        let node = tree.node(id);
        let name = match node.directive_text("Name") {
            Some(name) => name,
            None => continue,
        };
        let (value, scope) = match (ctx.value(id), ctx.node_scope(id)) {
            (Some(value), Some(scope)) => (value.clone(), scope),
            _ => continue,
        };

        if ctx.register_name(scope, name, value) {
            trace!("{} registered as {}", id, name);
        } else {
            let position = node.directive("Name").map(|a| a.position).unwrap_or(node.position);
            ctx.recover(XamlError::DuplicateName {
                name: name.to_string(),
                position,
            })?;
        }
    }
    Ok(())
}
