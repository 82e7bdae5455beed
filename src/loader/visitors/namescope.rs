use super::LoadEnvironment;
use crate::loader::context::HydrationContext;
use crate::parser::tree::NodeTree;
use std::collections::HashMap;

/// 给每个节点分配名称作用域。
/// 根节点开启根作用域，模板的内容开启一个子作用域，其余节点继承父节点。
pub fn assign_namescopes(tree: &NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) {
    let root = tree.root();
    let root_scope = ctx.new_scope(None);
    ctx.set_node_scope(root, root_scope);

    let mut template_scopes = HashMap::new();
    for id in tree.preorder(|_, _| false) {
        let parent = match tree.parent(id) {
            Some(p) => p,
            None => continue,
        };
        let inherited = ctx.node_scope(parent).unwrap_or(root_scope);

        let scope = if env.is_template(tree.node(parent)) {
            *template_scopes
                .entry(parent)
                .or_insert_with(|| ctx.new_scope(Some(inherited)))
        } else {
            inherited
        };
        ctx.set_node_scope(id, scope);
    }
}
