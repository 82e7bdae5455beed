use crate::parser::tree::{NodeKind, NodeTree};
use tracing::trace;

/// 删除 `mc:Ignorable` 声明的命名空间下的元素和属性
pub fn prune_ignored(tree: &mut NodeTree) {
    if tree.ignorable_namespaces().is_empty() {
        return;
    }

    let doomed: Vec<_> = tree
        .preorder(|_, node| tree.is_ignorable(&node.type_name.namespace_uri))
        .into_iter()
        .filter(|id| {
            let node = tree.node(*id);
            matches!(node.kind, NodeKind::Element | NodeKind::Property { .. })
                && tree.is_ignorable(&node.type_name.namespace_uri)
        })
        .collect();

    for id in doomed {
        trace!("Pruning {}", id);
        tree.detach(id);
    }

    let ignorable = tree.ignorable_namespaces().to_vec();
    for id in tree.preorder(|_, _| false) {
        tree.node_mut(id)
            .attributes
            .retain(|a| !ignorable.contains(&a.name.namespace_uri));
    }
}
