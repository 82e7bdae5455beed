use crate::parser::tree::NodeTree;

/// 写入父链接，包括模板内容在内的整棵树
pub fn link_parents(tree: &mut NodeTree) {
    let root = tree.root();
    tree.set_parent(root, None);

    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let children = tree.node(id).children.clone();
        for child in children {
            tree.set_parent(child, Some(id));
            stack.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::markup::MarkupParser;

    #[test]
    fn test_link_parents() {
        let mut tree = MarkupParser::new("<A><B><C /></B><D /></A>").parse().unwrap();
        link_parents(&mut tree);

        let root = tree.root();
        let b = tree.node(root).children[0];
        let c = tree.node(b).children[0];
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.parent(c), Some(b));
        assert_eq!(tree.ancestors(c).collect::<Vec<_>>(), vec![b, root]);
    }
}
