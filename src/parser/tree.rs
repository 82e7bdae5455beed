//! 节点树模型
//!
//! 解析器产出的节点全部存放在一个 arena 中，通过 `NodeId` 索引。
//! 父节点只是一个索引（由第一遍 Parent-Linking 写入），不持有所有权，
//! 因此整棵树没有引用环。

use crate::error::Position;
use crate::parser::extension::Expression;
use crate::runtime::ObjectRef;
use std::fmt;

pub const XAML_2006: &str = "http://schemas.microsoft.com/winfx/2006/xaml";
pub const XAML_2009: &str = "http://schemas.microsoft.com/winfx/2009/xaml";
pub const FORMS_2014: &str = "http://xamarin.com/schemas/2014/forms";
pub const MARKUP_COMPATIBILITY: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

/// x: 语言命名空间（2006 / 2009 两个版本等价）
pub fn is_xaml_namespace(uri: &str) -> bool {
    uri == XAML_2006 || uri == XAML_2009
}

/// 带命名空间的类型名，既用于节点也用于解析后的运行时类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MarkupTypeName {
    pub namespace_uri: String,
    pub local_name: String,
    pub type_arguments: Option<Vec<MarkupTypeName>>,
}

impl MarkupTypeName {
    pub fn new(namespace_uri: &str, local_name: &str) -> Self {
        Self {
            namespace_uri: namespace_uri.to_string(),
            local_name: local_name.to_string(),
            type_arguments: None,
        }
    }
}

impl fmt::Display for MarkupTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace_uri, self.local_name)?;
        if let Some(args) = &self.type_arguments {
            let names: Vec<String> = args.iter().map(|a| a.local_name.clone()).collect();
            write!(f, "<{}>", names.join(","))?;
        }
        Ok(())
    }
}

/// 属性名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlName {
    pub namespace_uri: String,
    pub local_name: String,
}

impl XmlName {
    pub fn new(namespace_uri: &str, local_name: &str) -> Self {
        Self {
            namespace_uri: namespace_uri.to_string(),
            local_name: local_name.to_string(),
        }
    }

    pub fn is_directive(&self, local_name: &str) -> bool {
        is_xaml_namespace(&self.namespace_uri) && self.local_name == local_name
    }
}

/// 属性值
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// 解析器给出的原始文本
    Raw(String),
    /// 已展开的纯文本（例如去掉了 `{}` 转义）
    Literal(String),
    /// 已展开的标记扩展
    Extension(Expression),
}

impl AttrValue {
    /// 文本形式的值；标记扩展返回 None
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Raw(s) | AttrValue::Literal(s) => Some(s),
            AttrValue::Extension(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: XmlName,
    pub value: AttrValue,
    pub position: Position,
}

/// 节点种类
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// 根节点，持有将被填充的实例（CreateNew 路径下解析时为空）
    Root { instance: Option<ObjectRef> },
    Element,
    /// 属性元素 `<Owner.Prop>`，以及 `<x:Arguments>`
    Property { name: XmlName },
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 树节点
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub type_name: MarkupTypeName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
    /// 本元素上声明的 xmlns 前缀
    pub namespaces: Vec<(String, String)>,
    pub position: Position,
    parent: Option<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind, type_name: MarkupTypeName, position: Position) -> Self {
        Self {
            kind,
            type_name,
            attributes: Vec::new(),
            children: Vec::new(),
            namespaces: Vec::new(),
            position,
            parent: None,
        }
    }

    pub fn text(content: &str, position: Position) -> Self {
        Self::new(NodeKind::Text(content.to_string()), MarkupTypeName::default(), position)
    }

    pub fn is_object_node(&self) -> bool {
        matches!(self.kind, NodeKind::Root { .. } | NodeKind::Element)
    }

    pub fn attribute(&self, namespace_uri: &str, local_name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace_uri == namespace_uri && a.name.local_name == local_name)
    }

    /// 查找 x: 指令属性（x:Name、x:Key ...）
    pub fn directive(&self, local_name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name.is_directive(local_name))
    }

    pub fn directive_text(&self, local_name: &str) -> Option<&str> {
        self.directive(local_name).and_then(|a| a.value.as_text())
    }
}

/// 节点 arena
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
    root: NodeId,
    ignorable: Vec<String>,
}

impl NodeTree {
    /// 以给定根节点创建一棵树
    pub fn new(root: Node) -> Self {
        Self {
            nodes: vec![root],
            root: NodeId(0),
            ignorable: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// 加入一个游离节点
    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes[id.0].parent = parent;
    }

    /// 祖先链，由近及远，不含自身
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn ignorable_namespaces(&self) -> &[String] {
        &self.ignorable
    }

    pub fn set_ignorable_namespaces(&mut self, namespaces: Vec<String>) {
        self.ignorable = namespaces;
    }

    pub fn is_ignorable(&self, uri: &str) -> bool {
        self.ignorable.iter().any(|i| i == uri)
    }

    pub fn root_instance(&self) -> Option<&ObjectRef> {
        match &self.node(self.root).kind {
            NodeKind::Root { instance } => instance.as_ref(),
            _ => None,
        }
    }

    pub fn set_root_instance(&mut self, object: ObjectRef) {
        let root = self.root;
        if let NodeKind::Root { instance } = &mut self.node_mut(root).kind {
            *instance = Some(object);
        }
    }

    /// 从父节点的子列表中摘除（要求父链接已建立）
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// 沿祖先链解析命名空间前缀
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| {
                self.node(n)
                    .namespaces
                    .iter()
                    .find(|(p, _)| p == prefix)
                    .map(|(_, uri)| uri.as_str())
            })
    }

    /// 先序遍历；`skip_children` 为真的节点本身会被访问，但不进入其子树
    pub fn preorder<F>(&self, skip_children: F) -> Vec<NodeId>
    where
        F: Fn(NodeId, &Node) -> bool,
    {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let node = self.node(id);
            if skip_children(id, node) {
                continue;
            }
            for child in node.children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// 后序遍历（子节点先于父节点）
    pub fn postorder<F>(&self, skip_children: F) -> Vec<NodeId>
    where
        F: Fn(NodeId, &Node) -> bool,
    {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.postorder_from(self.root, &skip_children, &mut out);
        out
    }

    fn postorder_from<F>(&self, id: NodeId, skip_children: &F, out: &mut Vec<NodeId>)
    where
        F: Fn(NodeId, &Node) -> bool,
    {
        let node = self.node(id);
        if !skip_children(id, node) {
            for child in &node.children {
                self.postorder_from(*child, skip_children, out);
            }
        }
        out.push(id);
    }

    /// 把子树复制成一棵新树，新根为没有实例的 Root 节点。
    /// 祖先上声明的命名空间前缀会合并到新根上。
    pub fn extract(&self, id: NodeId) -> NodeTree {
        let source = self.node(id);
        let mut root = Node::new(
            NodeKind::Root { instance: None },
            source.type_name.clone(),
            source.position,
        );
        root.attributes = source.attributes.clone();
        root.namespaces = source.namespaces.clone();
        for ancestor in self.ancestors(id) {
            for (prefix, uri) in &self.node(ancestor).namespaces {
                if !root.namespaces.iter().any(|(p, _)| p == prefix) {
                    root.namespaces.push((prefix.clone(), uri.clone()));
                }
            }
        }

        let mut tree = NodeTree::new(root);
        tree.ignorable = self.ignorable.clone();
        let new_root = tree.root;
        for child in &source.children {
            self.copy_into(*child, &mut tree, new_root);
        }
        tree
    }

    fn copy_into(&self, id: NodeId, target: &mut NodeTree, parent: NodeId) {
        let mut copy = self.node(id).clone();
        let children = std::mem::take(&mut copy.children);
        copy.parent = None;
        let new_id = target.add(copy);
        target.append_child(parent, new_id);
        for child in children {
            self.copy_into(child, target, new_id);
        }
    }
}

pub struct Ancestors<'a> {
    tree: &'a NodeTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
