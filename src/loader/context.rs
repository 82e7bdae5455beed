//! 一次加载的上下文状态

use crate::error::{Result, XamlError};
use crate::parser::tree::NodeId;
use crate::runtime::{ObjectRef, Value};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::warn;

/// 管线中的各遍，按执行顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pass {
    ParentLinking,
    MarkupExpansion,
    PruneIgnored,
    Namescoping,
    ValueCreation,
    NameRegistration,
    ResourceDictionaryFill,
    PropertyApplication,
}

impl Pass {
    pub const ALL: [Pass; 8] = [
        Pass::ParentLinking,
        Pass::MarkupExpansion,
        Pass::PruneIgnored,
        Pass::Namescoping,
        Pass::ValueCreation,
        Pass::NameRegistration,
        Pass::ResourceDictionaryFill,
        Pass::PropertyApplication,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// 名称作用域
#[derive(Debug, Default)]
pub struct NameScope {
    parent: Option<ScopeId>,
    names: IndexMap<String, Value>,
}

impl NameScope {
    pub fn names(&self) -> &IndexMap<String, Value> {
        &self.names
    }
}

/// 加载上下文，只属于一次加载
pub struct HydrationContext {
    pub root_element: Option<ObjectRef>,
    pub do_not_throw_on_exceptions: bool,
    values: HashMap<NodeId, Value>,
    scopes: Vec<NameScope>,
    node_scopes: HashMap<NodeId, ScopeId>,
    /// 实例化模板时捕获的外层实例
    outer_scope: Vec<ObjectRef>,
    diagnostics: Vec<XamlError>,
    passes: Vec<Pass>,
}

impl HydrationContext {
    pub fn new(root_element: Option<ObjectRef>, do_not_throw_on_exceptions: bool) -> Self {
        Self {
            root_element,
            do_not_throw_on_exceptions,
            values: HashMap::new(),
            scopes: Vec::new(),
            node_scopes: HashMap::new(),
            outer_scope: Vec::new(),
            diagnostics: Vec::new(),
            passes: Vec::new(),
        }
    }

    pub fn with_outer_scope(mut self, outer_scope: Vec<ObjectRef>) -> Self {
        self.outer_scope = outer_scope;
        self
    }

    pub fn outer_scope(&self) -> &[ObjectRef] {
        &self.outer_scope
    }

    pub fn value(&self, id: NodeId) -> Option<&Value> {
        self.values.get(&id)
    }

    /// 每个节点只能写入一次
    pub fn set_value(&mut self, id: NodeId, value: Value) -> Result<()> {
        if self.values.contains_key(&id) {
            return Err(XamlError::Internal(format!("value for node {} created twice", id)));
        }
        self.values.insert(id, value);
        Ok(())
    }

    pub fn object(&self, id: NodeId) -> Option<ObjectRef> {
        self.value(id).and_then(|v| v.as_object()).cloned()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(NameScope {
            parent,
            names: IndexMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn set_node_scope(&mut self, id: NodeId, scope: ScopeId) {
        self.node_scopes.insert(id, scope);
    }

    pub fn node_scope(&self, id: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&id).copied()
    }

    pub fn scope(&self, id: ScopeId) -> &NameScope {
        &self.scopes[id.0]
    }

    /// 根作用域，Namescoping 之后才存在
    pub fn root_scope(&self) -> Option<ScopeId> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(ScopeId(0))
        }
    }

    /// 注册名称；同一作用域内重名返回 false
    pub fn register_name(&mut self, scope: ScopeId, name: &str, value: Value) -> bool {
        let names = &mut self.scopes[scope.0].names;
        if names.contains_key(name) {
            return false;
        }
        names.insert(name.to_string(), value);
        true
    }

    /// 沿作用域链向外查找
    pub fn find_name(&self, scope: ScopeId, name: &str) -> Option<Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let ns = &self.scopes[id.0];
            if let Some(v) = ns.names.get(name) {
                return Some(v.clone());
            }
            current = ns.parent;
        }
        None
    }

    /// 容错模式下记录错误并继续，否则原样返回
    pub fn recover(&mut self, error: XamlError) -> Result<()> {
        if self.do_not_throw_on_exceptions && !error.is_fatal() {
            warn!("Recovered: {}", error);
            self.diagnostics.push(error);
            Ok(())
        } else {
            Err(error)
        }
    }

    pub fn diagnostics(&self) -> &[XamlError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<XamlError> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn mark_pass(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    /// 已完成的遍，按完成顺序
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }
}
