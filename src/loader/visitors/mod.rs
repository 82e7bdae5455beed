//! 访问者管线 - 八个按顺序执行的遍
//!
//! 每一遍完整遍历一次节点树，只通过 `HydrationContext` 和对节点树的
//! 修改（裁剪）与后续的遍通信。

mod apply_properties;
mod create_values;
mod expand;
mod fill_resources;
mod namescope;
mod parent;
mod prune;
mod register_names;

pub use create_values::create_root;

use crate::error::Result;
use crate::loader::context::{HydrationContext, Pass};
use crate::loader::extensions::ExtensionRegistry;
use crate::parser::tree::{Node, NodeTree};
use crate::runtime::{TypeKind, TypeRegistry};
use tracing::debug;

/// 管线运行所需的只读服务
#[derive(Clone, Copy)]
pub struct LoadEnvironment<'a> {
    pub registry: &'a TypeRegistry,
    pub extensions: &'a ExtensionRegistry,
}

impl<'a> LoadEnvironment<'a> {
    pub fn new(registry: &'a TypeRegistry, extensions: &'a ExtensionRegistry) -> Self {
        Self { registry, extensions }
    }

    /// 模板节点：子树延迟实例化
    pub fn is_template(&self, node: &Node) -> bool {
        node.is_object_node()
            && self
                .registry
                .resolve(&node.type_name)
                .map_or(false, |d| d.kind == TypeKind::Template)
    }
}

/// 依次执行全部八遍
pub fn run_pipeline(tree: &mut NodeTree, ctx: &mut HydrationContext, env: &LoadEnvironment<'_>) -> Result<()> {
    for pass in Pass::ALL {
        match pass {
            Pass::ParentLinking => parent::link_parents(tree),
            Pass::MarkupExpansion => expand::expand_markup(tree, ctx, env)?,
            Pass::PruneIgnored => prune::prune_ignored(tree),
            Pass::Namescoping => namescope::assign_namescopes(tree, ctx, env),
            Pass::ValueCreation => create_values::create_values(tree, ctx, env)?,
            Pass::NameRegistration => register_names::register_names(tree, ctx, env)?,
            Pass::ResourceDictionaryFill => fill_resources::fill_resources(tree, ctx, env)?,
            Pass::PropertyApplication => apply_properties::apply_properties(tree, ctx, env)?,
        }
        ctx.mark_pass(pass);
        debug!("{:?} done ({} diagnostics)", pass, ctx.diagnostics().len());
    }
    Ok(())
}
