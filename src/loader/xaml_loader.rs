//! 加载入口 - LoadInto / CreateNew / 模板实例化

use crate::error::{Position, Result, XamlError};
use crate::loader::context::{HydrationContext, Pass};
use crate::loader::extensions::ExtensionRegistry;
use crate::loader::resolver::ResourceResolver;
use crate::loader::resource::ComponentType;
use crate::loader::visitors::{create_root, run_pipeline, LoadEnvironment};
use crate::parser::markup::MarkupParser;
use crate::parser::tree::NodeTree;
use crate::runtime::{ObjectRef, TypeRegistry, Value};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 加载选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// 容错模式：节点级错误记录为诊断并继续
    pub do_not_throw_on_exceptions: bool,
}

/// 一次加载的结果
#[derive(Debug)]
pub struct LoadReport {
    pub root: ObjectRef,
    /// 根作用域中注册的名称
    pub names: IndexMap<String, Value>,
    pub diagnostics: Vec<XamlError>,
    pub passes: Vec<Pass>,
}

impl LoadReport {
    pub fn find_by_name(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    pub fn find_object(&self, name: &str) -> Option<ObjectRef> {
        self.find_by_name(name).and_then(|v| v.as_object()).cloned()
    }
}

/// 标记加载器
#[derive(Debug, Clone)]
pub struct XamlLoader {
    registry: Arc<TypeRegistry>,
    extensions: ExtensionRegistry,
    resolver: ResourceResolver,
    options: LoadOptions,
}

impl XamlLoader {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            extensions: ExtensionRegistry::new(),
            resolver: ResourceResolver::new(),
            options: LoadOptions::default(),
        }
    }

    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_resolver(mut self, resolver: ResourceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// 找到类型对应的文档；找不到时无论是否容错都是错误
    pub fn resolve_markup(&self, ty: &ComponentType) -> Result<String> {
        self.resolver
            .resolve(ty)
            .ok_or_else(|| XamlError::DocumentNotFound(ty.full_name().to_string()))
    }

    /// 代码后置类的实例：按文档根元素的类型创建，再交给 `load_type` 加载
    pub fn create_component(&self, ty: &ComponentType) -> Result<ObjectRef> {
        let markup = self.resolve_markup(ty)?;
        let tree = MarkupParser::new(&markup).parse()?;
        let root = &tree.node(tree.root()).type_name;
        self.registry.create(&root.namespace_uri, &root.local_name)
    }

    /// LoadInto(target, type)
    pub fn load_type(&self, target: &ObjectRef, ty: &ComponentType) -> Result<LoadReport> {
        let markup = self.resolve_markup(ty)?;
        info!("Loading {} into {}", ty, target.type_name().local_name);
        self.load_markup(target, &markup)
    }

    /// LoadInto(target, markup)
    pub fn load_markup(&self, target: &ObjectRef, markup: &str) -> Result<LoadReport> {
        let tree = MarkupParser::new(markup).parse_with_root(Some(target.clone()))?;
        let ctx = HydrationContext::new(Some(target.clone()), self.options.do_not_throw_on_exceptions);
        self.hydrate(tree, ctx)
    }

    /// CreateNew(markup, tolerant)：先创建根实例，再运行完整管线
    pub fn create(&self, markup: &str, tolerant: bool) -> Result<LoadReport> {
        let tree = MarkupParser::new(markup).parse()?;
        self.create_from_tree(tree, HydrationContext::new(None, tolerant))
    }

    /// 每次调用都从模板内容创建一组新的对象
    pub fn instantiate_template(&self, template: &ObjectRef) -> Result<LoadReport> {
        let content = template.borrow().template.clone().ok_or_else(|| {
            XamlError::coercion(
                template.type_name().local_name,
                "object has no template content",
                Position::default(),
            )
        })?;
        let outer_scope = content.live_outer_scope();
        debug!(
            "Instantiating {} with {} of {} outer scopes alive",
            template.type_name().local_name,
            outer_scope.len(),
            content.outer_scope.len()
        );
        let ctx = HydrationContext::new(None, self.options.do_not_throw_on_exceptions)
            .with_outer_scope(outer_scope);
        self.create_from_tree(content.tree, ctx)
    }

    fn create_from_tree(&self, mut tree: NodeTree, mut ctx: HydrationContext) -> Result<LoadReport> {
        let env = LoadEnvironment::new(&self.registry, &self.extensions);
        create_root(&mut tree, &mut ctx, &env)?;
        self.hydrate(tree, ctx)
    }

    fn hydrate(&self, mut tree: NodeTree, mut ctx: HydrationContext) -> Result<LoadReport> {
        let env = LoadEnvironment::new(&self.registry, &self.extensions);
        run_pipeline(&mut tree, &mut ctx, &env)?;

        let root = ctx
            .root_element
            .clone()
            .ok_or_else(|| XamlError::Internal("pipeline finished without a root element".into()))?;
        let names = ctx
            .root_scope()
            .map(|scope| ctx.scope(scope).names().clone())
            .unwrap_or_default();

        Ok(LoadReport {
            root,
            names,
            diagnostics: ctx.take_diagnostics(),
            passes: ctx.passes().to_vec(),
        })
    }
}
