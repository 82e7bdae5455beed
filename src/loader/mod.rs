//! 标记加载器 - 文档定位、加载上下文、访问者管线与入口

pub mod context;
pub mod extensions;
pub mod resolver;
pub mod resource;
pub mod visitors;
pub mod xaml_loader;

pub use context::{HydrationContext, NameScope, Pass, ScopeId};
pub use extensions::{ExtensionArgs, ExtensionContext, ExtensionRegistry, MarkupExtension};
pub use resolver::{MarkupProvider, ResourceCache, ResourceResolver, MARKUP_SUFFIX, RESOURCE_CACHE};
pub use resource::{ComponentType, DirectoryBundle, EmbeddedBundle, MetadataUnsupported, ResourceBundle};
pub use xaml_loader::{LoadOptions, LoadReport, XamlLoader};
