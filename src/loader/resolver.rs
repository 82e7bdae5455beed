//! 标记文档定位 - 根据类型在资源包中找到对应的文档
//!
//! 查找顺序（命中即停）：
//! 1. 外部提供者（预览工具可以替换文档）
//! 2. 缓存的资源 id，重新读取且仍声明该类型
//! 3. 文件名或 id 后缀等于 `<类型名>.xaml`
//! 4. 任意 `.xaml` 后缀的资源
//! 5. 其余所有资源，要求以 `<` 开头
//!
//! 2~5 步都要求文档用 `x:Class` 声明了该类型的全名。

use crate::loader::resource::{ComponentType, ResourceBundle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// 标记文档后缀
pub const MARKUP_SUFFIX: &str = ".xaml";

/// 外部文档提供者
pub type MarkupProvider = Arc<dyn Fn(&ComponentType) -> Option<String> + Send + Sync>;

/// 类型 → 资源 id 缓存
///
/// 进程级共享，首次成功解析时写入，从不失效。写入由互斥锁串行化，
/// 不同类型并发解析时同一类型以最后写入者为准。
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(ty: &ComponentType) -> (String, String) {
        (ty.bundle().name().to_string(), ty.full_name().to_string())
    }

    pub fn get(&self, ty: &ComponentType) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&Self::key(ty)).cloned()
    }

    pub fn insert(&self, ty: &ComponentType, resource_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(Self::key(ty), resource_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 全局资源缓存，生命周期与进程相同
pub static RESOURCE_CACHE: Lazy<Arc<ResourceCache>> = Lazy::new(|| Arc::new(ResourceCache::new()));

/// 文档定位器
#[derive(Clone)]
pub struct ResourceResolver {
    cache: Arc<ResourceCache>,
    provider: Option<MarkupProvider>,
}

impl Default for ResourceResolver {
    fn default() -> Self {
        Self {
            cache: RESOURCE_CACHE.clone(),
            provider: None,
        }
    }
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("cached", &self.cache.len())
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

impl ResourceResolver {
    /// 使用全局缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用独立缓存
    pub fn with_cache(cache: Arc<ResourceCache>) -> Self {
        Self { cache, provider: None }
    }

    pub fn with_provider(mut self, provider: MarkupProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// 找到类型对应的标记文本
    pub fn resolve(&self, ty: &ComponentType) -> Option<String> {
        if let Some(provider) = &self.provider {
            if let Some(markup) = provider(ty) {
                debug!("Markup for {} supplied by provider", ty);
                return Some(markup);
            }
        }

        let bundle = ty.bundle().as_ref();
        let class = ClassMatcher::new(ty.full_name());

        if let Some(resource_id) = self.cache.get(ty) {
            if let Some(markup) = read_resource_as_markup(&class, bundle, &resource_id, false) {
                debug!("Markup for {} read from cached resource {}", ty, resource_id);
                return Some(markup);
            }
        }

        let resource_ids = bundle.resource_ids();
        let likely_filename = format!("{}{}", ty.name(), MARKUP_SUFFIX);

        let found = resource_ids
            .iter()
            .filter(|id| resource_matches_filename(bundle, id, &likely_filename))
            .find_map(|id| read_resource_as_markup(&class, bundle, id, false).map(|m| (id, m)))
            .or_else(|| {
                resource_ids
                    .iter()
                    .filter(|id| ends_with_ignore_case(id, MARKUP_SUFFIX))
                    .find_map(|id| read_resource_as_markup(&class, bundle, id, false).map(|m| (id, m)))
            })
            .or_else(|| {
                resource_ids
                    .iter()
                    .filter(|id| !ends_with_ignore_case(id, MARKUP_SUFFIX))
                    .find_map(|id| read_resource_as_markup(&class, bundle, id, true).map(|m| (id, m)))
            });

        match found {
            Some((resource_id, markup)) => {
                debug!("Markup for {} found in resource {}", ty, resource_id);
                self.cache.insert(ty, resource_id);
                Some(markup)
            }
            None => {
                debug!("No markup found for {}", ty);
                None
            }
        }
    }
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase())
}

fn resource_matches_filename(bundle: &dyn ResourceBundle, resource_id: &str, filename: &str) -> bool {
    match bundle.resource_filename(resource_id) {
        Ok(Some(declared)) if declared.eq_ignore_ascii_case(filename) => return true,
        Ok(_) => {}
        // 部分平台不支持文件名元数据，退回 id 匹配
        Err(e) => debug!("{}: {}", resource_id, e),
    }

    ends_with_ignore_case(resource_id, &format!(".{}", filename)) || resource_id.eq_ignore_ascii_case(filename)
}

/// 读取资源，仅当其用 x:Class 声明了该类型时返回文本。
/// `sniff` 为真时还要求第一个非空白字符是 `<`。
fn read_resource_as_markup(
    class: &ClassMatcher,
    bundle: &dyn ResourceBundle,
    resource_id: &str,
    sniff: bool,
) -> Option<String> {
    let mut bytes = Vec::new();
    let read = bundle
        .open_resource(resource_id)
        .and_then(|mut stream| stream.read_to_end(&mut bytes));
    if let Err(e) = read {
        warn!("Failed to read resource {}: {}", resource_id, e);
        return None;
    }

    let text = String::from_utf8(bytes).ok()?;
    let text = match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    };

    if sniff && text.trim_start().chars().next() != Some('<') {
        return None;
    }

    if class.is_declared_by(&text) {
        Some(text)
    } else {
        None
    }
}

/// `x:Class="<类型全名>"` 的匹配器，每次查找只编译一次
struct ClassMatcher {
    pattern: Option<Regex>,
    literal: String,
}

impl ClassMatcher {
    fn new(full_name: &str) -> Self {
        let pattern = Regex::new(&format!(r#"x:Class\s*=\s*"{}""#, regex::escape(full_name)));
        if let Err(e) = &pattern {
            warn!("Invalid x:Class pattern for {}: {}", full_name, e);
        }
        Self {
            pattern: pattern.ok(),
            literal: format!("x:Class=\"{}\"", full_name),
        }
    }

    fn is_declared_by(&self, markup: &str) -> bool {
        self.pattern.as_ref().map_or(false, |re| re.is_match(markup)) || markup.contains(&self.literal)
    }
}
