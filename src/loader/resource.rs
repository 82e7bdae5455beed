//! 资源包 - 标记文档所在的嵌入资源集合

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// 当前平台不支持查询资源的文件名元数据
#[derive(Debug, Error)]
#[error("resource filename metadata is not supported on this platform")]
pub struct MetadataUnsupported;

/// 资源包能力
pub trait ResourceBundle: Send + Sync {
    /// 包名，同时作为缓存键的一部分
    fn name(&self) -> &str;

    /// 全部资源 id，顺序即搜索顺序
    fn resource_ids(&self) -> Vec<String>;

    fn open_resource(&self, id: &str) -> io::Result<Box<dyn Read + '_>>;

    /// 资源声明的文件名，没有则为 None
    fn resource_filename(&self, id: &str) -> Result<Option<String>, MetadataUnsupported>;
}

/// 一个带代码后置类的类型，例如 `Demo.Views.MainPage`
#[derive(Clone)]
pub struct ComponentType {
    full_name: String,
    bundle: Arc<dyn ResourceBundle>,
}

impl ComponentType {
    pub fn new(full_name: &str, bundle: Arc<dyn ResourceBundle>) -> Self {
        Self {
            full_name: full_name.to_string(),
            bundle,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// 不带命名空间的类型名
    pub fn name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or(&self.full_name)
    }

    pub fn bundle(&self) -> &Arc<dyn ResourceBundle> {
        &self.bundle
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name, self.bundle.name())
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

struct EmbeddedResource {
    id: String,
    filename: Option<String>,
    data: Vec<u8>,
}

/// 内存中的资源包
pub struct EmbeddedBundle {
    name: String,
    resources: Vec<EmbeddedResource>,
    restricted_metadata: bool,
}

impl EmbeddedBundle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            resources: Vec::new(),
            restricted_metadata: false,
        }
    }

    pub fn with_resource(mut self, id: &str, data: impl Into<Vec<u8>>) -> Self {
        self.resources.push(EmbeddedResource {
            id: id.to_string(),
            filename: None,
            data: data.into(),
        });
        self
    }

    /// 带文件名元数据的资源
    pub fn with_file(mut self, id: &str, filename: &str, data: impl Into<Vec<u8>>) -> Self {
        self.resources.push(EmbeddedResource {
            id: id.to_string(),
            filename: Some(filename.to_string()),
            data: data.into(),
        });
        self
    }

    /// 模拟不支持文件名元数据的平台
    pub fn with_restricted_metadata(mut self) -> Self {
        self.restricted_metadata = true;
        self
    }
}

impl ResourceBundle for EmbeddedBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_ids(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.id.clone()).collect()
    }

    fn open_resource(&self, id: &str) -> io::Result<Box<dyn Read + '_>> {
        self.resources
            .iter()
            .find(|r| r.id == id)
            .map(|r| Box::new(Cursor::new(r.data.as_slice())) as Box<dyn Read + '_>)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no resource {}", id)))
    }

    fn resource_filename(&self, id: &str) -> Result<Option<String>, MetadataUnsupported> {
        if self.restricted_metadata {
            return Err(MetadataUnsupported);
        }
        Ok(self
            .resources
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| r.filename.clone()))
    }
}

/// 目录资源包：`<包名>.<子目录>.<文件名>` 形式的 id
pub struct DirectoryBundle {
    name: String,
    files: BTreeMap<String, PathBuf>,
}

impl DirectoryBundle {
    /// 扫描目录（递归），文件按路径排序
    pub fn open(name: &str, root: &Path) -> io::Result<Self> {
        let mut files = BTreeMap::new();
        collect_files(root, root, name, &mut files)?;
        Ok(Self {
            name: name.to_string(),
            files,
        })
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    bundle: &str,
    files: &mut BTreeMap<String, PathBuf>,
) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, bundle, files)?;
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let mut id = bundle.to_string();
        for part in relative.iter() {
            id.push('.');
            id.push_str(&part.to_string_lossy());
        }
        files.insert(id, path);
    }
    Ok(())
}

impl ResourceBundle for DirectoryBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_ids(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn open_resource(&self, id: &str) -> io::Result<Box<dyn Read + '_>> {
        let path = self
            .files
            .get(id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no resource {}", id)))?;
        Ok(Box::new(fs::File::open(path)?))
    }

    fn resource_filename(&self, id: &str) -> Result<Option<String>, MetadataUnsupported> {
        Ok(self
            .files
            .get(id)
            .and_then(|p| p.file_name())
            .map(|f| f.to_string_lossy().into_owned()))
    }
}
