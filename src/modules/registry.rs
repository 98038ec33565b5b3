//! 模块注册表：启动时显式注册，按名称实例化

use crate::error::{RswebscanError, RwsResult};

/// 模块构造函数
pub type ModuleFactory<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

/// 有序的 名称 -> 构造函数 注册表
pub struct ModuleRegistry<T: ?Sized> {
    entries: Vec<(String, ModuleFactory<T>)>,
}

impl<T: ?Sized> Default for ModuleRegistry<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: ?Sized> std::fmt::Debug for ModuleRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: ?Sized> ModuleRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模块；名称重复时报错
    pub fn register<F>(&mut self, name: &str, factory: F) -> RwsResult<()>
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        if self.contains(name) {
            return Err(RswebscanError::InvalidInput(format!("模块重复注册：{}", name)));
        }
        self.entries.push((name.to_string(), Box::new(factory)));
        Ok(())
    }

    /// 链式注册（用于内置模块，名称由调用方保证唯一）
    pub fn with<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        if !self.contains(name) {
            self.entries.push((name.to_string(), Box::new(factory)));
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// 按注册顺序列出名称
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn create(&self, name: &str) -> Option<Box<T>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, factory)| factory())
    }

    /// 实例化全部模块
    pub fn instantiate_all(&self) -> Vec<Box<T>> {
        self.entries.iter().map(|(_, factory)| factory()).collect()
    }

    /// 按名称挑选模块；存在未知名称时报错
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> RwsResult<Vec<Box<T>>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.create(name)
                    .ok_or_else(|| RswebscanError::InvalidInput(format!("未知模块：{}", name)))
            })
            .collect()
    }
}
