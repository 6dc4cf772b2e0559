use std::sync::Arc;

use crate::storage::ContentRepository;

/// 应用程序上下文
///
/// [`AppState`] 持有内容仓储，由路由共享。仓储在启动时显式构造后注入。
pub struct AppState<R> {
    repo: Arc<R>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: ContentRepository> AppState<R> {
    /// 创建一个新的 [`AppState`] 实例
    pub fn new(repo: R) -> Self {
        Self {
            repo: Arc::new(repo),
        }
    }

    /// 获取仓储对象
    pub fn repo(&self) -> &R {
        &self.repo
    }
}
