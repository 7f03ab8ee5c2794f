//! 上传会话存储
//!
//! 按 upload_id 隔离各次上传的提取结果。状态显式传递给需要它的调用方，
//! 不放在进程级共享变量里，避免跨请求串数据。

use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::batch::BatchOutcome;

/// 会话存储
///
/// 职责：
/// - 保存每次上传（upload_id）对应的批次结果
/// - 只做存取，不关心提取流程
pub struct SessionStore {
    sessions: Mutex<HashMap<String, BatchOutcome>>,
}

impl SessionStore {
    /// 创建空的会话存储
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 写入一次上传的结果（同一 upload_id 覆盖旧值）
    pub fn insert(&self, upload_id: impl Into<String>, outcome: BatchOutcome) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(upload_id.into(), outcome);
    }

    /// 取出并移除一次上传的结果
    pub fn take(&self, upload_id: &str) -> Option<BatchOutcome> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(upload_id)
    }

    /// 读取一次上传的结果（克隆）
    pub fn get(&self, upload_id: &str) -> Option<BatchOutcome> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(upload_id).cloned()
    }

    /// 当前保存的会话数量
    pub fn len(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::batch::ExtractionFailure;

    #[test]
    fn test_sessions_are_isolated_by_upload_id() {
        let store = SessionStore::new();

        let mut a = BatchOutcome::default();
        a.failures.push(ExtractionFailure {
            index: 3,
            reason: "a".to_string(),
        });
        store.insert("upload-a", a);
        store.insert("upload-b", BatchOutcome::default());

        assert_eq!(store.len(), 2);
        let got = store.take("upload-a").expect("upload-a 应该存在");
        assert_eq!(got.failures.len(), 1);
        assert!(store.take("upload-a").is_none());
        assert_eq!(store.len(), 1);
    }
}
