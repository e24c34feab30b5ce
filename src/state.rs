//! 线程安全的状态管理模块
//!
//! 每个 ScanEngine 实例拥有自己独立的去重集合, 不使用全局静态变量。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// 已尝试过的完整候选域名集合
///
/// 集合只增不减, 生命周期与所属的扫描引擎相同。
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl SeenSet {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 原子地检查并插入
    ///
    /// 首次插入返回 `true`, 已存在返回 `false`。
    pub fn insert_new(&self, fqc: &str) -> bool {
        // 持锁线程 panic 后集合内容仍然有效, 继续使用
        let mut seen = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seen.contains(fqc) {
            return false;
        }
        seen.insert(fqc.to_string())
    }

    /// 已登记的域名数量
    pub fn count(&self) -> usize {
        match self.inner.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_first_insert_wins() {
        let seen = SeenSet::new();
        assert!(seen.insert_new("a.example.com"));
        assert!(!seen.insert_new("a.example.com"));
        assert_eq!(seen.count(), 1);
    }

    #[test]
    fn test_thread_safety() {
        let seen = SeenSet::new();
        let winners = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        // 多个线程同时插入相同的域名, 只能有一个成功
        for _ in 0..16 {
            let seen = seen.clone();
            let winners = winners.clone();
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    if seen.insert_new(&format!("{}.example.com", i)) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 100);
        assert_eq!(seen.count(), 100);
    }

    #[test]
    fn test_state_isolation() {
        let seen1 = SeenSet::new();
        let seen2 = SeenSet::new();

        seen1.insert_new("a.example.com");

        assert_eq!(seen1.count(), 1);
        assert_eq!(seen2.count(), 0);
        assert!(seen2.insert_new("a.example.com"));
    }
}
