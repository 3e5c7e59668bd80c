//! 再利用バッファのプール
//!
//! ページ本文の読み込みやメッセージ本文の組み立てなど、
//! 取得ごとに繰り返し確保されるバッファを使い回す。
//! 借り出したバッファはガードのドロップ時に必ずプールへ戻る。

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, OnceLock};

/// プールに保持するバッファの最大数
const MAX_POOLED: usize = 8;

/// プールへ戻すときに中身を消去できる型
pub trait Reusable: Default {
    /// 中身を消し、容量を`keep_capacity`程度まで縮める
    fn clear_for_reuse(&mut self, keep_capacity: usize);
    fn with_capacity(capacity: usize) -> Self;
}

impl Reusable for Vec<u8> {
    fn clear_for_reuse(&mut self, keep_capacity: usize) {
        self.clear();
        self.shrink_to(keep_capacity);
    }

    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }
}

impl Reusable for String {
    fn clear_for_reuse(&mut self, keep_capacity: usize) {
        self.clear();
        self.shrink_to(keep_capacity);
    }

    fn with_capacity(capacity: usize) -> Self {
        String::with_capacity(capacity)
    }
}

/// バッファプール
pub struct Pool<T: Reusable> {
    items: Mutex<Vec<T>>,
    initial_capacity: usize,
    max_idle: usize,
}

impl<T: Reusable> Pool<T> {
    pub const fn new(initial_capacity: usize) -> Self {
        Self::with_max_idle(initial_capacity, MAX_POOLED)
    }

    /// 保持数の上限を指定して作成
    pub const fn with_max_idle(initial_capacity: usize, max_idle: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            initial_capacity,
            max_idle,
        }
    }

    /// バッファを借り出す（空きがなければ新規確保）
    pub fn checkout(&self) -> Pooled<'_, T> {
        let item = match self.items.lock() {
            Ok(mut items) => items.pop(),
            Err(_) => None,
        };
        Pooled {
            item: item.unwrap_or_else(|| T::with_capacity(self.initial_capacity)),
            pool: self,
        }
    }

    /// 現在プールされている数
    pub fn idle_count(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    fn give_back(&self, mut item: T) {
        item.clear_for_reuse(self.initial_capacity);
        if let Ok(mut items) = self.items.lock() {
            if items.len() < self.max_idle {
                items.push(item);
            }
        }
    }
}

/// 借り出し中のバッファ
pub struct Pooled<'a, T: Reusable> {
    item: T,
    pool: &'a Pool<T>,
}

impl<T: Reusable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Reusable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Reusable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let item = std::mem::take(&mut self.item);
        self.pool.give_back(item);
    }
}

/// ページ本文用（64KBから開始、保持は1本まで）
pub fn page_buffers() -> &'static Pool<Vec<u8>> {
    static POOL: OnceLock<Pool<Vec<u8>>> = OnceLock::new();
    POOL.get_or_init(|| Pool::with_max_idle(64 * 1024, 1))
}

/// メッセージ本文の組み立て用
pub fn text_buffers() -> &'static Pool<String> {
    static POOL: OnceLock<Pool<String>> = OnceLock::new();
    POOL.get_or_init(|| Pool::new(128))
}
