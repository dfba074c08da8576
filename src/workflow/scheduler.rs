//! 任务调度 - 流程层
//!
//! 单一协作时间线：所有任务按到期时间依次执行，同一时刻按入队顺序。
//! 时钟是可替换的，测试里用 `VirtualClock`，不需要真的等待。

use std::cell::Cell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use tokio::time::Instant;

/// 时间源，时间用"自起点以来的时长"表示
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now(&self) -> Duration;

    async fn sleep_until(&self, deadline: Duration);
}

/// 真实时间
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn instant_at(&self, offset: Duration) -> Instant {
        self.origin + offset
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep_until(&self, deadline: Duration) {
        tokio::time::sleep_until(self.instant_at(deadline)).await;
    }
}

/// 虚拟时间：等待即跳到目标时刻
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Cell<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    async fn sleep_until(&self, deadline: Duration) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

struct Entry<T> {
    due: Duration,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

/// 延迟队列
pub struct Scheduler<C, T> {
    clock: C,
    queue: BinaryHeap<Reverse<Entry<T>>>,
    next_seq: u64,
}

impl<C: Clock, T> Scheduler<C, T> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// 安排 `delay` 之后执行
    pub fn schedule(&mut self, delay: Duration, task: T) {
        let due = self.clock.now() + delay;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry { due, seq, task }));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 最早一个任务的到期时间
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.peek().map(|Reverse(entry)| entry.due)
    }

    /// 等到最早的任务到期并取出
    pub async fn next(&mut self) -> Option<T> {
        let due = self.next_due()?;
        self.clock.sleep_until(due).await;
        self.queue.pop().map(|Reverse(entry)| entry.task)
    }

    /// 丢弃全部任务，返回丢弃的数量
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }
}
