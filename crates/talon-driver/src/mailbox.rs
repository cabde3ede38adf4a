//! 帧邮箱
//!
//! 以仲裁 ID 为主键的"最新一帧"存储：后台读取线程 `deposit`，
//! 前台轮询 `take`。整张表由一把锁保护，`deposit` 与 `take`
//! 对同一 ID 严格串行，不会观察到撕裂的帧。
//!
//! 语义上这是一个有损信箱：同一 ID 的新帧**覆盖**未被取走的旧帧
//! （不排队）；`take` 是唯一的读路径，取走即清空，同一物理帧
//! 不会被返回两次。

use parking_lot::Mutex;
use std::collections::HashMap;
use talon_can::TalonFrame;

/// 每仲裁 ID 至多一帧的并发存储
#[derive(Debug, Default)]
pub struct Mailbox {
    slots: Mutex<HashMap<u32, TalonFrame>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 存入一帧，覆盖该 ID 下任何未被取走的旧帧
    pub fn deposit(&self, frame: TalonFrame) {
        self.slots.lock().insert(frame.id, frame);
    }

    /// 原子地取走并清空指定 ID 的帧
    ///
    /// 返回 `None` 表示该 ID 当前没有待取的帧——这是正常的
    /// 空轮询结果，不是错误。
    pub fn take(&self, id: u32) -> Option<TalonFrame> {
        self.slots.lock().remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_from_empty_mailbox_is_none() {
        let mailbox = Mailbox::new();
        // 从未存入过的 ID，每次都返回 None
        for _ in 0..3 {
            assert!(mailbox.take(0x123).is_none());
        }
    }

    #[test]
    fn test_consume_once() {
        let mailbox = Mailbox::new();
        let frame = TalonFrame::new_data(0x2040000, &[1, 2, 3, 4]);

        mailbox.deposit(frame);
        assert_eq!(mailbox.take(0x2040000), Some(frame));
        // 第二次 take 不会再返回同一帧
        assert!(mailbox.take(0x2040000).is_none());
    }

    #[test]
    fn test_deposit_overwrites_pending_frame() {
        let mailbox = Mailbox::new();
        let first = TalonFrame::new_data(0x42, &[0xAA; 8]);
        let second = TalonFrame::new_data(0x42, &[0xBB; 8]);

        mailbox.deposit(first);
        mailbox.deposit(second);

        // 只能观察到后写入的帧，first 被静默丢弃
        assert_eq!(mailbox.take(0x42), Some(second));
        assert!(mailbox.take(0x42).is_none());
    }

    #[test]
    fn test_ids_are_independent() {
        let mailbox = Mailbox::new();
        mailbox.deposit(TalonFrame::new_data(1, &[1]));
        mailbox.deposit(TalonFrame::new_data(2, &[2]));

        assert_eq!(mailbox.take(2).unwrap().data_slice(), &[2]);
        assert_eq!(mailbox.take(1).unwrap().data_slice(), &[1]);
    }
}
