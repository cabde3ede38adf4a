//! 邮箱并发测试
//!
//! 多线程同时 deposit / take，验证锁的线性化保证：取到的每一帧
//! 都完整对应某次写入，不会出现跨帧的字节混合（撕裂帧）。

use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use talon_driver::Mailbox;
use talon_can::TalonFrame;

/// 构造自校验帧：8 个字节全部等于同一个标记值，
/// 标记值由 ID 和序号推导。任何字节混合都会破坏这个性质。
fn tagged_frame(id: u32, seq: u32) -> TalonFrame {
    let tag = (id.wrapping_mul(31).wrapping_add(seq) & 0xFF) as u8;
    TalonFrame::new_data(id, &[tag; 8])
}

#[test]
fn test_no_torn_frames_under_concurrent_access() {
    const WRITERS: u32 = 4;
    const READERS: u32 = 4;
    const IDS_PER_WRITER: u32 = 16;
    const DEPOSITS_PER_ID: u32 = 200;

    let mailbox = Arc::new(Mailbox::new());
    let stop = Arc::new(AtomicBool::new(false));
    let taken = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();

    // 写线程：每个线程拥有独立的 ID 段，按序号滚动覆盖
    for writer in 0..WRITERS {
        let mailbox = mailbox.clone();
        handles.push(thread::spawn(move || {
            let base = writer * IDS_PER_WRITER;
            for seq in 0..DEPOSITS_PER_ID {
                for offset in 0..IDS_PER_WRITER {
                    mailbox.deposit(tagged_frame(base + offset, seq));
                }
            }
        }));
    }

    // 读线程：随机轮询全部 ID，校验每一帧的自洽性
    let mut readers = Vec::new();
    for _ in 0..READERS {
        let mailbox = mailbox.clone();
        let stop = stop.clone();
        let taken = taken.clone();
        readers.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            while !stop.load(Ordering::Acquire) {
                let id = rng.gen_range(0..WRITERS * IDS_PER_WRITER);
                if let Some(frame) = mailbox.take(id) {
                    assert_eq!(frame.id, id, "frame surfaced under the wrong ID");
                    assert_eq!(frame.len, 8);
                    let tag = frame.data[0];
                    assert_eq!(
                        frame.data, [tag; 8],
                        "torn frame: bytes from different deposits mixed"
                    );
                    taken.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // 写完后给读线程一点时间清空剩余帧
    thread::sleep(Duration::from_millis(50));
    stop.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(taken.load(Ordering::Relaxed) > 0, "readers never observed a frame");

    // 收尾：剩在邮箱里的帧同样必须自洽
    for id in 0..WRITERS * IDS_PER_WRITER {
        if let Some(frame) = mailbox.take(id) {
            let tag = frame.data[0];
            assert_eq!(frame.data, [tag; 8]);
        }
    }
}
