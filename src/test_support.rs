//! テスト用のフェイク実装

use crate::capture::CaptureSource;
use crate::delay::Delay;
use crate::session::Session;
use crate::storage::{StageStore, StorageError};
use crate::transport::{TransportError, TransportSession};
use crate::trigger::TriggerInput;
use crate::link::LinkError;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 待機せずに待機時間を記録する
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub calls: Vec<u32>,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.calls.iter().map(|&ms| u64::from(ms)).sum()
    }
}

impl Delay for RecordingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
    }
}

/// フェイクカメラの撮影・返却回数
#[derive(Debug, Default, Clone)]
pub struct CameraStats {
    captured: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl CameraStats {
    pub fn captured(&self) -> usize {
        self.captured.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// 用意したフレームを順番に返すカメラ
pub struct FakeCamera {
    frames: VecDeque<Option<Vec<u8>>>,
    stats: CameraStats,
}

impl FakeCamera {
    pub fn with_frames(frames: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            frames: frames.into(),
            stats: CameraStats::default(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        self.stats.clone()
    }
}

/// ドロップ時に返却回数を数えるフレーム
pub struct FakeFrame {
    data: Vec<u8>,
    released: Arc<AtomicUsize>,
}

impl AsRef<[u8]> for FakeFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for FakeFrame {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl CaptureSource for FakeCamera {
    type Frame<'a> = FakeFrame;

    fn capture(&mut self) -> Option<FakeFrame> {
        let data = self.frames.pop_front().flatten()?;
        self.stats.captured.fetch_add(1, Ordering::SeqCst);
        Some(FakeFrame {
            data,
            released: self.stats.released.clone(),
        })
    }
}

/// 失敗を注入できるメモリ上のステージストア
#[derive(Debug, Default)]
pub struct MemoryStageStore {
    pub content: Option<Vec<u8>>,
    pub stage_calls: usize,
    write_failures: usize,
    fail_reads: bool,
}

impl MemoryStageStore {
    /// 前回の撮影で保存された画像が残っているストア
    pub fn with_staged(content: Vec<u8>) -> Self {
        Self {
            content: Some(content),
            ..Default::default()
        }
    }

    /// 最初の `count` 回の書き込みを失敗させる
    pub fn failing_writes(mut self, count: usize) -> Self {
        self.write_failures = count;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }
}

impl StageStore for MemoryStageStore {
    fn name(&self) -> &str {
        "memory:image.jpg"
    }

    fn stage(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        self.stage_calls += 1;
        if self.write_failures > 0 {
            self.write_failures -= 1;
            return Err(StorageError::OpenForWrite {
                path: self.name().to_string(),
                source: io::Error::other("injected write failure"),
            });
        }
        self.content = Some(bytes.to_vec());
        Ok(())
    }

    fn staged_size(&mut self) -> Result<u64, StorageError> {
        match &self.content {
            Some(content) => Ok(content.len() as u64),
            None => Err(StorageError::OpenForRead {
                path: self.name().to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }

    fn read_staged(&mut self) -> Result<Vec<u8>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Read {
                path: self.name().to_string(),
                source: io::Error::other("injected read failure"),
            });
        }
        self.content.clone().ok_or_else(|| StorageError::OpenForRead {
            path: self.name().to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })
    }
}

/// レベル列を順番に返し、尽きたら最後のレベルを保持する入力
pub struct ScriptedInput {
    levels: VecDeque<bool>,
    last: bool,
}

impl ScriptedInput {
    pub fn new(levels: &[bool]) -> Self {
        Self {
            levels: levels.iter().copied().collect(),
            last: false,
        }
    }
}

impl TriggerInput for ScriptedInput {
    fn is_active(&mut self) -> bool {
        if let Some(level) = self.levels.pop_front() {
            self.last = level;
        }
        self.last
    }
}

/// 接続失敗と publish 失敗を注入できるトランスポート
#[derive(Debug, Default)]
pub struct FakeTransport {
    pub connected: bool,
    pub connect_failures: u32,
    pub connect_calls: u32,
    pub pump_calls: u32,
    pub publish_calls: usize,
    pub published: Vec<(String, Vec<u8>)>,
    failing_publishes: HashSet<usize>,
}

impl FakeTransport {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// 最初の `count` 回の接続試行を失敗させる
    pub fn failing_connects(count: u32) -> Self {
        Self {
            connect_failures: count,
            ..Default::default()
        }
    }

    /// 指定した番号（0 始まり）の publish 呼び出しを失敗させる
    pub fn failing_publish_at(mut self, calls: &[usize]) -> Self {
        self.failing_publishes = calls.iter().copied().collect();
        self
    }
}

impl Session for FakeTransport {
    type Error = TransportError;

    fn name(&self) -> &'static str {
        "MQTT"
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.connect_calls += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(TransportError::ConnectTimeout(5000));
        }
        self.connected = true;
        Ok(())
    }
}

impl TransportSession for FakeTransport {
    fn pump(&mut self) {
        self.pump_calls += 1;
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let call = self.publish_calls;
        self.publish_calls += 1;
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.failing_publishes.contains(&call) {
            return Err(TransportError::PublishFailed("injected".to_string()));
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// 接続失敗を注入できるリンク
#[derive(Debug, Default)]
pub struct FakeLink {
    pub connected: bool,
    pub connect_failures: u32,
    pub connect_calls: u32,
}

impl FakeLink {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    pub fn failing_connects(count: u32) -> Self {
        Self {
            connect_failures: count,
            ..Default::default()
        }
    }
}

impl Session for FakeLink {
    type Error = LinkError;

    fn name(&self) -> &'static str {
        "Wi-Fi"
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        self.connect_calls += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(LinkError::ConnectFailed("injected".to_string()));
        }
        self.connected = true;
        Ok(())
    }
}
