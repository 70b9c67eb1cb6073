use crate::delay::Delay;
use crate::transport::TransportSession;
use log::{debug, error, info};
use std::num::NonZeroUsize;

/// 画像送信の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmitReport {
    /// 送信対象の総バイト数
    pub total_bytes: usize,
    /// publish を試みたチャンク数
    pub chunks_attempted: usize,
    /// publish に成功したチャンク数
    pub chunks_sent: usize,
    /// publish に失敗したチャンク数
    pub chunks_failed: usize,
    /// publish に成功したバイト数
    pub bytes_sent: usize,
}

impl TransmitReport {
    pub fn is_complete(&self) -> bool {
        self.chunks_failed == 0
    }
}

/// バイト列を最大ペイロードサイズ以下のチャンクに分割し、順番に publish する
///
/// チャンクにはヘッダーを付けません。受信側は到着順に連結して画像を復元します。
#[derive(Debug, Clone)]
pub struct Fragmenter {
    topic: String,
    max_chunk_size: NonZeroUsize,
    chunk_delay_ms: u32,
}

impl Fragmenter {
    pub fn new(topic: impl Into<String>, max_chunk_size: NonZeroUsize, chunk_delay_ms: u32) -> Self {
        Self {
            topic: topic.into(),
            max_chunk_size,
            chunk_delay_ms,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size.get()
    }

    /// `data` のチャンク数（`ceil(len / max_chunk_size)`）
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.max_chunk_size.get())
    }

    /// 画像データをチャンクに分割して送信します
    ///
    /// 失敗したチャンクは報告するだけでリトライせず、残りのチャンクの送信を続けます。
    /// 連続する publish の間には固定のディレイを挿入します。
    pub fn send_chunks<T, D>(&self, transport: &mut T, delay: &mut D, data: &[u8]) -> TransmitReport
    where
        T: TransportSession + ?Sized,
        D: Delay + ?Sized,
    {
        let mut report = TransmitReport {
            total_bytes: data.len(),
            ..Default::default()
        };
        let total_chunks = self.chunk_count(data.len());

        for (index, chunk) in data.chunks(self.max_chunk_size.get()).enumerate() {
            if index > 0 && self.chunk_delay_ms > 0 {
                delay.delay_ms(self.chunk_delay_ms);
            }

            report.chunks_attempted += 1;
            match transport.publish(&self.topic, chunk) {
                Ok(()) => {
                    report.chunks_sent += 1;
                    report.bytes_sent += chunk.len();
                    debug!(
                        "チャンク {}/{} を送信しました: {} バイト",
                        index + 1,
                        total_chunks,
                        chunk.len()
                    );
                }
                Err(e) => {
                    report.chunks_failed += 1;
                    error!(
                        "チャンク {}/{} の送信に失敗しました ({}): {}",
                        index + 1,
                        total_chunks,
                        self.topic,
                        e
                    );
                }
            }
        }

        info!(
            "{}/{} チャンク ({} / {} バイト) を {} へ送信しました、失敗 {} 件",
            report.chunks_sent,
            report.chunks_attempted,
            report.bytes_sent,
            report.total_bytes,
            self.topic,
            report.chunks_failed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{init_logger, FakeTransport, RecordingDelay};

    fn fragmenter(max: usize, delay_ms: u32) -> Fragmenter {
        Fragmenter::new("cm/picture", NonZeroUsize::new(max).unwrap(), delay_ms)
    }

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_300_bytes_split_into_128_128_44() {
        init_logger();
        let mut transport = FakeTransport::connected();
        let mut delay = RecordingDelay::default();
        let data = image(300);

        let report = fragmenter(128, 100).send_chunks(&mut transport, &mut delay, &data);

        let sizes: Vec<usize> = transport.published.iter().map(|(_, p)| p.len()).collect();
        assert_eq!(sizes, vec![128, 128, 44]);
        assert!(transport.published.iter().all(|(t, _)| t == "cm/picture"));
        assert_eq!(report.chunks_sent, 3);
        assert_eq!(report.bytes_sent, 300);
        assert!(report.is_complete());
    }

    #[test]
    fn test_chunks_reassemble_in_order_without_gaps() {
        let mut delay = RecordingDelay::default();
        for (len, max) in [(1, 128), (127, 128), (128, 128), (129, 128), (1000, 7), (4096, 250)] {
            let mut transport = FakeTransport::connected();
            let data = image(len);
            let f = fragmenter(max, 0);

            f.send_chunks(&mut transport, &mut delay, &data);

            assert_eq!(transport.published.len(), f.chunk_count(len));
            assert_eq!(transport.published.len(), len.div_ceil(max));
            assert!(transport.published.iter().all(|(_, p)| p.len() <= max && !p.is_empty()));
            let joined: Vec<u8> = transport
                .published
                .iter()
                .flat_map(|(_, p)| p.iter().copied())
                .collect();
            assert_eq!(joined, data);
        }
    }

    #[test]
    fn test_pacing_delay_between_chunks_only() {
        let mut transport = FakeTransport::connected();
        let mut delay = RecordingDelay::default();

        fragmenter(128, 100).send_chunks(&mut transport, &mut delay, &image(300));

        assert_eq!(delay.calls, vec![100, 100]);
    }

    #[test]
    fn test_failed_chunk_does_not_abort_remaining() {
        init_logger();
        let mut transport = FakeTransport::connected().failing_publish_at(&[2]);
        let mut delay = RecordingDelay::default();

        let report = fragmenter(128, 100).send_chunks(&mut transport, &mut delay, &image(600));

        assert_eq!(transport.publish_calls, 5);
        assert_eq!(report.chunks_attempted, 5);
        assert_eq!(report.chunks_failed, 1);
        assert_eq!(report.chunks_sent, 4);
        assert_eq!(report.bytes_sent, 600 - 128);
        assert!(!report.is_complete());
        assert_eq!(delay.calls.len(), 4);
    }

    #[test]
    fn test_empty_buffer_sends_nothing() {
        let mut transport = FakeTransport::connected();
        let mut delay = RecordingDelay::default();

        let report = fragmenter(128, 100).send_chunks(&mut transport, &mut delay, &[]);

        assert_eq!(report, TransmitReport::default());
        assert_eq!(transport.publish_calls, 0);
    }
}
