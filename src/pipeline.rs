use crate::capture::CaptureSource;
use crate::delay::Delay;
use crate::fragmenter::{Fragmenter, TransmitReport};
use crate::retry::RetryPolicy;
use crate::storage::{StageStore, StorageError};
use crate::transport::TransportSession;
use log::{error, info, warn};
use sha2::{Digest, Sha256};

/// パイプライン実行時のエラー
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("画像キャプチャに失敗しました（試行 {attempt} 回目）")]
    CaptureFailed { attempt: u32 },

    #[error("{attempts} 回撮影しましたが有効な画像を保存できませんでした（最終サイズ {last_size} バイト）")]
    ValidationExhausted { attempts: u32, last_size: u64 },

    #[error("ステージ画像を読み込めませんでした: {0}")]
    ReadFailed(#[source] StorageError),
}

/// パイプライン 1 回分の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// 有効な画像が得られるまでの撮影回数
    pub capture_attempts: u32,
    /// 送信した画像のサイズ
    pub image_bytes: usize,
    /// 画像の SHA-256（16 進文字列）
    pub sha256: String,
    pub transmit: TransmitReport,
}

/// 撮影 → ステージ → 検証 → 分割送信 を行うパイプライン
pub struct CapturePipeline<C, S> {
    source: C,
    store: S,
    fragmenter: Fragmenter,
    min_image_size: u64,
    capture_policy: RetryPolicy,
}

impl<C: CaptureSource, S: StageStore> CapturePipeline<C, S> {
    /// 新しいパイプラインを作成します
    ///
    /// # 引数
    ///
    /// * `source` - キャプチャソース
    /// * `store` - ステージストア
    /// * `fragmenter` - 送信用のフラグメンター
    /// * `min_image_size` - 有効とみなす画像サイズの下限（このサイズより大きい必要があります）
    /// * `capture_policy` - 検証失敗時の再撮影ポリシー
    pub fn new(
        source: C,
        store: S,
        fragmenter: Fragmenter,
        min_image_size: u64,
        capture_policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            store,
            fragmenter,
            min_image_size,
            capture_policy,
        }
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// トリガーエッジ 1 回分の処理を実行します
    ///
    /// キャプチャソースがフレームを返さない場合は再試行せずに中断します。
    /// ステージ画像のサイズが下限以下の場合は、ポリシーに従って撮影からやり直します。
    pub fn handle_trigger<T, D>(
        &mut self,
        transport: &mut T,
        delay: &mut D,
    ) -> Result<PipelineReport, PipelineError>
    where
        T: TransportSession + ?Sized,
        D: Delay + ?Sized,
    {
        let capture_attempts = self.capture_and_stage(delay)?;

        let image = self.store.read_staged().map_err(|e| {
            error!("ステージ画像を開けませんでした: {}", e);
            PipelineError::ReadFailed(e)
        })?;

        let sha256 = format!("{:x}", Sha256::digest(&image));
        info!(
            "{} ({} バイト, sha256 {}) を {} チャンクで送信します",
            self.store.name(),
            image.len(),
            sha256,
            self.fragmenter.chunk_count(image.len())
        );

        let transmit = self.fragmenter.send_chunks(transport, delay, &image);
        let image_bytes = image.len();
        drop(image);

        Ok(PipelineReport {
            capture_attempts,
            image_bytes,
            sha256,
            transmit,
        })
    }

    /// 有効な画像がステージされるまで撮影と保存を繰り返し、撮影回数を返します
    fn capture_and_stage<D: Delay + ?Sized>(&mut self, delay: &mut D) -> Result<u32, PipelineError> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);

            let Some(frame) = self.source.capture() else {
                error!("画像キャプチャに失敗しました");
                return Err(PipelineError::CaptureFailed { attempt });
            };

            let staged = match self.store.stage(frame.as_ref()) {
                Ok(()) => {
                    info!(
                        "画像を {} に保存しました: {} バイト",
                        self.store.name(),
                        frame.as_ref().len()
                    );
                    true
                }
                Err(e) => {
                    error!("画像の保存に失敗しました: {}", e);
                    false
                }
            };
            // 書き込み結果に関わらず、フレームはここでドライバへ返却する
            drop(frame);

            // 書き込みに失敗した場合、残っているファイルは今回の撮影画像ではない
            let size = if staged {
                match self.store.staged_size() {
                    Ok(size) => size,
                    Err(e) => {
                        error!("ステージ画像のサイズを確認できませんでした: {}", e);
                        0
                    }
                }
            } else {
                0
            };

            if size > self.min_image_size {
                return Ok(attempt);
            }

            if staged {
                warn!(
                    "ステージ画像が小さすぎます ({} <= {} バイト)。再撮影します",
                    size, self.min_image_size
                );
            }
            if !self.capture_policy.allows_retry_after(attempt) {
                error!("{} 回撮影しましたが有効な画像が得られませんでした", attempt);
                return Err(PipelineError::ValidationExhausted {
                    attempts: attempt,
                    last_size: size,
                });
            }
            let wait = self.capture_policy.delay_after(attempt);
            if !wait.is_zero() {
                delay.delay(wait);
            }
        }
    }
}
