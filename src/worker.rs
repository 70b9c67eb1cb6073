use crate::capture::CaptureSource;
use crate::delay::Delay;
use crate::pipeline::{CapturePipeline, PipelineError, PipelineReport};
use crate::scheduler::TriggerHandler;
use crate::storage::StageStore;
use crate::transport::{SharedTransport, TransportSession};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const WORKER_THREAD_NAME: &str = "capture-pipeline";

pub type PipelineResult = Result<PipelineReport, PipelineError>;

/// ワーカー関連のエラー
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("ワーカースレッドの起動に失敗しました: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("パイプラインは実行中です")]
    Busy,

    #[error("ワーカースレッドは停止しています")]
    Stopped,
}

/// キャプチャパイプラインを専用スレッドで実行するワーカー
///
/// 同時に実行されるジョブは常に 1 つまでです。実行中に届いたトリガーは破棄されます。
/// tick ループはジョブの実行中もキープアライブとトリガー監視を続けられます。
pub struct PipelineWorker<T> {
    jobs: Option<SyncSender<SharedTransport<T>>>,
    reports: Receiver<PipelineResult>,
    busy: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    completed: usize,
}

impl<T> PipelineWorker<T>
where
    T: TransportSession + Send + 'static,
{
    /// ワーカースレッドを起動します
    ///
    /// # 引数
    ///
    /// * `pipeline` - ワーカースレッドに移すパイプライン
    /// * `delay` - チャンク送信間のペーシングに使うディレイ
    /// * `stack_size` - ワーカースレッドのスタックサイズ（バイト）
    pub fn spawn<C, S, D>(
        mut pipeline: CapturePipeline<C, S>,
        mut delay: D,
        stack_size: usize,
    ) -> Result<Self, WorkerError>
    where
        C: CaptureSource + Send + 'static,
        S: StageStore + Send + 'static,
        D: Delay + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::sync_channel::<SharedTransport<T>>(1);
        let (report_tx, report_rx) = mpsc::sync_channel::<PipelineResult>(1);
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = busy.clone();

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .stack_size(stack_size)
            .spawn(move || {
                info!("キャプチャワーカーを開始しました");
                for mut transport in job_rx {
                    let result = pipeline.handle_trigger(&mut transport, &mut delay);
                    match &result {
                        Ok(report) => info!(
                            "キャプチャジョブ完了: {} バイト, {}/{} チャンク送信",
                            report.image_bytes,
                            report.transmit.chunks_sent,
                            report.transmit.chunks_attempted
                        ),
                        Err(e) => error!("キャプチャジョブが失敗しました: {}", e),
                    }
                    worker_busy.store(false, Ordering::Release);
                    // 読み手がいなければ結果は捨てる
                    let _ = report_tx.try_send(result);
                }
                info!("キャプチャワーカーを停止しました");
            })
            .map_err(WorkerError::SpawnFailed)?;

        Ok(Self {
            jobs: Some(job_tx),
            reports: report_rx,
            busy,
            handle: Some(handle),
            completed: 0,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// ジョブを投入します。実行中のジョブがある場合は `WorkerError::Busy` を返します
    pub fn try_submit(&self, transport: &SharedTransport<T>) -> Result<(), WorkerError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }

        let Some(jobs) = self.jobs.as_ref() else {
            self.busy.store(false, Ordering::Release);
            return Err(WorkerError::Stopped);
        };

        match jobs.try_send(transport.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.busy.store(false, Ordering::Release);
                Err(WorkerError::Busy)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::Release);
                Err(WorkerError::Stopped)
            }
        }
    }

    /// 完了したジョブの結果を待ちます
    pub fn recv_report(&self, timeout: Duration) -> Option<PipelineResult> {
        match self.reports.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// 回収済みのジョブ結果の数
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// 届いているジョブ結果をすべて回収します
    ///
    /// 結果チャネルの容量は 1 なので、回収しないと以降の結果は捨てられます。
    pub fn drain_reports(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(result) = self.reports.try_recv() {
            match result {
                Ok(report) if report.transmit.is_complete() => debug!(
                    "ジョブ結果を回収しました: {} バイト, sha256 {}",
                    report.image_bytes, report.sha256
                ),
                Ok(report) => warn!(
                    "ジョブ結果を回収しました: {} / {} チャンクが失敗",
                    report.transmit.chunks_failed, report.transmit.chunks_attempted
                ),
                Err(e) => debug!("失敗したジョブ結果を回収しました: {}", e),
            }
            drained += 1;
        }
        self.completed += drained;
        drained
    }
}

impl<T> TriggerHandler<SharedTransport<T>> for PipelineWorker<T>
where
    T: TransportSession + Send + 'static,
{
    fn on_trigger(&mut self, transport: &mut SharedTransport<T>) {
        match self.try_submit(transport) {
            Ok(()) => info!("キャプチャジョブを投入しました"),
            Err(WorkerError::Busy) => warn!("パイプライン実行中のためトリガーを無視します"),
            Err(e) => error!("キャプチャジョブを投入できませんでした: {}", e),
        }
    }

    fn on_tick(&mut self) {
        self.drain_reports();
    }
}

impl<T> Drop for PipelineWorker<T> {
    fn drop(&mut self) {
        // 送信側を閉じるとワーカーのループが終了する
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("キャプチャワーカーがパニックしました");
            }
        }
    }
}
