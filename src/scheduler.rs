use crate::capture::CaptureSource;
use crate::delay::Delay;
use crate::link::LinkSession;
use crate::pipeline::CapturePipeline;
use crate::retry::RetryPolicy;
use crate::session::ensure_connected;
use crate::storage::StageStore;
use crate::transport::TransportSession;
use crate::trigger::{TriggerInput, TriggerMonitor};
use log::{error, info, warn};

/// トリガーエッジを受け取ってパイプラインを起動する
pub trait TriggerHandler<T: TransportSession> {
    fn on_trigger(&mut self, transport: &mut T);

    /// トリガーの有無に関わらず毎 tick 呼ばれます
    fn on_tick(&mut self) {}
}

/// tick ループ内で同期的にパイプラインを実行するハンドラー
///
/// 撮影・検証・送信が終わるまで tick ループはブロックされます。
pub struct InlinePipeline<C, S, D> {
    pipeline: CapturePipeline<C, S>,
    delay: D,
}

impl<C, S, D> InlinePipeline<C, S, D> {
    pub fn new(pipeline: CapturePipeline<C, S>, delay: D) -> Self {
        Self { pipeline, delay }
    }

    pub fn pipeline(&self) -> &CapturePipeline<C, S> {
        &self.pipeline
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }
}

impl<C, S, D, T> TriggerHandler<T> for InlinePipeline<C, S, D>
where
    C: CaptureSource,
    S: StageStore,
    D: Delay,
    T: TransportSession,
{
    fn on_trigger(&mut self, transport: &mut T) {
        match self.pipeline.handle_trigger(transport, &mut self.delay) {
            Ok(report) if report.transmit.is_complete() => info!(
                "画像を送信しました: {} バイト, {} チャンク",
                report.image_bytes, report.transmit.chunks_sent
            ),
            Ok(report) => warn!(
                "画像を送信しましたが {} / {} チャンクが失敗しました",
                report.transmit.chunks_failed, report.transmit.chunks_attempted
            ),
            Err(e) => error!("キャプチャパイプラインが失敗しました: {}", e),
        }
    }
}

/// 1 tick の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// トリガーなし
    Idle,
    /// トリガーを検出してハンドラーを呼び出した
    Triggered,
    /// 接続を確立できなかったため、この tick の残りをスキップした
    Offline,
}

/// 協調スケジューリングループ
///
/// 毎 tick、リンクとトランスポートの接続確認、キープアライブ処理、トリガー監視を行い、
/// 押下エッジを検出したらハンドラーを呼び出します。
pub struct TickLoop<L, T, I, H, D> {
    link: L,
    transport: T,
    trigger: TriggerMonitor<I>,
    handler: H,
    delay: D,
    link_policy: RetryPolicy,
    transport_policy: RetryPolicy,
    tick_interval_ms: u32,
}

impl<L, T, I, H, D> TickLoop<L, T, I, H, D>
where
    L: LinkSession,
    T: TransportSession,
    I: TriggerInput,
    H: TriggerHandler<T>,
    D: Delay,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        link: L,
        transport: T,
        trigger: TriggerMonitor<I>,
        handler: H,
        delay: D,
        link_policy: RetryPolicy,
        transport_policy: RetryPolicy,
        tick_interval_ms: u32,
    ) -> Self {
        Self {
            link,
            transport,
            trigger,
            handler,
            delay,
            link_policy,
            transport_policy,
            tick_interval_ms,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// 接続を確立します（無制限ポリシーでは接続できるまで戻りません）
    pub fn connect(&mut self) -> bool {
        if let Err(e) = ensure_connected(&mut self.link, &self.link_policy, &mut self.delay) {
            error!("{}", e);
            return false;
        }
        if let Err(e) =
            ensure_connected(&mut self.transport, &self.transport_policy, &mut self.delay)
        {
            error!("{}", e);
            return false;
        }
        true
    }

    /// 1 tick 分の処理を実行します
    pub fn tick(&mut self) -> TickOutcome {
        if !self.connect() {
            return TickOutcome::Offline;
        }
        self.transport.pump();
        self.handler.on_tick();

        if self.trigger.poll().is_some() {
            info!("ボタン押下を検出しました。撮影します");
            self.handler.on_trigger(&mut self.transport);
            return TickOutcome::Triggered;
        }
        TickOutcome::Idle
    }

    /// tick 間隔ごとに `tick` を永久に繰り返します
    pub fn run(&mut self) -> ! {
        info!("メインループを開始します (tick {} ms)", self.tick_interval_ms);
        loop {
            self.tick();
            self.delay.delay_ms(self.tick_interval_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragmenter::Fragmenter;
    use crate::test_support::{
        init_logger, FakeCamera, FakeLink, FakeTransport, MemoryStageStore, RecordingDelay,
        ScriptedInput,
    };
    use std::num::NonZeroUsize;
    use std::time::Duration;

    type TestLoop = TickLoop<
        FakeLink,
        FakeTransport,
        ScriptedInput,
        InlinePipeline<FakeCamera, MemoryStageStore, RecordingDelay>,
        RecordingDelay,
    >;

    fn tick_loop(
        link: FakeLink,
        transport: FakeTransport,
        levels: &[bool],
        frames: Vec<Option<Vec<u8>>>,
    ) -> TestLoop {
        let pipeline = CapturePipeline::new(
            FakeCamera::with_frames(frames),
            MemoryStageStore::default(),
            Fragmenter::new("cm/picture", NonZeroUsize::new(128).unwrap(), 100),
            100,
            RetryPolicy::default(),
        );
        TickLoop::new(
            link,
            transport,
            TriggerMonitor::new(ScriptedInput::new(levels)),
            InlinePipeline::new(pipeline, RecordingDelay::default()),
            RecordingDelay::default(),
            RetryPolicy::unbounded(Duration::from_millis(1000)),
            RetryPolicy::unbounded(Duration::from_millis(2000)),
            10,
        )
    }

    #[test]
    fn test_press_triggers_one_capture_and_transmission() {
        init_logger();
        let mut tick_loop = tick_loop(
            FakeLink::connected(),
            FakeTransport::connected(),
            &[false, true, true, true, false],
            vec![Some(vec![1; 300]), Some(vec![2; 300])],
        );

        let outcomes: Vec<TickOutcome> = (0..5).map(|_| tick_loop.tick()).collect();

        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Idle,
                TickOutcome::Triggered,
                TickOutcome::Idle,
                TickOutcome::Idle,
                TickOutcome::Idle
            ]
        );
        assert_eq!(tick_loop.transport().published.len(), 3);
        assert_eq!(tick_loop.transport().pump_calls, 5);
        assert_eq!(tick_loop.handler().pipeline().source().stats().released(), 1);
    }

    #[test]
    fn test_reconnects_before_servicing_trigger() {
        init_logger();
        let mut tick_loop = tick_loop(
            FakeLink::failing_connects(2),
            FakeTransport::failing_connects(1),
            &[true],
            vec![Some(vec![1; 200])],
        );

        assert_eq!(tick_loop.tick(), TickOutcome::Triggered);

        assert!(tick_loop.link().connected);
        assert_eq!(tick_loop.link().connect_calls, 3);
        assert_eq!(tick_loop.transport().connect_calls, 2);
        assert_eq!(tick_loop.delay.calls, vec![1000, 1000, 2000]);
        assert_eq!(tick_loop.transport().published.len(), 2);
    }

    #[test]
    fn test_bounded_connection_policy_reports_offline() {
        init_logger();
        let mut tick_loop = tick_loop(
            FakeLink::connected(),
            FakeTransport::failing_connects(10),
            &[true],
            vec![Some(vec![1; 200])],
        );
        tick_loop.transport_policy = RetryPolicy::immediate().with_max_attempts(2);

        assert_eq!(tick_loop.tick(), TickOutcome::Offline);
        assert_eq!(tick_loop.transport().pump_calls, 0);
        assert!(tick_loop.transport().published.is_empty());
    }

    #[test]
    fn test_capture_failure_wastes_the_press() {
        init_logger();
        let mut tick_loop = tick_loop(
            FakeLink::connected(),
            FakeTransport::connected(),
            &[true, true, false, true],
            vec![None, Some(vec![5; 300])],
        );

        for _ in 0..4 {
            tick_loop.tick();
        }

        // 最初の押下は失敗し、2 回目の押下で送信される
        let joined: Vec<u8> = tick_loop
            .transport()
            .published
            .iter()
            .flat_map(|(_, p)| p.iter().copied())
            .collect();
        assert_eq!(joined, vec![5; 300]);
    }

    #[test]
    fn test_inline_pipeline_uses_pacing_delay() {
        let mut tick_loop = tick_loop(
            FakeLink::connected(),
            FakeTransport::connected(),
            &[true],
            vec![Some(vec![1; 300])],
        );

        tick_loop.tick();

        assert_eq!(tick_loop.handler().delay().calls, vec![100, 100]);
    }
}
