use crate::delay::Delay;
use crate::retry::RetryPolicy;
use log::{info, warn};
use std::fmt::Display;

/// 接続状態を持つセッション（Wi-Fi リンクや MQTT トランスポート）
pub trait Session {
    type Error: Display;

    /// ログ出力用のセッション名
    fn name(&self) -> &'static str;

    /// 現在接続されているかを返します
    fn is_connected(&self) -> bool;

    /// 接続を 1 回試行します
    fn connect(&mut self) -> Result<(), Self::Error>;
}

/// セッション再接続に関するエラー
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{session}: {attempts} 回の接続試行がすべて失敗しました: {last_error}")]
    RetriesExhausted {
        session: &'static str,
        attempts: u32,
        last_error: String,
    },
}

/// 接続されていなければ接続できるまでリトライします
///
/// 既に接続済みの場合は何もせず `Ok(0)` を返します。
/// それ以外の場合は接続に要した試行回数を返します。
/// デフォルトの無制限ポリシーでは接続に成功するまで戻りません。
pub fn ensure_connected<S, D>(
    session: &mut S,
    policy: &RetryPolicy,
    delay: &mut D,
) -> Result<u32, SessionError>
where
    S: Session + ?Sized,
    D: Delay + ?Sized,
{
    if session.is_connected() {
        return Ok(0);
    }

    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        info!("{} に接続しています (試行 {} 回目)...", session.name(), attempt);

        let result = session.connect();
        match result {
            Ok(()) if session.is_connected() => {
                info!("{} に接続しました", session.name());
                return Ok(attempt);
            }
            Ok(()) => {
                warn!(
                    "{} の接続処理は完了しましたが、まだ接続されていません",
                    session.name()
                );
                if !policy.allows_retry_after(attempt) {
                    return Err(SessionError::RetriesExhausted {
                        session: session.name(),
                        attempts: attempt,
                        last_error: "接続後もセッションが確立されませんでした".to_string(),
                    });
                }
            }
            Err(e) => {
                warn!("{} への接続に失敗しました: {}", session.name(), e);
                if !policy.allows_retry_after(attempt) {
                    return Err(SessionError::RetriesExhausted {
                        session: session.name(),
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
            }
        }

        delay.delay(policy.delay_after(attempt));
    }
}
