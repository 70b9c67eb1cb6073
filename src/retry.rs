use std::time::Duration;

/// リトライポリシー
///
/// 再接続ループと画像検証の再撮影ループで使用します。
/// デフォルトは「成功するまで固定間隔で無制限にリトライ」です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大試行回数（`None` の場合は無制限）
    pub max_attempts: Option<u32>,
    /// 失敗後の最初の待機時間
    pub delay: Duration,
    /// 失敗ごとに待機時間へ掛ける倍率（1 で固定間隔）
    pub multiplier: u32,
    /// 待機時間の上限
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// 固定間隔・無制限のポリシーを作成します
    pub const fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            multiplier: 1,
            max_delay: delay,
        }
    }

    /// 待機なし・無制限のポリシーを作成します
    pub const fn immediate() -> Self {
        Self::unbounded(Duration::ZERO)
    }

    /// 最大試行回数を設定します（0 は無制限として扱います）
    pub const fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 {
                None
            } else {
                Some(max_attempts)
            },
            ..self
        }
    }

    /// 指数バックオフを設定します
    pub const fn with_backoff(self, multiplier: u32, max_delay: Duration) -> Self {
        Self {
            multiplier,
            max_delay,
            ..self
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }

    /// `attempt` 回目（1 始まり）の試行が失敗した後、さらに試行してよいかを返します
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }

    /// `attempt` 回目（1 始まり）の失敗後に待機する時間を返します
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1 {
            return self.delay;
        }

        let mut delay = self.delay;
        for _ in 1..attempt {
            delay = delay.saturating_mul(self.multiplier);
            if delay >= self.max_delay {
                return self.max_delay;
            }
        }
        delay.min(self.max_delay.max(self.delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_policy_always_allows_retry() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(2000));
        assert!(policy.is_unbounded());
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(u32::MAX - 1));
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(50), Duration::from_millis(2000));
    }

    #[test]
    fn test_max_attempts_limits_retries() {
        let policy = RetryPolicy::immediate().with_max_attempts(3);
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }

    #[test]
    fn test_zero_max_attempts_means_unbounded() {
        let policy = RetryPolicy::immediate().with_max_attempts(0);
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(100))
            .with_backoff(2, Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        assert_eq!(policy.delay_after(20), Duration::from_millis(500));
    }
}
