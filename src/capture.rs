/// 1 回の撮影で画像フレームを生成するキャプチャソース
///
/// 返されるフレームは呼び出し側が所有し、ドロップされた時点で
/// ちょうど 1 回だけドライバへ返却されます。
pub trait CaptureSource {
    /// 撮影されたフレーム。ドロップ時にバッファをドライバへ返却します
    type Frame<'a>: AsRef<[u8]>
    where
        Self: 'a;

    /// 画像を 1 枚撮影します。撮影に失敗した場合は `None` を返します
    fn capture(&mut self) -> Option<Self::Frame<'_>>;
}
