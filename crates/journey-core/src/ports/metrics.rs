//! JourneyMetrics port - メトリクス収集の抽象化
//!
//! 定期的なレポート出力は外部の責務。このモジュールはカウンタの入口だけを定義する。

/// JourneyMetrics はリクエスト数と完了したルート数を数える
///
/// # Thread Safety
/// - キャッシュのロック内から呼ばれるので、ブロックしない実装にすること
pub trait JourneyMetrics: Send + Sync {
    /// inbound リクエストを 1 件記録
    fn log_request(&self);

    /// ルートの初回完了を記録（ルートごとに 1 回だけ呼ばれる）
    fn log_journey_completed(&self);
}
