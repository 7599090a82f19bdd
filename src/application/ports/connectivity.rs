use async_trait::async_trait;

/// 到達性の確認。各パスの冒頭で一度だけ問い合わせる。
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}
