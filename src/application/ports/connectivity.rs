use tokio::sync::watch;

/// Online/offline signal supplied by the host platform.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
    fn subscribe(&self) -> watch::Receiver<bool>;
}
