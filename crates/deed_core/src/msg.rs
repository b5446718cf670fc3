#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The engine finished one asset, successfully or not.
    AssetDiscovered(crate::DiscoveryResult),
}
