/// Port for whatever draws the frames. Payload encoding is its business.
pub trait FrameRenderer: Send + Sync {
    fn dimensions(&self) -> (u32, u32);

    /// Deterministic for a given sequence number
    fn render(&self, sequence: u64) -> Vec<u8>;
}
