use async_trait::async_trait;

/// Port for the synthetic robot that answers scientist commands
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RobotResponder: Send + Sync {
    async fn respond(&self, command: &str) -> String;
}
