//! Resizes game cover images from the `image_processing` queue

use queue_workers::{Result, ServiceKind};

#[tokio::main]
async fn main() -> Result<()> {
    queue_workers::run(ServiceKind::ImageProcessor).await
}
