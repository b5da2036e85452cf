mod relay;

pub use relay::{FrameOutcome, VideoRelay, ViewerSubscription, DEFAULT_VIEWER_QUEUE};
