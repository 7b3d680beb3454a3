mod vision_client;

pub use vision_client::{ClassifierCallError, OpenAiVisionClient, VisionClient};
