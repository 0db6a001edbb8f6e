mod client;

pub use client::OpenAICompatibleClient;
