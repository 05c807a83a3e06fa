use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct LinkStatus {
    pub sent: u64,
    pub fire_and_forget: u64,
    pub replies: u64,
    pub timeouts: u64,
    /// Replies lost to the simulated drop rate.
    pub lost: u64,
    pub last_seq: u16,
    pub last_reply: Option<Instant>,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            sent: 0,
            fire_and_forget: 0,
            replies: 0,
            timeouts: 0,
            lost: 0,
            last_seq: 0,
            last_reply: None,
        }
    }
}

impl LinkStatus {
    pub fn reply_age(&self) -> Option<Duration> {
        self.last_reply.map(|t| t.elapsed())
    }
}
