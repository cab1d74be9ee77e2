use std::time::{Duration, Instant};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub bytes_downloaded: u64,
    pub bytes_uploaded: u64,
    pub get_requests: u64,
    pub put_requests: u64,
    pub delete_requests: u64,
    pub request_time: Duration,
}

impl StorageStats {
    pub fn new() -> Self {
        StorageStats::default()
    }

    pub fn add_get(&mut self, start_time: Instant, end_time: Instant, bytes: u64) {
        self.get_requests += 1;
        self.bytes_downloaded += bytes;
        self.request_time += end_time - start_time;
    }

    pub fn add_put(&mut self, start_time: Instant, end_time: Instant, bytes: u64) {
        self.put_requests += 1;
        self.bytes_uploaded += bytes;
        self.request_time += end_time - start_time;
    }

    pub fn add_delete(&mut self, start_time: Instant, end_time: Instant) {
        self.delete_requests += 1;
        self.request_time += end_time - start_time;
    }
}
