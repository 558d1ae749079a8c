//! Time source of the bot.
//!
//! Every "now" read and every server-dictated wait goes through a [`Clock`], so tests can drive
//! the scheduler and the gateway without sleeping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serenity::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::Mutex;

    use super::*;

    /// Clock that only moves when told to. Sleeping advances it instantly and is recorded.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(now), sleeps: Mutex::new(Vec::new()) }
        }
        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap() = now;
        }
        pub fn advance(&self, by: chrono::Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }
        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
        pub fn slept(&self) -> Duration {
            self.sleeps.lock().unwrap().iter().sum()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            if let Ok(d) = chrono::Duration::from_std(duration) {
                self.advance(d);
            }
        }
    }
}
