// fetcher.rs
use crate::errors::FetchError;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, DNT, ORIGIN, PRAGMA, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
];

/// Random desktop browser identity for one request.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Uniformly random pause between `min_ms` and `max_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange::new(0, 0);

    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }

    fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Slept before every attempt, including the first.
    pub throttle: DelayRange,
    /// After a 403, a reset connection or a timeout.
    pub forbidden_backoff: DelayRange,
    /// After any other non-200 answer.
    pub error_backoff: DelayRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            throttle: DelayRange::new(2_000, 5_000),
            forbidden_backoff: DelayRange::new(5_000, 10_000),
            error_backoff: DelayRange::new(3_000, 6_000),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no sleeping.
    pub fn without_delays(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            throttle: DelayRange::ZERO,
            forbidden_backoff: DelayRange::ZERO,
            error_backoff: DelayRange::ZERO,
        }
    }
}

/// Raw answer from the site.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// One GET against the site. Implementations must bound every call with a timeout.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, headers: HeaderMap) -> Result<FetchedPage, FetchError>;
}

/// Blocking reqwest client shared by every worker.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, headers: HeaderMap) -> Result<FetchedPage, FetchError> {
        let resp = self.client.get(url).headers(headers).send()?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        Ok(FetchedPage { status, body })
    }
}

/// Downloads pages with throttling, identity rotation and bounded retries.
#[derive(Clone)]
pub struct DetailFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    origin: String,
}

impl DetailFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy, origin: impl Into<String>) -> Self {
        Self {
            transport,
            policy,
            origin: origin.into(),
        }
    }

    /// Fetch `url`, retrying up to the policy's attempt cap.
    ///
    /// Every failure mode ends in `FetchError::Exhausted`; callers skip the
    /// page rather than abort.
    pub fn fetch(&self, url: &str, referer: Option<&str>) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = None;

        for attempt in 1..=max_attempts {
            self.policy.throttle.pause();

            let started = std::time::Instant::now();
            let err = match self.transport.get(url, self.headers(referer)) {
                Ok(page) if page.status == 200 => {
                    debug!(url, attempt, elapsed = ?started.elapsed(), "fetched");
                    return Ok(page.body);
                }
                Ok(page) if page.status == 403 => FetchError::Forbidden,
                Ok(page) => FetchError::Http(page.status),
                Err(e) => e,
            };

            warn!(url, attempt, max_attempts, error = %err, "fetch attempt failed");

            if attempt < max_attempts {
                if err.is_hostile() {
                    self.policy.forbidden_backoff.pause();
                } else {
                    self.policy.error_backoff.pause();
                }
            }
            last = Some(err);
        }

        Err(FetchError::Exhausted {
            attempts: max_attempts,
            last: Box::new(last.unwrap_or_else(|| FetchError::Transport("no attempt made".into()))),
        })
    }

    /// Browser-like headers with a fresh user agent.
    fn headers(&self, referer: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("document"));
        headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("navigate"));
        headers.insert(HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static("none"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert(DNT, HeaderValue::from_static("1"));

        let referer = referer.unwrap_or("https://www.google.com/");
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.origin) {
            headers.insert(ORIGIN, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed script of answers, then repeats the last one.
    struct Scripted {
        answers: Vec<Result<u16, &'static str>>,
        calls: AtomicUsize,
        agents: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(answers: Vec<Result<u16, &'static str>>) -> Arc<Self> {
            Arc::new(Self {
                answers,
                calls: AtomicUsize::new(0),
                agents: Mutex::new(Vec::new()),
            })
        }
    }

    impl Transport for Scripted {
        fn get(&self, _url: &str, headers: HeaderMap) -> Result<FetchedPage, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let agent = headers[USER_AGENT].to_str().unwrap().to_string();
            self.agents.lock().unwrap().push(agent);

            let answer = self.answers[n.min(self.answers.len() - 1)];
            match answer {
                Ok(status) => Ok(FetchedPage {
                    status,
                    body: format!("body {n}"),
                }),
                Err(reason) => Err(FetchError::Transport(reason.to_string())),
            }
        }
    }

    fn fetcher(transport: Arc<Scripted>, attempts: u32) -> DetailFetcher {
        DetailFetcher::new(transport, RetryPolicy::without_delays(attempts), "https://www.zimmo.be")
    }

    #[test]
    fn succeeds_on_first_200() {
        let transport = Scripted::new(vec![Ok(200)]);
        let body = fetcher(transport.clone(), 3).fetch("https://x/1", None).unwrap();
        assert_eq!(body, "body 0");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retries_through_403_and_reset() {
        let transport = Scripted::new(vec![Ok(403), Err("connection reset by peer"), Ok(200)]);
        let body = fetcher(transport.clone(), 3).fetch("https://x/1", None).unwrap();
        assert_eq!(body, "body 2");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn persistent_failure_uses_exactly_the_attempt_cap() {
        let transport = Scripted::new(vec![Ok(403)]);
        let err = fetcher(transport.clone(), 3).fetch("https://x/1", None).unwrap_err();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Forbidden));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn plain_http_errors_are_retried_too() {
        let transport = Scripted::new(vec![Ok(500), Ok(404)]);
        let err = fetcher(transport.clone(), 2).fetch("https://x/1", None).unwrap_err();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert!(matches!(err, FetchError::Exhausted { last, .. } if matches!(*last, FetchError::Http(404))));
    }

    #[test]
    fn every_attempt_sends_a_known_user_agent() {
        let transport = Scripted::new(vec![Ok(503)]);
        let _ = fetcher(transport.clone(), 3).fetch("https://x/1", None);
        let agents = transport.agents.lock().unwrap();
        assert_eq!(agents.len(), 3);
        assert!(agents.iter().all(|a| USER_AGENTS.contains(&a.as_str())));
    }

    #[test]
    fn hostile_errors_get_the_long_backoff() {
        assert!(FetchError::Forbidden.is_hostile());
        assert!(FetchError::Timeout.is_hostile());
        assert!(FetchError::Transport("reset".into()).is_hostile());
        assert!(!FetchError::Http(500).is_hostile());
    }

    fn timed(answers: Vec<Result<u16, &'static str>>, policy: RetryPolicy) -> Duration {
        let fetcher = DetailFetcher::new(Scripted::new(answers), policy, "https://www.zimmo.be");
        let started = std::time::Instant::now();
        fetcher.fetch("https://x/1", None).unwrap();
        started.elapsed()
    }

    fn backoff_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            throttle: DelayRange::ZERO,
            forbidden_backoff: DelayRange::new(150, 150),
            error_backoff: DelayRange::new(5, 5),
        }
    }

    #[test]
    fn blocks_and_resets_wait_for_the_forbidden_backoff() {
        assert!(timed(vec![Ok(403), Ok(200)], backoff_policy()) >= Duration::from_millis(150));
        assert!(
            timed(vec![Err("connection reset by peer"), Ok(200)], backoff_policy())
                >= Duration::from_millis(150)
        );
    }

    #[test]
    fn plain_errors_wait_for_the_short_backoff() {
        let elapsed = timed(vec![Ok(500), Ok(200)], backoff_policy());
        assert!(elapsed >= Duration::from_millis(5));
        assert!(elapsed < Duration::from_millis(150));
    }

    #[test]
    fn first_attempt_is_throttled() {
        let policy = RetryPolicy {
            throttle: DelayRange::new(60, 60),
            ..RetryPolicy::without_delays(1)
        };
        assert!(timed(vec![Ok(200)], policy) >= Duration::from_millis(60));
    }

    #[test]
    fn delay_range_stays_in_bounds() {
        let range = DelayRange::new(10, 20);
        for _ in 0..50 {
            let d = range.sample().as_millis();
            assert!((10..=20).contains(&d));
        }
        assert_eq!(DelayRange::ZERO.sample(), Duration::ZERO);
    }
}
