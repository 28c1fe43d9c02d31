//! HTTP link checking with a small fixed retry budget.
//!
//! ## Check sequence
//!
//! 1. `https://` is prepended when the URL has no http(s) scheme.
//! 2. HEAD, redirects followed. 404 is broken; 405 switches to a GET whose
//!    status and body decide; anything else is healthy.
//! 3. A request that produced no response at all (the HEAD, or the GET
//!    issued after a 405) counts as a failed attempt. Up to `max_retries`
//!    further attempts follow, `retry_delay` apart.
//! 4. When every attempt failed, one plain GET is tried. If it fails as
//!    well the link is unknown.
//!
//! A GET response is broken when its status is 404 or its body mentions
//! "404" or "not found" (soft 404).

use super::contact::extract_contact_info;
use super::{CheckResult, ContactInfo, LinkRecord, LinkStatus};
use crate::config::CheckerConfig;
use crate::error::LinkCheckError;
use crate::http::{HttpResponse, HttpTransport, TransportError};
use crate::progress::ProgressCallback;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Status, captured body and verdict of one answered request chain.
#[derive(Debug)]
struct Answer {
    status: u16,
    body: Option<String>,
    broken: bool,
}

impl Answer {
    fn from_get(resp: HttpResponse) -> Self {
        let broken = resp.status == 404 || resp.body.as_deref().is_some_and(is_soft_404);
        Answer {
            status: resp.status,
            body: resp.body,
            broken,
        }
    }
}

/// Body text that indicates a missing page despite a non-404 status.
pub fn is_soft_404(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("404") || lower.contains("not found")
}

/// Prefix `https://` unless the URL already has an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Checks links through an [`HttpTransport`].
pub struct LinkChecker<T: HttpTransport> {
    transport: T,
    config: CheckerConfig,
}

impl<T: HttpTransport> LinkChecker<T> {
    pub fn new(transport: T, config: CheckerConfig) -> Result<Self, LinkCheckError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check one URL. Never fails: transport problems end up as an unknown
    /// result carrying the error message.
    pub async fn check(&self, raw_url: &str, extract_contacts: bool) -> CheckResult {
        let url = normalize_url(raw_url);
        let mut failure: Option<String> = None;
        let mut answer: Option<Answer> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                warn!(
                    "{}: retry {}/{} after {}ms",
                    url,
                    attempt,
                    self.config.max_retries,
                    self.config.retry_delay.as_millis()
                );
                sleep(self.config.retry_delay).await;
            }
            match self.attempt(&url).await {
                Ok(a) => {
                    answer = Some(a);
                    break;
                }
                Err(e) => {
                    warn!("{}: attempt {} failed: {}", url, attempt + 1, e);
                    failure = Some(e.to_string());
                }
            }
        }

        // Only an exhausted retry budget leaves an error message behind.
        let last_error = if answer.is_none() { failure } else { None };

        if answer.is_none() {
            match self.transport.get(&url).await {
                Ok(resp) => {
                    debug!("{}: GET fallback answered {}", url, resp.status);
                    answer = Some(Answer::from_get(resp));
                }
                Err(e) => debug!("{}: GET fallback failed: {}", url, e),
            }
        }

        let mut result = CheckResult {
            broken: answer.as_ref().is_some_and(|a| a.broken),
            status_code: answer.as_ref().map(|a| a.status),
            error_message: last_error,
            contact: extract_contacts.then(ContactInfo::default),
        };

        if let Some(a) = &answer {
            if extract_contacts && !a.broken && a.status == 200 {
                if let Some(body) = &a.body {
                    result.contact = Some(extract_contact_info(body));
                }
            }
        }
        result
    }

    /// HEAD, plus the GET a 405 calls for.
    async fn attempt(&self, url: &str) -> Result<Answer, TransportError> {
        let head = self.transport.head(url).await?;
        match head.status {
            404 => Ok(Answer {
                status: 404,
                body: None,
                broken: true,
            }),
            405 => {
                debug!("{}: HEAD not allowed, retrying with GET", url);
                let get = self.transport.get(url).await?;
                Ok(Answer::from_get(get))
            }
            status => Ok(Answer {
                status,
                body: None,
                broken: false,
            }),
        }
    }

    /// Check every record in order, pausing `request_delay` between links.
    pub async fn check_all(&self, records: &mut [LinkRecord], progress: &ProgressCallback) {
        let total = records.len();
        progress.on_batch_start(total);
        let mut healthy = 0;

        for (i, record) in records.iter_mut().enumerate() {
            progress.on_item_start(i + 1, total, &record.link_url);
            let wants_contacts = self.config.wants_contacts(&record.link_url);
            let result = self.check(&record.link_url, wants_contacts).await;

            match result.status() {
                LinkStatus::Healthy => {
                    healthy += 1;
                    info!(
                        "[{}/{}] OK ({}) {}",
                        i + 1,
                        total,
                        result.status_code.unwrap_or_default(),
                        record.link_url
                    );
                    progress.on_item_complete(i + 1, total, &record.link_url);
                }
                LinkStatus::Broken => {
                    warn!("[{}/{}] BROKEN {}", i + 1, total, record.link_url);
                    if let Some(c) = result.contact.as_ref().filter(|c| c.phone.is_some() || c.email.is_some()) {
                        info!(
                            "    Contact: {} {}",
                            c.phone.as_deref().unwrap_or_default(),
                            c.email.as_deref().unwrap_or_default()
                        );
                    }
                    progress.on_item_error(i + 1, total, &record.link_url, "broken");
                }
                LinkStatus::Unknown => {
                    warn!(
                        "[{}/{}] UNKNOWN {}: {}",
                        i + 1,
                        total,
                        record.link_url,
                        result.error_message.as_deref().unwrap_or("no response")
                    );
                    progress.on_item_error(i + 1, total, &record.link_url, "unknown");
                }
            }
            record.check = Some(result);

            if i + 1 < total {
                sleep(self.config.request_delay).await;
            }
        }
        progress.on_batch_complete(total, healthy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    type Scripted = Result<HttpResponse, TransportError>;

    /// Replays scripted HEAD and GET responses and records the call order.
    #[derive(Default)]
    struct FakeTransport {
        heads: Mutex<VecDeque<Scripted>>,
        gets: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn then_head(self, r: Scripted) -> Self {
            self.heads.lock().unwrap().push_back(r);
            self
        }
        fn then_get(self, r: Scripted) -> Self {
            self.gets.lock().unwrap().push_back(r);
            self
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn head(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(format!("HEAD {url}"));
            self.heads
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("unscripted HEAD".into())))
        }
        async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(format!("GET {url}"));
            self.gets
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("unscripted GET".into())))
        }
    }

    fn ok(status: u16) -> Scripted {
        Ok(HttpResponse::new(status, None))
    }

    fn body(status: u16, body: &str) -> Scripted {
        Ok(HttpResponse::new(status, Some(body.to_string())))
    }

    fn fail(msg: &str) -> Scripted {
        Err(TransportError(msg.to_string()))
    }

    fn checker(t: FakeTransport) -> LinkChecker<FakeTransport> {
        let config = CheckerConfig {
            retry_delay: Duration::ZERO,
            request_delay: Duration::ZERO,
            ..CheckerConfig::default()
        };
        LinkChecker::new(t, config).unwrap()
    }

    fn calls(c: &LinkChecker<FakeTransport>) -> Vec<String> {
        c.transport.calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn head_200_is_healthy() {
        let c = checker(FakeTransport::default().then_head(ok(200)));
        let r = c.check("https://a.com", false).await;
        assert_eq!(r.status(), LinkStatus::Healthy);
        assert_eq!(r.status_code, Some(200));
        assert_eq!(r.error_message, None);
        assert_eq!(r.contact, None);
    }

    #[tokio::test]
    async fn head_404_is_broken() {
        let c = checker(FakeTransport::default().then_head(ok(404)));
        let r = c.check("https://a.com/gone", false).await;
        assert!(r.broken);
        assert_eq!(r.status_code, Some(404));
    }

    #[tokio::test]
    async fn scheme_is_prepended() {
        let c = checker(FakeTransport::default().then_head(ok(301)));
        let r = c.check("example.com/x", false).await;
        assert_eq!(r.status(), LinkStatus::Healthy);
        assert_eq!(calls(&c), vec!["HEAD https://example.com/x"]);
    }

    #[tokio::test]
    async fn head_405_switches_to_get_and_detects_soft_404() {
        let c = checker(
            FakeTransport::default()
                .then_head(ok(405))
                .then_get(body(200, "<h1>Page Not Found</h1>")),
        );
        let r = c.check("https://a.com", false).await;
        assert!(r.broken);
        assert_eq!(r.status_code, Some(200));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let c = checker(FakeTransport::default().then_head(fail("reset")).then_head(ok(200)));
        let r = c.check("https://a.com", false).await;
        assert_eq!(r.status(), LinkStatus::Healthy);
        assert_eq!(r.status_code, Some(200));
        assert_eq!(r.error_message, None);
        assert_eq!(calls(&c).len(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_fall_back_to_get() {
        let c = checker(
            FakeTransport::default()
                .then_head(fail("dns 1"))
                .then_head(fail("dns 2"))
                .then_head(fail("dns 3"))
                .then_get(body(200, "welcome")),
        );
        let r = c.check("https://a.com", false).await;
        assert_eq!(r.status(), LinkStatus::Healthy);
        assert_eq!(r.status_code, Some(200));
        // Every HEAD failed, so the last failure is kept for diagnostics.
        assert_eq!(r.error_message.as_deref(), Some("dns 3"));
        assert_eq!(
            calls(&c),
            vec![
                "HEAD https://a.com",
                "HEAD https://a.com",
                "HEAD https://a.com",
                "GET https://a.com"
            ]
        );
    }

    #[tokio::test]
    async fn everything_failing_is_unknown() {
        let c = checker(
            FakeTransport::default()
                .then_head(fail("t1"))
                .then_head(fail("t2"))
                .then_head(fail("t3"))
                .then_get(fail("t4")),
        );
        let r = c.check("https://a.com", true).await;
        assert_eq!(r.status(), LinkStatus::Unknown);
        assert_eq!(r.status_code, None);
        assert!(!r.broken);
        assert_eq!(r.error_message.as_deref(), Some("t3"));
        assert_eq!(r.contact, Some(ContactInfo::default()));
    }

    #[tokio::test]
    async fn failed_get_after_405_counts_as_attempt() {
        let c = checker(
            FakeTransport::default()
                .then_head(ok(405))
                .then_get(fail("get reset"))
                .then_head(ok(200)),
        );
        let r = c.check("https://a.com", false).await;
        assert_eq!(r.status(), LinkStatus::Healthy);
        assert_eq!(r.error_message, None);
        assert_eq!(
            calls(&c),
            vec!["HEAD https://a.com", "GET https://a.com", "HEAD https://a.com"]
        );
    }

    #[tokio::test]
    async fn contacts_extracted_from_captured_200_body() {
        let page = "<p>Call (254) 933-5160 or email clerk@bellcounty.texas.gov</p>";
        let c = checker(FakeTransport::default().then_head(ok(405)).then_get(body(200, page)));
        let r = c.check("https://www.bellcountytx.com/clerk", true).await;
        let contact = r.contact.unwrap();
        assert_eq!(contact.phone.as_deref(), Some("(254) 933-5160"));
        assert_eq!(contact.email.as_deref(), Some("clerk@bellcounty.texas.gov"));
    }

    #[tokio::test]
    async fn no_contacts_without_body() {
        let c = checker(FakeTransport::default().then_head(ok(200)));
        let r = c.check("https://county.example.gov", true).await;
        assert_eq!(r.contact, Some(ContactInfo::default()));
    }

    #[tokio::test]
    async fn check_all_fills_every_record() {
        use crate::links::{ExtractedLink, LinkOrigin, SourceType};

        let mk = |url: &str| {
            LinkRecord::new(
                ExtractedLink {
                    url: url.into(),
                    text: url.into(),
                    origin: LinkOrigin::Markdown,
                },
                "_pages/a.md".into(),
                SourceType::Page,
            )
        };
        let mut records = vec![mk("https://a.com"), mk("https://www.example.gov/x")];
        let c = checker(FakeTransport::default().then_head(ok(200)).then_head(ok(404)));
        c.check_all(&mut records, &crate::progress::noop()).await;

        assert_eq!(records[0].status(), Some(LinkStatus::Healthy));
        assert!(records[0].check.as_ref().unwrap().contact.is_none());
        assert!(records[1].is_broken());
        // .gov opts in to contact extraction, so the fields are present.
        assert!(records[1].check.as_ref().unwrap().contact.is_some());
    }
}
