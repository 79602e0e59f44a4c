//! Same-origin link crawl of a loaded page
//!
//! Every same-origin anchor target is requested once (a lightweight request,
//! not a navigation). All targets are checked in one pass; a broken link is
//! recorded and the crawl moves on.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use aip101_common::locale_of;

use crate::error::{BrokenLink, E2eError, E2eResult};
use crate::session::Session;

/// Outcome of one link request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCheck {
    pub url: String,
    pub status: Option<u16>,
    pub ok: bool,
}

/// All link checks for one page, in document order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    pub page: String,
    pub checked: Vec<LinkCheck>,
    /// Links pointing into a different locale than the page
    pub cross_locale: Vec<String>,
}

impl CrawlResult {
    pub fn broken(&self) -> Vec<BrokenLink> {
        self.checked
            .iter()
            .filter(|c| !c.ok)
            .map(|c| BrokenLink {
                url: c.url.clone(),
                status: c.status,
                reason: match c.status {
                    Some(status) => format!("HTTP {}", status),
                    None => "request failed".to_string(),
                },
            })
            .collect()
    }

    /// `BrokenLinks` naming every failing URL, if there is any
    pub fn into_result(self) -> E2eResult<CrawlResult> {
        let broken = self.broken();
        if broken.is_empty() {
            Ok(self)
        } else {
            Err(E2eError::BrokenLinks { links: broken })
        }
    }
}

/// Reduce raw anchor targets to the de-duplicated same-origin URLs worth checking.
///
/// Non-HTTP schemes (`mailto:`, `tel:`, `javascript:`) and links that only
/// move to a fragment of the current page are dropped; remaining fragments
/// are stripped before de-duplication.
pub fn same_origin_targets(page_url: &str, hrefs: &[String]) -> Vec<String> {
    let page = match Url::parse(page_url) {
        Ok(url) => url,
        Err(_) => return Vec::new(),
    };
    let mut page_no_fragment = page.clone();
    page_no_fragment.set_fragment(None);

    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for href in hrefs {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let mut url = match page.join(href) {
            Ok(url) => url,
            Err(_) => continue,
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        if url.origin() != page.origin() {
            continue;
        }
        if url.fragment().is_some() {
            url.set_fragment(None);
            if url == page_no_fragment {
                continue;
            }
        }
        let url = url.to_string();
        if seen.insert(url.clone()) {
            targets.push(url);
        }
    }

    targets
}

/// Crawl the page the session is on. Returns every check; use
/// [`CrawlResult::into_result`] to turn broken links into a failure.
pub async fn crawl(session: &mut Session) -> E2eResult<CrawlResult> {
    let page = session.current_url().await?;
    let hrefs = session.anchor_hrefs().await?;
    let targets = same_origin_targets(&page, &hrefs);
    debug!("Crawling {} link(s) on {}", targets.len(), page);

    let base_path = session.base_path();
    let page_locale = locale_in_site(&page, &base_path);

    let mut result = CrawlResult {
        page: page.clone(),
        ..Default::default()
    };

    for url in targets {
        if let (Some(page_loc), Some(link_loc)) = (page_locale, locale_in_site(&url, &base_path)) {
            if page_loc != link_loc {
                warn!("Cross-locale link on {}: {}", page, url);
                result.cross_locale.push(url.clone());
            }
        }

        let check = match session.link_status(&url).await {
            Ok(status) => LinkCheck {
                url,
                status: Some(status),
                ok: status < 400,
            },
            Err(e @ (E2eError::UncaughtPageError(_) | E2eError::ConsoleError(_))) => return Err(e),
            Err(e) => {
                warn!("Link request failed for {}: {}", url, e);
                LinkCheck {
                    url,
                    status: None,
                    ok: false,
                }
            }
        };
        if !check.ok {
            warn!("Broken link: {} ({:?})", check.url, check.status);
        }
        result.checked.push(check);
    }

    Ok(result)
}

fn locale_in_site(url: &str, base_path: &str) -> Option<aip101_common::Locale> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    let path = path.strip_prefix(base_path).unwrap_or(path);
    locale_of(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filters_and_dedupes() {
        let page = "http://127.0.0.1:3000/en";
        let raw = hrefs(&[
            "http://127.0.0.1:3000/en/pricing",
            "/en/pricing",
            "#top",
            "http://127.0.0.1:3000/en#faq",
            "http://127.0.0.1:3000/en/blog#latest",
            "mailto:hello@example.com",
            "tel:+6600000000",
            "https://github.com/example",
            "http://127.0.0.1:4000/en/about",
            "javascript:void(0)",
            "/th",
        ]);
        let targets = same_origin_targets(page, &raw);
        assert_eq!(
            targets,
            vec![
                "http://127.0.0.1:3000/en/pricing".to_string(),
                "http://127.0.0.1:3000/en/blog".to_string(),
                "http://127.0.0.1:3000/th".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_page_url_yields_nothing() {
        assert!(same_origin_targets("not a url", &hrefs(&["/en"])).is_empty());
    }

    #[test]
    fn test_broken_lists_only_failures() {
        let result = CrawlResult {
            page: "http://x/en".into(),
            checked: vec![
                LinkCheck { url: "http://x/en/a".into(), status: Some(200), ok: true },
                LinkCheck { url: "http://x/en/b".into(), status: Some(404), ok: false },
                LinkCheck { url: "http://x/en/c".into(), status: None, ok: false },
            ],
            cross_locale: vec![],
        };
        let broken = result.broken();
        assert_eq!(broken.len(), 2);
        assert_eq!(broken[0].url, "http://x/en/b");
        assert_eq!(broken[1].status, None);
        assert!(matches!(result.into_result(), Err(E2eError::BrokenLinks { links }) if links.len() == 2));
    }

    #[test]
    fn test_locale_in_site_strips_base_path() {
        assert_eq!(
            locale_in_site("https://h/AI-Project/th/blog", "/AI-Project"),
            Some(aip101_common::Locale::Th)
        );
        assert_eq!(locale_in_site("https://h/en", ""), Some(aip101_common::Locale::En));
    }
}
