//! Best-effort contact extraction from a directory results page.
//!
//! Each field has an ordered list of strategies. A strategy is a CSS
//! selector plus the places on a matched element to read a value from.
//! The first plausible value wins; nothing plausible leaves the field empty.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use ttb_core::Contact;

const MIN_PHONE_DIGITS: usize = 10;

/// Where on a matched element a candidate value is read from.
#[derive(Debug, Clone, Copy)]
enum Read {
    Text,
    Attr(&'static str),
    /// An attribute whose value carries a scheme prefix such as `tel:`.
    Prefixed(&'static str, &'static str),
}

struct Strategy {
    selector: Selector,
    reads: &'static [Read],
}

impl Strategy {
    fn new(css: &str, reads: &'static [Read]) -> Self {
        Self {
            selector: Selector::parse(css).expect("valid selector"),
            reads,
        }
    }

    fn candidates<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = String> + 'a {
        document
            .select(&self.selector)
            .flat_map(move |el| self.reads.iter().filter_map(move |read| read_value(el, *read)))
    }
}

fn read_value(el: ElementRef<'_>, read: Read) -> Option<String> {
    let raw = match read {
        Read::Text => el.text().collect::<String>(),
        Read::Attr(name) => el.value().attr(name)?.to_owned(),
        Read::Prefixed(name, prefix) => {
            let value = el.value().attr(name)?;
            value.strip_prefix(prefix).unwrap_or(value).to_owned()
        }
    };
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

static PHONE_STRATEGIES: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    const READS: &[Read] = &[
        Read::Text,
        Read::Prefixed("href", "tel:"),
        Read::Attr("data-phone"),
    ];
    vec![
        Strategy::new(".tel", READS),
        Strategy::new(".coordonnees .tel", READS),
        Strategy::new("[data-phone]", READS),
        Strategy::new(".bloc-resultat .tel", READS),
        Strategy::new(".result-item .tel", READS),
        Strategy::new(r#"a[href^="tel:"]"#, READS),
    ]
});

static EMAIL_STRATEGIES: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    const READS: &[Read] = &[
        Read::Prefixed("href", "mailto:"),
        Read::Text,
        Read::Attr("data-email"),
    ];
    vec![
        Strategy::new(r#"a[href^="mailto:"]"#, READS),
        Strategy::new(".email", READS),
        Strategy::new(".coordonnees .email", READS),
        Strategy::new("[data-email]", READS),
    ]
});

static WEBSITE_STRATEGIES: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    const READS: &[Read] = &[Read::Attr("href")];
    vec![
        Strategy::new(".site-web a", READS),
        Strategy::new(".siteweb a", READS),
        Strategy::new(r#"a[href^="http"]"#, READS),
        Strategy::new(r#".bloc-resultat a[target="_blank"]"#, READS),
    ]
});

fn first_plausible<F>(document: &Html, strategies: &[Strategy], accept: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    strategies
        .iter()
        .find_map(|s| s.candidates(document).find_map(|c| accept(&c)))
}

/// Strips spaces, dots and dashes; plausible with at least ten digits.
#[must_use]
pub fn plausible_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != '-')
        .collect();
    let digits = cleaned.chars().filter(char::is_ascii_digit).count();
    let only_phone_chars = cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '(' || c == ')');
    (digits >= MIN_PHONE_DIGITS && only_phone_chars).then_some(cleaned)
}

#[must_use]
pub fn plausible_email(raw: &str) -> Option<String> {
    let address = raw.split('?').next().unwrap_or(raw).trim();
    let (local, domain) = address.split_once('@')?;
    let valid = !local.is_empty()
        && domain.contains('.')
        && !address.chars().any(char::is_whitespace);
    valid.then(|| address.to_owned())
}

/// An absolute http(s) URL that does not point back at the directory.
#[must_use]
pub fn plausible_website(raw: &str, directory_host: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let directory = directory_host.trim_start_matches("www.").to_ascii_lowercase();
    if !directory.is_empty() && (host == directory || host.ends_with(&format!(".{directory}"))) {
        return None;
    }
    Some(url.to_string())
}

/// Extracts whatever contact fields the page exposes.
#[must_use]
pub fn extract_contact(html: &str, directory_host: &str) -> Contact {
    let document = Html::parse_document(html);
    Contact {
        phone: first_plausible(&document, &PHONE_STRATEGIES, plausible_phone),
        email: first_plausible(&document, &EMAIL_STRATEGIES, plausible_email),
        website: first_plausible(&document, &WEBSITE_STRATEGIES, |raw| {
            plausible_website(raw, directory_host)
        }),
    }
}
