//! User-agent classification.

use regex::{RegexSet, RegexSetBuilder};

/// Automation and tooling signatures.
const DENY: &[&str] = &[
    r"bot[/;-]",
    r"\bbot\b",
    r"crawl",
    r"spider",
    r"scrap",
    r"\bcurl/",
    r"\bwget/",
    r"python-(requests|urllib|httpx)",
    r"aiohttp",
    r"go-http-client",
    r"java/",
    r"okhttp",
    r"apache-httpclient",
    r"libwww-perl",
    r"\bruby\b",
    r"php/",
    r"node-fetch",
    r"axios/",
    r"postmanruntime",
    r"insomnia",
    r"httpie",
    r"headlesschrome",
    r"phantomjs",
    r"selenium",
    r"puppeteer",
    r"playwright",
    r"masscan",
    r"nmap",
    r"nikto",
    r"sqlmap",
    r"zgrab",
    r"nuclei",
];

/// Known-benign crawlers, link previews and uptime monitors; checked first.
const ALLOW: &[&str] = &[
    r"googlebot",
    r"bingbot",
    r"duckduckbot",
    r"applebot",
    r"slackbot",
    r"slack-imgproxy",
    r"twitterbot",
    r"linkedinbot",
    r"facebookexternalhit",
    r"discordbot",
    r"telegrambot",
    r"whatsapp",
    r"uptimerobot",
    r"pingdom",
    r"statuscake",
    r"betteruptime",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Human,
    /// Matched the allow-list.
    TrustedBot,
    /// Matched the deny-list and not the allow-list.
    Bot,
}

#[derive(Clone, Debug)]
pub struct UserAgentFilter {
    allow: RegexSet,
    deny: RegexSet,
}

impl UserAgentFilter {
    /// Build the filter from the bundled signature lists.
    ///
    /// # Errors
    /// Returns an error if a signature fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            allow: case_insensitive(ALLOW)?,
            deny: case_insensitive(DENY)?,
        })
    }

    /// A missing or empty user agent is not treated as a bot.
    #[must_use]
    pub fn classify(&self, user_agent: Option<&str>) -> Classification {
        let Some(user_agent) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
            return Classification::Human;
        };

        if self.allow.is_match(user_agent) {
            Classification::TrustedBot
        } else if self.deny.is_match(user_agent) {
            Classification::Bot
        } else {
            Classification::Human
        }
    }
}

fn case_insensitive(patterns: &[&str]) -> Result<RegexSet, regex::Error> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
}
