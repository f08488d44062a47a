//! Credential records scraped from a GitHub App settings page
//!
//! Everything here works on a serialized page (`Browser::page_source`) so the
//! structural checks can run against fixed HTML fragments.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::webdriver::Locator;

/// Prefix GitHub shows in place of a client secret that is no longer viewable
const REDACTED_PREFIX: &str = "*****";

/// The two credential types a GitHub App carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    ClientSecret,
    PrivateKey,
}

impl CredentialKind {
    /// Prefix of the `id` attribute on a credential row
    pub fn id_prefix(self) -> &'static str {
        match self {
            CredentialKind::ClientSecret => "client-secret-",
            CredentialKind::PrivateKey => "integration-key-",
        }
    }

    pub fn row_selector(self) -> &'static str {
        match self {
            CredentialKind::ClientSecret => "div.client-secret",
            CredentialKind::PrivateKey => "div.integration-key",
        }
    }

    pub fn new_button_text(self) -> &'static str {
        match self {
            CredentialKind::ClientSecret => "Generate a new client secret",
            CredentialKind::PrivateKey => "Generate a private key",
        }
    }

    /// Path segment used by the create and delete form actions
    pub fn url_segment(self) -> &'static str {
        match self {
            CredentialKind::ClientSecret => "client_secret",
            CredentialKind::PrivateKey => "key",
        }
    }

    pub fn new_button_locator(self) -> Locator {
        Locator::css(format!("input[value=\"{}\"]", self.new_button_text()))
    }

    pub fn delete_button_locator(self, id: u64) -> Locator {
        Locator::css(format!(
            "[id=\"{}{}\"] div.action form button[type=submit]",
            self.id_prefix(),
            id
        ))
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::ClientSecret => write!(f, "client secret"),
            CredentialKind::PrivateKey => write!(f, "private key"),
        }
    }
}

/// One client secret or private key as shown on the settings page
#[derive(Debug, Clone, Serialize)]
pub struct Credential {
    pub kind: CredentialKind,
    pub app: String,
    pub id: u64,
    /// Secret value, key fingerprint, or the downloaded PEM for a new key
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    pub redacted: bool,
}

impl Credential {
    pub fn is_redacted(&self) -> bool {
        self.redacted
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid selector {}: {:?}", css, e))
}

/// Visible text with whitespace runs collapsed
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first<'a>(scope: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>> {
    Ok(scope.select(&selector(css)?).next())
}

fn require<'a>(scope: ElementRef<'a>, css: &str) -> Result<ElementRef<'a>> {
    first(scope, css)?.with_context(|| format!("No element matching `{}`", css))
}

/// Numeric id encoded in a credential row's `id` attribute
pub fn id_from_element(kind: CredentialKind, element: ElementRef<'_>) -> Result<u64> {
    let raw = element
        .value()
        .attr("id")
        .with_context(|| format!("{} row has no id attribute", kind))?
        .trim()
        .to_lowercase();

    let digits = raw.strip_prefix(kind.id_prefix()).with_context(|| {
        format!("Row id {:?} does not start with {:?}", raw, kind.id_prefix())
    })?;

    digits
        .parse()
        .with_context(|| format!("Row id {:?} does not end in a number", raw))
}

/// Build a record from one credential row
pub fn parse_row(kind: CredentialKind, app: &str, element: ElementRef<'_>) -> Result<Credential> {
    let id = id_from_element(kind, element)?;

    let data = text_of(require(element, "code").with_context(|| format!("{} {}", kind, id))?);

    let added_at = match first(element, "relative-time")? {
        Some(time) => {
            let stamp = time
                .value()
                .attr("datetime")
                .with_context(|| format!("{} {} has a relative-time without datetime", kind, id))?;
            Some(
                DateTime::parse_from_rfc3339(stamp.trim())
                    .with_context(|| format!("Bad timestamp {:?} on {} {}", stamp, kind, id))?
                    .with_timezone(&Utc),
            )
        }
        None => None,
    };

    let added_by = first(element, "strong")?
        .map(text_of)
        .filter(|s| !s.is_empty());

    let (usage, redacted) = match kind {
        CredentialKind::ClientSecret => (
            Some(client_secret_usage(element, id)?),
            data.starts_with(REDACTED_PREFIX),
        ),
        CredentialKind::PrivateKey => (None, false),
    };

    Ok(Credential {
        kind,
        app: app.to_string(),
        id,
        data,
        added_at,
        added_by,
        usage,
        redacted,
    })
}

fn client_secret_usage(element: ElementRef<'_>, id: u64) -> Result<String> {
    if let Some(access) = first(element, "div.recent-user-key-access")? {
        return Ok(text_of(access));
    }

    let span = require(element, "p>span")
        .with_context(|| format!("Client secret {} has no usage information", id))?;
    let usage = text_of(span);
    anyhow::ensure!(
        usage.to_lowercase() == "never used",
        "Unexpected usage text {:?} on client secret {}",
        usage,
        id
    );
    Ok(usage)
}

fn collect_rows<'a>(
    kind: CredentialKind,
    app: &str,
    rows: impl Iterator<Item = ElementRef<'a>>,
) -> Result<BTreeMap<u64, Credential>> {
    let mut found = BTreeMap::new();
    for row in rows {
        let credential = parse_row(kind, app, row)?;
        let id = credential.id;
        anyhow::ensure!(
            found.insert(id, credential).is_none(),
            "Duplicate {} id {} on one page",
            kind,
            id
        );
    }
    Ok(found)
}

/// The div wrapping the `<a name=...>` anchor of a settings section
fn section<'a>(document: &'a Html, anchor: &str) -> Result<ElementRef<'a>> {
    let css = format!("a[name='{}']", anchor);
    let link = document
        .select(&selector(&css)?)
        .next()
        .with_context(|| format!("No `{}` anchor on the page", anchor))?;

    let parent = link
        .parent()
        .and_then(ElementRef::wrap)
        .with_context(|| format!("`{}` anchor has no parent element", anchor))?;
    anyhow::ensure!(
        parent.value().name() == "div",
        "`{}` anchor is inside <{}>, expected <div>",
        anchor,
        parent.value().name()
    );
    Ok(parent)
}

/// All client secrets listed on the page, keyed by id
pub fn client_secrets(html: &str, app: &str) -> Result<BTreeMap<u64, Credential>> {
    let document = Html::parse_document(html);
    let rows = selector(CredentialKind::ClientSecret.row_selector())?;
    collect_rows(CredentialKind::ClientSecret, app, document.select(&rows))
}

/// All private keys listed under the private-key section, keyed by id
pub fn private_keys(html: &str, app: &str) -> Result<BTreeMap<u64, Credential>> {
    let document = Html::parse_document(html);
    let keys = section(&document, "private-key")?;
    let rows = selector(CredentialKind::PrivateKey.row_selector())?;
    collect_rows(CredentialKind::PrivateKey, app, keys.select(&rows))
}

/// The freshly generated client secret shown once after creation
pub fn new_client_secret(html: &str, app: &str) -> Result<Credential> {
    let document = Html::parse_document(html);
    let token = document
        .select(&selector("div.new-token")?)
        .next()
        .context("No new client secret on the page")?;

    let secret = parse_row(CredentialKind::ClientSecret, app, token)?;
    anyhow::ensure!(
        !secret.is_redacted(),
        "New client secret {} is shown redacted",
        secret.id
    );
    Ok(secret)
}

/// Label/value pairs from the app's "About" credentials section
pub fn app_info(html: &str) -> Result<BTreeMap<String, String>> {
    let document = Html::parse_document(html);
    let oauth = section(&document, "oauth-credentials")?;

    let mut info = BTreeMap::new();
    for paragraph in oauth
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "p")
    {
        let text = text_of(paragraph);
        match text.split_once(':') {
            Some((key, value)) => {
                info.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                anyhow::ensure!(
                    text.starts_with("GitHub Apps can"),
                    "Unexpected paragraph in credentials section: {:?}",
                    text
                );
            }
        }
    }
    Ok(info)
}

/// Validated action URL of the form behind a "generate" button
pub fn new_form_action(
    html: &str,
    kind: CredentialKind,
    app: &str,
    base_url: &str,
) -> Result<Url> {
    let document = Html::parse_document(html);
    let css = format!("input[value=\"{}\"]", kind.new_button_text());
    let button = document
        .select(&selector(&css)?)
        .next()
        .with_context(|| format!("No {:?} button on the page", kind.new_button_text()))?;

    let form = button
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|e| e.value().name() == "form")
        .with_context(|| format!("{:?} button is not inside a form", kind.new_button_text()))?;
    let action = form
        .value()
        .attr("action")
        .with_context(|| format!("{} form has no action", kind))?
        .trim();

    let base = Url::parse(base_url).with_context(|| format!("Invalid GitHub URL {:?}", base_url))?;
    let resolved = base
        .join(action)
        .with_context(|| format!("Invalid form action {:?}", action))?;

    let root = format!("{}/", base_url.trim_end_matches('/'));
    anyhow::ensure!(
        resolved.as_str().starts_with(&root),
        "Form action {} is not on {}",
        resolved,
        root
    );
    let expected = format!("/settings/apps/{}/{}", app, kind.url_segment());
    anyhow::ensure!(
        resolved.path().contains(&expected),
        "Form action {} does not contain {}",
        resolved,
        expected
    );

    Ok(resolved)
}

/// Validated action of the delete form on one credential row
pub fn delete_form_action(html: &str, kind: CredentialKind, id: u64) -> Result<String> {
    let document = Html::parse_document(html);
    let css = format!("[id=\"{}{}\"]", kind.id_prefix(), id);
    let row = document
        .select(&selector(&css)?)
        .next()
        .with_context(|| format!("No {} with id {} on the page", kind, id))?;

    let found = id_from_element(kind, row)?;
    anyhow::ensure!(found == id, "Row id {} does not match {}", found, id);

    let form = require(row, "div.action form")
        .with_context(|| format!("{} {} has no delete form", kind, id))?;
    let action = form
        .value()
        .attr("action")
        .with_context(|| format!("Delete form for {} {} has no action", kind, id))?
        .trim()
        .to_string();
    let suffix = format!("{}/{}", kind.url_segment(), id);
    anyhow::ensure!(
        action.ends_with(&suffix),
        "Delete form action {:?} does not end with {:?}",
        action,
        suffix
    );

    let button = require(form, "button[type=submit]")?;
    let label = text_of(button).to_lowercase();
    anyhow::ensure!(label == "delete", "Delete button reads {:?}", label);

    Ok(action)
}

/// A downloaded private key must be a `.pem` file
pub fn ensure_pem_filename(name: &str) -> Result<()> {
    anyhow::ensure!(
        name.ends_with(".pem"),
        "Downloaded file {:?} is not a .pem private key",
        name
    );
    Ok(())
}
