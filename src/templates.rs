//! Transactional email bodies.
//!
//! Every email comes in an HTML and a plain text flavour, both addressed to a
//! single recipient so that the greeting can be personalised. Bodies are
//! handlebars templates: the HTML registry escapes every value, the text one
//! leaves values untouched.

use std::sync::LazyLock;

use handlebars::{Handlebars, RenderError};

use crate::domain::{NewArticle, Rating};

/// Name of the site, as shown to readers
pub const SITE_NAME: &str = "Crypto Casino Hub";

/// Registry for HTML bodies, escaping values by default
static HTML: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
});

/// Registry for plain text bodies
static TEXT: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
});

/// Rendered email, ready to be handed to an email transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_content: String,
    pub text_content: String,
}

impl EmailMessage {
    /// Render both bodies of an email from the same template data
    fn render<T>(subject: String, html: &str, text: &str, data: &T) -> Result<Self, RenderError>
    where
        T: serde::Serialize,
    {
        Ok(Self {
            subject,
            html_content: HTML.render_template(html, data)?,
            text_content: TEXT.render_template(text, data)?,
        })
    }
}

/// Values available to every template
#[derive(serde::Serialize)]
struct Common<'a> {
    name: &'a str,
    site_name: &'static str,
    site_url: &'a str,
}

impl<'a> Common<'a> {
    fn new(recipient_name: &'a str, default_name: &'a str, site_url: &'a str) -> Self {
        Self {
            name: greeting_name(recipient_name, default_name),
            site_name: SITE_NAME,
            site_url: site_url.trim_end_matches('/'),
        }
    }
}

#[derive(serde::Serialize)]
struct PublishedData<'a> {
    #[serde(flatten)]
    common: Common<'a>,
    title: &'a str,
    image_url: &'a str,
    content: &'a str,
    paragraphs: Vec<&'a str>,
    stars: String,
}

#[derive(serde::Serialize)]
struct ArticleChangeData<'a> {
    #[serde(flatten)]
    common: Common<'a>,
    title: &'a str,
}

#[derive(serde::Serialize)]
struct AccountData<'a> {
    name: &'a str,
    email: &'a str,
}

/// Pick the greeting name, falling back to `default` for blank names
fn greeting_name<'a>(name: &'a str, default: &'a str) -> &'a str {
    if name.trim().is_empty() {
        default
    } else {
        name
    }
}

/// Render a rating as filled and empty stars, e.g. `★★★☆☆ 3 / 5`
pub fn rating_stars(rating: Rating) -> String {
    let filled = usize::from(rating.stars());
    let empty = usize::from(Rating::MAX) - filled;
    format!(
        "{}{} {} / {}",
        "★".repeat(filled),
        "☆".repeat(empty),
        rating.stars(),
        Rating::MAX
    )
}

/// Newly published casino review
pub fn article_published(
    recipient_name: &str,
    article: &NewArticle,
    site_url: &str,
) -> Result<EmailMessage, RenderError> {
    let data = PublishedData {
        common: Common::new(recipient_name, "there", site_url),
        title: article.title.as_ref(),
        image_url: article.image_url.as_ref(),
        content: article.content.as_ref(),
        paragraphs: article.content.as_ref().split("\n\n").collect(),
        stars: rating_stars(article.rating),
    };
    EmailMessage::render(
        article.title.as_ref().to_string(),
        concat!(
            include_str!("templates/article_published.html.hbs"),
            include_str!("templates/footer.html.hbs")
        ),
        concat!(
            include_str!("templates/article_published.txt.hbs"),
            include_str!("templates/footer.txt.hbs")
        ),
        &data,
    )
}

/// Existing article edited by an admin
pub fn article_updated(
    recipient_name: &str,
    title: &str,
    site_url: &str,
) -> Result<EmailMessage, RenderError> {
    let data = ArticleChangeData {
        common: Common::new(recipient_name, "Subscriber", site_url),
        title,
    };
    EmailMessage::render(
        format!("Article Updated: {title}"),
        concat!(
            include_str!("templates/article_updated.html.hbs"),
            include_str!("templates/footer.html.hbs")
        ),
        concat!(
            include_str!("templates/article_updated.txt.hbs"),
            include_str!("templates/footer.txt.hbs")
        ),
        &data,
    )
}

/// Article removed by an admin
pub fn article_removed(
    recipient_name: &str,
    title: &str,
    site_url: &str,
) -> Result<EmailMessage, RenderError> {
    let data = ArticleChangeData {
        common: Common::new(recipient_name, "Subscriber", site_url),
        title,
    };
    EmailMessage::render(
        format!("Article Removed: {title}"),
        concat!(
            include_str!("templates/article_removed.html.hbs"),
            include_str!("templates/footer.html.hbs")
        ),
        concat!(
            include_str!("templates/article_removed.txt.hbs"),
            include_str!("templates/footer.txt.hbs")
        ),
        &data,
    )
}

/// Sent after registration or after signing up through the newsletter form
pub fn welcome(recipient_name: &str, site_url: &str) -> Result<EmailMessage, RenderError> {
    EmailMessage::render(
        format!("Welcome to {SITE_NAME}!"),
        include_str!("templates/welcome.html.hbs"),
        include_str!("templates/welcome.txt.hbs"),
        &Common::new(recipient_name, "there", site_url),
    )
}

/// Sent when a user turns the newsletter on from their profile
pub fn subscribed(recipient_name: &str, site_url: &str) -> Result<EmailMessage, RenderError> {
    EmailMessage::render(
        format!("You're now subscribed to {SITE_NAME}!"),
        concat!(
            include_str!("templates/subscribed.html.hbs"),
            include_str!("templates/footer.html.hbs")
        ),
        concat!(
            include_str!("templates/subscribed.txt.hbs"),
            include_str!("templates/footer.txt.hbs")
        ),
        &Common::new(recipient_name, "there", site_url),
    )
}

/// Sent when a user turns the newsletter off from their profile
pub fn unsubscribed(recipient_name: &str, site_url: &str) -> Result<EmailMessage, RenderError> {
    EmailMessage::render(
        format!("You've been unsubscribed from {SITE_NAME}"),
        include_str!("templates/unsubscribed.html.hbs"),
        include_str!("templates/unsubscribed.txt.hbs"),
        &Common::new(recipient_name, "there", site_url),
    )
}

/// Sent right before an admin deletes a user account
pub fn account_deleted(
    recipient_name: &str,
    recipient_email: &str,
) -> Result<EmailMessage, RenderError> {
    let data = AccountData {
        name: greeting_name(recipient_name, "there"),
        email: recipient_email,
    };
    EmailMessage::render(
        format!("Your {SITE_NAME} account has been deleted"),
        include_str!("templates/account_deleted.html.hbs"),
        include_str!("templates/account_deleted.txt.hbs"),
        &data,
    )
}
