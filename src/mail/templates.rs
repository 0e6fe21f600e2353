//! Email bodies rendered with tera from templates embedded at compile time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};

use super::{EmailMessage, MailError};
use crate::models::Course;

/// What the order confirmation shows about the purchase.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    /// Short human reference: the first six characters of the course id
    pub reference: String,
    pub name: String,
    pub price: f64,
    /// Long date, e.g. "March 1, 2026"
    pub date: String,
}

impl OrderSummary {
    pub fn new(course: &Course, at: DateTime<Utc>) -> Self {
        Self {
            reference: course.id.chars().take(6).collect(),
            name: course.name.clone(),
            price: course.price,
            date: at.format("%B %-d, %Y").to_string(),
        }
    }
}

pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, MailError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "question_reply.html",
                    include_str!("../../templates/mail/question_reply.html"),
                ),
                (
                    "question_reply.txt",
                    include_str!("../../templates/mail/question_reply.txt"),
                ),
                (
                    "order_confirmation.html",
                    include_str!("../../templates/mail/order_confirmation.html"),
                ),
                (
                    "order_confirmation.txt",
                    include_str!("../../templates/mail/order_confirmation.txt"),
                ),
            ])
            .map_err(|e| MailError::Template(e.to_string()))?;

        Ok(Self { engine })
    }

    /// Tell a question's author that someone answered it.
    pub fn question_reply(
        &self,
        to: &str,
        name: &str,
        section_title: &str,
    ) -> Result<EmailMessage, MailError> {
        let mut context = Context::new();
        context.insert("name", name);
        context.insert("title", section_title);

        self.render("question_reply", to, "Question Reply", &context)
    }

    pub fn order_confirmation(
        &self,
        to: &str,
        order: &OrderSummary,
    ) -> Result<EmailMessage, MailError> {
        let mut context = Context::new();
        context.insert("order", order);

        self.render("order_confirmation", to, "Order Confirmation", &context)
    }

    fn render(
        &self,
        template: &str,
        to: &str,
        subject: &str,
        context: &Context,
    ) -> Result<EmailMessage, MailError> {
        let html_body = self
            .engine
            .render(&format!("{template}.html"), context)
            .map_err(|e| MailError::Template(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{template}.txt"), context)
            .map_err(|e| MailError::Template(e.to_string()))?;

        Ok(EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body,
            text_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_question_reply_escapes_html_but_not_text() {
        let renderer = TemplateRenderer::new().unwrap();
        let email = renderer
            .question_reply("ann@example.com", "Ann <3", "Ownership")
            .unwrap();

        assert_eq!(email.to, "ann@example.com");
        assert_eq!(email.subject, "Question Reply");
        assert!(email.html_body.contains("Ann &lt;3"));
        assert!(email.html_body.contains("Ownership"));
        assert!(email.text_body.contains("Ann <3"));
    }

    #[test]
    fn test_order_confirmation_summary() {
        let renderer = TemplateRenderer::new().unwrap();
        let summary = OrderSummary {
            reference: "3f2a9c".to_string(),
            name: "Rust for Web".to_string(),
            price: 49.0,
            date: Utc
                .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
                .unwrap()
                .format("%B %-d, %Y")
                .to_string(),
        };

        let email = renderer
            .order_confirmation("ann@example.com", &summary)
            .unwrap();

        assert_eq!(email.subject, "Order Confirmation");
        assert!(email.text_body.contains("#3f2a9c"));
        assert!(email.text_body.contains("March 1, 2026"));
        assert!(email.html_body.contains("Rust for Web"));
    }
}
